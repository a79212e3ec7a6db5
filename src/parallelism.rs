//! How many installer processes may run at once.

/// Job count used when the CPU count cannot be detected.
pub const FALLBACK_JOBS: usize = 8;

/// Jobs started per logical CPU.
pub const JOBS_PER_CPU: usize = 2;

/// Default job count for the detected CPU count.
pub fn default_jobs(cpus: Option<usize>) -> usize {
    match cpus {
        Some(n) if n > 0 => n.saturating_mul(JOBS_PER_CPU),
        _ => FALLBACK_JOBS,
    }
}

/// Pick the job count: an explicit non-zero request wins over the default.
pub fn resolve_jobs(requested: Option<usize>, cpus: Option<usize>) -> usize {
    match requested {
        Some(n) if n > 0 => n,
        _ => default_jobs(cpus),
    }
}
