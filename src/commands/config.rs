use log::debug;

use crate::{parallelism, pip::DEFAULT_PIP, runtime::Runtime};

/// Options as given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub jobs: Option<usize>,
    pub pip: Option<String>,
    pub pip_args: Vec<String>,
    pub with_deps: bool,
    pub strict: bool,
}

/// Resolved settings shared by every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub pip_program: String,
    pub pip_args: Vec<String>,
    pub no_deps: bool,
    pub jobs: usize,
    pub strict: bool,
}

impl Config {
    pub fn new<R: Runtime + ?Sized>(runtime: &R, options: Options) -> Self {
        let cpus = runtime.cpu_count();
        let jobs = parallelism::resolve_jobs(options.jobs, cpus);
        debug!(
            "Detected {:?} CPU(s), requested {:?} job(s), using {}",
            cpus, options.jobs, jobs
        );

        let pip_program = options
            .pip
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PIP.to_string());

        Self {
            pip_program,
            pip_args: options.pip_args,
            no_deps: !options.with_deps,
            jobs,
            strict: options.strict,
        }
    }
}
