//! Requirements file reading.
//!
//! A requirements file lists one package specifier per line. Blank lines and
//! lines starting with `#` are skipped; everything else is passed through as
//! written, without interpreting extras, markers or version ranges.

mod spec;

pub use spec::{RequirementSpec, normalize_name};

use std::io::{self, BufRead, BufReader, Lines, Read};
use std::path::{Path, PathBuf};

use log::debug;

use crate::runtime::Runtime;

#[derive(Debug)]
pub enum RequirementsError {
    /// The requirements path does not name an existing regular file.
    FileNotFound(PathBuf),
    /// Reading failed part way through the file.
    Read { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for RequirementsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequirementsError::FileNotFound(path) => {
                write!(f, "File not found: {}", path.display())
            }
            RequirementsError::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for RequirementsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequirementsError::Read { source, .. } => Some(source),
            RequirementsError::FileNotFound(_) => None,
        }
    }
}

/// Lazy iterator over the package specifiers in a requirements file.
pub struct Requirements<B> {
    path: PathBuf,
    lines: Lines<B>,
    first_line: bool,
    failed: bool,
}

impl<B: BufRead> Requirements<B> {
    pub fn new(path: impl Into<PathBuf>, reader: B) -> Self {
        Self {
            path: path.into(),
            lines: reader.lines(),
            first_line: true,
            failed: false,
        }
    }
}

impl<B: BufRead> Iterator for Requirements<B> {
    type Item = Result<RequirementSpec, RequirementsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(source) => {
                    // A broken reader tends to keep failing; report once and stop.
                    self.failed = true;
                    return Some(Err(RequirementsError::Read {
                        path: self.path.clone(),
                        source,
                    }));
                }
            };

            let mut line = line.as_str();
            if std::mem::take(&mut self.first_line) {
                line = line.strip_prefix('\u{feff}').unwrap_or(line);
            }

            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(Ok(RequirementSpec::from_line(line)));
        }
    }
}

pub struct RequirementsFile;

impl RequirementsFile {
    /// Open `path` for reading after checking that it is an existing file.
    #[tracing::instrument(skip(runtime))]
    pub fn open<R: Runtime + ?Sized>(
        runtime: &R,
        path: &Path,
    ) -> Result<Requirements<BufReader<Box<dyn Read + Send>>>, RequirementsError> {
        if !runtime.is_file(path) {
            debug!("Requirements file {:?} is missing or not a regular file", path);
            return Err(RequirementsError::FileNotFound(path.to_path_buf()));
        }

        let reader = runtime.open(path).map_err(|e| RequirementsError::Read {
            path: path.to_path_buf(),
            source: e.downcast::<io::Error>().unwrap_or_else(io::Error::other),
        })?;

        Ok(Requirements::new(path, BufReader::new(reader)))
    }

    /// Read every specifier in `path`, failing on the first read error.
    pub fn read_all<R: Runtime + ?Sized>(
        runtime: &R,
        path: &Path,
    ) -> Result<Vec<RequirementSpec>, RequirementsError> {
        let specs = Self::open(runtime, path)?.collect::<Result<Vec<_>, _>>()?;
        debug!("Read {} specifier(s) from {:?}", specs.len(), path);
        Ok(specs)
    }
}
