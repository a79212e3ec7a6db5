//! Package extraction from Ansible playbooks.
//!
//! Walks plays, task lists and blocks looking for `pip` and `apt` tasks.
//! Pip packages are collected in playbook order, including the contents of
//! any requirements file a task references. Apt packages are collected for
//! reporting only.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_yaml::{Mapping, Value};

use crate::requirements::{RequirementSpec, RequirementsError, RequirementsFile};
use crate::runtime::Runtime;

const PIP_MODULES: &[&str] = &["pip", "ansible.builtin.pip"];
const APT_MODULES: &[&str] = &["apt", "ansible.builtin.apt"];
/// Keys whose value is a nested list of tasks.
const TASK_LIST_KEYS: &[&str] = &["pre_tasks", "tasks", "post_tasks", "block", "rescue", "always"];

#[derive(Debug)]
pub enum PlaybookError {
    FileNotFound(PathBuf),
    Read { path: PathBuf, source: anyhow::Error },
    Parse { path: PathBuf, source: serde_yaml::Error },
    Requirements(RequirementsError),
}

impl std::fmt::Display for PlaybookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybookError::FileNotFound(path) => write!(f, "File not found: {}", path.display()),
            PlaybookError::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            PlaybookError::Parse { path, source } => {
                write!(f, "Error parsing YAML file {}: {}", path.display(), source)
            }
            PlaybookError::Requirements(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PlaybookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlaybookError::Read { source, .. } => Some(&**source),
            PlaybookError::Parse { source, .. } => Some(source),
            PlaybookError::Requirements(e) => Some(e),
            PlaybookError::FileNotFound(_) => None,
        }
    }
}

/// Where a pip task gets its packages from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipSource {
    Package(String),
    Requirements(PathBuf),
}

/// Raw findings of a playbook walk, before requirements files are read.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PlaybookTasks {
    pub pip: Vec<PipSource>,
    pub apt: Vec<String>,
}

/// Packages a playbook installs.
#[derive(Debug, Default)]
pub struct PlaybookPackages {
    pub pip: Vec<RequirementSpec>,
    pub apt: Vec<String>,
}

/// Parse playbook YAML and collect its pip and apt tasks.
pub fn parse_playbook(content: &str) -> Result<PlaybookTasks, serde_yaml::Error> {
    let doc: Value = serde_yaml::from_str(content)?;
    let mut found = PlaybookTasks::default();
    if let Value::Sequence(items) = &doc {
        walk_tasks(items, &mut found);
    } else {
        debug!("Playbook root is not a list, nothing to extract");
    }
    Ok(found)
}

fn walk_tasks(items: &[Value], found: &mut PlaybookTasks) {
    for item in items {
        let Value::Mapping(task) = item else {
            continue;
        };

        if let Some(args) = module_args(task, PIP_MODULES) {
            collect_pip(args, found);
        } else if let Some(args) = module_args(task, APT_MODULES) {
            found.apt.extend(string_or_list(args.get("name").or_else(|| args.get("pkg"))));
        }

        for key in TASK_LIST_KEYS {
            if let Some(Value::Sequence(nested)) = task.get(*key) {
                walk_tasks(nested, found);
            }
        }
    }
}

fn module_args<'a>(task: &'a Mapping, modules: &[&str]) -> Option<&'a Mapping> {
    modules.iter().find_map(|m| match task.get(*m) {
        Some(Value::Mapping(args)) => Some(args),
        _ => None,
    })
}

fn collect_pip(args: &Mapping, found: &mut PlaybookTasks) {
    let mut names = string_or_list(args.get("name"));

    match args.get("version").and_then(scalar_string) {
        Some(version) if names.len() == 1 => {
            let name = names.remove(0);
            found
                .pip
                .push(PipSource::Package(format!("{}=={}", name, version)));
        }
        version => {
            if version.is_some() {
                warn!("Ignoring pip 'version' on a task with {} names", names.len());
            }
            found.pip.extend(names.into_iter().map(PipSource::Package));
        }
    }

    if let Some(path) = args.get("requirements").and_then(scalar_string) {
        found.pip.push(PipSource::Requirements(PathBuf::from(path)));
    }
}

fn string_or_list(value: Option<&Value>) -> Vec<String> {
    let values: Vec<String> = match value {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(v) => scalar_string(v).into_iter().collect(),
        None => Vec::new(),
    };
    values
        .into_iter()
        .filter(|v| {
            let templated = v.contains("{{");
            if templated {
                warn!("Skipping templated value {:?}", v);
            }
            !templated
        })
        .collect()
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a playbook and resolve every pip package it installs.
///
/// Relative requirements paths are resolved against the playbook's
/// directory. Referenced requirements files that do not exist are skipped
/// with a warning.
#[tracing::instrument(skip(runtime))]
pub fn load<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<PlaybookPackages, PlaybookError> {
    if !runtime.is_file(path) {
        return Err(PlaybookError::FileNotFound(path.to_path_buf()));
    }

    let content = runtime.read_to_string(path).map_err(|source| PlaybookError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let tasks = parse_playbook(&content).map_err(|source| PlaybookError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let mut packages = PlaybookPackages {
        pip: Vec::new(),
        apt: tasks.apt,
    };

    for source in tasks.pip {
        match source {
            PipSource::Package(name) => match name.parse::<RequirementSpec>() {
                Ok(spec) => packages.pip.push(spec),
                Err(e) => warn!("Skipping pip package {:?}: {}", name, e),
            },
            PipSource::Requirements(req_path) => {
                let req_path = base_dir.join(req_path);
                match RequirementsFile::read_all(runtime, &req_path) {
                    Ok(specs) => packages.pip.extend(specs),
                    Err(RequirementsError::FileNotFound(p)) => {
                        warn!("Requirements file not found: {}", p.display());
                    }
                    Err(e) => return Err(PlaybookError::Requirements(e)),
                }
            }
        }
    }

    debug!(
        "Playbook {:?}: {} pip package(s), {} apt package(s)",
        path,
        packages.pip.len(),
        packages.apt.len()
    );
    Ok(packages)
}
