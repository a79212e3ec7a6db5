use anyhow::Result;
use clap::{CommandFactory, Parser, error::ErrorKind};
use pipbatch::commands::{self, Options};
use std::path::PathBuf;
use std::process;

/// Exit code for usage errors and missing input files.
const USAGE_EXIT_CODE: i32 = 1;

/// pipbatch - parallel `pip install --no-deps` from a requirements file
///
/// Every non-blank, non-comment line of the requirements file is handed to
/// pip as-is, several installs at a time. A failing install does not stop
/// the others.
///
/// Examples:
///   pipbatch requirements.txt             # Install everything, --no-deps
///   pipbatch -j 4 requirements.txt        # At most 4 pip processes at once
///   pipbatch check requirements.txt       # Compare pins with installed versions
///   pipbatch playbook site.yml --list     # Show pip packages used by a playbook
#[derive(Parser, Debug)]
#[command(author, version = env!("PIPBATCH_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Requirements file, one package specifier per line
    #[arg(value_name = "REQUIREMENTS")]
    requirements: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install every package listed in a requirements file (the default)
    Install(InstallArgs),

    /// Compare pinned requirements against installed versions
    Check(CheckArgs),

    /// Install the pip packages named by an Ansible playbook
    Playbook(PlaybookArgs),
}

#[derive(clap::Args, Debug)]
struct InstallArgs {
    /// Requirements file, one package specifier per line
    #[arg(value_name = "REQUIREMENTS")]
    requirements: PathBuf,
}

#[derive(clap::Args, Debug)]
struct CheckArgs {
    /// Requirements file with `name==version` pins
    #[arg(value_name = "REQUIREMENTS")]
    requirements: PathBuf,

    /// Offer to install the required versions of mismatched packages
    #[arg(long)]
    install: bool,

    /// Do not ask for confirmation before installing
    #[arg(long, short = 'y', requires = "install")]
    yes: bool,
}

#[derive(clap::Args, Debug)]
struct PlaybookArgs {
    /// Ansible playbook or task file
    #[arg(value_name = "PLAYBOOK")]
    playbook: PathBuf,

    /// Only list the packages found, install nothing
    #[arg(long)]
    list: bool,
}

/// Accepted before or after the subcommand name.
#[derive(clap::Args, Debug)]
struct CommonArgs {
    /// Maximum number of concurrent pip processes (default: CPU count x 2, or 8)
    #[arg(long, short = 'j', env = "PIPBATCH_JOBS", value_name = "N", global = true)]
    jobs: Option<usize>,

    /// Installer executable (default: pip3)
    #[arg(long, env = "PIPBATCH_PIP", value_name = "PROGRAM", global = true)]
    pip: Option<String>,

    /// Extra argument passed to every `pip install` (repeatable)
    #[arg(
        long = "pip-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        global = true
    )]
    pip_args: Vec<String>,

    /// Let pip resolve and install dependencies (omit --no-deps)
    #[arg(long, global = true)]
    with_deps: bool,

    /// Exit with an error if any install fails
    #[arg(long, global = true)]
    strict: bool,

    /// Log progress of every install
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

impl From<CommonArgs> for Options {
    fn from(args: CommonArgs) -> Self {
        Options {
            jobs: args.jobs,
            pip: args.pip,
            pip_args: args.pip_args,
            with_deps: args.with_deps,
            strict: args.strict,
        }
    }
}

/// Reject a bare requirements path combined with a subcommand.
fn validate(cli: &Cli) -> Result<(), clap::Error> {
    if cli.command.is_some() && cli.requirements.is_some() {
        return Err(Cli::command().error(
            ErrorKind::ArgumentConflict,
            "a requirements path cannot be combined with a subcommand",
        ));
    }
    Ok(())
}

fn usage_error(e: clap::Error) -> ! {
    let _ = e.print();
    process::exit(USAGE_EXIT_CODE);
}

/// Parse the command line, reporting usage errors with exit code 1.
fn parse_cli() -> Cli {
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        if e.use_stderr() {
            usage_error(e);
        }
        // --help and --version
        e.exit()
    });
    if let Err(e) = validate(&cli) {
        usage_error(e);
    }
    cli
}

fn require_path(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| {
        usage_error(Cli::command().error(
            ErrorKind::MissingRequiredArgument,
            "a requirements file path is required",
        ))
    })
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_cli();
    init_logging(cli.common.verbose);
    let options: Options = cli.common.into();
    let runtime = pipbatch::runtime::RealRuntime;

    match cli.command {
        Some(Commands::Install(args)) => {
            commands::install(runtime, &args.requirements, options).await?
        }
        Some(Commands::Check(args)) => {
            commands::check(runtime, &args.requirements, args.install, args.yes, options).await?
        }
        Some(Commands::Playbook(args)) => {
            commands::playbook(runtime, &args.playbook, args.list, options).await?
        }
        None => {
            let path = require_path(cli.requirements);
            commands::install(runtime, &path, options).await?
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_bare_path_is_install() {
        let cli = Cli::try_parse_from(["pipbatch", "requirements.txt"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.requirements, Some(PathBuf::from("requirements.txt")));
        assert_eq!(cli.common.jobs, None);
        assert!(!cli.common.with_deps);
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_cli_no_arguments_parses_without_path() {
        let cli = Cli::try_parse_from(["pipbatch"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.requirements, None);
    }

    #[test]
    fn test_cli_extra_positional_fails() {
        assert!(Cli::try_parse_from(["pipbatch", "a.txt", "b.txt"]).is_err());
    }

    #[test]
    fn test_cli_install_subcommand_with_options() {
        let cli = Cli::try_parse_from([
            "pipbatch",
            "install",
            "req.txt",
            "-j",
            "4",
            "--pip",
            "/opt/venv/bin/pip",
            "--pip-arg",
            "--index-url=https://mirror/simple",
            "--strict",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Install(args)) => {
                assert_eq!(args.requirements, PathBuf::from("req.txt"));
            }
            other => panic!("Expected Install command, got {:?}", other),
        }
        let options: Options = cli.common.into();
        assert_eq!(options.jobs, Some(4));
        assert_eq!(options.pip.as_deref(), Some("/opt/venv/bin/pip"));
        assert_eq!(options.pip_args, vec!["--index-url=https://mirror/simple"]);
        assert!(options.strict);
    }

    #[test]
    fn test_cli_options_before_subcommand() {
        let cli = Cli::try_parse_from(["pipbatch", "-j", "4", "check", "req.txt"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Check(_))));
        assert_eq!(cli.common.jobs, Some(4));
        assert!(validate(&cli).is_ok());

        let cli = Cli::try_parse_from(["pipbatch", "--strict", "install", "req.txt"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Install(_))));
        assert!(cli.common.strict);

        let cli =
            Cli::try_parse_from(["pipbatch", "--pip", "pip", "playbook", "site.yml", "-v"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Playbook(_))));
        assert_eq!(cli.common.pip.as_deref(), Some("pip"));
        assert!(cli.common.verbose);
    }

    #[test]
    fn test_cli_path_with_subcommand_is_rejected() {
        let cli = Cli::try_parse_from(["pipbatch", "a.txt", "install", "b.txt"]).unwrap();
        let err = validate(&cli).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_check_parsing() {
        let cli =
            Cli::try_parse_from(["pipbatch", "check", "req.txt", "--install", "-y"]).unwrap();
        match cli.command {
            Some(Commands::Check(args)) => {
                assert_eq!(args.requirements, PathBuf::from("req.txt"));
                assert!(args.install);
                assert!(args.yes);
            }
            other => panic!("Expected Check command, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_yes_requires_install() {
        assert!(Cli::try_parse_from(["pipbatch", "check", "req.txt", "--yes"]).is_err());
    }

    #[test]
    fn test_cli_playbook_parsing() {
        let cli = Cli::try_parse_from(["pipbatch", "playbook", "site.yml", "--list"]).unwrap();
        match cli.command {
            Some(Commands::Playbook(args)) => {
                assert_eq!(args.playbook, PathBuf::from("site.yml"));
                assert!(args.list);
            }
            other => panic!("Expected Playbook command, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_check_requires_path() {
        assert!(Cli::try_parse_from(["pipbatch", "check"]).is_err());
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
