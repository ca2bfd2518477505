//! Subcommand dispatch: parses CLI arguments with `clap`'s derive API and
//! drives a [`pacm_package_manager::PackageManager`].
//!
//! Everything in this crate sits on the "deliberately out of scope" side of
//! the component design: the argument grammar, `init`/`run`, and the thin
//! registry-query commands are glue around the core crates, not the core
//! itself. Grounded on pacquet's `CliArgs`/`CliCommand` split (a top
//! struct carrying global flags plus a `#[clap(subcommand)]` enum), kept
//! here in one module since this rewrite's subcommand set is far smaller
//! than pnpm's.

use clap::{Parser, Subcommand};
use pacm_config::Config;
use pacm_diagnostics::enable_tracing_by_env;
use pacm_manifest::Manifest;
use pacm_package_manager::{CleanReport, InstallReport, PackageManager, RemoveReport, Warning};
use std::{env, path::PathBuf, process::ExitCode};

#[derive(Debug, Parser)]
#[command(name = "pacm", bin_name = "pacm", about = "Core of an npm-compatible package manager")]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Re-extract and re-link even if a package already appears installed.
    #[arg(short = 'f', long, global = true)]
    pub force: bool,

    /// Treat the given specs as devDependencies (install) or the dev group
    /// more generally; ignored by subcommands it doesn't apply to.
    #[arg(short = 'D', long, global = true)]
    pub dev: bool,

    /// Print the version and exit.
    #[arg(short = 'v', long, global = true)]
    pub version: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install the given specs, or the lockfile's/manifest's direct set if none are given.
    #[command(visible_aliases = ["i", "add"])]
    Install {
        /// `name[@range]` or `name@npm:alias@range` specs. Empty falls back to the lockfile/manifest.
        specs: Vec<String>,
    },
    /// Remove the given packages and anything only they needed.
    #[command(visible_aliases = ["rm", "uninstall"])]
    Remove { names: Vec<String> },
    /// Re-resolve and re-install the given names, or the full direct set if none are given.
    Update { names: Vec<String> },
    /// List the direct dependencies declared in the manifest.
    List,
    /// Create a new package.json in the current directory.
    Init,
    /// Run a script declared in package.json's `scripts` map.
    Run {
        script: String,
        #[arg(long)]
        if_present: bool,
        /// Extra arguments appended to the script's own command line.
        extra: Vec<String>,
    },
    /// Remove the tarball cache directory.
    Clean,
    /// Not implemented by this core.
    Publish,
    /// Not implemented by this core.
    Search { query: Vec<String> },
    /// Not implemented by this core.
    Info { name: Option<String> },
    /// Not implemented by this core.
    #[command(name = "self-update")]
    SelfUpdate,
}

pub async fn main() -> ExitCode {
    enable_tracing_by_env();
    miette::set_panic_hook();

    let cli = Cli::parse();
    if cli.version {
        println!("pacm {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let project_dir = match env::current_dir() {
        Ok(dir) => dir,
        Err(error) => {
            eprintln!("PACM_FS_ERROR: failed to read the current directory: {error}");
            return ExitCode::FAILURE;
        }
    };

    run(project_dir, cli).await
}

async fn run(project_dir: PathBuf, cli: Cli) -> ExitCode {
    match cli.command {
        Command::Init => match Manifest::init(&project_dir) {
            Ok(_) => ExitCode::SUCCESS,
            Err(error) => fail(&error),
        },
        Command::List => match Manifest::load(&project_dir) {
            Ok(manifest) => {
                print_dependency_list(&manifest);
                ExitCode::SUCCESS
            }
            Err(error) => fail(&error),
        },
        Command::Run { script, if_present, extra } => run_script(&project_dir, &script, if_present, &extra),
        command => {
            let manifest_registry = Manifest::load(&project_dir).ok().and_then(|m| {
                m.publish_registry().map(str::to_string)
            });
            let config = Config::current_with_manifest_registry(manifest_registry);
            let pm = PackageManager::new(project_dir, config);
            run_package_manager_command(&pm, command, cli.force, cli.dev).await
        }
    }
}

async fn run_package_manager_command(
    pm: &PackageManager,
    command: Command,
    force: bool,
    dev: bool,
) -> ExitCode {
    match command {
        Command::Install { specs } => match pm.install(specs, dev, force).await {
            Ok(report) => {
                print_install_report(&report);
                ExitCode::SUCCESS
            }
            Err(error) => fail(&error),
        },
        Command::Update { names } => match pm.update(names, force).await {
            Ok(report) => {
                print_install_report(&report);
                ExitCode::SUCCESS
            }
            Err(error) => fail(&error),
        },
        Command::Remove { names } => match pm.remove(names).await {
            Ok(report) => {
                print_remove_report(&report);
                ExitCode::SUCCESS
            }
            Err(error) => fail(&error),
        },
        Command::Clean => match pm.clean() {
            Ok(CleanReport::Removed) => {
                println!("removed the tarball cache");
                ExitCode::SUCCESS
            }
            Ok(CleanReport::AlreadyEmpty) => {
                println!("tarball cache was already empty");
                ExitCode::SUCCESS
            }
            Err(error) => fail(&error),
        },
        Command::Publish | Command::Search { .. } | Command::Info { .. } | Command::SelfUpdate => {
            eprintln!("PACM_ARGUMENT_ERROR: this command is not supported by this core");
            ExitCode::FAILURE
        }
        Command::Init | Command::List | Command::Run { .. } => {
            unreachable!("handled before a PackageManager was constructed")
        }
    }
}

fn run_script(project_dir: &std::path::Path, script_name: &str, if_present: bool, extra: &[String]) -> ExitCode {
    let manifest = match Manifest::load(project_dir) {
        Ok(manifest) => manifest,
        Err(error) => return fail(&error),
    };
    let Some(script) = manifest.script(script_name) else {
        if if_present {
            return ExitCode::SUCCESS;
        }
        eprintln!("PACM_ARGUMENT_ERROR: no script named {script_name:?} in package.json");
        return ExitCode::FAILURE;
    };

    let mut command_line = script.to_string();
    for argument in extra {
        command_line.push(' ');
        command_line.push_str(argument);
    }

    match pacm_executor::run_script(project_dir, project_dir, &command_line) {
        Ok(status) if status.success() => ExitCode::SUCCESS,
        Ok(status) => ExitCode::from(status.code().unwrap_or(1).clamp(0, 255) as u8),
        Err(error) => fail(&error),
    }
}

fn print_dependency_list(manifest: &Manifest) {
    for (name, range) in manifest.dependencies(pacm_manifest::DependencyGroup::Prod) {
        println!("{name}@{range}");
    }
    for (name, range) in manifest.dependencies(pacm_manifest::DependencyGroup::Dev) {
        println!("{name}@{range} (dev)");
    }
}

fn print_install_report(report: &InstallReport) {
    for name in &report.installed {
        println!("+ {name}");
    }
    for name in &report.already_installed {
        println!("= {name} (already installed)");
    }
    for name in &report.not_installed {
        println!("- {name} (not installed, skipped)");
    }
    print_warnings(&report.warnings);
}

fn print_remove_report(report: &RemoveReport) {
    for name in &report.removed {
        println!("- {name}");
    }
    print_warnings(&report.warnings);
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("warning[{}]: {}", warning.tag, warning.message);
    }
}

fn fail(error: &(dyn miette::Diagnostic + Send + Sync)) -> ExitCode {
    let code = error.code().map(|code| code.to_string()).unwrap_or_else(|| "PACM_ERROR".to_string());
    eprintln!("{code}: {error}");
    ExitCode::FAILURE
}
