mod build;
mod install;
mod provision;
mod subs;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use standist_build::cli::{Output, Verbosity};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "standist")]
#[command(about = "Assemble a standalone distributable archive and manage its build environment")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Path to the dist manifest, relative to the project root
    #[arg(long, global = true, default_value = "dist.json")]
    manifest: PathBuf,

    /// Project root directory
    #[arg(long, global = true, default_value = ".")]
    project_root: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full assembly pipeline
    Build(build::BuildArgs),

    /// Remove stale submodule-derived directories, then init, update and
    /// sync all configured submodules
    SetupSubs,

    /// Copy configured submodule subtrees into their consumption locations
    SyncSubs,

    /// Fast-forward each configured submodule to its upstream head
    PullSubs,

    /// Sync submodules, then run the configured installer
    Install,

    /// Provision the CI test environment
    Provision(provision::ProvisionArgs),

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    match run(args).await {
        Ok(code) => ExitCode::from(code.clamp(0, u8::MAX as i32) as u8),
        Err(err) => {
            Output::new(Verbosity::default()).error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<i32> {
    let Args {
        command,
        manifest,
        project_root,
    } = args;
    log::debug!("project root {}", project_root.display());

    match command {
        Commands::Build(build_args) => build::execute(&project_root, &manifest, build_args).await,
        Commands::SetupSubs => subs::setup(&project_root, &manifest),
        Commands::SyncSubs => subs::sync(&project_root, &manifest),
        Commands::PullSubs => subs::pull(&project_root, &manifest),
        Commands::Install => install::execute(&project_root, &manifest),
        Commands::Provision(provision_args) => provision::execute(provision_args).await,
        Commands::Completions { shell } => {
            let mut cmd = Args::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(0)
        }
    }
}
