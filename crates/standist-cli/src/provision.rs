//! Provision command - bootstrap the CI test environment.

use anyhow::{anyhow, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;

use standist_build::provision::{self, Provisioner};
use standist_build::HttpClient;

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Miniconda install prefix (defaults to ~/miniconda)
    #[arg(long)]
    prefix: Option<PathBuf>,

    /// Name of the environment to create
    #[arg(long, default_value = "standalone-test")]
    env_name: String,
}

pub async fn execute(args: ProvisionArgs) -> Result<i32> {
    // 2.7 selects the Python-2 installer, anything else the Python-3 one
    let python_version =
        std::env::var("PYTHON_VERSION").unwrap_or_else(|_| String::from("3.7"));
    let prefix = match args.prefix {
        Some(prefix) => prefix,
        None => provision::default_prefix()
            .ok_or_else(|| anyhow!("could not determine home directory"))?,
    };

    let http = Arc::new(HttpClient::new()?);
    let provisioner = Provisioner::new(http, prefix, args.env_name.clone(), python_version);
    provisioner.provision().await?;

    println!(
        "{} environment {} ready",
        style("Success:").green().bold(),
        args.env_name
    );
    Ok(0)
}
