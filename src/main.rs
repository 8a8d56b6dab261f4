mod core_cli;
mod core_log;

use crate::core_cli::{Cli, Command};
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rouillevfs::config::Config;
use rouillevfs::core_auth::{AuthBackend, AuthOutcome, PasswdAuthBackend, TrustedAuthBackend};
use rouillevfs::core_digest::to_hex;
use rouillevfs::helpers::format_free_space;
use rouillevfs::{run_blocking, Session};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    core_log::init_logger(args.verbose);

    // Determine the default config path based on the OS
    let default_config_path = if cfg!(target_os = "windows") {
        "C:\\rouillevfs\\etc\\rouillevfs.toml"
    } else {
        "/etc/rouillevfs.toml"
    };

    let mut config = if args.config.is_empty() && args.base_directory.is_some() {
        Config::default()
    } else if args.config.is_empty() {
        Config::load_from_file(default_config_path)?
    } else {
        Config::load_from_file(&args.config)?
    };
    if let Some(base_directory) = args.base_directory.clone() {
        config.session.base_directory = base_directory;
    }

    let backend: Arc<dyn AuthBackend> = match &config.auth {
        Some(auth) => Arc::new(PasswdAuthBackend::load(&auth.passwd_file).with_context(|| {
            format!("Failed to load passwd file: {}", auth.passwd_file.display())
        })?),
        None => Arc::new(TrustedAuthBackend::new()),
    };
    info!("Mount point: {}", config.session.base_directory);

    let session = Session::new(Arc::new(config.session), backend).into_shared();
    let user = args.user.clone();
    let password = args.password.clone();
    run_blocking(session.clone(), move |s| {
        if s.user(&user)? == AuthOutcome::NeedPassword {
            s.pass(password.as_deref().unwrap_or_default())?;
        }
        Ok(())
    })
    .await
    .with_context(|| format!("Login failed for {}", args.user))?;

    let lines = run_blocking(session, move |s| match args.command {
        Command::Ls { path, long: true } => s.list(&path),
        Command::Ls { path, long: false } => s.nlst(&path),
        Command::Mlsd { path } => s.mlsd(&path),
        Command::Mlst { path } => s.mlst(&path).map(|line| vec![line]),
        Command::Mdtm { path } => s.mdtm(&path).map(|time| vec![time]),
        Command::Digest { path, algo } => s
            .digest(&path, &algo)
            .map(|digest| vec![format!("{} {}", to_hex(&digest), path)]),
        Command::Free => s.free_space().map(|free| vec![format_free_space(free)]),
        Command::Feat => Ok(vec![s.dir().opts().feat()]),
    })
    .await?;

    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
