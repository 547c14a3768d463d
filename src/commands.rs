//! Front-end handlers. Each one drives the [`Launcher`] and prints what the
//! user asked for; errors bubble up to `main` as `anyhow` errors.

use anyhow::{bail, Context};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::auth::CredentialSource;
use crate::core::state::Launcher;
use crate::core::variant::{Ecosystem, InstallProgress, VariantKey};

pub async fn list_versions(launcher: &Launcher, ecosystem: Ecosystem) -> anyhow::Result<()> {
    let listing = launcher.list_variants(ecosystem).await;
    if let Some(cause) = listing.cause {
        bail!("could not list {ecosystem} versions: {cause}");
    }

    for variant in &listing.variants {
        println!("{variant}");
    }
    info!("{} {} versions available", listing.variants.len(), ecosystem);
    Ok(())
}

/// Install and render progress until done. Ctrl-C cancels the run.
pub async fn install(launcher: &Launcher, ecosystem: Ecosystem, version: &str) -> anyhow::Result<()> {
    let key = VariantKey::new(ecosystem, version)?;
    let mut handle = launcher.spawn_install(key)?;
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = handle.progress.recv() => match event {
                Some(event) => render(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                warn!("Interrupt received, cancelling {}", handle.key);
                interrupted = true;
                handle.cancel.cancel();
            }
        }
    }

    let record = handle
        .completion
        .await
        .context("installation task panicked")??;
    println!(
        "Installed {} ({}) at {}",
        record.key,
        record.entry_point,
        record.install_path.display()
    );
    Ok(())
}

fn render(event: &InstallProgress) {
    println!("[{:>3}%] {}", event.percentage, event.message);
}

pub fn list_installed(launcher: &Launcher) -> anyhow::Result<()> {
    let records = launcher.installed()?;
    if records.is_empty() {
        println!("No versions installed");
    }
    for record in records {
        println!(
            "{:<8} {:<24} {}",
            record.key.ecosystem,
            record.key.version,
            record.install_path.display()
        );
    }
    Ok(())
}

/// Compose, start and wait for the game. Reports the exit status.
pub async fn launch(launcher: &Launcher, ecosystem: Ecosystem, version: &str) -> anyhow::Result<()> {
    let key = VariantKey::new(ecosystem, version)?;
    let invocation = launcher.compose_variant(&key)?;

    info!(
        "Starting {} with {} ({} arguments)",
        key,
        invocation.program.display(),
        invocation.args.len()
    );
    let status = tokio::process::Command::from(invocation.to_command())
        .status()
        .await
        .with_context(|| format!("failed to start {}", invocation.program.display()))?;

    match status.code() {
        Some(0) => println!("{key} exited normally"),
        Some(code) => println!("{key} exited with code {code}"),
        None => println!("{key} was terminated by a signal"),
    }
    Ok(())
}

pub fn list_mods(launcher: &Launcher) -> anyhow::Result<()> {
    let mods = launcher.mods().installed()?;
    if mods.is_empty() {
        println!("No mods installed");
    }
    for record in mods {
        println!(
            "{:<24} {:<10} {}",
            record.name,
            record.version,
            record.file_path.display()
        );
    }
    Ok(())
}

pub async fn download_mod(
    launcher: &Launcher,
    mod_id: &str,
    name: &str,
    url: &str,
    game_version: &str,
) -> anyhow::Result<()> {
    let record = launcher
        .mods()
        .install_mod(mod_id, name, url, game_version, &CancellationToken::new())
        .await?;
    println!("Saved {} to {}", record.name, record.file_path.display());
    Ok(())
}

pub fn login(launcher: &mut Launcher, username: &str) -> anyhow::Result<()> {
    if username.trim().is_empty() {
        bail!("username must not be empty");
    }
    launcher.auth_mut().login_offline(username)?;
    println!("Logged in as {} (offline)", launcher.auth().username());
    Ok(())
}

pub fn logout(launcher: &mut Launcher) -> anyhow::Result<()> {
    launcher.auth_mut().logout()?;
    println!("Logged out");
    Ok(())
}

pub fn whoami(launcher: &Launcher) {
    let auth = launcher.auth();
    if auth.is_authenticated() {
        println!("{} ({})", auth.username(), auth.identity());
    } else {
        println!("Not logged in, launching as {}", auth.username());
    }
}
