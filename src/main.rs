use std::path::PathBuf;

use clap::{Parser, Subcommand};

use soreon_lib::commands;
use soreon_lib::core::state::{default_data_dir, Launcher};
use soreon_lib::core::variant::Ecosystem;

#[derive(Debug, Parser)]
#[command(name = "soreon", version, about = "Install and launch Minecraft versions")]
struct Cli {
    /// Launcher data directory (settings, database, game files).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List installable versions for an ecosystem (vanilla, fabric, forge).
    Versions { ecosystem: Ecosystem },
    /// Install a version.
    Install { ecosystem: Ecosystem, version: String },
    /// List installed versions.
    Installed,
    /// Start an installed version and wait for it to exit.
    Launch { ecosystem: Ecosystem, version: String },
    #[command(subcommand)]
    Mods(ModsCommand),
    /// Store an offline profile.
    Login { username: String },
    Logout,
    Whoami,
}

#[derive(Debug, Subcommand)]
enum ModsCommand {
    List,
    /// Download a mod jar into the mods directory and register it.
    Download {
        id: String,
        name: String,
        url: String,
        #[arg(long, default_value = "any")]
        game_version: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    soreon_lib::init_tracing();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let mut launcher = Launcher::open(&data_dir)?;

    match cli.command {
        Command::Versions { ecosystem } => commands::list_versions(&launcher, ecosystem).await,
        Command::Install { ecosystem, version } => {
            commands::install(&launcher, ecosystem, &version).await
        }
        Command::Installed => commands::list_installed(&launcher),
        Command::Launch { ecosystem, version } => {
            commands::launch(&launcher, ecosystem, &version).await
        }
        Command::Mods(ModsCommand::List) => commands::list_mods(&launcher),
        Command::Mods(ModsCommand::Download {
            id,
            name,
            url,
            game_version,
        }) => commands::download_mod(&launcher, &id, &name, &url, &game_version).await,
        Command::Login { username } => commands::login(&mut launcher, &username),
        Command::Logout => commands::logout(&mut launcher),
        Command::Whoami => {
            commands::whoami(&launcher);
            Ok(())
        }
    }
}
