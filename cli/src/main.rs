use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use spdm_cli::app_state::AppState;
use spdm_cli::commands;
use spdm_cli::readline;
use spdm_core::config;
use spdm_core::{KeyPool, MemoryStore, Role};
use tokio::sync::RwLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;

/// Set up tracing. Logs go to a daily file under `SPDM_LOG_DIR` when set,
/// stderr otherwise. The guard must live until exit to flush the file.
fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if let Ok(dir) = std::env::var("SPDM_LOG_DIR") {
        let appender = tracing_appender::rolling::daily(dir, "spdm.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer)
            .init();
        return Some(guard);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
    None
}

fn build_state() -> Result<AppState, String> {
    let config = match std::env::var("SPDM_CONFIG") {
        Ok(path) => config::load_file(&PathBuf::from(path)),
        Err(_) => config::load_config(),
    }
    .map_err(|e| e.to_string())?;

    let store_path = std::env::var("SPDM_STORE")
        .ok()
        .map(PathBuf::from)
        .or_else(config::default_store_path);
    let store = match &store_path {
        Some(path) => MemoryStore::load_json(path).map_err(|e| e.to_string())?,
        None => MemoryStore::new(),
    };

    let keys = match config::keys_dir(&config) {
        Some(dir) => KeyPool::load_dir(&dir, &config.shop.items).map_err(|e| e.to_string())?,
        None => KeyPool::new(),
    };

    AppState::new(config, Arc::new(store), store_path, keys).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let _log_guard = init_logging();
    let state = Arc::new(RwLock::new(build_state()?));

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, Arc::clone(&state)).await {
            Ok(quit) => {
                commands::save_store(&state).await;
                if quit {
                    break;
                }
            }
            Err(err) => {
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    state.write().await.logout();
    Ok(())
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    User,
    Admin,
    Owner,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::User => Role::User,
            RoleArg::Admin => Role::Admin,
            RoleArg::Owner => Role::Owner,
        }
    }
}

#[derive(Parser)]
#[command(version, about = "SPDM rewards shell")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Owners are trusted as given; the admin role comes from a stored grant
    Login {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long, value_enum, default_value = "user")]
        role: RoleArg,
    },
    Logout,
    Balance,
    AfkStart,
    AfkStop,
    AfkStatus,
    /// Simulate SECS seconds of farming at once
    AfkFastForward {
        #[arg(short, long, default_value_t = 60)]
        secs: u64,
    },
    Links,
    OpenLink {
        id: u32,
    },
    ReturnLink,
    Spin,
    Leaderboard,
    ClaimLeaderboard,
    Daily,
    Shop,
    Buy {
        item: String,
    },
    Redeem {
        code: String,
    },
    PromoCreate {
        /// Random 8 character code when omitted
        code: Option<String>,
        #[arg(short, long, default_value_t = 100)]
        amount: i64,
        #[arg(short, long)]
        max_uses: Option<u32>,
        #[arg(short, long)]
        expires_days: Option<u32>,
    },
    PromoToggle {
        id: u64,
    },
    PromoDelete {
        id: u64,
    },
    PromoList,
    /// Adjust a user's balance (admin)
    Grant {
        user: String,
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
    /// Ban a user (admin)
    Ban {
        user: String,
        #[arg(short, long, default_value = "")]
        reason: String,
    },
    Unban {
        user: String,
    },
    /// Grant or revoke the admin role (owner)
    SetAdmin {
        user: String,
        #[arg(action = clap::ArgAction::Set, default_value_t = true)]
        admin: bool,
    },
    Config,
    Exit,
}

async fn respond(line: &str, state: Arc<RwLock<AppState>>) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "spdm".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match cli.command {
        Some(Commands::Login { id, name, role }) => {
            commands::login(state, &id, name.as_deref(), role.into()).await
        }
        Some(Commands::Logout) => commands::logout(state).await,
        Some(Commands::Balance) => commands::balance(state).await,
        Some(Commands::AfkStart) => commands::afk_start(state).await,
        Some(Commands::AfkStop) => commands::afk_stop(state).await,
        Some(Commands::AfkStatus) => commands::afk_status(state).await,
        Some(Commands::AfkFastForward { secs }) => commands::afk_fast_forward(state, secs).await,
        Some(Commands::Links) => commands::list_links(state).await,
        Some(Commands::OpenLink { id }) => commands::open_link(state, id).await,
        Some(Commands::ReturnLink) => commands::return_link(state).await,
        Some(Commands::Spin) => commands::spin(state).await,
        Some(Commands::Leaderboard) => commands::leaderboard(state).await,
        Some(Commands::ClaimLeaderboard) => commands::claim_leaderboard(state).await,
        Some(Commands::Daily) => commands::daily(state).await,
        Some(Commands::Shop) => commands::shop(state).await,
        Some(Commands::Buy { item }) => commands::buy(state, &item).await,
        Some(Commands::Redeem { code }) => commands::redeem(state, &code).await,
        Some(Commands::PromoCreate {
            code,
            amount,
            max_uses,
            expires_days,
        }) => commands::promo_create(state, code, amount, max_uses, expires_days).await,
        Some(Commands::PromoToggle { id }) => commands::promo_toggle(state, id).await,
        Some(Commands::PromoDelete { id }) => commands::promo_delete(state, id).await,
        Some(Commands::PromoList) => commands::promo_list(state).await,
        Some(Commands::Grant { user, amount }) => commands::grant(state, &user, amount).await,
        Some(Commands::Ban { user, reason }) => commands::ban(state, &user, &reason).await,
        Some(Commands::Unban { user }) => commands::unban(state, &user).await,
        Some(Commands::SetAdmin { user, admin }) => {
            commands::grant_admin(state, &user, admin).await
        }
        Some(Commands::Config) => commands::show_settings(state).await,
        Some(Commands::Exit) => {
            commands::exit();
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
