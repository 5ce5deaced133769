use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Courier: Telegram to AI chat bridge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the bridge (Telegram client, inbound router and HTTP control plane).
    Serve {
        /// Config file path (default: COURIER_CONFIG_PATH or ~/.courier/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from PORT, config, or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Log in to Telegram interactively and print a session string for TELEGRAM_SESSION.
    Login {
        /// Config file path (default: COURIER_CONFIG_PATH or ~/.courier/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Phone number of the account to log in (asked when omitted).
        #[arg(long, value_name = "PHONE")]
        phone: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Ok(path) = dotenvy::dotenv() {
        log::debug!("loaded environment from {}", path.display());
    }

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("courier {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Login { config, phone }) => {
            if let Err(e) = run_login(config, phone).await {
                log::error!("login failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(config_path: Option<std::path::PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = courier::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::debug!("config: {}", path.display());
    log::info!("starting courier on {}:{}", config.gateway.bind, config.gateway.port);
    courier::gateway::run_gateway(config).await
}

async fn run_login(config_path: Option<std::path::PathBuf>, phone: Option<String>) -> anyhow::Result<()> {
    let (config, _) = courier::config::load_config(config_path)?;
    let creds = courier::config::resolve_telegram_credentials(&config)?;
    let session = courier::channels::login_interactive(&creds, phone, read_line).await?;
    println!();
    println!("Login complete. Store this value as TELEGRAM_SESSION:");
    println!("{}", session);
    Ok(())
}

/// Print `prompt` and read one trimmed line from stdin.
fn read_line(prompt: &str) -> anyhow::Result<String> {
    use std::io::{self, BufRead, Write};

    let mut stdout = io::stdout();
    write!(stdout, "{}", prompt)?;
    stdout.flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        anyhow::bail!("stdin closed");
    }
    Ok(line.trim().to_string())
}
