use clap::{Parser, Subcommand};
use std::path::Path;
use std::rc::Rc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::LocalSet;

use carik_dispatch::domain::entities::{Message, Sender};
use carik_dispatch::infrastructure::adapters::ConsoleAdapter;
use carik_dispatch::infrastructure::config::Config;
use carik_dispatch::infrastructure::plugins::PluginLoader;
use carik_dispatch::infrastructure::storage::MemoryStore;
use carik_dispatch::{Dispatcher, Host, PluginRegistry};

/// Prefix that turns a console line into a private message
const QUERY_PREFIX: &str = "/query ";

/// Who the console user is
const CONSOLE_SENDER: &str = "console!console@localhost";

#[derive(Parser)]
#[command(name = "carik-dispatch")]
#[command(about = "Plugin dispatch core for a chat bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch lines read from stdin
    Run {
        /// Channel console lines are posted to
        #[arg(long, default_value = "#console")]
        channel: String,

        /// JSON file with fallback messages
        #[arg(long)]
        messages: Option<String>,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { channel, messages } => run_bot(&cli.config, channel, messages),
        Commands::Version => {
            println!("carik-dispatch v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(),
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn load_config(config_path: &str) -> Config {
    if Path::new(config_path).exists() {
        let mut config = Config::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        });
        config.apply_env();
        config
    } else {
        Config::load_env()
    }
}

fn run_bot(config_path: &str, channel: String, messages: Option<String>) -> anyhow::Result<()> {
    let config = load_config(config_path);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = LocalSet::new();

    local.block_on(&rt, async move {
        let transport = Rc::new(ConsoleAdapter::from_config(&config));
        let host = Host::new(transport, Rc::new(config));
        let registry = Rc::new(PluginRegistry::new(PluginLoader::with_builtins(), host));
        registry.load_all()?;
        tracing::info!("Loaded plugins: {}", registry.names().join(", "));

        let mut dispatcher = Dispatcher::new(Rc::clone(&registry))?;
        if let Some(path) = messages {
            let store = MemoryStore::from_json_file(&path).await?;
            tracing::info!("Loaded {} fallback messages from {}", store.len().await, path);
            dispatcher = dispatcher.with_store(Rc::new(store));
        }

        run_console(Rc::new(dispatcher), &channel).await;
        registry.shutdown_all().await;
        Ok::<(), anyhow::Error>(())
    })
}

async fn run_console(dispatcher: Rc<Dispatcher>, channel: &str) {
    let settings = dispatcher.settings();
    println!(
        "carik-dispatch console - commands start with '{}', '{}<line>' sends privately, Ctrl+D quits",
        settings.command_prefix, QUERY_PREFIX
    );

    let sender = Sender::parse(CONSOLE_SENDER);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => break,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to read stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let message = match line.strip_prefix(QUERY_PREFIX) {
            Some(text) => Message::new(settings.nick.clone(), sender.clone(), text),
            None => Message::new(channel, sender.clone(), line),
        };

        let dispatcher = Rc::clone(&dispatcher);
        tokio::task::spawn_local(async move {
            let outcome = dispatcher.dispatch(&message).await;
            tracing::debug!("{} -> {:?}", message.text, outcome);
        });
    }
}

fn init_config() -> anyhow::Result<()> {
    let yaml = Config::default().to_yaml()?;
    println!("{}", yaml);
    println!("\nSave this to config.yaml and adjust as needed.");
    Ok(())
}
