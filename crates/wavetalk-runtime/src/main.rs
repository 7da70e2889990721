//! WaveTalk demo binary.
//!
//! Line-oriented chat client over the demo dataset. Simulated participants
//! type and reply in the selected chat while the prompt is idle.
//!
//! # Usage
//!
//! ```bash
//! # Default settings, session kept in ./wavetalk-data
//! wavetalk
//!
//! # Chatty participants, email login
//! wavetalk --typing-interval 2 --inbound-probability 0.8 --login-email
//! ```

use std::{
    io::{self, Write},
    path::PathBuf,
    time::Duration,
};

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wavetalk_core::{ChatEngine, Dataset, EngineConfig, LoginRule, PresenceConfig, config};
use wavetalk_runtime::{
    FileStorage, SystemEnv,
    command,
    console::{self, describe_event},
};

/// WaveTalk chat client
#[derive(Parser, Debug)]
#[command(name = "wavetalk")]
#[command(about = "Chat client over an in-memory demo dataset")]
#[command(version)]
struct Args {
    /// Directory for the persisted session record
    #[arg(long, default_value = "wavetalk-data")]
    data_dir: PathBuf,

    /// Storage key for the session record
    #[arg(long, default_value = config::DEFAULT_STORAGE_KEY)]
    storage_key: String,

    /// Log in by contact email instead of as the demo user
    #[arg(long)]
    login_email: bool,

    /// Display name the demo login resolves to
    #[arg(long, default_value = config::DEFAULT_DEMO_USER)]
    demo_user: String,

    /// Seconds between simulated typing ticks
    #[arg(long, default_value_t = config::DEFAULT_TYPING_INTERVAL.as_secs())]
    typing_interval: u64,

    /// Seconds a simulated typing flag stays set
    #[arg(long, default_value_t = config::DEFAULT_TYPING_DURATION.as_secs())]
    typing_duration: u64,

    /// Seconds between simulated inbound-message ticks
    #[arg(long, default_value_t = config::DEFAULT_INBOUND_INTERVAL.as_secs())]
    inbound_interval: u64,

    /// Chance that a typing tick fires
    #[arg(long, default_value_t = 0.9)]
    typing_probability: f64,

    /// Chance that an inbound tick delivers a message
    #[arg(long, default_value_t = 0.2)]
    inbound_probability: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        let login_rule = if self.login_email {
            LoginRule::Email
        } else {
            LoginRule::Fixed { display_name: self.demo_user.clone() }
        };
        EngineConfig {
            storage_key: self.storage_key.clone(),
            login_rule,
            presence: PresenceConfig {
                typing_interval: Duration::from_secs(self.typing_interval),
                typing_duration: Duration::from_secs(self.typing_duration),
                inbound_interval: Duration::from_secs(self.inbound_interval),
                typing_probability: self.typing_probability.clamp(0.0, 1.0),
                inbound_probability: self.inbound_probability.clamp(0.0, 1.0),
                ..PresenceConfig::default()
            },
            ..EngineConfig::default()
        }
    }
}

fn write_lines(lines: &[String]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let storage = FileStorage::open(&args.data_dir)?;
    tracing::info!(dir = %storage.root().display(), "Session storage ready");

    let engine = ChatEngine::new(SystemEnv::new(), storage, args.engine_config(), Dataset::demo());
    let restored = engine.session().current_user().map(|user| user.display_name.clone());
    let (handle, task) = wavetalk_runtime::spawn(engine);

    // Simulated activity arrives between commands.
    let mut events = handle.subscribe();
    let notifier = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Some(notice) = describe_event(&event)
                && write_lines(&[notice]).is_err()
            {
                break;
            }
        }
    });

    let greeting = match restored {
        Some(name) => format!("welcome back, {name} (/open a chat, /help for commands)"),
        None => "wavetalk: /login to start, /help for commands".to_owned(),
    };
    write_lines(&[greeting])?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = console::execute(&handle, command::parse(&line)).await?;
        write_lines(&reply.lines)?;
        if reply.quit {
            break;
        }
    }

    notifier.abort();
    drop(handle);
    task.await?;
    tracing::info!("Exited");

    Ok(())
}
