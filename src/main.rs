//! Binary entrypoint for the clickrush CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml`
//! - `relay` - run the HTTP relay forwarder
//! - `play [--auto]` - run one session with a terminal event renderer
//! - `leaderboard` - fetch and print standings
//!
//! See the library crate docs for module-level details: `clickrush::`.
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use rand::Rng;

use clickrush::config::Config;
use clickrush::game::{start_session, SessionEvent, SubmitContext};
use clickrush::score::{LeaderboardView, LocalScoreStore, ScoreClient};
use clickrush::validation::{is_registered_user, sanitize_player_name};

#[derive(Parser)]
#[command(name = "clickrush")]
#[command(about = "Timed click-collection minigame with score relay")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a starter configuration file
    Init,
    /// Run the HTTP relay forwarder
    Relay,
    /// Play one session in the terminal
    Play {
        /// Let a bot click spawned items instead of just watching
        #[arg(long)]
        auto: bool,
    },
    /// Fetch and print the leaderboard
    Leaderboard,
}

#[ntex::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = if matches!(cli.command, Commands::Init) {
        None
    } else {
        Config::load(&cli.config).await.ok()
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            println!("Wrote starter configuration to {}", cli.config);
        }
        Commands::Relay => {
            let config = require_config(pre_config, &cli.config)?;
            config.validate()?;
            info!("Starting clickrush relay v{}", env!("CARGO_PKG_VERSION"));
            clickrush::relay::run(config.relay).await?;
        }
        Commands::Play { auto } => {
            let config = require_config(pre_config, &cli.config)?;
            config.validate()?;
            play(&config, auto).await?;
        }
        Commands::Leaderboard => {
            let config = require_config(pre_config, &cli.config)?;
            config.validate()?;
            print_leaderboard(&config).await;
        }
    }

    Ok(())
}

fn require_config(pre_config: Option<Config>, path: &str) -> Result<Config> {
    pre_config.ok_or_else(|| {
        anyhow!(
            "No readable config at {}; run `clickrush init` first",
            path
        )
    })
}

fn score_client(config: &Config) -> Arc<ScoreClient> {
    let store = LocalScoreStore::new(config.storage.data_dir.clone());
    Arc::new(ScoreClient::new(config.backend.clone(), store))
}

async fn play(config: &Config, auto: bool) -> Result<()> {
    let client = score_client(config);
    let user_name = sanitize_player_name(&config.player.user_name);
    if !is_registered_user(config.player.user_id) {
        warn!("player.user_id is not set; the submitted score is anonymous");
    }

    let submit = SubmitContext {
        client: client.clone(),
        user_id: config.player.user_id,
        user_name: user_name.clone(),
    };
    let (handle, mut events) = start_session(config.game.rules(), Some(submit));

    println!("🎮 {} is playing. Click fast!", user_name);
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Started { duration_secs } => {
                println!("Session started: {duration_secs}s on the clock");
            }
            SessionEvent::Countdown { remaining } => {
                if remaining > 0 && (remaining % 10 == 0 || remaining <= 5) {
                    println!("⏱  {remaining}s left");
                }
            }
            SessionEvent::ItemSpawned { id, item } => {
                println!("  {} appeared ({:+})", item.symbol, item.points);
                if auto {
                    // The bot hesitates like a human; some items expire first.
                    let delay = rand::thread_rng().gen_range(150..1200);
                    let bot = handle.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                        bot.click(id);
                    });
                }
            }
            SessionEvent::ScoreChanged { score, delta } => {
                println!("  {delta:+} -> score {score}");
            }
            SessionEvent::ItemRemoved { .. } => {}
            SessionEvent::Ended { summary } => {
                println!();
                println!("Final score: {}", summary.final_score);
                println!("{}", summary.tier.message());
            }
        }
    }

    // Wait out the fire-and-forget submission before reporting.
    if let Some(summary) = handle.finished().await {
        if let Some(best) = client.local_best(config.player.user_id) {
            if best.score > summary.final_score {
                println!("Your local best is still {}.", best.score);
            } else {
                println!("New local best: {}!", best.score);
            }
        }
        println!("Run `clickrush leaderboard` for the standings.");
    }
    Ok(())
}

async fn print_leaderboard(config: &Config) {
    let client = score_client(config);
    match client.leaderboard(config.player.user_id).await {
        LeaderboardView::Ranked { entries, requester } => {
            println!("🏆 Top players:");
            for entry in &entries {
                println!(
                    "{:>3}. {:<24} {:>6}  {}{}",
                    entry.rank,
                    entry.user_name,
                    entry.score,
                    entry.date,
                    if entry.is_current_user { "  <- you" } else { "" }
                );
            }
            if entries.is_empty() {
                println!("  (no results yet)");
            }
            if let Some(r) = requester {
                println!("Your rank: {} of {}", r.rank, r.total_players);
            }
        }
        LeaderboardView::LocalFallback { records } => {
            println!("⚠ Backend unreachable; local results only:");
            for (idx, record) in records.iter().enumerate() {
                println!(
                    "{:>3}. {:<24} {:>6}",
                    idx + 1,
                    record.user_name,
                    record.score
                );
            }
            if records.is_empty() {
                println!("  (no local results yet)");
            }
        }
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    if let Some(cfg) = config {
        if let Some(ref file) = cfg.logging.file {
            if let Ok(f) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
            {
                let mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
                // When stdout is a terminal, mirror log lines there as well
                let is_tty = atty::is(atty::Stream::Stdout);
                builder.format(move |fmt, record| {
                    let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                    let line = format!("{} [{}] {}", ts, record.level(), record.args());
                    if let Ok(mut guard) = mutex.lock() {
                        let _ = writeln!(guard, "{}", line);
                    }
                    if is_tty {
                        writeln!(fmt, "{}", line)
                    } else {
                        Ok(())
                    }
                });
            }
        }
    }
    let _ = builder.try_init();
}
