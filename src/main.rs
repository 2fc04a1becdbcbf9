use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use daycast::config::{DEFAULT_PORT, DEFAULT_SERVICE_ACCOUNT_PATH, LoadOptions};
use daycast::voice::{AudioPlayback, BRIEFING_PCM};
use daycast::{AudioSink, Config, Daemon, RunOutcome};

/// daycast - spoken daily briefings
#[derive(Parser)]
#[command(name = "daycast", version, about)]
struct Cli {
    /// Briefing document (JSON, or TOML by extension)
    #[arg(short, long, env = "DAYCAST_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Weather API key
    #[arg(long, env = "WEATHER_API_KEY", hide_env_values = true)]
    weather_api_key: Option<String>,

    /// Gemini API key (falls back to `GOOGLE_API_KEY`)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Google service account key used for calendar access
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS", default_value = DEFAULT_SERVICE_ACCOUNT_PATH)]
    service_account: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve `GET /day` (default)
    Serve,
    /// Produce one briefing now and wait for it to finish playing
    Run,
    /// Print the briefing context without generating anything
    Context,
    /// Play a test tone in the briefing audio format
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is normal
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "info,daycast=info",
        1 => "info,daycast=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(mut cli: Cli) -> anyhow::Result<()> {
    match cli.command.take().unwrap_or(Command::Serve) {
        Command::Serve => daemon(cli)?.run().await?,
        Command::Run => run_once(&daemon(cli)?).await?,
        Command::Context => print_context(&daemon(cli)?).await?,
        Command::TestSpeaker => test_speaker().await?,
    }

    Ok(())
}

/// Load configuration and wire the production collaborators
fn daemon(cli: Cli) -> anyhow::Result<Daemon> {
    let config = Config::load(LoadOptions {
        config_path: cli.config,
        port: cli.port,
        weather_api_key: cli.weather_api_key,
        gemini_api_key: cli
            .gemini_api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok()),
        service_account_path: cli.service_account,
    })?;
    tracing::debug!(?config, "loaded configuration");

    Ok(Daemon::new(&config)?)
}

/// One briefing in the foreground
async fn run_once(daemon: &Daemon) -> anyhow::Result<()> {
    let pipeline = daemon.pipeline();
    let run = pipeline.aggregate(&Local::now()).await?;

    match pipeline.generate_and_play(run.context).await {
        RunOutcome::Completed { text } => {
            println!("{text}");
            Ok(())
        }
        RunOutcome::Aborted { stage, error } => {
            anyhow::bail!("briefing aborted while {stage}: {error}")
        }
    }
}

/// Print the aggregated context as pretty JSON
async fn print_context(daemon: &Daemon) -> anyhow::Result<()> {
    let run = daemon.pipeline().aggregate(&Local::now()).await?;

    println!("{}", serde_json::to_string_pretty(&run.context)?);
    Ok(())
}

/// Play two seconds of a 440 Hz tone through the briefing playback path
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!(
        "You should hear a 440Hz tone for 2 seconds ({} Hz, mono, 16-bit)\n",
        BRIEFING_PCM.sample_rate
    );

    let frequency = 440.0_f32;
    let num_samples = BRIEFING_PCM.sample_rate * 2;

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let pcm: Vec<u8> = (0..num_samples)
        .flat_map(|i| {
            let t = i as f32 / BRIEFING_PCM.sample_rate as f32;
            let sample = (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3;
            ((sample * f32::from(i16::MAX)) as i16).to_le_bytes()
        })
        .collect();

    let sink: Arc<dyn AudioSink> = Arc::new(AudioPlayback::new());
    tokio::task::spawn_blocking(move || sink.play(&pcm, BRIEFING_PCM)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}
