//! Podcast Generator CLI
//!
//! Generates a two-speaker AI news podcast episode and publishes it to an
//! RSS feed.

use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use podcastgen_core::{
    Config, FeedOrigin, FeedPublisher, GeminiSpeech, NewsFetcher, OpenAiScriptWriter,
    PipelineEvent, PodcastPipeline, PublishReport, default_config, pack,
};
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_REPOSITORY: &str = "your-username/ai-podcast-generator";

#[derive(Parser)]
#[command(
    name = "podcastgen",
    version,
    about = "AI News Podcast Generator",
    long_about = "Fetches AI news, writes a two-speaker script, voices it, and publishes the episode to a podcast RSS feed."
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for generated scripts and audio (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Feed file to update (overrides config)
    #[arg(long, global = true, value_name = "FILE")]
    feed: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new episode (script + audio)
    Generate,
    /// Add the newest generated episode to the RSS feed
    Publish,
    /// Generate, then publish
    Run,
    /// Wrap a raw PCM file in a WAV container
    Pack {
        /// Raw PCM input file
        input: PathBuf,
        /// WAV output file
        output: PathBuf,
        /// MIME type describing the PCM data
        #[arg(long, default_value = "audio/L16;rate=24000")]
        mime: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => default_config(),
    };
    if let Some(dir) = &cli.work_dir {
        config.paths.work_dir = dir.clone();
    }
    if let Some(feed) = &cli.feed {
        config.paths.feed_file = feed.clone();
    }

    match cli.command {
        Command::Generate => {
            print_header("Generating episode");
            generate(&config).await?;
        }
        Command::Publish => {
            print_header("Updating RSS feed");
            publish(&config)?;
        }
        Command::Run => {
            print_header("Generating episode");
            generate(&config).await?;
            print_header("Updating RSS feed");
            publish(&config)?;
        }
        Command::Pack {
            input,
            output,
            mime,
        } => {
            let raw = fs::read(&input)?;
            let wav = pack(&raw, &mime);
            fs::write(&output, &wav)?;
            println!(
                "{} {} ({} bytes)",
                "Wrote".green().bold(),
                output.display(),
                wav.len()
            );
        }
    }

    Ok(())
}

async fn generate(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let api_key = env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
        eprintln!(
            "{}",
            "Warning: GEMINI_API_KEY not set. API calls may fail.".yellow()
        );
        String::new()
    });

    let mut config = config.clone();
    if let Ok(base) = env::var("SCRIPT_API_BASE") {
        config.models.script_api_base = base;
    }

    let news = NewsFetcher::new(config.news.clone())?.fetch_all().await;
    for (i, item) in news.iter().enumerate() {
        println!("  {}. {}", i + 1, item.title.bright_white());
    }

    let pipeline = PodcastPipeline::new(
        Box::new(OpenAiScriptWriter::new(config.clone(), api_key.clone())),
        Box::new(GeminiSpeech::new(config.clone(), api_key)?),
        config.paths.work_dir.clone(),
    )
    .with_callback(create_console_callback());

    let episode = pipeline.run(news, Utc::now()).await?;

    println!();
    println!("{} {}", "Script:".bold(), episode.script_file.display());
    println!("{} {}", "Audio: ".bold(), episode.audio_file.display());
    Ok(())
}

fn publish(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let repository = env::var("GITHUB_REPOSITORY").unwrap_or_else(|_| {
        eprintln!(
            "{}",
            format!(
                "Warning: GITHUB_REPOSITORY not set, using '{}'.",
                DEFAULT_REPOSITORY
            )
            .yellow()
        );
        DEFAULT_REPOSITORY.to_string()
    });

    let report = FeedPublisher::new(config.clone(), repository).publish()?;
    print_report(&report);
    Ok(())
}

fn print_header(title: &str) {
    println!();
    println!("{}", "═".repeat(60).bright_blue());
    println!("{}", format!("  {}", title).bright_blue().bold());
    println!("{}", "═".repeat(60).bright_blue());
}

fn print_report(report: &PublishReport) {
    let origin = match report.origin {
        FeedOrigin::Created => "created".green(),
        FeedOrigin::Updated => "updated".green(),
        FeedOrigin::Rebuilt => "rebuilt (previous feed was unreadable)".yellow(),
    };
    println!("{} {}", "Feed:".bold(), report.feed_file.display());
    println!("  {} {}", "State:".dimmed(), origin);
    println!("  {} {}", "Episodes:".dimmed(), report.episode_count);
    println!("  {} {}", "GUID:".dimmed(), report.guid);
    println!("  {} {}", "Audio URL:".dimmed(), report.enclosure_url);
    println!(
        "  {} {:.2} MB",
        "Audio size:".dimmed(),
        report.audio_bytes as f64 / 1024.0 / 1024.0
    );
}

/// Create a callback that prints pipeline events to the console.
fn create_console_callback() -> Box<dyn Fn(PipelineEvent) + Send + Sync> {
    Box::new(move |event| match event {
        PipelineEvent::NewsFetched { count } => {
            println!("{} {} news items", "▶".bright_cyan(), count);
        }
        PipelineEvent::ScriptReady { path, chars } => {
            println!(
                "{} Script written ({} chars) {}",
                "▶".bright_cyan(),
                chars,
                path.display().to_string().dimmed()
            );
        }
        PipelineEvent::AudioReady { path, bytes } => {
            println!(
                "{} Audio packaged ({} bytes) {}",
                "▶".bright_cyan(),
                bytes,
                path.display().to_string().dimmed()
            );
        }
    })
}
