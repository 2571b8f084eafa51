use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use rss_digest::config::Config;
use rss_digest::digest::build_digest;
use rss_digest::email::{render_html, render_text, send_digest};
use rss_digest::feed::health::DEFAULT_HEALTH_TIMEOUT;
use rss_digest::feed::{
    build_client, check_feed_health, collect_entries, dead_feeds, format_health_report,
    RetryPolicy,
};
use rss_digest::scheduler::run_daily;

#[derive(Parser, Debug)]
#[command(
    name = "rss-digest",
    version,
    about = "Summarize RSS/Atom feeds into a daily email digest"
)]
struct Args {
    /// Config file (default: $RSS_DIGEST_CONFIG, then ./config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the rendered HTML instead of sending it
    #[arg(long, global = true)]
    dry_run: bool,

    /// Append today's date to the subject
    #[arg(long, global = true)]
    subject_date: bool,

    /// Include a text/plain alternative body
    #[arg(long, global = true)]
    plain_text: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Fetch, summarize and send the digest once (default)
    Once,
    /// Send the digest every day at the configured time
    Schedule,
    /// Check every configured feed URL for availability
    Check,
    /// Remove unreachable feeds from the config file
    Clean {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

/// Flags that shape a single digest run.
#[derive(Debug, Clone, Copy)]
struct RunOptions {
    dry_run: bool,
    subject_date: bool,
    plain_text: bool,
}

fn digest_subject(base: &str, with_date: bool, today: NaiveDate) -> String {
    if with_date {
        format!("{} — {}", base, today.format("%Y-%m-%d"))
    } else {
        base.to_string()
    }
}

async fn run_once(config_path: &Path, client: &reqwest::Client, opts: RunOptions) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;

    let entries = collect_entries(
        client,
        &config.feeds,
        config.limits.max_per_feed,
        &RetryPolicy::default(),
    )
    .await;
    let digest = build_digest(entries, &config.limits);

    let subject = digest_subject(
        &config.email.subject,
        opts.subject_date,
        Local::now().date_naive(),
    );
    let html = render_html(&digest, &subject).context("Failed to render digest")?;
    let text = opts.plain_text.then(|| render_text(&digest, &subject));

    if opts.dry_run {
        println!("{}", html);
        return Ok(());
    }

    send_digest(&config.email, &subject, &html, text.as_deref())
        .await
        .context("Failed to send digest email")?;
    println!(
        "Sent digest with {} entries to {}",
        digest.len(),
        config.email.to.join(", ")
    );
    Ok(())
}

async fn run_schedule(config_path: &Path, client: &reqwest::Client, opts: RunOptions) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;
    if opts.dry_run {
        tracing::warn!("--dry-run is ignored by the scheduler");
    }
    let opts = RunOptions {
        dry_run: false,
        ..opts
    };

    println!(
        "Sending digest daily at {:02}:{:02}. Press Ctrl-C to stop.",
        config.schedule.hour, config.schedule.minute
    );
    // Each run reloads the config so edits take effect without a restart.
    run_daily(config.schedule.hour, config.schedule.minute, || {
        run_once(config_path, client, opts)
    })
    .await;
    Ok(())
}

async fn run_check(config_path: &Path, client: &reqwest::Client) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;
    let results = check_feed_health(client, &config.feeds, DEFAULT_HEALTH_TIMEOUT).await;
    print!("{}", format_health_report(&results));
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} (y/n) ", prompt);
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

async fn run_clean(config_path: &Path, client: &reqwest::Client, force: bool) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;

    println!("\nChecking {} feeds...", config.feeds.len());
    let results = check_feed_health(client, &config.feeds, DEFAULT_HEALTH_TIMEOUT).await;
    let dead = dead_feeds(&results);

    if dead.is_empty() {
        println!("All feeds are healthy! No cleanup needed.");
        return Ok(());
    }

    println!("\nFound {} dead feed(s):", dead.len());
    for url in &dead {
        println!("  - {}", url);
    }

    let prompt = format!(
        "\nRemove {} dead feed(s) from {}?",
        dead.len(),
        config_path.display()
    );
    if !force && !confirm(&prompt)? {
        println!("Cancelled.");
        return Ok(());
    }

    let (removed, remaining) = Config::remove_feeds(config_path, &dead)
        .with_context(|| format!("Failed to update config '{}'", config_path.display()))?;
    println!("\nUpdated {}", config_path.display());
    println!("   Removed {} feed(s)", removed);
    println!("   Active feeds: {}", remaining);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config_path = Config::resolve_path(args.config.as_deref());
    let opts = RunOptions {
        dry_run: args.dry_run,
        subject_date: args.subject_date,
        plain_text: args.plain_text,
    };
    let client = build_client().context("Failed to create HTTP client")?;

    match args.command.unwrap_or(Command::Once) {
        Command::Once => run_once(&config_path, &client, opts).await,
        Command::Schedule => run_schedule(&config_path, &client, opts).await,
        Command::Check => run_check(&config_path, &client).await,
        Command::Clean { force } => run_clean(&config_path, &client, force).await,
    }
}
