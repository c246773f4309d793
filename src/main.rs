//! CLI entry point for `mailman-rss`.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use mailman_rss::config::{self, Config};
use mailman_rss::error::FeedError;
use mailman_rss::fetch::HttpFetcher;
use mailman_rss::parser::decode::MessageEncoding;
use mailman_rss::pipeline::{self, FeedOptions};

#[derive(Parser)]
#[command(
    name = "mailman-rss",
    version,
    about = "Generate an RSS 2.0 feed from a Mailman web archive"
)]
struct Cli {
    /// Archive base URL (the page listing the monthly archives)
    #[arg(value_name = "ARCHIVE_URL")]
    url: String,

    /// Number of messages in the feed; zero or less gives an empty feed [default: 25]
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    count: Option<i64>,

    /// Charset of the archived messages, e.g. ascii, utf-8, euc-jp [default: ascii]
    #[arg(short, long, value_name = "CHARSET")]
    encoding: Option<String>,

    /// Channel language tag [default: ja-JP]
    #[arg(long, value_name = "LANG")]
    language: Option<String>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors exit 1; --help and --version exit 0.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, config.general.log_file.as_deref());

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(FeedError::NoMonthArchives(_)) = e.downcast_ref::<FeedError>() {
                println!("ERROR: {e}");
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let label = cli.encoding.as_deref().unwrap_or(&config.feed.encoding);
    let options = FeedOptions {
        count: cli.count.map_or(config.feed.count, clamp_count),
        encoding: MessageEncoding::from_label(label)?,
        language: cli
            .language
            .clone()
            .unwrap_or_else(|| config.feed.language.clone()),
        month_format: config.feed.permalink_month_format.clone(),
        max_bytes: config.fetch.max_bytes,
    };

    let fetcher = HttpFetcher::new(&config.fetch).context("Failed to set up HTTP client")?;
    let xml = pipeline::build_feed(&fetcher, &cli.url, &options, &pipeline::build_time())?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(xml.as_bytes())
        .and_then(|()| stdout.flush())
        .context("Failed to write feed to stdout")?;
    Ok(())
}

/// Negative counts select nothing; counts beyond `usize` select everything.
fn clamp_count(count: i64) -> usize {
    usize::try_from(count.max(0)).unwrap_or(usize::MAX)
}

/// Set up tracing on stderr (stdout carries the feed) and, when configured,
/// a log file.
fn setup_logging(level: &str, log_file: Option<&Path>) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let file_target = log_file.and_then(|path| {
        let name = path.file_name()?.to_owned();
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).ok()?;
        Some((dir.to_path_buf(), name))
    });

    if let Some((dir, name)) = file_target {
        let file_appender = tracing_appender::rolling::never(dir, name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}
