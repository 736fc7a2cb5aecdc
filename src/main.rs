mod candidate;
mod config;
mod embedding;
mod search;
mod sources;

pub const USER_AGENT: &str = concat!("rea-rank/", env!("CARGO_PKG_VERSION"));

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing::info;

use config::{Config, ConfigError};
use search::{FormatRegistry, SearchError, SearchRequest};
use sources::SourceId;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-request HTTP timeout; the query deadline still bounds the whole run.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Search open educational resource catalogs and rank the merged results
/// by semantic similarity to the query.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Free-text query
    query: String,

    /// Maximum number of ranked results
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Drop results whose similarity is below this value (-1 to 1)
    #[arg(long, allow_negative_numbers = true)]
    min_similarity: Option<f32>,

    /// Records requested from each source
    #[arg(short, long)]
    limit: Option<usize>,

    /// Sources to query, in merge order
    #[arg(short, long, value_enum, value_delimiter = ',')]
    sources: Option<Vec<SourceId>>,

    /// Deadline for the whole query, in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Print ranked results as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(k) = self.top_k {
            config.rank.top_k = k;
        }
        if self.min_similarity.is_some() {
            config.rank.min_similarity = self.min_similarity;
        }
        if let Some(limit) = self.limit {
            config.limit = limit;
        }
        if let Some(ref sources) = self.sources {
            config.sources = sources.clone();
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("could not build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Search(#[from] SearchError),

    #[error("could not encode results: {0}")]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rea_rank=info")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<String, AppError> {
    let query = cli.query.trim();
    if query.is_empty() {
        return Err(AppError::EmptyQuery);
    }

    let config = cli.apply(Config::from_env());
    config.validate()?;

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()?;
    let sources = config.build_sources(&http);
    let embedder = config.embedder(&http);

    info!(query, sources = sources.len(), top_k = config.rank.top_k, "searching");

    let req = SearchRequest {
        query,
        limit: config.limit,
        rank: config.rank,
        timeout: config.timeout,
    };
    let ranked = search::retrieve(&sources, &embedder, &req).await?;

    if cli.json {
        Ok(search::format_json(&ranked)?)
    } else {
        Ok(FormatRegistry::default().format(&ranked))
    }
}
