//! Rhymer CLI
//!
//! Crawls the rhyme corpus and answers rhyme queries over it.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rhymer::{
    error::{AppError, Result},
    models::Config,
    pipeline, server,
    services::CancelToken,
    storage::CsvStorage,
    utils::HttpTransport,
};

/// Rhymer - rhyme corpus crawler and query server
#[derive(Parser, Debug)]
#[command(name = "rhymer", version, about = "Rhyme corpus crawler and query server")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "rhymer.toml")]
    config: PathBuf,

    /// Corpus CSV file (overrides corpus.path)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl rhyme pages and append them to the corpus
    Crawl {
        /// Seconds to pause after each prefix
        #[arg(long)]
        sleep: Option<f64>,

        /// Crawl only these prefixes instead of the configured range
        #[arg(long = "prefix")]
        prefixes: Vec<String>,
    },

    /// Serve get_rhymes / get_available_words over stdio
    Serve {
        /// Fixed RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print rhymes for a word
    Rhymes {
        word: String,

        /// Maximum number of results (default: query.default_top_k)
        #[arg(short = 'k', long, allow_negative_numbers = true, conflicts_with = "all")]
        top_k: Option<i64>,

        /// Return every candidate
        #[arg(long)]
        all: bool,

        /// Fixed RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print a random sample of words with enough rhymes
    Words {
        /// Sample size (default: query.default_sample)
        #[arg(short, long, allow_negative_numbers = true)]
        n: Option<i64>,

        /// Fixed RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Validate configuration
    Validate,

    /// Show corpus info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Cancel the token on Ctrl-C; the crawl stops at the next group boundary.
fn cancel_on_ctrl_c(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after the current group...");
            cancel.cancel();
        }
    });
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        log::debug!("{} not found, using defaults", cli.config.display());
        Config::default()
    };
    if let Some(path) = cli.corpus {
        config.corpus.path = path;
    }

    match cli.command {
        Command::Crawl { sleep, prefixes } => {
            if let Some(secs) = sleep {
                config.crawler.sleep_secs = secs;
            }
            config.validate()?;

            let prefixes = if prefixes.is_empty() {
                config.prefixes.generate()
            } else {
                prefixes
            };
            if prefixes.iter().any(|p| p.trim().is_empty()) {
                return Err(AppError::config("empty --prefix"));
            }

            let transport = Arc::new(HttpTransport::from_config(&config.crawler)?);
            let storage = CsvStorage::new(&config.corpus.path);
            let cancel = CancelToken::new();
            cancel_on_ctrl_c(cancel.clone());

            let report =
                pipeline::run_crawler(&config, transport, &storage, &prefixes, cancel).await?;
            if report.cancelled {
                log::warn!("Crawl interrupted; completed groups are saved.");
            } else {
                log::info!("Crawl complete!");
            }
        }

        Command::Serve { seed } => {
            if seed.is_some() {
                config.query.seed = seed;
            }
            let engine = pipeline::load_engine(&config.corpus.path, config.query.clone())?;
            server::serve_stdio(&engine).await?;
        }

        Command::Rhymes {
            word,
            top_k,
            all,
            seed,
        } => {
            if seed.is_some() {
                config.query.seed = seed;
            }
            let top_k = if all {
                None
            } else {
                Some(top_k.unwrap_or(config.query.top_k_arg()))
            };
            let engine = pipeline::load_engine(&config.corpus.path, config.query.clone())?;
            for (rhyme, reading) in engine.get_rhymes(&word, top_k)? {
                println!("{rhyme}\t{reading}");
            }
        }

        Command::Words { n, seed } => {
            if seed.is_some() {
                config.query.seed = seed;
            }
            let n = n.unwrap_or(config.query.sample_arg());
            let engine = pipeline::load_engine(&config.corpus.path, config.query.clone())?;
            for word in engine.get_available_words(n)? {
                println!("{word}");
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            pipeline::run_validate(&config)?;
            log::info!("All validations passed!");
        }

        Command::Info => {
            let path = &config.corpus.path;
            log::info!("Corpus: {}", path.display());
            if !path.exists() {
                log::info!("No corpus found yet. Run 'crawl' first.");
                return Ok(());
            }
            let info = pipeline::corpus_info(path, config.query.min_candidates)?;
            log::info!("Target words: {}", info.target_words);
            log::info!("Rhyme candidates: {}", info.candidates);
            log::info!(
                "Words with >= {} candidates: {}",
                config.query.min_candidates,
                info.available_words
            );
        }
    }

    Ok(())
}
