//! # corpus-forge CLI (`cforge`)
//!
//! Flattens one source into a tagged text corpus and a compressed copy.
//!
//! ## Usage
//!
//! ```bash
//! cforge [LOCATOR] [--config cforge.toml] [--out-dir DIR] [--urls]
//! ```
//!
//! ## Locators
//!
//! | Input | Source |
//! |-------|--------|
//! | `https://github.com/<owner>/<repo>[/tree/<ref>/<dir>]` | Repository contents |
//! | `https://github.com/<owner>/<repo>/pull/<n>` | Pull request, diff, comments, repository |
//! | `https://github.com/<owner>/<repo>/issues/<n>` | Issue thread, code snippets, repository |
//! | `https://arxiv.org/abs/<id>` | arXiv paper text |
//! | `10.xxxx/...` or a PubMed id | Paper via Sci-Hub |
//! | `https://www.youtube.com/watch?v=<id>` | Video transcript |
//! | `./some/dir` | Local directory |
//!
//! ## Examples
//!
//! ```bash
//! # Snapshot a repository subdirectory at a tag
//! cforge https://github.com/rust-lang/regex/tree/1.10.0/regex-syntax
//!
//! # A pull request with review comments, URL list included
//! cforge https://github.com/o/r/pull/42 --urls --out-dir ./corpus
//!
//! # A local project, debug logging
//! RUST_LOG=debug cforge ./my-project
//! ```

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::error;

use corpus_forge::config::{resolve_config, Credentials};
use corpus_forge::ingest::{run_ingest, HttpClients};
use corpus_forge::locator::SourceLocator;

/// corpus-forge: flatten repositories, pull requests, issues, papers,
/// transcripts and local folders into one tagged text corpus.
#[derive(Parser)]
#[command(
    name = "cforge",
    about = "Flatten a source into a tagged text corpus for LLM retrieval",
    version,
    long_about = "Fetches a GitHub repository, pull request or issue, an arXiv or Sci-Hub paper, \
    a YouTube transcript, or a local directory; writes it as one tagged interchange document \
    plus a normalized, compressed copy, and reports estimated token counts."
)]
struct Cli {
    /// URL, DOI/PMID or local directory to ingest. Prompted for when omitted.
    locator: Option<String>,

    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./cforge.toml` when present, otherwise built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the output files are written to.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Also write every URL found in the document to the URL list file.
    #[arg(long)]
    urls: bool,

    /// Maximum directory depth followed in remote repositories.
    #[arg(long)]
    max_depth: Option<usize>,

    /// Maximum number of files fetched from a remote repository.
    #[arg(long)]
    max_files: Option<usize>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn prompt_locator() -> Result<String> {
    if !atty::is(atty::Stream::Stdin) {
        bail!("No locator given and stdin is not a terminal");
    }
    eprint!("Enter the local or remote path for LLM context: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read locator from stdin")?;
    let line = line.trim().to_string();
    if line.is_empty() {
        bail!("No locator given");
    }
    Ok(line)
}

fn run(cli: Cli) -> Result<()> {
    let mut cfg = resolve_config(cli.config.as_deref())?;
    if let Some(dir) = cli.out_dir {
        cfg.output.dir = dir;
    }
    if cli.urls {
        cfg.output.write_urls = true;
    }
    if cli.max_depth.is_some() {
        cfg.walk.max_depth = cli.max_depth;
    }
    if let Some(max) = cli.max_files {
        if max == 0 {
            bail!("--max-files must be > 0");
        }
        cfg.walk.max_files = Some(max);
    }

    let input = match cli.locator {
        Some(locator) => locator,
        None => prompt_locator()?,
    };
    let locator = SourceLocator::classify(&input)?;

    let credentials = Credentials::from_env(&cfg.github);
    let clients = HttpClients::from_config(&cfg, &credentials)?;
    let report = run_ingest(&locator, &clients.context(&cfg))?;
    println!("{}", report);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_logging(cli.verbose);

    run(cli).inspect_err(|e| error!("{:#}", e))
}
