//! `form-extractor`: print the fields of a PDF or HTML form as JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use form_extractor::{Extractor, ExtractorConfig, StaticHtmlDriver};
use form_extractor_cli::{extract_with_retry, render_fields, write_output, RETRY_BACKOFF};

#[derive(Parser)]
#[command(
    name = "form-extractor",
    about = "Extract form fields from a PDF AcroForm or an HTML page as JSON",
    version,
    after_help = "References ending in .pdf are read as PDFs; anything else is loaded as a web page.\n\
                  FORM_EXTRACTOR_TIMEOUT_SECS and FORM_EXTRACTOR_MAX_ATTEMPTS set defaults for the flags below."
)]
struct Cli {
    /// URL or local path of the form.
    #[arg(long)]
    url: Option<String>,

    /// Seconds allowed for each download, navigation or page-load wait.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Attempts before giving up on a failed download or page load.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: Option<u32>,

    /// Write JSON here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit single-line JSON.
    #[arg(long)]
    compact: bool,

    /// Fetch pages over plain HTTP without launching Chromium.
    #[arg(long)]
    no_browser: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completion scripts.
    ///
    /// Example:
    ///   form-extractor completions bash > ~/.local/share/bash-completion/completions/form-extractor
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "form-extractor", &mut std::io::stdout());
        return;
    }

    let Some(reference) = cli.url.as_deref() else {
        let mut cmd = Cli::command();
        let _ = cmd.print_help();
        eprintln!("\nError: --url is required");
        std::process::exit(1);
    };

    if let Err(e) = run(&cli, reference).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, reference: &str) -> anyhow::Result<()> {
    let mut config = ExtractorConfig::from_env();
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(attempts) = cli.max_attempts {
        config = config.with_max_attempts(attempts);
    }
    tracing::debug!("using {config:?}");

    let mut extractor = Extractor::new(config);
    if cli.no_browser {
        extractor = extractor.with_driver(Arc::new(StaticHtmlDriver::new()));
    }

    let fields =
        extract_with_retry(&extractor, reference, config.max_attempts, RETRY_BACKOFF).await?;
    tracing::info!("extracted {} fields from {reference}", fields.len());

    let rendered = render_fields(&fields, cli.compact)?;
    write_output(&rendered, cli.output.as_deref())
}
