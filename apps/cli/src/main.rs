use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use mediascribe_core::backends::{
    Backends, BilibiliSearch, ChatOptimizer, Provider, WhisperTranscriber, WidthNormalizer,
    YtDlpSource,
};
use mediascribe_core::{
    BatchOrchestrator, BatchReport, Catalog, Config, FsStore, SearchOrder, SourceDescriptor,
};

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Grok,
    Openai,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Grok => Provider::Grok,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Clone, Default, ValueEnum)]
enum CliOrder {
    #[default]
    Relevance,
    Newest,
    MostPlayed,
}

impl From<CliOrder> for SearchOrder {
    fn from(cli: CliOrder) -> Self {
        match cli {
            CliOrder::Relevance => SearchOrder::Relevance,
            CliOrder::Newest => SearchOrder::Newest,
            CliOrder::MostPlayed => SearchOrder::MostPlayed,
        }
    }
}

#[derive(Parser)]
#[command(name = "mediascribe")]
#[command(
    about = "Transcribe batches of videos with Whisper and optimize the scripts with AI prompt chains"
)]
struct Cli {
    /// Video URLs or local media files
    sources: Vec<String>,

    /// Expand a keyword search into sources instead of listing them
    #[arg(long, conflicts_with = "retry_from")]
    search: Option<String>,

    /// How many search results to take
    #[arg(long, default_value_t = 5)]
    count: usize,

    /// Search result ordering
    #[arg(long, value_enum, default_value_t = CliOrder::Relevance)]
    order: CliOrder,

    /// Re-run only the failures of a prior batch report
    #[arg(long, conflicts_with = "sources")]
    retry_from: Option<PathBuf>,

    /// Optimization passes to run, in request order
    #[arg(short, long, value_delimiter = ',', default_value = "format,summary")]
    passes: Vec<String>,

    /// TOML template catalog; built-in passes are used when omitted
    #[arg(long)]
    templates: Option<PathBuf>,

    /// AI provider for optimization passes
    #[arg(long, value_enum, default_value_t = CliProvider::Grok)]
    provider: CliProvider,

    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for artifacts and the batch report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Max jobs processed in parallel
    #[arg(long)]
    concurrency: Option<usize>,

    /// Whisper model file (ggml format)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Transcription language hint (e.g. "zh", "en"); auto-detected if unset
    #[arg(long)]
    lang: Option<String>,

    /// Keep transient audio files instead of cleaning them up
    #[arg(long)]
    keep_audio: bool,
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", secs / 60.0, secs % 60.0)
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn descriptor_for(source: &str) -> SourceDescriptor {
    if source.starts_with("http://") || source.starts_with("https://") {
        SourceDescriptor::remote(source)
    } else {
        SourceDescriptor::local(source)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let provider: Provider = cli.provider.clone().into();

    // Validate API key early
    let optimizer = match ChatOptimizer::new(provider.clone()) {
        Ok(optimizer) => optimizer,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    let mut config = Config::load(cli.config.as_deref()).await?;
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(model) = cli.model {
        config.model.path = model;
    }
    if let Some(lang) = cli.lang {
        config.model.language = Some(lang);
    }
    if cli.keep_audio {
        config.keep_audio = true;
    }

    let catalog = match &cli.templates {
        Some(path) => Catalog::load(path).await?,
        None => Catalog::builtin(),
    };

    println!(
        "\n{}  {}\n",
        style("mediascribe").cyan().bold(),
        style("Batch Transcriber").dim()
    );

    let prior = match &cli.retry_from {
        Some(path) => Some(BatchReport::load(path).await?),
        None => None,
    };

    let mut sources: Vec<SourceDescriptor> = cli.sources.iter().map(|s| descriptor_for(s)).collect();
    if let Some(query) = &cli.search {
        sources.push(SourceDescriptor::SearchQuery {
            query: query.clone(),
            count: cli.count,
            order: cli.order.clone().into(),
        });
    }
    if prior.is_none() && sources.is_empty() {
        eprintln!(
            "{} no sources given (pass URLs/files, --search, or --retry-from)",
            style("Error:").red().bold()
        );
        std::process::exit(1);
    }

    let store = Arc::new(FsStore::new(config.output_dir.clone()));
    let backends = Backends {
        source: Arc::new(YtDlpSource::new(config.audio_quality)),
        stt: Arc::new(WhisperTranscriber::new()),
        normalizer: Arc::new(WidthNormalizer),
        optimizer: Arc::new(optimizer),
        search: Some(Arc::new(BilibiliSearch::new())),
    };
    let orchestrator = BatchOrchestrator::new(
        backends,
        store.clone(),
        Arc::new(catalog),
        Arc::new(config),
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!(
                    "\n{} finishing in-flight work, no new jobs will start...",
                    style("Canceling:").yellow().bold()
                );
                cancel.cancel();
            }
        });
    }

    let started = Instant::now();
    let spinner = create_spinner(&format!(
        "Processing batch with {} ({})...",
        provider.name(),
        cli.passes.join(", ")
    ));

    let report = match prior {
        Some(prior) => {
            orchestrator
                .run_failed(&prior, &cli.passes, cancel.clone())
                .await
        }
        None => orchestrator.run(sources, &cli.passes, cancel.clone()).await,
    };
    let report = match report {
        Ok(report) => report,
        Err(e) => {
            spinner.finish_and_clear();
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    spinner.finish_with_message(format!(
        "{} Batch finished {}",
        style("✓").green().bold(),
        style(format!("[{}]", format_duration(started.elapsed()))).dim()
    ));

    println!("{}", style("─".repeat(60)).dim());
    for entry in &report.succeeded {
        let marker = if entry.partial_optimization {
            style("◐").yellow().bold()
        } else {
            style("✓").green().bold()
        };
        println!(
            "{} {} {}",
            marker,
            entry.job_id,
            style(entry.descriptor.display()).dim()
        );
    }
    for entry in &report.failed {
        println!(
            "{} {} {} {}",
            style("✗").red().bold(),
            entry.job_id,
            style(format!("[{}]", entry.error_kind)).red(),
            style(&entry.error_message).dim()
        );
    }
    println!("{}", style("─".repeat(60)).dim());

    println!(
        "\n{} {} succeeded, {} failed, {} total",
        style("Done:").bold(),
        style(report.succeeded.len()).green(),
        style(report.failed.len()).red(),
        report.total
    );
    println!(
        "{} {}",
        style("Report:").dim(),
        style(store.report_path(&report).display()).cyan()
    );
    if !report.failed.is_empty() {
        println!(
            "{} mediascribe --retry-from {}",
            style("Retry failures with:").dim(),
            store.report_path(&report).display()
        );
    }

    Ok(())
}
