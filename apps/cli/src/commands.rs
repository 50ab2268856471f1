//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use brandlens_core::pipeline::{PipelineConfig, ProgressReporter, Stage, VisibilityPipeline};
use brandlens_core::scoring::{ScoringDefaults, aggregate_scores};
use brandlens_llm::LlmSuite;
use brandlens_report::ReportState;
use brandlens_scrape::SiteExtractor;
use brandlens_shared::{AppConfig, RunInput, init_config, load_config, validate_api_keys};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// BrandLens — measure brand visibility inside AI-generated search answers.
#[derive(Parser)]
#[command(
    name = "brandlens",
    version,
    about = "Measure how visible a brand is in AI-generated search answers.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full visibility pipeline for a brand.
    Run {
        /// Brand name to evaluate.
        brand: String,

        /// Brand website URL (scraped for industry/competitor context).
        url: String,

        /// Target region for query phrasing (defaults from config).
        #[arg(short, long)]
        region: Option<String>,

        /// Number of queries to generate (minimum 10).
        #[arg(short = 'n', long)]
        queries: Option<u32>,

        /// Report artifact path (defaults from config).
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Score the persisted report and print per-model score bundles as JSON.
    Report {
        /// Report artifact path (defaults from config).
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "brandlens=info",
        1 => "brandlens=debug",
        _ => "brandlens=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            brand,
            url,
            region,
            queries,
            out,
        } => {
            cmd_run(
                &brand,
                &url,
                region.as_deref(),
                queries,
                out.as_deref(),
            )
            .await
        }
        Command::Report { path } => cmd_report(path.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(
    brand: &str,
    url: &str,
    region: Option<&str>,
    queries: Option<u32>,
    out: Option<&str>,
) -> Result<()> {
    // Validate API keys before doing anything
    let config = load_config()?;
    validate_api_keys(&config)?;

    // Parse URL early for a friendly error
    let parsed_url = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;

    let input = RunInput {
        brand_name: brand.to_string(),
        website_url: parsed_url.to_string(),
        region: region
            .map(String::from)
            .unwrap_or_else(|| config.defaults.region.clone()),
        num_queries: queries.unwrap_or(config.defaults.num_queries),
    };

    let mut pipeline_config = PipelineConfig::from(&config);
    if let Some(out) = out {
        pipeline_config.report_path = PathBuf::from(out);
    }
    let report_path = pipeline_config.report_path.clone();

    info!(
        brand,
        url,
        region = %input.region,
        num_queries = input.num_queries,
        "starting visibility run"
    );

    let site = SiteExtractor::new()?;
    let models = LlmSuite::from_config(&config)?;
    let pipeline = VisibilityPipeline::new(pipeline_config, site, models);

    let reporter = CliProgress::new();
    let start = Instant::now();

    let state = pipeline.run(input, &reporter).await?;
    reporter.finish();

    let elapsed = start.elapsed();
    let records = state.records.as_deref().unwrap_or(&[]);
    let rows = state.rows.as_deref().unwrap_or(&[]);

    // Print summary
    println!();
    println!("  Visibility run complete!");
    println!("  Run:         {}", state.run_id);
    println!("  Brand:       {}", state.input.brand_name);
    println!(
        "  Industry:    {}",
        state.industry.as_deref().unwrap_or("unknown")
    );
    println!(
        "  Competitors: {}",
        state.competitors.as_deref().map(|c| c.len()).unwrap_or(0)
    );
    println!("  Queries:     {}", records.len());
    println!("  Rows:        {}", rows.len());
    println!("  Report:      {}", report_path.display());
    println!("  Time:        {:.1}s", elapsed.as_secs_f64());
    println!();
    println!("  Score it with: brandlens report");
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// report
// ---------------------------------------------------------------------------

async fn cmd_report(path: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let report_path = path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&config.defaults.report_path));

    match brandlens_report::read_rows(&report_path) {
        ReportState::Ready(rows) => {
            let defaults = ScoringDefaults::from(&config.scoring);
            let scores = aggregate_scores(&rows, defaults);
            println!("{}", serde_json::to_string_pretty(&scores)?);
            Ok(())
        }
        ReportState::NotReady => {
            println!(
                "Report not ready: no artifact at '{}'. Run `brandlens run` first.",
                report_path.display()
            );
            Ok(())
        }
        ReportState::Invalid(reason) => Err(eyre!(
            "report artifact at '{}' is invalid: {reason}",
            report_path.display()
        )),
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Stage progress rendered with an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn stage_started(&self, stage: Stage) {
        self.spinner.set_message(format!("Running {stage}"));
    }

    fn stage_completed(&self, stage: Stage, completed: usize, total: usize) {
        self.spinner
            .set_message(format!("[{completed}/{total}] {stage} done"));
    }
}
