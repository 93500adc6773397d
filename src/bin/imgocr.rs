//! CLI binary for edgequake-ocr.
//!
//! A thin shim over the library crate: it plays the part of the upload
//! form, maps flags to `OcrConfig`, owns the `Session`, and writes the
//! offered downloads to the output directory.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_ocr::pipeline::input::{format_size_mb, total_size};
use edgequake_ocr::secrets::DEFAULT_SECRETS_FILE;
use edgequake_ocr::{
    resolve_api_key, resolve_inputs, run_batch, BatchProgressCallback, ContentCategory, OcrConfig,
    OcrError, Outcome, OutputFormat, ProgressCallback, Session, SpreadsheetOffer, VisionExtractor,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a progress bar plus one log line per image.
struct CliProgressCallback {
    bar: ProgressBar,
    started: std::sync::Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: std::sync::Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total} image(s)…"))
        ));
    }

    fn on_image_start(&self, index: usize, total: usize, name: &str) {
        if let Ok(mut t) = self.started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("{name} ({index}/{total})"));
    }

    fn on_image_complete(&self, index: usize, total: usize, name: &str, text_len: usize) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let secs = self.elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}  {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _total: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # A photographed table to CSV (writes ./ocr_result.csv)
  imgocr receipt.jpg

  # Several pages of a table as Markdown, plus ./out/ocr_result.xlsx
  imgocr --category table --format md page1.png page2.png -o out

  # Keep the original layout as plain text
  imgocr --category raw-text --format txt scan.bmp

  # Re-export an edited Markdown result to XLSX without calling the API
  imgocr --from-text ocr_result.md --format md

CONTENT CATEGORIES:
  table      Tables and slips
  document   General prose
  raw-text   Keep the original layout

OUTPUT FORMATS:
  csv   Delimited values (ocr_result.csv)
  txt   Plain text (ocr_result.txt)
  md    Markdown (ocr_result.md); tables also saved as ocr_result.xlsx

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY          API key (checked first)
  GEMINI_API_KEY          API key (checked second)
  IMGOCR_SECRETS          Secrets file holding GOOGLE_API_KEY = "..." (default secrets.toml)
  IMGOCR_MODEL            Override model ID
"#;

/// Extract text from images using a Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "imgocr",
    version,
    about = "Extract text from images using Vision LLMs",
    long_about = "Send PNG, JPEG or BMP images to a Vision Language Model with an instruction \
chosen by content category and output format, and save the result as CSV, text or Markdown. \
Markdown tables can additionally be saved as an XLSX spreadsheet.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image files (PNG, JPEG, BMP) or HTTP/HTTPS URLs, processed in order.
    #[arg(required_unless_present = "from_text")]
    inputs: Vec<String>,

    /// Kind of content in the images.
    #[arg(long, env = "IMGOCR_CATEGORY", value_enum, default_value = "table")]
    category: CategoryArg,

    /// Output format.
    #[arg(short, long, env = "IMGOCR_FORMAT", value_enum, default_value = "csv")]
    format: FormatArg,

    /// Directory the result files are written to.
    #[arg(short, long, env = "IMGOCR_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Re-export an existing (edited) result file instead of running OCR.
    #[arg(long, conflicts_with = "inputs")]
    from_text: Option<PathBuf>,

    /// Secrets file holding GOOGLE_API_KEY.
    #[arg(long, env = "IMGOCR_SECRETS", default_value = DEFAULT_SECRETS_FILE)]
    secrets: PathBuf,

    /// LLM provider name.
    #[arg(long, env = "IMGOCR_PROVIDER", default_value = "gemini")]
    provider: String,

    /// Vision model ID.
    #[arg(long, env = "IMGOCR_MODEL", default_value = "gemini-2.5-flash")]
    model: String,

    /// Combined upload size limit in MiB.
    #[arg(long, env = "IMGOCR_MAX_TOTAL_MB", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..=1024))]
    max_total_mb: u64,

    /// Max LLM output tokens per image.
    #[arg(long, env = "IMGOCR_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "IMGOCR_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Per-image LLM call timeout in seconds.
    #[arg(long, env = "IMGOCR_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "IMGOCR_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Also print the result text to stdout.
    #[arg(long)]
    stdout: bool,

    /// Print the batch report as JSON instead of the summary.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "IMGOCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMGOCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMGOCR_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CategoryArg {
    Table,
    Document,
    RawText,
}

impl From<CategoryArg> for ContentCategory {
    fn from(v: CategoryArg) -> Self {
        match v {
            CategoryArg::Table => ContentCategory::Table,
            CategoryArg::Document => ContentCategory::Document,
            CategoryArg::RawText => ContentCategory::RawText,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Csv,
    Txt,
    Md,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Txt => OutputFormat::Txt,
            FormatArg::Md => OutputFormat::Md,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.from_text.is_none();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let runtime = || {
        tokio::runtime::Runtime::new().context("Failed to create tokio runtime")
    };

    // ── Re-export mode: no API call, no credential needed ────────────────
    if let Some(ref path) = cli.from_text {
        return runtime()?.block_on(reexport(&cli, path));
    }

    // ── Credential: fatal when missing, before any input is read ─────────
    let key = match resolve_api_key(&cli.secrets) {
        Ok(key) => key,
        Err(e @ OcrError::MissingCredential { .. }) => {
            eprintln!("{} {}", red("✘"), e);
            std::process::exit(2);
        }
        Err(e) => return Err(e).context("Failed to load API key"),
    };
    // Before the runtime spawns its worker threads.
    key.export_for_provider();

    runtime()?.block_on(run(&cli, show_progress))
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    let category: ContentCategory = cli.category.into();
    let format: OutputFormat = cli.format.into();

    // ── Select images ────────────────────────────────────────────────────
    let images = resolve_inputs(&cli.inputs, cli.download_timeout)
        .await
        .context("Failed to read images")?;
    let total_bytes = total_size(&images);
    if !cli.quiet {
        eprintln!(
            "{} {} file(s) selected (total {})",
            cyan("ℹ"),
            images.len(),
            format_size_mb(total_bytes)
        );
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(cli, progress_cb)?;

    // ── Run batch ────────────────────────────────────────────────────────
    let report = match run_batch_with(&config, &images, category, format).await {
        Ok(report) => report,
        Err(e @ OcrError::UploadTooLarge { .. }) => {
            eprintln!(
                "{} Total upload size {} exceeds {} MB. Remove some files and try again.",
                yellow("⚠"),
                format_size_mb(total_bytes),
                cli.max_total_mb
            );
            return Err(e).context("Upload rejected");
        }
        Err(e) => return Err(e).context("Extraction failed"),
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    }

    let mut session = Session::new();
    session.apply(&report);

    // ── Summary ──────────────────────────────────────────────────────────
    if !cli.quiet && !cli.json {
        match report.outcome {
            Outcome::Success => eprintln!(
                "{} Processed {} file(s)  {}",
                green("✔"),
                bold(&report.total_images.to_string()),
                dim(&format!("{}ms", report.duration_ms)),
            ),
            Outcome::PartialFailure => eprintln!(
                "{} {}/{} file(s) produced text  ({} skipped)",
                yellow("⚠"),
                bold(&report.succeeded.to_string()),
                report.total_images,
                red(&report.failures.len().to_string()),
            ),
            Outcome::NoResults => eprintln!(
                "{} Processing finished, but no text could be extracted.",
                yellow("⚠")
            ),
        }
        if !show_progress {
            for failure in &report.failures {
                eprintln!("  {} {}", red("✗"), failure);
            }
        }
    }

    write_downloads(cli, &session).await
}

async fn run_batch_with(
    config: &OcrConfig,
    images: &[edgequake_ocr::UploadedImage],
    category: ContentCategory,
    format: OutputFormat,
) -> Result<edgequake_ocr::BatchReport, OcrError> {
    let extractor = VisionExtractor::from_config(config)?;
    run_batch(&extractor, images, category, format, config).await
}

/// Load an edited result file and write its downloads again.
async fn reexport(cli: &Cli, path: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read result file {:?}", path))?;
    // Our own text downloads start with a BOM.
    let text = raw.strip_prefix('\u{FEFF}').unwrap_or(&raw);

    let session = Session::from_text(text, cli.format.into());
    write_downloads(cli, &session).await
}

/// Write whatever the session offers into the output directory.
async fn write_downloads(cli: &Cli, session: &Session) -> Result<()> {
    let Some(text) = session.text_download() else {
        return Ok(());
    };

    let path = text
        .write_to(&cli.output_dir)
        .await
        .context("Failed to save result")?;
    if !cli.quiet {
        eprintln!("   → {}", bold(&path.display().to_string()));
    }

    if cli.stdout {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(session.result_text().as_bytes())
            .context("Failed to write to stdout")?;
    }

    match session.spreadsheet_offer().context("Failed to build spreadsheet")? {
        SpreadsheetOffer::Ready(workbook) => {
            let path = workbook
                .write_to(&cli.output_dir)
                .await
                .context("Failed to save spreadsheet")?;
            if !cli.quiet {
                eprintln!("   → {}", bold(&path.display().to_string()));
            }
        }
        SpreadsheetOffer::TableNotFound => {
            if !cli.quiet {
                eprintln!(
                    "{} No Markdown table found. A spreadsheet needs table rows such as | col1 | col2 |.",
                    yellow("⚠")
                );
            }
        }
        SpreadsheetOffer::NotApplicable => {}
    }

    Ok(())
}

/// Map CLI args to `OcrConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<OcrConfig> {
    let mut builder = OcrConfig::builder()
        .max_total_bytes(cli.max_total_mb * 1024 * 1024)
        .provider_name(cli.provider.clone())
        .model(cli.model.clone())
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
