//! CLI binary for invoice-extract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractorConfig`, runs one batch and prints the collected items.

use anyhow::{Context, Result};
use clap::Parser;
use invoice_extract::export::{self, DEFAULT_TITLE, VERIFY_NOTICE};
use invoice_extract::{
    collect_inputs, BackendKind, BatchController, BatchProgressCallback, ExtractorConfig,
    ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one ✓/✗ line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    file_start: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:32.green/238}] {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Processing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            file_start: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.file_start
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting items from {total_files} file(s)…"))
        ));
    }

    fn on_file_start(&self, current: usize, total: usize, filename: &str) {
        if let Ok(mut t) = self.file_start.lock() {
            *t = Some(Instant::now());
        }
        self.bar
            .set_message(format!("Processing {current}/{total}  {filename}"));
    }

    fn on_file_complete(&self, current: usize, total: usize, filename: &str, items: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            current,
            total,
            filename,
            dim(&format!("{items} item(s), {:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, current: usize, total: usize, filename: &str, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            current,
            total,
            filename,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, items_added: usize, error: Option<&str>) {
        self.bar.finish_and_clear();
        match error {
            None => eprintln!(
                "{} {} item(s) from {} file(s)",
                green("✔"),
                bold(&items_added.to_string()),
                total_files
            ),
            Some(e) => eprintln!("{} {}", red("✘"), e),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every receipt in a folder and show the table
  invoice-extract receipts/

  # Save a spreadsheet-ready TSV
  invoice-extract receipts/ -o items.tsv

  # Pipe TSV to the clipboard
  invoice-extract a.pdf b.jpg --tsv | pbcopy

  # Use another vision provider through edgequake-llm
  invoice-extract --backend provider --provider openai --model gpt-4.1-mini receipts/

SUPPORTED FILES:
  .pdf (first page only), .jpg, .jpeg, .png, .webp

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Gemini API key (falls back to API_KEY)
  OPENAI_API_KEY          OpenAI key for --backend provider
  ANTHROPIC_API_KEY       Anthropic key for --backend provider
  EDGEQUAKE_LLM_PROVIDER  Provider override for --backend provider
  EDGEQUAKE_MODEL         Model override for --backend provider
  PDFIUM_LIB_PATH         Directory containing libpdfium
  RUST_LOG                Log filter (overrides -v / -q)
"#;

/// Extract expense line items from invoices and receipts.
#[derive(Parser, Debug)]
#[command(
    name = "invoice-extract",
    version,
    about = "Extract expense line items from invoice PDFs and receipt photos",
    long_about = "Reads each PDF or image with a multimodal model and collects one line \
item per file (category, quantity, unit price, total). Item names are always the source \
filename, so every row can be traced back to its document.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Files and/or directories to process.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write the TSV export to this file.
    #[arg(short, long, env = "INVOICE_EXTRACT_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the TSV export to stdout instead of the table.
    #[arg(long, conflicts_with = "json")]
    tsv: bool,

    /// Print {title, items, failures, error} as JSON.
    #[arg(long)]
    json: bool,

    /// Inference backend.
    #[arg(long, env = "INVOICE_EXTRACT_BACKEND", value_enum, default_value = "gemini")]
    backend: BackendArg,

    /// Model ID.
    #[arg(long, env = "INVOICE_EXTRACT_MODEL", default_value = invoice_extract::config::DEFAULT_MODEL)]
    model: String,

    /// edgequake-llm provider for --backend provider (openai, anthropic, gemini, ollama…).
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Environment variable holding the Gemini API key.
    #[arg(long, default_value = invoice_extract::config::DEFAULT_API_KEY_ENV)]
    api_key_env: String,

    /// Gemini REST base URL.
    #[arg(long, env = "INVOICE_EXTRACT_ENDPOINT", default_value = invoice_extract::config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "INVOICE_EXTRACT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// PDF render scale (0.5–8.0).
    #[arg(long, default_value_t = 2.0)]
    scale: f32,

    /// JPEG quality for rendered PDF pages (1–100).
    #[arg(long, default_value_t = 80,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Table title.
    #[arg(long, default_value = DEFAULT_TITLE)]
    title: String,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long)]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Gemini,
    Provider,
}

impl From<BackendArg> for BackendKind {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Gemini => BackendKind::Gemini,
            BackendArg::Provider => BackendKind::Provider,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run batch ────────────────────────────────────────────────────────
    let selection = collect_inputs(&cli.inputs).context("No files to process")?;
    if !cli.quiet && !selection.skipped.is_empty() {
        eprintln!(
            "{} {} unsupported file(s) ignored",
            cyan("⚠"),
            selection.skipped.len()
        );
    }

    let controller = BatchController::new(&config).context("Failed to set up extraction")?;
    let report = controller
        .run(selection.files)
        .await
        .context("Batch failed")?;
    let state = controller.snapshot();

    // ── Output ───────────────────────────────────────────────────────────
    if let Some(ref path) = cli.output {
        export::write_tsv(path, &state.items)?;
        if !cli.quiet {
            eprintln!(
                "{}  {} item(s)  →  {}",
                green("✔"),
                state.items.len(),
                bold(&path.display().to_string())
            );
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        let doc = serde_json::json!({
            "title": state.title,
            "items": state.items,
            "failures": report.failures,
            "error": report.error,
        });
        let json = serde_json::to_string_pretty(&doc).context("Failed to serialise output")?;
        writeln!(out, "{json}").context("Failed to write to stdout")?;
    } else if cli.tsv {
        writeln!(out, "{}", export::to_tsv(&state.items)).context("Failed to write to stdout")?;
    } else if cli.output.is_none() || !state.items.is_empty() {
        let table = export::render_table(&cli.title, &state.items);
        out.write_all(table.as_bytes())
            .context("Failed to write to stdout")?;
        writeln!(out, "\n{}", dim(VERIFY_NOTICE)).context("Failed to write to stdout")?;
    }
    out.flush().ok();

    if let Some(ref err) = report.error {
        // The progress callback already printed the summary.
        if !show_progress {
            eprintln!("{}", red(err));
        }
        return Ok(ExitCode::FAILURE);
    }

    if !cli.quiet && !show_progress {
        eprintln!(
            "Extracted {} item(s) from {} file(s) in {}ms",
            report.items_added, report.files_total, report.duration_ms
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Map CLI args to `ExtractorConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractorConfig> {
    let mut builder = ExtractorConfig::builder()
        .backend(cli.backend.into())
        .model(cli.model.clone())
        .api_key_env(cli.api_key_env.clone())
        .endpoint(cli.endpoint.clone())
        .api_timeout_secs(cli.api_timeout)
        .render_scale(cli.scale)
        .jpeg_quality(cli.jpeg_quality);

    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.clone());
    }
    if let Some(ref dir) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
