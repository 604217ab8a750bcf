//! CLI binary for page2md.
//!
//! Maps CLI flags to `ReconstructConfig`, serves the layout engine's JSON
//! dumps through `PrecomputedResults`, and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use page2md::{
    reconstruct_document, DocumentArtifact, EventSink, PageSelection, PrecomputedResults,
    ReconstructConfig, ReconstructionEvents, SkipReason, SkippedBlock,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Progress bar ─────────────────────────────────────────────────────────────

/// Live progress bar plus one log line per page.
struct CliEvents {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    figures: AtomicUsize,
    skipped_figures: AtomicUsize,
}

impl CliEvents {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Rasterising input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            figures: AtomicUsize::new(0),
            skipped_figures: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn page_line(&self, mark: String, page_num: usize, total: usize, detail: String) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            mark,
            page_num,
            total,
            detail,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }
}

fn truncate(msg: &str) -> String {
    if msg.chars().count() > 80 {
        let head: String = msg.chars().take(79).collect();
        format!("{head}\u{2026}")
    } else {
        msg.to_string()
    }
}

/// One warning line per image block that produced no file.
fn skip_line(skipped: &SkippedBlock) -> String {
    let reason = match skipped.reason {
        SkipReason::NoPixelsOrBox => "no pixels and no box",
        SkipReason::EmptyCrop => "box is empty after clamping",
    };
    let reference = skipped
        .original_reference
        .as_deref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default();
    format!(
        "Skipped figure {:02} on page {} sub-page {}{}: {}",
        skipped.figure_index, skipped.page_num, skipped.subpage_num, reference, reason
    )
}

impl ReconstructionEvents for CliEvents {
    fn on_document_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Reconstructing");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reconstructing {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_figure_saved(&self, _figure: &page2md::ExportedFigure) {
        self.figures.fetch_add(1, Ordering::Relaxed);
    }

    fn on_figure_skipped(&self, skipped: &SkippedBlock) {
        self.skipped_figures.fetch_add(1, Ordering::Relaxed);
        self.bar.println(format!("    {} {}", yellow("–"), dim(&skip_line(skipped))));
    }

    fn on_markdown_saved(&self, artifact: &DocumentArtifact) {
        self.bar.set_message(format!(
            "page {} · {}",
            artifact.page_num,
            artifact
                .markdown_path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
        ));
    }

    fn on_page_skipped(&self, page_num: usize, total_pages: usize, reason: &str) {
        self.page_line(yellow("–"), page_num, total_pages, yellow(&truncate(reason)));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, subpages: usize) {
        self.page_line(
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{subpages:>2} sub-page(s)")),
        );
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        self.page_line(red("✗"), page_num, total_pages, red(&truncate(error)));
    }

    fn on_document_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();
        let figures = self.figures.load(Ordering::Relaxed);
        let skipped = self.skipped_figures.load(Ordering::Relaxed);

        if failed == 0 {
            eprintln!(
                "{} {} pages reconstructed, {} figures ({} skipped)",
                green("✔"),
                bold(&success_count.to_string()),
                figures,
                skipped
            );
        } else {
            eprintln!(
                "{} {}/{} pages reconstructed  ({} failed or skipped)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Single image with its engine result
  page2md -i scan.png -r scan.json

  # PDF with one result file per page (page_0001.json, page_0002.json, …)
  page2md -i paper.pdf -r results/ -o out

  # Only pages 3 to 5, JSON report on stdout
  page2md -i paper.pdf -r results/ --pages 3-5 --json > report.json

OUTPUT LAYOUT:
  <out-dir>/output_md/page_0001_01.md
  <out-dir>/output_images/page_0001_01_img_01.png
  <out-dir>/output_images/page_0001_01_img_02_fallback.png

  Image links in each Markdown file are rewritten to paths relative to
  output_md/, e.g. ../output_images/page_0001_01_img_01.png.

ENVIRONMENT VARIABLES:
  PAGE2MD_*        Every flag, e.g. PAGE2MD_OUT_DIR, PAGE2MD_DPI
  PDFIUM_LIB_PATH  Directory containing libpdfium (PDF inputs only)
  RUST_LOG         Overrides the log filter, e.g. RUST_LOG=page2md=debug
"#;

/// Rebuild Markdown pages and figures from layout-engine results.
#[derive(Parser, Debug)]
#[command(
    name = "page2md",
    version,
    about = "Rebuild Markdown pages and figures from layout-engine results",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or image the engine was run on.
    #[arg(short, long, env = "PAGE2MD_INPUT_DOCUMENT")]
    input_document: PathBuf,

    /// Engine results: a JSON file (page 1) or a directory of page_####.json.
    #[arg(short, long, env = "PAGE2MD_RESULTS")]
    results: PathBuf,

    /// Output root; Markdown and figures go to output_md/ and output_images/.
    #[arg(short, long, env = "PAGE2MD_OUT_DIR", default_value = "./output")]
    out_dir: PathBuf,

    /// PDF rendering DPI; must match the DPI the engine saw.
    #[arg(long, env = "PAGE2MD_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PAGE2MD_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAGE2MD_PASSWORD")]
    password: Option<String>,

    /// Print the reconstruction report as JSON on stdout.
    #[arg(long, env = "PAGE2MD_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PAGE2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGE2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGE2MD_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO lines would tear through the progress bar, so they are only on
    // when the bar is off.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    let engine = PrecomputedResults::open(&cli.results).context("Failed to open engine results")?;

    let events: Option<EventSink> = if show_progress {
        Some(CliEvents::new() as Arc<dyn ReconstructionEvents>)
    } else {
        None
    };
    let config = build_config(&cli, events)?;

    let report = reconstruct_document(&cli.input_document, &engine, &config)
        .context("Reconstruction failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        let stats = &report.stats;
        let selected = stats.processed_pages + stats.failed_pages + stats.skipped_pages;
        eprintln!(
            "{}  {}/{} pages  {} md  {}+{} figures  {}ms  →  {}",
            if stats.failed_pages + stats.skipped_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.processed_pages,
            selected,
            stats.subpages,
            stats.figures_direct,
            stats.figures_fallback,
            stats.total_duration_ms,
            bold(&cli.out_dir.display().to_string()),
        );
        for page in report.pages.iter().filter(|p| !p.is_success()) {
            if let Some(ref e) = page.error {
                eprintln!("   {}", dim(&e.to_string()));
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ReconstructConfig`.
fn build_config(cli: &Cli, events: Option<EventSink>) -> Result<ReconstructConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ReconstructConfig::builder()
        .out_dir(&cli.out_dir)
        .dpi(cli.dpi)
        .pages(pages);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(sink) = events {
        builder = builder.events(sink);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!("Invalid page range '{}-{}': start must be <= end", start, end);
        }
        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }
        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pages_forms() {
        assert!(matches!(parse_pages("all").unwrap(), PageSelection::All));
        assert!(matches!(parse_pages(" 5 ").unwrap(), PageSelection::Single(5)));
        assert!(matches!(parse_pages("3-15").unwrap(), PageSelection::Range(3, 15)));
        match parse_pages("1,3,5").unwrap() {
            PageSelection::Set(v) => assert_eq!(v, vec![1, 3, 5]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_pages_rejects_bad_input() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("5-3").is_err());
        assert!(parse_pages("1,x").is_err());
        assert!(parse_pages("abc").is_err());
    }

    #[test]
    fn skip_line_names_the_figure() {
        let line = skip_line(&SkippedBlock {
            page_num: 3,
            subpage_num: 2,
            figure_index: 4,
            original_reference: Some("imgs/a.jpg".into()),
            reason: SkipReason::EmptyCrop,
        });
        assert_eq!(
            line,
            "Skipped figure 04 on page 3 sub-page 2 (imgs/a.jpg): box is empty after clamping"
        );
    }

    #[test]
    fn cli_parses_short_flags() {
        let cli = Cli::try_parse_from(["page2md", "-i", "a.png", "-r", "a.json", "-o", "out"])
            .unwrap();
        assert_eq!(cli.input_document, PathBuf::from("a.png"));
        assert_eq!(cli.results, PathBuf::from("a.json"));
        assert_eq!(cli.out_dir, PathBuf::from("out"));
        assert_eq!(cli.dpi, 300);
    }
}
