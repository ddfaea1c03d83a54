//! CLI binary for checklist-banner.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `BannerConfig` / `LayoutConfig`, writes the PNG, and optionally hands it
//! to a publish adapter.

use anyhow::{Context, Result};
use checklist_banner::publish::{
    Credentials, HttpUploader, Platform, PlatformPublisher, Publisher, SimulatedUploader,
};
use checklist_banner::{
    compose, compose_to_file, pipeline::input, pipeline::validate, BannerConfig, ChecklistData,
    ChecklistItem, EncodedBanner, FontSource, LayoutConfig, Point, TextColor, MAX_FONT_SIZE,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Items from flags, PNG to a file
  banner bg.png --header "Weekly Goals" --item "[x] Ship v1" --item "[ ] Write docs" -o out.png

  # Checklist from JSON ({"header": "...", "items": [{"text": "...", "isChecked": true}]})
  banner https://example.com/bg.jpg --checklist goals.json -o out.png

  # Background from the blob store, inline preview on stdout
  BANNER_BACKGROUND_BASE_URL=https://blobs.example.com banner sunset.png \
      --checklist goals.json --data-uri

  # Reject thin content, then publish (simulated upload unless --upload-url)
  banner bg.png --checklist goals.json --strict --publish bluesky \
      --handle me.bsky.social --app-password xxxx-xxxx -o out.png

ITEM SYNTAX:
  "[x] text"   checked item (✓)
  "[ ] text"   open item (○)
  "text"       open item (○)
  Inline markdown (**bold**, *italic*, ~~strike~~, `code`) is rendered.

ENVIRONMENT VARIABLES:
  BANNER_BACKGROUND_BASE_URL  Blob store base; bare keys resolve to {base}/backgrounds/{key}
  BANNER_FONT                 BMFont descriptor (.fnt) to draw with
  BANNER_HANDLE               Publish account handle
  BANNER_APP_PASSWORD         Publish app password
  BANNER_UPLOAD_URL           Real upload endpoint (replaces the simulation)
  RUST_LOG                    Log filter override (e.g. checklist_banner=debug)
"#;

/// Compose checklist status banners onto background images.
#[derive(Parser, Debug)]
#[command(
    name = "banner",
    version,
    about = "Compose checklist status banners onto background images",
    long_about = "Draw a title and a list of checked / open items onto a background image \
(local file, URL or blob key) and write the result as PNG. Item text is sanitized and its \
inline markdown rendered. The result can be published to X or Bluesky.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Background: local path, HTTP/HTTPS URL, or blob key.
    background: String,

    /// Checklist JSON file ("-" for stdin).
    #[arg(long, conflicts_with_all = ["header", "items"])]
    checklist: Option<PathBuf>,

    /// Banner title (with --item).
    #[arg(long)]
    header: Option<String>,

    /// Checklist item; repeat for more. Prefix "[x] " marks it done.
    #[arg(long = "item", value_name = "ITEM")]
    items: Vec<String>,

    /// Write the PNG here instead of stdout.
    #[arg(short, long, env = "BANNER_OUTPUT")]
    output: Option<PathBuf>,

    /// Print a data:image/png;base64 URI instead of raw PNG bytes.
    #[arg(long)]
    data_uri: bool,

    /// Text height in pixels; also sets the line pitch.
    #[arg(
        long,
        default_value_t = 18,
        value_parser = clap::value_parser!(u32).range(1..=MAX_FONT_SIZE as i64)
    )]
    font_size: u32,

    /// Text colour, #RRGGBB or #RRGGBBAA.
    #[arg(long, default_value = "#FFFFFF")]
    color: TextColor,

    /// Header position as X,Y.
    #[arg(long, default_value = "50,20", value_parser = parse_point)]
    header_at: Point,

    /// First item position as X,Y.
    #[arg(long, default_value = "50,100", value_parser = parse_point)]
    items_at: Point,

    /// AngelCode BMFont descriptor (.fnt); default is the built-in font.
    #[arg(long, env = "BANNER_FONT")]
    font: Option<PathBuf>,

    /// Largest background width/height kept after resizing.
    #[arg(long, default_value_t = 1000)]
    max_dimension: u32,

    /// Concurrent item renders.
    #[arg(short, long, env = "BANNER_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Blob store base URL for bare background keys.
    #[arg(long, env = "BANNER_BACKGROUND_BASE_URL")]
    base_url: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "BANNER_DOWNLOAD_TIMEOUT", default_value_t = 30)]
    download_timeout: u64,

    /// Refuse checklists that fail content validation.
    #[arg(long)]
    strict: bool,

    /// Publish the banner to a platform: x, bluesky.
    #[arg(long)]
    publish: Option<Platform>,

    /// Account handle for --publish.
    #[arg(long, env = "BANNER_HANDLE", default_value = "")]
    handle: String,

    /// App password for --publish.
    #[arg(long, env = "BANNER_APP_PASSWORD", default_value = "", hide_env_values = true)]
    app_password: String,

    /// Real upload endpoint; without it the upload is simulated.
    #[arg(long, env = "BANNER_UPLOAD_URL")]
    upload_url: Option<String>,

    /// Seed for the simulated upload outcome.
    #[arg(long)]
    seed: Option<u64>,

    /// Print composition stats as JSON on stderr.
    #[arg(long)]
    json: bool,

    /// Disable the publish spinner.
    #[arg(long, env = "BANNER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BANNER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BANNER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build inputs ─────────────────────────────────────────────────────
    let data = load_checklist(&cli).await?;
    let config = build_config(&cli)?;
    let layout = LayoutConfig {
        font_size: cli.font_size,
        text_color: cli.color,
        header_position: cli.header_at,
        items_origin: cli.items_at,
    };

    let violations = check_checklist(&data, config.max_item_chars, cli.strict)?;
    if !cli.quiet {
        for v in &violations {
            eprintln!("{} {}", cyan("⚠"), v);
        }
    }

    // ── Compose ──────────────────────────────────────────────────────────
    let background = input::resolve_background(&cli.background, &config)
        .await
        .with_context(|| format!("Failed to load background '{}'", cli.background))?;
    let background = Some(background.bytes.as_slice());
    let banner = match cli.output {
        Some(ref path) if !cli.data_uri => {
            compose_to_file(&data, &layout, background, path, &config).await
        }
        _ => compose(&data, &layout, background, &config).await,
    }
    .context("Composition failed")?;

    if !cli.quiet {
        for w in &banner.warnings {
            eprintln!("{} {}", cyan("⚠"), w);
        }
    }
    if cli.json {
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&banner.stats).context("Failed to serialise stats")?
        );
    }

    // ── Output ───────────────────────────────────────────────────────────
    write_output(&cli, &banner)?;

    // ── Publish ──────────────────────────────────────────────────────────
    if let Some(platform) = cli.publish {
        publish(&cli, platform, &banner).await?;
    }

    Ok(())
}

/// Map CLI args to `BannerConfig`.
fn build_config(cli: &Cli) -> Result<BannerConfig> {
    let mut builder = BannerConfig::builder()
        .max_image_dimensions(cli.max_dimension, cli.max_dimension)
        .max_image_pixels(cli.max_dimension as u64 * cli.max_dimension as u64)
        .render_concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.font {
        builder = builder.font(FontSource::BmFont(path.clone()));
    }
    if let Some(ref base) = cli.base_url {
        builder = builder.background_base_url(base);
    }

    builder.build().context("Invalid configuration")
}

/// Run the content checks once. `--strict` turns any violation into an error;
/// otherwise they are returned for the caller to report.
fn check_checklist(
    data: &ChecklistData,
    max_item_chars: usize,
    strict: bool,
) -> Result<Vec<validate::ContentViolation>> {
    let violations = validate::check(data, max_item_chars);
    if strict && !violations.is_empty() {
        let list: Vec<String> = violations.iter().map(ToString::to_string).collect();
        anyhow::bail!("Checklist rejected: {}", list.join("; "));
    }
    Ok(violations)
}

/// Read the checklist from --checklist, or assemble it from --header/--item.
async fn load_checklist(cli: &Cli) -> Result<ChecklistData> {
    if let Some(ref path) = cli.checklist {
        let json = if path.as_os_str() == "-" {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read checklist from stdin")?;
            buf
        } else {
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read checklist from {:?}", path))?
        };
        return ChecklistData::from_json(&json).context("Invalid checklist JSON");
    }

    let header = cli.header.clone().unwrap_or_default();
    let items = cli.items.iter().map(|s| parse_item(s)).collect();
    Ok(ChecklistData::new(header, items))
}

/// Parse `"[x] text"` / `"[ ] text"` / `"text"`.
fn parse_item(s: &str) -> ChecklistItem {
    let trimmed = s.trim_start();
    for (prefix, checked) in [("[x]", true), ("[X]", true), ("[ ]", false)] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return ChecklistItem::new(rest.trim_start(), checked);
        }
    }
    ChecklistItem::unchecked(s)
}

/// Parse `X,Y` into a `Point`.
fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{s}'"))?;
    let coord = |v: &str| {
        v.trim()
            .parse::<i32>()
            .map_err(|e| format!("bad coordinate '{v}': {e}"))
    };
    Ok(Point::new(coord(x)?, coord(y)?))
}

/// Report the written file, or send the banner to stdout.
fn write_output(cli: &Cli, banner: &EncodedBanner) -> Result<()> {
    if cli.data_uri {
        println!("{}", banner.to_data_uri());
        return Ok(());
    }

    // Already written atomically by `compose_to_file`.
    if let Some(ref path) = cli.output {
        if !cli.quiet {
            eprintln!(
                "{}  {}x{}  {} bytes  {}ms  →  {}",
                green("✔"),
                banner.width,
                banner.height,
                banner.len(),
                banner.stats.total_duration_ms,
                bold(&path.display().to_string()),
            );
        }
        return Ok(());
    }

    let stdout = io::stdout();
    if stdout.is_terminal() {
        anyhow::bail!("Refusing to write PNG bytes to a terminal; use -o FILE or --data-uri");
    }
    let mut handle = stdout.lock();
    handle
        .write_all(banner.as_bytes())
        .context("Failed to write to stdout")?;
    Ok(())
}

async fn publish(cli: &Cli, platform: Platform, banner: &EncodedBanner) -> Result<()> {
    let credentials = Credentials::new(cli.handle.clone(), cli.app_password.clone());

    let publisher: Box<dyn Publisher> = match cli.upload_url {
        Some(ref url) => Box::new(PlatformPublisher::new(
            platform,
            HttpUploader::new(url.clone(), Duration::from_secs(cli.download_timeout))
                .context("Failed to build upload client")?,
        )),
        None => {
            let mut uploader = SimulatedUploader::for_platform(platform);
            if let Some(seed) = cli.seed {
                uploader = uploader.with_seed(seed);
            }
            Box::new(PlatformPublisher::new(platform, uploader))
        }
    };

    let spinner = if cli.quiet || cli.no_progress {
        None
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Publishing");
        bar.set_message(format!("to {platform}…"));
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    };

    let ok = publisher.publish(banner.as_bytes(), &credentials).await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    if !ok {
        anyhow::bail!("{} Publishing to {} failed", red("✘"), platform);
    }
    if !cli.quiet {
        eprintln!(
            "{} Published to {}  {}",
            green("✔"),
            bold(platform.name()),
            dim(&format!("as {}", credentials.handle))
        );
    }
    Ok(())
}
