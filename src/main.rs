use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tilemark::config::Config;
use tilemark::constants::DEFAULT_FONT_CANDIDATES;
use tilemark::service::WatermarkService;
use tilemark::session::SessionId;
use tilemark::watermark::{FileFontProvider, FontProvider, RawStyleParams, WatermarkError};

/// Tilemark - tile a styled text watermark across a photo
#[derive(Parser, Debug)]
#[command(name = "tilemark")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when it does not exist)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Test configuration and font, then exit
    #[arg(long)]
    test: bool,

    /// Session identifier (a fresh one is generated when omitted)
    #[arg(long)]
    session: Option<String>,

    /// Photo to watermark (PNG or JPEG)
    #[arg(short, long, required_unless_present = "test")]
    input: Option<PathBuf>,

    /// Watermark text
    #[arg(short, long, default_value = "")]
    text: String,

    /// Font size selector (1px, 2px, 3px, 4px, 5px or 10px)
    #[arg(long, default_value = "2px")]
    size: String,

    /// Fill color
    #[arg(long, default_value = "#000000")]
    color: String,

    /// Outline color
    #[arg(long, default_value = "#FFFFFF")]
    stroke: String,

    /// Rotation in degrees, clamped to [-50, 50]
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    rotation: f32,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Load configuration; a missing file means defaults
    let config = Config::load_or_default(&args.config).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = tilemark::logging::init_subscriber(&config.logging) {
        eprintln!("Failed to initialize logging subsystem: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args, config).await {
        tracing::error!(error = %format!("{:#}", e), "tilemark failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args, config: Config) -> anyhow::Result<()> {
    config.validate().map_err(WatermarkError::Config)?;

    let font = load_font(&config)?;
    tracing::info!(
        config_file = %args.config.display(),
        base_dir = %config.storage.base_dir.display(),
        font = %font.name(),
        max_concurrent_renders = config.render.max_concurrent_renders,
        "Configuration loaded successfully"
    );

    let service = WatermarkService::new(&config, font)?;

    if args.test {
        println!("configuration OK");
        return Ok(());
    }

    let input = args
        .input
        .as_ref()
        .context("--input is required when not running with --test")?;

    let session = match &args.session {
        Some(id) => SessionId::parse(id)?,
        None => SessionId::generate(),
    };

    let data = tokio::fs::read(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let mime = mime_for(input);

    service.ensure_ready().await?;
    service.upload(&session, mime, Bytes::from(data)).await?;

    let raw = RawStyleParams::new()
        .with("text", args.text.as_str())
        .with("font.size", args.size.as_str())
        .with("color", args.color.as_str())
        .with("stroke", args.stroke.as_str())
        .with("rotation", args.rotation.to_string());

    match service.render(&session, &raw).await {
        Ok(output) => {
            println!("{}", output.path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", WatermarkService::status_message(&e));
            Err(e.into())
        }
    }
}

fn load_font(config: &Config) -> Result<Arc<dyn FontProvider>, WatermarkError> {
    let provider = match &config.font.path {
        Some(path) => FileFontProvider::load(path)?,
        None => FileFontProvider::discover(DEFAULT_FONT_CANDIDATES)?,
    };
    Ok(Arc::new(provider))
}

/// Declared upload type, guessed from the file extension.
fn mime_for(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
