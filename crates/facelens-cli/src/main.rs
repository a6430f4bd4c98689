use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facelens_core::{load_image, Face, ImageCanvas, OverlayRenderer, Resource};
use facelens_runtime::{BackendId, BackendUi, Configurator, Engine, FlagTable, RuntimeState, TFJS_RUNTIME};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "facelens", about = "Face overlay demo and inference backend switcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw the eye overlay onto a frame from detected faces
    Render {
        /// Input frame (any format the image crate decodes)
        #[arg(short, long)]
        image: PathBuf,
        /// JSON array of faces as emitted by the landmark model
        #[arg(short, long)]
        faces: PathBuf,
        /// Output image path
        #[arg(short, long)]
        out: PathBuf,
        /// Accessory image; overrides FACELENS_OVERLAY_ASSET
        #[arg(long)]
        overlay: Option<PathBuf>,
        /// Outline each face's bounding box
        #[arg(long)]
        bounding_box: bool,
        /// Mark every keypoint
        #[arg(long)]
        show_keypoints: bool,
    },
    /// Apply engine flags and switch the active backend
    Backend {
        /// Backend identifier, e.g. tfjs-webgl
        backend: String,
        /// Flag overrides as a JSON or TOML file
        #[arg(long)]
        flags: Option<PathBuf>,
    },
    /// List tunable engine flags and their legal values
    Flags {
        /// Only flags relevant to this backend identifier
        #[arg(long)]
        backend: Option<String>,
    },
}

/// Prints backend advisories to stderr.
struct ConsoleUi;

impl BackendUi for ConsoleUi {
    fn alert(&self, message: &str) {
        eprintln!("warning: {message}");
    }

    fn refresh_backend_options(&self, state: &RuntimeState) {
        eprintln!("backend reset to {}", state.active_backend());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Render {
            image,
            faces,
            out,
            overlay,
            bounding_box,
            show_keypoints,
        } => {
            let asset_path = overlay.or(config.overlay_asset.clone());
            render(&config, &image, &faces, &out, asset_path, bounding_box, show_keypoints).await?;
        }
        Commands::Backend { backend, flags } => {
            switch_backend(&config, &backend, flags.as_deref()).await?;
        }
        Commands::Flags { backend } => {
            list_flags(backend.as_deref());
        }
    }

    Ok(())
}

async fn render(
    config: &Config,
    frame_path: &Path,
    faces: &Path,
    out: &Path,
    asset_path: Option<PathBuf>,
    bounding_box: bool,
    show_keypoints: bool,
) -> Result<()> {
    // Start the asset decode first so it overlaps with reading the frame.
    let asset = match asset_path {
        Some(path) => load_image(&path).with_context(|| format!("loading {}", path.display()))?,
        None => Resource::failed("no overlay asset configured"),
    };

    let frame = image::open(frame_path)
        .with_context(|| format!("decoding frame {}", frame_path.display()))?
        .to_rgba8();
    let faces_json = std::fs::read_to_string(faces)
        .with_context(|| format!("reading {}", faces.display()))?;
    let faces: Vec<Face> = serde_json::from_str(&faces_json).context("parsing faces JSON")?;

    let deadline = Instant::now() + Duration::from_millis(config.asset_timeout_ms);
    while !asset.is_settled() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    if let Some(reason) = asset.error() {
        tracing::warn!(%reason, "overlay asset unavailable; drawing eye markers");
    }

    let renderer = OverlayRenderer::new(asset).with_eye_indices(config.eye_indices);
    let mut canvas = ImageCanvas::new(frame);
    renderer.draw_results(&mut canvas, &faces, bounding_box, show_keypoints);

    canvas
        .into_frame()
        .save(out)
        .with_context(|| format!("writing {}", out.display()))?;
    println!("Rendered {} face(s) to {}", faces.len(), out.display());
    Ok(())
}

async fn switch_backend(config: &Config, backend: &str, flags: Option<&Path>) -> Result<()> {
    let overrides = match flags {
        Some(path) => read_flag_file(path)?,
        None => Value::Object(Default::default()),
    };
    let status = backend_status(config, backend, &overrides, ConsoleUi).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// Bring up the configured engine, apply `overrides` while switching to
/// `backend`, and report the resulting runtime and engine state.
async fn backend_status(
    config: &Config,
    backend: &str,
    overrides: &Value,
    ui: impl BackendUi + Send + Sync + 'static,
) -> Result<Value> {
    let engine = Engine::with_backends(config.backends.iter().map(String::as_str));
    let mut configurator =
        Configurator::new(engine, RuntimeState::new(&config.default_backend)).with_ui(ui);

    // Bring up the default backend the way a page load would.
    let empty = Value::Object(Default::default());
    if BackendId::parse(&config.default_backend).runtime == TFJS_RUNTIME {
        configurator
            .set_backend_and_env_flags(Some(&empty), &config.default_backend)
            .await
            .with_context(|| format!("activating default backend {}", config.default_backend))?;
    }

    configurator
        .set_backend_and_env_flags(Some(overrides), backend)
        .await
        .with_context(|| format!("switching to {backend}"))?;

    let state = configurator.state();
    let engine = configurator.registry();
    Ok(serde_json::json!({
        "active_backend": state.active_backend(),
        "last_tfjs_backend": state.last_tfjs_backend(),
        "engine_backend": engine.active(),
        "registered": engine.backend_names(),
        "flags": engine.flags(),
    }))
}

/// Read a flag override file; `.toml` files are parsed as TOML, everything else as JSON.
fn read_flag_file(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str::<Value>(&raw).context("parsing flag TOML")?,
        Some("json") | None => serde_json::from_str(&raw).context("parsing flag JSON")?,
        Some(other) => bail!("unsupported flag file extension: .{other}"),
    };
    Ok(value)
}

fn list_flags(backend: Option<&str>) {
    let table = FlagTable::builtin();
    let flags: Vec<_> = match backend {
        Some(id) => table.for_backend(id).collect(),
        None => table.flags().iter().collect(),
    };

    if flags.is_empty() {
        println!("No tunable flags");
        return;
    }
    for flag in flags {
        let values: Vec<String> = flag.values.iter().map(Value::to_string).collect();
        println!("{:<32} [{}]", flag.name, values.join(", "));
    }
}
