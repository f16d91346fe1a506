use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use neural_tryon::{
    HasRecoverySuggestion, ImageRole, Persona, Studio, TryOnConfig, TryOnError, UploadPreset,
    WorkflowStatus,
};
use tracing_subscriber::EnvFilter;

/// Virtual try-on: dress a person photo in garment reference images using a
/// generative model, then save the rendered result.
#[derive(Parser, Debug)]
#[command(name = "tryon")]
#[command(about = "Render a person wearing reference garments")]
#[command(long_about = "Render a person wearing reference garments.
Needs a person image (or --camera) and at least one garment: --top, --bottom or --dress.
The API key is read from API_KEY or GEMINI_API_KEY (a .env file is honored).")]
struct Args {
    /// Person photo used as the identity and background template
    #[arg(short, long)]
    person: Option<PathBuf>,

    /// Upper-body garment reference
    #[arg(short, long)]
    top: Option<PathBuf>,

    /// Lower-body garment reference
    #[arg(short, long)]
    bottom: Option<PathBuf>,

    /// One-piece outfit reference (women persona only)
    #[arg(short, long)]
    dress: Option<PathBuf>,

    /// Persona, decides which garment slots exist
    #[arg(long, value_enum, default_value_t = Persona::Men)]
    persona: Persona,

    /// Shoot the person photo with the camera instead of --person
    #[arg(long)]
    camera: bool,

    /// Camera device index
    #[arg(long, default_value_t = 0)]
    camera_index: u32,

    /// Directory the result image is written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Print the analysis telemetry as JSON
    #[arg(long)]
    telemetry: bool,

    /// Override the analysis model
    #[arg(long)]
    analysis_model: Option<String>,

    /// Override the synthesis model
    #[arg(long)]
    synthesis_model: Option<String>,

    /// Upload downscale preset
    #[arg(long, value_enum)]
    preset: Option<UploadPreset>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("neural_tryon=info,tryon=info")),
        )
        .with_target(false)
        .init();

    let result = try_on(Args::parse()).await;
    if let Err(e) = &result {
        let hint = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<TryOnError>())
            .and_then(|error| error.recovery_suggestion());
        if let Some(hint) = hint {
            eprintln!("hint: {hint}");
        }
    }
    result
}

async fn try_on(args: Args) -> Result<()> {
    let mut config = TryOnConfig::from_env()?;
    if let Some(model) = args.analysis_model.clone() {
        config.analysis_model = model;
    }
    if let Some(model) = args.synthesis_model.clone() {
        config.synthesis_model = model;
    }
    if let Some(preset) = args.preset {
        config.upload_preset = preset;
    }
    config.validate()?;

    let studio = build_studio(&args, config)?;

    let inputs = [
        (ImageRole::Person, &args.person),
        (ImageRole::Top, &args.top),
        (ImageRole::Bottom, &args.bottom),
        (ImageRole::Dress, &args.dress),
    ];
    for (role, path) in inputs {
        if let Some(path) = path {
            studio
                .load_image_path(role, path)
                .await
                .with_context(|| format!("loading {role} image from {}", path.display()))?;
        }
    }

    if args.camera {
        if studio.toggle_camera() {
            studio.capture_photo().await.context("taking the person photo")?;
        } else {
            tracing::warn!("camera unavailable, continuing with uploaded images");
        }
    }

    if let Some(reason) = studio.images().missing_requirement() {
        bail!("cannot start a try-on run: {reason}");
    }

    let state = studio.run().await?;

    if args.telemetry {
        println!("{}", studio.telemetry_json()?);
    }

    match state.status {
        WorkflowStatus::Success => {
            tokio::fs::create_dir_all(&args.out_dir)
                .await
                .with_context(|| format!("creating {}", args.out_dir.display()))?;
            let path = studio.save_result(&args.out_dir).await?;
            println!("{}", path.display());
            Ok(())
        }
        _ => bail!(
            "{}",
            state
                .error
                .unwrap_or_else(|| "run ended without a result".to_string())
        ),
    }
}

#[cfg(feature = "camera")]
fn build_studio(args: &Args, config: TryOnConfig) -> Result<Studio> {
    let mut builder = Studio::builder()
        .with_config(config)
        .with_persona(args.persona);
    if args.camera {
        builder = builder.with_camera(std::sync::Arc::new(
            neural_tryon::capture::NativeCameraBackend::new(args.camera_index),
        ));
    }
    Ok(builder.build()?)
}

#[cfg(not(feature = "camera"))]
fn build_studio(args: &Args, config: TryOnConfig) -> Result<Studio> {
    if args.camera {
        tracing::warn!(
            index = args.camera_index,
            "built without the `camera` feature; device capture is unavailable"
        );
    }
    Ok(Studio::builder()
        .with_config(config)
        .with_persona(args.persona)
        .build()?)
}
