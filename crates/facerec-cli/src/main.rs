use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facerec_core::{Extractor, OnnxExtractor};

mod client;

use client::FacerecClient;

#[derive(Parser)]
#[command(name = "facerec", about = "facerec face identification CLI")]
struct Cli {
    /// Base URL of the facerecd server
    #[arg(long, env = "FACEREC_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify every face in an image
    Identify {
        /// Image file (png, jpg, jpeg or gif)
        image: PathBuf,
    },
    /// List enrolled identities
    List,
    /// Enroll the single face in an image under an identity
    Enroll {
        /// Identity label
        #[arg(short, long)]
        id: String,
        image: PathBuf,
    },
    /// Remove every enrollment of an identity
    Remove {
        /// Identity label
        #[arg(short, long)]
        id: String,
    },
    /// Show server status
    Status,
    /// Extract embeddings locally, without a server
    Embed {
        image: PathBuf,
        /// Directory containing det_10g.onnx and w600k_r50.onnx
        #[arg(long, env = "FACEREC_MODEL_DIR")]
        model_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = FacerecClient::new(&cli.server);

    let output = match cli.command {
        Commands::Identify { image } => client.identify(&image).await?,
        Commands::List => client.list().await?,
        Commands::Enroll { id, image } => client.enroll(&id, &image).await?,
        Commands::Remove { id } => client.remove(&id).await?,
        Commands::Status => client.status().await?,
        Commands::Embed { image, model_dir } => {
            let model_dir = model_dir.unwrap_or_else(facerec_core::default_model_dir);
            tracing::debug!(model_dir = %model_dir.display(), "loading models");
            let bytes = std::fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            let mut extractor = OnnxExtractor::load(&model_dir).context("loading face models")?;
            let embeddings = extractor.embed(&bytes)?;
            serde_json::json!({
                "count": embeddings.len(),
                "embeddings": embeddings,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
