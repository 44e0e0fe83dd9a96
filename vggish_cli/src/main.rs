//! `vggish`: batch VGGish embedding extraction for labeled audio collections.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vggish")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed every labeled audio file under a directory and write a CSV
    Extract(commands::ExtractArgs),

    /// Embed a single file (or a 1 kHz test tone) and print the rows
    Embed {
        /// Audio file; a synthetic sine is used when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(long, default_value = "vggish_model.mpk")]
        checkpoint: PathBuf,

        #[arg(long, default_value = "vggish_pca_params.npz")]
        pca_params: PathBuf,

        /// Label written in the last column
        #[arg(long, default_value = "")]
        label: String,

        /// Print raw embeddings instead of quantized ones
        #[arg(long)]
        raw: bool,

        /// Apply ReLU to the embedding layer (older checkpoints)
        #[arg(long)]
        embedding_relu: bool,
    },

    /// Convert an .npz export of the TensorFlow checkpoint into a burn record
    ConvertCheckpoint {
        /// .npz holding the `vggish/...` variables
        #[arg(short, long)]
        npz: PathBuf,

        #[arg(short, long, default_value = "vggish_model.mpk")]
        output: PathBuf,

        /// Record that the checkpoint applies ReLU to the embedding layer;
        /// saved with the weights
        #[arg(long)]
        embedding_relu: bool,
    },

    /// Validate a feature CSV and print row counts per label
    Inspect {
        #[arg(short, long)]
        csv: PathBuf,
    },

    /// Rewrite a feature CSV as JSON lines
    ExportJsonl {
        #[arg(short, long)]
        csv: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract(args) => commands::extract(args),
        Commands::Embed {
            input,
            checkpoint,
            pca_params,
            label,
            raw,
            embedding_relu,
        } => commands::embed(
            input.as_deref(),
            &checkpoint,
            &pca_params,
            &label,
            raw,
            embedding_relu,
        ),
        Commands::ConvertCheckpoint {
            npz,
            output,
            embedding_relu,
        } => commands::convert_checkpoint(&npz, &output, embedding_relu),
        Commands::Inspect { csv } => commands::inspect(&csv),
        Commands::ExportJsonl { csv, output } => commands::export_jsonl(&csv, &output),
    }
}
