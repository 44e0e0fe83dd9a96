//! VGGish embedding extraction.
//!
//! Decodes labeled audio files, turns them into 0.96 s log-mel examples,
//! runs the VGGish network over them and writes PCA-whitened, quantized
//! embeddings to CSV, one row per example.

pub mod audio;
pub mod dataset;
pub mod error;
pub mod model;
mod npz;
pub mod output;
pub mod params;
pub mod pipeline;
pub mod postprocess;

pub use dataset::{Dataset, IdScheme, LabeledFile, ScanOptions};
pub use error::{Error, Result};
pub use model::{EmbeddingModel, VggishEmbedder};
pub use output::EmbeddingWriter;
pub use pipeline::{Pipeline, PipelineOptions, RunSummary};
pub use postprocess::Postprocessor;
