use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};

use vggish_core::{
    Dataset, EmbeddingWriter, IdScheme, Pipeline, Postprocessor, VggishEmbedder,
    audio::{self, DecodedAudio},
    model::{self, VggishConfig},
    pipeline::PipelineOptions,
};

use crate::config::{ExtractConfig, load_config};

#[cfg(not(feature = "wgpu"))]
type Backend = burn::backend::NdArray<f32>;
#[cfg(feature = "wgpu")]
type Backend = burn::backend::Wgpu;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IdSchemeArg {
    /// `A-15__recording.wav` -> `15`
    Prefixed,
    /// File stem unchanged
    Stem,
}

impl From<IdSchemeArg> for IdScheme {
    fn from(arg: IdSchemeArg) -> Self {
        match arg {
            IdSchemeArg::Prefixed => IdScheme::Prefixed,
            IdSchemeArg::Stem => IdScheme::Stem,
        }
    }
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Directory with one subdirectory per label
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Output CSV (overwritten)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// burn record with the VGGish weights
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// .npz with pca_eigen_vectors and pca_means
    #[arg(long)]
    pca_params: Option<PathBuf>,

    /// Comma-separated label directories to read, in order (default: all)
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<String>>,

    /// Comma-separated audio extensions to pick up
    #[arg(long, value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// How the filename column is derived
    #[arg(long, value_enum)]
    id_scheme: Option<IdSchemeArg>,

    /// Skip files shorter than this many seconds
    #[arg(long)]
    min_duration: Option<f64>,

    /// Write raw embeddings instead of PCA-whitened, quantized ones
    #[arg(long)]
    raw: bool,

    /// Apply ReLU to the embedding layer even if the checkpoint config does not
    #[arg(long)]
    embedding_relu: bool,

    /// YAML file with defaults for the flags above
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ExtractArgs {
    fn resolve(self) -> Result<ExtractConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ExtractConfig::default(),
        };

        if let Some(v) = self.input_dir {
            config.input_dir = Some(v);
        }
        if let Some(v) = self.output {
            config.output = v;
        }
        if let Some(v) = self.checkpoint {
            config.checkpoint = v;
        }
        if let Some(v) = self.pca_params {
            config.pca_params = v;
        }
        if let Some(v) = self.labels {
            config.labels = v;
        }
        if let Some(v) = self.extensions {
            config.extensions = v;
        }
        if let Some(v) = self.id_scheme {
            config.id_scheme = v.into();
        }
        if let Some(v) = self.min_duration {
            config.min_duration_secs = v;
        }
        config.raw |= self.raw;
        config.embedding_relu |= self.embedding_relu;
        Ok(config)
    }
}

/// Network config saved with the record (or the defaults), with the ReLU
/// forced on when asked for.
fn load_embedder(checkpoint: &Path, embedding_relu: bool) -> Result<VggishEmbedder<Backend>> {
    let mut config = model::stored_config(checkpoint)?.unwrap_or_else(VggishConfig::new);
    config.embedding_relu |= embedding_relu;
    VggishEmbedder::<Backend>::load_with_config(checkpoint, &config, Default::default())
        .context("Failed to load VGGish checkpoint")
}

fn load_postprocessor(pca_params: &Path, raw: bool) -> Result<Option<Postprocessor>> {
    if raw {
        return Ok(None);
    }
    Postprocessor::load(pca_params)
        .map(Some)
        .context("Failed to load PCA parameters")
}

pub fn extract(args: ExtractArgs) -> Result<()> {
    let config = args.resolve()?;
    let Some(input_dir) = config.input_dir.clone() else {
        bail!("no input directory given (use --input-dir or set input_dir in the config)");
    };

    let dataset = Dataset::scan(&input_dir, &config.scan_options())?;
    log::info!(
        "found {} files under {} labels: {}",
        dataset.len(),
        dataset.labels.len(),
        dataset.labels.join(" ")
    );

    let embedder = load_embedder(&config.checkpoint, config.embedding_relu)?;
    let postprocessor = load_postprocessor(&config.pca_params, config.raw)?;
    let mut pipeline = Pipeline::new(embedder, postprocessor, config.pipeline_options());

    let mut writer = EmbeddingWriter::create(&config.output, pipeline.output_dims())?;
    let summary = pipeline.run(&dataset, &mut writer)?;
    writer.flush()?;

    println!("Wrote: {}", config.output.display());
    println!("Files processed: {}", summary.files_processed);
    println!("Skipped (too short): {}", summary.files_skipped_short);
    println!("Rows: {}", summary.rows_written);
    for (label, rows) in &summary.rows_per_label {
        println!("  {label}: {rows}");
    }
    Ok(())
}

pub fn embed(
    input: Option<&Path>,
    checkpoint: &Path,
    pca_params: &Path,
    label: &str,
    raw: bool,
    embedding_relu: bool,
) -> Result<()> {
    let (id, decoded) = match input {
        Some(path) => {
            let id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            (id, audio::decode_to_mono(path)?)
        }
        None => {
            log::info!("no input file, using a 5 s 1 kHz sine");
            let sample_rate = 44_100;
            let samples = audio::synthetic_tone(5.0, 1000.0, sample_rate);
            (String::from("sine"), DecodedAudio { samples, sample_rate })
        }
    };

    let embedder = load_embedder(checkpoint, embedding_relu)?;
    let postprocessor = load_postprocessor(pca_params, raw)?;
    let mut pipeline = Pipeline::new(embedder, postprocessor, PipelineOptions::default());

    let rows = pipeline.embed_samples(decoded.samples, decoded.sample_rate)?;
    let mut writer = EmbeddingWriter::new(std::io::stdout().lock(), rows.ncols())?;
    for row in rows.rows() {
        writer.write_segment(&id, row, label)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn convert_checkpoint(npz: &Path, output: &Path, embedding_relu: bool) -> Result<()> {
    let config = VggishConfig::new().with_embedding_relu(embedding_relu);
    let written = model::convert_checkpoint::<Backend>(npz, output, &config, &Default::default())?;
    println!("Wrote: {}", written.display());
    Ok(())
}

pub fn inspect(csv: &Path) -> Result<()> {
    let summary = vggish_tools::summarize(csv)?;
    println!("{}: {} rows, {} dimensions", csv.display(), summary.rows, summary.dims);
    println!("Distinct files: {}", summary.distinct_ids);
    for (label, rows) in &summary.rows_per_label {
        println!("  {label}: {rows}");
    }
    Ok(())
}

pub fn export_jsonl(csv: &Path, output: &Path) -> Result<()> {
    let lines = vggish_tools::convert(csv, output)?;
    println!("Wrote {lines} lines to {}", output.display());
    Ok(())
}
