//! The batch loop: labeled files in, one CSV row per 0.96 s example out.

use std::collections::BTreeMap;
use std::io::Write;

use ndarray::Array2;

use crate::audio::{self, LogMelFrontend};
use crate::dataset::{Dataset, LabeledFile};
use crate::error::Result;
use crate::model::EmbeddingModel;
use crate::output::EmbeddingWriter;
use crate::params::SAMPLE_RATE;
use crate::postprocess::Postprocessor;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Files shorter than this, measured at their native rate, produce no rows.
    pub min_duration_secs: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            min_duration_secs: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_seen: usize,
    pub files_processed: usize,
    pub files_skipped_short: usize,
    pub rows_written: usize,
    pub rows_per_label: BTreeMap<String, usize>,
}

pub struct Pipeline<M> {
    frontend: LogMelFrontend,
    model: M,
    postprocessor: Option<Postprocessor>,
    options: PipelineOptions,
}

impl<M: EmbeddingModel> Pipeline<M> {
    /// Without a postprocessor the raw embeddings are written.
    pub fn new(model: M, postprocessor: Option<Postprocessor>, options: PipelineOptions) -> Self {
        Self {
            frontend: LogMelFrontend::new(),
            model,
            postprocessor,
            options,
        }
    }

    pub fn output_dims(&self) -> usize {
        match &self.postprocessor {
            Some(pproc) => pproc.dim(),
            None => self.model.embedding_size(),
        }
    }

    /// Examples, inference and post-processing for audio already in memory.
    pub fn embed_samples(&mut self, samples: Vec<f32>, sample_rate: u32) -> Result<Array2<f32>> {
        let samples = audio::resample(samples, sample_rate, SAMPLE_RATE)?;
        let examples = self.frontend.examples(&samples)?;
        log::debug!("examples batch: {:?}", examples.dim());

        let embeddings = self.model.embed(&examples)?;
        log::debug!("embedding batch: {:?}", embeddings.dim());

        match &self.postprocessor {
            Some(pproc) => Ok(pproc.postprocess(&embeddings)?.mapv(f32::from)),
            None => Ok(embeddings),
        }
    }

    /// Embed one file. `None` when it is shorter than the minimum duration.
    pub fn process_file(&mut self, file: &LabeledFile) -> Result<Option<Array2<f32>>> {
        let decoded = audio::decode_to_mono(&file.path)?;
        let duration = decoded.duration_secs();
        if duration < self.options.min_duration_secs {
            log::warn!(
                "skipping {}: {:.2}s is shorter than {:.2}s",
                file.path.display(),
                duration,
                self.options.min_duration_secs
            );
            return Ok(None);
        }

        self.embed_samples(decoded.samples, decoded.sample_rate)
            .map(Some)
    }

    /// Process every file in order, appending rows to `writer`.
    ///
    /// The first error stops the run. Rows of files finished before it are
    /// already flushed.
    pub fn run<W: Write>(
        &mut self,
        dataset: &Dataset,
        writer: &mut EmbeddingWriter<W>,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for file in &dataset.files {
            summary.files_seen += 1;
            log::info!("[{}] {}", file.label, file.path.display());

            let Some(rows) = self.process_file(file)? else {
                summary.files_skipped_short += 1;
                continue;
            };

            for row in rows.rows() {
                writer.write_segment(&file.id, row, &file.label)?;
            }
            writer.flush()?;

            summary.files_processed += 1;
            summary.rows_written += rows.nrows();
            *summary
                .rows_per_label
                .entry(file.label.clone())
                .or_default() += rows.nrows();
            log::info!(
                "wrote {} rows for {} ({} total)",
                rows.nrows(),
                file.id,
                writer.rows_written()
            );
        }

        log::info!(
            "done: {} files processed, {} skipped as too short, {} rows",
            summary.files_processed,
            summary.files_skipped_short,
            summary.rows_written
        );
        Ok(summary)
    }
}
