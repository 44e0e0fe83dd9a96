use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::summary::feature_dims;

#[derive(Debug, Serialize)]
struct EmbeddingLine<'a> {
    filename: &'a str,
    label: &'a str,
    embedding: Vec<f32>,
}

/// Rewrite a feature CSV as JSON lines. Returns the number of lines written.
pub fn convert(csv_path: &Path, out_path: &Path) -> Result<usize> {
    log::info!("Converting {} to JSONL", csv_path.display());

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open CSV: {}", csv_path.display()))?;
    let dims = feature_dims(rdr.headers().context("Failed to read CSV header")?)?;

    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let out_file = File::create(out_path)
        .with_context(|| format!("Failed to create output: {}", out_path.display()))?;
    let mut writer = BufWriter::new(out_file);

    let mut kept = 0usize;
    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse row {}", line + 1))?;
        let embedding = record
            .iter()
            .skip(1)
            .take(dims)
            .map(|v| v.trim().parse::<f32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("Row {} has a non-numeric value", line + 1))?;

        let line = EmbeddingLine {
            filename: &record[0],
            label: record.get(dims + 1).unwrap_or_default(),
            embedding,
        };

        serde_json::to_writer(&mut writer, &line)?;
        writer.write_all(b"\n")?;
        kept += 1;
    }

    writer.flush()?;

    log::info!("Wrote {} lines to {}", kept, out_path.display());
    Ok(kept)
}
