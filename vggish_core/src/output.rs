//! CSV sink: `filename, vgg0..vggN, label`, one row per example.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::ArrayView1;

use crate::error::{Error, Result};

pub const ID_COLUMN: &str = "filename";
pub const LABEL_COLUMN: &str = "label";
pub const FEATURE_PREFIX: &str = "vgg";

pub fn header(dims: usize) -> Vec<String> {
    let mut header = Vec::with_capacity(dims + 2);
    header.push(ID_COLUMN.to_string());
    header.extend((0..dims).map(|i| format!("{FEATURE_PREFIX}{i}")));
    header.push(LABEL_COLUMN.to_string());
    header
}

pub struct EmbeddingWriter<W: Write> {
    writer: csv::Writer<W>,
    dims: usize,
    rows: usize,
}

impl EmbeddingWriter<BufWriter<File>> {
    /// Create (or truncate) `path` and write the header.
    pub fn create(path: &Path, dims: usize) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        Self::new(BufWriter::new(file), dims)
    }
}

impl<W: Write> EmbeddingWriter<W> {
    pub fn new(inner: W, dims: usize) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(header(dims))?;
        Ok(Self {
            writer,
            dims,
            rows: 0,
        })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Data rows written so far, header excluded.
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn write_segment(&mut self, id: &str, values: ArrayView1<f32>, label: &str) -> Result<()> {
        if values.len() != self.dims {
            return Err(Error::Shape(format!(
                "row for {id} has {} values, header has {}",
                values.len(),
                self.dims
            )));
        }

        let mut record = Vec::with_capacity(self.dims + 2);
        record.push(id.to_string());
        record.extend(values.iter().map(|v| v.to_string()));
        record.push(label.to_string());
        self.writer.write_record(&record)?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::Csv(csv::Error::from(e)))
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::Csv(csv::Error::from(e.into_error())))
    }
}
