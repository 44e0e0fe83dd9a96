use std::fs::File;
use std::path::{Path, PathBuf};

use ndarray::{ArrayD, IxDyn, OwnedRepr};
use ndarray_npy::NpzReader;

use crate::error::{Error, Result};

/// `.npz` archive whose float arrays are read back at the requested width
/// regardless of the width they were saved with.
pub(crate) struct NpzArchive {
    path: PathBuf,
    reader: NpzReader<File>,
    names: Vec<String>,
}

impl NpzArchive {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut reader = NpzReader::new(file).map_err(|e| Error::npz(path, e))?;
        let names = reader.names().map_err(|e| Error::npz(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            names,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Entry name as stored, with or without the `.npy` suffix numpy adds.
    fn entry(&self, name: &str) -> Result<String> {
        let with_suffix = format!("{name}.npy");
        self.names
            .iter()
            .find(|n| n.as_str() == name || *n == &with_suffix)
            .cloned()
            .ok_or_else(|| Error::npz(&self.path, format!("array `{name}` not found")))
    }

    pub(crate) fn array_f32(&mut self, name: &str) -> Result<ArrayD<f32>> {
        let entry = self.entry(name)?;
        match self.reader.by_name::<OwnedRepr<f32>, IxDyn>(&entry) {
            Ok(array) => Ok(array),
            Err(_) => {
                let array = self
                    .reader
                    .by_name::<OwnedRepr<f64>, IxDyn>(&entry)
                    .map_err(|e| Error::npz(&self.path, format!("array `{name}`: {e}")))?;
                Ok(array.mapv(|v| v as f32))
            }
        }
    }

    pub(crate) fn array_f64(&mut self, name: &str) -> Result<ArrayD<f64>> {
        let entry = self.entry(name)?;
        match self.reader.by_name::<OwnedRepr<f64>, IxDyn>(&entry) {
            Ok(array) => Ok(array),
            Err(_) => {
                let array = self
                    .reader
                    .by_name::<OwnedRepr<f32>, IxDyn>(&entry)
                    .map_err(|e| Error::npz(&self.path, format!("array `{name}`: {e}")))?;
                Ok(array.mapv(f64::from))
            }
        }
    }
}
