//! Labeled input discovery: `<root>/<label>/<file>`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// How the `filename` column is derived from an input file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdScheme {
    /// Full file name, text after the first `-` and before the next `-`
    /// or `__`: `A-15__10_07_13_radaUno_Pasa_1.wav` -> `15`. The extension
    /// stays when nothing follows it: `B-7.flac` -> `7.flac`. Names without
    /// `-` fall back to the stem.
    #[default]
    Prefixed,
    /// The file stem, unchanged.
    Stem,
}

impl IdScheme {
    pub fn derive(self, path: &Path) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        match self {
            IdScheme::Stem => stem,
            IdScheme::Prefixed => {
                let name = path
                    .file_name()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match name.split('-').nth(1) {
                    Some(rest) => rest.split("__").next().unwrap_or(rest).to_string(),
                    None => stem,
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Label directories to read, in order. `None` takes every subdirectory.
    pub labels: Option<Vec<String>>,
    /// Lowercase extensions without the dot; empty accepts every file.
    pub extensions: Vec<String>,
    pub id_scheme: IdScheme,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            labels: None,
            extensions: ["wav", "flac", "mp3", "ogg"].map(String::from).to_vec(),
            id_scheme: IdScheme::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledFile {
    pub path: PathBuf,
    pub label: String,
    pub id: String,
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub root: PathBuf,
    pub labels: Vec<String>,
    pub files: Vec<LabeledFile>,
}

impl Dataset {
    pub fn scan(root: &Path, options: &ScanOptions) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::Dataset(format!(
                "input directory {} does not exist",
                root.display()
            )));
        }

        let labels = match &options.labels {
            Some(labels) => labels.clone(),
            None => label_dirs(root)?,
        };

        let mut files = Vec::new();
        for label in &labels {
            let dir = root.join(label);
            if !dir.is_dir() {
                return Err(Error::Dataset(format!(
                    "label directory {} does not exist",
                    dir.display()
                )));
            }

            let before = files.len();
            for entry in WalkDir::new(&dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
            {
                let entry = entry.map_err(|e| Error::Dataset(e.to_string()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.into_path();
                if !has_extension(&path, &options.extensions) {
                    log::debug!("ignoring {}", path.display());
                    continue;
                }
                files.push(LabeledFile {
                    id: options.id_scheme.derive(&path),
                    label: label.clone(),
                    path,
                });
            }
            log::debug!("label {label}: {} files", files.len() - before);
        }

        Ok(Self {
            root: root.to_path_buf(),
            labels,
            files,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn label_dirs(root: &Path) -> Result<Vec<String>> {
    let mut labels = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| Error::Dataset(e.to_string()))?;
        if entry.file_type().is_dir() {
            labels.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(labels)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}
