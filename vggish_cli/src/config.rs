//! Extraction settings, read from an optional YAML file and overridden by
//! command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use vggish_core::{IdScheme, PipelineOptions, ScanOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Root holding one subdirectory per label.
    pub input_dir: Option<PathBuf>,
    /// CSV written by the run; truncated if it exists.
    pub output: PathBuf,
    /// burn record with the VGGish weights
    pub checkpoint: PathBuf,
    pub pca_params: PathBuf,
    /// Label subdirectories to read, in order. Empty means all of them.
    pub labels: Vec<String>,
    pub extensions: Vec<String>,
    pub id_scheme: IdScheme,
    pub min_duration_secs: f64,
    /// Write raw embeddings instead of PCA-whitened, quantized ones.
    pub raw: bool,
    /// Set for checkpoints trained with a ReLU on the embedding layer.
    pub embedding_relu: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        let scan = ScanOptions::default();
        Self {
            input_dir: None,
            output: PathBuf::from("vggish_features.csv"),
            checkpoint: PathBuf::from("vggish_model.mpk"),
            pca_params: PathBuf::from("vggish_pca_params.npz"),
            labels: Vec::new(),
            extensions: scan.extensions,
            id_scheme: scan.id_scheme,
            min_duration_secs: PipelineOptions::default().min_duration_secs,
            raw: false,
            embedding_relu: false,
        }
    }
}

impl ExtractConfig {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            labels: (!self.labels.is_empty()).then(|| self.labels.clone()),
            extensions: self
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            id_scheme: self.id_scheme,
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            min_duration_secs: self.min_duration_secs,
        }
    }
}

/// Load configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<ExtractConfig> {
    log::info!("load_config: Loading from {}", path.display());
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: ExtractConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    log::debug!("load_config: {config:?}");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_file_names() {
        let config = ExtractConfig::default();
        assert_eq!(config.checkpoint, PathBuf::from("vggish_model.mpk"));
        assert_eq!(config.pca_params, PathBuf::from("vggish_pca_params.npz"));
        assert_eq!(config.min_duration_secs, 1.0);
        assert!(config.scan_options().labels.is_none());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vggish.yaml");
        std::fs::write(
            &path,
            "input_dir: /data/ShipsEar/ABCDE\nlabels: [A, B, C, D, E]\nid_scheme: stem\nextensions: [.WAV]\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.input_dir, Some(PathBuf::from("/data/ShipsEar/ABCDE")));
        assert_eq!(config.output, PathBuf::from("vggish_features.csv"));

        let scan = config.scan_options();
        assert_eq!(scan.labels.unwrap(), vec!["A", "B", "C", "D", "E"]);
        assert_eq!(scan.id_scheme, IdScheme::Stem);
        assert_eq!(scan.extensions, vec!["wav"]);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "min_duration_secs: [not, a, number]\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
