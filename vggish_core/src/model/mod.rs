//! Inference side: the network, its weights and the [`EmbeddingModel`] seam
//! the pipeline talks to.

pub mod vggish;
pub mod weights;

use std::path::{Path, PathBuf};

use burn::{
    config::Config,
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::{Tensor, TensorData, backend::Backend},
};
use ndarray::{Array2, Array3};

use crate::error::{Error, Result};
use crate::params;

pub use vggish::{Vggish, VggishConfig};
pub use weights::{convert_checkpoint, import_npz_checkpoint};

pub type WeightsRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Network config stored next to a weights record, `vggish_model.json` for
/// `vggish_model.mpk`. Records hold parameters only.
pub fn config_path(record: &Path) -> PathBuf {
    record.with_extension("json")
}

/// The config saved alongside `record`, if there is one.
pub fn stored_config(record: &Path) -> Result<Option<VggishConfig>> {
    let path = config_path(record);
    if !path.exists() {
        return Ok(None);
    }
    VggishConfig::load(&path)
        .map(Some)
        .map_err(|e| Error::Record(format!("{}: {e:?}", path.display())))
}

/// Anything that maps a batch of `[N, 96, 64]` examples to `[N, D]` embeddings.
pub trait EmbeddingModel {
    fn embed(&mut self, examples: &Array3<f32>) -> Result<Array2<f32>>;

    fn embedding_size(&self) -> usize {
        params::EMBEDDING_SIZE
    }
}

/// VGGish on a burn backend.
pub struct VggishEmbedder<B: Backend> {
    model: Vggish<B>,
    device: B::Device,
}

impl<B: Backend> VggishEmbedder<B> {
    pub fn new(model: Vggish<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Load a record using the config stored next to it, or the published
    /// defaults when there is none.
    pub fn load(path: &Path, device: B::Device) -> Result<Self> {
        let config = stored_config(path)?.unwrap_or_else(VggishConfig::new);
        Self::load_with_config(path, &config, device)
    }

    /// Load weights saved as a burn named-MessagePack record into a network
    /// built from `config`.
    pub fn load_with_config(path: &Path, config: &VggishConfig, device: B::Device) -> Result<Self> {
        if !path.exists() && !path.with_extension("mpk").exists() {
            return Err(Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "model checkpoint not found"),
            ));
        }

        let model = config
            .init::<B>(&device)
            .load_file(path.to_path_buf(), &WeightsRecorder::new(), &device)
            .map_err(|e| Error::Record(format!("{}: {e:?}", path.display())))?;

        log::info!(
            "loaded VGGish weights from {} (embedding relu: {})",
            path.display(),
            config.embedding_relu
        );
        Ok(Self::new(model, device))
    }
}

impl<B: Backend> EmbeddingModel for VggishEmbedder<B> {
    fn embed(&mut self, examples: &Array3<f32>) -> Result<Array2<f32>> {
        let (batch, frames, bands) = examples.dim();
        let expected = (params::example_window_frames(), params::NUM_MEL_BINS);
        if (frames, bands) != expected {
            return Err(Error::Shape(format!(
                "examples are {frames}x{bands}, model expects {}x{}",
                expected.0, expected.1
            )));
        }
        if batch == 0 {
            return Ok(Array2::zeros((0, self.embedding_size())));
        }

        let data: Vec<f32> = examples.iter().copied().collect();
        let input =
            Tensor::<B, 3>::from_data(TensorData::new(data, [batch, frames, bands]), &self.device);

        let output = self.model.forward(input);
        let [rows, cols] = output.dims();
        let values = output
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| Error::Model(format!("{e:?}")))?;

        Array2::from_shape_vec((rows, cols), values).map_err(|e| Error::Shape(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn small_config() -> VggishConfig {
        VggishConfig::new().with_hidden_size(32)
    }

    fn embedder() -> VggishEmbedder<TestBackend> {
        let device = Default::default();
        VggishEmbedder::new(small_config().init(&device), device)
    }

    #[test]
    fn embeds_one_row_per_example() {
        let examples = Array3::<f32>::zeros((3, 96, 64));
        let out = embedder().embed(&examples).unwrap();
        assert_eq!(out.dim(), (3, 128));
    }

    #[test]
    fn empty_batch_is_empty_output() {
        let out = embedder().embed(&Array3::zeros((0, 96, 64))).unwrap();
        assert_eq!(out.dim(), (0, 128));
    }

    #[test]
    fn wrong_example_shape_is_rejected() {
        let err = embedder().embed(&Array3::zeros((1, 90, 64))).unwrap_err();
        assert!(matches!(err, Error::Shape(_)));
    }

    #[test]
    fn missing_checkpoint_is_reported() {
        let result = VggishEmbedder::<TestBackend>::load(
            Path::new("/nonexistent/vggish_model.mpk"),
            Default::default(),
        );
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn saved_record_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vggish_model.mpk");
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);
        model.save_file(path.clone(), &WeightsRecorder::new()).unwrap();

        let mut loaded =
            VggishEmbedder::<TestBackend>::load_with_config(&path, &small_config(), device)
                .unwrap();
        let out = loaded.embed(&Array3::zeros((1, 96, 64))).unwrap();
        assert_eq!(out.dim(), (1, 128));
    }

    #[test]
    fn stored_config_is_none_without_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vggish_model.mpk");
        assert!(stored_config(&path).unwrap().is_none());
        assert_eq!(config_path(&path), dir.path().join("vggish_model.json"));
    }
}
