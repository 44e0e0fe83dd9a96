//! PCA whitening and 8-bit quantization of raw embeddings.
//!
//! Matches the post-processing applied to the released AudioSet features.
//! The projection runs in `f64`, the precision the PCA parameters ship in.

use std::path::Path;

use ndarray::{Array1, Array2, Axis, Ix2};

use crate::error::{Error, Result};
use crate::npz::NpzArchive;
use crate::params::{
    EMBEDDING_SIZE, PCA_EIGEN_VECTORS_NAME, PCA_MEANS_NAME, QUANTIZE_MAX_VAL, QUANTIZE_MIN_VAL,
};

#[derive(Debug, Clone)]
pub struct Postprocessor {
    /// `[D, D]`, one eigenvector per row.
    eigen_vectors: Array2<f64>,
    /// `[D]`
    means: Array1<f64>,
}

impl Postprocessor {
    pub fn new(eigen_vectors: Array2<f64>, means: Array1<f64>) -> Result<Self> {
        let (rows, cols) = eigen_vectors.dim();
        if rows != cols || cols != means.len() {
            return Err(Error::Shape(format!(
                "PCA eigenvectors are {rows}x{cols} but means have {} entries",
                means.len()
            )));
        }
        Ok(Self {
            eigen_vectors,
            means,
        })
    }

    /// Load `pca_eigen_vectors` and `pca_means` from an `.npz` file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut npz = NpzArchive::open(path)?;

        let eigen_vectors = npz
            .array_f64(PCA_EIGEN_VECTORS_NAME)?
            .into_dimensionality::<Ix2>()
            .map_err(|e| Error::npz(path, format!("{PCA_EIGEN_VECTORS_NAME}: {e}")))?;

        // Stored as a column vector, [D, 1].
        let means = npz.array_f64(PCA_MEANS_NAME)?;
        let means_len = means.len();
        let means = means
            .into_shape_with_order(means_len)
            .map_err(|e| Error::npz(path, format!("{PCA_MEANS_NAME}: {e}")))?;

        let pproc = Self::new(eigen_vectors, means)?;
        if pproc.dim() != EMBEDDING_SIZE {
            log::warn!(
                "PCA parameters are {}-dimensional, VGGish embeddings are {}",
                pproc.dim(),
                EMBEDDING_SIZE
            );
        }
        log::info!("loaded PCA parameters from {}", path.display());
        Ok(pproc)
    }

    pub fn dim(&self) -> usize {
        self.means.len()
    }

    /// Whiten `[N, D]` embeddings and quantize them to `0..=255`.
    pub fn postprocess(&self, embeddings: &Array2<f32>) -> Result<Array2<u8>> {
        if embeddings.ncols() != self.dim() {
            return Err(Error::Shape(format!(
                "embeddings have {} columns, PCA expects {}",
                embeddings.ncols(),
                self.dim()
            )));
        }

        // (E · (Xᵀ − μ))ᵀ == (X − μ) · Eᵀ
        let centered = embeddings.mapv(f64::from) - &self.means.view().insert_axis(Axis(0));
        let whitened = centered.dot(&self.eigen_vectors.t());

        Ok(whitened.mapv(quantize))
    }
}

fn quantize(value: f64) -> u8 {
    let clipped = value.clamp(QUANTIZE_MIN_VAL, QUANTIZE_MAX_VAL);
    let scaled = (clipped - QUANTIZE_MIN_VAL) * (255.0 / (QUANTIZE_MAX_VAL - QUANTIZE_MIN_VAL));
    scaled as u8
}
