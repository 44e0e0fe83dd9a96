use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("spectrogram error: {0}")]
    Spectrogram(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("failed to read or write model record: {0}")]
    Record(String),

    #[error("failed to read {path}: {message}")]
    Npz { path: PathBuf, message: String },

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn npz(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Npz {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
