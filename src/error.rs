// ============================================
// src/error.rs
// クレート共通のエラー型
// ============================================

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to encode save data: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode save data: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("unknown {kind}: {token:?}")]
    UnknownToken { kind: &'static str, token: String },
    #[error("invalid cell id {0:?} (expected \"row-col\")")]
    InvalidCell(String),
    #[error("flashcard deck is empty")]
    EmptyDeck,
    #[error("no data directory available")]
    NoDataDir,
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
