use thiserror::Error;

use crate::meta::AssetPath;

#[derive(Debug, Error)]
pub enum TsuyaError {
    #[error("asset not found: {0}")]
    NotFound(AssetPath),
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("json failure: {0}")]
    Json(#[from] serde_json::Error),
    #[error("loader failure: {0}")]
    Loader(String),
    #[error("device failure: {0}")]
    Device(String),
}

/// How a failure is treated by the companion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    NotFound,
    MalformedMetadata,
    DecodeOrIo,
    Loader,
}

impl TsuyaError {
    pub fn class(&self) -> FailureClass {
        match self {
            TsuyaError::NotFound(_) => FailureClass::NotFound,
            TsuyaError::MalformedMetadata(_) | TsuyaError::Json(_) => {
                FailureClass::MalformedMetadata
            }
            TsuyaError::Decode(_) | TsuyaError::Io(_) | TsuyaError::Device(_) => {
                FailureClass::DecodeOrIo
            }
            TsuyaError::Loader(_) => FailureClass::Loader,
        }
    }
}

/// Failure while producing one companion sprite or texture.
///
/// Errors raised while closing the asset resource after the primary failure
/// are kept in `suppressed` and never replace `source`.
#[derive(Debug, Error)]
#[error("{path}: {source}{}", suppressed_suffix(.suppressed))]
pub struct CompanionLoadError {
    pub path: AssetPath,
    #[source]
    pub source: TsuyaError,
    pub suppressed: Vec<std::io::Error>,
}

impl CompanionLoadError {
    pub fn new(path: AssetPath, source: TsuyaError) -> Self {
        Self {
            path,
            source,
            suppressed: Vec::new(),
        }
    }

    pub fn class(&self) -> FailureClass {
        self.source.class()
    }
}

fn suppressed_suffix(suppressed: &[std::io::Error]) -> String {
    suppressed
        .iter()
        .map(|err| format!(" (suppressed: {err})"))
        .collect()
}
