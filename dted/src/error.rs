use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DtedError {
    #[error("invalid band directory name {0}")]
    BandName(String),

    #[error("unrecognized tile suffix {0}")]
    TileSuffix(String),

    #[error("invalid tile name {0}")]
    TileName(String),
}
