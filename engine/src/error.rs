use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no tabs available")]
    NoTabsAvailable,

    #[error("need at least two tabs to regroup")]
    NotEnoughTabs,

    #[error("semantic clustering produced no usable groups")]
    NoUsableSemanticGroups,

    #[error("tab source error: {0}")]
    TabSource(String),

    #[error("semantic clustering error: {0}")]
    Semantic(String),

    #[error("state store error: {0}")]
    Store(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown cluster: {0}")]
    UnknownCluster(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
