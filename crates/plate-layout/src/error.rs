use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("path out of bounds at depth {depth}: {index} > {len}")]
    OutOfBounds {
        depth: usize,
        index: usize,
        len: usize,
    },
    #[error("non-container node at depth {depth}")]
    NotContainer { depth: usize },
    #[error("expected text node")]
    NotText,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriterError {
    #[error("invalid position: {0}")]
    InvalidPosition(#[from] PathError),
    #[error("split limit is not a proper ancestor of the position")]
    InvalidSplitLimit,
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("normalization did not converge after {0} iterations")]
    NormalizeDidNotConverge(usize),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("unknown toolbar item: {0}")]
    UnknownToolbarItem(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no position in the document accepts `{0}`")]
    NoInsertionPoint(String),
    #[error("failed to apply transaction: {0}")]
    Apply(#[from] ApplyError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown query: {0}")]
    Unknown(String),
    #[error("failed to decode query result: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate node spec kind: {0}")]
    DuplicateNodeSpec(String),
    #[error("duplicate command id: {0}")]
    DuplicateCommand(String),
    #[error("duplicate query id: {0}")]
    DuplicateQuery(String),
    #[error("duplicate toolbar item id: {0}")]
    DuplicateToolbarItem(String),
    #[error("duplicate {mode:?} downcast for `{kind}`")]
    DuplicateDowncast {
        kind: String,
        mode: crate::conversion::DowncastMode,
    },
}
