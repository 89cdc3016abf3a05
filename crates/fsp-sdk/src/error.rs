use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("object was removed: {0}")]
    Removed(String),

    #[error("store error: {0}")]
    Store(#[from] fsp_store::StoreError),

    #[error("merge error: {0}")]
    Merge(#[from] fsp_merge::MergeError),
}

pub type SdkResult<T> = Result<T, SdkError>;
