use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("type mismatch: local copy is {local}, durable copy is {newest}")]
    TypeMismatch { local: String, newest: String },
}

pub type MergeResult<T> = Result<T, MergeError>;
