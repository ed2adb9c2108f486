use updown_files::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
