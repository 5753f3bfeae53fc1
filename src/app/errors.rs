use crate::video::VideoError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Video(#[from] VideoError),

    #[error("csv error: {0:?}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}
