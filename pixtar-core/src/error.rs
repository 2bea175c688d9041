use thiserror::Error;

#[derive(Error, Debug)]
pub enum PixtarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Format error: {0}")]
    Format(String),

    #[error("worker {index} failed reading its scope: {source}")]
    Worker {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, PixtarError>;
