use thiserror::Error;

pub type Result<T> = std::result::Result<T, RainforestError>;

#[derive(Debug, Error)]
pub enum RainforestError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rainforest API error {status}: {message}")]
    Api { status: u16, message: String },
}
