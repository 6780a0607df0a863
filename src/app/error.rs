use thiserror::Error;

#[derive(Error, Debug)]
pub enum BinderyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A required input was absent or inconsistent. Raised immediately,
    /// never retried.
    #[error("Input contract violation: {0}")]
    Contract(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BinderyError>;
