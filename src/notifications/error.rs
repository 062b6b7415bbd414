use thiserror::Error;

/// Delivery failure for a single deletion warning.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Invalid channel configuration: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway returned {status}: {body}")]
    Status { status: u16, body: String },
}

pub type ChannelResult<T> = Result<T, ChannelError>;
