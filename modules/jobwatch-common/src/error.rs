use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event source error: {0}")]
    EventSource(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
