#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input shorter than the structure being decoded from it.
    #[error("Not enough data: got {actual}, need {minimum}")]
    NotEnoughData { actual: usize, minimum: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Modem or framing configuration that cannot produce a valid waveform.
    #[error("Invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFormat(#[from] serde_json::Error),

    /// The radio sink rejected a configure, transmit, or release request.
    #[error("radio sink error: {0}")]
    Radio(String),
}

pub type Result<T> = std::result::Result<T, Error>;
