#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    ConfigError(#[from] crate::config::ConfigError),

    #[error(transparent)]
    AudiusError(#[from] audius_error::AudiusError),

    #[error(transparent)]
    KeyfileError(#[from] audius_signer::KeyfileError),

    #[error(transparent)]
    DialoguerError(#[from] dialoguer::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    #[error(transparent)]
    FilterParseError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    TracingInitError(#[from] tracing_subscriber::util::TryInitError),

    #[error("Invalid RPC url {0}")]
    InvalidRpcUrl(String),

    #[error("No websocket url for {0}, pass --ws-url or run `audius-eth config set ws`")]
    NoWsUrl(String),

    #[error("Transaction not confirmed")]
    TxAborted,

    #[error("Invalid amount {0}, expected a decimal AUDIO amount such as 1500.5")]
    InvalidAmount(String),
}
