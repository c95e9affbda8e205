use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no usable input device: {0}")]
    DeviceUnavailable(String),

    #[error("failed to enumerate devices: {0}")]
    DeviceEnumeration(String),

    #[error("failed to build capture stream: {0}")]
    StreamBuild(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a session is already active")]
    AlreadyActive,

    #[error("audio device error: {0}")]
    Device(#[from] AudioError),

    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    #[error("malformed inbound message: {0}")]
    ProtocolError(String),

    #[error("transport closed: {0}")]
    TransportClosed(String),

    #[error("graceful stop did not complete within the grace period")]
    StopTimeout,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink initialization failed: {0}")]
    InitializationFailed(String),

    #[error("failed to write transcript: {0}")]
    WriteFailed(String),

    #[error("sink not found: {0}")]
    NotFound(String),
}
