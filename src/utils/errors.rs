use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("provider not found: {0}")]
    NotFound(String),

    #[error("provider is disabled: {0}")]
    Disabled(String),

    #[error("invalid provider config: {0}")]
    InvalidConfig(String),

    #[error("failed to connect to {provider}: {reason}")]
    ConnectFailed { provider: String, reason: String },

    #[error("failed to initialize {provider}: {reason}")]
    InitFailed { provider: String, reason: String },

    #[error("failed to sync capabilities for {provider}: {reason}")]
    SyncFailed { provider: String, reason: String },

    #[error("invalid composite name: {0}")]
    InvalidFormat(String),

    #[error("failed to decode tool arguments: {0}")]
    ArgumentDecodeFailed(String),

    #[error("tool invocation failed: {0}")]
    InvocationFailed(String),

    #[error("ping failed for {provider}: {reason}")]
    ProbeFailed { provider: String, reason: String },

    #[error("language model call failed: {0}")]
    ModelFailed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Protocol { code: i32, message: String },

    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("operation cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HostError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Disabled(_) => "DISABLED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ConnectFailed { .. } => "CONNECT_FAILED",
            Self::InitFailed { .. } => "INIT_FAILED",
            Self::SyncFailed { .. } => "SYNC_FAILED",
            Self::InvalidFormat(_) => "INVALID_FORMAT",
            Self::ArgumentDecodeFailed(_) => "ARGUMENT_DECODE_FAILED",
            Self::InvocationFailed(_) => "INVOCATION_FAILED",
            Self::ProbeFailed { .. } => "PROBE_FAILED",
            Self::ModelFailed(_) => "MODEL_FAILED",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Protocol { .. } => "PROTOCOL_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Errors that belong to a single invocation and never abort a batch.
    pub fn is_per_invocation(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::InvalidFormat(_)
                | Self::ArgumentDecodeFailed(_)
                | Self::InvocationFailed(_)
        )
    }
}

impl From<figment::Error> for HostError {
    fn from(e: figment::Error) -> Self {
        HostError::Config(e.to_string())
    }
}

pub type HostResult<T> = Result<T, HostError>;
