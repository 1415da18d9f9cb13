use thiserror::Error;

/// Failures that abort a run before any archive output is touched.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("missing or invalid required env var: {0}")]
    MissingToken(&'static str),
    #[error("channel allow-list is empty; set {0}")]
    EmptyAllowlist(&'static str),
    #[error("config invalid or unreadable: {0}")]
    InvalidConfig(String),
    #[error("identity check failed: {0}")]
    AuthFailed(String),
    #[error("channel listing failed: {0}")]
    ChannelListFailed(String),
    #[error("no allow-listed channels resolved")]
    NoChannelsResolved,
    #[error("state directory is locked by another run: {0}")]
    Locked(String),
}

impl ArchiveError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken(_) => "E001_MISSING_TOKEN",
            Self::EmptyAllowlist(_) => "E002_EMPTY_ALLOWLIST",
            Self::InvalidConfig(_) => "E003_CONFIG_INVALID",
            Self::AuthFailed(_) => "E004_AUTH_FAILED",
            Self::ChannelListFailed(_) => "E005_CHANNEL_LIST_FAILED",
            Self::NoChannelsResolved => "E006_NO_CHANNELS",
            Self::Locked(_) => "E007_LOCKED",
        }
    }
}
