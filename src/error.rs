use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("No browser session available: {0}")]
    SessionUnavailable(String),

    #[error("Browser connection lost")]
    ConnectionLost,

    #[error("Navigation timeout after {0}s")]
    NavigationTimeout(u64),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Navigation produced no observable response")]
    NoResponse,

    #[error("Target is a protected metadata endpoint")]
    Forbidden,

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationError(String),

    #[error("Condition not satisfied within {0}s")]
    ConditionTimeout(u64),

    #[error("Image capture failed: {0}")]
    CaptureFailed(String),

    #[error("Frame encoding failed: {0}")]
    EncoderFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),
}

impl RenderError {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::LaunchFailed(_) => vec![
                "Ensure Chrome/Chromium is installed".into(),
                "Check if another Chrome instance is using the debugging port".into(),
                "Try specifying Chrome path with --chrome-path".into(),
            ],
            Self::SessionUnavailable(_) | Self::ConnectionLost => vec![
                "Check if Chrome was closed manually".into(),
                "Verify the debugging port with --port".into(),
            ],
            Self::NavigationTimeout(timeout) => vec![
                format!("Increase timeout with --timeout {}", timeout + 10),
                "Check network connectivity".into(),
                "Verify URL is accessible".into(),
            ],
            Self::NoResponse => vec![
                "Verify the URL scheme is http or https".into(),
                "Check that the host resolves and accepts connections".into(),
            ],
            Self::Forbidden => vec![
                "Cloud metadata endpoints are never rendered".into(),
            ],
            Self::EncoderFailed(_) => vec![
                "Ensure ffmpeg is installed and on PATH".into(),
                "Check write permissions for the frames directory".into(),
            ],
            Self::InvalidUrl(_) => vec![
                "Ensure URL includes protocol (http:// or https://)".into(),
                "Check for typos in the URL".into(),
            ],
            Self::ConfigError(_) => vec![
                "Check configuration file syntax".into(),
                "Use --config to specify a different config file".into(),
            ],
            _ => vec!["Run with --verbose for more details".into()],
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::LaunchFailed(_) | Self::SessionUnavailable(_) | Self::ConnectionLost => 3,
            Self::NavigationTimeout(_) | Self::NavigationFailed(_) => 4,
            Self::NoResponse => 5,
            Self::Forbidden => 6,
            Self::EncoderFailed(_) | Self::CaptureFailed(_) | Self::IoError(_) => 7,
            Self::ConfigError(_) | Self::TomlDeError(_) | Self::TomlSerError(_) => 8,
            Self::InvalidUrl(_) => 2,
            _ => 1,
        }
    }
}
