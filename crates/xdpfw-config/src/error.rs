use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },

    #[error("invalid address {value:?} in filter {index}: {reason}")]
    InvalidAddress { index: usize, value: String, reason: String },

    #[error("invalid CIDR prefix {value:?} in filter {index}")]
    InvalidCidr { index: usize, value: String },

    #[error("invalid TCP flag name {0:?}")]
    InvalidTcpFlag(String),

    #[error("TCP flag {0:?} cannot be required both set and clear")]
    ConflictingTcpFlag(String),

    #[error("invalid action {0:?} in filter {1}")]
    InvalidAction(String, usize),

    #[error("filter list has {0} entries, which exceeds MAX_FILTERS ({1})")]
    TooManyFilters(usize, u32),

    #[error("range-drop list has {0} entries, which exceeds MAX_IP_RANGES ({1})")]
    TooManyRanges(usize, u32),

    #[error("invalid CIDR range {0:?}: {1}")]
    InvalidRange(String, String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
