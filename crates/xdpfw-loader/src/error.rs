use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("failed to raise RLIMIT_MEMLOCK")]
    Memlock(#[source] std::io::Error),

    #[error("failed to load BPF object: {0}")]
    Load(#[source] aya::EbpfError),

    #[error("program {0:?} not found in the loaded object")]
    ProgramNotFound(&'static str),

    #[error("program {0:?} has an unexpected program type")]
    ProgramType(&'static str, #[source] aya::programs::ProgramError),

    #[error("failed to load program {0:?} into the kernel")]
    ProgramLoad(&'static str, #[source] aya::programs::ProgramError),

    #[error("all attach modes failed for interface {interface:?}; last error: {source}")]
    AttachExhausted { interface: String, #[source] source: aya::programs::ProgramError },

    #[error("required map {0:?} not found in the loaded object")]
    RequiredMapMissing(&'static str),

    #[error("map {0:?} operation failed")]
    Map(&'static str, #[source] aya::maps::MapError),

    #[error("invalid interface name {0:?}")]
    InvalidInterface(String),

    #[error("failed to pin table {0:?}")]
    Pin(&'static str, #[source] std::io::Error),

    #[error(transparent)]
    Config(#[from] xdpfw_config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LoaderError>;
