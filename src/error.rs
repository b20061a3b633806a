use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("Pool is shut down")]
    PoolShutdown,

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Worker thread panicked: {0}")]
    WorkerPanic(String),
}

pub type Result<T> = std::result::Result<T, Error>;
