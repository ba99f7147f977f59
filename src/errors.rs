use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Missing required setting {0}. Set the {1} environment variable or pass --{2}")]
    MissingSetting(&'static str, &'static str, &'static str),

    #[error("Unknown test case '{0}'. Available: {}", .1.join(", "))]
    UnknownTestCase(String, Vec<String>),

    #[error("Image '{0}' is not available to the container runtime")]
    ImageNotFound(String),

    #[error("Container runtime error: {0}")]
    RuntimeError(String),

    #[error("Container '{0}' not found (no CID file recorded)")]
    ContainerNotFound(String),

    #[error("Could not connect to Redis in '{0}' after {1} attempts")]
    ConnectionTimeout(String, u32),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Documentation check failed: {0}")]
    DocumentationError(String),

    #[error("Interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CheckError>;
