use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PourError {
    #[error("planning failed after {attempts} attempt(s): {cause}")]
    PlanningFailure { attempts: u32, cause: String },
    #[error("sensor read failed: {0}")]
    SensorRead(String),
    #[error("invalid geometry: {0}")]
    Geometry(String),
    #[error("expected exactly one {what}, found {found}")]
    LocalizationAmbiguous { what: &'static str, found: usize },
    #[error("action {index} ({kind}) failed: {cause}")]
    Execution {
        index: usize,
        kind: &'static str,
        cause: String,
    },
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware timeout")]
    Timeout,
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("missing planner")]
    MissingPlanner,
    #[error("missing arm")]
    MissingArm,
    #[error("missing gripper")]
    MissingGripper,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
