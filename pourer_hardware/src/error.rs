use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("device fault: {0}")]
    Fault(String),
    #[error("hardware timeout")]
    Timeout,
    #[error("no collision-free path found (seed {seed})")]
    NoPath { seed: u64 },
    #[error("goal collides with '{0}'")]
    GoalInCollision(String),
}
