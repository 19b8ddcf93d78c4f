use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlannerError {
    #[error("invalid move: {0}")]
    InvalidMove(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("stepper fault: {0}")]
    Stepper(String),
    #[error("block consumer disconnected")]
    Disconnected,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("missing machine settings")]
    MissingSettings,
    #[error("invalid settings: {0}")]
    InvalidSettings(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
