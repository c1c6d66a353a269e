use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("segment count must be at least 1, got {0}")]
    InvalidSegmentCount(usize),
    #[error("unknown risk tier: {0:?}")]
    UnknownRiskTier(String),
    #[error("invalid bet {bet} against balance {balance}")]
    InvalidBet { bet: f64, balance: f64 },
    #[error("segment index {index} out of range for {len} segments")]
    IndexOutOfRange { index: usize, len: usize },
}

pub type EngineResult<T> = Result<T, EngineError>;
