use thiserror::Error;

use crate::resolver::ResolutionError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("empty filter expression")]
    EmptyFilter,
    #[error("invalid left operand {0:?}")]
    InvalidLeftOperand(String),
    #[error("invalid right operand {0:?}")]
    InvalidRightOperand(String),
    #[error("invalid sort field {0:?}")]
    InvalidSortField(String),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}
