use super::status::UnitStatus;
use super::store::StoreError;

#[derive(Debug)]
pub enum EngineError {
    CategoryNotFound(String),
    UnitNotFound { category_id: String, unit_number: String },
    TaskNotFound(ulid::Ulid),
    BookingNotFound(String),
    AlreadyExists(String),
    Unavailable { unit_number: String, status: UnitStatus },
    IllegalTransition { from: &'static str, to: &'static str },
    InvalidRange(String),
    InvalidInput(&'static str),
    LimitExceeded(&'static str),
    Store(StoreError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            EngineError::UnitNotFound {
                category_id,
                unit_number,
            } => write!(f, "unit {unit_number} not found in category {category_id}"),
            EngineError::TaskNotFound(id) => write!(f, "task not found: {id}"),
            EngineError::BookingNotFound(r) => write!(f, "booking not found: {r}"),
            EngineError::AlreadyExists(r) => write!(f, "already exists: {r}"),
            EngineError::Unavailable {
                unit_number,
                status,
            } => write!(f, "unit {unit_number} is not available: {status}"),
            EngineError::IllegalTransition { from, to } => {
                write!(f, "illegal status transition: {from} -> {to}")
            }
            EngineError::InvalidRange(msg) => write!(f, "invalid date range: {msg}"),
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}
