use thiserror::Error;

use super::id::PrefabId;

// Programmer errors and rejected registrations.
// Expected outcomes of normal pool churn (despawning an inactive instance,
// purging an unknown handle) are reported as `false`/`None` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("template '{name}' ({id}) is already registered with this pool")]
    DuplicateRegistration { id: PrefabId, name: String },
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
    #[error("config error: {0}")]
    Config(String),
}

pub type PoolResult<T> = Result<T, PoolError>;
