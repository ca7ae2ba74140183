use thiserror::Error;

/// Entity payloads that parsed as JSON but do not carry what a snapshot
/// needs. Callers map these to an absent value at a single fallback
/// point instead of letting them escape the refresh loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityDataError {
    #[error("missing attribute `{0}`")]
    MissingAttribute(&'static str),
    #[error("attribute `{0}` has an unexpected type")]
    InvalidAttribute(&'static str),
}
