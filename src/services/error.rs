use thiserror::Error;

/// Every expected business failure in the engine. All variants are returned
/// as values; none abort the process. `StoreBusy` is the only transient one
/// and is retried with backoff before it reaches a caller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid seeker ID")]
    InvalidSeeker,
    #[error("You already have an active request for this service type")]
    DuplicateActiveRequest,
    #[error("One or more selected providers are not available")]
    ProviderUnavailable,
    #[error("This offer has already been resolved")]
    OfferNotPending,
    #[error("Request has already been assigned to a provider")]
    AlreadyAssigned,
    #[error("Only the assigned provider can perform this action")]
    NotAssignedProvider,
    #[error("You do not own this request")]
    NotOwner,
    #[error("Operation is not valid in the request's current state")]
    InvalidState,
    #[error("Resource not found")]
    NotFound,
    #[error("Score must be between 1 and 5")]
    InvalidScore,
    #[error("Invalid request ID or unauthorized")]
    InvalidRequest,
    #[error("Cannot rate a request that is not completed")]
    NotCompleted,
    #[error("This request has no assigned provider to rate")]
    NoAssignedProvider,
    #[error("This request has already been rated")]
    AlreadyRated,
    #[error("Store is busy, please retry")]
    StoreBusy,
}

impl EngineError {
    /// Transient failures may succeed on retry; everything else is settled.
    pub fn is_transient(self) -> bool {
        matches!(self, EngineError::StoreBusy)
    }
}
