use thiserror::Error;

pub type ForgeResult<T> = Result<T, ForgeError>;

/// Every error kind a caller of the platform API can observe.
///
/// Validation failures are terminal for the current call; only
/// `StoreUnavailable` is sensibly retryable by the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForgeError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("caller is not allowed to perform this operation")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("participant has not completed onboarding")]
    NotOnboarded,

    #[error("malformed gate pass")]
    MalformedToken,

    #[error("gate pass expired")]
    Expired,

    #[error("gate pass signature mismatch")]
    InvalidSignature,

    #[error("portfolio is already finalized")]
    AlreadyFinalized,

    #[error("cluster market is closed")]
    MarketClosed,

    #[error("invalid allocation: {0}")]
    InvalidAllocation(String),

    #[error("allocations exceed the investable balance")]
    InsufficientBalance,

    #[error("store unavailable")]
    StoreUnavailable,
}

impl ForgeError {
    /// Stable machine-readable code carried in API error bodies.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NotOnboarded => "NOT_ONBOARDED",
            Self::MalformedToken => "MALFORMED_TOKEN",
            Self::Expired => "EXPIRED",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::AlreadyFinalized => "ALREADY_FINALIZED",
            Self::MarketClosed => "MARKET_CLOSED",
            Self::InvalidAllocation(_) => "INVALID_ALLOCATION",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }
}
