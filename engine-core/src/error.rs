use thiserror::Error;

/// Every error the engine can produce, tagged by the HTTP-taxonomy kind it
/// maps to at the transport boundary. Background loops match
/// on `EngineError::is_retryable` to decide whether to keep a failing item
/// in rotation or drop it with a logged alert.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    // --- ValidationError: 4xx, not retried ---
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("slippage exceeded: impact {impact} exceeds max {max}")]
    SlippageExceeded { impact: String, max: String },
    #[error("leverage out of bounds: {0}")]
    LeverageOutOfBounds(String),
    #[error("price invariant violated: {0}")]
    PriceInvariant(String),

    // --- NotFound: 4xx ---
    #[error("market not found: {0}")]
    MarketNotFound(String),
    #[error("position not found: {0}")]
    PositionNotFound(String),
    #[error("order not found: {0}")]
    OrderNotFound(String),

    // --- Unauthorized: 4xx ---
    #[error("caller does not own this position")]
    NotPositionOwner,
    #[error("bad admin pin")]
    BadPin,
    #[error("bad wallet signature")]
    BadSignature,

    // --- Conflict: 4xx ---
    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
    #[error("order not cancellable: {0}")]
    OrderNotCancellable(String),

    // --- Business rules that are still ValidationError-shaped ---
    #[error("insufficient margin")]
    InsufficientMargin,
    #[error("insufficient liquidity")]
    InsufficientLiquidity,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("invalid reserve state: {0}")]
    InvalidReserve(String),

    // --- Dependency: 5xx, retried by background loops ---
    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),
    #[error("margin ledger unavailable: {0}")]
    LedgerUnavailable(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    // --- InvariantViolation: 5xx, pauses the market ---
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    /// Dependency-kind errors are the ones background loops retry on the
    /// next tick instead of treating as a hard per-item failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::OracleUnavailable(_)
                | EngineError::LedgerUnavailable(_)
                | EngineError::StoreUnavailable(_)
        )
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, EngineError::InvariantViolation(_))
    }
}

impl From<decimal::DecimalError> for EngineError {
    fn from(err: decimal::DecimalError) -> Self {
        EngineError::InvariantViolation(format!("decimal arithmetic error: {err}"))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
