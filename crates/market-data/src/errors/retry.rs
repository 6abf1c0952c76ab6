/// Classification for retry policy.
///
/// Used by callers to decide whether a failed price lookup is worth repeating.
///
/// | Class | Retry? |
/// |-------|--------|
/// | `Never` | No, the request itself is bad |
/// | `WithBackoff` | Yes, after a delay (the source is degraded) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - bad symbol, validation error, or terminal failure.
    Never,

    /// Retry with backoff.
    ///
    /// Used for transient errors like rate limiting (429), timeouts and
    /// provider outages.
    WithBackoff,
}
