use thiserror::Error;

/// Structured errors surfaced at the screening boundary. Library internals use
/// `anyhow` and are wrapped into `Transform` when they cross this boundary, so
/// a caller never sees an unhandled fault.
#[derive(Debug, Error)]
pub enum ScreenError {
    /// The call itself was malformed, e.g. inference without a fitted schema.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The trained model or its feature schema could not be loaded at startup.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// A transformation fault local to this call.
    #[error("feature transform failed: {0}")]
    Transform(#[from] anyhow::Error),
}
