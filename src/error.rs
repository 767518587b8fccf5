//! Error types for bulkmail.

use uuid::Uuid;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Recipient resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Consent error: {0}")]
    Consent(#[from] ConsentError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Recipient resolution errors. Fatal to a run before any send is attempted.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Segment {segment} unreachable: {reason}")]
    SegmentUnreachable { segment: String, reason: String },

    #[error("Segment {segment} returned malformed data: {reason}")]
    MalformedSegment { segment: String, reason: String },

    #[error("Campaign has no recipient source (neither explicit list nor segment)")]
    NoRecipientSource,
}

/// Consent registry errors. Fatal to a run before any send is attempted.
#[derive(Debug, thiserror::Error)]
pub enum ConsentError {
    /// Tenant consent configuration missing or marked inactive. Callers must
    /// never treat this as "all consented".
    #[error("Consent configuration unavailable for tenant {tenant}")]
    ConfigUnavailable { tenant: String },

    #[error("Consent status check failed: {reason}")]
    CheckFailed { reason: String },
}

/// Transport send errors, scoped to a single chunk.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Provider returned status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Send timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Tenant transport is not configured: {0}")]
    NotConfigured(String),
}

/// Dispatch-run errors — structural failures that abort a run with no sends
/// attempted and no quota touched.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Campaign {0} not found")]
    CampaignNotFound(Uuid),

    #[error("Tenant {0} not found")]
    TenantNotFound(String),

    #[error("Recipient resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Consent check failed: {0}")]
    Consent(#[from] ConsentError),

    #[error("Transport setup failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
