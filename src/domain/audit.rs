use chrono::{DateTime, Utc};

/// Append-only lifecycle fact. Written by intake and the processor,
/// never read back by either.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogEntry {
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}
