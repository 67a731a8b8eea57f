//! Identifier types shared across the crate.

use uuid::Uuid;

pub type UserId = Uuid;
pub type FileId = Uuid;
/// Reference to a stored binary object, returned to clients as `storageId`.
pub type StorageId = Uuid;
/// Identifier embedded in an upload token; at most one stored object may carry it.
pub type UploadId = Uuid;
/// Organizations are opaque string ids. A user's own id doubles as their personal organization.
pub type OrgId = String;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
