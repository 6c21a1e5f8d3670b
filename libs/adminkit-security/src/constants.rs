//! Well-known identifiers.

use uuid::Uuid;

/// Default root (superuser) principal id.
///
/// The privilege resolver treats this principal as bypassing all row-level
/// scoping unless a different root id is configured.
pub const DEFAULT_ROOT_PRINCIPAL_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0001);

/// Wildcard permission code granted to the root principal.
pub const ALL_PERMISSIONS: &str = "*";
