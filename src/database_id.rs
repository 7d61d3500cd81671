//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// Database identifier for a church (tenant).
pub type ChurchId = i64;
/// Database identifier for a user.
pub type UserId = i64;
/// Database identifier for a revenue or expense category.
pub type CategoryId = i64;
/// Database identifier for an operating ledger entry.
pub type EntryId = i64;
/// Database identifier for a reserve fund.
pub type FundId = i64;
