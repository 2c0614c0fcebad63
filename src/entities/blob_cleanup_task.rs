//! Blob cleanup task entity - Compensating-action log for orphaned blobs.
//!
//! Blob deletions are best-effort companions to database transactions. When
//! one fails, a row is recorded here instead of failing the transaction, so
//! orphaned blobs can be cleaned up later by an external sweep.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Blob cleanup task database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blob_cleanup_tasks")]
pub struct Model {
    /// Unique identifier for the task
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Locator of the blob that failed to delete
    pub storage_path: String,
    /// Why the blob was scheduled for cleanup
    pub reason: String,
    /// When the failed deletion was recorded
    pub created_at: DateTimeUtc,
}

/// No relations; tasks reference blobs by locator only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
