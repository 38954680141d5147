//! The preview result shown in the form builder's confirmation modal.

use serde::{Deserialize, Serialize};
use strata_core::record::MigrationKind;

/// What one migration operation *would* do, computed without mutating any state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPreview {
    /// Operation kind.
    pub kind: MigrationKind,
    /// Column the operation targets (post-rename name for renames).
    pub column: String,
    /// SQL the operation would execute.
    pub forward_sql: String,
    /// SQL that would reverse it, when reversal is possible.
    pub rollback_sql: Option<String>,
    /// Whether the operation would pass validation as the table stands now.
    pub valid: bool,
    /// Whether a backup would be taken first.
    pub requires_backup: bool,
    /// Rows currently in the dynamic table.
    pub estimated_rows: i64,
    /// Everything the user should read before confirming.
    pub warnings: Vec<String>,
}
