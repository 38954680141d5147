//! Renders forward and rollback SQL for migration operations, and the column-state
//! descriptors persisted alongside them.
//!
//! Rendering delegates to the schema driver's SQL builders so previews, history
//! records, and the executed statements can never disagree.

use serde::{Deserialize, Serialize};
use strata_core::field::FieldType;
use strata_core::physical::PhysicalType;
use strata_core::plan::MigrationOp;
use strata_storage_seaorm::schema_driver::sql;

/// Snapshot of a column's definition, persisted in a migration record's
/// `old_value` / `new_value` fields.
///
/// Rollback planning reconstructs reverse operations from these descriptors, so they
/// must carry enough to re-create the column exactly — in particular the logical
/// type, from which the exact physical type is derived (never a `TEXT` default).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnState {
    /// Column identifier.
    pub column: String,
    /// Logical field type, when the operation knows it (renames do not).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    /// Rendered physical type, for human inspection of the audit trail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical: Option<String>,
}

impl ColumnState {
    /// Descriptor for a column with a known logical type.
    pub fn typed(column: &str, field_type: FieldType) -> Self {
        ColumnState {
            column: column.to_string(),
            field_type: Some(field_type),
            physical: Some(PhysicalType::for_field_type(field_type).ddl()),
        }
    }

    /// Descriptor for a column known only by name.
    pub fn named(column: &str) -> Self {
        ColumnState { column: column.to_string(), field_type: None, physical: None }
    }
}

/// Renders the SQL an operation executes.
pub fn forward_sql(table: &str, op: &MigrationOp) -> String {
    match op {
        MigrationOp::AddColumn { column, field_type, .. } => {
            sql::add_column(table, column, &PhysicalType::for_field_type(*field_type))
        }
        MigrationOp::DropColumn { column, .. } => sql::drop_column(table, column),
        MigrationOp::RenameColumn { from, to, .. } => sql::rename_column(table, from, to),
        MigrationOp::ModifyColumn { column, to, .. } => {
            sql::alter_column_type(table, column, &PhysicalType::for_field_type(*to))
        }
    }
}

/// Renders the SQL that reverses an operation, when reversal is possible.
pub fn rollback_sql(table: &str, op: &MigrationOp) -> Option<String> {
    match op {
        MigrationOp::AddColumn { column, .. } => Some(sql::drop_column(table, column)),
        MigrationOp::DropColumn { column, field_type, .. } => Some(sql::add_column(
            table,
            column,
            &PhysicalType::for_field_type(*field_type),
        )),
        MigrationOp::RenameColumn { from, to, .. } => Some(sql::rename_column(table, to, from)),
        MigrationOp::ModifyColumn { column, from, .. } => Some(sql::alter_column_type(
            table,
            column,
            &PhysicalType::for_field_type(*from),
        )),
    }
}

/// The `(old, new)` column-state descriptors an operation records.
pub fn column_states(op: &MigrationOp) -> (Option<ColumnState>, Option<ColumnState>) {
    match op {
        MigrationOp::AddColumn { column, field_type, .. } => {
            (None, Some(ColumnState::typed(column, *field_type)))
        }
        MigrationOp::DropColumn { column, field_type, .. } => {
            (Some(ColumnState::typed(column, *field_type)), None)
        }
        MigrationOp::RenameColumn { from, to, .. } => {
            (Some(ColumnState::named(from)), Some(ColumnState::named(to)))
        }
        MigrationOp::ModifyColumn { column, from, to, .. } => (
            Some(ColumnState::typed(column, *from)),
            Some(ColumnState::typed(column, *to)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_add_forward_and_rollback() {
        let op = MigrationOp::AddColumn {
            field_id: Uuid::new_v4(),
            column: "score_0a1b2c3d".into(),
            field_type: FieldType::Number,
        };
        assert_eq!(
            forward_sql("t", &op),
            "ALTER TABLE \"t\" ADD COLUMN \"score_0a1b2c3d\" NUMERIC"
        );
        assert_eq!(
            rollback_sql("t", &op),
            Some("ALTER TABLE \"t\" DROP COLUMN \"score_0a1b2c3d\"".to_string())
        );
    }

    #[test]
    fn test_drop_rollback_preserves_exact_physical_type() {
        let op = MigrationOp::DropColumn {
            field_id: Uuid::new_v4(),
            column: "phone_0a1b2c3d".into(),
            field_type: FieldType::Phone,
            backup: true,
        };
        // Rollback re-adds VARCHAR(20), not a TEXT default.
        assert_eq!(
            rollback_sql("t", &op),
            Some("ALTER TABLE \"t\" ADD COLUMN \"phone_0a1b2c3d\" VARCHAR(20)".to_string())
        );
    }

    #[test]
    fn test_rename_rollback_is_symmetric() {
        let op = MigrationOp::RenameColumn {
            field_id: Uuid::new_v4(),
            from: "a_0a1b2c3d".into(),
            to: "b_0a1b2c3d".into(),
        };
        assert_eq!(
            forward_sql("t", &op),
            "ALTER TABLE \"t\" RENAME COLUMN \"a_0a1b2c3d\" TO \"b_0a1b2c3d\""
        );
        assert_eq!(
            rollback_sql("t", &op),
            Some("ALTER TABLE \"t\" RENAME COLUMN \"b_0a1b2c3d\" TO \"a_0a1b2c3d\"".to_string())
        );
    }

    #[test]
    fn test_modify_rollback_reverses_types() {
        let op = MigrationOp::ModifyColumn {
            field_id: Uuid::new_v4(),
            column: "n_0a1b2c3d".into(),
            from: FieldType::ShortAnswer,
            to: FieldType::Number,
        };
        assert!(forward_sql("t", &op).contains("TYPE NUMERIC"));
        assert!(rollback_sql("t", &op).unwrap().contains("TYPE VARCHAR(255)"));
    }

    #[test]
    fn test_column_states_carry_types() {
        let op = MigrationOp::DropColumn {
            field_id: Uuid::new_v4(),
            column: "c".into(),
            field_type: FieldType::Url,
            backup: true,
        };
        let (old, new) = column_states(&op);
        assert!(new.is_none());
        let old = old.unwrap();
        assert_eq!(old.field_type, Some(FieldType::Url));
        assert_eq!(old.physical.as_deref(), Some("VARCHAR(500)"));
    }
}
