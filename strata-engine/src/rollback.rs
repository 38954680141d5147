//! Pure rollback planning: turning a history record back into an executable
//! operation.
//!
//! Rolling back never mutates the original record. Planning validates the request
//! and produces a *new* queued operation whose forward SQL equals the original's
//! rollback SQL; execution then follows the normal apply path, validation included.

use crate::error::EngineError;
use crate::sql::ColumnState;
use strata_core::field::FieldDescriptor;
use strata_core::plan::{MigrationOp, QueuedOp};
use strata_core::record::{MigrationKind, MigrationRecord};

/// Plans the reversal of `record`.
///
/// # Arguments
/// * `record` - The migration to reverse.
/// * `existing_rollback` - A record already reversing it, if any.
/// * `current_fields` - The form's current field set, for the `FieldStillPresent`
///   guard.
///
/// # Errors
/// * [`EngineError::AlreadyRolledBack`] when a rollback already exists, or when
///   `record` is itself a rollback (rollbacks of rollbacks are disallowed).
/// * [`EngineError::RollbackUnavailable`] when the record failed, carries no
///   rollback SQL, or lacks the column state needed to reconstruct the reverse op.
/// * [`EngineError::FieldStillPresent`] when reversing an ADD whose field is still
///   part of the form.
pub fn plan_rollback(
    record: &MigrationRecord,
    existing_rollback: Option<&MigrationRecord>,
    current_fields: &[FieldDescriptor],
) -> Result<QueuedOp, EngineError> {
    if record.rollback_of.is_some() {
        return Err(EngineError::AlreadyRolledBack(record.id));
    }
    if existing_rollback.is_some() {
        return Err(EngineError::AlreadyRolledBack(record.id));
    }
    if !record.success || record.rollback_sql.is_none() {
        return Err(EngineError::RollbackUnavailable(record.id));
    }
    let field_id = record.field_id.ok_or(EngineError::RollbackUnavailable(record.id))?;

    let op = match record.kind {
        MigrationKind::AddColumn => {
            if current_fields.iter().any(|f| f.id == field_id) {
                return Err(EngineError::FieldStillPresent(record.column_name.clone()));
            }
            let state = new_state(record)?;
            MigrationOp::DropColumn {
                field_id,
                column: record.column_name.clone(),
                field_type: state
                    .field_type
                    .ok_or(EngineError::RollbackUnavailable(record.id))?,
                backup: true,
            }
        }
        MigrationKind::DropColumn => {
            let state = old_state(record)?;
            MigrationOp::AddColumn {
                field_id,
                column: record.column_name.clone(),
                field_type: state
                    .field_type
                    .ok_or(EngineError::RollbackUnavailable(record.id))?,
            }
        }
        MigrationKind::RenameColumn => {
            let state = old_state(record)?;
            MigrationOp::RenameColumn {
                field_id,
                from: record.column_name.clone(),
                to: state.column,
            }
        }
        MigrationKind::ModifyColumn => {
            let old = old_state(record)?;
            let new = new_state(record)?;
            MigrationOp::ModifyColumn {
                field_id,
                column: record.column_name.clone(),
                from: new.field_type.ok_or(EngineError::RollbackUnavailable(record.id))?,
                to: old.field_type.ok_or(EngineError::RollbackUnavailable(record.id))?,
            }
        }
    };

    Ok(QueuedOp { op, rollback_of: Some(record.id) })
}

fn old_state(record: &MigrationRecord) -> Result<ColumnState, EngineError> {
    parse_state(record, record.old_value.as_ref())
}

fn new_state(record: &MigrationRecord) -> Result<ColumnState, EngineError> {
    parse_state(record, record.new_value.as_ref())
}

fn parse_state(
    record: &MigrationRecord,
    value: Option<&serde_json::Value>,
) -> Result<ColumnState, EngineError> {
    value
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .ok_or(EngineError::RollbackUnavailable(record.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql;
    use chrono::Utc;
    use strata_core::field::FieldType;
    use uuid::Uuid;

    fn record_for(op: &MigrationOp, table: &str) -> MigrationRecord {
        let (old_value, new_value) = sql::column_states(op);
        MigrationRecord {
            id: Uuid::new_v4(),
            form_id: Uuid::new_v4(),
            field_id: Some(op.field_id()),
            kind: op.kind(),
            table_name: table.to_string(),
            column_name: op.column().to_string(),
            old_value: old_value.map(|s| serde_json::to_value(s).unwrap()),
            new_value: new_value.map(|s| serde_json::to_value(s).unwrap()),
            forward_sql: sql::forward_sql(table, op),
            rollback_sql: sql::rollback_sql(table, op),
            success: true,
            error_message: None,
            backup_id: None,
            rollback_of: None,
            executed_by: None,
            created_at: Utc::now(),
        }
    }

    fn field(id: Uuid, title: &str, ty: FieldType) -> FieldDescriptor {
        FieldDescriptor {
            id,
            title: title.to_string(),
            field_type: ty,
            required: false,
            options: None,
        }
    }

    #[test]
    fn test_rollback_of_add_drops_the_column() {
        let field_id = Uuid::new_v4();
        let op = MigrationOp::AddColumn {
            field_id,
            column: "b_0a1b2c3d".into(),
            field_type: FieldType::Number,
        };
        let record = record_for(&op, "t_12345678");

        let queued = plan_rollback(&record, None, &[]).unwrap();
        assert_eq!(queued.rollback_of, Some(record.id));
        let MigrationOp::DropColumn { column, field_type, .. } = queued.op else {
            panic!("expected drop");
        };
        assert_eq!(column, "b_0a1b2c3d");
        assert_eq!(field_type, FieldType::Number);
    }

    #[test]
    fn test_rollback_of_add_with_live_field_fails() {
        let field_id = Uuid::new_v4();
        let op = MigrationOp::AddColumn {
            field_id,
            column: "b_0a1b2c3d".into(),
            field_type: FieldType::Number,
        };
        let record = record_for(&op, "t_12345678");
        let fields = [field(field_id, "B", FieldType::Number)];

        assert!(matches!(
            plan_rollback(&record, None, &fields),
            Err(EngineError::FieldStillPresent(_))
        ));
    }

    #[test]
    fn test_rollback_of_drop_readds_exact_type() {
        let op = MigrationOp::DropColumn {
            field_id: Uuid::new_v4(),
            column: "phone_0a1b2c3d".into(),
            field_type: FieldType::Phone,
            backup: true,
        };
        let record = record_for(&op, "t_12345678");

        let queued = plan_rollback(&record, None, &[]).unwrap();
        let MigrationOp::AddColumn { field_type, .. } = queued.op else {
            panic!("expected add");
        };
        assert_eq!(field_type, FieldType::Phone);
    }

    #[test]
    fn test_rollback_of_rename_swaps_names() {
        let op = MigrationOp::RenameColumn {
            field_id: Uuid::new_v4(),
            from: "old_0a1b2c3d".into(),
            to: "new_0a1b2c3d".into(),
        };
        let record = record_for(&op, "t_12345678");

        let queued = plan_rollback(&record, None, &[]).unwrap();
        let MigrationOp::RenameColumn { from, to, .. } = queued.op else {
            panic!("expected rename");
        };
        assert_eq!(from, "new_0a1b2c3d");
        assert_eq!(to, "old_0a1b2c3d");
    }

    #[test]
    fn test_rollback_of_modify_reverses_types() {
        let op = MigrationOp::ModifyColumn {
            field_id: Uuid::new_v4(),
            column: "n_0a1b2c3d".into(),
            from: FieldType::ShortAnswer,
            to: FieldType::Number,
        };
        let record = record_for(&op, "t_12345678");

        let queued = plan_rollback(&record, None, &[]).unwrap();
        let MigrationOp::ModifyColumn { from, to, .. } = queued.op else {
            panic!("expected modify");
        };
        assert_eq!(from, FieldType::Number);
        assert_eq!(to, FieldType::ShortAnswer);
    }

    #[test]
    fn test_rollback_of_rollback_disallowed() {
        let op = MigrationOp::AddColumn {
            field_id: Uuid::new_v4(),
            column: "b_0a1b2c3d".into(),
            field_type: FieldType::Number,
        };
        let mut record = record_for(&op, "t_12345678");
        record.rollback_of = Some(Uuid::new_v4());

        assert!(matches!(
            plan_rollback(&record, None, &[]),
            Err(EngineError::AlreadyRolledBack(_))
        ));
    }

    #[test]
    fn test_double_rollback_disallowed() {
        let op = MigrationOp::AddColumn {
            field_id: Uuid::new_v4(),
            column: "b_0a1b2c3d".into(),
            field_type: FieldType::Number,
        };
        let record = record_for(&op, "t_12345678");
        let existing = record_for(
            &MigrationOp::DropColumn {
                field_id: record.field_id.unwrap(),
                column: "b_0a1b2c3d".into(),
                field_type: FieldType::Number,
                backup: true,
            },
            "t_12345678",
        );

        assert!(matches!(
            plan_rollback(&record, Some(&existing), &[]),
            Err(EngineError::AlreadyRolledBack(_))
        ));
    }

    #[test]
    fn test_failed_records_cannot_be_rolled_back() {
        let op = MigrationOp::AddColumn {
            field_id: Uuid::new_v4(),
            column: "b_0a1b2c3d".into(),
            field_type: FieldType::Number,
        };
        let mut record = record_for(&op, "t_12345678");
        record.success = false;

        assert!(matches!(
            plan_rollback(&record, None, &[]),
            Err(EngineError::RollbackUnavailable(_))
        ));
    }
}
