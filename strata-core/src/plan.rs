//! Migration planning: the primitive operations and the change detector.
//!
//! Saving a form produces a *plan*: an ordered list of [`MigrationOp`]s derived by
//! diffing the stored field list against the proposed one. Ops are ordered for
//! referential safety: renames first (so later ops address current names), then type
//! changes, then additions, then drops. Within each class the order is stable by
//! display order.

use crate::field::{FieldDescriptor, FieldType};
use crate::record::MigrationKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One primitive schema operation against a form's dynamic table.
///
/// Ops carry pre-computed column identifiers; no name derivation happens once a plan
/// exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationOp {
    /// Add a nullable column for a new field.
    AddColumn {
        /// Stable identity of the field.
        field_id: Uuid,
        /// Pre-computed column identifier.
        column: String,
        /// Logical type of the new column.
        field_type: FieldType,
    },
    /// Drop the column of a removed field, optionally snapshotting it first.
    DropColumn {
        /// Stable identity of the field.
        field_id: Uuid,
        /// Pre-computed column identifier.
        column: String,
        /// Logical type at drop time; preserved so rollback re-adds the exact
        /// physical type.
        field_type: FieldType,
        /// Whether to snapshot the column before dropping. Defaults to `true`.
        backup: bool,
    },
    /// Rename a column whose field title changed.
    RenameColumn {
        /// Stable identity of the field.
        field_id: Uuid,
        /// Current column identifier.
        from: String,
        /// New column identifier.
        to: String,
    },
    /// Change the column type of a field whose logical type changed.
    ModifyColumn {
        /// Stable identity of the field.
        field_id: Uuid,
        /// Column identifier (post-rename, if the same save also renamed it).
        column: String,
        /// Logical type before the change.
        from: FieldType,
        /// Logical type after the change.
        to: FieldType,
    },
}

impl MigrationOp {
    /// The persisted operation kind for this op.
    pub fn kind(&self) -> MigrationKind {
        match self {
            MigrationOp::AddColumn { .. } => MigrationKind::AddColumn,
            MigrationOp::DropColumn { .. } => MigrationKind::DropColumn,
            MigrationOp::RenameColumn { .. } => MigrationKind::RenameColumn,
            MigrationOp::ModifyColumn { .. } => MigrationKind::ModifyColumn,
        }
    }

    /// The field identity this op concerns.
    pub fn field_id(&self) -> Uuid {
        match self {
            MigrationOp::AddColumn { field_id, .. }
            | MigrationOp::DropColumn { field_id, .. }
            | MigrationOp::RenameColumn { field_id, .. }
            | MigrationOp::ModifyColumn { field_id, .. } => *field_id,
        }
    }

    /// The column identifier this op targets. For renames this is the *target* name.
    pub fn column(&self) -> &str {
        match self {
            MigrationOp::AddColumn { column, .. }
            | MigrationOp::DropColumn { column, .. }
            | MigrationOp::ModifyColumn { column, .. } => column,
            MigrationOp::RenameColumn { to, .. } => to,
        }
    }

    /// Whether executing this op destroys or rewrites data and therefore snapshots
    /// the column first.
    pub fn requires_backup(&self) -> bool {
        match self {
            MigrationOp::AddColumn { .. } | MigrationOp::RenameColumn { .. } => false,
            MigrationOp::DropColumn { backup, .. } => *backup,
            MigrationOp::ModifyColumn { from, to, .. } => from != to,
        }
    }
}

/// A queued operation: the op itself plus, for rollbacks, the migration record it
/// reverses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOp {
    /// The operation to execute.
    pub op: MigrationOp,
    /// When set, this op is the rollback of the referenced migration record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_of: Option<Uuid>,
}

impl QueuedOp {
    /// Wraps a plain (non-rollback) operation.
    pub fn forward(op: MigrationOp) -> Self {
        QueuedOp { op, rollback_of: None }
    }
}

/// Diffs two field lists (keyed by stable field identity) into an ordered migration
/// plan.
///
/// Emission order maintains referential safety:
/// 1. `RENAME` for fields whose identity is preserved but derived column changed,
/// 2. `MODIFY` for fields whose logical type changed,
/// 3. `ADD` for new field identities,
/// 4. `DROP` for removed field identities (always with backup).
///
/// Within each class the order follows display order: the order of `new_fields` for
/// renames, modifies, and adds; the order of `old_fields` for drops.
pub fn detect_changes(
    old_fields: &[FieldDescriptor],
    new_fields: &[FieldDescriptor],
) -> Vec<MigrationOp> {
    let mut plan = Vec::new();

    // 1. RENAME: identity preserved, derived column changed.
    for field in new_fields {
        if let Some(old) = old_fields.iter().find(|f| f.id == field.id) {
            let from = old.column_name();
            let to = field.column_name();
            if from != to {
                plan.push(MigrationOp::RenameColumn { field_id: field.id, from, to });
            }
        }
    }

    // 2. MODIFY: identity preserved, logical type changed. Addresses the post-rename
    //    column name.
    for field in new_fields {
        if let Some(old) = old_fields.iter().find(|f| f.id == field.id) {
            if old.field_type != field.field_type {
                plan.push(MigrationOp::ModifyColumn {
                    field_id: field.id,
                    column: field.column_name(),
                    from: old.field_type,
                    to: field.field_type,
                });
            }
        }
    }

    // 3. ADD: new identities.
    for field in new_fields {
        if !old_fields.iter().any(|f| f.id == field.id) {
            plan.push(MigrationOp::AddColumn {
                field_id: field.id,
                column: field.column_name(),
                field_type: field.field_type,
            });
        }
    }

    // 4. DROP: removed identities, in old display order.
    for field in old_fields {
        if !new_fields.iter().any(|f| f.id == field.id) {
            plan.push(MigrationOp::DropColumn {
                field_id: field.id,
                column: field.column_name(),
                field_type: field.field_type,
                backup: true,
            });
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MigrationKind;

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
    fn test_no_changes_empty_plan() {
        let a = field(Uuid::new_v4(), "A", FieldType::ShortAnswer);
        assert!(detect_changes(&[a.clone()], &[a]).is_empty());
    }

    #[test]
    fn test_plan_ordering_rename_modify_add_drop() {
        // old: [A(text), B(text), C(number)]
        // new: [A'(text, renamed), B(number), D(text)]
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let d = Uuid::new_v4();

        let old = vec![
            field(a, "Alpha", FieldType::ShortAnswer),
            field(b, "Beta", FieldType::ShortAnswer),
            field(c, "Gamma", FieldType::Number),
        ];
        let new = vec![
            field(a, "Alpha Renamed", FieldType::ShortAnswer),
            field(b, "Beta", FieldType::Number),
            field(d, "Delta", FieldType::ShortAnswer),
        ];

        let plan = detect_changes(&old, &new);
        let kinds: Vec<MigrationKind> = plan.iter().map(|op| op.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                MigrationKind::RenameColumn,
                MigrationKind::ModifyColumn,
                MigrationKind::AddColumn,
                MigrationKind::DropColumn,
            ]
        );

        assert_eq!(plan[0].field_id(), a);
        assert_eq!(plan[1].field_id(), b);
        assert_eq!(plan[2].field_id(), d);
        assert_eq!(plan[3].field_id(), c);
    }

    #[test]
    fn test_rename_and_modify_on_same_field_addresses_new_name() {
        let a = Uuid::new_v4();
        let old = vec![field(a, "Count", FieldType::ShortAnswer)];
        let new = vec![field(a, "Total Count", FieldType::Number)];

        let plan = detect_changes(&old, &new);
        assert_eq!(plan.len(), 2);

        let MigrationOp::RenameColumn { to, .. } = &plan[0] else {
            panic!("expected rename first");
        };
        let MigrationOp::ModifyColumn { column, .. } = &plan[1] else {
            panic!("expected modify second");
        };
        assert_eq!(to, column);
    }

    #[test]
    fn test_within_class_order_is_display_order() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let old: Vec<FieldDescriptor> = vec![];
        let new: Vec<FieldDescriptor> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| field(*id, &format!("Field {i}"), FieldType::ShortAnswer))
            .collect();

        let plan = detect_changes(&old, &new);
        let planned: Vec<Uuid> = plan.iter().map(|op| op.field_id()).collect();
        assert_eq!(planned, ids);
    }

    #[test]
    fn test_drops_always_request_backup() {
        let a = field(Uuid::new_v4(), "Gone", FieldType::Paragraph);
        let plan = detect_changes(std::slice::from_ref(&a), &[]);

        assert_eq!(plan.len(), 1);
        assert!(plan[0].requires_backup());
        let MigrationOp::DropColumn { field_type, .. } = &plan[0] else {
            panic!("expected drop");
        };
        assert_eq!(*field_type, FieldType::Paragraph);
    }

    #[test]
    fn test_title_only_rename_detected_via_derived_column() {
        let a = Uuid::new_v4();
        let old = vec![field(a, "Old Title", FieldType::Email)];
        let new = vec![field(a, "New Title", FieldType::Email)];

        let plan = detect_changes(&old, &new);
        assert_eq!(plan.len(), 1);
        let MigrationOp::RenameColumn { from, to, .. } = &plan[0] else {
            panic!("expected rename");
        };
        assert!(from.starts_with("old_title_"));
        assert!(to.starts_with("new_title_"));
        // Same identity, so the collision suffix is identical on both sides.
        assert_eq!(&from[from.len() - 8..], &to[to.len() - 8..]);
    }
}
