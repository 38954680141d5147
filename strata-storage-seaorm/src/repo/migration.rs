//! Repository implementation for the append-only migration history.
//!
//! There is deliberately no update method here: history records are immutable once
//! appended, and rollbacks append new records instead of touching old ones.

use crate::entities::field_migration;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use strata_core::record::{MigrationKind, MigrationRecord};
use uuid::Uuid;

/// Repository for migration history records.
pub struct MigrationRepository;

impl MigrationRepository {
    /// Appends one history record.
    ///
    /// Callers pass the transaction that also carries the DDL, so the record and the
    /// schema change commit or roll back together.
    pub async fn insert<C: ConnectionTrait>(conn: &C, record: &MigrationRecord) -> Result<()> {
        field_migration::Entity::insert(to_active(record)).exec(conn).await?;
        Ok(())
    }

    /// Retrieves one history record by identity.
    pub async fn find_by_id<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<Option<MigrationRecord>> {
        let model = field_migration::Entity::find_by_id(id).one(conn).await?;
        model.map(to_domain).transpose()
    }

    /// Lists a form's history, newest first.
    pub async fn list_for_form<C: ConnectionTrait>(
        conn: &C,
        form_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<MigrationRecord>> {
        let models = field_migration::Entity::find()
            .filter(field_migration::Column::FormId.eq(form_id))
            .order_by_desc(field_migration::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(conn)
            .await?;

        models.into_iter().map(to_domain).collect()
    }

    /// Finds the record (if any) that rolled back the given migration.
    pub async fn find_rollback_of<C: ConnectionTrait>(
        conn: &C,
        migration_id: Uuid,
    ) -> Result<Option<MigrationRecord>> {
        let model = field_migration::Entity::find()
            .filter(field_migration::Column::RollbackOf.eq(migration_id))
            .filter(field_migration::Column::Success.eq(true))
            .one(conn)
            .await?;
        model.map(to_domain).transpose()
    }

    /// Finds a successful record matching an op signature appended after `since`.
    ///
    /// Used by workers to reconcile a retried job whose previous attempt committed
    /// but crashed before acknowledging.
    pub async fn find_success_since<C: ConnectionTrait>(
        conn: &C,
        table_name: &str,
        column_name: &str,
        kind: MigrationKind,
        since: DateTime<Utc>,
    ) -> Result<Option<MigrationRecord>> {
        let model = field_migration::Entity::find()
            .filter(field_migration::Column::TableName.eq(table_name))
            .filter(field_migration::Column::ColumnName.eq(column_name))
            .filter(field_migration::Column::Kind.eq(kind.as_str()))
            .filter(field_migration::Column::Success.eq(true))
            .filter(field_migration::Column::CreatedAt.gte(since))
            .order_by_desc(field_migration::Column::CreatedAt)
            .one(conn)
            .await?;
        model.map(to_domain).transpose()
    }
}

fn to_active(record: &MigrationRecord) -> field_migration::ActiveModel {
    field_migration::ActiveModel {
        id: Set(record.id),
        form_id: Set(record.form_id),
        field_id: Set(record.field_id),
        kind: Set(record.kind.as_str().to_string()),
        table_name: Set(record.table_name.clone()),
        column_name: Set(record.column_name.clone()),
        old_value: Set(record.old_value.clone()),
        new_value: Set(record.new_value.clone()),
        forward_sql: Set(record.forward_sql.clone()),
        rollback_sql: Set(record.rollback_sql.clone()),
        success: Set(record.success),
        error_message: Set(record.error_message.clone()),
        backup_id: Set(record.backup_id),
        rollback_of: Set(record.rollback_of),
        executed_by: Set(record.executed_by.clone()),
        created_at: Set(record.created_at),
    }
}

fn to_domain(model: field_migration::Model) -> Result<MigrationRecord> {
    let kind = MigrationKind::parse(&model.kind)
        .with_context(|| format!("unknown migration kind '{}'", model.kind))?;
    Ok(MigrationRecord {
        id: model.id,
        form_id: model.form_id,
        field_id: model.field_id,
        kind,
        table_name: model.table_name,
        column_name: model.column_name,
        old_value: model.old_value,
        new_value: model.new_value,
        forward_sql: model.forward_sql,
        rollback_sql: model.rollback_sql,
        success: model.success,
        error_message: model.error_message,
        backup_id: model.backup_id,
        rollback_of: model.rollback_of,
        executed_by: model.executed_by,
        created_at: model.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn sample_model(kind: &str) -> field_migration::Model {
        field_migration::Model {
            id: Uuid::new_v4(),
            form_id: Uuid::new_v4(),
            field_id: Some(Uuid::new_v4()),
            kind: kind.to_string(),
            table_name: "form_t_12345678".into(),
            column_name: "c_0a1b2c3d".into(),
            old_value: None,
            new_value: Some(serde_json::json!({"type": "number"})),
            forward_sql: "ALTER TABLE \"form_t_12345678\" ADD COLUMN \"c_0a1b2c3d\" NUMERIC".into(),
            rollback_sql: Some("ALTER TABLE \"form_t_12345678\" DROP COLUMN \"c_0a1b2c3d\"".into()),
            success: true,
            error_message: None,
            backup_id: None,
            rollback_of: None,
            executed_by: Some("admin@example.com".into()),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_find_by_id_maps_kind() {
        let model = sample_model("ADD_COLUMN");
        let id = model.id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model]])
            .into_connection();

        let record = MigrationRepository::find_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(record.kind, MigrationKind::AddColumn);
        assert!(record.success);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_an_error_not_a_panic() {
        let model = sample_model("SOMETHING_ELSE");
        let id = model.id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model]])
            .into_connection();

        assert!(MigrationRepository::find_by_id(&db, id).await.is_err());
    }
}
