//! Repository implementation for column backups.

use crate::entities::column_backup;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use strata_core::record::{BackupKind, ColumnBackup, SnapshotRow};
use uuid::Uuid;

/// Filter applied when listing a form's backups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupFilter {
    /// Only backups still inside their restore window.
    Active,
    /// Only backups whose window has closed.
    Expired,
    /// Everything.
    All,
}

impl BackupFilter {
    /// Parses the wire form (`active` / `expired` / `all`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(BackupFilter::Active),
            "expired" => Some(BackupFilter::Expired),
            "all" => Some(BackupFilter::All),
            _ => None,
        }
    }
}

/// Repository for column backups.
pub struct BackupRepository;

impl BackupRepository {
    /// Persists one backup.
    pub async fn insert<C: ConnectionTrait>(conn: &C, backup: &ColumnBackup) -> Result<()> {
        let active_model = column_backup::ActiveModel {
            id: Set(backup.id),
            form_id: Set(backup.form_id),
            table_name: Set(backup.table_name.clone()),
            column_name: Set(backup.column_name.clone()),
            kind: Set(backup.kind.as_str().to_string()),
            snapshot: Set(serde_json::to_value(&backup.rows)?),
            record_count: Set(backup.record_count),
            created_at: Set(backup.created_at),
            expires_at: Set(backup.expires_at),
        };
        column_backup::Entity::insert(active_model).exec(conn).await?;
        Ok(())
    }

    /// Retrieves one backup by identity, snapshot included.
    pub async fn find_by_id<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<Option<ColumnBackup>> {
        let model = column_backup::Entity::find_by_id(id).one(conn).await?;
        model.map(to_domain).transpose()
    }

    /// Lists a form's backups, newest first, honoring the expiration filter.
    pub async fn list_for_form<C: ConnectionTrait>(
        conn: &C,
        form_id: Uuid,
        filter: BackupFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<ColumnBackup>> {
        let mut query = column_backup::Entity::find()
            .filter(column_backup::Column::FormId.eq(form_id));

        query = match filter {
            BackupFilter::Active => query.filter(column_backup::Column::ExpiresAt.gt(now)),
            BackupFilter::Expired => query.filter(column_backup::Column::ExpiresAt.lte(now)),
            BackupFilter::All => query,
        };

        let models = query
            .order_by_desc(column_backup::Column::CreatedAt)
            .all(conn)
            .await?;
        models.into_iter().map(to_domain).collect()
    }

    /// Deletes every backup whose restore window has closed. Returns the number of
    /// rows removed.
    pub async fn delete_expired<C: ConnectionTrait>(
        conn: &C,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let res = column_backup::Entity::delete_many()
            .filter(column_backup::Column::ExpiresAt.lte(now))
            .exec(conn)
            .await?;
        Ok(res.rows_affected)
    }
}

fn to_domain(model: column_backup::Model) -> Result<ColumnBackup> {
    let kind = BackupKind::parse(&model.kind)
        .with_context(|| format!("unknown backup kind '{}'", model.kind))?;
    let rows: Vec<SnapshotRow> =
        serde_json::from_value(model.snapshot).context("malformed backup snapshot")?;
    Ok(ColumnBackup {
        id: model.id,
        form_id: model.form_id,
        table_name: model.table_name,
        column_name: model.column_name,
        kind,
        rows,
        record_count: model.record_count,
        created_at: model.created_at,
        expires_at: model.expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_filter_parse() {
        assert_eq!(BackupFilter::parse("active"), Some(BackupFilter::Active));
        assert_eq!(BackupFilter::parse("expired"), Some(BackupFilter::Expired));
        assert_eq!(BackupFilter::parse("all"), Some(BackupFilter::All));
        assert_eq!(BackupFilter::parse("everything"), None);
    }

    #[tokio::test]
    async fn test_find_by_id_round_trips_snapshot() {
        let rows = vec![
            SnapshotRow { row_id: Uuid::new_v4(), value: Some("x".into()) },
            SnapshotRow { row_id: Uuid::new_v4(), value: None },
        ];
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();
        let model = column_backup::Model {
            id,
            form_id: Uuid::new_v4(),
            table_name: "form_t_12345678".into(),
            column_name: "c_0a1b2c3d".into(),
            kind: "AUTO_DELETE".into(),
            snapshot: serde_json::to_value(&rows).unwrap(),
            record_count: 2,
            created_at: now,
            expires_at: now + chrono::Duration::days(90),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model]])
            .into_connection();

        let backup = BackupRepository::find_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(backup.kind, BackupKind::AutoDelete);
        assert_eq!(backup.rows, rows);
        assert_eq!(backup.record_count, 2);
    }
}
