//! Repository implementation for form schemas.

use crate::entities::form;
use crate::entities::form::Entity as FormEntity;
use anyhow::Result;
use sea_orm::{ConnectionTrait, EntityTrait, Set};
use strata_core::form::FormSchema;
use uuid::Uuid;

/// Repository for `FormSchema` documents.
///
/// The whole schema is stored as JSONB; the title and table name are pulled out into
/// SQL columns for lookups.
pub struct FormRepository;

impl FormRepository {
    /// Saves a `FormSchema`, inserting or updating by identity.
    ///
    /// # Arguments
    /// * `conn` - Any connection or open transaction.
    /// * `schema` - The form schema to persist.
    pub async fn save<C: ConnectionTrait>(conn: &C, schema: &FormSchema) -> Result<()> {
        let now = chrono::Utc::now();
        let active_model = form::ActiveModel {
            id: Set(schema.id),
            title: Set(schema.title.clone()),
            table_name: Set(schema.table_name.clone()),
            schema: Set(serde_json::to_value(schema)?),
            created_at: Set(now),
            updated_at: Set(now),
        };

        form::Entity::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(form::Column::Id)
                    .update_columns([
                        form::Column::Title,
                        form::Column::Schema,
                        form::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(conn)
            .await?;

        Ok(())
    }

    /// Retrieves a `FormSchema` by its identity.
    ///
    /// # Returns
    /// `Ok(None)` when no form with that identity exists.
    pub async fn find_by_id<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<Option<FormSchema>> {
        let model = FormEntity::find_by_id(id).one(conn).await?;

        match model {
            Some(m) => {
                // The JSON column is the source of truth for the field list.
                let schema: FormSchema = serde_json::from_value(m.schema)?;
                Ok(Some(schema))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use strata_core::field::{FieldDescriptor, FieldType};

    fn sample_schema() -> FormSchema {
        FormSchema::new(
            "Incident Report",
            vec![FieldDescriptor {
                id: Uuid::new_v4(),
                title: "Summary".to_string(),
                field_type: FieldType::ShortAnswer,
                required: true,
                options: None,
            }],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_find_by_id_deserializes_schema_column() {
        let schema = sample_schema();
        let now = chrono::Utc::now();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![form::Model {
                id: schema.id,
                title: schema.title.clone(),
                table_name: schema.table_name.clone(),
                schema: serde_json::to_value(&schema).unwrap(),
                created_at: now,
                updated_at: now,
            }]])
            .into_connection();

        let found = FormRepository::find_by_id(&db, schema.id).await.unwrap().unwrap();
        assert_eq!(found.id, schema.id);
        assert_eq!(found.table_name, schema.table_name);
        assert_eq!(found.fields.len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_id_missing_form() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<form::Model>::new()])
            .into_connection();

        let found = FormRepository::find_by_id(&db, Uuid::new_v4()).await.unwrap();
        assert!(found.is_none());
    }
}
