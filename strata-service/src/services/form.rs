//! This module provides the service struct for form schema operations, including
//! dynamic-table provisioning.

use crate::error::ServiceError;
use crate::services::migration::Caller;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use strata_core::auth::{self, Operation};
use strata_core::field::FieldSpec;
use strata_core::form::FormSchema;
use strata_core::plan::{MigrationOp, QueuedOp};
use strata_engine::{MigrationContext, MigrationEngine};
use strata_storage_seaorm::repo::FormRepository;
use strata_storage_seaorm::schema_driver as driver;
use uuid::Uuid;

/// Service for creating and reading form schemas.
///
/// Creating a form provisions its dynamic table (id + timestamp columns) and adds
/// one column per initial field through the engine, so provisioning shows up in the
/// migration history like any later edit.
pub struct FormService {
    db: DatabaseConnection,
    engine: Arc<MigrationEngine>,
}

impl FormService {
    /// Creates a new `FormService` instance.
    pub fn new(db: DatabaseConnection, engine: Arc<MigrationEngine>) -> Self {
        Self { db, engine }
    }

    /// Creates a form: derives its table name, provisions the dynamic table, adds
    /// the initial columns, and persists the schema.
    ///
    /// # Errors
    /// `Unauthorized` unless the caller may apply schema changes; validation errors
    /// for bad titles or duplicate field identities.
    pub async fn create_form(
        &self,
        caller: &Caller,
        title: &str,
        fields: Vec<FieldSpec>,
    ) -> Result<FormSchema, ServiceError> {
        match caller.role {
            Some(role) if auth::is_allowed(role, Operation::Apply) => {}
            _ => return Err(ServiceError::Unauthorized { operation: Operation::Apply }),
        }

        let fields = fields
            .into_iter()
            .map(FieldSpec::into_descriptor)
            .collect::<Result<Vec<_>, _>>()?;
        let schema = FormSchema::new(title, fields)?;

        driver::create_dynamic_table(&self.db, &schema.table_name)
            .await
            .map_err(strata_engine::EngineError::from)?;

        let ctx = MigrationContext { form_id: schema.id, actor: caller.actor.clone() };
        for field in &schema.fields {
            let op = MigrationOp::AddColumn {
                field_id: field.id,
                column: field.column_name(),
                field_type: field.field_type,
            };
            self.engine.apply(&ctx, &schema.table_name, &QueuedOp::forward(op)).await?;
        }

        FormRepository::save(&self.db, &schema).await?;
        tracing::info!(form_id = %schema.id, table = %schema.table_name, "form created");
        Ok(schema)
    }

    /// Retrieves a `FormSchema` by its identity.
    pub async fn get_form(&self, id: Uuid) -> Result<FormSchema, ServiceError> {
        FormRepository::find_by_id(&self.db, id)
            .await?
            .ok_or(ServiceError::FormNotFound(id))
    }
}
