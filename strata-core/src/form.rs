//! This module defines `FormSchema`, the blueprint that ties a form to its dynamic
//! SQL table.
//!
//! A form owns exactly one dynamic table; the table's user columns are defined by the
//! form's ordered field list. The field order in `fields` *is* the display order, and
//! change detection (see [`crate::plan`]) relies on it.

use crate::field::FieldDescriptor;
use crate::ident;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Defines the structure of a form and names its dynamic table.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FormSchema {
    /// Stable identity of the form.
    pub id: Uuid,

    /// Human-readable title (e.g., "Incident Report").
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    /// The dynamic table backing this form. Derived once at creation from the title
    /// and identity; stable thereafter even if the title changes.
    pub table_name: String,

    /// The ordered list of fields. Order is display order.
    ///
    /// # Validation
    /// 1. Each field must be valid (nested validation).
    /// 2. Field identities must be unique within the form.
    #[validate(nested, custom(function = "validate_unique_field_ids"))]
    pub fields: Vec<FieldDescriptor>,
}

/// Custom validator to ensure no two fields share the same identity.
fn validate_unique_field_ids(fields: &[FieldDescriptor]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.id) {
            let mut err = ValidationError::new("duplicate_field_id");
            err.add_param(std::borrow::Cow::from("duplicate_id"), &field.id);
            return Err(err);
        }
    }
    Ok(())
}

impl FormSchema {
    /// Creates a new form schema, deriving the dynamic table name from the title and a
    /// fresh identity, and validates it.
    ///
    /// # Errors
    /// Returns `validator::ValidationErrors` if the title or any field fails validation.
    pub fn new(
        title: &str,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, validator::ValidationErrors> {
        let id = Uuid::new_v4();
        let schema = FormSchema {
            id,
            title: title.to_string(),
            table_name: ident::form_table(title, &id),
            fields,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Looks up a field by its stable identity.
    pub fn field(&self, field_id: &Uuid) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.id == *field_id)
    }

    /// Whether the given field identity is present in the current field set.
    pub fn contains_field(&self, field_id: &Uuid) -> bool {
        self.field(field_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use serde_json::json;

    fn create_field(id: Uuid, title: &str) -> FieldDescriptor {
        FieldDescriptor {
            id,
            title: title.to_string(),
            field_type: FieldType::ShortAnswer,
            required: false,
            options: None,
        }
    }

    #[test]
    fn test_new_derives_table_name() {
        let form = FormSchema::new("Incident Report", vec![]).unwrap();
        assert!(form.table_name.starts_with("incident_report_"));
        assert!(ident::is_valid_identifier(&form.table_name));
    }

    #[test]
    fn test_duplicate_field_ids_rejected() {
        let id = Uuid::new_v4();
        let res = FormSchema::new(
            "Sign Up",
            vec![create_field(id, "Email"), create_field(id, "Email again")],
        );

        assert!(res.is_err());
        assert!(res.unwrap_err().to_string().contains("duplicate_field_id"));
    }

    #[test]
    fn test_field_lookup() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let form =
            FormSchema::new("F", vec![create_field(a, "A"), create_field(b, "B")]).unwrap();

        assert!(form.contains_field(&a));
        assert_eq!(form.field(&b).unwrap().title, "B");
        assert!(!form.contains_field(&Uuid::new_v4()));
    }

    #[test]
    fn test_serde_integration() {
        let json_input = json!({
            "id": "f47ac10b-58cc-4372-a567-0e02b2c3d479",
            "title": "Bug Report",
            "table_name": "bug_report_f47ac10b",
            "fields": [
                {
                    "id": "0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9",
                    "title": "Title",
                    "field_type": "short_answer"
                },
                {
                    "id": "1a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9",
                    "title": "Severity",
                    "field_type": "rating"
                }
            ]
        });

        let form: FormSchema = serde_json::from_value(json_input).expect("should deserialize");
        assert_eq!(form.title, "Bug Report");
        assert_eq!(form.fields.len(), 2);
        assert_eq!(form.fields[1].field_type, FieldType::Rating);
    }
}
