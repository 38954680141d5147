//! This module defines the core structures for describing individual fields of a form.
//!
//! It includes `FieldType` to enumerate the closed set of logical data types a field can
//! hold, `FieldDescriptor` as the validated in-memory description of one field, and
//! `FieldSpec` as the wire-facing shape accepted from form-builder clients.

use crate::ident;
use crate::ident::IdentError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

/// The logical data type of a field.
///
/// This is a closed set: every form field carries exactly one of these types, and each
/// type maps to exactly one physical column type (see [`crate::physical::PhysicalType`]).
///
/// # Serde Serialization
/// Variants serialize as `snake_case` strings, e.g. `"short_answer"` or `"lat_long"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Single-line free text.
    ShortAnswer,
    /// Multi-line free text.
    Paragraph,
    /// Email address.
    Email,
    /// Telephone number.
    Phone,
    /// Arbitrary-precision numeric input.
    Number,
    /// URL input.
    Url,
    /// Reference to an uploaded file (stored as an object key).
    FileUpload,
    /// Reference to an uploaded image (stored as an object key).
    ImageUpload,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Combined date and time.
    DateTime,
    /// Selection from a predefined list of options.
    MultipleChoice,
    /// Star-style rating.
    Rating,
    /// Bounded numeric slider.
    Slider,
    /// Geographic coordinate pair `{lat, lng}`.
    LatLong,
    /// Province selector.
    Province,
    /// Factory selector.
    Factory,
}

impl FieldType {
    /// Returns the `snake_case` name of this type, matching its serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::ShortAnswer => "short_answer",
            FieldType::Paragraph => "paragraph",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Number => "number",
            FieldType::Url => "url",
            FieldType::FileUpload => "file_upload",
            FieldType::ImageUpload => "image_upload",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::DateTime => "datetime",
            FieldType::MultipleChoice => "multiple_choice",
            FieldType::Rating => "rating",
            FieldType::Slider => "slider",
            FieldType::LatLong => "lat_long",
            FieldType::Province => "province",
            FieldType::Factory => "factory",
        }
    }
}

/// Describes one field of a form: its stable identity, display title, logical type, and
/// per-field options.
///
/// A `FieldDescriptor` does not hold submitted data; it describes the column that holds
/// the data. The column identifier is derived deterministically from the field's stable
/// identity plus a normalized slug of its title (see [`crate::ident`]), so two fields
/// with the same title never collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FieldDescriptor {
    /// Stable identity of the field. Survives title edits; identifies the field across
    /// form versions.
    pub id: Uuid,

    /// The human-readable label displayed in the form builder.
    /// validation: must be between 1-100 characters
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    /// The logical data type.
    pub field_type: FieldType,

    /// Whether submissions must provide a value for this field.
    #[serde(default)]
    pub required: bool,

    /// Per-field options (choice lists, slider bounds, ...). Opaque to the migration
    /// system; carried through for the audit trail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

impl FieldDescriptor {
    /// Derives the SQL column identifier for this field.
    ///
    /// The derivation is pure and deterministic: the same `(title, id)` pair always
    /// yields the same identifier.
    pub fn column_name(&self) -> String {
        ident::field_column(&self.title, &self.id)
    }
}

/// Wire-facing field description, as submitted by form-builder clients.
///
/// Unlike [`FieldDescriptor`], the title is optional here so that an absent or `null`
/// label can be reported as [`IdentError::InvalidLabel`] instead of a generic
/// deserialization failure, and a missing `field_id` means "new field" and is assigned
/// a fresh identity on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Stable identity; omitted for fields that do not exist yet.
    #[serde(default)]
    pub field_id: Option<Uuid>,
    /// Display title. `null` is rejected with `InvalidLabel`.
    #[serde(default)]
    pub title: Option<String>,
    /// The logical data type.
    pub field_type: FieldType,
    /// Whether submissions must provide a value.
    #[serde(default)]
    pub required: bool,
    /// Per-field options, passed through opaquely.
    #[serde(default)]
    pub options: Option<Value>,
}

impl FieldSpec {
    /// Converts this wire shape into a validated [`FieldDescriptor`], minting a fresh
    /// identity when `field_id` is absent.
    ///
    /// # Errors
    /// Returns [`IdentError::InvalidLabel`] when the title is absent.
    pub fn into_descriptor(self) -> Result<FieldDescriptor, IdentError> {
        let title = self.title.ok_or(IdentError::InvalidLabel)?;
        Ok(FieldDescriptor {
            id: self.field_id.unwrap_or_else(Uuid::new_v4),
            title,
            field_type: self.field_type,
            required: self.required,
            options: self.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_snake_case_serde() {
        let ty: FieldType = serde_json::from_value(json!("short_answer")).unwrap();
        assert_eq!(ty, FieldType::ShortAnswer);
        assert_eq!(serde_json::to_value(FieldType::LatLong).unwrap(), json!("lat_long"));
        assert_eq!(FieldType::DateTime.as_str(), "datetime");
    }

    #[test]
    fn test_descriptor_column_name_is_deterministic() {
        let field = FieldDescriptor {
            id: Uuid::parse_str("0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9").unwrap(),
            title: "Contact Email".to_string(),
            field_type: FieldType::Email,
            required: true,
            options: None,
        };

        assert_eq!(field.column_name(), field.column_name());
        assert_eq!(field.column_name(), "contact_email_0a1b2c3d");
    }

    #[test]
    fn test_spec_without_title_is_invalid_label() {
        let spec = FieldSpec {
            field_id: None,
            title: None,
            field_type: FieldType::ShortAnswer,
            required: false,
            options: None,
        };

        assert!(matches!(spec.into_descriptor(), Err(IdentError::InvalidLabel)));
    }

    #[test]
    fn test_spec_mints_identity_for_new_fields() {
        let spec: FieldSpec = serde_json::from_value(json!({
            "title": "Severity",
            "field_type": "rating"
        }))
        .unwrap();

        let field = spec.into_descriptor().unwrap();
        assert_eq!(field.field_type, FieldType::Rating);
        assert!(!field.id.is_nil());
    }
}
