//! Mapping from logical field types to physical PostgreSQL column types.
//!
//! The mapping is fixed: every logical type resolves to exactly one physical type, and
//! the physical type is what DDL, rollback SQL, and restore casts are rendered from.

use crate::field::FieldType;
use serde::{Deserialize, Serialize};

/// A physical PostgreSQL column type, as rendered into DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "length", rename_all = "snake_case")]
pub enum PhysicalType {
    /// Bounded string, `VARCHAR(n)`.
    VarChar(u32),
    /// Unbounded text.
    Text,
    /// Arbitrary-precision numeric.
    Numeric,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Timestamp.
    Timestamp,
    /// 32-bit signed integer.
    Integer,
    /// Binary JSON document.
    JsonB,
}

impl PhysicalType {
    /// Resolves the physical column type for a logical field type.
    ///
    /// The table is part of the on-disk contract and must not drift:
    ///
    /// | Logical | Physical |
    /// |---|---|
    /// | short_answer, email, multiple_choice, factory | `VARCHAR(255)` |
    /// | phone | `VARCHAR(20)` |
    /// | url | `VARCHAR(500)` |
    /// | province | `VARCHAR(100)` |
    /// | paragraph, file_upload, image_upload | `TEXT` |
    /// | number | `NUMERIC` |
    /// | date / time / datetime | `DATE` / `TIME` / `TIMESTAMP` |
    /// | rating, slider | `INTEGER` |
    /// | lat_long | `JSONB` |
    pub fn for_field_type(field_type: FieldType) -> Self {
        match field_type {
            FieldType::ShortAnswer
            | FieldType::Email
            | FieldType::MultipleChoice
            | FieldType::Factory => PhysicalType::VarChar(255),
            FieldType::Phone => PhysicalType::VarChar(20),
            FieldType::Url => PhysicalType::VarChar(500),
            FieldType::Province => PhysicalType::VarChar(100),
            FieldType::Paragraph | FieldType::FileUpload | FieldType::ImageUpload => {
                PhysicalType::Text
            }
            FieldType::Number => PhysicalType::Numeric,
            FieldType::Date => PhysicalType::Date,
            FieldType::Time => PhysicalType::Time,
            FieldType::DateTime => PhysicalType::Timestamp,
            FieldType::Rating | FieldType::Slider => PhysicalType::Integer,
            FieldType::LatLong => PhysicalType::JsonB,
        }
    }

    /// Renders this type as it appears in DDL and `CAST` expressions.
    pub fn ddl(&self) -> String {
        match self {
            PhysicalType::VarChar(n) => format!("VARCHAR({n})"),
            PhysicalType::Text => "TEXT".to_string(),
            PhysicalType::Numeric => "NUMERIC".to_string(),
            PhysicalType::Date => "DATE".to_string(),
            PhysicalType::Time => "TIME".to_string(),
            PhysicalType::Timestamp => "TIMESTAMP".to_string(),
            PhysicalType::Integer => "INTEGER".to_string(),
            PhysicalType::JsonB => "JSONB".to_string(),
        }
    }

    /// Parses a physical type back from `information_schema.columns`
    /// (`data_type` plus `character_maximum_length`).
    ///
    /// Returns `None` for column types this system never creates; callers treat those
    /// as unbounded text, the fallback physical type.
    pub fn from_information_schema(data_type: &str, char_max_length: Option<i32>) -> Option<Self> {
        match data_type {
            "character varying" => Some(PhysicalType::VarChar(
                char_max_length.and_then(|n| u32::try_from(n).ok()).unwrap_or(255),
            )),
            "text" => Some(PhysicalType::Text),
            "numeric" => Some(PhysicalType::Numeric),
            "integer" => Some(PhysicalType::Integer),
            "date" => Some(PhysicalType::Date),
            "time without time zone" | "time with time zone" => Some(PhysicalType::Time),
            "timestamp without time zone" | "timestamp with time zone" => {
                Some(PhysicalType::Timestamp)
            }
            "jsonb" | "json" => Some(PhysicalType::JsonB),
            _ => None,
        }
    }

    /// Whether this type is a character type (bounded or unbounded).
    pub fn is_textual(&self) -> bool {
        matches!(self, PhysicalType::VarChar(_) | PhysicalType::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_matches_contract() {
        assert_eq!(PhysicalType::for_field_type(FieldType::ShortAnswer), PhysicalType::VarChar(255));
        assert_eq!(PhysicalType::for_field_type(FieldType::Email), PhysicalType::VarChar(255));
        assert_eq!(PhysicalType::for_field_type(FieldType::MultipleChoice), PhysicalType::VarChar(255));
        assert_eq!(PhysicalType::for_field_type(FieldType::Factory), PhysicalType::VarChar(255));
        assert_eq!(PhysicalType::for_field_type(FieldType::Phone), PhysicalType::VarChar(20));
        assert_eq!(PhysicalType::for_field_type(FieldType::Url), PhysicalType::VarChar(500));
        assert_eq!(PhysicalType::for_field_type(FieldType::Province), PhysicalType::VarChar(100));
        assert_eq!(PhysicalType::for_field_type(FieldType::Paragraph), PhysicalType::Text);
        assert_eq!(PhysicalType::for_field_type(FieldType::FileUpload), PhysicalType::Text);
        assert_eq!(PhysicalType::for_field_type(FieldType::ImageUpload), PhysicalType::Text);
        assert_eq!(PhysicalType::for_field_type(FieldType::Number), PhysicalType::Numeric);
        assert_eq!(PhysicalType::for_field_type(FieldType::Date), PhysicalType::Date);
        assert_eq!(PhysicalType::for_field_type(FieldType::Time), PhysicalType::Time);
        assert_eq!(PhysicalType::for_field_type(FieldType::DateTime), PhysicalType::Timestamp);
        assert_eq!(PhysicalType::for_field_type(FieldType::Rating), PhysicalType::Integer);
        assert_eq!(PhysicalType::for_field_type(FieldType::Slider), PhysicalType::Integer);
        assert_eq!(PhysicalType::for_field_type(FieldType::LatLong), PhysicalType::JsonB);
    }

    #[test]
    fn test_ddl_rendering() {
        assert_eq!(PhysicalType::VarChar(255).ddl(), "VARCHAR(255)");
        assert_eq!(PhysicalType::Numeric.ddl(), "NUMERIC");
        assert_eq!(PhysicalType::JsonB.ddl(), "JSONB");
    }

    #[test]
    fn test_information_schema_round_trip() {
        assert_eq!(
            PhysicalType::from_information_schema("character varying", Some(20)),
            Some(PhysicalType::VarChar(20))
        );
        assert_eq!(PhysicalType::from_information_schema("text", None), Some(PhysicalType::Text));
        assert_eq!(
            PhysicalType::from_information_schema("timestamp without time zone", None),
            Some(PhysicalType::Timestamp)
        );
        assert_eq!(PhysicalType::from_information_schema("bytea", None), None);
    }
}
