//! Deterministic derivation of SQL identifiers from human field and form labels.
//!
//! Dynamic tables and their columns are named after user-supplied titles, which may be
//! Thai, contain punctuation, or collide with one another. This module turns a
//! `(label, stable identity)` pair into an identifier that is SQL-safe
//! (`^[a-z][a-z0-9_]{0,62}$`), deterministic, and collision-free across entities.
//!
//! The derivation is pure: no allocation outside the returned string, no clocks, no
//! randomness, no database. Callers resolve every identifier *before* opening a
//! transaction.
//!
//! # Algorithm
//! 1. Romanize non-Latin characters through a fixed transliteration table (Thai,
//!    RTGS-style). Unmapped non-ASCII characters are dropped.
//! 2. Collapse runs of non-alphanumerics into a single underscore, lowercase, and trim
//!    leading/trailing underscores.
//! 3. If the result does not begin with a letter, prepend the entity prefix (`f_` for
//!    fields, `form_` for tables).
//! 4. If the result is empty, substitute the fallback base (`field` / `form`).
//! 5. Append `_` plus the first eight hex characters of the entity's UUID.
//! 6. Truncate the pre-suffix portion so the whole identifier fits in 63 characters.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

/// Maximum identifier length accepted by PostgreSQL.
pub const MAX_IDENT_LEN: usize = 63;

/// Length of the identity suffix appended to every derived identifier.
const SUFFIX_LEN: usize = 8;

static IDENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,62}$").expect("identifier regex is valid"));

/// Errors produced while deriving or validating identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentError {
    /// The label was absent (`null`/missing on the wire). Empty strings are *not* an
    /// error; they fall back to the entity's fallback base.
    #[error("label is required to derive an identifier")]
    InvalidLabel,

    /// A name failed the `^[a-z][a-z0-9_]{0,62}$` shape check and was refused before
    /// any SQL was issued.
    #[error("'{0}' is not a safe SQL identifier")]
    InvalidIdentifier(String),
}

/// Returns `true` when `name` is a safe, fully-derived SQL identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENT_REGEX.is_match(name)
}

/// Validates that `name` is a safe SQL identifier.
///
/// # Errors
/// Returns [`IdentError::InvalidIdentifier`] when the shape check fails.
pub fn validate_identifier(name: &str) -> Result<(), IdentError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(IdentError::InvalidIdentifier(name.to_string()))
    }
}

/// Derives the column identifier for a field from its title and stable identity.
pub fn field_column(title: &str, field_id: &Uuid) -> String {
    derive(title, field_id, "f_", "field")
}

/// Derives the dynamic-table identifier for a form from its title and stable identity.
pub fn form_table(title: &str, form_id: &Uuid) -> String {
    derive(title, form_id, "form_", "form")
}

/// Checked variant of [`field_column`] for wire input where the title may be absent.
///
/// # Errors
/// Returns [`IdentError::InvalidLabel`] when `title` is `None`.
pub fn field_column_checked(title: Option<&str>, field_id: &Uuid) -> Result<String, IdentError> {
    Ok(field_column(title.ok_or(IdentError::InvalidLabel)?, field_id))
}

/// Checked variant of [`form_table`] for wire input where the title may be absent.
///
/// # Errors
/// Returns [`IdentError::InvalidLabel`] when `title` is `None`.
pub fn form_table_checked(title: Option<&str>, form_id: &Uuid) -> Result<String, IdentError> {
    Ok(form_table(title.ok_or(IdentError::InvalidLabel)?, form_id))
}

fn derive(label: &str, id: &Uuid, prefix: &str, fallback: &str) -> String {
    let mut base = slugify(&romanize(label));

    if base.is_empty() {
        base = fallback.to_string();
    } else if !base.starts_with(|c: char| c.is_ascii_lowercase()) {
        base = format!("{prefix}{base}");
    }

    // Reserve room for '_' + suffix within the 63-char cap.
    let max_base = MAX_IDENT_LEN - SUFFIX_LEN - 1;
    if base.len() > max_base {
        base.truncate(max_base);
        base = base.trim_end_matches('_').to_string();
    }

    let suffix = identity_suffix(id);
    format!("{base}_{suffix}")
}

/// First eight hex characters of the entity's UUID. Two entities sharing a title still
/// derive distinct identifiers because their identities differ.
fn identity_suffix(id: &Uuid) -> String {
    id.simple().to_string()[..SUFFIX_LEN].to_string()
}

fn slugify(romanized: &str) -> String {
    let mut out = String::with_capacity(romanized.len());
    let mut pending_sep = false;

    for c in romanized.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    out
}

fn romanize(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii() {
            out.push(c);
        } else if let Some(latin) = transliterate(c) {
            out.push_str(latin);
        }
        // Unmapped non-ASCII characters are dropped; the mapping must stay
        // single-valued per input so derived identifiers never drift.
    }
    out
}

/// Fixed Thai transliteration table (RTGS-style initial-consonant readings).
///
/// Tone marks and a handful of combining signs map to the empty string; Thai digits map
/// to their Arabic counterparts. The table is part of the on-disk contract: changing an
/// entry changes every identifier derived from a label containing it.
fn transliterate(c: char) -> Option<&'static str> {
    Some(match c {
        'ก' => "k",
        'ข' | 'ฃ' | 'ค' | 'ฅ' | 'ฆ' => "kh",
        'ง' => "ng",
        'จ' | 'ฉ' | 'ช' | 'ฌ' => "ch",
        'ซ' | 'ศ' | 'ษ' | 'ส' => "s",
        'ญ' | 'ย' => "y",
        'ฎ' | 'ด' => "d",
        'ฏ' | 'ต' => "t",
        'ฐ' | 'ฑ' | 'ฒ' | 'ถ' | 'ท' | 'ธ' => "th",
        'ณ' | 'น' => "n",
        'บ' => "b",
        'ป' => "p",
        'ผ' | 'พ' | 'ภ' => "ph",
        'ฝ' | 'ฟ' => "f",
        'ม' => "m",
        'ร' => "r",
        'ล' | 'ฬ' => "l",
        'ว' => "w",
        'ห' | 'ฮ' => "h",
        'อ' => "o",
        'ฤ' => "rue",
        'ฦ' => "lue",
        'ะ' | 'ั' | 'า' => "a",
        'ำ' => "am",
        'ิ' | 'ี' => "i",
        'ึ' | 'ื' => "ue",
        'ุ' | 'ู' => "u",
        'เ' => "e",
        'แ' => "ae",
        'โ' => "o",
        'ใ' | 'ไ' => "ai",
        '็' | '่' | '้' | '๊' | '๋' | '์' | 'ๆ' | 'ๅ' | 'ฯ' => "",
        '๐' => "0",
        '๑' => "1",
        '๒' => "2",
        '๓' => "3",
        '๔' => "4",
        '๕' => "5",
        '๖' => "6",
        '๗' => "7",
        '๘' => "8",
        '๙' => "9",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let id = uuid("f47ac10b-58cc-4372-a567-0e02b2c3d479");
        let labels = ["Full Name", "ชื่อเต็ม", "  weird -- label!! ", "", "123 go"];

        for label in labels {
            assert_eq!(field_column(label, &id), field_column(label, &id));
            assert_eq!(form_table(label, &id), form_table(label, &id));
        }
    }

    #[test]
    fn test_every_output_is_a_safe_identifier() {
        let id = uuid("f47ac10b-58cc-4372-a567-0e02b2c3d479");
        let long = "a".repeat(200);
        let labels = [
            "Full Name",
            "ชื่อเต็ม",
            "อีเมล",
            "  --- ",
            "",
            "9 lives",
            "日本語のみ",
            long.as_str(),
            "CAPS And Spaces",
            "snake_case_already",
        ];

        for label in labels {
            let col = field_column(label, &id);
            assert!(is_valid_identifier(&col), "bad column for {label:?}: {col}");
            assert!(col.len() <= MAX_IDENT_LEN);

            let table = form_table(label, &id);
            assert!(is_valid_identifier(&table), "bad table for {label:?}: {table}");
            assert!(table.len() <= MAX_IDENT_LEN);
        }
    }

    #[test]
    fn test_basic_slug_shapes() {
        let id = uuid("0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9");
        assert_eq!(field_column("Contact Email", &id), "contact_email_0a1b2c3d");
        assert_eq!(field_column("  Multi   spaces ", &id), "multi_spaces_0a1b2c3d");
        assert_eq!(field_column("snake_case_already", &id), "snake_case_already_0a1b2c3d");
    }

    #[test]
    fn test_thai_romanization() {
        let id = uuid("0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9");
        // ชื่อ = ch + ue + (tone, dropped) + o
        assert_eq!(field_column("ชื่อ", &id), "chueo_0a1b2c3d");
    }

    #[test]
    fn test_digit_start_gets_prefix() {
        let id = uuid("0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9");
        assert_eq!(field_column("24h Contact", &id), "f_24h_contact_0a1b2c3d");
        assert_eq!(form_table("2024 Survey", &id), "form_2024_survey_0a1b2c3d");
    }

    #[test]
    fn test_empty_label_uses_fallback_base() {
        let id = uuid("0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9");
        assert_eq!(field_column("", &id), "field_0a1b2c3d");
        assert_eq!(form_table("!!!", &id), "form_0a1b2c3d");
        // Fully unmapped non-Latin input also falls back.
        assert_eq!(field_column("日本語", &id), "field_0a1b2c3d");
    }

    #[test]
    fn test_long_label_truncates_to_limit() {
        let id = uuid("0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9");
        let col = field_column(&"x".repeat(300), &id);
        assert_eq!(col.len(), MAX_IDENT_LEN);
        assert!(col.ends_with("_0a1b2c3d"));
    }

    #[test]
    fn test_shared_title_distinct_identity_never_collides() {
        let a = uuid("11111111-2222-3333-4444-555555555555");
        let b = uuid("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee");
        assert_ne!(field_column("Name", &a), field_column("Name", &b));
    }

    #[test]
    fn test_checked_variants_reject_null_labels() {
        let id = uuid("0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9");
        assert_eq!(field_column_checked(None, &id), Err(IdentError::InvalidLabel));
        assert_eq!(form_table_checked(None, &id), Err(IdentError::InvalidLabel));
        assert!(field_column_checked(Some("ok"), &id).is_ok());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("good_name_1").is_ok());
        assert!(validate_identifier("Bad-Name").is_err());
        assert!(validate_identifier("1starts_with_digit").is_err());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("has\"quote").is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_err());
        assert!(validate_identifier(&"a".repeat(63)).is_ok());
    }
}
