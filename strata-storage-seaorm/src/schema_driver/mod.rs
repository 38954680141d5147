//! The schema driver: primitive DDL/DML against dynamic per-form tables.
//!
//! Primitives take any `ConnectionTrait` implementor so the engine can run them
//! inside the transaction that also appends the history record. The driver itself
//! never opens transactions and never holds more than a statement-level lock; the
//! long-running value scans used by type-change validation are separate read-only
//! statements the engine runs *before* the DDL transaction opens.
//!
//! Identifier safety: every table/column name is validated against
//! `^[a-z][a-z0-9_]{0,62}$` before any SQL is built, then double-quoted. Values only
//! ever travel as bind parameters.

pub mod error;
pub mod sql;

pub use error::{DriverError, classify_db_err};

use error::is_cast_failure;
use sea_orm::{ConnectionTrait, DbBackend, Statement, Value};
use strata_core::convert::ConversionCheck;
use strata_core::ident;
use strata_core::physical::PhysicalType;
use strata_core::record::SnapshotRow;

/// Batch size for restore writes.
pub const RESTORE_BATCH_SIZE: usize = 100;

const DECIMAL_REGEX: &str = r"^-?([0-9]+(\.[0-9]*)?|\.[0-9]+)$";
const INTEGER_REGEX: &str = r"^-?[0-9]+$";
const DATE_REGEX: &str = r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$";
const TIME_REGEX: &str = r"^[0-9]{2}:[0-9]{2}(:[0-9]{2}(\.[0-9]+)?)?$";
const TIMESTAMP_REGEX: &str =
    r"^[0-9]{4}-[0-9]{2}-[0-9]{2}([T ][0-9]{2}:[0-9]{2}(:[0-9]{2}(\.[0-9]+)?)?(Z|[+-][0-9]{2}:?[0-9]{2})?)?$";

/// Values found by a pre-change scan that would not survive the conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanViolation {
    /// How many values fail the check.
    pub count: i64,
    /// One offending value, for the diagnostic.
    pub sample: Option<String>,
}

fn ensure_idents(names: &[&str]) -> Result<(), DriverError> {
    for name in names {
        ident::validate_identifier(name)?;
    }
    Ok(())
}

async fn exec<C: ConnectionTrait>(conn: &C, sql_text: String) -> Result<(), DriverError> {
    conn.execute(Statement::from_string(DbBackend::Postgres, sql_text))
        .await
        .map(|_| ())
        .map_err(classify_db_err)
}

/// Whether `column` exists on `table` in the current schema.
pub async fn column_exists<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
) -> Result<bool, DriverError> {
    ensure_idents(&[table, column])?;
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT 1 AS present FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2",
        [table.into(), column.into()],
    );
    let row = conn.query_one(stmt).await.map_err(classify_db_err)?;
    Ok(row.is_some())
}

/// Reads the current physical type of `column` from `information_schema`.
///
/// Returns `Ok(None)` when the column does not exist. Column types this system never
/// creates come back as `Some(Text)`, the fallback physical type.
pub async fn fetch_column_type<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
) -> Result<Option<PhysicalType>, DriverError> {
    ensure_idents(&[table, column])?;
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT data_type, character_maximum_length FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2",
        [table.into(), column.into()],
    );
    let row = conn.query_one(stmt).await.map_err(classify_db_err)?;
    match row {
        None => Ok(None),
        Some(row) => {
            let data_type: String = row.try_get("", "data_type").map_err(classify_db_err)?;
            let char_len: Option<i32> =
                row.try_get("", "character_maximum_length").map_err(classify_db_err)?;
            Ok(Some(
                PhysicalType::from_information_schema(&data_type, char_len)
                    .unwrap_or(PhysicalType::Text),
            ))
        }
    }
}

/// Adds a nullable column with no default.
///
/// # Errors
/// `ColumnExists` when the column is already present; `InvalidIdentifier` before any
/// SQL when a name fails validation.
pub async fn add_column<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
    ty: &PhysicalType,
) -> Result<(), DriverError> {
    ensure_idents(&[table, column])?;
    if column_exists(conn, table, column).await? {
        return Err(DriverError::ColumnExists {
            table: table.to_string(),
            column: column.to_string(),
        });
    }
    exec(conn, sql::add_column(table, column, ty)).await
}

/// Drops a column.
///
/// # Errors
/// `ColumnMissing` when the column is not present.
pub async fn drop_column<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
) -> Result<(), DriverError> {
    ensure_idents(&[table, column])?;
    if !column_exists(conn, table, column).await? {
        return Err(DriverError::ColumnMissing {
            table: table.to_string(),
            column: column.to_string(),
        });
    }
    exec(conn, sql::drop_column(table, column)).await
}

/// Renames a column.
///
/// # Errors
/// `ColumnMissing` when the source is absent, `ColumnExists` when the target is
/// already taken.
pub async fn rename_column<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    from: &str,
    to: &str,
) -> Result<(), DriverError> {
    ensure_idents(&[table, from, to])?;
    if !column_exists(conn, table, from).await? {
        return Err(DriverError::ColumnMissing {
            table: table.to_string(),
            column: from.to_string(),
        });
    }
    if column_exists(conn, table, to).await? {
        return Err(DriverError::ColumnExists {
            table: table.to_string(),
            column: to.to_string(),
        });
    }
    exec(conn, sql::rename_column(table, from, to)).await
}

/// Changes a column's type with a best-effort `USING` cast.
///
/// Callers are expected to have run the matching value scan beforehand; a cast the
/// database still refuses surfaces as `TypeConversion`.
pub async fn alter_column_type<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
    ty: &PhysicalType,
) -> Result<(), DriverError> {
    ensure_idents(&[table, column])?;
    if !column_exists(conn, table, column).await? {
        return Err(DriverError::ColumnMissing {
            table: table.to_string(),
            column: column.to_string(),
        });
    }
    match exec(conn, sql::alter_column_type(table, column, ty)).await {
        Err(DriverError::Db(e)) if is_cast_failure(&e.to_string()) => {
            Err(DriverError::TypeConversion { column: column.to_string(), reason: e.to_string() })
        }
        other => other,
    }
}

/// Creates a fresh dynamic table with the mandatory id and timestamp columns.
pub async fn create_dynamic_table<C: ConnectionTrait>(
    conn: &C,
    table: &str,
) -> Result<(), DriverError> {
    ensure_idents(&[table])?;
    exec(conn, sql::create_dynamic_table(table)).await
}

/// Counts the rows of a dynamic table.
pub async fn count_rows<C: ConnectionTrait>(conn: &C, table: &str) -> Result<i64, DriverError> {
    ensure_idents(&[table])?;
    let stmt = Statement::from_string(
        DbBackend::Postgres,
        format!("SELECT count(*) AS row_count FROM {}", sql::quote_ident(table)),
    );
    let row = conn.query_one(stmt).await.map_err(classify_db_err)?;
    match row {
        Some(row) => row.try_get("", "row_count").map_err(classify_db_err),
        None => Ok(0),
    }
}

/// Runs the value scan a conversion check requires.
///
/// Returns `Ok(None)` when every value passes (or when the check needs no scan).
/// This is a single read-only statement; run it outside the DDL transaction.
pub async fn scan_for_check<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
    check: &ConversionCheck,
) -> Result<Option<ScanViolation>, DriverError> {
    ensure_idents(&[table, column])?;

    let col = sql::quote_ident(column);
    let predicate = match check {
        ConversionCheck::NoOp | ConversionCheck::Safe => return Ok(None),
        ConversionCheck::ScanDecimal => format!("btrim({col}::text) !~ '{DECIMAL_REGEX}'"),
        ConversionCheck::ScanInteger => format!("btrim({col}::text) !~ '{INTEGER_REGEX}'"),
        ConversionCheck::ScanDate => format!("btrim({col}::text) !~ '{DATE_REGEX}'"),
        ConversionCheck::ScanTime => format!("btrim({col}::text) !~ '{TIME_REGEX}'"),
        ConversionCheck::ScanTimestamp => format!("btrim({col}::text) !~ '{TIMESTAMP_REGEX}'"),
        ConversionCheck::ScanLength(n) => format!("char_length({col}::text) > {n}"),
    };

    let stmt = Statement::from_string(
        DbBackend::Postgres,
        format!(
            "SELECT count(*) AS bad_count, min({col}::text) AS sample FROM {} \
             WHERE {col} IS NOT NULL AND {predicate}",
            sql::quote_ident(table)
        ),
    );
    let row = conn.query_one(stmt).await.map_err(classify_db_err)?;
    let Some(row) = row else { return Ok(None) };

    let count: i64 = row.try_get("", "bad_count").map_err(classify_db_err)?;
    if count == 0 {
        return Ok(None);
    }
    let sample: Option<String> = row.try_get("", "sample").map_err(classify_db_err)?;
    Ok(Some(ScanViolation { count, sample }))
}

/// Reads every `(row id, value)` pair of a column, ordered by row id.
///
/// Values are captured through `::text`, which round-trips losslessly back through a
/// cast to the column's physical type.
pub async fn read_column<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
) -> Result<Vec<SnapshotRow>, DriverError> {
    ensure_idents(&[table, column])?;
    let col = sql::quote_ident(column);
    let stmt = Statement::from_string(
        DbBackend::Postgres,
        format!(
            "SELECT \"id\" AS row_id, {col}::text AS value FROM {} ORDER BY \"id\"",
            sql::quote_ident(table)
        ),
    );
    let rows = conn.query_all(stmt).await.map_err(classify_db_err)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(SnapshotRow {
            row_id: row.try_get("", "row_id").map_err(classify_db_err)?,
            value: row.try_get("", "value").map_err(classify_db_err)?,
        });
    }
    Ok(out)
}

/// Writes a batch of snapshot values back into a column, casting the stored text to
/// the column's current physical type.
///
/// Rows whose primary key no longer exists are skipped; the return value counts the
/// rows actually written.
pub async fn write_column_batch<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
    ty: &PhysicalType,
    rows: &[SnapshotRow],
) -> Result<u64, DriverError> {
    ensure_idents(&[table, column])?;
    let sql_text = format!(
        "UPDATE {} SET {} = CAST($1 AS {}) WHERE \"id\" = $2",
        sql::quote_ident(table),
        sql::quote_ident(column),
        ty.ddl()
    );

    let mut written = 0u64;
    for row in rows {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql_text.as_str(),
            [Value::from(row.value.clone()), Value::from(row.row_id)],
        );
        let res = conn.execute(stmt).await.map_err(classify_db_err)?;
        written += res.rows_affected();
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_identifiers_are_refused_before_sql() {
        // ensure_idents is the gate every driver entry point goes through.
        assert!(ensure_idents(&["good_name"]).is_ok());
        assert!(matches!(
            ensure_idents(&["bad\"name"]),
            Err(DriverError::Ident(_))
        ));
        assert!(matches!(
            ensure_idents(&["good", "1bad"]),
            Err(DriverError::Ident(_))
        ));
        assert!(matches!(
            ensure_idents(&["drop table x; --"]),
            Err(DriverError::Ident(_))
        ));
    }

    #[test]
    fn test_scan_regexes_accept_expected_shapes() {
        let decimal = regex::Regex::new(DECIMAL_REGEX).unwrap();
        for ok in ["10", "-3.5", ".5", "42."] {
            assert!(decimal.is_match(ok), "{ok}");
        }
        for bad in ["abc", "1e5", "", "1,000"] {
            assert!(!decimal.is_match(bad), "{bad}");
        }

        let date = regex::Regex::new(DATE_REGEX).unwrap();
        assert!(date.is_match("2024-02-29"));
        assert!(!date.is_match("29/02/2024"));

        let ts = regex::Regex::new(TIMESTAMP_REGEX).unwrap();
        for ok in ["2024-02-29", "2024-02-29 13:45", "2024-02-29T13:45:01.5Z", "2024-02-29 13:45:01+07:00"] {
            assert!(ts.is_match(ok), "{ok}");
        }
        assert!(!ts.is_match("next tuesday"));

        let time = regex::Regex::new(TIME_REGEX).unwrap();
        assert!(time.is_match("13:45"));
        assert!(time.is_match("13:45:01"));
        assert!(!time.is_match("1pm"));
    }
}
