//! SQL text builders for dynamic-table DDL.
//!
//! Centralized so that previews render *exactly* the SQL the driver will execute.
//! Every identifier passed in here has already passed `strata_core::ident`
//! validation, which excludes quotes and any character outside `[a-z0-9_]`.

use strata_core::physical::PhysicalType;

/// Double-quotes a validated identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

/// `ALTER TABLE ... ADD COLUMN ...` — new columns are nullable with no default, so
/// the statement never rewrites existing rows.
pub fn add_column(table: &str, column: &str, ty: &PhysicalType) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote_ident(table),
        quote_ident(column),
        ty.ddl()
    )
}

/// `ALTER TABLE ... DROP COLUMN ...`
pub fn drop_column(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {}", quote_ident(table), quote_ident(column))
}

/// `ALTER TABLE ... RENAME COLUMN ... TO ...`
pub fn rename_column(table: &str, from: &str, to: &str) -> String {
    format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        quote_ident(table),
        quote_ident(from),
        quote_ident(to)
    )
}

/// `ALTER TABLE ... ALTER COLUMN ... TYPE ... USING ...` — the `USING` cast performs
/// the best-effort value conversion.
pub fn alter_column_type(table: &str, column: &str, ty: &PhysicalType) -> String {
    let col = quote_ident(column);
    format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING ({}::{})",
        quote_ident(table),
        col,
        ty.ddl(),
        col,
        ty.ddl()
    )
}

/// `CREATE TABLE` for a fresh dynamic table: a UUID primary key and a submission
/// timestamp. User columns are added afterwards, one migration each.
pub fn create_dynamic_table(table: &str) -> String {
    format!(
        "CREATE TABLE {} (\"id\" UUID PRIMARY KEY DEFAULT gen_random_uuid(), \
         \"submitted_at\" TIMESTAMPTZ NOT NULL DEFAULT now())",
        quote_ident(table)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_column_sql() {
        assert_eq!(
            add_column("form_t_12345678", "age_0a1b2c3d", &PhysicalType::Integer),
            "ALTER TABLE \"form_t_12345678\" ADD COLUMN \"age_0a1b2c3d\" INTEGER"
        );
    }

    #[test]
    fn test_drop_column_sql() {
        assert_eq!(
            drop_column("t", "c"),
            "ALTER TABLE \"t\" DROP COLUMN \"c\""
        );
    }

    #[test]
    fn test_rename_column_sql() {
        assert_eq!(
            rename_column("t", "a", "b"),
            "ALTER TABLE \"t\" RENAME COLUMN \"a\" TO \"b\""
        );
    }

    #[test]
    fn test_alter_type_sql_includes_using_cast() {
        assert_eq!(
            alter_column_type("t", "n", &PhysicalType::Numeric),
            "ALTER TABLE \"t\" ALTER COLUMN \"n\" TYPE NUMERIC USING (\"n\"::NUMERIC)"
        );
        assert_eq!(
            alter_column_type("t", "s", &PhysicalType::VarChar(20)),
            "ALTER TABLE \"t\" ALTER COLUMN \"s\" TYPE VARCHAR(20) USING (\"s\"::VARCHAR(20))"
        );
    }

    #[test]
    fn test_create_dynamic_table_sql() {
        let sql = create_dynamic_table("form_x_12345678");
        assert!(sql.starts_with("CREATE TABLE \"form_x_12345678\""));
        assert!(sql.contains("\"id\" UUID PRIMARY KEY"));
        assert!(sql.contains("\"submitted_at\" TIMESTAMPTZ"));
    }
}
