//! Query text for the PostgreSQL adapter.
//!
//! Catalog lookups take schema and relation names as bind parameters. Queries
//! that must name a relation directly (reading a sequence row, scanning a key
//! column) are built with [`quote_ident`].

/// Quote an identifier for interpolation into SQL.
///
/// Doubles embedded quotes, so any name the catalog returns round-trips.
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// `"schema"."relation"`, usable both in `FROM` and as a `::regclass` literal.
pub fn qualified(schema: &str, relation: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(relation))
}

pub const LIST_TABLES: &str = "\
SELECT c.relname
FROM pg_catalog.pg_class c
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1 AND c.relkind IN ('r', 'p')
ORDER BY c.relname";

pub const TABLE_EXISTS: &str = "\
SELECT EXISTS (
    SELECT 1
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relname = $2 AND c.relkind IN ('r', 'p')
)";

/// Column of `$2` that sequence `$3` is owned by, provided it is part of the
/// primary key. `a` dependencies come from `serial`, `i` from identity columns.
pub const IDENTITY_SEQUENCE: &str = "\
SELECT a.attname
FROM pg_catalog.pg_class s
JOIN pg_catalog.pg_namespace n ON n.oid = s.relnamespace
JOIN pg_catalog.pg_depend d
    ON d.objid = s.oid
   AND d.classid = 'pg_catalog.pg_class'::regclass
   AND d.refclassid = 'pg_catalog.pg_class'::regclass
   AND d.deptype IN ('a', 'i')
JOIN pg_catalog.pg_class t ON t.oid = d.refobjid AND t.relnamespace = n.oid
JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = d.refobjsubid
WHERE s.relkind = 'S'
  AND n.nspname = $1
  AND t.relname = $2
  AND s.relname = $3
  AND EXISTS (
      SELECT 1
      FROM pg_catalog.pg_index i
      WHERE i.indrelid = t.oid AND i.indisprimary AND a.attnum = ANY (i.indkey)
  )
LIMIT 1";

pub const ADVISORY_LOCK: &str = "SELECT pg_advisory_xact_lock(hashtext($1))";

/// `(last_value, is_called, increment)` of a sequence; `$1` is its qualified name.
pub fn read_state(sequence: &str) -> String {
    format!(
        "SELECT s.last_value, s.is_called, p.seqincrement \
         FROM {sequence} s, pg_catalog.pg_sequence p \
         WHERE p.seqrelid = $1::regclass"
    )
}

/// Largest and smallest key; both `NULL` for an empty table.
pub fn key_bounds(table: &str, column: &str) -> String {
    let column = quote_ident(column);
    format!("SELECT max({column})::bigint, min({column})::bigint FROM {table}")
}

/// Effective current value of `s`/`p`, matching `SequenceState::from_raw`:
/// an uncalled sequence sits one step back unless that step leaves `bigint`.
const EFFECTIVE_VALUE: &str = "CASE WHEN s.is_called THEN s.last_value \
     WHEN p.seqincrement > 0 \
          AND s.last_value < (-9223372036854775808)::bigint + p.seqincrement THEN s.last_value \
     WHEN p.seqincrement < 0 \
          AND s.last_value > 9223372036854775807::bigint + p.seqincrement THEN s.last_value \
     ELSE s.last_value - p.seqincrement END";

/// Guarded `setval`: returns a row only if the effective current value still
/// equals `$3`. Binds: `$1` qualified sequence name, `$2` new value.
pub fn compare_and_set(sequence: &str) -> String {
    format!(
        "SELECT setval($1::regclass, $2, true) \
         FROM {sequence} s, pg_catalog.pg_sequence p \
         WHERE p.seqrelid = $1::regclass \
           AND ({EFFECTIVE_VALUE}) = $3"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn quote_ident_wraps_and_escapes() {
        assert_eq!(quote_ident("orders"), "\"orders\"");
        assert_eq!(quote_ident("Order Items"), "\"Order Items\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn qualified_names_quote_both_parts() {
        assert_eq!(qualified("public", "orders_id_seq"), "\"public\".\"orders_id_seq\"");
    }

    #[test]
    fn key_bounds_quotes_column() {
        let sql = key_bounds("\"public\".\"orders\"", "id");
        assert_eq!(
            sql,
            "SELECT max(\"id\")::bigint, min(\"id\")::bigint FROM \"public\".\"orders\""
        );
    }

    #[test]
    fn compare_and_set_guards_on_effective_value() {
        let sql = compare_and_set("\"public\".\"orders_id_seq\"");
        assert!(sql.starts_with("SELECT setval($1::regclass, $2, true)"));
        assert!(sql.contains("FROM \"public\".\"orders_id_seq\" s"));
        assert!(sql.contains("ELSE s.last_value - p.seqincrement END) = $3"));
    }

    #[test]
    fn compare_and_set_keeps_last_value_when_stepping_back_overflows() {
        let sql = compare_and_set("\"public\".\"orders_id_seq\"");
        let guard_up = sql
            .find("s.last_value < (-9223372036854775808)::bigint + p.seqincrement THEN s.last_value")
            .expect("ascending bound guarded");
        let guard_down = sql
            .find("s.last_value > 9223372036854775807::bigint + p.seqincrement THEN s.last_value")
            .expect("descending bound guarded");
        let subtract = sql
            .find("ELSE s.last_value - p.seqincrement")
            .expect("step back");
        assert!(guard_up < subtract && guard_down < subtract);
    }
}
