use model::execution::connection::TableRef;

pub const QUERY_TABLE_COLUMNS_CQL: &str = "SELECT column_name, kind, position, type \
     FROM system_schema.columns WHERE keyspace_name = ? AND table_name = ?";

/// Renders the CQL statements the writer and validator need.
pub struct QueryGenerator;

impl QueryGenerator {
    /// `INSERT INTO ks.t (a, b) VALUES (?, ?)`
    pub fn insert(table: &TableRef, columns: &[String]) -> String {
        let cols = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let params = vec!["?"; columns.len()].join(", ");
        format!("INSERT INTO {} ({cols}) VALUES ({params})", render_table(table))
    }

    /// `SELECT a, b FROM ks.t WHERE k1 = ? AND k2 = ?`
    pub fn select_by_key(table: &TableRef, columns: &[String], key_columns: &[String]) -> String {
        let cols = if columns.is_empty() {
            // a key-only schema still needs a projection to prove existence
            key_columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let predicate = key_columns
            .iter()
            .map(|c| format!("{} = ?", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(" AND ");
        format!(
            "SELECT {cols} FROM {} WHERE {predicate}",
            render_table(table)
        )
    }
}

pub fn render_table(table: &TableRef) -> String {
    match table.keyspace() {
        Some(keyspace) => format!("{}.{}", quote_ident(keyspace), quote_ident(table.name())),
        None => quote_ident(table.name()),
    }
}

/// Quotes identifiers that would not survive CQL's lower-case folding.
pub fn quote_ident(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_insert_with_positional_markers() {
        let table = TableRef::new(Some("prftest"), "csv2cql_test3");
        let sql = QueryGenerator::insert(&table, &["colid".into(), "cola".into()]);
        assert_eq!(
            sql,
            "INSERT INTO prftest.csv2cql_test3 (colid, cola) VALUES (?, ?)"
        );
    }

    #[test]
    fn renders_point_read_over_composite_key() {
        let table = TableRef::new(None, "events");
        let sql = QueryGenerator::select_by_key(
            &table,
            &["payload".into()],
            &["tenant".into(), "ts".into()],
        );
        assert_eq!(
            sql,
            "SELECT payload FROM events WHERE tenant = ? AND ts = ?"
        );
    }

    #[test]
    fn quotes_case_sensitive_identifiers() {
        assert_eq!(quote_ident("col_1"), "col_1");
        assert_eq!(quote_ident("ColA"), "\"ColA\"");
        assert_eq!(quote_ident("1st"), "\"1st\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
