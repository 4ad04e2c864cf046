//! SQL text helpers for the SQLite dataset.

/// Quote an identifier with double quotes (ANSI style).
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Count the distinct groups `columns` produce over `table`.
///
/// ```text
/// SELECT COUNT(*) FROM (SELECT "A", "B" FROM "t" GROUP BY "A", "B")
/// ```
pub fn distinct_groups_query(table: &str, columns: &[&str]) -> String {
    let cols = column_list(columns);
    format!(
        "SELECT COUNT(*) FROM (SELECT {cols} FROM {} GROUP BY {cols})",
        quote_ident(table)
    )
}

/// Create a table of non-null integer columns.
pub fn create_integer_table(table: &str, columns: &[&str]) -> String {
    let defs = columns
        .iter()
        .map(|c| format!("{} INTEGER NOT NULL", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table), defs)
}

/// Parameterized insert of one row.
pub fn insert_row(table: &str, columns: &[&str]) -> String {
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        column_list(columns),
        placeholders
    )
}
