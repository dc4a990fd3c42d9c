// Plain-text rendering of a table for terminal output

use crate::document::TableDocument;

/// Render a table as aligned text: a title line, a header row with column
/// names, then one line per row prefixed with its 1-based ordinal.
pub fn render_table(doc: &TableDocument) -> String {
    let schema = doc.schema();
    let cells: Vec<Vec<String>> = doc
        .rows()
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();

    let mut widths: Vec<usize> = schema
        .columns()
        .iter()
        .map(|c| c.name.chars().count())
        .collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let ordinal_width = doc.row_count().max(1).to_string().len();
    let rule_len = ordinal_width + widths.iter().map(|w| w + 2).sum::<usize>();
    let rule = "-".repeat(rule_len);

    let mut out = format!("Table: {}\n{rule}\n", doc.name());

    out.push_str(&format!("{:ordinal_width$}", "#"));
    for (column, &w) in schema.columns().iter().zip(&widths) {
        out.push_str(&format!("  {:<w$}", column.name));
    }
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    for (i, row) in cells.iter().enumerate() {
        out.push_str(&format!("{:>ordinal_width$}", i + 1));
        for (cell, &w) in row.iter().zip(&widths) {
            out.push_str(&format!("  {cell:<w$}"));
        }
        out.push('\n');
    }
    out.push_str(&rule);
    out.push('\n');
    out
}

/// One line per column: `name (type)`, marking the primary key.
pub fn render_schema(doc: &TableDocument) -> String {
    doc.schema()
        .columns()
        .iter()
        .map(|column| {
            let marker = if column.is_primary { " [primary]" } else { "" };
            format!(" - {} ({}){marker}\n", column.name, column.data_type)
        })
        .collect()
}
