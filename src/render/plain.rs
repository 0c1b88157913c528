use std::io::{self, Write};

use super::{Renderer, Table};

/// Left-justified columns of fixed width, one space apart. Wider values are
/// printed whole and push the rest of the line right.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

fn line(table: &Table, row: &[String]) -> String {
    let columns = table.headers.len().max(row.len());

    let cells: Vec<String> = (0..columns)
        .map(|column| {
            let width = table.widths.get(column).copied().unwrap_or_default();
            format!("{:<width$}", Table::cell(row, column), width = width)
        })
        .collect();

    cells.join(" ").trim_end().to_owned()
}

impl Renderer for PlainRenderer {
    fn render(&self, table: &Table, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", line(table, &table.headers))?;

        for row in &table.rows {
            writeln!(out, "{}", line(table, row))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ATTRIBUTE_WIDTHS;

    #[test]
    fn pads_and_never_truncates() {
        let mut table = Table::new(&["attribute_id", "code", "type", "required", "scope"], ATTRIBUTE_WIDTHS);
        table.push(vec![
            "92".into(),
            "a_very_long_attribute_code_indeed".into(),
            "select".into(),
            "1".into(),
            "global".into(),
        ]);
        table.push(vec!["93".into(), "color".into()]);

        let mut out = Vec::new();
        PlainRenderer.render(&table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "attribute_id    code                      type            required   scope"
        );
        assert_eq!(
            lines[1],
            "92              a_very_long_attribute_code_indeed select          1          global"
        );
        assert_eq!(lines[2], "93              color");
    }
}
