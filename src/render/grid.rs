use comfy_table::{presets::ASCII_FULL, Attribute, Cell};
use std::io::{self, Write};

use super::{Renderer, Table};

/// Bordered grid sized to the display width of its content, with bold
/// headers on a terminal.
#[derive(Debug, Clone, Copy)]
pub struct GridRenderer {
    /// When false, headers are never styled, whatever the output is.
    pub styled: bool,
}

impl Default for GridRenderer {
    fn default() -> Self {
        Self { styled: true }
    }
}

impl Renderer for GridRenderer {
    fn render(&self, table: &Table, out: &mut dyn Write) -> io::Result<()> {
        let columns = table
            .rows
            .iter()
            .map(Vec::len)
            .chain([table.headers.len()])
            .max()
            .unwrap_or_default();

        let mut grid = comfy_table::Table::new();
        grid.load_preset(ASCII_FULL);
        if !self.styled {
            grid.force_no_tty();
        }

        grid.set_header(
            table
                .headers
                .iter()
                .map(|header| Cell::new(header).add_attribute(Attribute::Bold)),
        );

        for row in &table.rows {
            grid.add_row((0..columns).map(|column| Cell::new(Table::cell(row, column))));
        }

        writeln!(out, "{}", grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ATTRIBUTE_SET_WIDTHS;

    const UNSTYLED: GridRenderer = GridRenderer { styled: false };

    fn render(table: &Table) -> String {
        let mut out = Vec::new();
        UNSTYLED.render(table, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    /// Terminal columns taken by `line`, counting CJK ideographs as two.
    fn display_width(line: &str) -> usize {
        line.chars()
            .map(|c| if ('\u{2E80}'..='\u{9FFF}').contains(&c) { 2 } else { 1 })
            .sum()
    }

    #[test]
    fn draws_a_bordered_grid() {
        let mut table = Table::new(&["Attribute Set ID", "Attribute Set Name"], ATTRIBUTE_SET_WIDTHS);
        table.push(vec!["4".into(), "Default".into()]);
        table.push(vec!["9".into(), "Shoes".into()]);

        assert_eq!(
            render(&table),
            "\
+------------------+--------------------+
| Attribute Set ID | Attribute Set Name |
+=======================================+
| 4                | Default            |
|------------------+--------------------|
| 9                | Shoes              |
+------------------+--------------------+
"
        );
    }

    #[test]
    fn aligns_wide_characters() {
        let mut table = Table::new(&["category_id", "name"], &[12, 20]);
        table.push(vec!["1".into(), "Root Catalog".into()]);
        table.push(vec!["2".into(), "手機配件".into()]);

        let text = render(&table);
        let widths: Vec<usize> = text.lines().map(display_width).collect();

        assert_eq!(widths.len(), 7);
        assert!(widths.iter().all(|width| *width == widths[0]), "{:?}", widths);
        assert!(text.contains("| 手機配件"));
    }

    #[test]
    fn fills_short_rows_and_skips_styling() {
        let mut table = Table::new(&["code", "label"], &[10, 10]);
        table.push(vec!["color".into()]);

        let text = render(&table);
        assert!(text.contains("| code  | label |"));
        assert!(text.contains("| color |       |"));
        assert!(!text.contains('\u{1b}'));
    }
}
