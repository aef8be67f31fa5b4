use unicode_segmentation::UnicodeSegmentation;

/// Renders machines back to their parsable text notation as
/// space-aligned columns. Rows are collected first and column widths are
/// settled at render time, measured in grapheme clusters so tables with
/// non-ASCII symbols still line up.
#[derive(Default, Debug, Clone)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn render(&self, sep: &str) -> String {
        let widths = self.column_widths();
        let mut lines = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut line = String::new();
            for (cell, width) in row.iter().zip(&widths) {
                line.push_str(cell);
                for _ in cell_width(cell)..*width {
                    line.push(' ');
                }
                line.push_str(sep);
            }
            lines.push(line.trim_end().to_string());
        }
        lines.join("\n")
    }

    fn column_widths(&self) -> Vec<usize> {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        (0..columns)
            .map(|column| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(column))
                    .map(|cell| cell_width(cell))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

fn cell_width(cell: &str) -> usize {
    cell.graphemes(true).count()
}

#[cfg(test)]
mod tests {
    use super::Table;

    #[test]
    fn aligns_columns() {
        let mut table = Table::default();
        table.push_row(vec!["", "a", "bb"]);
        table.push_row(vec!["→", "xyz", "c"]);
        let rendered = table.render(" ");
        assert_eq!(rendered, "  a   bb\n→ xyz c");
    }

    #[test]
    fn widths_count_graphemes_not_bytes() {
        let mut table = Table::default();
        table.push_row(vec!["s₀", "x"]);
        table.push_row(vec!["q", "yy"]);
        assert_eq!(table.render(" "), "s₀ x\nq  yy");
    }
}
