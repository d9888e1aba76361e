#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug)]
struct Column {
    title: String,
    align: Align,
    width: usize,
}

/// Box-drawn table for terminal output.
#[derive(Debug)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<(&str, Align)>) -> Self {
        let columns = headers
            .into_iter()
            .map(|(title, align)| Column {
                title: title.to_string(),
                align,
                width: title.chars().count(),
            })
            .collect();
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, mut cells: Vec<String>) {
        cells.resize(self.columns.len(), String::new());
        for (column, cell) in self.columns.iter_mut().zip(&cells) {
            column.width = column.width.max(cell.chars().count());
        }
        self.rows.push(cells);
    }

    /// Shrinks the widest columns until the table fits in `max_width`.
    pub fn fit_to_width(&mut self, max_width: usize) {
        let min_column_width = 3;
        let borders = 2 + 1 + self.columns.len(); // Indent, left border, separators
        let padding = 2 * self.columns.len();
        let available = max_width.saturating_sub(borders + padding);

        while self.columns.iter().map(|c| c.width).sum::<usize>() > available {
            let widest = self
                .columns
                .iter_mut()
                .max_by_key(|c| c.width)
                .filter(|c| c.width > min_column_width);
            match widest {
                Some(column) => column.width -= 1,
                None => break,
            }
        }
    }

    pub fn render(&self) -> String {
        let mut output = String::new();
        self.render_border(&mut output, '┌', '┬', '┐');
        let titles: Vec<String> = self.columns.iter().map(|c| c.title.clone()).collect();
        self.render_row(&mut output, &titles);
        self.render_border(&mut output, '├', '┼', '┤');
        for row in &self.rows {
            self.render_row(&mut output, row);
        }
        self.render_border(&mut output, '└', '┴', '┘');
        output
    }

    fn render_border(&self, output: &mut String, left: char, middle: char, right: char) {
        output.push_str("  ");
        output.push(left);
        for (i, column) in self.columns.iter().enumerate() {
            output.push_str(&"─".repeat(column.width + 2));
            if i < self.columns.len() - 1 {
                output.push(middle);
            }
        }
        output.push(right);
        output.push('\n');
    }

    fn render_row(&self, output: &mut String, cells: &[String]) {
        output.push_str("  │ ");
        for (i, (column, cell)) in self.columns.iter().zip(cells).enumerate() {
            let cell = truncate(cell, column.width);
            let formatted = match column.align {
                Align::Left => format!("{:<width$}", cell, width = column.width),
                Align::Right => format!("{:>width$}", cell, width = column.width),
            };
            output.push_str(&formatted);
            if i < self.columns.len() - 1 {
                output.push_str(" │ ");
            }
        }
        output.push_str(" │\n");
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
