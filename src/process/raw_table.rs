/// One `<table>` from a report, with its first column split off as the row index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlTable {
    /// Header labels of each data column, one entry per header level (outermost first).
    /// Tables without header rows get positional labels (`"1"`, `"2"`, …).
    pub columns: Vec<Vec<String>>,
    /// Header labels above the index column, one per header level.
    pub index_name: Vec<String>,
    /// First cell of every body row.
    pub index: Vec<String>,
    /// Remaining cells of every body row; each row has `columns.len()` cells.
    pub rows: Vec<Vec<String>>,
}

impl HtmlTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn header_levels(&self) -> usize {
        self.columns.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Single-string label for column `j`: its non-empty levels joined by a space.
    pub fn column_name(&self, j: usize) -> String {
        flatten_label(&self.columns[j])
    }

    pub fn column_names(&self) -> Vec<String> {
        (0..self.columns.len()).map(|j| self.column_name(j)).collect()
    }

    /// Index of the first column whose flattened label equals `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        (0..self.columns.len()).find(|&j| self.column_name(j) == name)
    }

    /// Values of column `j`, top to bottom.
    pub fn column(&self, j: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |r| r[j].as_str())
    }

    /// Swap rows and columns: former row labels become the column labels and
    /// every former data column becomes one row.
    pub fn transpose(&self) -> HtmlTable {
        let columns = self.index.iter().map(|label| vec![label.clone()]).collect();
        let index = self.column_names();
        let rows = (0..self.columns.len())
            .map(|j| self.column(j).map(str::to_string).collect())
            .collect();
        HtmlTable {
            columns,
            index_name: Vec::new(),
            index,
            rows,
        }
    }

    /// Remove the outermost header level when the columns carry more than one.
    pub fn drop_top_level(mut self) -> HtmlTable {
        if self.header_levels() < 2 {
            return self;
        }
        for label in self.columns.iter_mut() {
            if !label.is_empty() {
                label.remove(0);
            }
        }
        if !self.index_name.is_empty() {
            self.index_name.remove(0);
        }
        self
    }
}

fn flatten_label(levels: &[String]) -> String {
    levels
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
