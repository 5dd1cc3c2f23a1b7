use std::str::FromStr;

/// A report row with a fixed, ordered set of named columns.
pub trait TableRow {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;

    fn field(&self, header: &str) -> Option<String> {
        let index = column_index::<Self>(header)?;
        self.cells().into_iter().nth(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("filter must look like Field=Value, got {0:?}")]
    MalformedFilter(String),
    #[error("unknown column {column:?}; expected one of {known}")]
    UnknownColumn { column: String, known: String },
}

/// Exact-match filter on one named column (`Field=Value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl FromStr for FieldFilter {
    type Err = TableError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (field, value) = raw
            .split_once('=')
            .ok_or_else(|| TableError::MalformedFilter(raw.to_string()))?;
        let field = field.trim();
        if field.is_empty() {
            return Err(TableError::MalformedFilter(raw.to_string()));
        }
        Ok(Self {
            field: field.to_string(),
            value: value.trim().to_string(),
        })
    }
}

impl FieldFilter {
    pub fn matches<R: TableRow>(&self, row: &R) -> bool {
        row.field(&self.field).as_deref() == Some(self.value.as_str())
    }
}

/// Keeps rows matching every filter. Column names are case-insensitive.
pub fn apply_filters<R: TableRow>(
    rows: Vec<R>,
    filters: &[FieldFilter],
) -> Result<Vec<R>, TableError> {
    for filter in filters {
        if column_index::<R>(&filter.field).is_none() {
            return Err(TableError::UnknownColumn {
                column: filter.field.clone(),
                known: R::headers().join(", "),
            });
        }
    }
    Ok(rows
        .into_iter()
        .filter(|row| filters.iter().all(|filter| filter.matches(row)))
        .collect())
}

/// Header line plus one line per row, each terminated by `\n`.
pub fn render_delimited<R: TableRow>(rows: &[R], delimiter: char) -> String {
    let mut buffer = String::new();
    push_line(&mut buffer, R::headers().iter().copied(), delimiter);
    for row in rows {
        let cells = row.cells();
        push_line(&mut buffer, cells.iter().map(String::as_str), delimiter);
    }
    buffer
}

fn push_line<'a>(buffer: &mut String, cells: impl Iterator<Item = &'a str>, delimiter: char) {
    for (index, cell) in cells.enumerate() {
        if index > 0 {
            buffer.push(delimiter);
        }
        push_cell(buffer, cell, delimiter);
    }
    buffer.push('\n');
}

fn push_cell(buffer: &mut String, cell: &str, delimiter: char) {
    let needs_quotes = cell
        .chars()
        .any(|c| c == delimiter || c == '"' || c == '\n' || c == '\r');
    if !needs_quotes {
        buffer.push_str(cell);
        return;
    }
    buffer.push('"');
    for c in cell.chars() {
        if c == '"' {
            buffer.push('"');
        }
        buffer.push(c);
    }
    buffer.push('"');
}

fn column_index<R: TableRow + ?Sized>(header: &str) -> Option<usize> {
    R::headers()
        .iter()
        .position(|known| known.eq_ignore_ascii_case(header))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair(&'static str, &'static str);

    impl TableRow for Pair {
        fn headers() -> &'static [&'static str] {
            &["Name", "Note"]
        }

        fn cells(&self) -> Vec<String> {
            vec![self.0.to_string(), self.1.to_string()]
        }
    }

    #[test]
    fn renders_header_and_quotes_special_cells() {
        let rows = [Pair("web01", "plain"), Pair("db,01", "say \"hi\"")];
        let text = render_delimited(&rows, ',');
        assert_eq!(
            text,
            "Name,Note\nweb01,plain\n\"db,01\",\"say \"\"hi\"\"\"\n"
        );
    }

    #[test]
    fn other_delimiters_leave_commas_alone() {
        let rows = [Pair("db,01", "x")];
        assert_eq!(render_delimited(&rows, ';'), "Name;Note\ndb,01;x\n");
    }

    #[test]
    fn filter_parsing() {
        let filter: FieldFilter = "Name = web01".parse().unwrap();
        assert_eq!(filter.field, "Name");
        assert_eq!(filter.value, "web01");
        assert!("novalue".parse::<FieldFilter>().is_err());
        assert!("=x".parse::<FieldFilter>().is_err());
    }

    #[test]
    fn filters_match_exactly_and_reject_unknown_columns() {
        let rows = vec![Pair("web01", "a"), Pair("web02", "a"), Pair("web010", "b")];
        let filters = vec!["name=web01".parse().unwrap()];
        let kept = apply_filters(rows, &filters).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].0, "web01");

        let err = apply_filters(vec![Pair("a", "b")], &["Owner=x".parse().unwrap()]);
        assert!(matches!(err, Err(TableError::UnknownColumn { .. })));
    }
}
