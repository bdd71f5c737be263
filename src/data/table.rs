//! Таблица в памяти, хранение по столбцам

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::error::{PipelineError, Result};

/// Markers read as missing in addition to empty fields.
const MISSING_MARKERS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Infers the cell type from a raw CSV field.
    pub fn parse(raw: &str) -> Self {
        let field = raw.trim();
        if field.is_empty() || MISSING_MARKERS.contains(&field) {
            return Cell::Missing;
        }
        match field.parse::<f64>() {
            Ok(value) if !value.is_nan() => Cell::Number(value),
            _ => Cell::Text(field.to_string()),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Category label of the cell. Integral numbers render without a fraction.
    pub fn to_category(&self) -> Option<String> {
        match self {
            Cell::Text(text) => Some(text.clone()),
            Cell::Number(value) if value.is_finite() && value.fract() == 0.0 => {
                Some(format!("{}", *value as i64))
            }
            Cell::Number(value) => Some(value.to_string()),
            Cell::Missing => None,
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Cell::Missing
        } else {
            Cell::Number(value)
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Vec<Cell>>,
    n_rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<Cell>)>,
        S: Into<String>,
    {
        let mut table = Table::new();
        for (name, cells) in columns {
            let name = name.into();
            if table.has_column(&name) {
                return Err(PipelineError::schema(format!("duplicate column '{name}'")));
            }
            table = table.with_column(name, cells)?;
        }
        Ok(table)
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PipelineError::Io(io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
        })?;
        let table = Self::from_csv_reader(BufReader::new(file))?;
        tracing::info!(
            "Loaded {} rows and {} columns from {}",
            table.n_rows(),
            table.n_cols(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let names: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); names.len()];

        for result in rdr.records() {
            let record = result?;
            for (column, field) in columns.iter_mut().zip(record.iter()) {
                column.push(Cell::parse(field));
            }
        }

        Table::from_columns(names.into_iter().zip(columns))
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.position(name).map(|idx| self.columns[idx].as_slice())
    }

    /// Column lookup that reports an absent column as a schema mismatch.
    pub fn require(&self, name: &str) -> Result<&[Cell]> {
        self.column(name)
            .ok_or_else(|| PipelineError::schema(format!("missing required column '{name}'")))
    }

    /// Numeric view of a column; missing cells become NaN.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        self.require(name)?
            .iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                Cell::Number(value) => Ok(*value),
                Cell::Missing => Ok(f64::NAN),
                Cell::Text(text) => Err(PipelineError::schema(format!(
                    "column '{name}' expects numbers, got '{text}' at row {row}"
                ))),
            })
            .collect()
    }

    /// Renames columns by `(from, to)` pairs; unmapped columns pass through.
    pub fn rename(&self, mapping: &[(&str, &str)]) -> Self {
        let names = self
            .names
            .iter()
            .map(|name| {
                mapping
                    .iter()
                    .find(|(from, _)| from == name)
                    .map(|(_, to)| to.to_string())
                    .unwrap_or_else(|| name.clone())
            })
            .collect();
        Self {
            names,
            columns: self.columns.clone(),
            n_rows: self.n_rows,
        }
    }

    pub fn filter_rows<F: Fn(usize) -> bool>(&self, keep: F) -> Self {
        let kept: Vec<usize> = (0..self.n_rows).filter(|&row| keep(row)).collect();
        let columns = self
            .columns
            .iter()
            .map(|column| kept.iter().map(|&row| column[row].clone()).collect())
            .collect();
        Self {
            names: self.names.clone(),
            columns,
            n_rows: kept.len(),
        }
    }

    /// Adds a column, replacing any existing column of the same name.
    pub fn with_column(mut self, name: impl Into<String>, cells: Vec<Cell>) -> Result<Self> {
        let name = name.into();
        if !self.names.is_empty() && cells.len() != self.n_rows {
            return Err(PipelineError::schema(format!(
                "column '{}' has {} rows, table has {}",
                name,
                cells.len(),
                self.n_rows
            )));
        }
        if self.names.is_empty() {
            self.n_rows = cells.len();
        }
        match self.position(&name) {
            Some(idx) => self.columns[idx] = cells,
            None => {
                self.names.push(name);
                self.columns.push(cells);
            }
        }
        Ok(self)
    }

    pub fn drop_columns(&self, names: &[&str]) -> Self {
        let (names, columns) = self
            .names
            .iter()
            .zip(&self.columns)
            .filter(|(name, _)| !names.contains(&name.as_str()))
            .map(|(name, column)| (name.clone(), column.clone()))
            .unzip();
        Self {
            names,
            columns,
            n_rows: self.n_rows,
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "ID,Sale Price,Waterfront View,Zipcode\n\
                       1,600000,No,98001\n\
                       2,,Yes,98002\n\
                       3,450000.5,NA,\n";

    #[test]
    fn csv_cells_are_typed() {
        let table = Table::from_csv_reader(CSV.as_bytes()).unwrap();

        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.n_cols(), 4);
        let price = table.column("Sale Price").unwrap();
        assert_eq!(price[0], Cell::Number(600000.0));
        assert!(price[1].is_missing());
        assert_eq!(table.column("Waterfront View").unwrap()[0], Cell::text("No"));
        assert!(table.column("Waterfront View").unwrap()[2].is_missing());
    }

    #[test]
    fn rename_and_drop_leave_original_untouched() {
        let table = Table::from_csv_reader(CSV.as_bytes()).unwrap();
        let renamed = table
            .rename(&[("Sale Price", "Sale_Price")])
            .drop_columns(&["ID"]);

        assert!(renamed.has_column("Sale_Price"));
        assert!(!renamed.has_column("ID"));
        assert!(table.has_column("Sale Price"));
        assert!(table.has_column("ID"));
    }

    #[test]
    fn filter_rows_keeps_alignment() {
        let table = Table::from_csv_reader(CSV.as_bytes()).unwrap();
        let kept = table.filter_rows(|row| row != 1);

        assert_eq!(kept.n_rows(), 2);
        assert_eq!(kept.column("ID").unwrap()[1], Cell::Number(3.0));
    }

    #[test]
    fn numeric_column_rejects_text() {
        let table = Table::from_csv_reader(CSV.as_bytes()).unwrap();
        assert!(table.numeric_column("Zipcode").unwrap()[2].is_nan());
        let err = table.numeric_column("Waterfront View").unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch(_)));
    }

    #[test]
    fn with_column_checks_length() {
        let table = Table::from_csv_reader(CSV.as_bytes()).unwrap();
        let err = table.with_column("extra", vec![Cell::Missing]).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch(_)));
    }

    #[test]
    fn integral_numbers_render_as_integer_categories() {
        assert_eq!(Cell::Number(3.0).to_category().as_deref(), Some("3"));
        assert_eq!(Cell::Number(2.5).to_category().as_deref(), Some("2.5"));
        assert_eq!(Cell::Missing.to_category(), None);
    }
}
