//! Нормализация датасета: канонические имена, очистка целевой переменной, новые признаки

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use ndarray::Array1;

use crate::data::{Cell, Table};
use crate::error::{PipelineError, Result};
use crate::schema::{
    DATE_HOUSE_WAS_SOLD, EVER_RENOVATED, NON_FEATURE_COLUMNS, PURCHASE_YEAR, RAW_COLUMN_MAPPING,
    RENOVATED_YEAR, SALE_PRICE, YEARS_SINCE_RENOVATION,
};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y", "%Y%m%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

pub struct DatasetNormalizer;

impl DatasetNormalizer {
    /// Canonical dataset from a raw split. The input table is left untouched.
    pub fn normalize(raw: &Table) -> Result<Table> {
        let renamed = Self::rename_columns(raw);
        let cleaned = Self::drop_missing_target(&renamed)?;
        Self::add_renovation_features(cleaned)
    }

    pub fn rename_columns(raw: &Table) -> Table {
        raw.rename(RAW_COLUMN_MAPPING)
    }

    /// Rows without a target cannot be used for fitting or evaluation.
    pub fn drop_missing_target(table: &Table) -> Result<Table> {
        let target = table.require(SALE_PRICE)?;
        let cleaned = table.filter_rows(|row| !target[row].is_missing());

        let dropped = table.n_rows() - cleaned.n_rows();
        if dropped > 0 {
            tracing::info!("Dropped {} rows with missing {}", dropped, SALE_PRICE);
        }
        Ok(cleaned)
    }

    /// Derives `Ever_Renovated`, `Purchase_Year` and `Years_Since_Renovation`.
    pub fn add_renovation_features(table: Table) -> Result<Table> {
        let renovated_years = table.numeric_column(RENOVATED_YEAR)?;
        let purchase_years = table
            .require(DATE_HOUSE_WAS_SOLD)?
            .iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                Cell::Missing => Ok(None),
                other => parse_sale_year(other).map(Some).ok_or_else(|| {
                    PipelineError::schema(format!(
                        "unparseable {DATE_HOUSE_WAS_SOLD} {other:?} at row {row}"
                    ))
                }),
            })
            .collect::<Result<Vec<Option<i32>>>>()?;

        let mut ever_renovated = Vec::with_capacity(table.n_rows());
        let mut purchase_year = Vec::with_capacity(table.n_rows());
        let mut years_since = Vec::with_capacity(table.n_rows());

        for (&renovated, &purchased) in renovated_years.iter().zip(&purchase_years) {
            // Пропущенный год ремонта не равен нулю, поэтому считается ремонтом.
            let was_renovated = renovated != 0.0;
            ever_renovated.push(Cell::text(if was_renovated { "Yes" } else { "No" }));
            purchase_year.push(purchased.map_or(Cell::Missing, |y| Cell::from(y as i64)));

            let since = match (was_renovated, purchased) {
                (false, _) => Cell::Number(0.0),
                (true, Some(year)) if renovated.is_finite() => {
                    Cell::Number((year as f64 - renovated).abs())
                }
                (true, _) => Cell::Missing,
            };
            years_since.push(since);
        }

        table
            .with_column(EVER_RENOVATED, ever_renovated)?
            .with_column(PURCHASE_YEAR, purchase_year)?
            .with_column(YEARS_SINCE_RENOVATION, years_since)
    }

    /// Splits a canonical table into feature columns and the target vector.
    /// Identifier and visit-count columns are removed from the features.
    pub fn split_target(table: &Table) -> Result<(Table, Array1<f64>)> {
        let target = table.numeric_column(SALE_PRICE)?;
        if let Some(row) = target.iter().position(|v| v.is_nan()) {
            return Err(PipelineError::schema(format!(
                "{SALE_PRICE} is missing at row {row}"
            )));
        }

        let mut dropped = vec![SALE_PRICE];
        dropped.extend_from_slice(NON_FEATURE_COLUMNS);
        Ok((table.drop_columns(&dropped), Array1::from(target)))
    }
}

/// Calendar year of a sale date cell.
pub fn parse_sale_year(cell: &Cell) -> Option<i32> {
    let raw = cell.to_category()?;
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.year());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.year());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date.year());
        }
    }
    None
}
