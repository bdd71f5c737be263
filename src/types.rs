/// Типы запросов и ответов сервиса

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Cell, Table};
use crate::error::{PipelineError, Result};
use crate::schema::*;
use crate::selection::FamilyScore;

/// One house as submitted by a client, in canonical column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseFeatures {
    #[serde(rename = "No_of_Bedrooms")]
    pub no_of_bedrooms: i64,
    #[serde(rename = "No_of_Bathrooms")]
    pub no_of_bathrooms: f64,
    #[serde(rename = "Flat_Area")]
    pub flat_area: f64,
    #[serde(rename = "Lot_Area")]
    pub lot_area: f64,
    #[serde(rename = "No_of_Floors")]
    pub no_of_floors: f64,
    #[serde(rename = "Waterfront_View")]
    pub waterfront_view: String,
    #[serde(rename = "Condition_of_the_House")]
    pub condition_of_the_house: String,
    #[serde(rename = "Overall_Grade")]
    pub overall_grade: i64,
    #[serde(rename = "Area_of_the_House_from_Basement")]
    pub area_of_the_house_from_basement: f64,
    #[serde(rename = "Basement_Area")]
    pub basement_area: i64,
    #[serde(rename = "Age_of_House")]
    pub age_of_house: i64,
    #[serde(rename = "Zipcode")]
    pub zipcode: f64,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Living_Area_after_Renovation")]
    pub living_area_after_renovation: f64,
    #[serde(rename = "Lot_Area_after_Renovation")]
    pub lot_area_after_renovation: i64,
    #[serde(rename = "Ever_Renovated")]
    pub ever_renovated: String,
    #[serde(rename = "Years_Since_Renovation")]
    pub years_since_renovation: f64,
}

impl HouseFeatures {
    /// Single-row feature table. Values are passed through unvalidated.
    pub fn to_feature_record(&self) -> Result<Table> {
        let cells: Vec<(&str, Cell)> = vec![
            (NO_OF_BEDROOMS, Cell::from(self.no_of_bedrooms)),
            (NO_OF_BATHROOMS, Cell::from(self.no_of_bathrooms)),
            (FLAT_AREA, Cell::from(self.flat_area)),
            (LOT_AREA, Cell::from(self.lot_area)),
            (NO_OF_FLOORS, Cell::from(self.no_of_floors)),
            (WATERFRONT_VIEW, Cell::text(self.waterfront_view.as_str())),
            (CONDITION_OF_THE_HOUSE, Cell::text(self.condition_of_the_house.as_str())),
            (OVERALL_GRADE, Cell::from(self.overall_grade)),
            (AREA_FROM_BASEMENT, Cell::from(self.area_of_the_house_from_basement)),
            (BASEMENT_AREA, Cell::from(self.basement_area)),
            (AGE_OF_HOUSE, Cell::from(self.age_of_house)),
            (ZIPCODE, Cell::from(self.zipcode)),
            (LATITUDE, Cell::from(self.latitude)),
            (LONGITUDE, Cell::from(self.longitude)),
            (LIVING_AREA_AFTER_RENOVATION, Cell::from(self.living_area_after_renovation)),
            (LOT_AREA_AFTER_RENOVATION, Cell::from(self.lot_area_after_renovation)),
            (EVER_RENOVATED, Cell::text(self.ever_renovated.as_str())),
            (YEARS_SINCE_RENOVATION, Cell::from(self.years_since_renovation)),
        ];
        Table::from_columns(cells.into_iter().map(|(name, cell)| (name, vec![cell])))
    }

    /// Coerces form-encoded string fields into typed features.
    pub fn from_form(fields: &HashMap<String, String>) -> Result<Self> {
        let form = FormFields(fields);
        Ok(Self {
            no_of_bedrooms: form.int(NO_OF_BEDROOMS)?,
            no_of_bathrooms: form.float(NO_OF_BATHROOMS)?,
            flat_area: form.float(FLAT_AREA)?,
            lot_area: form.float(LOT_AREA)?,
            no_of_floors: form.float(NO_OF_FLOORS)?,
            waterfront_view: form.text(WATERFRONT_VIEW)?,
            condition_of_the_house: form.text(CONDITION_OF_THE_HOUSE)?,
            overall_grade: form.int(OVERALL_GRADE)?,
            area_of_the_house_from_basement: form.float(AREA_FROM_BASEMENT)?,
            basement_area: form.int(BASEMENT_AREA)?,
            age_of_house: form.int(AGE_OF_HOUSE)?,
            zipcode: form.float(ZIPCODE)?,
            latitude: form.float(LATITUDE)?,
            longitude: form.float(LONGITUDE)?,
            living_area_after_renovation: form.float(LIVING_AREA_AFTER_RENOVATION)?,
            lot_area_after_renovation: form.int(LOT_AREA_AFTER_RENOVATION)?,
            ever_renovated: form.text(EVER_RENOVATED)?,
            years_since_renovation: form.float(YEARS_SINCE_RENOVATION)?,
        })
    }
}

struct FormFields<'a>(&'a HashMap<String, String>);

impl FormFields<'_> {
    fn raw(&self, name: &str) -> Result<&str> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .ok_or_else(|| PipelineError::schema(format!("missing required field '{name}'")))
    }

    fn int(&self, name: &str) -> Result<i64> {
        let raw = self.raw(name)?;
        raw.parse()
            .map_err(|_| PipelineError::invalid_input(format!("field '{name}' is not an integer: '{raw}'")))
    }

    fn float(&self, name: &str) -> Result<f64> {
        let raw = self.raw(name)?;
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| PipelineError::invalid_input(format!("field '{name}' is not a number: '{raw}'")))
    }

    fn text(&self, name: &str) -> Result<String> {
        self.raw(name).map(str::to_string)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
}

/// Summary of a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub best_family: String,
    pub test_r2: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub n_features: usize,
    pub preprocessor_path: PathBuf,
    pub model_path: PathBuf,
    pub trained_at: DateTime<Utc>,
    pub families: Vec<FamilyScore>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> HashMap<String, String> {
        [
            ("No_of_Bedrooms", "3"),
            ("No_of_Bathrooms", "2.25"),
            ("Flat_Area", "2570"),
            ("Lot_Area", "7242"),
            ("No_of_Floors", "2"),
            ("Waterfront_View", "No"),
            ("Condition_of_the_House", "Fair"),
            ("Overall_Grade", "7"),
            ("Area_of_the_House_from_Basement", "2170"),
            ("Basement_Area", "400"),
            ("Age_of_House", "63"),
            ("Zipcode", "98125"),
            ("Latitude", "47.721"),
            ("Longitude", "-122.319"),
            ("Living_Area_after_Renovation", "1690"),
            ("Lot_Area_after_Renovation", "7639"),
            ("Ever_Renovated", "Yes"),
            ("Years_Since_Renovation", "26"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn form_fields_are_coerced() {
        let features = HouseFeatures::from_form(&form()).unwrap();
        assert_eq!(features.no_of_bedrooms, 3);
        assert_eq!(features.no_of_bathrooms, 2.25);
        assert_eq!(features.condition_of_the_house, "Fair");
        assert_eq!(features.lot_area_after_renovation, 7639);
    }

    #[test]
    fn missing_form_field_is_schema_mismatch() {
        let mut fields = form();
        fields.remove("Zipcode");
        assert!(matches!(
            HouseFeatures::from_form(&fields),
            Err(PipelineError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn unparseable_form_field_is_invalid_input() {
        let mut fields = form();
        fields.insert("Overall_Grade".to_string(), "seven".to_string());
        assert!(matches!(
            HouseFeatures::from_form(&fields),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn non_finite_form_numbers_are_rejected() {
        for raw in ["inf", "NaN", "-infinity"] {
            let mut fields = form();
            fields.insert("Latitude".to_string(), raw.to_string());
            assert!(matches!(
                HouseFeatures::from_form(&fields),
                Err(PipelineError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn feature_record_has_every_schema_column() {
        let record = HouseFeatures::from_form(&form()).unwrap().to_feature_record().unwrap();
        assert_eq!(record.n_rows(), 1);
        for column in ColumnSchema::house_sales().all_columns() {
            assert!(record.has_column(column), "missing {column}");
        }
    }

    #[test]
    fn json_uses_canonical_names() {
        let features = HouseFeatures::from_form(&form()).unwrap();
        let json = serde_json::to_value(&features).unwrap();
        assert_eq!(json["Waterfront_View"], "No");
        assert_eq!(json["No_of_Bedrooms"], 3);
    }
}
