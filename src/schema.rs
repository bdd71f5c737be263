//! Канонические имена столбцов и разбиение признаков

use serde::{Deserialize, Serialize};

pub const ID: &str = "ID";
pub const SALE_PRICE: &str = "Sale_Price";
pub const NO_OF_TIMES_VISITED: &str = "No_of_Times_Visited";
pub const RENOVATED_YEAR: &str = "Renovated_Year";
pub const DATE_HOUSE_WAS_SOLD: &str = "Date_House_was_Sold";

pub const NO_OF_BEDROOMS: &str = "No_of_Bedrooms";
pub const NO_OF_BATHROOMS: &str = "No_of_Bathrooms";
pub const FLAT_AREA: &str = "Flat_Area";
pub const LOT_AREA: &str = "Lot_Area";
pub const NO_OF_FLOORS: &str = "No_of_Floors";
pub const OVERALL_GRADE: &str = "Overall_Grade";
pub const AREA_FROM_BASEMENT: &str = "Area_of_the_House_from_Basement";
pub const BASEMENT_AREA: &str = "Basement_Area";
pub const AGE_OF_HOUSE: &str = "Age_of_House";
pub const ZIPCODE: &str = "Zipcode";
pub const LATITUDE: &str = "Latitude";
pub const LONGITUDE: &str = "Longitude";
pub const LIVING_AREA_AFTER_RENOVATION: &str = "Living_Area_after_Renovation";
pub const LOT_AREA_AFTER_RENOVATION: &str = "Lot_Area_after_Renovation";
pub const WATERFRONT_VIEW: &str = "Waterfront_View";
pub const CONDITION_OF_THE_HOUSE: &str = "Condition_of_the_House";

// Производные признаки
pub const EVER_RENOVATED: &str = "Ever_Renovated";
pub const PURCHASE_YEAR: &str = "Purchase_Year";
pub const YEARS_SINCE_RENOVATION: &str = "Years_Since_Renovation";

/// Raw dataset header → canonical name.
pub const RAW_COLUMN_MAPPING: &[(&str, &str)] = &[
    ("No of Bedrooms", NO_OF_BEDROOMS),
    ("No of Bathrooms", NO_OF_BATHROOMS),
    ("Flat Area (in Sqft)", FLAT_AREA),
    ("Lot Area (in Sqft)", LOT_AREA),
    ("No of Floors", NO_OF_FLOORS),
    ("Overall Grade", OVERALL_GRADE),
    ("Area of the House from Basement (in Sqft)", AREA_FROM_BASEMENT),
    ("Basement Area (in Sqft)", BASEMENT_AREA),
    ("Age of House (in Years)", AGE_OF_HOUSE),
    ("Zipcode", ZIPCODE),
    ("Latitude", LATITUDE),
    ("Longitude", LONGITUDE),
    ("Living Area after Renovation (in Sqft)", LIVING_AREA_AFTER_RENOVATION),
    ("Lot Area after Renovation (in Sqft)", LOT_AREA_AFTER_RENOVATION),
    ("Waterfront View", WATERFRONT_VIEW),
    ("Condition of the House", CONDITION_OF_THE_HOUSE),
    ("Renovated Year", RENOVATED_YEAR),
    ("Date House was Sold", DATE_HOUSE_WAS_SOLD),
    ("Sale Price", SALE_PRICE),
    ("No of Times Visited", NO_OF_TIMES_VISITED),
];

/// Columns removed from the feature set before fitting.
pub const NON_FEATURE_COLUMNS: &[&str] = &[NO_OF_TIMES_VISITED, ID];

pub const NUMERIC_COLUMNS: &[&str] = &[
    NO_OF_BEDROOMS,
    NO_OF_BATHROOMS,
    FLAT_AREA,
    LOT_AREA,
    NO_OF_FLOORS,
    OVERALL_GRADE,
    AREA_FROM_BASEMENT,
    BASEMENT_AREA,
    AGE_OF_HOUSE,
    ZIPCODE,
    LATITUDE,
    LONGITUDE,
    LIVING_AREA_AFTER_RENOVATION,
    LOT_AREA_AFTER_RENOVATION,
    YEARS_SINCE_RENOVATION,
];

pub const NOMINAL_COLUMNS: &[&str] = &[WATERFRONT_VIEW, EVER_RENOVATED];

pub const ORDINAL_COLUMNS: &[&str] = &[CONDITION_OF_THE_HOUSE];

/// House condition from worst to best.
pub const CONDITION_RANKING: &[&str] = &["Bad", "Fair", "Okay", "Good", "Excellent"];

/// Three-way partition of the feature columns consumed by the preprocessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub numeric: Vec<String>,
    pub nominal: Vec<String>,
    pub ordinal: Vec<String>,
}

impl ColumnSchema {
    pub fn house_sales() -> Self {
        let owned = |cols: &[&str]| -> Vec<String> { cols.iter().map(|c| c.to_string()).collect() };
        Self {
            numeric: owned(NUMERIC_COLUMNS),
            nominal: owned(NOMINAL_COLUMNS),
            ordinal: owned(ORDINAL_COLUMNS),
        }
    }

    /// Every feature column, in output order.
    pub fn all_columns(&self) -> impl Iterator<Item = &str> {
        self.numeric
            .iter()
            .chain(&self.nominal)
            .chain(&self.ordinal)
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.numeric.len() + self.nominal.len() + self.ordinal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self::house_sales()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn partition_is_disjoint() {
        let schema = ColumnSchema::house_sales();
        let unique: HashSet<&str> = schema.all_columns().collect();

        assert_eq!(schema.numeric.len(), 15);
        assert_eq!(schema.nominal.len(), 2);
        assert_eq!(schema.ordinal.len(), 1);
        assert_eq!(unique.len(), schema.len());
    }

    #[test]
    fn mapping_covers_every_raw_column() {
        assert_eq!(RAW_COLUMN_MAPPING.len(), 20);
        let targets: HashSet<&str> = RAW_COLUMN_MAPPING.iter().map(|(_, to)| *to).collect();
        assert!(targets.contains(SALE_PRICE));
        assert!(targets.contains(RENOVATED_YEAR));
        assert!(targets.contains(DATE_HOUSE_WAS_SOLD));
    }
}
