#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::Path;

use house_price_ml::models::{Criterion, FamilyGrid, ModelFamily, Roster};
use house_price_ml::{HouseFeatures, PipelineConfig};

pub const RAW_HEADER: &[&str] = &[
    "ID",
    "Date House was Sold",
    "Sale Price",
    "No of Bedrooms",
    "No of Bathrooms",
    "Flat Area (in Sqft)",
    "Lot Area (in Sqft)",
    "No of Floors",
    "Waterfront View",
    "No of Times Visited",
    "Condition of the House",
    "Overall Grade",
    "Area of the House from Basement (in Sqft)",
    "Basement Area (in Sqft)",
    "Age of House (in Years)",
    "Renovated Year",
    "Zipcode",
    "Latitude",
    "Longitude",
    "Living Area after Renovation (in Sqft)",
    "Lot Area after Renovation (in Sqft)",
];

const CONDITIONS: &[&str] = &["Fair", "Good", "Excellent", "Okay", "Bad"];

/// Price is linear in flat area: row 10 sells for 400,000 and row 30 for 600,000.
pub fn price(i: usize) -> f64 {
    100_000.0 + 200.0 * flat_area(i)
}

fn flat_area(i: usize) -> f64 {
    1000.0 + 50.0 * i as f64
}

fn renovated_year(i: usize) -> i64 {
    if i % 3 == 0 {
        2000
    } else {
        0
    }
}

/// House `i` as a client would submit it.
pub fn house(i: usize) -> HouseFeatures {
    let renovated = renovated_year(i) != 0;
    HouseFeatures {
        no_of_bedrooms: 2 + (i % 4) as i64,
        no_of_bathrooms: 1.0 + 0.25 * (i % 5) as f64,
        flat_area: flat_area(i),
        lot_area: 5000.0 + 37.0 * ((i * 11) % 23) as f64,
        no_of_floors: 1.0 + (i % 2) as f64,
        waterfront_view: if i % 7 == 0 { "Yes" } else { "No" }.to_string(),
        condition_of_the_house: CONDITIONS[i % CONDITIONS.len()].to_string(),
        overall_grade: 5 + (i % 6) as i64,
        area_of_the_house_from_basement: flat_area(i) - 300.0,
        basement_area: 300,
        age_of_house: 10 + ((i * 3) % 50) as i64,
        zipcode: 98001.0 + (i % 9) as f64,
        latitude: 47.3 + 0.01 * (i % 13) as f64,
        longitude: -122.4 + 0.01 * (i % 17) as f64,
        living_area_after_renovation: 1200.0 + 15.0 * ((i * 5) % 19) as f64,
        lot_area_after_renovation: 4800 + 29 * ((i * 7) % 31) as i64,
        ever_renovated: if renovated { "Yes" } else { "No" }.to_string(),
        years_since_renovation: if renovated { 17.0 } else { 0.0 },
    }
}

fn raw_row(i: usize) -> String {
    let h = house(i);
    let price = if i == 59 { String::new() } else { price(i).to_string() };
    [
        i.to_string(),
        "2017-06-15".to_string(),
        price,
        h.no_of_bedrooms.to_string(),
        h.no_of_bathrooms.to_string(),
        h.flat_area.to_string(),
        h.lot_area.to_string(),
        h.no_of_floors.to_string(),
        h.waterfront_view,
        (i % 3).to_string(),
        h.condition_of_the_house,
        h.overall_grade.to_string(),
        h.area_of_the_house_from_basement.to_string(),
        h.basement_area.to_string(),
        h.age_of_house.to_string(),
        renovated_year(i).to_string(),
        h.zipcode.to_string(),
        h.latitude.to_string(),
        h.longitude.to_string(),
        h.living_area_after_renovation.to_string(),
        h.lot_area_after_renovation.to_string(),
    ]
    .join(",")
}

fn write_split(path: &Path, rows: impl Iterator<Item = usize>) {
    let mut out = RAW_HEADER.join(",");
    out.push('\n');
    for i in rows {
        writeln!(out, "{}", raw_row(i)).unwrap();
    }
    std::fs::write(path, out).unwrap();
}

/// Writes 60 raw rows split 3:1 into train/test CSVs. Row 59 has no price.
pub fn write_raw_splits(dir: &Path) {
    write_split(&dir.join("train.csv"), (0..60).filter(|i| i % 4 != 0));
    write_split(&dir.join("test.csv"), (0..60).filter(|i| i % 4 == 0));
}

/// Small, fast roster used by the integration tests.
pub fn quick_roster() -> Roster {
    Roster::new(vec![
        ModelFamily::new(
            "Decision Tree",
            FamilyGrid::DecisionTree {
                criterion: vec![Criterion::SquaredError],
                max_depth: vec![None],
                min_samples_split: vec![2],
            },
        ),
        ModelFamily::new("Linear Regression", FamilyGrid::LinearRegression),
    ])
}

pub fn config(dir: &Path) -> PipelineConfig {
    write_raw_splits(dir);
    let mut config = PipelineConfig::default();
    config.data.train_path = dir.join("train.csv");
    config.data.test_path = dir.join("test.csv");
    config.artifacts.dir = dir.join("artifacts");
    config.training.roster = quick_roster();
    config
}
