//! Order table loading and schema validation using Polars

use std::fs::File;
use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use itertools::izip;
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{DashboardError, Result};

/// Column names of the input file
pub mod columns {
    pub const CUSTOMER_ID: &str = "customer_id";
    pub const CUSTOMER_CITY: &str = "customer_city";
    pub const ORDER_PURCHASE_TIMESTAMP: &str = "order_purchase_timestamp";
    pub const REVIEW_CREATION_DATE: &str = "review_creation_date";
    pub const REVIEW_SCORE: &str = "review_score";
    pub const PRICE: &str = "price";
    pub const PRODUCT_ID: &str = "product_id";
    pub const PRODUCT_CATEGORY: &str = "product_category_name_english";
}

/// Every column the loader expects in the input header, in schema order.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    columns::CUSTOMER_ID,
    columns::CUSTOMER_CITY,
    columns::ORDER_PURCHASE_TIMESTAMP,
    columns::REVIEW_CREATION_DATE,
    columns::REVIEW_SCORE,
    columns::PRICE,
    columns::PRODUCT_ID,
    columns::PRODUCT_CATEGORY,
];

// Columns of the in-memory frame that differ from the input names.
// Dates are stored as day numbers so aggregations stay in plain integers.
pub(crate) const ORDER_DAY: &str = "order_day";
pub(crate) const ORDER_TS: &str = "order_ts";
pub(crate) const REVIEW_DAY: &str = "review_day";

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// One order item as read from the input file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub customer_id: String,
    pub customer_city: String,
    pub order_purchase_timestamp: NaiveDateTime,
    pub review_creation_date: Option<NaiveDate>,
    /// Review score in 1..=5
    pub review_score: Option<u8>,
    pub price: Option<f64>,
    pub product_id: Option<String>,
    pub product_category: Option<String>,
}

/// Immutable, validated order table
///
/// Holds the typed rows together with their columnar form. Every aggregation
/// takes a `&OrderTable`; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct OrderTable {
    records: Vec<OrderRecord>,
    frame: DataFrame,
}

impl OrderTable {
    /// Build a table from already typed records
    pub fn from_records(records: Vec<OrderRecord>) -> Result<Self> {
        for (row, record) in records.iter().enumerate() {
            if let Some(score) = record.review_score {
                if !(1..=5).contains(&score) {
                    return Err(DashboardError::InvalidValue {
                        column: columns::REVIEW_SCORE,
                        row: row + 1,
                        value: score.to_string(),
                    });
                }
            }
        }

        let frame = build_frame(&records)?;
        Ok(Self { records, frame })
    }

    pub fn records(&self) -> &[OrderRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Columnar view used by the aggregations
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }
}

/// Load the order file and validate it against the fixed schema
///
/// # Arguments
/// * `path` - Path to the delimited input file
///
/// # Returns
/// * `OrderTable` with one record per data row, in file order
pub fn load_orders<P: AsRef<Path>>(path: P) -> Result<OrderTable> {
    let path = path.as_ref();

    // Fail on a missing file before polars gets a chance to defer the error
    File::open(path).map_err(|source| DashboardError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    // Read every cell as text; typing happens row by row below
    let raw = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(0))
        .finish()?
        .collect()?;

    validate_columns(&raw)?;

    let typed = raw
        .lazy()
        .select(
            REQUIRED_COLUMNS
                .iter()
                .map(|&name| col(name).cast(DataType::String))
                .collect::<Vec<_>>(),
        )
        .collect()?;

    let records = parse_records(&typed)?;
    info!(path = %path.display(), rows = records.len(), "loaded order table");

    OrderTable::from_records(records)
}

fn validate_columns(df: &DataFrame) -> Result<()> {
    let header = df.get_column_names();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .copied()
        .find(|name| !header.contains(name))
    {
        return Err(DashboardError::MissingColumn(missing.to_string()));
    }
    debug!(columns = header.len(), "input schema validated");
    Ok(())
}

fn text_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    Ok(df.column(name)?.str()?)
}

fn parse_records(df: &DataFrame) -> Result<Vec<OrderRecord>> {
    let rows = izip!(
        text_column(df, columns::CUSTOMER_ID)?,
        text_column(df, columns::CUSTOMER_CITY)?,
        text_column(df, columns::ORDER_PURCHASE_TIMESTAMP)?,
        text_column(df, columns::REVIEW_CREATION_DATE)?,
        text_column(df, columns::REVIEW_SCORE)?,
        text_column(df, columns::PRICE)?,
        text_column(df, columns::PRODUCT_ID)?,
        text_column(df, columns::PRODUCT_CATEGORY)?,
    );

    rows.enumerate()
        .map(
            |(index, (customer_id, city, purchased, reviewed, score, price, product, category))|
             -> Result<OrderRecord> {
                let row = index + 1;
                let purchased = required(columns::ORDER_PURCHASE_TIMESTAMP, row, purchased)?;

                Ok(OrderRecord {
                    customer_id: required(columns::CUSTOMER_ID, row, customer_id)?.to_string(),
                    customer_city: required(columns::CUSTOMER_CITY, row, city)?.to_string(),
                    order_purchase_timestamp: parse_timestamp(
                        columns::ORDER_PURCHASE_TIMESTAMP,
                        row,
                        purchased,
                    )?,
                    review_creation_date: present(reviewed)
                        .map(|v| parse_timestamp(columns::REVIEW_CREATION_DATE, row, v))
                        .transpose()?
                        .map(|ts| ts.date()),
                    review_score: present(score).map(|v| parse_score(row, v)).transpose()?,
                    price: present(price).map(|v| parse_price(row, v)).transpose()?,
                    product_id: present(product).map(str::to_string),
                    product_category: present(category).map(str::to_string),
                })
            },
        )
        .collect()
}

/// Treat blank cells the same as nulls
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(column: &'static str, row: usize, value: Option<&'a str>) -> Result<&'a str> {
    present(value).ok_or_else(|| DashboardError::InvalidValue {
        column,
        row,
        value: String::new(),
    })
}

fn invalid(column: &'static str, row: usize, value: &str) -> DashboardError {
    DashboardError::InvalidValue {
        column,
        row,
        value: value.to_string(),
    }
}

/// Parse a timestamp or a bare date; a bare date maps to midnight
pub fn parse_timestamp(column: &'static str, row: usize, value: &str) -> Result<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| invalid(column, row, value))
}

// Scores may arrive as "4" or "4.0" depending on how the file was exported
fn parse_score(row: usize, value: &str) -> Result<u8> {
    let score: f64 = value
        .parse()
        .map_err(|_| invalid(columns::REVIEW_SCORE, row, value))?;
    if score.fract() != 0.0 || !(1.0..=5.0).contains(&score) {
        return Err(invalid(columns::REVIEW_SCORE, row, value));
    }
    Ok(score as u8)
}

fn parse_price(row: usize, value: &str) -> Result<f64> {
    match value.parse::<f64>() {
        Ok(price) if price.is_finite() => Ok(price),
        _ => Err(invalid(columns::PRICE, row, value)),
    }
}

/// Day number used for date arithmetic inside the frame
pub(crate) fn day_number(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

pub(crate) fn date_from_day_number(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days)
}

fn build_frame(records: &[OrderRecord]) -> PolarsResult<DataFrame> {
    let customer_ids: Vec<&str> = records.iter().map(|r| r.customer_id.as_str()).collect();
    let cities: Vec<&str> = records.iter().map(|r| r.customer_city.as_str()).collect();
    let order_days: Vec<i32> = records
        .iter()
        .map(|r| day_number(r.order_purchase_timestamp.date()))
        .collect();
    let order_ts: Vec<i64> = records
        .iter()
        .map(|r| r.order_purchase_timestamp.and_utc().timestamp())
        .collect();
    let review_days: Vec<Option<i32>> = records
        .iter()
        .map(|r| r.review_creation_date.map(day_number))
        .collect();
    let scores: Vec<Option<i32>> = records
        .iter()
        .map(|r| r.review_score.map(i32::from))
        .collect();
    let prices: Vec<Option<f64>> = records.iter().map(|r| r.price).collect();
    let product_ids: Vec<Option<&str>> = records.iter().map(|r| r.product_id.as_deref()).collect();
    let categories: Vec<Option<&str>> = records
        .iter()
        .map(|r| r.product_category.as_deref())
        .collect();

    DataFrame::new(vec![
        Series::new(columns::CUSTOMER_ID, customer_ids),
        Series::new(columns::CUSTOMER_CITY, cities),
        Series::new(ORDER_DAY, order_days),
        Series::new(ORDER_TS, order_ts),
        Series::new(REVIEW_DAY, review_days),
        Series::new(columns::REVIEW_SCORE, scores),
        Series::new(columns::PRICE, prices),
        Series::new(columns::PRODUCT_ID, product_ids),
        Series::new(columns::PRODUCT_CATEGORY, categories),
    ])
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn order(
        customer_id: &str,
        city: &str,
        purchased: &str,
        price: f64,
        category: &str,
    ) -> OrderRecord {
        let order_purchase_timestamp =
            parse_timestamp(columns::ORDER_PURCHASE_TIMESTAMP, 0, purchased).unwrap();
        OrderRecord {
            customer_id: customer_id.to_string(),
            customer_city: city.to_string(),
            order_purchase_timestamp,
            review_creation_date: Some(order_purchase_timestamp.date()),
            review_score: Some(5),
            price: Some(price),
            product_id: Some(format!("{customer_id}-{purchased}")),
            product_category: Some(category.to_string()),
        }
    }

    /// Six order items from four customers in three cities
    pub(crate) fn sample_table() -> OrderTable {
        let mut rows = vec![
            order("c1", "sao paulo", "2018-01-01 10:00:00", 10.0, "bed_bath_table"),
            order("c1", "sao paulo", "2018-01-05 09:00:00", 20.0, "health_beauty"),
            order("c2", "rio de janeiro", "2018-01-03 12:00:00", 5.0, "bed_bath_table"),
            order("c3", "sao paulo", "2018-01-02 08:30:00", 99.9, "toys"),
            order("c4", "curitiba", "2018-01-04 18:45:00", 15.5, "bed_bath_table"),
            order("c2", "rio de janeiro", "2018-01-03 12:00:00", 7.5, "health_beauty"),
        ];
        let scores = [5, 4, 3, 5, 1, 3];
        for (row, score) in rows.iter_mut().zip(scores) {
            row.review_score = Some(score);
        }
        OrderTable::from_records(rows).unwrap()
    }

    pub(crate) fn empty_table() -> OrderTable {
        OrderTable::from_records(Vec::new()).unwrap()
    }
}
