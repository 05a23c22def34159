//! RFM (Recency, Frequency, Monetary) feature computation using Polars

use chrono::NaiveDate;
use clap::ValueEnum;
use itertools::izip;
use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::aggregate::rank_descending;
use crate::data::{columns, date_from_day_number, OrderTable, ORDER_DAY, ORDER_TS, REVIEW_DAY};
use crate::error::Result;

const LAST_ORDER_DAY: &str = "last_order_day";
const FREQUENCY: &str = "frequency";
const MONETARY: &str = "monetary";

/// What a customer's frequency counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FrequencyBasis {
    /// Distinct review creation dates. Every order gets one review, so this
    /// stands in for the order count when order ids are not available.
    #[default]
    ReviewDates,
    /// Distinct purchase timestamps. Items of one order share a timestamp.
    PurchaseTimestamps,
}

/// RFM values of one customer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmRecord {
    pub customer_id: String,
    pub last_order_date: NaiveDate,
    pub frequency: u64,
    /// Sum of item prices; missing prices count as zero
    pub monetary: f64,
    /// Days between the latest order in the table and this customer's last order
    pub recency: i64,
}

/// One `RfmRecord` per customer, ordered by customer id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmTable {
    records: Vec<RfmRecord>,
    reference_date: Option<NaiveDate>,
    basis: FrequencyBasis,
}

impl RfmTable {
    pub fn records(&self) -> &[RfmRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Latest purchase date in the whole table; `None` when it is empty
    pub fn reference_date(&self) -> Option<NaiveDate> {
        self.reference_date
    }

    pub fn basis(&self) -> FrequencyBasis {
        self.basis
    }

    pub fn get(&self, customer_id: &str) -> Option<&RfmRecord> {
        self.records.iter().find(|r| r.customer_id == customer_id)
    }

    /// The `n` customers with the smallest recency
    pub fn most_recent(&self, n: usize) -> Vec<RfmRecord> {
        let mut sorted = self.records.clone();
        sorted.sort_by_key(|r| r.recency);
        sorted.truncate(n);
        sorted
    }

    pub fn most_frequent(&self, n: usize) -> Vec<RfmRecord> {
        let mut sorted = self.records.clone();
        rank_descending(&mut sorted, |r| r.frequency);
        sorted.truncate(n);
        sorted
    }

    pub fn highest_monetary(&self, n: usize) -> Vec<RfmRecord> {
        let mut sorted = self.records.clone();
        sorted.sort_by(|a, b| b.monetary.total_cmp(&a.monetary));
        sorted.truncate(n);
        sorted
    }
}

/// Compute the RFM table of every customer
///
/// # Arguments
/// * `table` - Loaded order table
/// * `basis` - What the frequency column counts
///
/// # Returns
/// * `RfmTable` whose recency is measured against the latest purchase date
///   of the whole table
pub fn compute_rfm(table: &OrderTable, basis: FrequencyBasis) -> Result<RfmTable> {
    let frequency = match basis {
        FrequencyBasis::ReviewDates => col(REVIEW_DAY).drop_nulls().n_unique(),
        FrequencyBasis::PurchaseTimestamps => col(ORDER_TS).n_unique(),
    };

    let grouped = table
        .frame()
        .clone()
        .lazy()
        .group_by([col(columns::CUSTOMER_ID)])
        .agg([
            // Recency: last purchase day
            col(ORDER_DAY).max().alias(LAST_ORDER_DAY),
            frequency.cast(DataType::UInt64).alias(FREQUENCY),
            // Monetary: total spending
            col(columns::PRICE)
                .sum()
                .cast(DataType::Float64)
                .alias(MONETARY),
        ])
        .collect()?;

    let reference_day = table
        .frame()
        .clone()
        .lazy()
        .select([col(ORDER_DAY).max()])
        .collect()?
        .column(ORDER_DAY)?
        .i32()?
        .get(0);

    let mut records: Vec<RfmRecord> = match reference_day {
        Some(reference_day) => izip!(
            grouped.column(columns::CUSTOMER_ID)?.str()?,
            grouped.column(LAST_ORDER_DAY)?.i32()?,
            grouped.column(FREQUENCY)?.u64()?,
            grouped.column(MONETARY)?.f64()?,
        )
        // Customer id and purchase day are non-null for every loaded row
        .filter_map(|(customer_id, last_day, frequency, monetary)| {
            let last_day = last_day?;
            Some(RfmRecord {
                customer_id: customer_id?.to_string(),
                last_order_date: date_from_day_number(last_day)?,
                frequency: frequency.unwrap_or(0),
                monetary: monetary.unwrap_or(0.0),
                recency: i64::from(reference_day) - i64::from(last_day),
            })
        })
        .collect(),
        None => Vec::new(),
    };
    records.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));

    let reference_date = reference_day.and_then(date_from_day_number);
    debug!(customers = records.len(), ?reference_date, ?basis, "computed RFM table");

    Ok(RfmTable {
        records,
        reference_date,
        basis,
    })
}
