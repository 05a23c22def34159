//! Ranked summaries over the order table: product categories, customer cities
//! and review scores

use std::cmp::Ordering;

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::data::{columns, OrderTable};
use crate::error::Result;

/// Number of rows shown by the ranked views unless configured otherwise
pub const DEFAULT_TOP_N: usize = 5;

const ORDERS: &str = "orders";
const CUSTOMERS: &str = "customers";
const COUNT: &str = "count";

/// Number of order items sold in one product category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    /// `None` groups the items without a category
    pub category: Option<String>,
    pub orders: u64,
}

/// Category counts ordered by `orders`, highest first
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CategorySummary {
    rows: Vec<CategoryCount>,
}

impl CategorySummary {
    pub fn rows(&self) -> &[CategoryCount] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The `n` best selling categories
    pub fn best_selling(&self, n: usize) -> &[CategoryCount] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// The `n` worst selling categories, lowest count first
    pub fn worst_selling(&self, n: usize) -> Vec<CategoryCount> {
        let mut ascending = self.rows.clone();
        ascending.sort_by_key(|row| row.orders);
        ascending.truncate(n);
        ascending
    }

    /// Sum of all counts; equals the number of rows in the source table
    pub fn total_orders(&self) -> u64 {
        self.rows.iter().map(|row| row.orders).sum()
    }
}

/// Distinct customers living in one city
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityCount {
    pub city: String,
    pub customers: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingCount {
    pub score: u8,
    pub count: u64,
}

/// Review score frequencies ordered by count, highest first
#[derive(Debug, Clone, Serialize)]
pub struct RatingDistribution {
    pub counts: Vec<RatingCount>,
    /// Mean review score; NaN when no row carries a score
    pub mean: f64,
}

impl RatingDistribution {
    pub fn total_ratings(&self) -> u64 {
        self.counts.iter().map(|c| c.count).sum()
    }
}

/// Ascending group key order with the missing key last
fn cmp_group_key(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable descending sort: rows with equal keys keep their current order
pub(crate) fn rank_descending<T, K: Ord>(rows: &mut [T], key: impl Fn(&T) -> K) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

/// Count order items per product category
///
/// # Returns
/// * `CategorySummary` sorted by count descending; ties are ordered by
///   category name, uncategorized rows last
pub fn category_summary(table: &OrderTable) -> Result<CategorySummary> {
    let grouped = table
        .frame()
        .clone()
        .lazy()
        .group_by([col(columns::PRODUCT_CATEGORY)])
        .agg([len().cast(DataType::UInt64).alias(ORDERS)])
        .collect()?;

    let categories = grouped.column(columns::PRODUCT_CATEGORY)?.str()?;
    let orders = grouped.column(ORDERS)?.u64()?;

    let mut rows: Vec<CategoryCount> = categories
        .into_iter()
        .zip(orders)
        .map(|(category, orders)| CategoryCount {
            category: category.map(str::to_string),
            orders: orders.unwrap_or(0),
        })
        .collect();
    rows.sort_by(|a, b| cmp_group_key(a.category.as_deref(), b.category.as_deref()));
    rank_descending(&mut rows, |row| row.orders);

    debug!(categories = rows.len(), "computed category summary");
    Ok(CategorySummary { rows })
}

/// Rank cities by the number of distinct customers
///
/// # Arguments
/// * `table` - Loaded order table
/// * `n` - Maximum number of cities to return
///
/// # Returns
/// * At most `n` cities, highest customer count first
pub fn top_cities(table: &OrderTable, n: usize) -> Result<Vec<CityCount>> {
    let grouped = table
        .frame()
        .clone()
        .lazy()
        .group_by([col(columns::CUSTOMER_CITY)])
        .agg([col(columns::CUSTOMER_ID)
            .n_unique()
            .cast(DataType::UInt64)
            .alias(CUSTOMERS)])
        .collect()?;

    let cities = grouped.column(columns::CUSTOMER_CITY)?.str()?;
    let customers = grouped.column(CUSTOMERS)?.u64()?;

    let mut rows: Vec<CityCount> = cities
        .into_iter()
        .zip(customers)
        .filter_map(|(city, customers)| {
            Some(CityCount {
                city: city?.to_string(),
                customers: customers.unwrap_or(0),
            })
        })
        .collect();
    rows.sort_by(|a, b| a.city.cmp(&b.city));
    rank_descending(&mut rows, |row| row.customers);
    rows.truncate(n);

    debug!(cities = rows.len(), "computed top cities");
    Ok(rows)
}

/// Mean of all present review scores, NaN for a table without scores
pub fn mean_review_score(table: &OrderTable) -> Result<f64> {
    let mean = table
        .frame()
        .clone()
        .lazy()
        .select([col(columns::REVIEW_SCORE).cast(DataType::Float64).mean()])
        .collect()?;

    Ok(mean
        .column(columns::REVIEW_SCORE)?
        .f64()?
        .get(0)
        .unwrap_or(f64::NAN))
}

/// Count how often each review score was given
pub fn rating_distribution(table: &OrderTable) -> Result<RatingDistribution> {
    let grouped = table
        .frame()
        .clone()
        .lazy()
        .filter(col(columns::REVIEW_SCORE).is_not_null())
        .group_by([col(columns::REVIEW_SCORE)])
        .agg([len().cast(DataType::UInt64).alias(COUNT)])
        .collect()?;

    let scores = grouped.column(columns::REVIEW_SCORE)?.i32()?;
    let counts = grouped.column(COUNT)?.u64()?;

    let mut counts: Vec<RatingCount> = scores
        .into_iter()
        .zip(counts)
        .filter_map(|(score, count)| {
            Some(RatingCount {
                score: u8::try_from(score?).ok()?,
                count: count.unwrap_or(0),
            })
        })
        .collect();
    counts.sort_by_key(|c| c.score);
    rank_descending(&mut counts, |c| c.count);

    let mean = mean_review_score(table)?;
    debug!(scores = counts.len(), mean, "computed rating distribution");
    Ok(RatingDistribution { counts, mean })
}
