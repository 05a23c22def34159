//! Dashboard assembly and text rendering

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::aggregate::{
    category_summary, rating_distribution, top_cities, CategoryCount, CityCount,
    RatingDistribution, DEFAULT_TOP_N,
};
use crate::data::OrderTable;
use crate::error::{DashboardError, Result};
use crate::rfm::{compute_rfm, FrequencyBasis, RfmRecord};

pub const DASHBOARD_TITLE: &str = "Brazilian Public Dataset";
const UNCATEGORIZED: &str = "(uncategorized)";

/// Settings for one render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardOptions {
    /// Rows shown by every ranked view
    pub top_n: usize,
    pub frequency_basis: FrequencyBasis,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            frequency_basis: FrequencyBasis::default(),
        }
    }
}

/// Every view of the dashboard, computed from one order table
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub title: String,
    pub total_orders: usize,
    pub total_customers: usize,
    /// Latest purchase date of the table; recency is measured against it
    pub reference_date: Option<NaiveDate>,
    pub top_cities: Vec<CityCount>,
    pub best_selling: Vec<CategoryCount>,
    pub worst_selling: Vec<CategoryCount>,
    pub ratings: RatingDistribution,
    pub frequency_basis: FrequencyBasis,
    pub most_recent: Vec<RfmRecord>,
    pub most_frequent: Vec<RfmRecord>,
    pub highest_monetary: Vec<RfmRecord>,
}

impl Dashboard {
    /// Compute all views
    ///
    /// # Arguments
    /// * `table` - Loaded order table
    /// * `options` - Ranking length and RFM frequency basis
    pub fn build(table: &OrderTable, options: &DashboardOptions) -> Result<Self> {
        if options.top_n == 0 {
            return Err(DashboardError::InvalidArgument(
                "top_n must be at least 1".to_string(),
            ));
        }
        let n = options.top_n;

        let categories = category_summary(table)?;
        let rfm = compute_rfm(table, options.frequency_basis)?;

        let dashboard = Self {
            title: DASHBOARD_TITLE.to_string(),
            total_orders: table.len(),
            total_customers: rfm.len(),
            reference_date: rfm.reference_date(),
            top_cities: top_cities(table, n)?,
            best_selling: categories.best_selling(n).to_vec(),
            worst_selling: categories.worst_selling(n),
            ratings: rating_distribution(table)?,
            frequency_basis: options.frequency_basis,
            most_recent: rfm.most_recent(n),
            most_frequent: rfm.most_frequent(n),
            highest_monetary: rfm.highest_monetary(n),
        };

        info!(
            orders = dashboard.total_orders,
            customers = dashboard.total_customers,
            "dashboard built"
        );
        Ok(dashboard)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Display name of a category row
pub fn category_label(row: &CategoryCount) -> &str {
    row.category.as_deref().unwrap_or(UNCATEGORIZED)
}

fn frequency_label(basis: FrequencyBasis) -> &'static str {
    match basis {
        FrequencyBasis::ReviewDates => "distinct review dates",
        FrequencyBasis::PurchaseTimestamps => "distinct purchase timestamps",
    }
}

fn write_empty(f: &mut fmt::Formatter<'_>, is_empty: bool) -> fmt::Result {
    if is_empty {
        writeln!(f, "  (no data)")?;
    }
    Ok(())
}

fn write_categories(
    f: &mut fmt::Formatter<'_>,
    heading: &str,
    rows: &[CategoryCount],
) -> fmt::Result {
    writeln!(f, "  {heading}")?;
    for row in rows {
        writeln!(f, "    {:<40} {:>8}", category_label(row), row.orders)?;
    }
    write_empty(f, rows.is_empty())
}

fn write_customers<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    heading: &str,
    rows: &[RfmRecord],
    value: impl Fn(&RfmRecord) -> T,
) -> fmt::Result {
    writeln!(f, "  {heading}")?;
    for row in rows {
        writeln!(f, "    {:<34} {:>12}", row.customer_id, value(row))?;
    }
    write_empty(f, rows.is_empty())
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.title)?;
        writeln!(f, "Order items: {}", self.total_orders)?;
        writeln!(f, "Customers:   {}", self.total_customers)?;
        match self.reference_date {
            Some(date) => writeln!(f, "Latest order: {date}")?,
            None => writeln!(f, "Latest order: NaN")?,
        }

        writeln!(f, "\n--- Top Customer Cities ---")?;
        for (rank, row) in self.top_cities.iter().enumerate() {
            writeln!(f, "  {:>2}. {:<36} {:>8}", rank + 1, row.city, row.customers)?;
        }
        write_empty(f, self.top_cities.is_empty())?;

        writeln!(f, "\n--- Best & Worst Performing Product ---")?;
        write_categories(f, "products with the highest sales", &self.best_selling)?;
        write_categories(f, "products with the lowest sales", &self.worst_selling)?;

        writeln!(f, "\n--- Rating Customer By Service ---")?;
        writeln!(f, "  Rating Average : {:.2}", self.ratings.mean)?;
        for rating in &self.ratings.counts {
            writeln!(f, "    {:>2} {:>10}", rating.score, rating.count)?;
        }
        write_empty(f, self.ratings.counts.is_empty())?;

        writeln!(
            f,
            "\n--- RFM Best Value (frequency: {}) ---",
            frequency_label(self.frequency_basis)
        )?;
        write_customers(f, "By Recency (days)", &self.most_recent, |r| r.recency)?;
        write_customers(f, "By Frequency", &self.most_frequent, |r| r.frequency)?;
        write_customers(f, "By Monetary", &self.highest_monetary, |r| {
            format!("{:.2}", r.monetary)
        })
    }
}
