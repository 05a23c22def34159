//! orderlens: descriptive views over an e-commerce order table
//!
//! Loads one order file, then derives ranked summaries (top customer cities,
//! best and worst selling categories, review-score distribution) and an RFM
//! (Recency, Frequency, Monetary) table per customer.

pub mod aggregate;
pub mod cli;
pub mod data;
pub mod error;
pub mod report;
pub mod rfm;
pub mod viz;

// Re-export public items for easier access
pub use aggregate::{
    category_summary, mean_review_score, rating_distribution, top_cities, CategoryCount,
    CategorySummary, CityCount, RatingCount, RatingDistribution, DEFAULT_TOP_N,
};
pub use cli::{Args, OutputFormat};
pub use data::{load_orders, OrderRecord, OrderTable};
pub use error::{DashboardError, Result};
pub use report::{Dashboard, DashboardOptions};
pub use rfm::{compute_rfm, FrequencyBasis, RfmRecord, RfmTable};
pub use viz::generate_dashboard_charts;
