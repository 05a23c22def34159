//! Error types shared by the loader, the aggregations and the chart writer

use std::path::PathBuf;

use plotters::drawing::DrawingAreaErrorKind;
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    /// The input file does not exist or cannot be opened.
    #[error("cannot read input file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A column of the order schema is absent from the input header.
    #[error("missing expected column: {0}")]
    MissingColumn(String),

    /// A cell could not be converted to its schema type.
    #[error("invalid value {value:?} in column {column} at row {row}")]
    InvalidValue {
        column: &'static str,
        row: usize,
        value: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chart rendering error: {0}")]
    Chart(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl<E> From<DrawingAreaErrorKind<E>> for DashboardError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        DashboardError::Chart(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
