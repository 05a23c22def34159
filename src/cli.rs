//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::aggregate::DEFAULT_TOP_N;
use crate::report::DashboardOptions;
use crate::rfm::FrequencyBasis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain-text report
    Text,
    /// Pretty-printed JSON document
    Json,
}

/// Descriptive dashboard over an e-commerce order table
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, env = "ORDERLENS_INPUT", default_value = "all_data.csv")]
    pub input: PathBuf,

    /// Directory the PNG charts are written to
    #[arg(short, long, default_value = "charts")]
    pub output_dir: PathBuf,

    /// Number of rows shown in every ranked view
    #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_N, value_parser = parse_top_n)]
    pub top: usize,

    /// What the RFM frequency counts
    #[arg(long, value_enum, default_value_t = FrequencyBasis::ReviewDates)]
    pub frequency: FrequencyBasis,

    /// Report format written to stdout
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn options(&self) -> DashboardOptions {
        DashboardOptions {
            top_n: self.top,
            frequency_basis: self.frequency,
        }
    }
}

fn parse_top_n(value: &str) -> Result<usize, String> {
    let n: usize = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number: {value}"))?;
    if n == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["orderlens", "--input", "orders.csv"]).unwrap();

        assert_eq!(args.input, PathBuf::from("orders.csv"));
        assert_eq!(args.output_dir, PathBuf::from("charts"));
        assert_eq!(args.top, 5);
        assert_eq!(args.frequency, FrequencyBasis::ReviewDates);
        assert_eq!(args.format, OutputFormat::Text);
        assert!(!args.no_charts);
        assert_eq!(args.options(), DashboardOptions::default());
    }

    #[test]
    fn test_parse_options() {
        let args = Args::try_parse_from([
            "orderlens",
            "-i",
            "orders.csv",
            "-n",
            "3",
            "--frequency",
            "purchase-timestamps",
            "--format",
            "json",
            "--no-charts",
        ])
        .unwrap();

        let options = args.options();
        assert_eq!(options.top_n, 3);
        assert_eq!(options.frequency_basis, FrequencyBasis::PurchaseTimestamps);
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.no_charts);
    }

    #[test]
    fn test_parse_top_n() {
        assert_eq!(parse_top_n("10"), Ok(10));
        assert!(parse_top_n("0").is_err());
        assert!(parse_top_n("five").is_err());
        assert!(Args::try_parse_from(["orderlens", "--top", "0"]).is_err());
    }
}
