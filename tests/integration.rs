//! Integration tests for orderlens

use std::io::Write;

use orderlens::{
    category_summary, compute_rfm, load_orders, rating_distribution, top_cities, Dashboard,
    DashboardError, DashboardOptions, FrequencyBasis,
};
use tempfile::NamedTempFile;

/// Create a test CSV file laid out like the merged order export
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "order_id,customer_id,customer_unique_id,customer_city,customer_state,\
         order_purchase_timestamp,review_score,review_creation_date,product_id,price,\
         product_category_name_english"
    )
    .unwrap();

    // Customer A - two orders, day 1 and day 5
    let rows = [
        "o1,A,ua,sao paulo,SP,2018-01-01 08:10:00,5,2018-01-03 00:00:00,p1,10.0,bed_bath_table",
        "o2,A,ua,sao paulo,SP,2018-01-05 19:45:12,4,2018-01-08 00:00:00,p2,20.0,health_beauty",
        // Customer B - one order on day 3
        "o3,B,ub,rio de janeiro,RJ,2018-01-03 11:00:00,3,2018-01-06 00:00:00,p3,5.0,bed_bath_table",
        // Customer C - one order with two items, no category on the second
        "o4,C,uc,sao paulo,SP,2018-01-02 16:20:00,1,2018-01-04 00:00:00,p4,99.9,toys",
        "o4,C,uc,sao paulo,SP,2018-01-02 16:20:00,1,2018-01-04 00:00:00,p5,0.5,",
        // Customer D - order without a review
        "o5,D,ud,curitiba,PR,2018-01-04 10:00:00,,,p6,15.5,bed_bath_table",
    ];
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }

    file
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv();

    let table = load_orders(test_file.path()).unwrap();
    assert_eq!(table.len(), 6);

    let dashboard = Dashboard::build(&table, &DashboardOptions::default()).unwrap();
    assert_eq!(dashboard.total_orders, 6);
    assert_eq!(dashboard.total_customers, 4);
    assert_eq!(dashboard.top_cities[0].city, "sao paulo");
    assert_eq!(dashboard.best_selling[0].category.as_deref(), Some("bed_bath_table"));

    let report = dashboard.to_string();
    assert!(report.contains("(uncategorized)"));
    assert!(report.contains("Latest order: 2018-01-05"));
}

#[test]
fn test_category_counts_sum_to_rows() {
    let test_file = create_test_csv();
    let table = load_orders(test_file.path()).unwrap();

    let summary = category_summary(&table).unwrap();
    assert_eq!(summary.total_orders(), table.len() as u64);
    assert_eq!(summary.rows()[0].orders, 3);
}

#[test]
fn test_top_cities_length_and_order() {
    let test_file = create_test_csv();
    let table = load_orders(test_file.path()).unwrap();

    let cities = top_cities(&table, 5).unwrap();
    // Three distinct cities, fewer than five
    assert_eq!(cities.len(), 3);
    assert!(cities.windows(2).all(|w| w[0].customers >= w[1].customers));
    assert_eq!(cities[0].customers, 2);
}

#[test]
fn test_rfm_computation() {
    let test_file = create_test_csv();
    let table = load_orders(test_file.path()).unwrap();

    let rfm = compute_rfm(&table, FrequencyBasis::ReviewDates).unwrap();
    assert!(rfm.records().iter().all(|r| r.recency >= 0));

    let a = rfm.get("A").unwrap();
    assert_eq!(a.recency, 0);
    assert_eq!(a.monetary, 30.0);
    assert_eq!(a.frequency, 2);

    let b = rfm.get("B").unwrap();
    assert_eq!(b.recency, 2);
    assert_eq!(b.monetary, 5.0);

    // Two items of one order share a review date
    assert_eq!(rfm.get("C").unwrap().frequency, 1);
    // No review, no counted date
    assert_eq!(rfm.get("D").unwrap().frequency, 0);

    let by_orders = compute_rfm(&table, FrequencyBasis::PurchaseTimestamps).unwrap();
    assert_eq!(by_orders.get("D").unwrap().frequency, 1);
}

#[test]
fn test_rating_distribution() {
    let test_file = create_test_csv();
    let table = load_orders(test_file.path()).unwrap();

    let ratings = rating_distribution(&table).unwrap();
    assert_eq!(ratings.total_ratings(), 5);
    assert_eq!(ratings.counts[0].score, 1);
    assert_eq!(ratings.counts[0].count, 2);
    assert!((ratings.mean - 14.0 / 5.0).abs() < 1e-9);
}

#[test]
fn test_empty_input() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "customer_id,customer_city,order_purchase_timestamp,review_creation_date,\
         review_score,price,product_id,product_category_name_english"
    )
    .unwrap();

    let table = load_orders(file.path()).unwrap();
    assert!(table.is_empty());

    let dashboard = Dashboard::build(&table, &DashboardOptions::default()).unwrap();
    assert!(dashboard.top_cities.is_empty());
    assert!(dashboard.best_selling.is_empty());
    assert!(dashboard.most_recent.is_empty());
    assert!(dashboard.ratings.mean.is_nan());
    assert_eq!(dashboard.reference_date, None);
}

#[test]
fn test_error_handling() {
    assert!(matches!(
        load_orders("/nonexistent/all_data.csv"),
        Err(DashboardError::Unreadable { .. })
    ));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "customer_id,customer_city,order_purchase_timestamp").unwrap();
    writeln!(file, "A,sao paulo,2018-01-01 08:10:00").unwrap();

    let err = load_orders(file.path()).unwrap_err();
    assert!(matches!(
        err,
        DashboardError::MissingColumn(ref name) if name == "review_creation_date"
    ));
    assert!(err.to_string().contains("review_creation_date"));
}

#[test]
fn test_repeated_runs_are_identical() {
    let test_file = create_test_csv();
    let table = load_orders(test_file.path()).unwrap();

    let first = Dashboard::build(&table, &DashboardOptions::default()).unwrap();
    let second = Dashboard::build(&table, &DashboardOptions::default()).unwrap();
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}
