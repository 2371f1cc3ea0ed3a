//! Truncate and its emptiness probes.

mod common;

use std::time::Duration;

use cqlmap::driver::{Fault, FaultRule};
use cqlmap::proto::ErrorCode;
use cqlmap::TruncateOptions;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_truncate_empties_the_table() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;
    common::seed(&conn, &[(1, "a"), (2, "b")]).await;

    assert!(conn.truncate("test_data").await);
    assert_eq!(cluster.row_count("ks.test_data"), Some(0));

    let stats = conn.take_stats();
    assert_eq!(stats.truncated.call, 1);
    assert_eq!(stats.stored.call, 1);
    assert_eq!(stats.fetched.total(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unacknowledged_truncate_is_confirmed_by_probe() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;
    common::seed(&conn, &[(1, "a"), (2, "b")]).await;

    cluster.inject(FaultRule::new("truncate", Fault::Unacknowledged(ErrorCode::WriteTimeout)).times(1));
    assert!(conn.truncate("test_data").await);

    let stats = conn.take_stats();
    assert_eq!(stats.truncated.call, 1);
    assert_eq!(stats.truncated.bad, 0);
    assert_eq!(stats.stored.timeout, 1);
    assert_eq!(stats.fetched.call, 1);
}

#[tokio::test(start_paused = true)]
async fn test_truncate_of_missing_table_counts_as_bad() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;

    let started = tokio::time::Instant::now();
    assert!(!conn.truncate("no_such_table").await);
    assert!(started.elapsed() >= Duration::from_secs(5));

    let stats = conn.take_stats();
    assert_eq!(stats.truncated.bad, 1);
    assert_eq!(stats.truncated.timeout, 0);
    assert_eq!(stats.truncated.call, 0);
    assert_eq!(stats.stored.bad, 1);
    assert_eq!(stats.fetched.bad, 5);
}

#[tokio::test(start_paused = true)]
async fn test_failed_truncate_with_rows_left() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;
    common::seed(&conn, &[(1, "a")]).await;

    cluster.inject(FaultRule::new("truncate", Fault::Fail(ErrorCode::WriteTimeout, "no quorum".into())));
    let options = TruncateOptions::default()
        .with_retries(2)
        .with_probe_interval(Duration::from_millis(200));
    assert!(!conn.truncate_with("test_data", &options).await);
    assert_eq!(cluster.row_count("ks.test_data"), Some(1));

    let stats = conn.take_stats();
    assert_eq!(stats.truncated.bad, 1);
    assert_eq!(stats.fetched.call, 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_truncate_of_empty_table_reports_success() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;

    // the probe cannot tell an empty table from one that was just truncated
    cluster.inject(FaultRule::new("truncate", Fault::Fail(ErrorCode::WriteTimeout, "no quorum".into())));
    assert!(conn.truncate("test_data").await);
    assert_eq!(conn.take_stats().truncated.call, 1);
}
