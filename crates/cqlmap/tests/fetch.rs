//! Fetching rows into typed consumers.

mod common;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;

use cqlmap::proto::Decimal;
use cqlmap::{
    args, consumer_fn, Blob, ConFetcher, Fetcher, Outcome, RefId, RowView, RowsFetcher,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_fetch_single_value() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;
    common::seed(&conn, &[(1, "a"), (2, "b")]).await;

    let mut value = Fetcher::<String>::new();
    assert!(value.fetch_from(&conn, "select value from test_data where docid = 2").await);
    assert_eq!(value.value(), "b");

    // no row: the query succeeds but nothing was set
    let mut missing = Fetcher::<String>::new();
    assert!(!missing.fetch_from(&conn, "select value from test_data where docid = 42").await);
    assert!(!missing.was_set());

    let stats = conn.take_stats();
    assert_eq!(stats.fetched.call, 2);
    assert_eq!(stats.fetched.bad, 0);
}

#[tokio::test]
async fn test_con_fetcher_collects_matching_rows() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;
    common::seed(&conn, &[(1, "a"), (2, "b"), (3, "c")]).await;

    let mut values = ConFetcher::<String, Vec<String>>::new();
    assert!(values.fetch_from(&conn, "select value from test_data where docid in (1, 2, 5)").await);
    assert_eq!(values.len(), 2);
    let mut got = values.items().clone();
    got.sort();
    assert_eq!(got, vec!["a".to_string(), "b".to_string()]);

    // fetching again replaces, not appends
    assert!(values.fetch_from(&conn, "select value from test_data where docid in (9, 10)").await);
    assert!(values.is_empty());

    let mut ids = ConFetcher::<i32, BTreeSet<i32>>::new();
    assert!(ids.fetch_from(&conn, "select docid from test_data").await);
    assert_eq!(ids.into_items(), BTreeSet::from([1, 2, 3]));
}

#[tokio::test]
async fn test_type_mismatch_fails_the_fetch() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;
    common::seed(&conn, &[(1, "a")]).await;

    let mut wrong = Fetcher::<i32>::new();
    let outcome = conn
        .execute("select value from test_data where docid = 1", &mut wrong)
        .await;
    assert_eq!(outcome, Outcome::Aborted { rows: 0 });
    assert_eq!(*wrong.value(), 0);

    // the query itself succeeded
    assert_eq!(conn.take_stats().fetched.call, 1);
}

#[tokio::test]
async fn test_null_columns() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;
    assert!(conn.store("insert into test_data (docid) values (7)").await);

    let mut required = Fetcher::<String>::new();
    assert!(!required.fetch_from(&conn, "select value from test_data where docid = 7").await);

    let mut optional = Fetcher::<String>::optional();
    assert!(optional.fetch_from(&conn, "select value from test_data where docid = 7").await);
    assert_eq!(optional.value(), "");

    let mut nullable = Fetcher::<Option<String>>::new();
    assert!(nullable.fetch_from(&conn, "select value from test_data where docid = 7").await);
    assert_eq!(nullable.into_value(), None);
}

#[tokio::test]
async fn test_collections_round_trip() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;

    let insert = conn
        .prepare_store(
            "insert into coll_test_data (docid, int_list, int_set, int_map) values (?, ?, ?, ?)",
            4,
        )
        .unwrap();
    let map = BTreeMap::from([(1, 2), (2, 4), (4, 8), (8, 16)]);
    assert!(insert
        .store(args![1, vec![3, 1, 3], BTreeSet::from([3, 1]), map])
        .await
        .unwrap());

    let mut list = Fetcher::<Vec<i32>>::new();
    assert!(list.fetch_from(&conn, "select int_list from coll_test_data where docid = 1").await);
    assert_eq!(list.value(), &vec![3, 1, 3]);

    let mut set = Fetcher::<BTreeSet<i32>>::new();
    assert!(set.fetch_from(&conn, "select int_set from coll_test_data where docid = 1").await);
    assert_eq!(set.into_value(), BTreeSet::from([1, 3]));

    let mut fetched = Fetcher::<HashMap<i32, i32>>::new();
    assert!(fetched.fetch_from(&conn, "select int_map from coll_test_data where docid = 1").await);
    assert_eq!(fetched.into_value(), HashMap::from([(1, 2), (2, 4), (4, 8), (8, 16)]));
}

#[tokio::test]
async fn test_rows_as_tuples_and_closures() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;
    for (id, value, flag) in [(1, 10, true), (2, 20, false), (3, 30, true)] {
        let query = format!(
            "insert into other_test_data (docid, value, flag) values ({}, {}, {})",
            id, value, flag
        );
        assert!(conn.store(query).await);
    }

    let mut rows = RowsFetcher::<(i32, i32, bool)>::new();
    assert!(conn
        .fetch("select docid, value, flag from other_test_data", &mut rows)
        .await);
    assert_eq!(rows.rows(), &[(1, 10, true), (2, 20, false), (3, 30, true)]);

    let mut flagged = Vec::new();
    let mut consumer = consumer_fn(|row: &RowView<'_>| {
        if row.get_by_name::<bool>("flag") == Some(true) {
            flagged.extend(row.get::<i32>(0));
        }
        true
    });
    assert!(conn
        .fetch("select docid, flag from other_test_data", &mut consumer)
        .await);
    drop(consumer);
    assert_eq!(flagged, vec![1, 3]);

    // stop after the first row
    let mut first_only = consumer_fn(|_: &RowView<'_>| false);
    assert_eq!(
        conn.execute("select docid from other_test_data", &mut first_only).await,
        Outcome::Aborted { rows: 0 }
    );
}

#[tokio::test]
async fn test_scalar_types() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;

    let id = RefId::random();
    let price: Decimal = "12.50".parse().unwrap();
    let addr: IpAddr = "10.0.0.7".parse().unwrap();
    let insert = conn
        .prepare_store("insert into blob_data (id, payload, price, addr) values (?, ?, ?, ?)", 4)
        .unwrap();
    assert!(insert
        .store(args![id, Blob::new(vec![0xde, 0xad]), price.clone(), addr])
        .await
        .unwrap());

    let mut rows = RowsFetcher::<(RefId, Blob, Decimal, IpAddr)>::new();
    let query = format!("select id, payload, price, addr from blob_data where id = {}", id);
    assert!(conn.fetch(query, &mut rows).await);
    let (got_id, payload, got_price, got_addr) = rows.into_rows().remove(0);
    assert_eq!(got_id, id);
    assert_eq!(&*payload, &[0xde, 0xad]);
    assert_eq!(got_price, price);
    assert_eq!(got_addr, addr);
}

#[tokio::test]
async fn test_invalid_query_counts_as_bad() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;

    let mut values = ConFetcher::<String>::new();
    assert!(!values.fetch_from(&conn, "select value from no_such_table").await);
    assert!(!values.fetch_from(&conn, "select value from test_data where value = 'a'").await);

    let stats = conn.take_stats();
    assert_eq!(stats.fetched.bad, 2);
    assert_eq!(stats.fetched.call, 0);
}
