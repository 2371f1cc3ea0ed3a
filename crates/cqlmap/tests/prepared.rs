//! Prepared statements with positional arguments.

mod common;

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use cqlmap::proto::BindError;
use cqlmap::{args, ConFetcher, Conn, Error, Fetcher, Null, RefId, RowsFetcher};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_prepare_checks_marker_count() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;

    let stmt = conn
        .prepare_store("insert into test_data (docid, value) values (?, ?)", 2)
        .unwrap();
    assert_eq!(stmt.arity(), 2);

    let err = conn
        .prepare_store("insert into test_data (docid, value) values (?, ?)", 3)
        .unwrap_err();
    assert!(matches!(err, Error::Config(ref msg) if msg.contains("2 markers")));
    assert!(matches!(conn.prepare_store("   ", 0), Err(Error::Config(_))));
    assert!(matches!(
        Conn::disconnected().prepare_store("select ?", 1),
        Err(Error::NotConnected)
    ));
}

#[tokio::test]
async fn test_store_with_arguments() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;

    let insert = conn
        .prepare_store("insert into test_data (docid, value) values (?, ?)", 2)
        .unwrap();
    for (docid, value) in [(1, "a"), (2, "b"), (3, "c")] {
        assert!(insert.store(args![docid, value]).await.unwrap());
    }
    assert!(insert.store(args![4, Null]).await.unwrap());

    let select = conn
        .prepare_store("select value from test_data where docid = ?", 1)
        .unwrap();
    let mut value = Fetcher::<String>::new();
    assert!(select.fetch(args![2], &mut value).await.unwrap());
    assert_eq!(value.value(), "b");

    let mut nullable = Fetcher::<Option<String>>::new();
    assert!(select.fetch(args![4], &mut nullable).await.unwrap());
    assert_eq!(nullable.value(), &None);

    let stats = conn.take_stats();
    assert_eq!(stats.stored.call, 4);
    assert_eq!(stats.fetched.call, 2);
}

#[tokio::test]
async fn test_argument_errors() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;
    let insert = conn
        .prepare_store("insert into test_data (docid, value) values (?, ?)", 2)
        .unwrap();

    let err = insert.store(args![1]).await.unwrap_err();
    assert!(matches!(err, Error::Arity { expected: 2, actual: 1, .. }));

    let err = insert.store(args![1, "a", 3]).await.unwrap_err();
    assert!(matches!(err, Error::Arity { actual: 3, .. }));

    // a type the column rejects is a failed store, not an error
    assert!(!insert.store(args!["one", "a"]).await.unwrap());
    assert_eq!(conn.take_stats().stored.bad, 1);
    assert_eq!(cluster.row_count("ks.test_data"), Some(0));
}

#[tokio::test]
async fn test_encode_failure_names_the_argument() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;
    let insert = conn
        .prepare_store("insert into coll_test_data (docid, int_list) values (?, ?)", 2)
        .unwrap();

    let err = insert.store(args![1, vec![Some(1), None]]).await.unwrap_err();
    match err {
        Error::Bind { index, arity, source, .. } => {
            assert_eq!((index, arity), (1, 2));
            assert_eq!(source, BindError::NullElement);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(conn.take_stats().is_empty());
    assert_eq!(cluster.statements_executed(), 1);
}

#[tokio::test]
async fn test_concurrent_use_of_one_statement() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;
    let insert = Arc::new(
        conn.prepare_store("insert into test_data (docid, value) values (?, ?)", 2)
            .unwrap(),
    );

    let writers: Vec<_> = (0..16)
        .map(|docid: i32| {
            let insert = Arc::clone(&insert);
            tokio::spawn(async move {
                let value = format!("v{}", docid);
                insert.store(args![docid, value]).await.unwrap()
            })
        })
        .collect();
    for writer in writers {
        assert!(writer.await.unwrap());
    }

    let mut values = ConFetcher::<String>::new();
    assert!(values.fetch_from(&conn, "select value from test_data").await);
    let mut got = values.into_items();
    got.sort();
    let mut expected: Vec<String> = (0..16).map(|i| format!("v{}", i)).collect();
    expected.sort();
    assert_eq!(got, expected);
    assert_eq!(conn.take_stats().stored.call, 16);
}

#[tokio::test]
async fn test_scalar_round_trip() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;
    let seen = RefId::time_based();

    let insert = conn
        .prepare_store(
            "insert into scalar_data (docid, big, ratio, score, flag, seen) values (?, ?, ?, ?, ?, ?)",
            6,
        )
        .unwrap();
    assert!(insert
        .store(args![1, 1i64 << 40, 1.25f32, -2.5f64, true, seen])
        .await
        .unwrap());
    assert!(insert
        .store(args![2, i64::MIN, 0.0f32, f64::MAX, false, Null])
        .await
        .unwrap());

    let select = conn
        .prepare_store("select big, ratio, score, flag, seen from scalar_data where docid = ?", 1)
        .unwrap();
    let mut rows = RowsFetcher::<(i64, f32, f64, bool, RefId)>::new();
    assert!(select.fetch(args![1], &mut rows).await.unwrap());
    assert_eq!(rows.rows(), &[(1i64 << 40, 1.25f32, -2.5f64, true, seen)]);
    assert!(rows.rows()[0].4.is_time_based());

    let mut rows = RowsFetcher::<(i64, f32, f64, bool, Option<RefId>)>::new();
    assert!(select.fetch(args![2], &mut rows).await.unwrap());
    assert_eq!(rows.rows(), &[(i64::MIN, 0.0f32, f64::MAX, false, None)]);

    // a random id is not a valid timeuuid
    assert!(!insert
        .store(args![3, 0i64, 0.0f32, 0.0f64, false, RefId::random()])
        .await
        .unwrap());

    let stats = conn.take_stats();
    assert_eq!(stats.stored.call, 2);
    assert_eq!(stats.stored.bad, 1);
    assert_eq!(stats.fetched.call, 2);
}

#[tokio::test]
async fn test_collection_shapes_round_trip() {
    let cluster = common::cluster();
    let conn = common::connect(&cluster).await;

    let tags: HashSet<String> = ["y", "x", "y"].iter().map(|s| s.to_string()).collect();
    let weights: HashMap<String, f64> = [("k".to_string(), 1.5), ("j".to_string(), -0.5)].into();
    let queue: VecDeque<i32> = VecDeque::from(vec![3, 1, 3]);
    let names: BTreeMap<i32, String> = [(2, "two".to_string()), (1, "one".to_string())].into();

    let insert = conn
        .prepare_store(
            "insert into shape_data (docid, tags, weights, queue, names) values (?, ?, ?, ?, ?)",
            5,
        )
        .unwrap();
    assert!(insert
        .store(args![1, tags, weights, queue, names])
        .await
        .unwrap());
    assert!(insert
        .store(args![2, HashSet::<String>::new(), Null, VecDeque::<i32>::new(), Null])
        .await
        .unwrap());

    let select = conn
        .prepare_store("select tags, weights, queue, names from shape_data where docid = ?", 1)
        .unwrap();
    type Shapes = (
        HashSet<String>,
        BTreeMap<String, f64>,
        VecDeque<i32>,
        HashMap<i32, String>,
    );
    let mut rows = RowsFetcher::<Shapes>::new();
    assert!(select.fetch(args![1], &mut rows).await.unwrap());
    let (got_tags, got_weights, got_queue, got_names) = rows.into_rows().remove(0);
    assert_eq!(got_tags, tags);
    assert_eq!(got_weights, weights.into_iter().collect::<BTreeMap<_, _>>());
    assert_eq!(got_queue, queue);
    assert_eq!(got_names, names.into_iter().collect::<HashMap<_, _>>());

    let mut rows = RowsFetcher::<(Option<HashSet<String>>, Option<BTreeMap<String, f64>>)>::new();
    let select = conn
        .prepare_store("select tags, weights from shape_data where docid = ?", 1)
        .unwrap();
    assert!(select.fetch(args![2], &mut rows).await.unwrap());
    assert_eq!(rows.rows().len(), 1);
    assert!(rows.rows()[0].1.is_none());
}
