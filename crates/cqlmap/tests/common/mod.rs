//! Shared fixtures: an in-process cluster with the test schema.

#![allow(dead_code)]

use cqlmap::driver::MemoryCluster;
use cqlmap::{Conn, ConnConfig};

pub const SCHEMA: &[&str] = &[
    "create table ks.test_data (docid int primary key, value text)",
    "create table ks.other_test_data (docid int primary key, value int, flag boolean)",
    "create table ks.coll_test_data (docid int primary key, int_list list<int>, int_set set<int>, int_map map<int, int>)",
    "create table ks.event_log (id timeuuid primary key, note text)",
    "create table ks.blob_data (id uuid primary key, payload blob, price decimal, addr inet)",
    "create table ks.scalar_data (docid int primary key, big bigint, ratio float, score double, flag boolean, seen timeuuid)",
    "create table ks.shape_data (docid int primary key, tags set<text>, weights map<text, double>, queue list<int>, names map<int, text>)",
];

/// Route library logs to the test output, once per binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cqlmap=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn cluster() -> MemoryCluster {
    init_tracing();
    let cluster = MemoryCluster::new();
    cluster.create_keyspace("ks");
    for ddl in SCHEMA {
        cluster.execute_cql(ddl).expect("schema should apply");
    }
    cluster
}

pub fn config() -> ConnConfig {
    ConnConfig::localhost().with_keyspace("ks")
}

/// A connection on `ks` with the counters cleared after `USE`.
pub async fn connect(cluster: &MemoryCluster) -> Conn {
    let conn = Conn::connect(config(), cluster).await.expect("connect");
    conn.take_stats();
    conn
}

/// Insert `(docid, value)` rows into `test_data`.
pub async fn seed(conn: &Conn, rows: &[(i32, &str)]) {
    for (docid, value) in rows {
        let query = format!(
            "insert into test_data (docid, value) values ({}, {})",
            docid,
            cqlmap::util::quote(value)
        );
        assert!(conn.store(query).await);
    }
    conn.take_stats();
}
