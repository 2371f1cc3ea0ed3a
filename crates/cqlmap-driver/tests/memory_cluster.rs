//! Sessions against the in-process cluster.

use std::time::Duration;

use cqlmap_driver::{
    ClusterSettings, Connector, Credentials, Fault, FaultRule, MemoryCluster, Session,
};
use cqlmap_proto::{ErrorCode, Statement, Value};

const WAIT: Duration = Duration::from_secs(5);

fn cluster() -> MemoryCluster {
    let cluster = MemoryCluster::new();
    cluster.create_keyspace("ks");
    cluster
        .execute_cql("create table ks.test_data (docid int primary key, value text)")
        .unwrap();
    cluster
}

async fn run(session: &dyn Session, query: &str) -> cqlmap_driver::ExecResult {
    session
        .execute(Statement::simple(query))
        .wait_timed(WAIT)
        .await
        .expect("request should settle")
}

#[tokio::test]
async fn test_connect_use_and_query() {
    let cluster = cluster();
    let session = cluster
        .connect(&ClusterSettings::new(["127.0.0.1"]))
        .await
        .unwrap();

    run(session.as_ref(), "use ks").await.unwrap();
    run(session.as_ref(), "insert into test_data (docid, value) values (1, 'one')")
        .await
        .unwrap();

    let mut stmt = Statement::new("select value from test_data where docid = ?", 1);
    stmt.bind(0, Value::Int(1)).unwrap();
    let rs = session.execute(stmt).wait_timed(WAIT).await.unwrap().unwrap();
    assert_eq!(rs.first_row().unwrap().get(0), Some(&Value::Text("one".into())));
    assert_eq!(cluster.row_count("ks.test_data"), Some(1));
    assert_eq!(cluster.statements_executed(), 3);
}

#[tokio::test]
async fn test_connect_rejects_unknown_hosts_and_bad_credentials() {
    let cluster = cluster().require_credentials(Credentials::new("cassandra", "secret"));

    let err = cluster
        .connect(&ClusterSettings::new(["10.1.2.3"]))
        .await
        .err()
        .unwrap();
    assert_eq!(err.code, ErrorCode::NoHostsAvailable);

    let settings = ClusterSettings::new(["127.0.0.1"])
        .with_credentials(Credentials::new("cassandra", "wrong"));
    let err = cluster.connect(&settings).await.err().unwrap();
    assert_eq!(err.code, ErrorCode::BadCredentials);
    assert!(err.message.contains("cassandra"));

    let settings = ClusterSettings::new(["127.0.0.1"])
        .with_credentials(Credentials::new("cassandra", "secret"));
    assert!(cluster.connect(&settings).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_delayed_response_misses_deadline_but_still_applies() {
    let cluster = cluster();
    cluster.inject(FaultRule::new("insert", Fault::Delay(Duration::from_secs(10))).times(1));
    let session = cluster.session(&ClusterSettings::new(["127.0.0.1"]));

    let mut response =
        session.execute(Statement::simple("insert into ks.test_data (docid, value) values (2, 'x')"));
    assert!(response.wait_timed(Duration::from_secs(1)).await.is_none());
    assert!(matches!(response.wait_timed(Duration::from_secs(20)).await, Some(Ok(_))));
    assert_eq!(cluster.row_count("ks.test_data"), Some(1));
}

#[tokio::test]
async fn test_faults_fail_or_lose_acknowledgement() {
    let cluster = cluster();
    let session = cluster.session(&ClusterSettings::new(["127.0.0.1"]));

    cluster.inject(FaultRule::new("values (3", Fault::Fail(ErrorCode::Overloaded, "busy".into())));
    let err = run(&session, "insert into ks.test_data (docid, value) values (3, 'x')")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Overloaded);
    assert_eq!(cluster.row_count("ks.test_data"), Some(0));

    cluster.clear_faults();
    cluster.inject(FaultRule::new("values (4", Fault::Unacknowledged(ErrorCode::WriteTimeout)));
    let err = run(&session, "insert into ks.test_data (docid, value) values (4, 'x')")
        .await
        .unwrap_err();
    assert!(err.code.is_server_timeout());
    assert_eq!(cluster.row_count("ks.test_data"), Some(1));
}

#[tokio::test]
async fn test_dropped_row_surfaces_as_missing() {
    let cluster = cluster();
    cluster
        .execute_cql("insert into ks.test_data (docid, value) values (1, 'a')")
        .unwrap();
    cluster
        .execute_cql("insert into ks.test_data (docid, value) values (2, 'b')")
        .unwrap();
    cluster.inject(FaultRule::new("select", Fault::DropRow(0)));
    let session = cluster.session(&ClusterSettings::new(["127.0.0.1"]));

    let rs = run(&session, "select value from ks.test_data").await.unwrap();
    let rows: Vec<_> = rs.rows().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].is_err());
    assert!(rows[1].is_ok());
}

#[tokio::test]
async fn test_queue_limit_and_close() {
    let cluster = cluster();
    cluster.inject(FaultRule::new("select", Fault::Delay(Duration::from_millis(50))));
    let session =
        cluster.session(&ClusterSettings::new(["127.0.0.1"]).with_queue_size_io(1));

    let mut first = session.execute(Statement::simple("select * from ks.test_data"));
    let err = run(&session, "select * from ks.test_data").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RequestQueueFull);

    session.close().await;
    assert_eq!(session.in_flight(), 0);
    assert!(first.wait_timed(WAIT).await.unwrap().is_ok());

    let err = run(&session, "select * from ks.test_data").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SessionClosed);
}
