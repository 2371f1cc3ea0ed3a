//! cqlmap driver - the seam between the mapping layer and a cluster.
//!
//! A driver opens a [`Session`] through a [`Connector`]; every request
//! submitted on a session returns a [`ResponseFuture`] that can be waited on
//! with a deadline. [`MemoryCluster`] is a complete in-process implementation
//! used for tests and local development; with the `scylla` feature,
//! `ScyllaConnector` opens sessions on a real Cassandra or ScyllaDB cluster.
//!
//! # Quick Start
//!
//! ```ignore
//! use cqlmap_driver::{ClusterSettings, Connector, MemoryCluster};
//! use cqlmap_proto::Statement;
//! use std::time::Duration;
//!
//! let cluster = MemoryCluster::new();
//! cluster.create_keyspace("ks");
//! let session = cluster.connect(&ClusterSettings::new(["127.0.0.1"])).await?;
//! let mut response = session.execute(Statement::simple("use ks"));
//! let result = response.wait_timed(Duration::from_secs(5)).await;
//! ```

pub mod memory;
#[cfg(feature = "scylla")]
pub mod native;
pub mod session;
pub mod settings;

pub use memory::{Fault, FaultRule, MemoryCluster, MemorySession};
#[cfg(feature = "scylla")]
pub use native::{ScyllaConnector, ScyllaSession};
pub use session::{Connector, ExecResult, ResponseFuture, Session};
pub use settings::{
    ClusterSettings, Credentials, LogLevel, DEFAULT_CONNECTIONS_PER_HOST, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_IO_THREADS, DEFAULT_QUEUE_SIZE_IO,
};
