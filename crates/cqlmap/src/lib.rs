//! cqlmap - typed result mapping over a Cassandra session.
//!
//! A [`Conn`] submits CQL through a driver session, waits with a per-call
//! deadline and hands each row to a [`FetchConsumer`]. Columns are read into
//! Rust values through [`WireDecode`]; arguments of prepared statements are
//! written through [`WireEncode`]. Every call is counted in [`CallStats`].
//!
//! # Quick Start
//!
//! ```ignore
//! use cqlmap::{args, ConFetcher, Conn, ConnConfig, Fetcher};
//! use cqlmap::driver::MemoryCluster;
//!
//! let cluster = MemoryCluster::new();
//! let conn = Conn::connect(ConnConfig::localhost().with_keyspace("ks"), &cluster).await?;
//!
//! conn.store("insert into users (id, name) values (1, 'ada')").await;
//!
//! let mut name = Fetcher::<String>::new();
//! if name.fetch_from(&conn, "select name from users where id = 1").await {
//!     println!("{}", name.value());
//! }
//!
//! let insert = conn.prepare_store("insert into users (id, name) values (?, ?)", 2)?;
//! insert.store(args![2, "grace"]).await?;
//!
//! println!("{}", conn.take_stats());
//! ```
//!
//! With the `scylla` feature the same calls run against a real cluster:
//!
//! ```ignore
//! use cqlmap::driver::ScyllaConnector;
//!
//! let config = ConnConfig::new(["10.0.0.1:9042", "10.0.0.2:9042"]).with_keyspace("ks");
//! let conn = Conn::connect(config, &ScyllaConnector::new()).await?;
//! ```

pub mod codec;
pub mod command;
pub mod config;
pub mod conn;
pub mod consumer;
pub mod error;
mod executor;
pub mod extract;
pub mod pending;
pub mod prepared;
pub mod refid;
pub mod stats;
pub mod util;

pub use codec::{Blob, Null, WireDecode, WireEncode};
pub use command::{Command, Outcome};
pub use config::{ConnConfig, DEFAULT_CONSISTENCY, DEFAULT_HOST, DEFAULT_TIMEOUT};
pub use conn::{Conn, TruncateOptions, AUTO_UUID, DEFAULT_PROBE_INTERVAL, DEFAULT_TRUNCATE_RETRIES};
pub use consumer::{
    consumer_fn, AppliedProbe, ConFetcher, FetchConsumer, Fetcher, FnConsumer, FromRow, RowsFetcher,
};
pub use error::Error;
pub use extract::{get_first, get_nth, Field, RowView};
pub use pending::PendingFetch;
pub use prepared::PreparedStatement;
pub use refid::{RefId, UuidKind};
pub use stats::{CallCounters, CallCounts, CallStats, StatsSnapshot};

/// Re-export protocol types.
pub use cqlmap_proto as proto;

/// Re-export the driver seam.
pub use cqlmap_driver as driver;
