//! Row identifiers backed by 16-byte uuids.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use uuid::Uuid;

/// Which kind of identifier to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UuidKind {
    /// Time-based (version 1), for `timeuuid` columns.
    TimeUuid,
    /// Random (version 4), for `uuid` columns.
    Random,
}

/// A row identifier. The nil uuid means "not set".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefId(Uuid);

impl RefId {
    /// The empty identifier.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Generate a fresh identifier of the given kind.
    pub fn generate(kind: UuidKind) -> Self {
        match kind {
            UuidKind::TimeUuid => Self::time_based(),
            UuidKind::Random => Self::random(),
        }
    }

    /// A random (version 4) identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// A time-based (version 1) identifier.
    pub fn time_based() -> Self {
        Self(Uuid::now_v1(node_id()))
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Back to the empty identifier.
    pub fn reset(&mut self) {
        self.0 = Uuid::nil();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_nil()
    }

    /// Whether this is a version 1 (time-based) uuid.
    pub fn is_time_based(&self) -> bool {
        self.0.get_version_num() == 1
    }
}

/// Node id for version 1 uuids: random per process, multicast bit set.
fn node_id() -> &'static [u8; 6] {
    static NODE_ID: OnceLock<[u8; 6]> = OnceLock::new();
    NODE_ID.get_or_init(|| {
        let mut node: [u8; 6] = rand::random();
        node[0] |= 0x01;
        node
    })
}

impl From<Uuid> for RefId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RefId> for Uuid {
    fn from(id: RefId) -> Self {
        id.0
    }
}

impl FromStr for RefId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}
