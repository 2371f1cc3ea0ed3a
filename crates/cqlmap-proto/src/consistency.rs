//! Per-statement consistency levels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How many replicas must answer before a request counts as complete.
///
/// Passed through to the driver unchanged; the mapping layer never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Consistency {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    #[default]
    LocalQuorum,
    EachQuorum,
    Serial,
    LocalSerial,
    LocalOne,
}

impl Consistency {
    /// Upper-case protocol name.
    pub fn as_str(self) -> &'static str {
        match self {
            Consistency::Any => "ANY",
            Consistency::One => "ONE",
            Consistency::Two => "TWO",
            Consistency::Three => "THREE",
            Consistency::Quorum => "QUORUM",
            Consistency::All => "ALL",
            Consistency::LocalQuorum => "LOCAL_QUORUM",
            Consistency::EachQuorum => "EACH_QUORUM",
            Consistency::Serial => "SERIAL",
            Consistency::LocalSerial => "LOCAL_SERIAL",
            Consistency::LocalOne => "LOCAL_ONE",
        }
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_local_quorum() {
        assert_eq!(Consistency::default(), Consistency::LocalQuorum);
    }

    #[test]
    fn test_serde_names_match_protocol_names() {
        let json = serde_json::to_string(&Consistency::LocalOne).unwrap();
        assert_eq!(json, "\"LOCAL_ONE\"");
        let parsed: Consistency = serde_json::from_str("\"EACH_QUORUM\"").unwrap();
        assert_eq!(parsed, Consistency::EachQuorum);
        assert_eq!(parsed.to_string(), "EACH_QUORUM");
    }
}
