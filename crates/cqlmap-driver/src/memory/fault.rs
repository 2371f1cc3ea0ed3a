//! Scripted misbehaviour for exercising client error paths.

use std::time::Duration;

use cqlmap_proto::ErrorCode;
use parking_lot::Mutex;

/// What happens to a matching request.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// Hold the response back, then execute normally.
    Delay(Duration),
    /// Do not execute; fail with the given code and message.
    Fail(ErrorCode, String),
    /// Execute, then report the given error anyway (a lost acknowledgement).
    Unacknowledged(ErrorCode),
    /// Execute, then drop the row at this position from the result.
    DropRow(usize),
}

/// A fault applied to requests whose query text contains `pattern`
/// (case-insensitive).
#[derive(Debug, Clone, PartialEq)]
pub struct FaultRule {
    pattern: String,
    fault: Fault,
    remaining: Option<u32>,
}

impl FaultRule {
    /// A rule that fires on every matching request.
    pub fn new(pattern: impl Into<String>, fault: Fault) -> Self {
        Self {
            pattern: pattern.into().to_ascii_lowercase(),
            fault,
            remaining: None,
        }
    }

    /// Fire only for the next `times` matching requests.
    pub fn times(mut self, times: u32) -> Self {
        self.remaining = Some(times);
        self
    }

    fn matches(&self, query: &str) -> bool {
        query.to_ascii_lowercase().contains(&self.pattern)
    }
}

/// Ordered fault rules; the first matching rule wins.
#[derive(Debug, Default)]
pub(crate) struct FaultPlan {
    rules: Mutex<Vec<FaultRule>>,
}

impl FaultPlan {
    pub fn push(&self, rule: FaultRule) {
        self.rules.lock().push(rule);
    }

    pub fn clear(&self) {
        self.rules.lock().clear();
    }

    /// Find the fault for `query`, consuming one use of a limited rule.
    pub fn take(&self, query: &str) -> Option<Fault> {
        let mut rules = self.rules.lock();
        let pos = rules.iter().position(|r| r.matches(query))?;
        let fault = rules[pos].fault.clone();
        if let Some(remaining) = rules[pos].remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                rules.remove(pos);
            }
        }
        Some(fault)
    }
}
