use serde::{Deserialize, Serialize};

/// Identifier of the node that issued a timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u16);

impl Default for NodeId {
    fn default() -> Self {
        Self(1)
    }
}

/// Logical time of a provenance append.
///
/// Hybrid of wall-clock milliseconds and a logical counter, totally ordered
/// by physical, then logical, then node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub physical_ms: u64,
    pub logical: u32,
    pub node_id: NodeId,
}

impl Timestamp {
    pub fn new(physical_ms: u64, logical: u32, node_id: NodeId) -> Self {
        Self {
            physical_ms,
            logical,
            node_id,
        }
    }

    /// Wall-clock part as a UTC datetime, for display.
    pub fn to_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        i64::try_from(self.physical_ms)
            .ok()
            .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.physical_ms
            .cmp(&other.physical_ms)
            .then(self.logical.cmp(&other.logical))
            .then(self.node_id.cmp(&other.node_id))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.physical_ms, self.logical, self.node_id.0)
    }
}
