// ID Generator - Snowflake-like 64-bit ids
// Ids are strictly increasing per generator, which the feed relies on to break
// created_at ties in reverse insertion order.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

/// 64-bit id format: [timestamp:41][node_id:10][sequence:12]
/// This allows for 1024 nodes and 4096 ids per millisecond per node
#[derive(Debug)]
pub struct IdGenerator {
    node_id: u16,
    state: Mutex<GeneratorState>,
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl IdGenerator {
    /// Create new ID generator for the given node
    pub fn new(node_id: u16) -> Self {
        assert!(node_id < 1024, "Node ID must be less than 1024");

        Self {
            node_id,
            state: Mutex::new(GeneratorState::default()),
        }
    }

    /// Generate next unique id
    pub fn next_id(&self) -> i64 {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut now = now_millis();

        // A clock that steps backwards keeps using the last timestamp so ids stay monotonic.
        if now < state.last_timestamp {
            now = state.last_timestamp;
        }

        if now == state.last_timestamp {
            state.sequence += 1;
            if state.sequence > MAX_SEQUENCE {
                // Sequence exhausted for this millisecond, borrow the next one
                now = state.last_timestamp + 1;
                state.sequence = 0;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = now;

        let id = ((now & 0x1FF_FFFF_FFFF) << (NODE_BITS + SEQUENCE_BITS))
            | ((self.node_id as u64) << SEQUENCE_BITS)
            | state.sequence;

        id as i64
    }

    /// Extract node id from an id
    pub fn extract_node_id(id: i64) -> u16 {
        ((id as u64) >> SEQUENCE_BITS & 0x3FF) as u16
    }

    /// Extract timestamp (ms since epoch) from an id
    pub fn extract_timestamp(id: i64) -> u64 {
        (id as u64) >> (NODE_BITS + SEQUENCE_BITS)
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }
}
