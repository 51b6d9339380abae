use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Type tag for string items, as reported by introspection commands.
pub const STRING_TAG: u8 = 0;
/// Type tag for list items.
pub const LIST_TAG: u8 = 1;

/// One stored value. Strings carry their own optional expiry deadline;
/// lists never expire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Str {
        value: Vec<u8>,
        /// Absolute deadline in milliseconds since the Unix epoch.
        expires_at: Option<u64>,
    },
    List {
        elements: VecDeque<Vec<u8>>,
    },
}

impl Item {
    pub fn str(value: Vec<u8>, expires_at: Option<u64>) -> Self {
        Item::Str { value, expires_at }
    }

    pub fn list() -> Self {
        Item::List {
            elements: VecDeque::new(),
        }
    }

    /// Compact numeric type tag, for handlers that do their own variant
    /// checks. Built-in handlers match on the variant directly.
    pub fn type_tag(&self) -> u8 {
        match self {
            Item::Str { .. } => STRING_TAG,
            Item::List { .. } => LIST_TAG,
        }
    }

    /// Human-readable type name, used in wrong-type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Item::Str { .. } => "string",
            Item::List { .. } => "list",
        }
    }

    /// Whether this item carries an expiry deadline at all.
    pub fn expires(&self) -> bool {
        matches!(self, Item::Str { expires_at: Some(_), .. })
    }

    pub fn expiry_ms(&self) -> Option<u64> {
        match self {
            Item::Str { expires_at, .. } => *expires_at,
            Item::List { .. } => None,
        }
    }

    /// Whether the deadline has passed. Items without a deadline never expire.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self.expiry_ms() {
            Some(deadline) => now_ms >= deadline,
            None => false,
        }
    }

    /// Cleanup hook, run whenever an item leaves the keyspace for any reason
    /// (deletion, expiry, or overwrite). No item type currently holds
    /// resources beyond its own memory.
    pub fn on_delete(&mut self, _key: &str) {}

    pub fn as_str(&self) -> Option<&[u8]> {
        match self {
            Item::Str { value, .. } => Some(value),
            Item::List { .. } => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut VecDeque<Vec<u8>>> {
        match self {
            Item::List { elements } => Some(elements),
            Item::Str { .. } => None,
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
