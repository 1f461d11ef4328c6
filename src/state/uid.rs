//! Connection identifier generation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identifier for one live connection.
///
/// Identifiers come from a process-wide counter and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw counter value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw counter value.
    #[cfg(test)]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base36_encode_6(self.0))
    }
}

/// Generates unique connection identifiers.
pub struct ConnectionIdGenerator {
    counter: AtomicU64,
}

impl ConnectionIdGenerator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    /// Generate the next unique identifier.
    pub fn next(&self) -> ConnectionId {
        ConnectionId(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a number as a base36 string, at least 6 characters wide.
fn base36_encode_6(mut n: u64) -> String {
    const CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut digits = Vec::with_capacity(13);

    loop {
        digits.push(CHARS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    while digits.len() < 6 {
        digits.push(b'0');
    }
    digits.reverse();

    String::from_utf8_lossy(&digits).into_owned()
}
