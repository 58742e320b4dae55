//! Partition-local key generation

use serde::{Deserialize, Serialize};

/// Key of an element instance, process instance or incident
pub type Key = i64;

const KEY_BITS: u32 = 51;
const COUNTER_MASK: i64 = (1 << KEY_BITS) - 1;

/// Generates unique keys for one partition
///
/// The partition id is encoded into the upper bits, so keys generated on
/// different partitions never collide and no coordination is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGenerator {
    partition_id: u16,
    next: i64,
}

impl KeyGenerator {
    pub fn new(partition_id: u16) -> Self {
        Self {
            partition_id,
            next: 1,
        }
    }

    pub fn next_key(&mut self) -> Key {
        let key = encode_partition_id(self.partition_id, self.next);
        self.next += 1;
        key
    }

    /// Move past a key supplied from outside the generator
    ///
    /// Keys that decode to this partition would otherwise be handed out again
    /// once the counter reaches them.
    pub fn observe(&mut self, key: Key) {
        if key < 0 || decode_partition_id(key) != self.partition_id {
            return;
        }
        self.next = self.next.max((key & COUNTER_MASK) + 1);
    }
}

pub fn encode_partition_id(partition_id: u16, counter: i64) -> Key {
    ((partition_id as i64) << KEY_BITS) + (counter & COUNTER_MASK)
}

pub fn decode_partition_id(key: Key) -> u16 {
    (key >> KEY_BITS) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_monotonic() {
        let mut keys = KeyGenerator::new(1);
        let first = keys.next_key();
        let second = keys.next_key();

        assert!(second > first);
        assert_eq!(second - first, 1);
    }

    #[test]
    fn test_partition_is_encoded() {
        let mut keys = KeyGenerator::new(3);
        let key = keys.next_key();

        assert_eq!(decode_partition_id(key), 3);
        assert_ne!(key, KeyGenerator::new(4).next_key());
    }

    #[test]
    fn test_observed_keys_are_skipped() {
        let mut keys = KeyGenerator::new(1);
        keys.observe(encode_partition_id(1, 5));
        assert_eq!(keys.next_key(), encode_partition_id(1, 6));

        // lower keys and keys of other partitions leave the counter alone
        keys.observe(encode_partition_id(1, 2));
        keys.observe(encode_partition_id(2, 100));
        keys.observe(-1);
        assert_eq!(keys.next_key(), encode_partition_id(1, 7));
    }

    #[test]
    fn test_partition_zero_observes_plain_keys() {
        let mut keys = KeyGenerator::new(0);
        keys.observe(1);
        keys.observe(100);

        assert_eq!(keys.next_key(), 101);
    }
}
