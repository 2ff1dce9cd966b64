use std::hash::{DefaultHasher, Hash, Hasher};

/// Reduce partition for `key`. `DefaultHasher::new()` uses fixed keys, so
/// every worker in the process agrees.
pub(crate) fn partition_for<K: Hash + ?Sized>(key: &K, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}
