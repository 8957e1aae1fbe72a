use std::collections::VecDeque;

use rustc_hash::FxHashMap;

/// Byte sizes of the frames observed in one second, in the order they were observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bucket {
    sizes: Vec<usize>,
}

impl Bucket {
    pub fn add(&mut self, size: usize) {
        self.sizes.push(size);
    }

    pub fn count(&self) -> u64 {
        self.sizes.len() as u64
    }

    pub fn total_bytes(&self) -> u64 {
        self.sizes.iter()
            .map(|&s| s as u64)
            .sum()
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }
}

/// The per-second record a flushed bucket turns into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRecord {
    pub bucket_key: String,
    pub count: u64,
    /// a bucket spans one second, so this is the bitrate for that second
    pub bits: u64,
}

impl BucketRecord {
    fn from_bucket(bucket_key: String, bucket: &Bucket) -> BucketRecord {
        BucketRecord {
            bucket_key,
            count: bucket.count(),
            bits: bucket.total_bytes() * 8,
        }
    }
}

/// Running totals of one side of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub count: u64,
    pub total_bytes: u64,
}

impl SessionStats {
    pub fn add(&mut self, record: &BucketRecord) {
        self.count += record.count;
        self.total_bytes += record.bits / 8;
    }

    pub fn total_bits(&self) -> u64 {
        self.total_bytes * 8
    }
}

/// Buckets by key, iterated in the order in which keys were first observed. Bucket keys are
///  compared for *change*, never for numeric order, so the order is tracked explicitly rather
///  than relying on the ordering of the key type.
#[derive(Debug, Default)]
pub struct BucketStore {
    order: VecDeque<String>,
    buckets: FxHashMap<String, Bucket>,
}

impl BucketStore {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.buckets.contains_key(key)
    }

    pub fn oldest_key(&self) -> Option<&str> {
        self.order.front()
            .map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter()
            .map(String::as_str)
    }

    /// adds a frame size to the bucket for `key`, creating the bucket if this is the first frame
    ///  for that key
    pub fn add(&mut self, key: &str, size: usize) {
        if let Some(bucket) = self.buckets.get_mut(key) {
            bucket.add(size);
            return;
        }

        let mut bucket = Bucket::default();
        bucket.add(size);
        self.order.push_back(key.to_string());
        self.buckets.insert(key.to_string(), bucket);
    }

    /// removes the bucket for `key`, returning its record - or `None` if there is no such bucket
    pub fn flush(&mut self, key: &str) -> Option<BucketRecord> {
        let bucket = self.buckets.remove(key)?;
        let pos = self.order.iter()
            .position(|k| k == key)?;
        let key = self.order.remove(pos)?;
        Some(BucketRecord::from_bucket(key, &bucket))
    }

    pub fn flush_oldest(&mut self) -> Option<BucketRecord> {
        let key = self.order.pop_front()?;
        let bucket = self.buckets.remove(&key)?;
        Some(BucketRecord::from_bucket(key, &bucket))
    }

    /// removes all buckets in the order their keys were first observed
    pub fn flush_all(&mut self) -> Vec<BucketRecord> {
        let mut result = Vec::with_capacity(self.order.len());
        while let Some(record) = self.flush_oldest() {
            result.push(record);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_store_keeps_first_observed_order() {
        let mut store = BucketStore::default();
        store.add("20240101000002", 10);
        store.add("20240101000001", 20);
        store.add("20240101000002", 30);
        store.add("20240101000003", 40);

        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["20240101000002", "20240101000001", "20240101000003"]);
        assert_eq!(store.flush_all(), vec![
            BucketRecord { bucket_key: "20240101000002".to_string(), count: 2, bits: 320 },
            BucketRecord { bucket_key: "20240101000001".to_string(), count: 1, bits: 160 },
            BucketRecord { bucket_key: "20240101000003".to_string(), count: 1, bits: 320 },
        ]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_bucket_store_flush_by_key() {
        let mut store = BucketStore::default();
        store.add("a", 1);
        store.add("b", 2);
        store.add("c", 3);

        assert_eq!(store.flush("b"), Some(BucketRecord { bucket_key: "b".to_string(), count: 1, bits: 16 }));
        assert_eq!(store.flush("b"), None);
        assert_eq!(store.oldest_key(), Some("a"));
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["a", "c"]);
        assert!(!store.contains("b"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_bucket_keeps_sizes_in_order() {
        let mut bucket = Bucket::default();
        bucket.add(3);
        bucket.add(1);
        bucket.add(2);

        assert_eq!(bucket.sizes(), &[3, 1, 2]);
        assert_eq!(bucket.count(), 3);
        assert_eq!(bucket.total_bytes(), 6);
    }

    #[test]
    fn test_session_stats() {
        let mut stats = SessionStats::default();
        stats.add(&BucketRecord { bucket_key: "a".to_string(), count: 3, bits: 800 });
        stats.add(&BucketRecord { bucket_key: "b".to_string(), count: 2, bits: 160 });

        assert_eq!(stats, SessionStats { count: 5, total_bytes: 120 });
        assert_eq!(stats.total_bits(), 960);
    }
}
