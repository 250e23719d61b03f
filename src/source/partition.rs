//! Round-robin shard partitioning.
//!
//! Shard *i* goes to partition *i mod N*. The policy is a pure function of
//! position and partition count, deliberately blind to shard content or
//! repository size: it spreads load, it does not balance cost.

/// Distribute `items` across `partitions` buckets in round-robin order.
///
/// Every bucket receives either `ceil(len/N)` or `floor(len/N)` items, and
/// the original sequence is recoverable by interleaving the buckets in
/// round-robin order.
pub fn round_robin<T>(items: Vec<T>, partitions: usize) -> Vec<Vec<T>> {
    debug_assert!(partitions > 0, "partition count must be positive");
    let n = partitions.max(1);

    let mut buckets: Vec<Vec<T>> = (0..n).map(|_| Vec::new()).collect();
    for (i, item) in items.into_iter().enumerate() {
        buckets[i % n].push(item);
    }
    buckets
}
