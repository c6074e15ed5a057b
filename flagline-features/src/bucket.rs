//! Stable hashing and percentage bucketing.
//!
//! Every node evaluating the same key must land in the same bucket, so the hash is
//! a fixed polynomial over the key's characters rather than `std`'s randomized
//! hasher.

use crate::flag::FlagVariant;

/// Number of buckets keys are spread over.
pub const BUCKETS: u64 = 100;

/// Deterministic polynomial rolling hash (base 31, wrapping).
pub fn stable_hash(key: &str) -> u64 {
    key.chars()
        .fold(0u64, |hash, c| hash.wrapping_mul(31).wrapping_add(c as u64))
}

/// Map a key to a bucket in `0..100`.
pub fn bucket(key: &str) -> u8 {
    (stable_hash(key) % BUCKETS) as u8
}

/// Pick a variant for `key` by walking cumulative rollout percentages.
///
/// Returns the first variant whose cumulative percentage strictly exceeds the key's
/// bucket, or `None` when the variants allocate less than the bucket (the caller
/// serves its default). Reordering or resizing `variants` may move keys between
/// variants.
pub fn pick_variant<'a>(variants: &'a [FlagVariant], key: &str) -> Option<&'a FlagVariant> {
    let bucket = u32::from(bucket(key));
    let mut cumulative = 0u32;

    variants.iter().find(|variant| {
        cumulative += u32::from(variant.rollout_percent);
        cumulative > bucket
    })
}

/// Name of the variant [`pick_variant`] selects, or `default` when none does.
pub fn pick_variant_name(variants: &[FlagVariant], key: &str, default: &str) -> String {
    pick_variant(variants, key)
        .map(|variant| variant.name.clone())
        .unwrap_or_else(|| default.to_string())
}
