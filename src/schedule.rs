//! Epoch planning: a fresh permutation per epoch, cut into consecutive mini-batches.

use std::slice::Chunks;

use rand::Rng;
use rand::seq::SliceRandom;

/// Shuffle sample indices in place (uniform permutation).
#[inline]
pub fn shuffle_order<R: Rng + ?Sized>(order: &mut [usize], rng: &mut R) {
    order.shuffle(rng);
}

/// Consecutive batches of `batch_size` indices; the last one holds the remainder.
///
/// Panics if `batch_size == 0`.
#[inline]
pub fn batches(order: &[usize], batch_size: usize) -> Chunks<'_, usize> {
    assert!(batch_size > 0, "batch_size must be > 0");
    order.chunks(batch_size)
}

/// Number of batches `batches` yields for `len` samples.
#[inline]
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    assert!(batch_size > 0, "batch_size must be > 0");
    // No `len + batch_size - 1`: batch_size may be as large as usize::MAX.
    len / batch_size + usize::from(len % batch_size != 0)
}
