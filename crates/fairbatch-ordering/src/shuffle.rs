//! Seeded Fisher-Yates permutation.

use sha2::{Digest, Sha256};

/// Deterministic permutation of `0..n` driven by `seed`.
///
/// For `i` from `n - 1` down to `1`, swap `i` with
/// `j = draw(seed, i) mod (i + 1)`, where `draw` takes the first 16 bytes of
/// `SHA-256("fairbatch:shuffle:v1:" || seed || i)` as a little-endian
/// integer. The modulo bias over a 128-bit draw is negligible for any
/// realistic batch size.
#[must_use]
pub fn shuffle_indices(seed: &[u8; 32], n: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let bound = (i as u128) + 1;
        #[allow(clippy::cast_possible_truncation)]
        let j = (draw(seed, i as u64) % bound) as usize;
        indices.swap(i, j);
    }
    indices
}

fn draw(seed: &[u8; 32], i: u64) -> u128 {
    let mut hasher = Sha256::new();
    hasher.update(b"fairbatch:shuffle:v1:");
    hasher.update(seed);
    hasher.update(i.to_le_bytes());
    let digest = hasher.finalize();
    let mut word = [0u8; 16];
    word.copy_from_slice(&digest[..16]);
    u128::from_le_bytes(word)
}
