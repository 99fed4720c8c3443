use rand::seq::SliceRandom;
use rand::Rng;

/// Keeps at most `n` items, chosen uniformly without replacement.
pub fn take_random<T, R: Rng>(mut items: Vec<T>, n: usize, rng: &mut R) -> Vec<T> {
    items.shuffle(rng);
    items.truncate(n);
    items
}

/// Caps each side's samples at `per_side`, then caps the merged list at
/// twice that.
pub fn reduce_samples<T, R: Rng>(
    white: Vec<T>,
    black: Vec<T>,
    per_side: usize,
    rng: &mut R,
) -> Vec<T> {
    let mut merged = take_random(white, per_side, rng);
    merged.extend(take_random(black, per_side, rng));
    take_random(merged, per_side * 2, rng)
}
