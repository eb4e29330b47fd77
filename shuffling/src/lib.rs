use core::num::NonZeroU64;

use bit_field::BitArray as _;
use types::{phase0::primitives::H256, preset::Preset};

const BITS_PER_HASH: u64 = H256::len_bytes() as u64 * 8;

// Based on the swap-or-not shuffle. See:
// <https://github.com/protolambda/eth2-docs/tree/de65f38857f1e27ffb6f25107d61e795cf1a5ad7#shuffling>
//
// Swapping whole rounds at a time inverts the per-index permutation,
// so the rounds run in reverse. The result satisfies
// `shuffled[index] == shuffle_single(index, …)` for an identity input.
pub fn shuffle_slice<P: Preset, T>(slice: &mut [T], seed: H256) {
    let Some(length) = NonZeroU64::new(slice.len() as u64) else {
        return;
    };

    for round in (0..P::SHUFFLE_ROUND_COUNT).rev() {
        let pivot = compute_pivot(seed, round, length);

        // Each index pairs up with its flip. Visiting only the pairs with
        // `index < flip` applies every swap exactly once. The decision bit is
        // always taken at the higher position of the pair.
        let mut cached_window = u64::MAX;
        let mut source = H256::zero();

        for index in 0..length.get() {
            let flip = (pivot + length.get() - index) % length;

            if flip <= index {
                continue;
            }

            let window = flip / BITS_PER_HASH;

            if window != cached_window {
                source = compute_source(seed, round, window);
                cached_window = window;
            }

            let bit_index = (flip % BITS_PER_HASH) as usize;

            if source.as_bytes().get_bit(bit_index) {
                slice.swap(index as usize, flip as usize);
            }
        }
    }
}

/// [`compute_shuffled_index`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#compute_shuffled_index)
#[must_use]
pub fn shuffle_single<P: Preset>(mut index: u64, index_count: NonZeroU64, seed: H256) -> u64 {
    assert!(index < index_count.get());

    for round in 0..P::SHUFFLE_ROUND_COUNT {
        let pivot = compute_pivot(seed, round, index_count);
        let flip = (pivot + index_count.get() - index) % index_count;
        let position = index.max(flip);
        let source = compute_source(seed, round, position / BITS_PER_HASH);
        let bit_index = (position % BITS_PER_HASH) as usize;

        if source.as_bytes().get_bit(bit_index) {
            index = flip;
        }
    }

    index
}

fn compute_pivot(seed: H256, round: u8, index_count: NonZeroU64) -> u64 {
    let digest = hashing::hash_256_8(seed, round);
    let value = u64::from_le_bytes(
        digest.as_bytes()[..size_of::<u64>()]
            .try_into()
            .expect("slice has the same size as u64"),
    );

    value % index_count
}

fn compute_source(seed: H256, round: u8, position_window: u64) -> H256 {
    // Truncate to match the behavior of `compute_shuffled_index` in `consensus-specs`.
    #[allow(clippy::cast_possible_truncation)]
    hashing::hash_256_8_32(seed, round, position_window as u32)
}

#[cfg(test)]
mod tests {
    use itertools::Itertools as _;
    use types::preset::Minimal;

    use super::*;

    #[test]
    fn slice_shuffle_agrees_with_single_index_shuffle() {
        let seed = hashing::hash_64(42);
        let count = 321_u64;
        let index_count = NonZeroU64::new(count).expect("count is nonzero");
        let mut shuffled = (0..count).collect_vec();

        shuffle_slice::<Minimal, _>(&mut shuffled, seed);

        for (position, value) in shuffled.into_iter().enumerate() {
            assert_eq!(
                value,
                shuffle_single::<Minimal>(position as u64, index_count, seed),
            );
        }
    }

    #[test]
    fn shuffle_produces_a_permutation() {
        let seed = hashing::hash_64(13);
        let count = 100_u64;
        let mut shuffled = (0..count).collect_vec();

        shuffle_slice::<Minimal, _>(&mut shuffled, seed);
        shuffled.sort_unstable();

        assert_eq!(shuffled, (0..count).collect_vec());
    }

    #[test]
    fn empty_and_single_element_slices_are_fixed_points() {
        let seed = hashing::hash_64(7);

        let mut empty: [u64; 0] = [];
        shuffle_slice::<Minimal, _>(&mut empty, seed);

        let mut single = [11_u64];
        shuffle_slice::<Minimal, _>(&mut single, seed);

        assert_eq!(single, [11]);
    }
}
