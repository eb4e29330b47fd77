use ethereum_types::H256;
use hashing::ZERO_HASHES;
use typenum::Unsigned;

use crate::{
    consts::BYTES_PER_CHUNK,
    porcelain::{SszHash, SszWrite},
};

/// The height of the Merkle tree needed to hold `chunks` leaves.
#[must_use]
pub fn depth_for_chunks(chunks: u64) -> u64 {
    chunks.next_power_of_two().trailing_zeros().into()
}

/// The tree height for a list of up to `elements` values of type `T`,
/// accounting for the packing of basic types.
#[must_use]
pub fn depth_for_elements<T: SszHash>(elements: u64) -> u64 {
    let packing_factor = T::PackingFactor::U64;
    depth_for_chunks(elements.div_ceil(packing_factor))
}

/// Merkleizes `chunks` into a tree of height `depth`, padding with zero subtrees.
///
/// Panics if `chunks` does not fit in a tree of height `depth`
/// or if `depth` exceeds the height covered by [`ZERO_HASHES`].
#[must_use]
pub fn merkleize_chunks(chunks: Vec<H256>, depth: u64) -> H256 {
    let depth = usize::try_from(depth).expect("tree depth fits in usize");

    assert!(depth < ZERO_HASHES.len());
    assert!(chunks.len() <= max_leaves(depth));

    if chunks.is_empty() {
        return ZERO_HASHES[depth];
    }

    let mut level = chunks;

    for height in 0..depth {
        if level.len() == 1 {
            let mut root = level[0];

            for zero_height in height..depth {
                root = hashing::hash_256_256(root, ZERO_HASHES[zero_height]);
            }

            return root;
        }

        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hashing::hash_256_256(*left, *right),
                [left] => hashing::hash_256_256(*left, ZERO_HASHES[height]),
                _ => unreachable!("chunks(2) yields slices of 1 or 2 elements"),
            })
            .collect();
    }

    level[0]
}

/// Merkleizes raw serialized data, splitting it into 32-byte chunks.
#[must_use]
pub fn merkleize_bytes(bytes: &[u8], depth: u64) -> H256 {
    let chunks = bytes
        .chunks(BYTES_PER_CHUNK)
        .map(|chunk| {
            let mut padded = H256::zero();
            padded[..chunk.len()].copy_from_slice(chunk);
            padded
        })
        .collect();

    merkleize_chunks(chunks, depth)
}

/// Computes the root of a list of elements with the limit `maximum_elements`,
/// before mixing in the length.
#[must_use]
pub fn merkleize_elements<T: SszHash + SszWrite>(elements: &[T], maximum_elements: u64) -> H256 {
    let depth = depth_for_elements::<T>(maximum_elements);

    if T::PackingFactor::U64 == 1 {
        let chunks = elements.iter().map(SszHash::hash_tree_root).collect();
        merkleize_chunks(chunks, depth)
    } else {
        let size = T::SIZE.get();
        let mut bytes = vec![0; size * elements.len()];

        for (element, chunk) in elements.iter().zip(bytes.chunks_exact_mut(size)) {
            element.write_fixed(chunk);
        }

        merkleize_bytes(&bytes, depth)
    }
}

#[must_use]
pub fn mix_in_length(root: H256, length: usize) -> H256 {
    hashing::hash_256_64(root, length as u64)
}

#[must_use]
pub fn mix_in_selector(root: H256, selector: u64) -> H256 {
    hashing::hash_256_64(root, selector)
}

fn max_leaves(depth: usize) -> usize {
    match 1_usize.checked_shl(depth as u32) {
        Some(leaves) => leaves,
        None => usize::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_roots_are_zero_hashes() {
        assert_eq!(merkleize_chunks(vec![], 0), ZERO_HASHES[0]);
        assert_eq!(merkleize_chunks(vec![], 3), ZERO_HASHES[3]);
        assert_eq!(merkleize_chunks(vec![], 40), ZERO_HASHES[40]);
    }

    #[test]
    fn single_chunk_in_deep_tree_folds_with_zero_hashes() {
        let chunk = hashing::hash_64(1);
        let mut expected = chunk;

        for height in 0..4 {
            expected = hashing::hash_256_256(expected, ZERO_HASHES[height]);
        }

        assert_eq!(merkleize_chunks(vec![chunk], 4), expected);
    }

    #[test]
    fn padding_matches_explicit_zero_leaves() {
        let chunks = vec![hashing::hash_64(1), hashing::hash_64(2), hashing::hash_64(3)];

        let explicit = hashing::hash_256_256(
            hashing::hash_256_256(chunks[0], chunks[1]),
            hashing::hash_256_256(chunks[2], ZERO_HASHES[0]),
        );

        assert_eq!(merkleize_chunks(chunks, 2), explicit);
    }
}
