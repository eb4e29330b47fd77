// Re-exported primarily so `impl_ssz_for_container!` works without additional dependencies.
pub use ethereum_types::H256;
pub use hashing;
pub use typenum::U1;

pub use crate::{
    bit_list::BitList,
    bit_vector::BitVector,
    byte_list::ByteList,
    byte_vector::ByteVector,
    consts::BYTES_PER_LENGTH_OFFSET,
    contiguous_list::ContiguousList,
    contiguous_vector::ContiguousVector,
    error::{ReadError, WriteError},
    hc::Hc,
    merkle_tree::{mix_in_length, mix_in_selector},
    porcelain::{SszHash, SszRead, SszReadDefault, SszSize, SszWrite},
    shared::{read_offset, subslice, write_offset},
    size::Size,
};

mod basic;
mod bit_list;
mod bit_vector;
mod byte_list;
mod byte_vector;
mod consts;
mod container;
mod contiguous_list;
mod contiguous_vector;
mod error;
mod hc;
mod pointers;
mod porcelain;
mod size;

pub mod merkle_tree;
pub mod shared;
