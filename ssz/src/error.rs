use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum ReadError {
    #[error("SSZ bit list has no delimiting bit")]
    BitListMissingDelimiter,
    #[error("SSZ bit vector has bits set past its length")]
    BitVectorExtraBits,
    #[error("expected {expected} bytes, found {actual}")]
    FixedSizeMismatch { expected: usize, actual: usize },
    #[error("first offset ({actual}) does not match size of fixed part ({expected})")]
    FirstOffsetMismatch { expected: usize, actual: usize },
    #[error("list has {actual} elements but may only have up to {maximum}")]
    ListTooLong { maximum: usize, actual: usize },
    #[error("offset ({offset}) points past end of data ({length} bytes)")]
    OffsetOutOfBounds { offset: usize, length: usize },
    #[error("offsets are not increasing ({previous} followed by {next})")]
    OffsetsNotIncreasing { previous: usize, next: usize },
    #[error("slice of length {length} cannot be split at {index}")]
    SliceTooShort { index: usize, length: usize },
    #[error("size of fixed part is not a multiple of element size")]
    UnevenFixedPart,
    #[error("vector has {actual} elements but must have exactly {expected}")]
    VectorSizeMismatch { expected: usize, actual: usize },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum WriteError {
    #[error("offset ({offset}) does not fit in 4 bytes")]
    OffsetTooLarge { offset: usize },
}
