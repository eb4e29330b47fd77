pub const BYTES_PER_LENGTH_OFFSET: usize = 4;
pub const BYTES_PER_CHUNK: usize = 32;
