use core::ops::Range;

use crate::{
    consts::BYTES_PER_LENGTH_OFFSET,
    error::{ReadError, WriteError},
    porcelain::{SszRead, SszWrite},
    size::Size,
};

pub fn subslice(bytes: &[u8], range: Range<usize>) -> Result<&[u8], ReadError> {
    let length = bytes.len();

    if range.end < range.start {
        return Err(ReadError::OffsetsNotIncreasing {
            previous: range.start,
            next: range.end,
        });
    }

    bytes
        .get(range.clone())
        .ok_or(ReadError::SliceTooShort {
            index: range.end,
            length,
        })
}

pub fn read_offset(bytes: &[u8]) -> Result<usize, ReadError> {
    let bytes = subslice(bytes, 0..BYTES_PER_LENGTH_OFFSET)?;
    let array = bytes
        .try_into()
        .expect("subslice returns exactly BYTES_PER_LENGTH_OFFSET bytes");

    Ok(u32::from_le_bytes(array) as usize)
}

pub fn write_offset(bytes: &mut [u8], offset: usize) -> Result<(), WriteError> {
    let encoded = u32::try_from(offset)
        .map_err(|_| WriteError::OffsetTooLarge { offset })?
        .to_le_bytes();

    bytes[..BYTES_PER_LENGTH_OFFSET].copy_from_slice(&encoded);

    Ok(())
}

/// Decodes the body of an SSZ list or vector into element slices passed to `T::from_ssz`.
pub fn read_elements<C, T: SszRead<C>>(context: &C, bytes: &[u8]) -> Result<Vec<T>, ReadError> {
    match T::SIZE {
        Size::Fixed { size } => {
            if bytes.len() % size != 0 {
                return Err(ReadError::UnevenFixedPart);
            }

            bytes
                .chunks_exact(size)
                .map(|chunk| T::from_ssz_unchecked(context, chunk))
                .collect()
        }
        Size::Variable { .. } => {
            if bytes.is_empty() {
                return Ok(vec![]);
            }

            let first_offset = read_offset(bytes)?;

            if first_offset % BYTES_PER_LENGTH_OFFSET != 0 || first_offset == 0 {
                return Err(ReadError::FirstOffsetMismatch {
                    expected: BYTES_PER_LENGTH_OFFSET,
                    actual: first_offset,
                });
            }

            let count = first_offset / BYTES_PER_LENGTH_OFFSET;
            let mut offsets = Vec::with_capacity(count + 1);
            offsets.push(first_offset);

            for index in 1..count {
                let start = index * BYTES_PER_LENGTH_OFFSET;
                let offset = read_offset(subslice(
                    bytes,
                    start..start + BYTES_PER_LENGTH_OFFSET,
                )?)?;
                offsets.push(offset);
            }

            offsets.push(bytes.len());
            validate_offsets(first_offset, &offsets, bytes.len())?;

            offsets
                .windows(2)
                .map(|window| {
                    let element_bytes = subslice(bytes, window[0]..window[1])?;
                    T::from_ssz(context, element_bytes)
                })
                .collect()
        }
    }
}

/// Encodes the body of an SSZ list or vector.
pub fn write_elements<T: SszWrite>(bytes: &mut Vec<u8>, elements: &[T]) -> Result<(), WriteError> {
    match T::SIZE {
        Size::Fixed { size } => {
            let start = bytes.len();
            bytes.resize(start + size * elements.len(), 0);

            for (element, chunk) in elements.iter().zip(bytes[start..].chunks_exact_mut(size)) {
                element.write_fixed(chunk);
            }

            Ok(())
        }
        Size::Variable { .. } => {
            let start = bytes.len();
            let offset_table_size = BYTES_PER_LENGTH_OFFSET * elements.len();
            bytes.resize(start + offset_table_size, 0);

            for (index, element) in elements.iter().enumerate() {
                let offset = bytes.len() - start;
                let offset_position = start + index * BYTES_PER_LENGTH_OFFSET;
                write_offset(&mut bytes[offset_position..], offset)?;
                element.write_variable(bytes)?;
            }

            Ok(())
        }
    }
}

pub fn validate_offsets(
    fixed_part_size: usize,
    offsets: &[usize],
    total_size: usize,
) -> Result<(), ReadError> {
    if let Some(first) = offsets.first() {
        if *first != fixed_part_size {
            return Err(ReadError::FirstOffsetMismatch {
                expected: fixed_part_size,
                actual: *first,
            });
        }
    }

    for window in offsets.windows(2) {
        if window[0] > window[1] {
            return Err(ReadError::OffsetsNotIncreasing {
                previous: window[0],
                next: window[1],
            });
        }
    }

    if let Some(last) = offsets.last() {
        if *last > total_size {
            return Err(ReadError::OffsetOutOfBounds {
                offset: *last,
                length: total_size,
            });
        }
    }

    Ok(())
}
