use std::io::{Read, Seek, SeekFrom, Write};

use crate::Error;

pub type RecordType = [u8; 2];

/// `"e2"`: the file marker. Always the first record, always empty.
pub const E2_VERSION: RecordType = [0x65, 0x32];
/// A Snappy-framed SSZ-encoded signed beacon block.
pub const SNAPPY_BEACON_BLOCK: RecordType = [0x01, 0x00];
/// A Snappy-framed SSZ-encoded beacon state.
pub const SNAPPY_BEACON_STATE: RecordType = [0x02, 0x00];
/// `"i2"`: an index record.
pub const E2_INDEX: RecordType = [0x69, 0x32];

pub const HEADER_SIZE: u64 = 8;

const MAX_RECORD_LENGTH: usize = (1 << 48) - 1;

/// Appends a record and returns the absolute position of its header.
pub fn write_record(
    output: &mut (impl Write + Seek),
    record_type: RecordType,
    data: &[u8],
) -> Result<u64, Error> {
    if data.len() > MAX_RECORD_LENGTH {
        return Err(Error::LengthOverflow { length: data.len() });
    }

    let position = output.stream_position()?;

    let mut header = [0; HEADER_SIZE as usize];
    header[..2].copy_from_slice(&record_type);
    header[2..].copy_from_slice(&(data.len() as u64).to_le_bytes()[..6]);

    output.write_all(&header)?;
    output.write_all(data)?;

    Ok(position)
}

/// Reads the record starting at `position`.
pub fn read_record(
    input: &mut (impl Read + Seek),
    position: u64,
) -> Result<(RecordType, Vec<u8>), Error> {
    input.seek(SeekFrom::Start(position))?;

    let mut header = [0; HEADER_SIZE as usize];
    input.read_exact(&mut header)?;

    let record_type = [header[0], header[1]];

    let mut length_bytes = [0; 8];
    length_bytes[..6].copy_from_slice(&header[2..]);
    let length = u64::from_le_bytes(length_bytes);

    let mut data = vec![0; usize::try_from(length).expect("record length fits in 6 bytes")];
    input.read_exact(&mut data)?;

    Ok((record_type, data))
}

pub fn expect_record_type(expected: RecordType, actual: RecordType) -> Result<(), Error> {
    if expected != actual {
        return Err(Error::UnexpectedRecordType { expected, actual });
    }

    Ok(())
}

pub fn compress(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = snap::write::FrameEncoder::new(vec![]);
    encoder.write_all(data)?;

    encoder
        .into_inner()
        .map_err(|error| Error::Io(error.into_error()))
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut decoder = snap::read::FrameDecoder::new(data);
    let mut decompressed = vec![];
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn records_round_trip() {
        let mut file = Cursor::new(vec![]);

        let first = write_record(&mut file, E2_VERSION, &[]).expect("write succeeds");
        let second =
            write_record(&mut file, SNAPPY_BEACON_BLOCK, b"payload").expect("write succeeds");

        assert_eq!(first, 0);
        assert_eq!(second, 8);

        let (record_type, data) = read_record(&mut file, second).expect("read succeeds");

        assert_eq!(record_type, SNAPPY_BEACON_BLOCK);
        assert_eq!(data, b"payload");
    }

    #[test]
    fn compression_round_trips() {
        let data = vec![7_u8; 4096];
        let compressed = compress(&data).expect("compression succeeds");

        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed).expect("decompression succeeds"), data);
    }
}
