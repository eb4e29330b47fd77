use std::io::{Read, Seek, SeekFrom};

use types::phase0::primitives::Slot;

use crate::{
    record::{self, E2_INDEX, E2_VERSION, HEADER_SIZE},
    Error, RecordType,
};

/// A decoded index record with offsets resolved to absolute file positions.
#[derive(Clone, Debug)]
pub struct EraIndex {
    pub start_slot: Slot,
    /// One entry per covered slot. `None` marks a slot without a record.
    pub offsets: Vec<Option<u64>>,
}

impl EraIndex {
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.offsets.iter().flatten().count()
    }
}

/// Random-access reader over one era file.
pub struct EraReader<R: Read + Seek> {
    input: R,
    file_length: u64,
}

impl<R: Read + Seek> EraReader<R> {
    /// Opens the file and checks the version record.
    pub fn new(mut input: R) -> Result<Self, Error> {
        let file_length = input.seek(SeekFrom::End(0))?;

        if file_length < HEADER_SIZE {
            return Err(Error::Truncated { file_length });
        }

        let (record_type, data) = record::read_record(&mut input, 0)?;

        if record_type != E2_VERSION || !data.is_empty() {
            return Err(Error::BadVersionRecord);
        }

        Ok(Self { input, file_length })
    }

    /// The index of the terminal state, the last record in the file.
    pub fn state_index(&mut self) -> Result<EraIndex, Error> {
        let index_start = self.index_start_before(self.file_length)?;
        self.read_index(index_start)
    }

    /// The block index, if the era contains any blocks.
    pub fn block_index(&mut self) -> Result<Option<EraIndex>, Error> {
        let state_index = self.state_index()?;

        let Some(state_position) = state_index.offsets.first().copied().flatten() else {
            return Ok(None);
        };

        // The block index ends exactly where the state record begins.
        if state_position <= HEADER_SIZE {
            return Ok(None);
        }

        let index_start = self.index_start_before(state_position)?;

        if index_start == 0 {
            return Ok(None);
        }

        let index = self.read_index(index_start)?;

        Ok(Some(index))
    }

    /// Reads and decompresses the record at an absolute position.
    pub fn read_compressed_record(
        &mut self,
        position: u64,
    ) -> Result<(RecordType, Vec<u8>), Error> {
        let (record_type, compressed) = record::read_record(&mut self.input, position)?;
        let data = record::decompress(&compressed)?;
        Ok((record_type, data))
    }

    /// Locates the start of the index record that ends at `end`.
    ///
    /// The count in the final 8 bytes determines the record's size:
    /// `8 (header) + 8 (startSlot) + 8 * count + 8 (count)`.
    fn index_start_before(&mut self, end: u64) -> Result<u64, Error> {
        if end < HEADER_SIZE + 16 {
            return Err(Error::Truncated {
                file_length: self.file_length,
            });
        }

        self.input.seek(SeekFrom::Start(end - 8))?;

        let mut count_bytes = [0; 8];
        self.input.read_exact(&mut count_bytes)?;
        let count = u64::from_le_bytes(count_bytes);

        let maximum = self.file_length / 8 - 3;

        if count > maximum {
            return Err(Error::CountOutOfRange { count, maximum });
        }

        let record_size = HEADER_SIZE + 16 + 8 * count;

        end.checked_sub(record_size).ok_or(Error::Truncated {
            file_length: self.file_length,
        })
    }

    fn read_index(&mut self, index_start: u64) -> Result<EraIndex, Error> {
        let (record_type, body) = record::read_record(&mut self.input, index_start)?;

        record::expect_record_type(E2_INDEX, record_type)?;

        let length = body.len() as u64;

        if length < 16 || length % 8 != 0 {
            return Err(Error::CountMismatch { count: 0, length });
        }

        let declared_count = u64::from_le_bytes(
            body[body.len() - 8..]
                .try_into()
                .expect("the slice is exactly 8 bytes"),
        );

        let entry_count = (length - 16) / 8;

        if declared_count != entry_count {
            return Err(Error::CountMismatch {
                count: declared_count,
                length,
            });
        }

        let start_slot = Slot::from_le_bytes(
            body[..8].try_into().expect("the slice is exactly 8 bytes"),
        );

        if u32::try_from(start_slot).is_err() {
            return Err(Error::StartSlotTooLarge { start_slot });
        }

        let mut offsets = Vec::with_capacity(entry_count as usize);

        for index in 0..entry_count as usize {
            let relative = i64::from_le_bytes(
                body[8 + index * 8..16 + index * 8]
                    .try_into()
                    .expect("the slice is exactly 8 bytes"),
            );

            if relative == 0 {
                offsets.push(None);
                continue;
            }

            let absolute = (index_start as i64).wrapping_add(relative) as u64;

            if absolute >= self.file_length {
                return Err(Error::OffsetOutOfRange {
                    index,
                    offset: absolute,
                    file_length: self.file_length,
                });
            }

            offsets.push(Some(absolute));
        }

        Ok(EraIndex {
            start_slot,
            offsets,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{writer::EraWriter, SNAPPY_BEACON_BLOCK, SNAPPY_BEACON_STATE};

    use super::*;

    #[test]
    fn written_files_are_readable_with_gaps_preserved() {
        let writer = EraWriter::new(Cursor::new(vec![]), 100).expect("writer opens");
        let mut writer = writer;

        writer.write_block(100, b"block 100").expect("write succeeds");
        // Slot 101 is empty.
        writer.write_block(102, b"block 102").expect("write succeeds");

        let file = writer.finish(103, b"state 103").expect("finish succeeds");

        let mut reader = EraReader::new(file).expect("reader opens");

        let state_index = reader.state_index().expect("state index parses");
        assert_eq!(state_index.start_slot, 103);
        assert_eq!(state_index.entry_count(), 1);

        let state_position = state_index.offsets[0].expect("the state record exists");
        let (record_type, data) = reader
            .read_compressed_record(state_position)
            .expect("state record parses");

        assert_eq!(record_type, SNAPPY_BEACON_STATE);
        assert_eq!(data, b"state 103");

        let block_index = reader
            .block_index()
            .expect("block index parses")
            .expect("blocks were written");

        assert_eq!(block_index.start_slot, 100);
        assert_eq!(block_index.offsets.len(), 3);
        assert_eq!(block_index.entry_count(), 2);
        assert_eq!(block_index.offsets[1], None);

        let (record_type, data) = reader
            .read_compressed_record(block_index.offsets[2].expect("block 102 exists"))
            .expect("block record parses");

        assert_eq!(record_type, SNAPPY_BEACON_BLOCK);
        assert_eq!(data, b"block 102");
    }

    #[test]
    fn files_without_blocks_have_no_block_index() {
        let writer = EraWriter::new(Cursor::new(vec![]), 0).expect("writer opens");
        let file = writer.finish(0, b"genesis state").expect("finish succeeds");

        let mut reader = EraReader::new(file).expect("reader opens");

        assert!(reader.block_index().expect("parsing succeeds").is_none());
    }

    #[test]
    fn archived_blocks_and_state_decode_back_to_their_ssz_forms() {
        use ssz::{SszRead as _, SszWrite as _};
        use types::{
            combined::{BeaconState, SignedBeaconBlock},
            config::Config,
            phase0::{
                beacon_state::BeaconState as Phase0BeaconState,
                containers::SignedBeaconBlock as Phase0SignedBeaconBlock,
            },
            preset::Minimal,
        };

        let config = Config::minimal();
        let start_slot = 8192;
        let mut writer = EraWriter::new(Cursor::new(vec![]), start_slot).expect("writer opens");

        for slot in start_slot..start_slot + 32 {
            let mut block = Phase0SignedBeaconBlock::<Minimal>::default();
            block.message.slot = slot;

            let ssz_bytes = block.to_ssz().expect("blocks are serializable");
            writer.write_block(slot, &ssz_bytes).expect("write succeeds");
        }

        let mut state = Phase0BeaconState::<Minimal>::default();
        state.slot = start_slot + 32;

        let state_bytes = state.to_ssz().expect("states are serializable");

        let file = writer
            .finish(start_slot + 32, &state_bytes)
            .expect("finish succeeds");

        let mut reader = EraReader::new(file).expect("reader opens");

        let block_index = reader
            .block_index()
            .expect("block index parses")
            .expect("blocks were written");

        assert_eq!(block_index.start_slot, start_slot);
        assert_eq!(block_index.entry_count(), 32);

        for (position, slot) in block_index
            .offsets
            .iter()
            .copied()
            .flatten()
            .zip(start_slot..)
        {
            let (record_type, data) = reader
                .read_compressed_record(position)
                .expect("block record parses");

            assert_eq!(record_type, SNAPPY_BEACON_BLOCK);

            let block = SignedBeaconBlock::<Minimal>::from_ssz(&config, data)
                .expect("archived blocks decode");

            assert_eq!(block.message_slot(), slot);
        }

        let state_index = reader.state_index().expect("state index parses");
        let state_position = state_index.offsets[0].expect("the state record exists");

        let (record_type, data) = reader
            .read_compressed_record(state_position)
            .expect("state record parses");

        assert_eq!(record_type, SNAPPY_BEACON_STATE);

        let decoded = BeaconState::<Minimal>::from_ssz(&config, data)
            .expect("the archived state decodes");

        assert_eq!(decoded.slot(), start_slot + 32);
    }

    #[test]
    fn out_of_order_blocks_are_rejected() {
        let mut writer = EraWriter::new(Cursor::new(vec![]), 10).expect("writer opens");

        writer.write_block(11, b"block 11").expect("write succeeds");

        assert!(matches!(
            writer.write_block(11, b"again"),
            Err(crate::Error::SlotOutOfOrder { .. }),
        ));
    }
}
