use std::io::{Seek, Write};

use types::phase0::primitives::Slot;

use crate::{
    record::{self, E2_INDEX, E2_VERSION, SNAPPY_BEACON_BLOCK, SNAPPY_BEACON_STATE},
    Error,
};

/// Writes one era file record by record.
///
/// Blocks must be appended in slot order. Slots without a block get a zero
/// offset in the block index so readers can distinguish "empty slot" from
/// "not covered".
pub struct EraWriter<W: Write + Seek> {
    output: W,
    start_slot: Slot,
    block_offsets: Vec<u64>,
}

impl<W: Write + Seek> EraWriter<W> {
    /// Opens a writer and emits the version record.
    pub fn new(mut output: W, start_slot: Slot) -> Result<Self, Error> {
        record::write_record(&mut output, E2_VERSION, &[])?;

        Ok(Self {
            output,
            start_slot,
            block_offsets: vec![],
        })
    }

    /// Appends the SSZ encoding of the signed block at `slot`.
    pub fn write_block(&mut self, slot: Slot, ssz_bytes: &[u8]) -> Result<(), Error> {
        let expected = self.start_slot + self.block_offsets.len() as u64;

        if slot < expected {
            return Err(Error::SlotOutOfOrder { slot, expected });
        }

        // Slots the chain skipped have no block and no record.
        self.block_offsets.resize((slot - self.start_slot) as usize, 0);

        let compressed = record::compress(ssz_bytes)?;
        let position = record::write_record(&mut self.output, SNAPPY_BEACON_BLOCK, &compressed)?;

        self.block_offsets.push(position);

        Ok(())
    }

    /// Appends the block index, the terminal state and the state index,
    /// completing the file.
    pub fn finish(mut self, state_slot: Slot, state_ssz_bytes: &[u8]) -> Result<W, Error> {
        if !self.block_offsets.is_empty() {
            let offsets = core::mem::take(&mut self.block_offsets);
            write_index(&mut self.output, self.start_slot, &offsets)?;
        }

        let compressed = record::compress(state_ssz_bytes)?;

        let state_position =
            record::write_record(&mut self.output, SNAPPY_BEACON_STATE, &compressed)?;

        write_index(&mut self.output, state_slot, &[state_position])?;

        Ok(self.output)
    }
}

/// An index record body is
/// `startSlot (8 LE) | offset_0 … offset_{n-1} (8 LE each) | count (8 LE)`.
///
/// Offsets are stored relative to the start of the index record itself,
/// in two's complement; zero marks an absent entry.
fn write_index(
    output: &mut (impl Write + Seek),
    start_slot: Slot,
    absolute_offsets: &[u64],
) -> Result<(), Error> {
    if u32::try_from(start_slot).is_err() {
        return Err(Error::StartSlotTooLarge { start_slot });
    }

    let index_start = output.stream_position()?;

    let mut body = Vec::with_capacity(16 + 8 * absolute_offsets.len());
    body.extend_from_slice(&start_slot.to_le_bytes());

    for absolute in absolute_offsets {
        let relative = if *absolute == 0 {
            0
        } else {
            (*absolute as i64).wrapping_sub(index_start as i64)
        };

        body.extend_from_slice(&relative.to_le_bytes());
    }

    body.extend_from_slice(&(absolute_offsets.len() as u64).to_le_bytes());

    record::write_record(output, E2_INDEX, &body)?;

    Ok(())
}
