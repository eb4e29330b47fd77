use anyhow::{ensure, Result};
use ssz::SszHash as _;
use types::{config::Config, preset::Preset, traits::BeaconState};

use helper_functions::misc;

use crate::unphased::Error;

pub fn process_slot<P: Preset>(state: &mut impl BeaconState<P>) {
    let slot = state.slot();

    // > Cache state root
    let previous_state_root = state.hash_tree_root();
    *state.state_roots_mut().mod_index_mut(slot) = previous_state_root;

    // > Cache latest block header state root
    if state.latest_block_header().state_root.is_zero() {
        state.latest_block_header_mut().state_root = previous_state_root;
    }

    // > Cache block root
    let previous_block_root = state.latest_block_header().hash_tree_root();
    *state.block_roots_mut().mod_index_mut(slot) = previous_block_root;

    state.cache_mut().advance_slot();
}

/// Advances `state` to `target`, running `process_epoch` at epoch boundaries.
///
/// Stays within a single fork. Fork upgrades happen in `combined::process_slots`.
pub fn process_slots<P: Preset, S: BeaconState<P>>(
    config: &Config,
    state: &mut S,
    target: types::phase0::primitives::Slot,
    mut process_epoch: impl FnMut(&Config, &mut S) -> Result<()>,
) -> Result<()> {
    ensure!(
        state.slot() < target,
        Error::SlotNotLater {
            current: state.slot(),
            target,
        },
    );

    while state.slot() < target {
        process_slot(state);

        let crossing_epoch_boundary = misc::is_epoch_start::<P>(state.slot() + 1);

        if crossing_epoch_boundary {
            process_epoch(config, state)?;
        }

        *state.slot_mut() += 1;

        if crossing_epoch_boundary {
            state.cache_mut().advance_epoch();
        }
    }

    Ok(())
}
