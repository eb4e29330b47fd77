//! Shared fixtures for state transition tests: quick-start states on the
//! minimal preset, advanced through empty slots, and empty blocks on top of
//! them.

use core::num::NonZeroU64;

use helper_functions::accessors;
use ssz::SszHash as _;
use types::{
    altair::{beacon_state::BeaconState as AltairBeaconState, containers::SyncAggregate},
    bellatrix::{
        beacon_state::BeaconState as BellatrixBeaconState,
        containers::{
            BeaconBlock as BellatrixBeaconBlock, BeaconBlockBody as BellatrixBeaconBlockBody,
        },
    },
    combined::BeaconState as CombinedBeaconState,
    config::Config,
    nonstandard::Phase,
    phase0::{
        beacon_state::BeaconState as Phase0BeaconState,
        containers::{
            BeaconBlock as Phase0BeaconBlock, BeaconBlockBody as Phase0BeaconBlockBody,
        },
        primitives::{Gwei, Slot, H256},
    },
    preset::Minimal,
};

use crate::combined;

pub const VALIDATOR_COUNT: u64 = 8;

pub fn config_for(phase: Phase) -> Config {
    Config::minimal().start_and_stay_in(phase)
}

fn state_at(config: &Config, slot: Slot) -> CombinedBeaconState<Minimal> {
    let mut state = interop::quick_start_beacon_state(
        config,
        0,
        NonZeroU64::new(VALIDATOR_COUNT).expect("the validator count is nonzero"),
    )
    .expect("the genesis state can be built");

    if state.slot() < slot {
        combined::process_slots(config, &mut state, slot)
            .expect("empty slots can be processed");
    }

    state
}

pub fn phase0_state_at(config: &Config, slot: Slot) -> Phase0BeaconState<Minimal> {
    match state_at(config, slot) {
        CombinedBeaconState::Phase0(state) => state.as_ref().clone(),
        _ => panic!("the config keeps the state in Phase 0"),
    }
}

pub fn altair_state_at(config: &Config, slot: Slot) -> AltairBeaconState<Minimal> {
    match state_at(config, slot) {
        CombinedBeaconState::Altair(state) => state.as_ref().clone(),
        _ => panic!("the config keeps the state in Altair"),
    }
}

pub fn bellatrix_state_at(config: &Config, slot: Slot) -> BellatrixBeaconState<Minimal> {
    match state_at(config, slot) {
        CombinedBeaconState::Bellatrix(state) => state.as_ref().clone(),
        _ => panic!("the config keeps the state in Bellatrix"),
    }
}

pub fn balances<S: types::traits::BeaconState<Minimal>>(state: &S) -> Vec<Gwei> {
    state.balances().iter().copied().collect()
}

/// An empty block at the state's own slot. The state must already be advanced
/// past the slot it was anchored at so the latest header has its state root
/// backfilled.
pub fn empty_phase0_block(state: &Phase0BeaconState<Minimal>) -> Phase0BeaconBlock<Minimal> {
    Phase0BeaconBlock {
        slot: state.slot,
        proposer_index: accessors::get_beacon_proposer_index(state)
            .expect("the proposer can be computed"),
        parent_root: state.latest_block_header.hash_tree_root(),
        state_root: H256::zero(),
        body: Phase0BeaconBlockBody {
            eth1_data: state.eth1_data,
            ..Phase0BeaconBlockBody::default()
        },
    }
}

pub fn empty_bellatrix_block(
    state: &BellatrixBeaconState<Minimal>,
) -> BellatrixBeaconBlock<Minimal> {
    BellatrixBeaconBlock {
        slot: state.slot,
        proposer_index: accessors::get_beacon_proposer_index(state)
            .expect("the proposer can be computed"),
        parent_root: state.latest_block_header.hash_tree_root(),
        state_root: H256::zero(),
        body: BellatrixBeaconBlockBody {
            eth1_data: state.eth1_data,
            sync_aggregate: SyncAggregate::empty(),
            ..BellatrixBeaconBlockBody::default()
        },
    }
}
