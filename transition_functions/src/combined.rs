use anyhow::{bail, ensure, Result};
use helper_functions::{
    fork,
    verifier::{MultiVerifier, NullVerifier, Verifier},
};
use thiserror::Error;
use types::{
    combined::{BeaconState, SignedBeaconBlock},
    config::Config,
    nonstandard::Phase,
    phase0::primitives::Slot,
    preset::Preset,
};

use crate::{
    altair, bellatrix, phase0,
    unphased::{self, ProcessSlots, StateRootPolicy},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("phase of block ({block_phase}) does not match phase of state ({state_phase})")]
    PhaseMismatch {
        state_phase: Phase,
        block_phase: Phase,
    },
}

pub fn untrusted_state_transition<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    signed_block: &SignedBeaconBlock<P>,
) -> Result<()> {
    custom_state_transition(
        config,
        state,
        signed_block,
        ProcessSlots::IfNeeded,
        StateRootPolicy::Verify,
        MultiVerifier::default(),
    )
}

pub fn trusted_state_transition<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    signed_block: &SignedBeaconBlock<P>,
) -> Result<()> {
    custom_state_transition(
        config,
        state,
        signed_block,
        ProcessSlots::IfNeeded,
        StateRootPolicy::Trust,
        NullVerifier,
    )
}

pub fn custom_state_transition<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    block: &SignedBeaconBlock<P>,
    process_slots: ProcessSlots,
    state_root_policy: StateRootPolicy,
    verifier: impl Verifier,
) -> Result<()> {
    // > Process slots (including those with no blocks) since block
    let should_process_slots = match process_slots {
        ProcessSlots::Always => true,
        ProcessSlots::IfNeeded => state.slot() != block.message_slot(),
        ProcessSlots::Never => false,
    };

    if should_process_slots {
        self::process_slots(config, state, block.message_slot())?;
    }

    match (state, block) {
        (BeaconState::Phase0(state), SignedBeaconBlock::Phase0(block)) => {
            phase0::state_transition::state_transition(
                config,
                state.as_mut(),
                block,
                ProcessSlots::Never,
                state_root_policy,
                verifier,
            )
        }
        (BeaconState::Altair(state), SignedBeaconBlock::Altair(block)) => {
            altair::state_transition::state_transition(
                config,
                state.as_mut(),
                block,
                ProcessSlots::Never,
                state_root_policy,
                verifier,
            )
        }
        (BeaconState::Bellatrix(state), SignedBeaconBlock::Bellatrix(block)) => {
            bellatrix::state_transition::state_transition(
                config,
                state.as_mut(),
                block,
                ProcessSlots::Never,
                state_root_policy,
                verifier,
            )
        }
        (state, block) => bail!(Error::PhaseMismatch {
            state_phase: state.phase(),
            block_phase: block.phase(),
        }),
    }
}

/// Advances the state through empty slots, upgrading it at fork boundaries.
///
/// If multiple phases have the same fork epoch the state is upgraded multiple
/// times without any slot processing in between.
pub fn process_slots<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    slot: Slot,
) -> Result<()> {
    ensure!(
        state.slot() < slot,
        unphased::Error::SlotNotLater {
            current: state.slot(),
            target: slot,
        },
    );

    let final_phase = config.phase_at_slot::<P>(slot);

    while state.slot() < slot || state.phase() < final_phase {
        match state {
            BeaconState::Phase0(phase0_state) => {
                let altair_fork_slot = config.fork_slot::<P>(Phase::Altair);

                let last_slot_in_phase = match altair_fork_slot {
                    Some(fork_slot) => slot.min(fork_slot),
                    None => slot,
                };

                if phase0_state.slot < last_slot_in_phase {
                    phase0::state_transition::process_slots(
                        config,
                        phase0_state.as_mut(),
                        last_slot_in_phase,
                    )?;
                }

                if Some(last_slot_in_phase) == altair_fork_slot {
                    *state =
                        fork::upgrade_to_altair(config, phase0_state.as_ref().clone())?.into();
                }
            }
            BeaconState::Altair(altair_state) => {
                let bellatrix_fork_slot = config.fork_slot::<P>(Phase::Bellatrix);

                let last_slot_in_phase = match bellatrix_fork_slot {
                    Some(fork_slot) => slot.min(fork_slot),
                    None => slot,
                };

                if altair_state.slot < last_slot_in_phase {
                    altair::state_transition::process_slots(
                        config,
                        altair_state.as_mut(),
                        last_slot_in_phase,
                    )?;
                }

                if Some(last_slot_in_phase) == bellatrix_fork_slot {
                    *state =
                        fork::upgrade_to_bellatrix(config, altair_state.as_ref().clone()).into();
                }
            }
            BeaconState::Bellatrix(bellatrix_state) => {
                bellatrix::state_transition::process_slots(
                    config,
                    bellatrix_state.as_mut(),
                    slot,
                )?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use core::num::NonZeroU64;

    use helper_functions::{accessors, misc, signing::SignForSingleFork as _};
    use ssz::SszHash as _;
    use types::{
        phase0::{
            containers::{BeaconBlock, SignedBeaconBlock as Phase0SignedBeaconBlock},
            primitives::{Slot, H256},
        },
        preset::{Mainnet, Minimal},
        traits::{BeaconState as _, PostAltairBeaconState as _},
    };

    use super::*;

    fn genesis_state<P: Preset>(config: &Config, validator_count: u64) -> BeaconState<P> {
        interop::quick_start_beacon_state(
            config,
            0,
            NonZeroU64::new(validator_count).expect("validator count is nonzero"),
        )
        .expect("the genesis state can be built")
    }

    /// Builds a fully signed empty block on top of `state`,
    /// applying it to scratch copies to compute the post-state root.
    fn empty_block_at(
        config: &Config,
        state: &BeaconState<Mainnet>,
        slot: Slot,
    ) -> SignedBeaconBlock<Mainnet> {
        let mut advanced = state.clone();

        if advanced.slot() < slot {
            process_slots(config, &mut advanced, slot).expect("empty slots can be processed");
        }

        let BeaconState::Phase0(advanced) = advanced else {
            panic!("these tests only produce Phase 0 blocks");
        };

        let proposer_index = accessors::get_beacon_proposer_index(advanced.as_ref())
            .expect("the proposer can be computed");

        let secret_key = interop::secret_key(proposer_index);
        let epoch = misc::compute_epoch_at_slot::<Mainnet>(slot);

        let mut message = BeaconBlock::<Mainnet> {
            slot,
            proposer_index,
            parent_root: advanced.latest_block_header.hash_tree_root(),
            state_root: H256::zero(),
            ..BeaconBlock::default()
        };

        message.body.randao_reveal = secret_key
            .sign(
                helper_functions::signing::RandaoEpoch::from(epoch)
                    .signing_root(config, advanced.as_ref()),
            )
            .into();

        message.body.eth1_data = advanced.eth1_data;

        // First pass with a placeholder state root to obtain the real one.
        let mut trial = state.clone();

        let unsigned = SignedBeaconBlock::Phase0(Phase0SignedBeaconBlock {
            message: message.clone(),
            signature: Default::default(),
        });

        custom_state_transition(
            config,
            &mut trial,
            &unsigned,
            ProcessSlots::IfNeeded,
            StateRootPolicy::Trust,
            NullVerifier,
        )
        .expect("the block applies to a scratch copy");

        message.state_root = trial.hash_tree_root();

        let signature = secret_key
            .sign(message.signing_root(config, advanced.as_ref()))
            .into();

        SignedBeaconBlock::Phase0(Phase0SignedBeaconBlock { message, signature })
    }

    #[test]
    fn valid_block_across_an_epoch_boundary_is_accepted() {
        let config = Config::mainnet();
        let mut state = genesis_state::<Mainnet>(&config, 64);

        process_slots(&config, &mut state, 31).expect("empty slots can be processed");

        let block = empty_block_at(&config, &state, 32);

        untrusted_state_transition(&config, &mut state, &block)
            .expect("a correctly signed block with a correct state root is accepted");

        assert_eq!(state.slot(), 32);
        assert_eq!(misc::compute_epoch_at_slot::<Mainnet>(state.slot()), 1);
        assert_eq!(state.hash_tree_root(), block.state_root());

        // Too few epochs have passed for anything to be justified.
        let BeaconState::Phase0(state) = state else {
            panic!("the mainnet config is in Phase 0 at slot 32");
        };

        assert!(!state.justification_bits.any());
    }

    #[test]
    fn wrong_state_root_is_rejected_and_the_original_state_is_unaffected() {
        let config = Config::mainnet();
        let mut state = genesis_state::<Mainnet>(&config, 64);

        process_slots(&config, &mut state, 31).expect("empty slots can be processed");

        let pre_state = state.clone();
        let block = empty_block_at(&config, &state, 32);

        let SignedBeaconBlock::Phase0(mut bad_block) = block else {
            unreachable!()
        };

        bad_block.message.state_root = H256::zero();

        // Re-sign so that only the state root is wrong.
        let BeaconState::Phase0(phase0_state) = &state else {
            unreachable!()
        };

        bad_block.signature = interop::secret_key(bad_block.message.proposer_index)
            .sign(
                bad_block
                    .message
                    .signing_root(&config, phase0_state.as_ref()),
            )
            .into();

        let mut scratch = state.clone();

        let error = untrusted_state_transition(
            &config,
            &mut scratch,
            &bad_block.clone().into(),
        )
        .expect_err("a block with a zeroed state root is invalid");

        assert!(error.to_string().contains("state root"));

        // The canonical state was never touched; the scratch copy is discarded.
        assert_eq!(state, pre_state);
        assert_eq!(state.slot(), 31);
    }

    #[test]
    fn transitions_are_deterministic_and_strictly_increase_the_slot() {
        let config = Config::mainnet();
        let mut state = genesis_state::<Mainnet>(&config, 64);

        process_slots(&config, &mut state, 5).expect("empty slots can be processed");

        let block = empty_block_at(&config, &state, 6);

        let mut first = state.clone();
        let mut second = state.clone();

        untrusted_state_transition(&config, &mut first, &block).expect("the block is valid");
        trusted_state_transition(&config, &mut second, &block).expect("the block is valid");

        assert_eq!(first, second);
        assert_eq!(first.hash_tree_root(), second.hash_tree_root());
        assert!(first.slot() > state.slot());
    }

    #[test]
    fn fork_upgrades_preserve_the_registry_and_history() {
        let config = Config {
            altair_fork_epoch: 1,
            bellatrix_fork_epoch: 2,
            ..Config::minimal()
        };

        let mut state = genesis_state::<Minimal>(&config, 8);

        let genesis_validators_root = state.genesis_validators_root();

        let BeaconState::Phase0(phase0_state) = &state else {
            panic!("the state starts in Phase 0");
        };

        let pubkeys = phase0_state
            .validators
            .iter()
            .map(|validator| validator.pubkey.to_bytes())
            .collect::<Vec<_>>();

        let balances = phase0_state.balances.iter().copied().collect::<Vec<_>>();

        // Into the Altair fork epoch.
        process_slots(&config, &mut state, 8).expect("empty slots can be processed");
        assert_eq!(state.phase(), Phase::Altair);

        // Into the Bellatrix fork epoch.
        process_slots(&config, &mut state, 16).expect("empty slots can be processed");
        assert_eq!(state.phase(), Phase::Bellatrix);

        let BeaconState::Bellatrix(upgraded) = &state else {
            panic!("the state is in Bellatrix after its fork epoch");
        };

        assert_eq!(upgraded.genesis_validators_root, genesis_validators_root);
        assert_eq!(upgraded.validators.len(), pubkeys.len());

        for (validator, pubkey) in upgraded.validators.iter().zip(pubkeys) {
            assert_eq!(validator.pubkey.to_bytes(), pubkey);
        }

        assert_eq!(
            upgraded.balances.len(),
            balances.len(),
        );

        assert_eq!(upgraded.inactivity_scores.len(), 8);
        assert_eq!(upgraded.current_epoch_participation.len(), 8);
        assert_eq!(upgraded.as_ref().current_sync_committee().pubkeys.len(), 32);

        assert_eq!(upgraded.latest_execution_payload_header, Default::default());
    }

    #[test]
    fn blocks_from_a_mismatched_phase_are_rejected() {
        let config = Config::minimal().start_and_stay_in(Phase::Altair);
        let mut state = genesis_state::<Minimal>(&config, 8);

        let block = SignedBeaconBlock::Phase0(Phase0SignedBeaconBlock::default());

        let error = custom_state_transition(
            &config,
            &mut state,
            &block,
            ProcessSlots::Never,
            StateRootPolicy::Trust,
            NullVerifier,
        )
        .expect_err("a Phase 0 block cannot apply to an Altair state");

        assert!(error.to_string().contains("phase"));
    }
}
