use std::sync::Arc;

use clock::BeaconClock;
use execution_engine::ExecutionEngine;
use fork_choice_store::{ChainLink, Error as StoreError, Store};
use helper_functions::accessors;
use log::warn;
use types::{
    combined::{BeaconState, SignedBeaconBlock},
    nonstandard::PayloadStatus,
    phase0::primitives::{Slot, H256},
    preset::Preset,
};

use crate::validator_monitor::ValidatorMonitor;

/// What became of a block handed to [`ConsensusManager::validate_and_insert_block`].
pub enum BlockAction {
    /// The block is now part of the block tree. Carries the roots of branches
    /// that finalization made unviable.
    Accepted { pruned: Vec<H256> },
    Duplicate,
    MissingParent { parent_root: H256 },
    Invalid { reason: String },
}

/// Wires the block tree, the state transition, the execution engine and the
/// validator monitor together. Owned and driven by the consensus thread.
pub struct ConsensusManager<P: Preset, E, M> {
    store: Store<P>,
    execution_engine: E,
    clock: BeaconClock,
    validator_monitor: M,
}

impl<P: Preset, E, M> ConsensusManager<P, E, M>
where
    E: ExecutionEngine<P>,
    M: ValidatorMonitor<P>,
{
    pub fn new(
        store: Store<P>,
        execution_engine: E,
        clock: BeaconClock,
        validator_monitor: M,
    ) -> Self {
        Self {
            store,
            execution_engine,
            clock,
            validator_monitor,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Store<P> {
        &self.store
    }

    #[must_use]
    pub fn store_mut(&mut self) -> &mut Store<P> {
        &mut self.store
    }

    #[must_use]
    pub fn execution_engine(&self) -> &E {
        &self.execution_engine
    }

    #[must_use]
    pub fn wall_slot(&self) -> Slot {
        self.clock
            .current_slot()
            .map(|(_, slot)| slot)
            .unwrap_or_else(|_| self.store.head().slot())
    }

    /// Recomputes the head. Must be called after every successful insertion.
    pub fn update_head(&mut self, wall_slot: Slot) -> H256 {
        self.store.update_head(wall_slot)
    }

    /// Runs the full state transition for `block` against its parent's state
    /// and inserts the result into the block tree.
    ///
    /// The transition runs on a scratch copy of the parent state; a failed
    /// transition leaves the canonical states untouched.
    pub fn validate_and_insert_block(
        &mut self,
        block: &Arc<SignedBeaconBlock<P>>,
        payload_status: PayloadStatus,
    ) -> BlockAction {
        let block_root = block.block_root();
        let parent_root = block.parent_root();

        if self.store.contains_block(block_root) {
            return BlockAction::Duplicate;
        }

        let Some(parent) = self.store.chain_link(parent_root) else {
            return BlockAction::MissingParent { parent_root };
        };

        // Copy-on-write: the transition mutates a scratch state and the
        // result is committed only on success. No rollback machinery needed.
        let mut state = parent.state.as_ref().clone();

        let transition_result = transition_functions::combined::custom_state_transition(
            self.store.chain_config(),
            &mut state,
            block,
            transition_functions::unphased::ProcessSlots::IfNeeded,
            transition_functions::unphased::StateRootPolicy::Verify,
            helper_functions::verifier::MultiVerifier::default(),
        );

        if let Err(error) = transition_result {
            return BlockAction::Invalid {
                reason: format!("{error:#}"),
            };
        }

        let state = Arc::new(state);

        self.register_block_contents(block, &state);

        let link = ChainLink {
            block_root,
            block: block.clone(),
            state,
            payload_status,
        };

        match self.store.insert_block(link) {
            Ok(pruned) => {
                let wall_slot = self.wall_slot();

                if block.message_slot() == wall_slot {
                    self.store.apply_proposer_boost(wall_slot, block_root);
                }

                BlockAction::Accepted { pruned }
            }
            Err(error) => match error.downcast_ref::<StoreError>() {
                Some(StoreError::DuplicateBlock { .. }) => BlockAction::Duplicate,
                Some(StoreError::MissingParent { parent_root, .. }) => {
                    BlockAction::MissingParent {
                        parent_root: *parent_root,
                    }
                }
                _ => BlockAction::Invalid {
                    reason: format!("{error:#}"),
                },
            },
        }
    }

    /// Feeds the block's attestations and sync aggregate into fork choice
    /// and the validator monitor.
    fn register_block_contents(
        &mut self,
        block: &Arc<SignedBeaconBlock<P>>,
        state: &Arc<BeaconState<P>>,
    ) {
        self.validator_monitor.register_beacon_block(block);

        let attestations = match block.as_ref() {
            SignedBeaconBlock::Phase0(block) => &block.message.body.attestations,
            SignedBeaconBlock::Altair(block) => &block.message.body.attestations,
            SignedBeaconBlock::Bellatrix(block) => &block.message.body.attestations,
        };

        for attestation in attestations.iter() {
            let attesting_indices = match state.as_ref() {
                BeaconState::Phase0(state) => {
                    accessors::get_attesting_indices(state.as_ref(), attestation)
                }
                BeaconState::Altair(state) => {
                    accessors::get_attesting_indices(state.as_ref(), attestation)
                }
                BeaconState::Bellatrix(state) => {
                    accessors::get_attesting_indices(state.as_ref(), attestation)
                }
            };

            let Ok(attesting_indices) = attesting_indices else {
                // The transition already validated the attestation;
                // a failure here means the committee caches were pruned.
                warn!(
                    "failed to recompute attesting indices for fork choice \
                     (attestation data: {:?})",
                    attestation.data,
                );
                continue;
            };

            self.validator_monitor
                .register_attestation_in_block(attestation.data, &attesting_indices);

            for validator_index in attesting_indices {
                self.store.apply_attestation(
                    validator_index,
                    attestation.data.target.epoch,
                    attestation.data.beacon_block_root,
                );
            }
        }

        if let Some(sync_aggregate) = block.sync_aggregate() {
            self.validator_monitor.register_sync_aggregate_in_block(
                block.message_slot(),
                sync_aggregate.sync_committee_bits.count_ones(),
            );
        }
    }
}
