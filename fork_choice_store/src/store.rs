use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{ensure, Result};
use helper_functions::accessors;
use itertools::Itertools as _;
use log::debug;
use typenum::Unsigned as _;
use types::{
    combined::{BeaconState, SignedBeaconBlock},
    config::Config,
    nonstandard::{PayloadStatus, RelativeEpoch},
    phase0::{
        containers::Checkpoint,
        primitives::{Epoch, ExecutionBlockHash, Gwei, Slot, ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::{error::Error, misc::{ChainLink, LatestMessage}};

/// The in-memory block tree and LMD-GHOST fork choice state.
///
/// The store is single-writer by design: all mutation happens on the
/// consensus thread that owns it.
pub struct Store<P: Preset> {
    chain_config: Arc<Config>,
    links: HashMap<H256, ChainLink<P>>,
    children: HashMap<H256, Vec<H256>>,
    head: H256,
    anchor_root: H256,
    justified_checkpoint: Checkpoint,
    finalized_checkpoint: Checkpoint,
    latest_messages: HashMap<ValidatorIndex, LatestMessage>,
    proposer_boost: Option<(Slot, H256)>,
    // The earliest block of the canonical chain known to this store.
    // Backfill extends the chain backwards from here.
    backfill_tail: (H256, Slot),
}

impl<P: Preset> Store<P> {
    /// Creates a store anchored at a trusted block and its post-state.
    ///
    /// The anchor is typically genesis or a finalized checkpoint block.
    #[must_use]
    pub fn new(
        chain_config: Arc<Config>,
        anchor_block: Arc<SignedBeaconBlock<P>>,
        anchor_state: Arc<BeaconState<P>>,
        anchor_payload_status: PayloadStatus,
    ) -> Self {
        let anchor_root = anchor_block.block_root();
        let anchor_slot = anchor_block.message_slot();
        let anchor_epoch = anchor_state
            .finalized_checkpoint()
            .epoch
            .max(helper_functions::misc::compute_epoch_at_slot::<P>(anchor_slot));

        let anchor_checkpoint = Checkpoint {
            epoch: anchor_epoch,
            root: anchor_root,
        };

        let link = ChainLink {
            block_root: anchor_root,
            block: anchor_block,
            state: anchor_state,
            payload_status: anchor_payload_status,
        };

        Self {
            chain_config,
            links: HashMap::from([(anchor_root, link)]),
            children: HashMap::new(),
            head: anchor_root,
            anchor_root,
            justified_checkpoint: anchor_checkpoint,
            finalized_checkpoint: anchor_checkpoint,
            latest_messages: HashMap::new(),
            proposer_boost: None,
            backfill_tail: (anchor_root, anchor_slot),
        }
    }

    #[must_use]
    pub fn chain_config(&self) -> &Config {
        &self.chain_config
    }

    #[must_use]
    pub fn contains_block(&self, root: H256) -> bool {
        self.links.contains_key(&root)
    }

    #[must_use]
    pub fn chain_link(&self, root: H256) -> Option<&ChainLink<P>> {
        self.links.get(&root)
    }

    #[must_use]
    pub fn head(&self) -> &ChainLink<P> {
        self.links
            .get(&self.head)
            .expect("the head always refers to a stored block")
    }

    /// The most recent fully verified ancestor of the head.
    ///
    /// This differs from [`Store::head`] while the chain is syncing
    /// optimistically.
    #[must_use]
    pub fn latest_valid_head(&self) -> &ChainLink<P> {
        let mut link = self.head();

        loop {
            if link.is_valid() {
                return link;
            }

            match self.links.get(&link.parent_root()) {
                Some(parent) => link = parent,
                None => return link,
            }
        }
    }

    #[must_use]
    pub const fn justified_checkpoint(&self) -> Checkpoint {
        self.justified_checkpoint
    }

    #[must_use]
    pub const fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    #[must_use]
    pub fn finalized_head(&self) -> &ChainLink<P> {
        let root = self.finalized_root();

        self.links
            .get(&root)
            .expect("the finalized root always refers to a stored block")
    }

    #[must_use]
    pub fn finalized_slot(&self) -> Slot {
        self.finalized_head().slot()
    }

    /// The execution block hash of the most recent finalized block that has one.
    ///
    /// Zero before the merge, as the Engine API requires.
    #[must_use]
    pub fn finalized_execution_block_hash(&self) -> ExecutionBlockHash {
        let mut link = self.finalized_head();

        loop {
            if let Some(block_hash) = link.execution_block_hash() {
                if !block_hash.is_zero() {
                    return block_hash;
                }
            }

            match self.links.get(&link.parent_root()) {
                Some(parent) => link = parent,
                None => return ExecutionBlockHash::zero(),
            }
        }
    }

    /// Inserts a fully validated block.
    ///
    /// Justification and finalization advance based on the checkpoints the
    /// state transition computed. Returns the roots of branches pruned by
    /// finalization; they can never become canonical.
    pub fn insert_block(&mut self, link: ChainLink<P>) -> Result<Vec<H256>> {
        let root = link.block_root;
        let slot = link.slot();
        let parent_root = link.parent_root();

        ensure!(
            !self.contains_block(root),
            Error::DuplicateBlock { root },
        );

        ensure!(
            self.contains_block(parent_root),
            Error::MissingParent { root, parent_root },
        );

        ensure!(
            slot > self.finalized_slot(),
            Error::BlockPrecedesFinalized {
                root,
                slot,
                finalized_slot: self.finalized_slot(),
            },
        );

        let state_justified = link.state.current_justified_checkpoint();
        let state_finalized = link.state.finalized_checkpoint();

        self.children.entry(parent_root).or_default().push(root);
        self.links.insert(root, link);

        if state_justified.epoch > self.justified_checkpoint.epoch {
            self.justified_checkpoint = state_justified;
        }

        let mut pruned = vec![];

        if state_finalized.epoch > self.finalized_checkpoint.epoch {
            self.finalized_checkpoint = state_finalized;
            pruned = self.prune_finalized();
        }

        Ok(pruned)
    }

    /// Registers an attestation for fork choice.
    /// Older votes from the same validator are ignored.
    pub fn apply_attestation(
        &mut self,
        validator_index: ValidatorIndex,
        epoch: Epoch,
        root: H256,
    ) {
        let message = LatestMessage { epoch, root };

        match self.latest_messages.entry(validator_index) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                if entry.get().epoch < epoch {
                    entry.insert(message);
                }
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(message);
            }
        }
    }

    /// Temporarily boosts the block proposed in the current slot.
    ///
    /// [`proposer-boost`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#get_weight)
    pub fn apply_proposer_boost(&mut self, slot: Slot, root: H256) {
        self.proposer_boost = Some((slot, root));
    }

    pub fn set_payload_status(&mut self, root: H256, payload_status: PayloadStatus) {
        if let Some(link) = self.links.get_mut(&root) {
            link.payload_status = payload_status;
        }
    }

    /// Recomputes the head with LMD-GHOST, walking from the justified block
    /// towards the leaves along the heaviest edges.
    pub fn update_head(&mut self, wall_slot: Slot) -> H256 {
        let balance_source = self.justified_or_anchor_link();
        let balances = self.effective_balances(&balance_source);
        let boost_weight = self.proposer_boost_weight(wall_slot, &balances);

        let mut head = balance_source.block_root;

        loop {
            let Some(children) = self.children.get(&head) else {
                break;
            };

            let viable_children = children
                .iter()
                .copied()
                .filter(|child| {
                    self.links
                        .get(child)
                        .map(|link| !link.is_invalid())
                        .unwrap_or(false)
                })
                .collect_vec();

            let Some(heaviest) = viable_children
                .into_iter()
                // Ties are broken by preferring the lexicographically greatest root.
                .max_by_key(|child| (self.weight(*child, &balances, boost_weight), *child))
            else {
                break;
            };

            head = heaviest;
        }

        if head != self.head {
            debug!(
                "fork choice head changed to {head} at slot {}",
                self.links[&head].slot(),
            );
        }

        self.head = head;
        head
    }

    /// True if `descendant_root` has `ancestor_root` as an ancestor or is it.
    #[must_use]
    pub fn is_descendant(&self, descendant_root: H256, ancestor_root: H256) -> bool {
        let Some(ancestor) = self.links.get(&ancestor_root) else {
            return false;
        };

        let mut current = descendant_root;

        loop {
            if current == ancestor_root {
                return true;
            }

            match self.links.get(&current) {
                Some(link) if link.slot() > ancestor.slot() => current = link.parent_root(),
                _ => return false,
            }
        }
    }

    /// Extends the canonical chain backwards with a block retrieved during
    /// backfill sync. The block must be the parent of the earliest known one.
    pub fn add_backfill_block(&mut self, block: Arc<SignedBeaconBlock<P>>) -> Result<()> {
        let root = block.block_root();
        let (tail_root, tail_slot) = self.backfill_tail;

        let expected_root = self
            .links
            .get(&tail_root)
            .map(ChainLink::parent_root)
            .unwrap_or(tail_root);

        ensure!(
            root == expected_root || self.contains_block(root),
            Error::BackfillChainMismatch {
                root,
                expected_root,
            },
        );

        if root == expected_root && !self.contains_block(root) {
            debug!(
                "backfilled block {root} at slot {} (chain tail was at slot {tail_slot})",
                block.message_slot(),
            );

            self.backfill_tail = (root, block.message_slot());
        }

        Ok(())
    }

    fn weight(
        &self,
        root: H256,
        balances: &HashMap<ValidatorIndex, Gwei>,
        boost_weight: Option<(H256, Gwei)>,
    ) -> Gwei {
        let mut weight = self
            .latest_messages
            .iter()
            .filter(|(_, message)| self.is_descendant(message.root, root))
            .filter_map(|(validator_index, _)| balances.get(validator_index))
            .sum();

        if let Some((boost_root, boost)) = boost_weight {
            if self.is_descendant(boost_root, root) {
                weight += boost;
            }
        }

        weight
    }

    fn proposer_boost_weight(
        &self,
        wall_slot: Slot,
        balances: &HashMap<ValidatorIndex, Gwei>,
    ) -> Option<(H256, Gwei)> {
        let (boost_slot, boost_root) = self.proposer_boost?;

        if boost_slot != wall_slot {
            return None;
        }

        let committee_weight =
            balances.values().sum::<Gwei>() / P::SlotsPerEpoch::U64;
        let boost = committee_weight * self.chain_config.proposer_score_boost / 100;

        Some((boost_root, boost))
    }

    fn effective_balances(&self, source: &ChainLink<P>) -> HashMap<ValidatorIndex, Gwei> {
        match source.state.as_ref() {
            BeaconState::Phase0(state) => Self::active_balances(state.as_ref()),
            BeaconState::Altair(state) => Self::active_balances(state.as_ref()),
            BeaconState::Bellatrix(state) => Self::active_balances(state.as_ref()),
        }
    }

    fn active_balances(
        state: &impl types::traits::BeaconState<P>,
    ) -> HashMap<ValidatorIndex, Gwei> {
        accessors::active_validator_indices_ordered(state, RelativeEpoch::Current)
            .iter()
            .map(|validator_index| {
                let balance = accessors::effective_balance(state, *validator_index)
                    .unwrap_or_default();
                (*validator_index, balance)
            })
            .collect()
    }

    fn justified_or_anchor_link(&self) -> ChainLink<P> {
        let justified_root = self.justified_checkpoint.root;

        let root = if !justified_root.is_zero() && self.contains_block(justified_root) {
            justified_root
        } else {
            self.finalized_root()
        };

        self.links
            .get(&root)
            .expect("fork choice always starts from a stored block")
            .clone()
    }

    fn finalized_root(&self) -> H256 {
        let root = self.finalized_checkpoint.root;

        if !root.is_zero() && self.contains_block(root) {
            root
        } else {
            self.anchor_root
        }
    }

    /// Drops blocks that can no longer become canonical:
    /// everything before the finalized slot and every branch that does not
    /// descend from the finalized block. Returns the non-canonical roots.
    fn prune_finalized(&mut self) -> Vec<H256> {
        let finalized_root = self.finalized_root();
        let finalized_slot = self.links[&finalized_root].slot();

        let (kept, pruned): (Vec<_>, Vec<_>) = self
            .links
            .keys()
            .copied()
            .partition(|root| {
                *root == finalized_root || self.is_viable_after_pruning(*root, finalized_root, finalized_slot)
            });

        let unviable = pruned
            .iter()
            .copied()
            .filter(|root| self.links[root].slot() >= finalized_slot)
            .collect_vec();

        for root in &pruned {
            self.links.remove(root);
            self.children.remove(root);
        }

        for children in self.children.values_mut() {
            children.retain(|child| !pruned.contains(child));
        }

        // The finalized block becomes the new effective anchor.
        self.anchor_root = finalized_root;
        self.backfill_tail = (finalized_root, finalized_slot);

        if !self.links.contains_key(&self.head) {
            self.head = finalized_root;
        }

        debug!(
            "pruned {} blocks behind finalized slot {finalized_slot} (kept {})",
            pruned.len(),
            kept.len(),
        );

        unviable
    }

    fn is_viable_after_pruning(
        &self,
        root: H256,
        finalized_root: H256,
        finalized_slot: Slot,
    ) -> bool {
        let link = &self.links[&root];
        link.slot() > finalized_slot && self.is_descendant(root, finalized_root)
    }
}
