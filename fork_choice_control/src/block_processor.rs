use core::time::Duration;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use execution_engine::{ExecutionEngine, PayloadStatusV1, PayloadValidationStatus};
use futures::{
    channel::{mpsc, oneshot},
    StreamExt as _,
};
use log::{debug, info, warn};
use types::{
    combined::SignedBeaconBlock,
    nonstandard::PayloadStatus,
    phase0::primitives::{ExecutionBlockHash, H256},
    preset::Preset,
};

use crate::{
    consensus_manager::{BlockAction, ConsensusManager},
    misc::{BlockEntry, BlockOrigin, BlockOutcome},
    quarantine::{Quarantine, QuarantineConfig},
    validator_monitor::ValidatorMonitor,
};

/// How far behind the optimistic head the verified head may fall before
/// `forkchoiceUpdated` switches to following the optimistic head directly.
pub const VERIFIED_HEAD_PREFERENCE_SLOTS: u64 = 256;

/// How long the loop yields to the runtime between iterations so network
/// tasks can make progress even under a sustained block backlog.
const IDLE_YIELD: Duration = Duration::from_millis(10);

/// How long to wait for the engine to acknowledge a fork choice update.
/// Timeouts are non-fatal; the engine catches up on the next update.
const FORKCHOICE_UPDATED_TIMEOUT: Duration = Duration::from_millis(650);

enum QueueMessage<P: Preset> {
    Block(BlockEntry<P>),
    Stop,
}

/// Accepts blocks from other tasks without blocking them.
///
/// The queue is unbounded by contract: producers are expected to await each
/// block's result future before submitting more. A producer that does not is
/// buggy, not backpressured.
#[derive(Clone)]
pub struct BlockProcessorHandle<P: Preset> {
    queue_tx: mpsc::UnboundedSender<QueueMessage<P>>,
    queue_length: Arc<AtomicUsize>,
}

impl<P: Preset> BlockProcessorHandle<P> {
    pub fn add_block(&self, entry: BlockEntry<P>) {
        self.queue_length.fetch_add(1, Ordering::SeqCst);

        if self.queue_tx.unbounded_send(QueueMessage::Block(entry)).is_err() {
            self.queue_length.fetch_sub(1, Ordering::SeqCst);
            debug!("block processor has shut down; dropping submitted block");
        }
    }

    /// True while any submitted block has not been fully processed.
    #[must_use]
    pub fn has_blocks(&self) -> bool {
        self.queue_length.load(Ordering::SeqCst) > 0
    }

    /// Asks the processor to stop. Queued blocks resolve with
    /// [`BlockOutcome::Cancelled`].
    pub fn stop(&self) {
        let _ = self.queue_tx.unbounded_send(QueueMessage::Stop);
    }
}

/// The single consumer of the block queue.
///
/// All consensus state mutation happens here, on one task, at well-defined
/// suspension points: the queue wait, execution engine calls, and the idle
/// yield between iterations.
pub struct BlockProcessor<P: Preset, E, M> {
    manager: ConsensusManager<P, E, M>,
    quarantine: Quarantine<P>,
    queue_tx: mpsc::UnboundedSender<QueueMessage<P>>,
    queue_rx: mpsc::UnboundedReceiver<QueueMessage<P>>,
    queue_length: Arc<AtomicUsize>,
}

impl<P: Preset, E, M> BlockProcessor<P, E, M>
where
    E: ExecutionEngine<P>,
    M: ValidatorMonitor<P>,
{
    #[must_use]
    pub fn new(manager: ConsensusManager<P, E, M>, quarantine_config: QuarantineConfig) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded();

        Self {
            manager,
            quarantine: Quarantine::new(quarantine_config),
            queue_tx,
            queue_rx,
            queue_length: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn handle(&self) -> BlockProcessorHandle<P> {
        BlockProcessorHandle {
            queue_tx: self.queue_tx.clone(),
            queue_length: self.queue_length.clone(),
        }
    }

    #[must_use]
    pub fn manager(&self) -> &ConsensusManager<P, E, M> {
        &self.manager
    }

    #[must_use]
    pub fn quarantine(&self) -> &Quarantine<P> {
        &self.quarantine
    }

    #[must_use]
    pub fn has_blocks(&self) -> bool {
        self.queue_length.load(Ordering::SeqCst) > 0
    }

    /// Submits a block from the consensus thread itself.
    ///
    /// Blocks at or below the finalized slot bypass the queue entirely and
    /// go through the synchronous backfill path.
    pub fn add_block(&mut self, mut entry: BlockEntry<P>) {
        if entry.block.message_slot() <= self.manager.store().finalized_slot() {
            let outcome = self.store_backfill_block(&entry.block);
            entry.resolve(outcome);
            return;
        }

        self.queue_length.fetch_add(1, Ordering::SeqCst);

        if self
            .queue_tx
            .unbounded_send(QueueMessage::Block(entry))
            .is_err()
        {
            self.queue_length.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Runs the consumer loop until [`BlockProcessorHandle::stop`] is called
    /// or every handle is dropped.
    pub async fn run(&mut self) {
        loop {
            // Let networking make progress even when the queue never drains.
            tokio::time::sleep(IDLE_YIELD).await;

            match self.queue_rx.next().await {
                Some(QueueMessage::Block(entry)) => {
                    self.process_entry(entry).await;
                    self.queue_length.fetch_sub(1, Ordering::SeqCst);
                }
                Some(QueueMessage::Stop) | None => break,
            }
        }

        // Drain whatever is left so every result future resolves.
        while let Ok(Some(message)) = self.queue_rx.try_next() {
            if let QueueMessage::Block(mut entry) = message {
                entry.resolve(BlockOutcome::Cancelled);
                self.queue_length.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    async fn process_entry(&mut self, mut entry: BlockEntry<P>) {
        let block = entry.block.clone();
        let slot = block.message_slot();
        let block_root = block.block_root();

        // Blocks from before finalization go through backfill even when they
        // arrive through the queue.
        if slot <= self.manager.store().finalized_slot()
            && !self.manager.store().contains_block(block_root)
        {
            let outcome = self.store_backfill_block(&block);
            entry.resolve(outcome);
            return;
        }

        // Execution payloads are sent to the engine before consensus
        // validation so both can proceed concurrently on the engine side.
        let payload_status = match self.notify_new_payload(&block).await {
            Some(status) => status,
            // Pre-Bellatrix blocks and default payloads are vacuously valid.
            None => PayloadStatusV1 {
                status: PayloadValidationStatus::Valid,
                latest_valid_hash: None,
                validation_error: None,
            },
        };

        if entry.origin.is_optimistic_sync() {
            // The payload was already executed during optimistic sync;
            // only fork choice needs to hear about it.
            self.optimistic_sync_forkchoice_update(&block).await;
            entry.resolve(BlockOutcome::Accepted);
            return;
        }

        if payload_status.status.is_invalid() {
            warn!(
                "execution engine rejected payload of block {block_root} at slot {slot}: {:?}",
                payload_status.validation_error,
            );

            self.quarantine.mark_unviable(block_root);
            entry.resolve(BlockOutcome::Invalid(format!(
                "execution payload is invalid: {:?}",
                payload_status.validation_error,
            )));

            return;
        }

        if payload_status.status.is_syncing_or_accepted() {
            // The execution layer cannot attest to this payload yet.
            // Have sync treat the block as if its parent were missing.
            entry.resolve(BlockOutcome::MissingParent {
                parent_root: block.parent_root(),
            });

            return;
        }

        let outcome = self.store_block(&block, PayloadStatus::Valid, entry.validation_duration);
        let accepted = outcome == BlockOutcome::Accepted;
        entry.resolve(outcome);

        if accepted {
            self.forkchoice_updated_after_store().await;
            self.reenqueue_children(block_root);
        }
    }

    /// Step 4 of the consumer contract: an optimistic-sync block skips
    /// storage and only moves the engine's fork choice forward.
    async fn optimistic_sync_forkchoice_update(&mut self, block: &Arc<SignedBeaconBlock<P>>) {
        let Some(payload_hash) = block.execution_block_hash() else {
            return;
        };

        let verified_head = self.manager.store().latest_valid_head();
        let optimistic_head_slot = block.message_slot();

        let head_hash = if verified_head.slot() + VERIFIED_HEAD_PREFERENCE_SLOTS
            >= optimistic_head_slot
        {
            verified_head
                .execution_block_hash()
                .filter(|block_hash| !block_hash.is_zero())
                .unwrap_or(payload_hash)
        } else {
            payload_hash
        };

        let finalized_hash = self.manager.store().finalized_execution_block_hash();

        self.send_forkchoice_updated(head_hash, finalized_hash).await;
    }

    /// Runs consensus validation and integrates the block with fork choice
    /// and the quarantine.
    fn store_block(
        &mut self,
        block: &Arc<SignedBeaconBlock<P>>,
        payload_status: PayloadStatus,
        validation_duration: Duration,
    ) -> BlockOutcome {
        let block_root = block.block_root();
        let parent_root = block.parent_root();
        let slot = block.message_slot();
        let started_at = std::time::Instant::now();

        self.quarantine.remove_missing(block_root);
        self.quarantine.remove_orphan(block_root);

        if self.quarantine.is_unviable(parent_root) || self.quarantine.is_unviable(block_root) {
            self.quarantine.mark_unviable(block_root);
            return BlockOutcome::UnviableFork;
        }

        match self.manager.validate_and_insert_block(block, payload_status) {
            BlockAction::Accepted { pruned } => {
                for root in pruned {
                    self.quarantine.mark_unviable(root);
                }

                let wall_slot = self.manager.wall_slot();
                self.manager.update_head(wall_slot);

                info!(
                    "accepted block at slot {slot} \
                     (root {block_root}, proposer {}, validation {validation_duration:?}, \
                     store {:?})",
                    block.proposer_index(),
                    started_at.elapsed(),
                );

                BlockOutcome::Accepted
            }
            BlockAction::Duplicate => BlockOutcome::Duplicate,
            BlockAction::MissingParent { parent_root } => {
                let finalized_slot = self.manager.store().finalized_slot();

                if !self.quarantine.add_orphan(finalized_slot, block.clone()) {
                    debug!("block {block_root} at slot {slot} could not be quarantined");
                }

                BlockOutcome::MissingParent { parent_root }
            }
            BlockAction::Invalid { reason } => {
                warn!(
                    "rejected block at slot {slot} \
                     (root {block_root}, proposer {}, validation {validation_duration:?}): \
                     {reason}",
                    block.proposer_index(),
                );

                BlockOutcome::Invalid(reason)
            }
        }
    }

    /// Re-submits quarantined children of a newly stored block,
    /// preserving their discovery order.
    fn reenqueue_children(&mut self, parent_root: H256) {
        for child in self.quarantine.pop_children(parent_root) {
            debug!(
                "reprocessing quarantined block {} now that its parent is known",
                child.block_root(),
            );

            self.add_block(BlockEntry {
                origin: BlockOrigin::Requested,
                block: child,
                result_tx: None,
                validation_duration: Duration::ZERO,
            });
        }
    }

    /// Sends the block's payload to the execution engine and waits for its
    /// verdict. Returns `None` when there is nothing to execute.
    async fn notify_new_payload(
        &mut self,
        block: &Arc<SignedBeaconBlock<P>>,
    ) -> Option<PayloadStatusV1> {
        let payload = block.execution_payload()?;

        if payload.is_default_payload() {
            return None;
        }

        let (sender, receiver) = oneshot::channel();

        let send_result = self.manager.execution_engine().notify_new_payload(
            block.block_root(),
            payload.clone(),
            Some(sender),
        );

        if let Err(error) = send_result {
            warn!("failed to reach execution engine: {error:#}; assuming it is syncing");
            return Some(PayloadStatusV1::synthetic_syncing());
        }

        match receiver.await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(error)) => {
                warn!("execution engine request failed: {error:#}; assuming it is syncing");
                Some(PayloadStatusV1::synthetic_syncing())
            }
            Err(_) => Some(PayloadStatusV1::synthetic_syncing()),
        }
    }

    async fn forkchoice_updated_after_store(&mut self) {
        let head = self.manager.store().head();
        let Some(head_hash) = head.execution_block_hash() else {
            return;
        };

        if head_hash.is_zero() {
            return;
        }

        let finalized_hash = self.manager.store().finalized_execution_block_hash();

        self.send_forkchoice_updated(head_hash, finalized_hash).await;
    }

    async fn send_forkchoice_updated(
        &mut self,
        head_hash: ExecutionBlockHash,
        finalized_hash: ExecutionBlockHash,
    ) {
        let (sender, receiver) = oneshot::channel();

        self.manager.execution_engine().notify_forkchoice_updated(
            head_hash,
            head_hash,
            finalized_hash,
            None,
            Some(sender),
        );

        match tokio::time::timeout(FORKCHOICE_UPDATED_TIMEOUT, receiver).await {
            Ok(_) => {}
            Err(_) => {
                warn!(
                    "execution engine did not acknowledge forkchoiceUpdated \
                     within {FORKCHOICE_UPDATED_TIMEOUT:?}",
                );
            }
        }
    }

    fn store_backfill_block(&mut self, block: &Arc<SignedBeaconBlock<P>>) -> BlockOutcome {
        match self.manager.store_mut().add_backfill_block(block.clone()) {
            Ok(()) => BlockOutcome::Accepted,
            Err(error) => BlockOutcome::Invalid(format!("{error:#}")),
        }
    }
}


#[cfg(test)]
mod tests {
    use core::num::NonZeroU64;

    use clock::BeaconClock;
    use execution_engine::{MockExecutionEngine, NullExecutionEngine, PayloadStatusV1};
    use fork_choice_store::Store;
    use helper_functions::{accessors, misc, signing::SignForSingleFork as _};
    use ssz::SszHash as _;
    use types::{
        combined::{BeaconState, SignedBeaconBlock},
        config::Config,
        phase0::{
            containers::{BeaconBlock, SignedBeaconBlock as Phase0SignedBeaconBlock},
            primitives::{Slot, H256},
        },
        preset::Minimal,
    };

    use crate::{
        consensus_manager::ConsensusManager, quarantine::QuarantineConfig,
        validator_monitor::NullValidatorMonitor,
    };

    use super::*;

    type TestProcessor<E> = BlockProcessor<Minimal, E, NullValidatorMonitor>;

    fn config() -> Arc<Config> {
        Arc::new(Config::minimal())
    }

    fn genesis<E: ExecutionEngine<Minimal>>(
        config: Arc<Config>,
        execution_engine: E,
    ) -> (TestProcessor<E>, Arc<BeaconState<Minimal>>) {
        let state = Arc::new(
            interop::quick_start_beacon_state::<Minimal>(
                &config,
                0,
                NonZeroU64::new(8).expect("the validator count is nonzero"),
            )
            .expect("the genesis state can be built"),
        );

        let anchor_block = Arc::new(SignedBeaconBlock::Phase0(Phase0SignedBeaconBlock {
            message: BeaconBlock {
                state_root: state.hash_tree_root(),
                ..BeaconBlock::default()
            },
            signature: Default::default(),
        }));

        let store = Store::new(
            config.clone(),
            anchor_block,
            state.clone(),
            types::nonstandard::PayloadStatus::Valid,
        );

        let clock = BeaconClock::new(&config, 0);

        let manager =
            ConsensusManager::new(store, execution_engine, clock, NullValidatorMonitor);

        (
            BlockProcessor::new(manager, QuarantineConfig::default()),
            state,
        )
    }

    /// Builds a signed empty block extending `state`, with a correct
    /// state root computed by applying the block to a scratch copy.
    fn empty_block_on(
        config: &Config,
        state: &BeaconState<Minimal>,
        slot: Slot,
    ) -> (Arc<SignedBeaconBlock<Minimal>>, Arc<BeaconState<Minimal>>) {
        let mut advanced = state.clone();

        if advanced.slot() < slot {
            transition_functions::combined::process_slots(config, &mut advanced, slot)
                .expect("empty slots can be processed");
        }

        let BeaconState::Phase0(advanced_concrete) = &advanced else {
            panic!("these tests only produce Phase 0 blocks");
        };

        let proposer_index = accessors::get_beacon_proposer_index(advanced_concrete.as_ref())
            .expect("the proposer can be computed");

        let secret_key = interop::secret_key(proposer_index);
        let epoch = misc::compute_epoch_at_slot::<Minimal>(slot);

        let mut message = BeaconBlock::<Minimal> {
            slot,
            proposer_index,
            parent_root: advanced_concrete
                .latest_block_header
                .hash_tree_root(),
            state_root: H256::zero(),
            ..BeaconBlock::default()
        };

        message.body.randao_reveal = secret_key
            .sign(
                helper_functions::signing::RandaoEpoch::from(epoch)
                    .signing_root(config, advanced_concrete.as_ref()),
            )
            .into();

        message.body.eth1_data = advanced_concrete.eth1_data;

        let mut post = state.clone();

        let unsigned = SignedBeaconBlock::Phase0(Phase0SignedBeaconBlock {
            message: message.clone(),
            signature: Default::default(),
        });

        transition_functions::combined::custom_state_transition(
            config,
            &mut post,
            &unsigned,
            transition_functions::unphased::ProcessSlots::IfNeeded,
            transition_functions::unphased::StateRootPolicy::Trust,
            helper_functions::verifier::NullVerifier,
        )
        .expect("the block applies to a scratch copy");

        message.state_root = post.hash_tree_root();

        let signature = secret_key
            .sign(message.signing_root(config, advanced_concrete.as_ref()))
            .into();

        let block = Arc::new(SignedBeaconBlock::Phase0(Phase0SignedBeaconBlock {
            message,
            signature,
        }));

        (block, Arc::new(post))
    }

    fn entry(
        block: Arc<SignedBeaconBlock<Minimal>>,
        origin: BlockOrigin,
    ) -> (BlockEntry<Minimal>, oneshot::Receiver<BlockOutcome>) {
        let (result_tx, result_rx) = oneshot::channel();

        let entry = BlockEntry {
            origin,
            block,
            result_tx: Some(result_tx),
            validation_duration: Duration::ZERO,
        };

        (entry, result_rx)
    }

    fn outcome(mut receiver: oneshot::Receiver<BlockOutcome>) -> BlockOutcome {
        receiver
            .try_recv()
            .expect("the processor never drops result senders")
            .expect("the result has been resolved")
    }

    #[tokio::test]
    async fn orphans_rejoin_once_their_parent_lands() {
        let config = config();
        let (mut processor, genesis_state) = genesis(config.clone(), NullExecutionEngine);

        let (block_a, state_a) = empty_block_on(&config, &genesis_state, 1);
        let (block_b, _) = empty_block_on(&config, &state_a, 2);

        let root_a = block_a.block_root();
        let root_b = block_b.block_root();

        // The child arrives first and has to wait in the quarantine.
        let (entry_b, rx_b) = entry(block_b, BlockOrigin::Sync);
        processor.process_entry(entry_b).await;

        assert_eq!(
            outcome(rx_b),
            BlockOutcome::MissingParent { parent_root: root_a },
        );
        assert!(processor.quarantine().contains_orphan(root_b));
        assert!(!processor.manager().store().contains_block(root_b));

        // The parent arrives and pulls the child out of the quarantine.
        let (entry_a, rx_a) = entry(block_a, BlockOrigin::Sync);
        processor.process_entry(entry_a).await;

        assert_eq!(outcome(rx_a), BlockOutcome::Accepted);

        while let Ok(Some(message)) = processor.queue_rx.try_next() {
            if let QueueMessage::Block(queued) = message {
                processor.process_entry(queued).await;
            }
        }

        assert!(processor.manager().store().contains_block(root_a));
        assert!(processor.manager().store().contains_block(root_b));
        assert!(!processor.quarantine().contains_orphan(root_b));
        assert_eq!(processor.manager().store().head().block_root, root_b);
    }

    #[tokio::test]
    async fn unviability_propagates_to_descendants() {
        let config = config();
        let (mut processor, genesis_state) = genesis(config.clone(), NullExecutionEngine);

        let (block_a, state_a) = empty_block_on(&config, &genesis_state, 1);
        let (block_c, _) = empty_block_on(&config, &state_a, 2);

        let root_c = block_c.block_root();

        // `block_a` turns out to be on a dead branch.
        processor.quarantine.mark_unviable(block_a.block_root());

        let (entry_c, rx_c) = entry(block_c, BlockOrigin::Sync);
        processor.process_entry(entry_c).await;

        assert_eq!(outcome(rx_c), BlockOutcome::UnviableFork);
        assert!(processor.quarantine().is_unviable(root_c));
        assert!(!processor.quarantine().contains_orphan(root_c));
        assert!(!processor.manager().store().contains_block(root_c));
    }

    #[tokio::test]
    async fn optimistic_sync_blocks_only_move_the_engine_head() {
        use types::bellatrix::containers::SignedBeaconBlock as BellatrixSignedBeaconBlock;

        let config = config();

        let engine = Arc::new(MockExecutionEngine::new(PayloadStatusV1 {
            status: PayloadValidationStatus::Valid,
            latest_valid_hash: None,
            validation_error: None,
        }));

        let (mut processor, _) = genesis(config, engine.clone());

        let mut block = BellatrixSignedBeaconBlock::<Minimal>::default();
        block.message.slot = 1000;
        block.message.body.execution_payload.block_hash = H256::repeat_byte(0xaa);

        let block = Arc::new(SignedBeaconBlock::Bellatrix(block));
        let block_root = block.block_root();

        let (optimistic_entry, rx) = entry(block, BlockOrigin::OptimisticSync);
        processor.process_entry(optimistic_entry).await;

        assert_eq!(outcome(rx), BlockOutcome::Accepted);
        assert!(!processor.manager().store().contains_block(block_root));

        let calls = engine.calls();

        assert_eq!(calls.len(), 2);

        assert_eq!(
            calls[0],
            execution_engine::EngineCall::NewPayload {
                block_root,
                block_hash: H256::repeat_byte(0xaa),
            },
        );

        assert_eq!(
            calls[1],
            execution_engine::EngineCall::ForkChoiceUpdated {
                head_block_hash: H256::repeat_byte(0xaa),
                safe_block_hash: H256::repeat_byte(0xaa),
                finalized_block_hash: H256::zero(),
            },
        );
    }

    #[tokio::test]
    async fn stopping_resolves_queued_blocks_with_cancelled() {
        let config = config();
        let (mut processor, genesis_state) = genesis(config.clone(), NullExecutionEngine);

        let (block_a, _) = empty_block_on(&config, &genesis_state, 1);

        let handle = processor.handle();

        handle.stop();

        let (queued_entry, rx) = entry(block_a, BlockOrigin::Gossip);
        handle.add_block(queued_entry);

        assert!(handle.has_blocks());

        processor.run().await;

        assert_eq!(outcome(rx), BlockOutcome::Cancelled);
        assert!(!handle.has_blocks());
    }

    #[tokio::test]
    async fn duplicate_blocks_are_idempotent_successes() {
        let config = config();
        let (mut processor, genesis_state) = genesis(config.clone(), NullExecutionEngine);

        let (block_a, _) = empty_block_on(&config, &genesis_state, 1);

        let (first_entry, first_rx) = entry(block_a.clone(), BlockOrigin::Gossip);
        processor.process_entry(first_entry).await;
        assert_eq!(outcome(first_rx), BlockOutcome::Accepted);

        let (second_entry, second_rx) = entry(block_a, BlockOrigin::Sync);
        processor.process_entry(second_entry).await;
        assert_eq!(outcome(second_rx), BlockOutcome::Duplicate);
    }
}
