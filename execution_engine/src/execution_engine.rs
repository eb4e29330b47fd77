use std::sync::{Arc, Mutex};

use anyhow::Result;
use futures::channel::oneshot::Sender;
use types::{
    bellatrix::containers::ExecutionPayload,
    phase0::primitives::{ExecutionBlockHash, H256},
    preset::Preset,
};

use crate::types::{PayloadAttributesV1, PayloadId, PayloadStatusV1};

/// The calls the consensus side makes into the execution layer.
///
/// Calls are completed through the optional `sender` so implementations are
/// free to do the work on another task. Callers that do not need the response
/// pass `None`.
pub trait ExecutionEngine<P: Preset> {
    const IS_NULL: bool;

    /// [`notify_new_payload`](https://github.com/ethereum/consensus-specs/blob/1bfefe301da592375e2e02f65849a96aadec1936/specs/bellatrix/beacon-chain.md#notify_new_payload)
    fn notify_new_payload(
        &self,
        block_root: H256,
        payload: ExecutionPayload<P>,
        sender: Option<Sender<Result<PayloadStatusV1>>>,
    ) -> Result<()>;

    /// [`notify_forkchoice_updated`](https://github.com/ethereum/consensus-specs/blob/1bfefe301da592375e2e02f65849a96aadec1936/specs/bellatrix/fork-choice.md#notify_forkchoice_updated)
    fn notify_forkchoice_updated(
        &self,
        head_block_hash: ExecutionBlockHash,
        safe_block_hash: ExecutionBlockHash,
        finalized_block_hash: ExecutionBlockHash,
        payload_attributes: Option<PayloadAttributesV1>,
        sender: Option<Sender<Option<PayloadId>>>,
    );
}

impl<P: Preset, E: ExecutionEngine<P>> ExecutionEngine<P> for &E {
    const IS_NULL: bool = E::IS_NULL;

    fn notify_new_payload(
        &self,
        block_root: H256,
        payload: ExecutionPayload<P>,
        sender: Option<Sender<Result<PayloadStatusV1>>>,
    ) -> Result<()> {
        (*self).notify_new_payload(block_root, payload, sender)
    }

    fn notify_forkchoice_updated(
        &self,
        head_block_hash: ExecutionBlockHash,
        safe_block_hash: ExecutionBlockHash,
        finalized_block_hash: ExecutionBlockHash,
        payload_attributes: Option<PayloadAttributesV1>,
        sender: Option<Sender<Option<PayloadId>>>,
    ) {
        (*self).notify_forkchoice_updated(
            head_block_hash,
            safe_block_hash,
            finalized_block_hash,
            payload_attributes,
            sender,
        )
    }
}

impl<P: Preset, E: ExecutionEngine<P>> ExecutionEngine<P> for Arc<E> {
    const IS_NULL: bool = E::IS_NULL;

    fn notify_new_payload(
        &self,
        block_root: H256,
        payload: ExecutionPayload<P>,
        sender: Option<Sender<Result<PayloadStatusV1>>>,
    ) -> Result<()> {
        self.as_ref().notify_new_payload(block_root, payload, sender)
    }

    fn notify_forkchoice_updated(
        &self,
        head_block_hash: ExecutionBlockHash,
        safe_block_hash: ExecutionBlockHash,
        finalized_block_hash: ExecutionBlockHash,
        payload_attributes: Option<PayloadAttributesV1>,
        sender: Option<Sender<Option<PayloadId>>>,
    ) {
        self.as_ref().notify_forkchoice_updated(
            head_block_hash,
            safe_block_hash,
            finalized_block_hash,
            payload_attributes,
            sender,
        )
    }
}

/// Stands in for the execution layer before the merge and in tests that
/// never reach Bellatrix.
#[derive(Clone, Copy)]
pub struct NullExecutionEngine;

impl<P: Preset> ExecutionEngine<P> for NullExecutionEngine {
    const IS_NULL: bool = true;

    fn notify_new_payload(
        &self,
        _block_root: H256,
        _payload: ExecutionPayload<P>,
        sender: Option<Sender<Result<PayloadStatusV1>>>,
    ) -> Result<()> {
        if let Some(sender) = sender {
            let _ = sender.send(Ok(PayloadStatusV1::synthetic_syncing()));
        }

        Ok(())
    }

    fn notify_forkchoice_updated(
        &self,
        _head_block_hash: ExecutionBlockHash,
        _safe_block_hash: ExecutionBlockHash,
        _finalized_block_hash: ExecutionBlockHash,
        _payload_attributes: Option<PayloadAttributesV1>,
        sender: Option<Sender<Option<PayloadId>>>,
    ) {
        if let Some(sender) = sender {
            let _ = sender.send(None);
        }
    }
}

/// A call recorded by [`MockExecutionEngine`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum EngineCall {
    NewPayload {
        block_root: H256,
        block_hash: ExecutionBlockHash,
    },
    ForkChoiceUpdated {
        head_block_hash: ExecutionBlockHash,
        safe_block_hash: ExecutionBlockHash,
        finalized_block_hash: ExecutionBlockHash,
    },
}

/// Completes every call immediately with a scripted payload status
/// and records the calls for inspection.
pub struct MockExecutionEngine {
    payload_status: Mutex<PayloadStatusV1>,
    calls: Mutex<Vec<EngineCall>>,
}

impl MockExecutionEngine {
    #[must_use]
    pub fn new(payload_status: PayloadStatusV1) -> Self {
        Self {
            payload_status: Mutex::new(payload_status),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn set_payload_status(&self, payload_status: PayloadStatusV1) {
        *self
            .payload_status
            .lock()
            .expect("mock engine mutex is poisoned") = payload_status;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls
            .lock()
            .expect("mock engine mutex is poisoned")
            .clone()
    }

    fn record(&self, call: EngineCall) {
        self.calls
            .lock()
            .expect("mock engine mutex is poisoned")
            .push(call);
    }
}

impl<P: Preset> ExecutionEngine<P> for MockExecutionEngine {
    const IS_NULL: bool = false;

    fn notify_new_payload(
        &self,
        block_root: H256,
        payload: ExecutionPayload<P>,
        sender: Option<Sender<Result<PayloadStatusV1>>>,
    ) -> Result<()> {
        self.record(EngineCall::NewPayload {
            block_root,
            block_hash: payload.block_hash,
        });

        if let Some(sender) = sender {
            let status = self
                .payload_status
                .lock()
                .expect("mock engine mutex is poisoned")
                .clone();

            let _ = sender.send(Ok(status));
        }

        Ok(())
    }

    fn notify_forkchoice_updated(
        &self,
        head_block_hash: ExecutionBlockHash,
        safe_block_hash: ExecutionBlockHash,
        finalized_block_hash: ExecutionBlockHash,
        _payload_attributes: Option<PayloadAttributesV1>,
        sender: Option<Sender<Option<PayloadId>>>,
    ) {
        self.record(EngineCall::ForkChoiceUpdated {
            head_block_hash,
            safe_block_hash,
            finalized_block_hash,
        });

        if let Some(sender) = sender {
            let _ = sender.send(None);
        }
    }
}
