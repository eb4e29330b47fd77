use std::sync::Arc;

use anyhow::Result;
use execution_engine::{
    ExecutionEngine, ExecutionPayloadV1, ForkChoiceStateV1, PayloadAttributesV1, PayloadId,
    PayloadStatusV1,
};
use futures::channel::oneshot::Sender;
use types::{
    bellatrix::containers::ExecutionPayload,
    phase0::primitives::{ExecutionBlockHash, H256},
    preset::Preset,
};

use crate::engine_api::EngineApi;

/// Adapts [`EngineApi`] to the [`ExecutionEngine`] interface by dispatching
/// each call onto the runtime and completing the caller's channel when the
/// response arrives.
pub struct Eth1ExecutionEngine {
    api: Arc<EngineApi>,
    handle: tokio::runtime::Handle,
}

impl Eth1ExecutionEngine {
    #[must_use]
    pub fn new(api: Arc<EngineApi>, handle: tokio::runtime::Handle) -> Self {
        Self { api, handle }
    }
}

impl<P: Preset> ExecutionEngine<P> for Eth1ExecutionEngine {
    const IS_NULL: bool = false;

    fn notify_new_payload(
        &self,
        _block_root: H256,
        payload: ExecutionPayload<P>,
        sender: Option<Sender<Result<PayloadStatusV1>>>,
    ) -> Result<()> {
        let api = self.api.clone();
        let payload = ExecutionPayloadV1::from(&payload);

        self.handle.spawn(async move {
            let status = api.new_payload(payload).await;

            if let Some(sender) = sender {
                let _ = sender.send(Ok(status));
            }
        });

        Ok(())
    }

    fn notify_forkchoice_updated(
        &self,
        head_block_hash: ExecutionBlockHash,
        safe_block_hash: ExecutionBlockHash,
        finalized_block_hash: ExecutionBlockHash,
        payload_attributes: Option<PayloadAttributesV1>,
        sender: Option<Sender<Option<PayloadId>>>,
    ) {
        let api = self.api.clone();

        let fork_choice_state = ForkChoiceStateV1 {
            head_block_hash,
            safe_block_hash,
            finalized_block_hash,
        };

        self.handle.spawn(async move {
            let response = api
                .forkchoice_updated(fork_choice_state, payload_attributes)
                .await;

            if let Some(sender) = sender {
                let _ = sender.send(response.payload_id);
            }
        });
    }
}
