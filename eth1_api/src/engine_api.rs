use core::time::Duration;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use execution_engine::{
    ExecutionPayloadV1, ForkChoiceStateV1, ForkChoiceUpdatedResponse, PayloadAttributesV1,
    PayloadId, PayloadStatusV1,
};
use log::warn;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

use crate::auth::Auth;

/// Engine API timeouts as recommended by the consensus specification,
/// all overridable.
#[derive(Clone, Copy, Debug)]
pub struct EngineApiConfig {
    pub new_payload_timeout: Duration,
    pub forkchoice_updated_timeout: Duration,
    pub get_payload_timeout: Duration,
}

impl Default for EngineApiConfig {
    fn default() -> Self {
        Self {
            new_payload_timeout: Duration::from_secs(8),
            forkchoice_updated_timeout: Duration::from_millis(650),
            get_payload_timeout: Duration::from_secs(1),
        }
    }
}

/// A JSON-RPC 2.0 client for the Engine API of a single execution node.
///
/// `reqwest` reconnects lazily, so there is no explicit connection state to
/// manage; `el_online` only tracks reachability for logging.
pub struct EngineApi {
    client: Client,
    url: Url,
    auth: Auth,
    config: EngineApiConfig,
    el_online: AtomicBool,
}

impl EngineApi {
    #[must_use]
    pub fn new(client: Client, url: Url, auth: Auth, config: EngineApiConfig) -> Self {
        Self {
            client,
            url,
            auth,
            config,
            el_online: AtomicBool::new(true),
        }
    }

    /// [`engine_newPayloadV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#engine_newpayloadv1)
    ///
    /// Transport errors and timeouts resolve to a synthetic `SYNCING` status.
    pub async fn new_payload(&self, payload: ExecutionPayloadV1) -> PayloadStatusV1 {
        let params = vec![json!(payload)];

        match self
            .execute("engine_newPayloadV1", params, self.config.new_payload_timeout)
            .await
        {
            Ok(status) => status,
            Err(error) => {
                warn!("engine_newPayloadV1 failed: {error}; treating the payload as syncing");
                PayloadStatusV1::synthetic_syncing()
            }
        }
    }

    /// [`engine_forkchoiceUpdatedV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#engine_forkchoiceupdatedv1)
    ///
    /// Transport errors and timeouts resolve to a synthetic `SYNCING` status.
    pub async fn forkchoice_updated(
        &self,
        fork_choice_state: ForkChoiceStateV1,
        payload_attributes: Option<PayloadAttributesV1>,
    ) -> ForkChoiceUpdatedResponse {
        let params = vec![json!(fork_choice_state), json!(payload_attributes)];

        match self
            .execute(
                "engine_forkchoiceUpdatedV1",
                params,
                self.config.forkchoice_updated_timeout,
            )
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!("engine_forkchoiceUpdatedV1 failed: {error}; assuming the head is syncing");

                ForkChoiceUpdatedResponse {
                    payload_status: PayloadStatusV1::synthetic_syncing(),
                    payload_id: None,
                }
            }
        }
    }

    /// [`engine_getPayloadV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#engine_getpayloadv1)
    ///
    /// Unlike the notifications above, failures here are surfaced because the
    /// caller explicitly asked for a payload.
    pub async fn get_payload(&self, payload_id: PayloadId) -> Result<ExecutionPayloadV1, Error> {
        self.execute(
            "engine_getPayloadV1",
            vec![json!(payload_id)],
            self.config.get_payload_timeout,
        )
        .await
    }

    #[must_use]
    pub fn el_online(&self) -> bool {
        self.el_online.load(Ordering::Relaxed)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Vec<Value>,
        timeout: Duration,
    ) -> Result<T, Error> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let mut request = self.client.post(self.url.clone()).json(&body);

        if let Some(token) = self.auth.token().map_err(Error::Auth)? {
            request = request.bearer_auth(token);
        }

        let outcome = tokio::time::timeout(timeout, async {
            let response = request.send().await?.error_for_status()?;
            response.json::<RpcResponse<T>>().await
        })
        .await;

        let result = match outcome {
            Ok(Ok(response)) => {
                self.set_el_online(true);

                match (response.result, response.error) {
                    (Some(result), None) => Ok(result),
                    (_, Some(error)) => Err(Error::Rpc {
                        code: error.code,
                        message: error.message,
                    }),
                    (None, None) => Err(Error::MissingResult),
                }
            }
            Ok(Err(error)) => {
                self.set_el_online(false);
                Err(Error::Transport(error))
            }
            Err(_) => {
                self.set_el_online(false);
                Err(Error::Timeout { method, timeout })
            }
        };

        result
    }

    fn set_el_online(&self, online: bool) {
        let was_online = self.el_online.swap(online, Ordering::Relaxed);

        if was_online && !online {
            warn!("execution endpoint {} is offline", self.url);
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Auth(crate::auth::AuthError),
    #[error("execution endpoint returned no result")]
    MissingResult,
    #[error("execution endpoint returned error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("request did not complete within {timeout:?} ({method})")]
    Timeout {
        method: &'static str,
        timeout: Duration,
    },
    #[error("transport error")]
    Transport(#[source] reqwest::Error),
}

#[derive(serde::Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(serde::Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}
