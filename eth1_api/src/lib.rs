pub use crate::{
    auth::{Auth, AuthError, AuthOptions},
    engine_api::{EngineApi, EngineApiConfig, Error},
    eth1_execution_engine::Eth1ExecutionEngine,
};

mod auth;
mod engine_api;
mod eth1_execution_engine;
