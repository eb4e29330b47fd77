pub use crate::{
    execution_engine::{EngineCall, ExecutionEngine, MockExecutionEngine, NullExecutionEngine},
    types::{
        ExecutionPayloadV1, ForkChoiceStateV1, ForkChoiceUpdatedResponse, PayloadAttributesV1,
        PayloadId, PayloadStatusV1, PayloadValidationStatus,
    },
};

mod execution_engine;
mod types;
