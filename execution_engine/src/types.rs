use ethereum_types::H64;
use serde::{Deserialize, Serialize};
use types::{
    bellatrix::containers::ExecutionPayload,
    phase0::primitives::{
        ExecutionAddress, ExecutionBlockHash, ExecutionBlockNumber, Uint256, UnixSeconds, H256,
    },
    preset::Preset,
};

/// [`ExecutionPayloadV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#executionpayloadv1)
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExecutionPayloadV1 {
    pub parent_hash: ExecutionBlockHash,
    pub fee_recipient: ExecutionAddress,
    pub state_root: H256,
    pub receipts_root: H256,
    #[serde(with = "serde_utils::prefixed_hex")]
    pub logs_bloom: Vec<u8>,
    pub prev_randao: H256,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub block_number: ExecutionBlockNumber,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub gas_limit: u64,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub gas_used: u64,
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub timestamp: UnixSeconds,
    #[serde(with = "serde_utils::prefixed_hex")]
    pub extra_data: Vec<u8>,
    pub base_fee_per_gas: Uint256,
    pub block_hash: ExecutionBlockHash,
    #[serde(with = "serde_utils::prefixed_hex_sequence")]
    pub transactions: Vec<Vec<u8>>,
}

impl<P: Preset> From<&ExecutionPayload<P>> for ExecutionPayloadV1 {
    fn from(payload: &ExecutionPayload<P>) -> Self {
        Self {
            parent_hash: payload.parent_hash,
            fee_recipient: payload.fee_recipient,
            state_root: payload.state_root,
            receipts_root: payload.receipts_root,
            logs_bloom: payload.logs_bloom.as_ref().to_vec(),
            prev_randao: payload.prev_randao,
            block_number: payload.block_number,
            gas_limit: payload.gas_limit,
            gas_used: payload.gas_used,
            timestamp: payload.timestamp,
            extra_data: payload.extra_data.as_ref().to_vec(),
            base_fee_per_gas: payload.base_fee_per_gas,
            block_hash: payload.block_hash,
            transactions: payload
                .transactions
                .iter()
                .map(|transaction| transaction.as_ref().to_vec())
                .collect(),
        }
    }
}

/// [`PayloadStatusV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#payloadstatusv1)
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadStatusV1 {
    pub status: PayloadValidationStatus,
    pub latest_valid_hash: Option<ExecutionBlockHash>,
    pub validation_error: Option<String>,
}

impl PayloadStatusV1 {
    /// The status engine transport failures decay to.
    #[must_use]
    pub const fn synthetic_syncing() -> Self {
        Self {
            status: PayloadValidationStatus::Syncing,
            latest_valid_hash: None,
            validation_error: None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadValidationStatus {
    Valid,
    Invalid,
    Syncing,
    Accepted,
    InvalidBlockHash,
    // Removed from the Engine API spec, but some execution clients still return it.
    InvalidTerminalBlock,
}

impl PayloadValidationStatus {
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    #[must_use]
    pub const fn is_invalid(self) -> bool {
        matches!(
            self,
            Self::Invalid | Self::InvalidBlockHash | Self::InvalidTerminalBlock,
        )
    }

    #[must_use]
    pub const fn is_syncing_or_accepted(self) -> bool {
        matches!(self, Self::Syncing | Self::Accepted)
    }
}

/// [`ForkchoiceStateV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#forkchoicestatev1)
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ForkChoiceStateV1 {
    pub head_block_hash: ExecutionBlockHash,
    pub safe_block_hash: ExecutionBlockHash,
    pub finalized_block_hash: ExecutionBlockHash,
}

/// [`PayloadAttributesV1`](https://github.com/ethereum/execution-apis/blob/b7c5d3420e00648f456744d121ffbd929862924d/src/engine/paris.md#payloadattributesv1)
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PayloadAttributesV1 {
    #[serde(with = "serde_utils::prefixed_hex_quantity")]
    pub timestamp: UnixSeconds,
    pub prev_randao: H256,
    pub suggested_fee_recipient: ExecutionAddress,
}

pub type PayloadId = H64;

#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkChoiceUpdatedResponse {
    pub payload_status: PayloadStatusV1,
    pub payload_id: Option<PayloadId>,
}

mod serde_utils {
    pub mod prefixed_hex {
        use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&format!("0x{}", hex_string(bytes)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<u8>, D::Error> {
            let string = String::deserialize(deserializer)?;
            super::decode_prefixed(&string).map_err(D::Error::custom)
        }

        fn hex_string(bytes: &[u8]) -> String {
            bytes.iter().map(|byte| format!("{byte:02x}")).collect()
        }
    }

    pub mod prefixed_hex_sequence {
        use serde::{
            de::Error as _, ser::SerializeSeq as _, Deserialize as _, Deserializer, Serializer,
        };

        pub fn serialize<S: Serializer>(
            sequence: &[Vec<u8>],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let mut sequence_serializer = serializer.serialize_seq(Some(sequence.len()))?;

            for bytes in sequence {
                let string = format!(
                    "0x{}",
                    bytes
                        .iter()
                        .map(|byte| format!("{byte:02x}"))
                        .collect::<String>(),
                );

                sequence_serializer.serialize_element(&string)?;
            }

            sequence_serializer.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Vec<u8>>, D::Error> {
            let strings = Vec::<String>::deserialize(deserializer)?;

            strings
                .iter()
                .map(|string| super::decode_prefixed(string))
                .collect::<Result<_, _>>()
                .map_err(D::Error::custom)
        }
    }

    pub mod prefixed_hex_quantity {
        use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&format!("{value:#x}"))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
            let string = String::deserialize(deserializer)?;

            let digits = string
                .strip_prefix("0x")
                .ok_or_else(|| D::Error::custom("quantity is missing the 0x prefix"))?;

            u64::from_str_radix(digits, 16).map_err(D::Error::custom)
        }
    }

    pub fn decode_prefixed(string: &str) -> Result<Vec<u8>, String> {
        let digits = string
            .strip_prefix("0x")
            .ok_or_else(|| format!("{string:?} is missing the 0x prefix"))?;

        if digits.len() % 2 != 0 {
            return Err(format!("{string:?} has an odd number of digits"));
        }

        (0..digits.len())
            .step_by(2)
            .map(|index| {
                u8::from_str_radix(&digits[index..index + 2], 16)
                    .map_err(|error| error.to_string())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn payload_status_deserializes_from_engine_api_json() {
        let json = serde_json::json!({
            "status": "VALID",
            "latestValidHash":
                "0x3b8fb240d288781d4aac94d3fd16809ee413bc99294a085798a589dae51ddd4a",
            "validationError": null,
        });

        let payload_status: PayloadStatusV1 =
            serde_json::from_value(json).expect("JSON matches the Engine API spec");

        assert_eq!(payload_status.status, PayloadValidationStatus::Valid);
        assert_eq!(
            payload_status.latest_valid_hash,
            Some(H256(hex!(
                "3b8fb240d288781d4aac94d3fd16809ee413bc99294a085798a589dae51ddd4a"
            ))),
        );
        assert!(payload_status.status.is_valid());
    }

    #[test]
    fn quantities_round_trip_as_prefixed_hex() {
        let attributes = PayloadAttributesV1 {
            timestamp: 0x621c_c4f8,
            prev_randao: H256::zero(),
            suggested_fee_recipient: ExecutionAddress::zero(),
        };

        let json = serde_json::to_value(attributes).expect("serialization succeeds");

        assert_eq!(json["timestamp"], "0x621cc4f8");

        let decoded: PayloadAttributesV1 =
            serde_json::from_value(json).expect("deserialization succeeds");

        assert_eq!(decoded, attributes);
    }
}
