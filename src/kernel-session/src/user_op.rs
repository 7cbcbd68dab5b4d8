//! ERC-4337 (EntryPoint v0.6) user operations and their lifecycle states.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use kernel_session_types::CallData;
use serde::{Deserialize, Serialize};

/// v0.6 user operation. JSON is camelCase with hex quantities, as bundlers expect.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl UserOperation {
    /// `keccak256(abi.encode(keccak256(pack(op)), entryPoint, chainId))`.
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        let packed = (
            self.sender,
            self.nonce,
            keccak256(&self.init_code),
            keccak256(&self.call_data),
            self.call_gas_limit,
            self.verification_gas_limit,
            self.pre_verification_gas,
            self.max_fee_per_gas,
            self.max_priority_fee_per_gas,
            keccak256(&self.paymaster_and_data),
        )
            .abi_encode_params();
        keccak256((keccak256(packed), entry_point, U256::from(chain_id)).abi_encode_params())
    }
}

/// Gas fields a paymaster or estimator fills in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasFields {
    #[serde(default)]
    pub paymaster_and_data: Option<Bytes>,
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U256,
    pub call_gas_limit: U256,
    #[serde(default)]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<U256>,
}

impl GasFields {
    pub(crate) fn apply(self, op: &mut UserOperation) {
        if let Some(paymaster_and_data) = self.paymaster_and_data {
            op.paymaster_and_data = paymaster_and_data;
        }
        op.pre_verification_gas = self.pre_verification_gas;
        op.verification_gas_limit = self.verification_gas_limit;
        op.call_gas_limit = self.call_gas_limit;
        if let Some(fee) = self.max_fee_per_gas {
            op.max_fee_per_gas = fee;
        }
        if let Some(fee) = self.max_priority_fee_per_gas {
            op.max_priority_fee_per_gas = fee;
        }
    }
}

/// Built and carrying a dummy signature; not yet sponsored or estimated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedUserOperation {
    pub op: UserOperation,
    pub calls: Vec<CallData>,
    /// Whether the session permission is already enabled on the account (plugin vs enable mode).
    pub session_enabled: bool,
}

/// Gas fields settled (by a paymaster or by estimation); ready to sign and submit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SponsoredUserOperation {
    pub op: UserOperation,
    pub calls: Vec<CallData>,
    pub session_enabled: bool,
}

/// Accepted by the bundler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OperationHash(pub B256);

impl std::fmt::Display for OperationHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_hash: Option<B256>,
    #[serde(default)]
    pub block_number: Option<U256>,
    #[serde(default)]
    pub status: Option<U256>,
}

/// `eth_getUserOperationReceipt` result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: B256,
    pub sender: Address,
    pub nonce: U256,
    pub success: bool,
    /// Revert data or message as reported by the bundler.
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub actual_gas_cost: U256,
    #[serde(default)]
    pub actual_gas_used: U256,
    #[serde(default)]
    pub receipt: Option<TransactionReceipt>,
}
