//! Kernel v2 account helpers: enable data, counterfactual address, validator envelopes and
//! ERC-6492 wrapping.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use kernel_session_types::CallData;

use crate::{
    config::KernelDeployment,
    kernel::{
        constants::{ERC6492_MAGIC_SUFFIX, MODE_ENABLE, MODE_PLUGIN, MODE_SUDO},
        interfaces::{Execution, IKernel, IKernelFactory, PermissionEnable},
    },
};

/// `abi.encode(PermissionEnable)`; the bytes the permission validator is enabled with.
pub fn enable_data(enable: &PermissionEnable) -> Bytes {
    enable.abi_encode().into()
}

/// `permissionId = keccak256(enableData)`.
pub fn permission_id(enable_data: &[u8]) -> B256 {
    keccak256(enable_data)
}

/// `Kernel.initialize(permissionValidator, rootEnableData)`.
pub fn initialize_calldata(deployment: &KernelDeployment, root_enable_data: &Bytes) -> Bytes {
    IKernel::initializeCall {
        defaultValidator: deployment.permission_validator,
        enableData: root_enable_data.clone(),
    }
    .abi_encode()
    .into()
}

pub fn account_salt(init_data: &[u8], index: U256) -> B256 {
    let mut buf = Vec::with_capacity(init_data.len() + 32);
    buf.extend_from_slice(init_data);
    buf.extend_from_slice(&index.to_be_bytes::<32>());
    keccak256(buf)
}

/// Address the factory deploys the account at.
pub fn counterfactual_address(
    deployment: &KernelDeployment,
    init_data: &[u8],
    index: U256,
) -> Address {
    let salt = account_salt(init_data, index);
    deployment
        .factory
        .create2(salt.0, deployment.account_init_code_hash.0)
}

pub fn factory_calldata(deployment: &KernelDeployment, init_data: &Bytes, index: U256) -> Bytes {
    IKernelFactory::createAccountCall {
        implementation: deployment.implementation,
        data: init_data.clone(),
        index,
    }
    .abi_encode()
    .into()
}

/// `factory || createAccount(...)`, the user operation `initCode` of an undeployed account.
pub fn init_code(deployment: &KernelDeployment, init_data: &Bytes, index: U256) -> Bytes {
    let calldata = factory_calldata(deployment, init_data, index);
    let mut out = Vec::with_capacity(20 + calldata.len());
    out.extend_from_slice(deployment.factory.as_slice());
    out.extend_from_slice(&calldata);
    out.into()
}

/// `executeBatch((to, value, data)[])`.
pub fn execute_batch_calldata(calls: &[CallData]) -> Bytes {
    IKernel::executeBatchCall {
        executions: calls
            .iter()
            .map(|call| Execution {
                to: call.to,
                value: call.value,
                data: call.data.clone(),
            })
            .collect(),
    }
    .abi_encode()
    .into()
}

/// `execute(to, value, data, 0)`; operation 0 is a plain call.
pub fn execute_calldata(call: &CallData) -> Bytes {
    IKernel::executeCall {
        to: call.to,
        value: call.value,
        data: call.data.clone(),
        operation: 0,
    }
    .abi_encode()
    .into()
}

/// Calls carried by account calldata built with either execute entrypoint.
pub fn decode_execution(calldata: &[u8]) -> Option<Vec<CallData>> {
    let selector: [u8; 4] = calldata.get(..4)?.try_into().ok()?;
    if selector == IKernel::executeBatchCall::SELECTOR {
        let batch = IKernel::executeBatchCall::abi_decode(calldata, true).ok()?;
        return Some(
            batch
                .executions
                .into_iter()
                .map(|e| CallData::new(e.to, e.value, e.data))
                .collect(),
        );
    }
    if selector == IKernel::executeCall::SELECTOR {
        let single = IKernel::executeCall::abi_decode(calldata, true).ok()?;
        if single.operation != 0 {
            return None;
        }
        return Some(vec![CallData::new(single.to, single.value, single.data)]);
    }
    None
}

/// `validAfter(48) || validUntil(48) || validator(160)` read as one uint256.
pub fn pack_validator_data(valid_after: u64, valid_until: u64, validator: Address) -> U256 {
    (U256::from(valid_after) << 208)
        | (U256::from(valid_until) << 160)
        | U256::from_be_slice(validator.as_slice())
}

/// `abi.encode(bytes[] policyData, bytes signerSig)`.
pub fn policy_payload(policy_data: Vec<Bytes>, signer_sig: Bytes) -> Bytes {
    (policy_data, signer_sig).abi_encode_params().into()
}

pub fn sudo_envelope(permission_id: B256, signer_sig: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(4 + 32 + signer_sig.len());
    out.extend_from_slice(&MODE_SUDO);
    out.extend_from_slice(permission_id.as_slice());
    out.extend_from_slice(signer_sig);
    out.into()
}

pub fn plugin_envelope(permission_id: B256, payload: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(4 + 32 + payload.len());
    out.extend_from_slice(&MODE_PLUGIN);
    out.extend_from_slice(permission_id.as_slice());
    out.extend_from_slice(payload);
    out.into()
}

/// Fields of a Kernel enable-mode prefix. `signature[4:36]` is the packed validator data the
/// root approval commits to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnablePrefix {
    pub valid_after: u64,
    pub valid_until: u64,
    /// Validator the account routes the selector to once enabled.
    pub validator: Address,
    pub executor: Address,
    pub enable_data: Bytes,
    pub enable_signature: Bytes,
}

pub fn enable_envelope(prefix: &EnablePrefix, permission_id: B256, payload: &[u8]) -> Bytes {
    let dynamic = prefix.enable_data.len() + prefix.enable_signature.len() + payload.len();
    let mut out = Vec::with_capacity(4 + 12 + 20 + 20 + 64 + 32 + dynamic);
    out.extend_from_slice(&MODE_ENABLE);
    out.extend_from_slice(&prefix.valid_after.to_be_bytes()[2..]);
    out.extend_from_slice(&prefix.valid_until.to_be_bytes()[2..]);
    out.extend_from_slice(prefix.validator.as_slice());
    out.extend_from_slice(prefix.executor.as_slice());
    out.extend_from_slice(&U256::from(prefix.enable_data.len()).to_be_bytes::<32>());
    out.extend_from_slice(&prefix.enable_data);
    out.extend_from_slice(&U256::from(prefix.enable_signature.len()).to_be_bytes::<32>());
    out.extend_from_slice(&prefix.enable_signature);
    out.extend_from_slice(permission_id.as_slice());
    out.extend_from_slice(payload);
    out.into()
}

/// `abi.encode(factory, factoryCalldata, sig) || magic`, for accounts not yet deployed.
pub fn wrap_erc6492(factory: Address, factory_calldata: Bytes, signature: Bytes) -> Bytes {
    let mut out = (factory, factory_calldata, signature).abi_encode_params();
    out.extend_from_slice(ERC6492_MAGIC_SUFFIX.as_slice());
    out.into()
}

/// Inverse of [`wrap_erc6492`]; `None` when the signature carries no ERC-6492 suffix.
pub fn unwrap_erc6492(signature: &[u8]) -> Option<(Address, Bytes, Bytes)> {
    let body = signature.strip_suffix(ERC6492_MAGIC_SUFFIX.as_slice())?;
    <(Address, Bytes, Bytes)>::abi_decode_params(body, true).ok()
}
