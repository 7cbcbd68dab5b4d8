//! Node-free re-check of signatures produced for an account.
//!
//! Replays the validation the account performs on-chain (validator envelope, root approval of a
//! session, merkle policy, signature policy, signer recovery) against the account's public
//! authority data. Useful for audits and for simulating the chain in tests.

use alloy_primitives::{eip191_hash_message, keccak256, Address, Bytes, B256};
use alloy_sol_types::{SolCall, SolValue};
use kernel_session_types::{CallData, TypedDomain};
use thiserror::Error;

use crate::{
    authority::{RootDescriptor, RootIdentity, SessionValidity, SmartAccount},
    kernel::{
        constants::{MODE_ENABLE, MODE_PLUGIN, MODE_SUDO, UNMATCHED_PERMISSION_INDEX},
        interfaces::{CallProof, IKernel},
    },
    passkey::{challenge_string, decode_webauthn_signature},
    policy::{Permission, PermissionSet, SignatureScope},
    user_op::UserOperation,
    utils::{bytes, crypto, eip712, kernel, merkle},
};

/// Why the account would refuse a signature.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("signature envelope is malformed")]
    Malformed,
    #[error("unknown validator mode {0:?}")]
    UnknownMode([u8; 4]),
    #[error("permission {0} is not installed on the account")]
    UnknownPermission(B256),
    #[error("session permission is not enabled yet")]
    NotEnabled,
    #[error("enable data does not match the session")]
    EnableDataMismatch,
    #[error("root did not approve the session")]
    BadApproval,
    #[error("enable mode names validator {0}, not the permission validator")]
    ValidatorMismatch(Address),
    #[error("signer signature is invalid")]
    BadSignature,
    #[error("call #{index} is not covered by the session permissions")]
    CallNotPermitted { index: usize },
    #[error("{0} may not request signature validation")]
    RequestorNotAllowed(Address),
    #[error("ERC-6492 wrapper does not deploy this account")]
    FactoryMismatch,
}

impl From<bytes::Truncated> for Rejection {
    fn from(_: bytes::Truncated) -> Self {
        Rejection::Malformed
    }
}

/// Validation path an accepted user operation took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationMode {
    Sudo,
    Plugin,
    /// The operation enables the session permission as part of validation.
    Enable,
}

#[derive(Clone, Debug)]
struct SessionView {
    permission_id: B256,
    signer: Address,
    permissions: PermissionSet,
    scope: SignatureScope,
    validity: SessionValidity,
    enable_data: Bytes,
    enable_signature: Bytes,
}

#[derive(Clone, Debug)]
pub struct OfflineVerifier {
    account: Address,
    chain_id: u64,
    entry_point: Address,
    permission_validator: Address,
    kernel_domain: TypedDomain,
    factory: Address,
    factory_calldata: Bytes,
    root: RootIdentity,
    session: Option<SessionView>,
}

impl OfflineVerifier {
    pub fn new(account: &SmartAccount) -> Self {
        let session = account.authority().session().map(|s| SessionView {
            permission_id: s.permission_id(),
            signer: s.key().address(),
            permissions: s.permissions().clone(),
            scope: s.scope().clone(),
            validity: s.validity(),
            enable_data: s.enable_data().clone(),
            enable_signature: s.enable_signature().clone(),
        });
        Self {
            account: account.address(),
            chain_id: account.chain_id(),
            entry_point: account.deployment().entry_point,
            permission_validator: account.deployment().permission_validator,
            kernel_domain: account.kernel_domain(),
            factory: account.deployment().factory,
            factory_calldata: account.factory_calldata(),
            root: account.authority().root().clone(),
            session,
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn root_permission_id(&self) -> B256 {
        self.root.permission_id()
    }

    pub fn session_permission_id(&self) -> Option<B256> {
        self.session.as_ref().map(|s| s.permission_id)
    }

    /// Check that the root signed the approval the session carries for its own enable data and
    /// validity. Root-only accounts have nothing to approve.
    pub fn verify_session_approval(&self) -> Result<(), Rejection> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        self.check_enable_approval(
            session.validity.valid_after,
            session.validity.valid_until,
            Address::ZERO,
            &session.enable_data,
            &session.enable_signature,
        )
    }

    /// Validate `op.signature` as the account would. `session_enabled` is the account's
    /// on-chain state before the operation.
    pub fn verify_user_operation(
        &self,
        op: &UserOperation,
        session_enabled: bool,
    ) -> Result<ValidationMode, Rejection> {
        let sig = &op.signature[..];
        let hash = eip191_hash_message(op.hash(self.entry_point, self.chain_id));
        let mut i = 0;
        let mode = bytes::read_array4(sig, &mut i)?;

        match mode {
            MODE_SUDO => {
                let permission_id = bytes::read_b32(sig, &mut i)?;
                if permission_id != self.root.permission_id() {
                    return Err(Rejection::UnknownPermission(permission_id));
                }
                self.check_root_signature(hash, &sig[i..])?;
                Ok(ValidationMode::Sudo)
            }
            MODE_PLUGIN => {
                let session = self.session_for(bytes::read_b32(sig, &mut i)?)?;
                if !session_enabled {
                    return Err(Rejection::NotEnabled);
                }
                self.check_session_operation(session, op, hash, &sig[i..])?;
                Ok(ValidationMode::Plugin)
            }
            MODE_ENABLE => {
                let valid_after = bytes::read_u48_be(sig, &mut i)?;
                let valid_until = bytes::read_u48_be(sig, &mut i)?;
                let validator = bytes::read_address(sig, &mut i)?;
                let executor = bytes::read_address(sig, &mut i)?;
                let enable_data = bytes::read_len_prefixed(sig, &mut i)?;
                let enable_sig = bytes::read_len_prefixed(sig, &mut i)?;
                let session = self.session_for(bytes::read_b32(sig, &mut i)?)?;

                if validator != self.permission_validator {
                    return Err(Rejection::ValidatorMismatch(validator));
                }
                if enable_data != session.enable_data
                    || keccak256(&enable_data) != session.permission_id
                    || valid_after != session.validity.valid_after
                    || valid_until != session.validity.valid_until
                {
                    return Err(Rejection::EnableDataMismatch);
                }
                self.check_enable_approval(
                    valid_after,
                    valid_until,
                    executor,
                    &enable_data,
                    &enable_sig,
                )?;
                self.check_session_operation(session, op, hash, &sig[i..])?;
                Ok(ValidationMode::Enable)
            }
            other => Err(Rejection::UnknownMode(other)),
        }
    }

    /// ERC-1271 check of `signature` over `hash`, requested by `requestor`. ERC-6492 wrapped
    /// signatures are unwrapped after checking they deploy this account.
    pub fn verify_message(
        &self,
        requestor: Address,
        hash: B256,
        signature: &[u8],
        session_enabled: bool,
    ) -> Result<(), Rejection> {
        let unwrapped;
        let signature = match kernel::unwrap_erc6492(signature) {
            Some((factory, calldata, inner)) => {
                if factory != self.factory || calldata != self.factory_calldata {
                    return Err(Rejection::FactoryMismatch);
                }
                unwrapped = inner;
                &unwrapped[..]
            }
            None => signature,
        };

        let digest = eip712::kernel_wrapped_digest(&self.kernel_domain, hash);
        let mut i = 0;
        let permission_id = bytes::read_b32(signature, &mut i)?;
        if permission_id == self.root.permission_id() {
            return self.check_root_signature(digest, &signature[i..]);
        }

        let session = self.session_for(permission_id)?;
        if !session_enabled {
            return Err(Rejection::NotEnabled);
        }
        if !session.scope.allows(requestor) {
            return Err(Rejection::RequestorNotAllowed(requestor));
        }
        let (_, signer_sig) = decode_policy_payload(&signature[i..])?;
        check_ecdsa(digest, &signer_sig, session.signer)
    }

    fn session_for(&self, permission_id: B256) -> Result<&SessionView, Rejection> {
        self.session
            .as_ref()
            .filter(|s| s.permission_id == permission_id)
            .ok_or(Rejection::UnknownPermission(permission_id))
    }

    fn check_root_signature(&self, digest: B256, sig: &[u8]) -> Result<(), Rejection> {
        match self.root.descriptor() {
            RootDescriptor::Eoa { owner } => check_ecdsa(digest, sig, *owner),
            RootDescriptor::Passkey { pub_x, pub_y, .. } => {
                let assertion = decode_webauthn_signature(sig).ok_or(Rejection::Malformed)?;
                if !assertion
                    .client_data_json
                    .contains(&challenge_string(digest.as_slice()))
                {
                    return Err(Rejection::BadSignature);
                }
                let ok = crypto::verify_webauthn_assertion(
                    *pub_x,
                    *pub_y,
                    &assertion.authenticator_data,
                    assertion.client_data_json.as_bytes(),
                    assertion.r,
                    assertion.s,
                );
                ok.then_some(()).ok_or(Rejection::BadSignature)
            }
        }
    }

    fn check_enable_approval(
        &self,
        valid_after: u64,
        valid_until: u64,
        executor: Address,
        enable_data: &[u8],
        enable_sig: &[u8],
    ) -> Result<(), Rejection> {
        let digest = eip712::validator_approved_digest(
            &self.kernel_domain,
            IKernel::executeBatchCall::SELECTOR,
            kernel::pack_validator_data(valid_after, valid_until, self.permission_validator),
            executor,
            enable_data,
        );
        let mut i = 0;
        let approver = bytes::read_b32(enable_sig, &mut i).map_err(|_| Rejection::BadApproval)?;
        if approver != self.root.permission_id() {
            return Err(Rejection::BadApproval);
        }
        self.check_root_signature(digest, &enable_sig[i..])
            .map_err(|_| Rejection::BadApproval)
    }

    fn check_session_operation(
        &self,
        session: &SessionView,
        op: &UserOperation,
        hash: B256,
        payload: &[u8],
    ) -> Result<(), Rejection> {
        let (policy_data, signer_sig) = decode_policy_payload(payload)?;
        check_ecdsa(hash, &signer_sig, session.signer)?;

        let calls = kernel::decode_execution(&op.call_data).ok_or(Rejection::Malformed)?;
        let merkle_data = policy_data.first().ok_or(Rejection::Malformed)?;
        let proofs =
            <Vec<CallProof>>::abi_decode(merkle_data, true).map_err(|_| Rejection::Malformed)?;
        if proofs.len() != calls.len() {
            return Err(Rejection::Malformed);
        }
        for (index, (call, proof)) in calls.iter().zip(&proofs).enumerate() {
            if !proof_covers(&session.permissions, call, proof) {
                return Err(Rejection::CallNotPermitted { index });
            }
        }
        Ok(())
    }
}

fn decode_policy_payload(payload: &[u8]) -> Result<(Vec<Bytes>, Bytes), Rejection> {
    <(Vec<Bytes>, Bytes)>::abi_decode_params(payload, true).map_err(|_| Rejection::Malformed)
}

fn check_ecdsa(digest: B256, sig: &[u8], expected: Address) -> Result<(), Rejection> {
    let sig: &[u8; 65] = sig.try_into().map_err(|_| Rejection::Malformed)?;
    match crypto::ecrecover_address(digest, sig) {
        Some(signer) if signer == expected => Ok(()),
        _ => Err(Rejection::BadSignature),
    }
}

/// Merkle policy rule: the proof must place the permission in the committed tree, and the
/// permission must cover the call.
fn proof_covers(permissions: &PermissionSet, call: &CallData, proof: &CallProof) -> bool {
    if proof.index == UNMATCHED_PERMISSION_INDEX {
        return false;
    }
    let (Ok(index), Some(permission)) =
        (usize::try_from(proof.index), Permission::from_sol(&proof.permission))
    else {
        return false;
    };
    merkle::verify(permissions.root(), permission.leaf(index), &proof.proof)
        && permission.covers(call)
}
