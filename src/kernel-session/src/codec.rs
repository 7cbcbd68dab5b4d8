//! Session persistence.
//!
//! A session is stored as `base64(JSON)` of a versioned [`SessionSnapshot`]. Loading checks the
//! schema version, rebuilds the authority from the embedded public data and key, and re-derives
//! the account address before anything can sign with it.

use alloy_primitives::{Address, Bytes, B256, U256};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{
    authority::{
        Authority, RootDescriptor, RootIdentity, SessionAuthority, SessionValidity, SmartAccount,
    },
    verifier::OfflineVerifier,
    config::KernelDeployment,
    errors::{Result, SessionError},
    policy::{Permission, PermissionSet, PolicyEngine, SignatureScope},
    signer::SessionKey,
};

pub const SNAPSHOT_VERSION: u64 = 1;

/// Persisted form of a root-plus-session account. Holds the session private key.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SessionSnapshot {
    version: u64,
    chain_id: u64,
    account_address: Address,
    index: U256,
    kernel_version: String,
    deployment: KernelDeployment,
    root: RootDescriptor,
    permissions: Vec<Permission>,
    merkle_root: B256,
    signature_scope: SignatureScope,
    validity: SessionValidity,
    enable_signature: Bytes,
    session_private_key: String,
}

fn malformed(reason: impl Into<String>) -> SessionError {
    SessionError::Deserialization(reason.into())
}

pub struct SessionCodec;

impl SessionCodec {
    /// Deterministic; performs no I/O.
    pub fn serialize(account: &SmartAccount) -> Result<String> {
        let Authority::RootPlusSession { root, session } = account.authority() else {
            return Err(SessionError::AuthorityComposition(
                "only accounts with a session authority can be serialized".into(),
            ));
        };

        let snapshot = SessionSnapshot {
            version: SNAPSHOT_VERSION,
            chain_id: account.chain_id(),
            account_address: account.address(),
            index: account.index(),
            kernel_version: account.kernel_version().to_string(),
            deployment: account.deployment().clone(),
            root: root.descriptor().clone(),
            permissions: session.permissions().permissions().to_vec(),
            merkle_root: session.permissions().root(),
            signature_scope: session.scope().clone(),
            validity: session.validity(),
            enable_signature: session.enable_signature().clone(),
            session_private_key: session.key().to_hex(),
        };
        let json = serde_json::to_vec(&snapshot)
            .map_err(|e| SessionError::Encoding(format!("session snapshot: {e}")))?;
        Ok(STANDARD.encode(json))
    }

    /// Rebuild the account stored in `blob`, which must belong to `expected_account`.
    pub fn deserialize(blob: &str, expected_account: Address) -> Result<SmartAccount> {
        let raw = STANDARD
            .decode(blob.trim())
            .map_err(|e| malformed(format!("session blob is not base64: {e}")))?;
        let value: Value = serde_json::from_slice(&raw)
            .map_err(|e| malformed(format!("session blob is not JSON: {e}")))?;

        match value.get("version").and_then(Value::as_u64) {
            Some(SNAPSHOT_VERSION) => {}
            Some(other) => {
                return Err(malformed(format!(
                    "unsupported session schema version {other}"
                )))
            }
            None => return Err(malformed("session blob has no schema version")),
        }
        let snapshot: SessionSnapshot =
            serde_json::from_value(value).map_err(|e| malformed(format!("session snapshot: {e}")))?;

        snapshot
            .deployment
            .validate()
            .map_err(|e| malformed(e.to_string()))?;
        snapshot.validity.check().map_err(|e| malformed(e.to_string()))?;

        let key = SessionKey::from_hex(&snapshot.session_private_key)
            .map_err(|e| malformed(e.to_string()))?;

        let permissions = PermissionSet::from_permissions(snapshot.permissions);
        if permissions.root() != snapshot.merkle_root {
            return Err(malformed(format!(
                "permission root {} does not match recorded {}",
                permissions.root(),
                snapshot.merkle_root
            )));
        }
        let scope = PolicyEngine::new()
            .build_signature_scope(snapshot.signature_scope.allowed_requestors().iter().copied())
            .map_err(|e| malformed(e.to_string()))?;

        let root = RootIdentity::new(snapshot.root, &snapshot.deployment);

        let session = SessionAuthority::from_parts(
            key,
            permissions,
            scope,
            snapshot.validity,
            snapshot.enable_signature,
            &snapshot.deployment,
        );
        let account = SmartAccount::new(
            snapshot.chain_id,
            snapshot.kernel_version,
            snapshot.deployment,
            snapshot.index,
            Authority::RootPlusSession { root, session },
        );

        if account.address() != snapshot.account_address {
            return Err(malformed(format!(
                "re-derived account {} does not match recorded {}",
                account.address(),
                snapshot.account_address
            )));
        }
        if account.address() != expected_account {
            return Err(malformed(format!(
                "session belongs to {}, expected {expected_account}",
                account.address()
            )));
        }

        // Edited permissions or validity with a matching merkle root still lack the root's
        // signature over the new enable data.
        OfflineVerifier::new(&account)
            .verify_session_approval()
            .map_err(|e| malformed(format!("enable signature: {e}")))?;

        debug!(account = %account.address(), "session restored");
        Ok(account)
    }
}
