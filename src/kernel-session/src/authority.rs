//! Two-tier account authority.
//!
//! A Kernel account is initialised with a root permission (passkey or EOA signer under the sudo
//! policy). A session permission (ECDSA session key under merkle + signature policies) can be
//! attached; the root approves it once, and that approval travels with the session so the
//! session enables itself on first use.

use std::{fmt, sync::Arc};

use alloy_primitives::{aliases::U48, eip191_hash_message, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use kernel_session_types::{CallData, TypedDomain};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config::{KernelDeployment, NetworkConfig},
    errors::{Result, SessionError},
    kernel::{
        constants::DUMMY_ECDSA_SIGNATURE,
        interfaces::{IKernel, PermissionEnable, PolicyConfig},
    },
    passkey::{
        challenge_string, credential_id_hash, dummy_webauthn_signature, encode_webauthn_signature,
        PasskeyAuthenticator, PasskeyCredential, PasskeyServer, WebAuthnMode,
    },
    policy::{PermissionSet, SignatureScope},
    signer::{SessionKey, Signer},
    utils::{eip712, kernel},
};

/// Public identity of a root signer; the account address is derived from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RootDescriptor {
    #[serde(rename_all = "camelCase")]
    Eoa { owner: Address },
    #[serde(rename_all = "camelCase")]
    Passkey {
        credential_id: String,
        pub_x: B256,
        pub_y: B256,
    },
}

impl RootDescriptor {
    pub fn signer_module(&self, deployment: &KernelDeployment) -> Address {
        match self {
            RootDescriptor::Eoa { .. } => deployment.ecdsa_signer,
            RootDescriptor::Passkey { .. } => deployment.webauthn_signer,
        }
    }

    /// ECDSA: the owner address. WebAuthn: `abi.encode(pubX, pubY, keccak256(credentialId))`.
    pub fn signer_data(&self) -> Bytes {
        match self {
            RootDescriptor::Eoa { owner } => Bytes::copy_from_slice(owner.as_slice()),
            RootDescriptor::Passkey {
                credential_id,
                pub_x,
                pub_y,
            } => (
                U256::from_be_bytes(pub_x.0),
                U256::from_be_bytes(pub_y.0),
                credential_id_hash(credential_id),
            )
                .abi_encode_params()
                .into(),
        }
    }

    pub fn enable(&self, deployment: &KernelDeployment) -> PermissionEnable {
        PermissionEnable {
            validAfter: U48::ZERO,
            validUntil: U48::ZERO,
            signer: self.signer_module(deployment),
            signerData: self.signer_data(),
            policies: vec![PolicyConfig {
                policy: deployment.sudo_policy,
                initData: Bytes::new(),
            }],
        }
    }
}

/// Root descriptor with its committed enable data and permission id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootIdentity {
    descriptor: RootDescriptor,
    enable_data: Bytes,
    permission_id: B256,
}

impl RootIdentity {
    pub fn new(descriptor: RootDescriptor, deployment: &KernelDeployment) -> Self {
        let enable_data = kernel::enable_data(&descriptor.enable(deployment));
        let permission_id = kernel::permission_id(&enable_data);
        Self {
            descriptor,
            enable_data,
            permission_id,
        }
    }

    pub fn descriptor(&self) -> &RootDescriptor {
        &self.descriptor
    }

    pub fn enable_data(&self) -> &Bytes {
        &self.enable_data
    }

    pub fn permission_id(&self) -> B256 {
        self.permission_id
    }
}

#[derive(Clone)]
enum RootSigner {
    Eoa(Arc<dyn Signer>),
    Passkey {
        authenticator: Arc<dyn PasskeyAuthenticator>,
        credential_id: String,
    },
}

/// Root authority able to sign: unrestricted (sudo) power over the account.
#[derive(Clone)]
pub struct RootAuthority {
    identity: RootIdentity,
    signer: RootSigner,
}

impl fmt::Debug for RootAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootAuthority")
            .field("descriptor", &self.identity.descriptor)
            .field("permission_id", &self.identity.permission_id)
            .finish()
    }
}

impl RootAuthority {
    pub fn from_eoa(signer: Arc<dyn Signer>, deployment: &KernelDeployment) -> Self {
        let descriptor = RootDescriptor::Eoa {
            owner: signer.address(),
        };
        Self {
            identity: RootIdentity::new(descriptor, deployment),
            signer: RootSigner::Eoa(signer),
        }
    }

    /// Fails unless the passkey server reported the credential as verified.
    pub fn from_passkey(
        credential: &PasskeyCredential,
        authenticator: Arc<dyn PasskeyAuthenticator>,
        deployment: &KernelDeployment,
    ) -> Result<Self> {
        if !credential.verified {
            return Err(SessionError::AuthorityComposition(format!(
                "passkey credential {} has not been verified by the passkey server",
                credential.credential_id
            )));
        }
        let descriptor = RootDescriptor::Passkey {
            credential_id: credential.credential_id.clone(),
            pub_x: credential.pub_x,
            pub_y: credential.pub_y,
        };
        Ok(Self {
            identity: RootIdentity::new(descriptor, deployment),
            signer: RootSigner::Passkey {
                authenticator,
                credential_id: credential.credential_id.clone(),
            },
        })
    }

    pub fn identity(&self) -> &RootIdentity {
        &self.identity
    }

    /// Signer-module signature over a raw digest.
    pub(crate) async fn sign_digest(&self, digest: B256) -> Result<Bytes> {
        match &self.signer {
            RootSigner::Eoa(signer) => Ok(Bytes::copy_from_slice(&signer.sign_hash(digest).await?)),
            RootSigner::Passkey {
                authenticator,
                credential_id,
            } => {
                let assertion = authenticator
                    .sign_challenge(credential_id, digest.as_slice())
                    .await?;
                if !assertion
                    .client_data_json
                    .contains(&challenge_string(digest.as_slice()))
                {
                    return Err(SessionError::Passkey(
                        "assertion does not carry the requested challenge".into(),
                    ));
                }
                encode_webauthn_signature(&assertion)
            }
        }
    }

    fn dummy_signer_signature(&self) -> Bytes {
        match self.signer {
            RootSigner::Eoa(_) => Bytes::copy_from_slice(&DUMMY_ECDSA_SIGNATURE),
            RootSigner::Passkey { .. } => dummy_webauthn_signature(),
        }
    }
}

/// Validity window of a session permission; zero `valid_until` means no expiry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionValidity {
    pub valid_after: u64,
    pub valid_until: u64,
}

impl SessionValidity {
    const MAX_U48: u64 = (1 << 48) - 1;

    pub(crate) fn check(&self) -> Result<()> {
        if self.valid_after > Self::MAX_U48 || self.valid_until > Self::MAX_U48 {
            return Err(SessionError::AuthorityComposition(
                "validity bounds must fit in uint48".into(),
            ));
        }
        if self.valid_until != 0 && self.valid_until <= self.valid_after {
            return Err(SessionError::AuthorityComposition(format!(
                "session validUntil {} is not after validAfter {}",
                self.valid_until, self.valid_after
            )));
        }
        Ok(())
    }
}

/// Policy-bounded session co-signer backed by an ephemeral key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionAuthority {
    key: SessionKey,
    permissions: PermissionSet,
    scope: SignatureScope,
    validity: SessionValidity,
    validator: Address,
    enable_data: Bytes,
    permission_id: B256,
    enable_signature: Bytes,
}

impl SessionAuthority {
    fn enable(
        key: Address,
        permissions: &PermissionSet,
        scope: &SignatureScope,
        validity: SessionValidity,
        deployment: &KernelDeployment,
    ) -> PermissionEnable {
        PermissionEnable {
            validAfter: U48::saturating_from(validity.valid_after),
            validUntil: U48::saturating_from(validity.valid_until),
            signer: deployment.ecdsa_signer,
            signerData: Bytes::copy_from_slice(key.as_slice()),
            policies: vec![
                PolicyConfig {
                    policy: deployment.merkle_policy,
                    initData: permissions.init_data(),
                },
                PolicyConfig {
                    policy: deployment.signature_policy,
                    initData: scope.init_data(),
                },
            ],
        }
    }

    /// Reassemble a session whose root approval already exists.
    pub(crate) fn from_parts(
        key: SessionKey,
        permissions: PermissionSet,
        scope: SignatureScope,
        validity: SessionValidity,
        enable_signature: Bytes,
        deployment: &KernelDeployment,
    ) -> Self {
        let enable = Self::enable(key.address(), &permissions, &scope, validity, deployment);
        let enable_data = kernel::enable_data(&enable);
        let permission_id = kernel::permission_id(&enable_data);
        Self {
            key,
            permissions,
            scope,
            validity,
            validator: deployment.permission_validator,
            enable_data,
            permission_id,
            enable_signature,
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn scope(&self) -> &SignatureScope {
        &self.scope
    }

    pub fn validity(&self) -> SessionValidity {
        self.validity
    }

    pub fn enable_data(&self) -> &Bytes {
        &self.enable_data
    }

    pub fn permission_id(&self) -> B256 {
        self.permission_id
    }

    pub fn enable_signature(&self) -> &Bytes {
        &self.enable_signature
    }

    pub fn enable_prefix(&self) -> kernel::EnablePrefix {
        kernel::EnablePrefix {
            valid_after: self.validity.valid_after,
            valid_until: self.validity.valid_until,
            validator: self.validator,
            executor: Address::ZERO,
            enable_data: self.enable_data.clone(),
            enable_signature: self.enable_signature.clone(),
        }
    }

    /// Merkle proofs for the batch, then the (empty) signature policy slot.
    fn user_operation_payload(&self, calls: &[CallData], signer_sig: Bytes) -> Bytes {
        kernel::policy_payload(
            vec![self.permissions.policy_data(calls), Bytes::new()],
            signer_sig,
        )
    }

    fn message_payload(&self, signer_sig: Bytes) -> Bytes {
        kernel::policy_payload(vec![Bytes::new(), Bytes::new()], signer_sig)
    }

    fn user_operation_envelope(&self, session_enabled: bool, payload: &[u8]) -> Bytes {
        if session_enabled {
            kernel::plugin_envelope(self.permission_id, payload)
        } else {
            kernel::enable_envelope(&self.enable_prefix(), self.permission_id, payload)
        }
    }
}

/// What an authority is asked to sign.
#[derive(Clone, Copy, Debug)]
pub enum SignPayload<'a> {
    /// ERC-4337 `userOpHash` plus the batch it covers.
    UserOperation {
        hash: B256,
        calls: &'a [CallData],
        session_enabled: bool,
    },
    /// Kernel-wrapped ERC-1271 digest.
    Message(B256),
}

/// The account's active authority composition.
#[derive(Clone, Debug)]
pub enum Authority {
    RootOnly(RootAuthority),
    /// The session signs; the root is only needed for its public identity.
    RootPlusSession {
        root: RootIdentity,
        session: SessionAuthority,
    },
}

impl Authority {
    pub fn root(&self) -> &RootIdentity {
        match self {
            Authority::RootOnly(root) => root.identity(),
            Authority::RootPlusSession { root, .. } => root,
        }
    }

    pub fn session(&self) -> Option<&SessionAuthority> {
        match self {
            Authority::RootOnly(_) => None,
            Authority::RootPlusSession { session, .. } => Some(session),
        }
    }

    pub async fn sign(&self, payload: SignPayload<'_>) -> Result<Bytes> {
        match (self, payload) {
            (Authority::RootOnly(root), SignPayload::UserOperation { hash, .. }) => {
                let sig = root.sign_digest(eip191_hash_message(hash)).await?;
                Ok(kernel::sudo_envelope(root.identity.permission_id, &sig))
            }
            (Authority::RootOnly(root), SignPayload::Message(digest)) => {
                let sig = root.sign_digest(digest).await?;
                Ok(prefixed(root.identity.permission_id, &sig))
            }
            (
                Authority::RootPlusSession { session, .. },
                SignPayload::UserOperation {
                    hash,
                    calls,
                    session_enabled,
                },
            ) => {
                let sig = session.key.sign_digest(eip191_hash_message(hash))?;
                let payload = session.user_operation_payload(calls, Bytes::copy_from_slice(&sig));
                Ok(session.user_operation_envelope(session_enabled, &payload))
            }
            (Authority::RootPlusSession { session, .. }, SignPayload::Message(digest)) => {
                let sig = session.key.sign_digest(digest)?;
                let payload = session.message_payload(Bytes::copy_from_slice(&sig));
                Ok(prefixed(session.permission_id, &payload))
            }
        }
    }

    /// Signature of the same shape as [`Authority::sign`] would produce, without signing.
    pub fn dummy_signature(&self, payload: SignPayload<'_>) -> Bytes {
        match (self, payload) {
            (Authority::RootOnly(root), SignPayload::UserOperation { .. }) => {
                kernel::sudo_envelope(root.identity.permission_id, &root.dummy_signer_signature())
            }
            (Authority::RootOnly(root), SignPayload::Message(_)) => {
                prefixed(root.identity.permission_id, &root.dummy_signer_signature())
            }
            (
                Authority::RootPlusSession { session, .. },
                SignPayload::UserOperation {
                    calls,
                    session_enabled,
                    ..
                },
            ) => {
                let payload = session
                    .user_operation_payload(calls, Bytes::copy_from_slice(&DUMMY_ECDSA_SIGNATURE));
                session.user_operation_envelope(session_enabled, &payload)
            }
            (Authority::RootPlusSession { session, .. }, SignPayload::Message(_)) => {
                let payload =
                    session.message_payload(Bytes::copy_from_slice(&DUMMY_ECDSA_SIGNATURE));
                prefixed(session.permission_id, &payload)
            }
        }
    }
}

fn prefixed(permission_id: B256, body: &[u8]) -> Bytes {
    let mut out = Vec::with_capacity(32 + body.len());
    out.extend_from_slice(permission_id.as_slice());
    out.extend_from_slice(body);
    out.into()
}

/// A composed Kernel account. Only constructed fully formed.
#[derive(Clone, Debug)]
pub struct SmartAccount {
    address: Address,
    index: U256,
    chain_id: u64,
    kernel_version: String,
    deployment: KernelDeployment,
    init_data: Bytes,
    authority: Authority,
}

impl SmartAccount {
    pub(crate) fn new(
        chain_id: u64,
        kernel_version: String,
        deployment: KernelDeployment,
        index: U256,
        authority: Authority,
    ) -> Self {
        let init_data = kernel::initialize_calldata(&deployment, authority.root().enable_data());
        let address = kernel::counterfactual_address(&deployment, &init_data, index);
        Self {
            address,
            index,
            chain_id,
            kernel_version,
            deployment,
            init_data,
            authority,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn index(&self) -> U256 {
        self.index
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn kernel_version(&self) -> &str {
        &self.kernel_version
    }

    pub fn deployment(&self) -> &KernelDeployment {
        &self.deployment
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// `Kernel.initialize` calldata the factory runs on deployment.
    pub fn init_data(&self) -> &Bytes {
        &self.init_data
    }

    pub fn factory_calldata(&self) -> Bytes {
        kernel::factory_calldata(&self.deployment, &self.init_data, self.index)
    }

    pub fn init_code(&self) -> Bytes {
        kernel::init_code(&self.deployment, &self.init_data, self.index)
    }

    /// EIP-712 domain the account validates ERC-1271 signatures under.
    pub fn kernel_domain(&self) -> TypedDomain {
        eip712::kernel_domain(self.address, self.chain_id, &self.kernel_version)
    }
}

/// How to obtain the root signer.
#[derive(Clone)]
pub enum RootSignerDescriptor {
    Passkey {
        server_url: String,
        passkey_name: String,
        mode: WebAuthnMode,
        authenticator: Arc<dyn PasskeyAuthenticator>,
    },
    Eoa(Arc<dyn Signer>),
}

/// Builds root-only and root-plus-session accounts.
#[derive(Clone, Debug)]
pub struct AuthorityComposer {
    chain_id: u64,
    kernel_version: String,
    deployment: KernelDeployment,
    index: U256,
}

impl AuthorityComposer {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            chain_id: config.chain_id,
            kernel_version: config.kernel_version.clone(),
            deployment: config.deployment.clone(),
            index: U256::ZERO,
        }
    }

    /// Factory salt index; distinct indexes give distinct accounts for the same root.
    pub fn with_index(mut self, index: U256) -> Self {
        self.index = index;
        self
    }

    pub async fn compose_root(&self, descriptor: RootSignerDescriptor) -> Result<RootAuthority> {
        self.deployment.validate()?;
        let root = match descriptor {
            RootSignerDescriptor::Eoa(signer) => RootAuthority::from_eoa(signer, &self.deployment),
            RootSignerDescriptor::Passkey {
                server_url,
                passkey_name,
                mode,
                authenticator,
            } => {
                let credential = PasskeyServer::new(server_url)
                    .enroll(authenticator.as_ref(), &passkey_name, mode)
                    .await?;
                RootAuthority::from_passkey(&credential, authenticator, &self.deployment)?
            }
        };
        info!(permission_id = %root.identity.permission_id, "composed root authority");
        Ok(root)
    }

    /// Account driven by the root alone.
    pub fn root_account(&self, root: RootAuthority) -> SmartAccount {
        SmartAccount::new(
            self.chain_id,
            self.kernel_version.clone(),
            self.deployment.clone(),
            self.index,
            Authority::RootOnly(root),
        )
    }

    /// Attach a session to `root`'s account. The root signs the enable approval here.
    pub async fn compose_session(
        &self,
        root: &RootAuthority,
        permissions: PermissionSet,
        scope: SignatureScope,
        session_key: SessionKey,
        validity: SessionValidity,
    ) -> Result<SmartAccount> {
        self.deployment.validate()?;
        validity.check()?;

        let root_only = self.root_account(root.clone());
        let enable = SessionAuthority::enable(
            session_key.address(),
            &permissions,
            &scope,
            validity,
            &self.deployment,
        );
        let enable_data = kernel::enable_data(&enable);
        let digest = eip712::validator_approved_digest(
            &root_only.kernel_domain(),
            IKernel::executeBatchCall::SELECTOR,
            kernel::pack_validator_data(
                validity.valid_after,
                validity.valid_until,
                self.deployment.permission_validator,
            ),
            Address::ZERO,
            &enable_data,
        );
        let approval = root.sign_digest(digest).await.map_err(|e| {
            SessionError::AuthorityComposition(format!("root did not approve session: {e}"))
        })?;
        let enable_signature = prefixed(root.identity.permission_id, &approval);

        let session = SessionAuthority::from_parts(
            session_key,
            permissions,
            scope,
            validity,
            enable_signature,
            &self.deployment,
        );
        info!(
            account = %root_only.address(),
            permission_id = %session.permission_id,
            permissions = session.permissions.len(),
            "composed session authority"
        );

        Ok(SmartAccount::new(
            self.chain_id,
            self.kernel_version.clone(),
            self.deployment.clone(),
            self.index,
            Authority::RootPlusSession {
                root: root.identity.clone(),
                session,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        kernel::constants::{MODE_ENABLE, MODE_PLUGIN, MODE_SUDO},
        policy::{PermissionEntry, PolicyEngine},
        test_support::{network_config, owner_key, session_key},
        utils::crypto,
    };

    fn permissions() -> PermissionSet {
        PolicyEngine::new()
            .build_permission_set(&[PermissionEntry::new(
                Address::repeat_byte(0x70),
                "transfer(address,uint256)",
            )])
            .unwrap()
    }

    async fn session_account() -> (RootAuthority, SmartAccount) {
        let composer = AuthorityComposer::new(&network_config());
        let root = composer
            .compose_root(RootSignerDescriptor::Eoa(Arc::new(owner_key())))
            .await
            .unwrap();
        let account = composer
            .compose_session(
                &root,
                permissions(),
                SignatureScope::default(),
                session_key(),
                SessionValidity::default(),
            )
            .await
            .unwrap();
        (root, account)
    }

    #[tokio::test]
    async fn session_shares_root_account_address() {
        let composer = AuthorityComposer::new(&network_config());
        let (root, account) = session_account().await;
        assert_eq!(account.address(), composer.root_account(root).address());

        let other = composer.clone().with_index(U256::from(1u64));
        let root = other
            .compose_root(RootSignerDescriptor::Eoa(Arc::new(owner_key())))
            .await
            .unwrap();
        assert_ne!(other.root_account(root).address(), account.address());
    }

    #[tokio::test]
    async fn enable_signature_is_root_approval() {
        let (root, account) = session_account().await;
        let session = account.authority().session().unwrap();

        let digest = eip712::validator_approved_digest(
            &account.kernel_domain(),
            IKernel::executeBatchCall::SELECTOR,
            kernel::pack_validator_data(0, 0, account.deployment().permission_validator),
            Address::ZERO,
            session.enable_data(),
        );
        let sig = session.enable_signature();
        assert_eq!(&sig[..32], root.identity().permission_id().as_slice());
        let raw: [u8; 65] = sig[32..].try_into().unwrap();
        assert_eq!(crypto::ecrecover_address(digest, &raw), Some(owner_key().address()));
    }

    #[tokio::test]
    async fn envelopes_follow_enable_state() {
        let (_, account) = session_account().await;
        let calls = [CallData::new(
            Address::repeat_byte(0x70),
            U256::ZERO,
            vec![0xa9, 0x05, 0x9c, 0xbb],
        )];
        let hash = B256::repeat_byte(9);

        let first = account
            .authority()
            .sign(SignPayload::UserOperation {
                hash,
                calls: &calls,
                session_enabled: false,
            })
            .await
            .unwrap();
        let later = account
            .authority()
            .sign(SignPayload::UserOperation {
                hash,
                calls: &calls,
                session_enabled: true,
            })
            .await
            .unwrap();
        assert_eq!(&first[..4], &MODE_ENABLE);
        assert_eq!(&later[..4], &MODE_PLUGIN);

        let dummy = account.authority().dummy_signature(SignPayload::UserOperation {
            hash,
            calls: &calls,
            session_enabled: true,
        });
        assert_eq!(dummy.len(), later.len());
    }

    #[tokio::test]
    async fn root_only_signs_in_sudo_mode() {
        let composer = AuthorityComposer::new(&network_config());
        let root = composer
            .compose_root(RootSignerDescriptor::Eoa(Arc::new(owner_key())))
            .await
            .unwrap();
        let account = composer.root_account(root);
        let sig = account
            .authority()
            .sign(SignPayload::UserOperation {
                hash: B256::ZERO,
                calls: &[],
                session_enabled: false,
            })
            .await
            .unwrap();
        assert_eq!(&sig[..4], &MODE_SUDO);
        assert_eq!(sig.len(), 4 + 32 + 65);
    }

    #[test]
    fn unverified_passkey_cannot_back_root() {
        struct Never;
        #[async_trait::async_trait]
        impl PasskeyAuthenticator for Never {
            async fn create_credential(
                &self,
                _: &str,
                _: &serde_json::Value,
            ) -> Result<crate::passkey::CreatedCredential> {
                Err(SessionError::Passkey("unused".into()))
            }
            async fn get_assertion(&self, _: &serde_json::Value) -> Result<serde_json::Value> {
                Err(SessionError::Passkey("unused".into()))
            }
            async fn sign_challenge(
                &self,
                _: &str,
                _: &[u8],
            ) -> Result<crate::passkey::WebAuthnAssertion> {
                Err(SessionError::Passkey("unused".into()))
            }
        }

        let credential = PasskeyCredential {
            credential_id: "abc".into(),
            pub_x: B256::repeat_byte(1),
            pub_y: B256::repeat_byte(2),
            verified: false,
        };
        let err =
            RootAuthority::from_passkey(&credential, Arc::new(Never), &network_config().deployment)
                .unwrap_err();
        assert!(matches!(err, SessionError::AuthorityComposition(_)));
    }

    #[tokio::test]
    async fn inverted_validity_is_rejected() {
        let composer = AuthorityComposer::new(&network_config());
        let root = composer
            .compose_root(RootSignerDescriptor::Eoa(Arc::new(owner_key())))
            .await
            .unwrap();
        let err = composer
            .compose_session(
                &root,
                permissions(),
                SignatureScope::default(),
                session_key(),
                SessionValidity {
                    valid_after: 10,
                    valid_until: 5,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::AuthorityComposition(_)));
    }
}
