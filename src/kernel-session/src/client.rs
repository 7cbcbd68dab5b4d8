//! One handle over composition, persistence, signing, verification and operations for a network.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use kernel_session_types::{CallData, Order, SignedOrder, TypedDomain};
use tracing::info;

use crate::{
    authority::{
        AuthorityComposer, RootAuthority, RootSignerDescriptor, SessionValidity, SmartAccount,
    },
    codec::SessionCodec,
    config::NetworkConfig,
    errors::{Result, SessionError},
    orchestrator::OperationOrchestrator,
    policy::{PermissionSet, SignatureScope},
    rpc::RpcClient,
    signer::SessionKey,
    signing::SigningService,
    user_op::UserOperationReceipt,
    verifier::SignatureVerifier,
};

#[derive(Clone, Debug)]
pub struct SessionClient {
    config: NetworkConfig,
    composer: AuthorityComposer,
    orchestrator: OperationOrchestrator,
    signing: SigningService,
    verifier: SignatureVerifier,
}

impl SessionClient {
    pub fn new(config: NetworkConfig) -> Result<Self> {
        config.validate()?;
        let chain = RpcClient::new(&config.rpc_url);
        Ok(Self {
            composer: AuthorityComposer::new(&config),
            orchestrator: OperationOrchestrator::new(&config),
            signing: SigningService::with_rpc(chain.clone()),
            verifier: SignatureVerifier::with_rpc(chain),
            config,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn composer(&self) -> &AuthorityComposer {
        &self.composer
    }

    pub fn orchestrator(&self) -> &OperationOrchestrator {
        &self.orchestrator
    }

    pub fn signing(&self) -> &SigningService {
        &self.signing
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    pub async fn compose_root(&self, descriptor: RootSignerDescriptor) -> Result<RootAuthority> {
        self.composer.compose_root(descriptor).await
    }

    pub async fn compose_session(
        &self,
        root: &RootAuthority,
        permissions: PermissionSet,
        scope: SignatureScope,
        session_key: SessionKey,
        validity: SessionValidity,
    ) -> Result<SmartAccount> {
        self.composer
            .compose_session(root, permissions, scope, session_key, validity)
            .await
    }

    pub fn export_session(&self, account: &SmartAccount) -> Result<String> {
        SessionCodec::serialize(account)
    }

    /// Restore a session and check it belongs to this client's network and deployment.
    pub fn import_session(&self, blob: &str, account: Address) -> Result<SmartAccount> {
        let restored = SessionCodec::deserialize(blob, account)?;
        if restored.chain_id() != self.config.chain_id {
            return Err(SessionError::Deserialization(format!(
                "session is for chain {}, client is on {}",
                restored.chain_id(),
                self.config.chain_id
            )));
        }
        if restored.deployment() != &self.config.deployment {
            return Err(SessionError::Deserialization(
                "session was composed against another Kernel deployment".into(),
            ));
        }
        info!(%account, "session imported");
        Ok(restored)
    }

    pub async fn sign_message(&self, account: &SmartAccount, message: &[u8]) -> Result<Bytes> {
        self.signing.sign_message(account, message).await
    }

    pub async fn sign_order(
        &self,
        account: &SmartAccount,
        domain: &TypedDomain,
        order: Order,
    ) -> Result<SignedOrder> {
        self.signing.sign_order(account, domain, order).await
    }

    /// Local order hash, checked against the gateway's `getOrderHash`.
    pub async fn order_hash(&self, domain: &TypedDomain, order: &Order) -> Result<B256> {
        self.verifier.check_order_hash(domain, order).await
    }

    pub async fn send(
        &self,
        account: &SmartAccount,
        calls: Vec<CallData>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<UserOperationReceipt> {
        self.orchestrator
            .send_user_operation(account, calls, poll_interval, timeout)
            .await
    }
}
