//! Message, typed-data and user operation signing through the account's active authority.
//!
//! Message signatures are produced over the Kernel wrapper digest the account checks in
//! `isValidSignature`. While the account is not deployed they are additionally wrapped for
//! ERC-6492 so a universal validator can deploy it counterfactually.

use alloy_dyn_abi::TypedData;
use alloy_primitives::{eip191_hash_message, Bytes, B256};
use kernel_session_types::{CallData, Order, SignedOrder, TypedDomain};
use tracing::debug;

use crate::{
    authority::{SignPayload, SmartAccount},
    config::NetworkConfig,
    errors::{Result, SessionError},
    rpc::RpcClient,
    user_op::UserOperation,
    utils::{eip712, kernel},
};

#[derive(Clone, Debug)]
pub struct SigningService {
    chain: RpcClient,
}

impl SigningService {
    pub fn new(config: &NetworkConfig) -> Self {
        Self::with_rpc(RpcClient::new(&config.rpc_url))
    }

    pub fn with_rpc(chain: RpcClient) -> Self {
        Self { chain }
    }

    /// ERC-1271 signature over `hash` as the account will validate it.
    pub async fn sign_hash(&self, account: &SmartAccount, hash: B256) -> Result<Bytes> {
        let digest = eip712::kernel_wrapped_digest(&account.kernel_domain(), hash);
        let signature = account.authority().sign(SignPayload::Message(digest)).await?;

        let deployed = !self.chain.get_code(account.address()).await?.is_empty();
        debug!(account = %account.address(), %hash, deployed, "signed message hash");
        if deployed {
            Ok(signature)
        } else {
            Ok(kernel::wrap_erc6492(
                account.deployment().factory,
                account.factory_calldata(),
                signature,
            ))
        }
    }

    /// EIP-191 personal message.
    pub async fn sign_message(&self, account: &SmartAccount, message: &[u8]) -> Result<Bytes> {
        self.sign_hash(account, eip191_hash_message(message)).await
    }

    /// EIP-712 typed data in the standard JSON form (`types`, `primaryType`, `domain`, `message`).
    pub async fn sign_typed_data(
        &self,
        account: &SmartAccount,
        typed: &TypedData,
    ) -> Result<Bytes> {
        let hash = typed
            .eip712_signing_hash()
            .map_err(|e| SessionError::Encoding(format!("typed data: {e}")))?;
        self.sign_hash(account, hash).await
    }

    /// Sign `order` under `domain`. The signature only verifies against
    /// `domain.verifying_contract`.
    pub async fn sign_order(
        &self,
        account: &SmartAccount,
        domain: &TypedDomain,
        order: Order,
    ) -> Result<SignedOrder> {
        let signature = self
            .sign_hash(account, eip712::order_digest(domain, &order))
            .await?;
        Ok(SignedOrder { order, signature })
    }

    /// Validator signature for `op` as submitted to the bundler.
    pub async fn sign_user_operation(
        &self,
        account: &SmartAccount,
        op: &UserOperation,
        calls: &[CallData],
        session_enabled: bool,
    ) -> Result<Bytes> {
        let hash = op.hash(account.deployment().entry_point, account.chain_id());
        account
            .authority()
            .sign(SignPayload::UserOperation {
                hash,
                calls,
                session_enabled,
            })
            .await
    }
}
