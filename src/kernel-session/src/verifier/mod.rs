//! Order hashing and on-chain signature verification.
//!
//! The three on-chain paths (requestor-forwarded ERC-1271, the ERC-6492 universal validator and
//! the gateway's typed-order entrypoint) are independent checks; none is preferred over another.

pub mod offline;

use alloy_primitives::{Address, Bytes, B256};
use kernel_session_types::{Order, SignedOrder, TypedDomain, ORDER_TYPE};
use tracing::{debug, warn};

use crate::{
    config::NetworkConfig,
    errors::{Result, SessionError, VerifierKind},
    kernel::interfaces::{IOrderGateway, ISignatureRequestor, IUniversalSigValidator},
    rpc::RpcClient,
    utils::eip712,
};

pub use offline::{OfflineVerifier, Rejection, ValidationMode};

/// One on-chain verification call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationRequest {
    /// `requestor.verifySignature(signer, hash, signature)`, forwarding to the account's
    /// `isValidSignature`.
    Erc1271 {
        requestor: Address,
        signer: Address,
        hash: B256,
        signature: Bytes,
    },
    /// `validator.isValidSig(signer, hash, signature)`; accepts ERC-6492 wrapped signatures.
    Universal {
        validator: Address,
        signer: Address,
        hash: B256,
        signature: Bytes,
    },
    /// `gateway.verifyOrderSignature(signedOrder)`.
    TypedOrder {
        gateway: Address,
        signed_order: SignedOrder,
    },
}

impl VerificationRequest {
    pub fn kind(&self) -> VerifierKind {
        match self {
            VerificationRequest::Erc1271 { .. } => VerifierKind::Erc1271,
            VerificationRequest::Universal { .. } => VerifierKind::Universal,
            VerificationRequest::TypedOrder { .. } => VerifierKind::TypedOrder,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    chain: RpcClient,
}

impl SignatureVerifier {
    pub fn new(config: &NetworkConfig) -> Self {
        Self::with_rpc(RpcClient::new(&config.rpc_url))
    }

    pub fn with_rpc(chain: RpcClient) -> Self {
        Self { chain }
    }

    /// `keccak256(0x1901 || domainSeparator || structHash)` for `order`.
    pub fn compute_order_hash(domain: &TypedDomain, order: &Order) -> B256 {
        eip712::order_digest(domain, order)
    }

    /// `gateway.getOrderHash(order)`.
    pub async fn onchain_order_hash(&self, gateway: Address, order: &Order) -> Result<B256> {
        let hash = self
            .chain
            .call(
                gateway,
                &IOrderGateway::getOrderHashCall {
                    order: order.into(),
                },
            )
            .await?
            .orderHash;
        Ok(hash)
    }

    /// Local hash, after checking it equals the verifying contract's own `getOrderHash`.
    pub async fn check_order_hash(&self, domain: &TypedDomain, order: &Order) -> Result<B256> {
        let local = Self::compute_order_hash(domain, order);
        let onchain = self.onchain_order_hash(domain.verifying_contract, order).await?;
        if local != onchain {
            warn!(%local, %onchain, gateway = %domain.verifying_contract, "order hash mismatch");
            return Err(SessionError::HashMismatch { local, onchain });
        }
        debug!(hash = %local, "order hash agrees with gateway");
        Ok(local)
    }

    /// EIP-5267 domain of `contract`.
    pub async fn fetch_domain(&self, contract: Address) -> Result<TypedDomain> {
        let domain = self
            .chain
            .call(contract, &IOrderGateway::eip712DomainCall {})
            .await?;
        let chain_id = u64::try_from(domain.chainId).map_err(|_| {
            SessionError::Config(format!(
                "{contract} reports chain id {} beyond u64",
                domain.chainId
            ))
        })?;
        Ok(TypedDomain::new(
            domain.name,
            domain.version,
            chain_id,
            domain.verifyingContract,
        ))
    }

    /// Compare `contract.ORDER_TYPEHASH()` with `keccak256(ORDER_TYPE)`.
    pub async fn check_type_hash(&self, contract: Address) -> Result<B256> {
        let local = eip712::type_hash(ORDER_TYPE);
        let onchain = self
            .chain
            .call(contract, &IOrderGateway::ORDER_TYPEHASHCall {})
            .await?
            .typeHash;
        if local != onchain {
            return Err(SessionError::HashMismatch { local, onchain });
        }
        Ok(local)
    }

    /// Verdict of one verifier. A reverting verifier counts as a rejection.
    pub async fn verify_on_chain(&self, request: &VerificationRequest) -> Result<bool> {
        let outcome = match request {
            VerificationRequest::Erc1271 {
                requestor,
                signer,
                hash,
                signature,
            } => self
                .chain
                .call(
                    *requestor,
                    &ISignatureRequestor::verifySignatureCall {
                        signer: *signer,
                        hash: *hash,
                        signature: signature.clone(),
                    },
                )
                .await
                .map(|r| r.valid),
            VerificationRequest::Universal {
                validator,
                signer,
                hash,
                signature,
            } => self
                .chain
                .call(
                    *validator,
                    &IUniversalSigValidator::isValidSigCall {
                        signer: *signer,
                        hash: *hash,
                        signature: signature.clone(),
                    },
                )
                .await
                .map(|r| r.valid),
            VerificationRequest::TypedOrder {
                gateway,
                signed_order,
            } => self
                .chain
                .call(
                    *gateway,
                    &IOrderGateway::verifyOrderSignatureCall {
                        signedOrder: signed_order.into(),
                    },
                )
                .await
                .map(|r| r.valid),
        };

        match outcome {
            Ok(valid) => {
                debug!(verifier = %request.kind(), valid, "on-chain verification");
                Ok(valid)
            }
            Err(e) if e.is_revert() => {
                debug!(verifier = %request.kind(), error = %e, "verifier reverted");
                Ok(false)
            }
            Err(e) => Err(SessionError::Rpc(e)),
        }
    }

    /// Like [`SignatureVerifier::verify_on_chain`], failing with `VerificationFailure` on `false`.
    pub async fn ensure_valid(&self, request: &VerificationRequest) -> Result<()> {
        if self.verify_on_chain(request).await? {
            Ok(())
        } else {
            Err(SessionError::VerificationFailure {
                verifier: request.kind(),
            })
        }
    }
}
