//! Kernel (ERC-4337) smart-account client with policy-bound session keys.
//!
//! - [`policy`]: permission sets committed to a Merkle root, and signature scopes.
//! - [`authority`]: root (passkey or EOA) and session authorities, and the accounts built from
//!   them.
//! - [`codec`]: versioned session persistence.
//! - [`orchestrator`]: user operation lifecycle against a bundler and paymaster.
//! - [`signing`] / [`verifier`]: EIP-712 order signing and on-chain/offline verification.

pub mod authority;
pub mod client;
pub mod codec;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod kernel;
pub mod orchestrator;
pub mod passkey;
pub mod policy;
pub mod rpc;
pub mod signer;
pub mod signing;
pub mod user_op;
pub mod utils;
pub mod verifier;

#[cfg(test)]
mod test_support;

pub use authority::{
    Authority, AuthorityComposer, RootAuthority, RootDescriptor, RootSignerDescriptor,
    SessionAuthority, SessionValidity, SignPayload, SmartAccount,
};
pub use client::SessionClient;
pub use codec::SessionCodec;
pub use config::{KernelDeployment, NetworkConfig};
pub use errors::{Result, RpcError, SessionError, VerifierKind};
pub use gateway::OrderGateway;
pub use orchestrator::OperationOrchestrator;
pub use passkey::{PasskeyAuthenticator, PasskeyCredential, PasskeyServer, WebAuthnMode};
pub use policy::{
    ArgPattern, Permission, PermissionEntry, PermissionSet, PolicyEngine, SignatureScope,
};
pub use signer::{SessionKey, Signer};
pub use signing::SigningService;
pub use user_op::{
    OperationHash, SponsoredUserOperation, UnsignedUserOperation, UserOperation,
    UserOperationReceipt,
};
pub use verifier::{OfflineVerifier, SignatureVerifier, VerificationRequest};

pub use kernel_session_types::{CallData, Order, ParamCondition, SignedOrder, TypedDomain};
