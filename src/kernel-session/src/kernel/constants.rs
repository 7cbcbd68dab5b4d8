//! Kernel constants mirrored from Kernel v2 / ERC-4337 v0.6 / ERC-6492.

use alloy_primitives::{address, b256, hex, Address, B256, U256};

/// EntryPoint v0.6, the entry point Kernel v2 accounts are bound to.
pub const ENTRY_POINT_V06: Address = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

// Validator modes: first four bytes of `userOp.signature`.
pub const MODE_SUDO: [u8; 4] = [0, 0, 0, 0];
pub const MODE_PLUGIN: [u8; 4] = [0, 0, 0, 1];
pub const MODE_ENABLE: [u8; 4] = [0, 0, 0, 2];

/// ERC-1271 `isValidSignature` success value.
pub const ERC1271_MAGIC_VALUE: [u8; 4] = hex!("1626ba7e");

/// ERC-6492 suffix marking a counterfactual-account signature.
pub const ERC6492_MAGIC_SUFFIX: B256 =
    b256!("6492649264926492649264926492649264926492649264926492649264926492");

pub const KERNEL_DOMAIN_NAME: &str = "Kernel";
pub const DEFAULT_KERNEL_VERSION: &str = "0.2.4";

/// Type wrapped around every hash the account validates via ERC-1271.
pub const KERNEL_WRAPPER_TYPE: &str = "Kernel(bytes32 hash)";

/// Typed struct the root authority signs to enable a session validator.
pub const VALIDATOR_APPROVED_TYPE: &str =
    "ValidatorApproved(bytes4 sig,uint256 validatorData,address executor,bytes enableData)";

/// Proof index used for calls no permission covers; the account rejects it on-chain.
pub const UNMATCHED_PERMISSION_INDEX: U256 = U256::MAX;

/// Well-formed ECDSA placeholder used while the paymaster/bundler simulates validation.
pub const DUMMY_ECDSA_SIGNATURE: [u8; 65] = hex!(
    "fffffffffffffffffffffffffffffff000000000000000000000000000000000"
    "7aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
    "1c"
);
