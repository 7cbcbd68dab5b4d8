//! EIP-712 digest composition.
//!
//! Everything here is computed field by field from the canonical type strings so the result can be
//! compared byte-for-byte with what the verifying contracts compute on-chain.

use alloy_primitives::{keccak256, Address, B256, I256, U256};
use kernel_session_types::{Order, TypedDomain, EIP712_DOMAIN_TYPE, ORDER_TYPE};

use crate::kernel::constants::{KERNEL_DOMAIN_NAME, KERNEL_WRAPPER_TYPE, VALIDATOR_APPROVED_TYPE};

pub fn type_hash(type_string: &str) -> B256 {
    keccak256(type_string.as_bytes())
}

fn address_word(address: Address) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[12..32].copy_from_slice(address.as_slice());
    padded
}

fn u64_word(value: u64) -> [u8; 32] {
    U256::from(value).to_be_bytes::<32>()
}

fn u8_word(value: u8) -> [u8; 32] {
    let mut padded = [0u8; 32];
    padded[31] = value;
    padded
}

/// Two's complement, as `int256` is ABI-encoded.
fn i256_word(value: I256) -> [u8; 32] {
    value.into_raw().to_be_bytes::<32>()
}

/// `keccak256(abi.encode(EIP712Domain typeHash, keccak(name), keccak(version), chainId,
/// verifyingContract))`.
pub fn domain_separator(domain: &TypedDomain) -> B256 {
    let mut buf = Vec::with_capacity(32 * 5);
    buf.extend_from_slice(type_hash(EIP712_DOMAIN_TYPE).as_slice());
    buf.extend_from_slice(keccak256(domain.name.as_bytes()).as_slice());
    buf.extend_from_slice(keccak256(domain.version.as_bytes()).as_slice());
    buf.extend_from_slice(&u64_word(domain.chain_id));
    buf.extend_from_slice(&address_word(domain.verifying_contract));
    keccak256(buf)
}

/// `keccak256(0x1901 || domainSeparator || structHash)`.
pub fn typed_digest(domain_separator: B256, struct_hash: B256) -> B256 {
    let mut buf = [0u8; 66];
    buf[0] = 0x19;
    buf[1] = 0x01;
    buf[2..34].copy_from_slice(domain_separator.as_slice());
    buf[34..66].copy_from_slice(struct_hash.as_slice());
    keccak256(buf)
}

pub fn order_struct_hash(order: &Order) -> B256 {
    let mut buf = Vec::with_capacity(32 * 11);
    buf.extend_from_slice(type_hash(ORDER_TYPE).as_slice());
    buf.extend_from_slice(&u8_word(order.action));
    buf.extend_from_slice(&order.market_id.to_be_bytes::<32>());
    buf.extend_from_slice(&i256_word(order.amount));
    buf.extend_from_slice(&order.price.to_be_bytes::<32>());
    buf.extend_from_slice(&order.expiry.to_be_bytes::<32>());
    buf.extend_from_slice(&u8_word(order.trade_type));
    buf.extend_from_slice(&address_word(order.owner));
    buf.extend_from_slice(&order.margin_xcd.to_be_bytes::<32>());
    buf.extend_from_slice(&order.relay_fee.to_be_bytes::<32>());
    buf.extend_from_slice(order.id.as_slice());
    keccak256(buf)
}

pub fn order_digest(domain: &TypedDomain, order: &Order) -> B256 {
    typed_digest(domain_separator(domain), order_struct_hash(order))
}

/// Domain under which a Kernel account validates signatures addressed to itself.
pub fn kernel_domain(account: Address, chain_id: u64, kernel_version: &str) -> TypedDomain {
    TypedDomain::new(KERNEL_DOMAIN_NAME, kernel_version, chain_id, account)
}

/// Digest the account actually checks in `isValidSignature(hash, sig)`: `Kernel(bytes32 hash)`.
pub fn kernel_wrapped_digest(kernel_domain: &TypedDomain, hash: B256) -> B256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(type_hash(KERNEL_WRAPPER_TYPE).as_slice());
    buf[32..].copy_from_slice(hash.as_slice());
    typed_digest(domain_separator(kernel_domain), keccak256(buf))
}

/// Digest the root signs to approve enabling a validator for `selector` (Kernel enable mode).
pub fn validator_approved_digest(
    kernel_domain: &TypedDomain,
    selector: [u8; 4],
    validator_data: U256,
    executor: Address,
    enable_data: &[u8],
) -> B256 {
    let mut selector_word = [0u8; 32];
    selector_word[..4].copy_from_slice(&selector);

    let mut buf = Vec::with_capacity(32 * 5);
    buf.extend_from_slice(type_hash(VALIDATOR_APPROVED_TYPE).as_slice());
    buf.extend_from_slice(&selector_word);
    buf.extend_from_slice(&validator_data.to_be_bytes::<32>());
    buf.extend_from_slice(&address_word(executor));
    buf.extend_from_slice(keccak256(enable_data).as_slice());
    typed_digest(domain_separator(kernel_domain), keccak256(buf))
}
