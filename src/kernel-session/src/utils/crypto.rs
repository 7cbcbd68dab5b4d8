//! Cryptographic helpers: secp256k1 signing/recovery for ECDSA signers and P-256 checks for
//! WebAuthn assertions.

use alloy_primitives::{keccak256, Address, B256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use p256::ecdsa::signature::Verifier;
use sha2::{Digest, Sha256};

use crate::errors::{Result, SessionError};

/// Ethereum address of a secp256k1 public key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Sign a 32-byte digest, producing `r || s || v` with `v` in {27, 28}.
pub fn sign_digest(key: &SigningKey, digest: B256) -> Result<[u8; 65]> {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(digest.as_slice())
        .map_err(|e| SessionError::Signing(e.to_string()))?;
    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = 27 + recovery_id.to_byte();
    Ok(out)
}

/// Recover an EOA address from a 32-byte digest and an ECDSA signature.
///
/// We accept signatures with v in {0,1,27,28}. If v is not recognised, we try both parities.
pub fn ecrecover_address(digest: B256, sig: &[u8; 65]) -> Option<Address> {
    let signature = Signature::from_slice(&sig[..64]).ok()?;

    let candidates: Vec<u8> = match sig[64] {
        27 | 28 => vec![sig[64] - 27],
        0 | 1 => vec![sig[64]],
        _ => vec![0, 1],
    };

    candidates.into_iter().find_map(|v| {
        let recovery_id = RecoveryId::from_byte(v)?;
        VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
            .ok()
            .map(|key| address_of(&key))
    })
}

/// SHA-256, the hash WebAuthn authenticators apply to `clientDataJSON`.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Verify a WebAuthn assertion: P-256 over `authenticatorData || sha256(clientDataJSON)`.
pub fn verify_webauthn_assertion(
    pub_x: B256,
    pub_y: B256,
    authenticator_data: &[u8],
    client_data_json: &[u8],
    r: B256,
    s: B256,
) -> bool {
    let mut sec1 = [0u8; 65];
    sec1[0] = 0x04;
    sec1[1..33].copy_from_slice(pub_x.as_slice());
    sec1[33..].copy_from_slice(pub_y.as_slice());
    let Ok(key) = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1) else {
        return false;
    };

    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(r.as_slice());
    rs[32..].copy_from_slice(s.as_slice());
    let Ok(signature) = p256::ecdsa::Signature::from_slice(&rs) else {
        return false;
    };

    let mut message = authenticator_data.to_vec();
    message.extend_from_slice(&sha256(client_data_json));
    key.verify(&message, &signature).is_ok()
}
