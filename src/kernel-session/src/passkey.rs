//! Passkey (WebAuthn) root authority support.
//!
//! The enrollment/assertion ceremony itself happens in a browser or OS authenticator and is
//! reached through [`PasskeyAuthenticator`]. [`PasskeyServer`] drives the four passkey server
//! endpoints around it and yields a [`PasskeyCredential`].

use std::fmt;

use alloy_primitives::{keccak256, uint, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use async_trait::async_trait;
use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use p256::{elliptic_curve::sec1::ToEncodedPoint, pkcs8::DecodePublicKey};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::errors::{Result, RpcError, SessionError};

/// Order of the P-256 group.
const P256_N: U256 =
    uint!(0xFFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551_U256);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WebAuthnMode {
    Register,
    Login,
}

/// Credential created by the authenticator during registration.
#[derive(Clone, Debug)]
pub struct CreatedCredential {
    /// base64url credential id.
    pub credential_id: String,
    /// DER `SubjectPublicKeyInfo` of the P-256 key.
    pub public_key_spki: Bytes,
    /// Registration response forwarded verbatim to `/register/verify`.
    pub response: Value,
}

/// Raw WebAuthn assertion over a challenge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebAuthnAssertion {
    pub authenticator_data: Bytes,
    pub client_data_json: String,
    pub r: B256,
    pub s: B256,
}

/// Browser/OS authenticator seam.
#[async_trait]
pub trait PasskeyAuthenticator: Send + Sync {
    /// `navigator.credentials.create` with the server's registration options.
    async fn create_credential(&self, username: &str, options: &Value) -> Result<CreatedCredential>;

    /// `navigator.credentials.get` with the server's login options. Returns the assertion JSON,
    /// which must carry the credential `id`.
    async fn get_assertion(&self, options: &Value) -> Result<Value>;

    /// Assert over `challenge` with the given credential.
    async fn sign_challenge(
        &self,
        credential_id: &str,
        challenge: &[u8],
    ) -> Result<WebAuthnAssertion>;
}

/// Enrolled passkey: public identity plus the server's verification verdict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasskeyCredential {
    pub credential_id: String,
    pub pub_x: B256,
    pub pub_y: B256,
    pub verified: bool,
}

impl PasskeyCredential {
    pub fn credential_id_hash(&self) -> B256 {
        credential_id_hash(&self.credential_id)
    }
}

/// `keccak256` of the decoded credential id (the raw string if it is not base64url).
pub fn credential_id_hash(credential_id: &str) -> B256 {
    match decode_base64(credential_id) {
        Some(raw) => keccak256(raw),
        None => keccak256(credential_id.as_bytes()),
    }
}

pub fn challenge_string(challenge: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(challenge)
}

fn decode_base64(s: &str) -> Option<Vec<u8>> {
    [URL_SAFE_NO_PAD, URL_SAFE, STANDARD, STANDARD_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(s).ok())
}

/// Affine coordinates of a P-256 key from its SPKI DER encoding.
pub fn p256_coordinates(spki_der: &[u8]) -> Result<(B256, B256)> {
    let key = p256::PublicKey::from_public_key_der(spki_der)
        .map_err(|e| SessionError::Passkey(format!("invalid passkey public key: {e}")))?;
    let point = key.to_encoded_point(false);
    match (point.x(), point.y()) {
        (Some(x), Some(y)) => Ok((B256::from_slice(x), B256::from_slice(y))),
        _ => Err(SessionError::Passkey("passkey public key is the identity".into())),
    }
}

/// `abi.encode(authenticatorData, clientDataJSON, challengeLocation, responseTypeLocation, r, s,
/// usePrecompiled)`.
///
/// `s` is normalised to the lower half of the curve order.
pub fn encode_webauthn_signature(assertion: &WebAuthnAssertion) -> Result<Bytes> {
    let client_data = &assertion.client_data_json;
    let challenge_location = client_data
        .find("\"challenge\"")
        .ok_or_else(|| SessionError::Passkey("clientDataJSON has no challenge".into()))?;
    let response_type_location = client_data
        .find("\"type\":\"webauthn.get\"")
        .ok_or_else(|| {
            SessionError::Passkey("clientDataJSON is not a webauthn.get response".into())
        })?;

    let r = U256::from_be_bytes(assertion.r.0);
    let mut s = U256::from_be_bytes(assertion.s.0);
    if s > P256_N >> 1 {
        s = P256_N - s;
    }

    let encoded = (
        assertion.authenticator_data.clone(),
        client_data.clone(),
        U256::from(challenge_location),
        U256::from(response_type_location),
        r,
        s,
        false,
    )
        .abi_encode_params();
    Ok(encoded.into())
}

/// Inverse of [`encode_webauthn_signature`].
pub fn decode_webauthn_signature(encoded: &[u8]) -> Option<WebAuthnAssertion> {
    let (authenticator_data, client_data_json, _, _, r, s, _) =
        <(Bytes, String, U256, U256, U256, U256, bool)>::abi_decode_params(encoded, true).ok()?;
    Some(WebAuthnAssertion {
        authenticator_data,
        client_data_json,
        r: B256::from(r.to_be_bytes::<32>()),
        s: B256::from(s.to_be_bytes::<32>()),
    })
}

/// Placeholder with the shape of a real assertion, for gas simulation.
pub fn dummy_webauthn_signature() -> Bytes {
    let client_data_json = format!(
        r#"{{"type":"webauthn.get","challenge":"{}","origin":"https://localhost","crossOrigin":false}}"#,
        challenge_string(&[0u8; 32])
    );
    let mut authenticator_data = vec![0x49; 32];
    authenticator_data.extend_from_slice(&[0x05, 0, 0, 0, 0]);
    (
        Bytes::from(authenticator_data),
        client_data_json,
        U256::from(23u64),
        U256::from(1u64),
        U256::MAX >> 1,
        P256_N >> 1,
        false,
    )
        .abi_encode_params()
        .into()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterOptions {
    options: Value,
    user_id: Value,
}

#[derive(Deserialize)]
struct RegisterVerify {
    verified: bool,
}

#[derive(Deserialize)]
struct LoginOptions {
    options: Value,
}

#[derive(Deserialize)]
struct LoginVerification {
    verified: bool,
}

#[derive(Deserialize)]
struct LoginVerify {
    verification: LoginVerification,
    pubkey: String,
}

/// Client of the passkey server (`/register/*`, `/login/*`).
#[derive(Clone)]
pub struct PasskeyServer {
    http: reqwest::Client,
    base_url: String,
}

impl fmt::Debug for PasskeyServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasskeyServer").field("base_url", &self.base_url).finish()
    }
}

impl PasskeyServer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "passkey server request");
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(RpcError::from)?;
        let status = response.status();
        let text = response.text().await.map_err(RpcError::from)?;
        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }
        Ok(serde_json::from_str(&text).map_err(RpcError::from)?)
    }

    pub async fn register(
        &self,
        authenticator: &dyn PasskeyAuthenticator,
        passkey_name: &str,
    ) -> Result<PasskeyCredential> {
        let RegisterOptions { options, user_id } = self
            .post("/register/options", json!({ "username": passkey_name }))
            .await?;
        let created = authenticator.create_credential(passkey_name, &options).await?;
        let (pub_x, pub_y) = p256_coordinates(&created.public_key_spki)?;

        let RegisterVerify { verified } = self
            .post(
                "/register/verify",
                json!({ "userId": user_id, "username": passkey_name, "cred": created.response }),
            )
            .await?;
        info!(verified, "passkey registered");

        Ok(PasskeyCredential {
            credential_id: created.credential_id,
            pub_x,
            pub_y,
            verified,
        })
    }

    pub async fn login(
        &self,
        authenticator: &dyn PasskeyAuthenticator,
    ) -> Result<PasskeyCredential> {
        let LoginOptions { options } = self.post("/login/options", json!({})).await?;
        let assertion = authenticator.get_assertion(&options).await?;
        let credential_id = assertion
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| SessionError::Passkey("login assertion has no credential id".into()))?
            .to_string();

        let LoginVerify {
            verification,
            pubkey,
        } = self
            .post("/login/verify", json!({ "cred": assertion }))
            .await?;
        let spki = decode_base64(&pubkey)
            .ok_or_else(|| SessionError::Passkey("login pubkey is not base64".into()))?;
        let (pub_x, pub_y) = p256_coordinates(&spki)?;
        info!(verified = verification.verified, "passkey login");

        Ok(PasskeyCredential {
            credential_id,
            pub_x,
            pub_y,
            verified: verification.verified,
        })
    }

    pub async fn enroll(
        &self,
        authenticator: &dyn PasskeyAuthenticator,
        passkey_name: &str,
        mode: WebAuthnMode,
    ) -> Result<PasskeyCredential> {
        match mode {
            WebAuthnMode::Register => self.register(authenticator, passkey_name).await,
            WebAuthnMode::Login => self.login(authenticator).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto;
    use p256::{
        ecdsa::{signature::Signer as _, Signature, SigningKey},
        pkcs8::EncodePublicKey,
    };

    fn assertion(key: &SigningKey, challenge: &[u8]) -> WebAuthnAssertion {
        let authenticator_data = vec![0x11; 37];
        let client_data_json = format!(
            r#"{{"type":"webauthn.get","challenge":"{}","origin":"https://app.test"}}"#,
            challenge_string(challenge)
        );
        let mut message = authenticator_data.clone();
        message.extend_from_slice(&crypto::sha256(client_data_json.as_bytes()));
        let signature: Signature = key.sign(&message);
        let (r, s) = signature.split_bytes();
        WebAuthnAssertion {
            authenticator_data: authenticator_data.into(),
            client_data_json,
            r: B256::from_slice(&r),
            s: B256::from_slice(&s),
        }
    }

    #[test]
    fn spki_coordinates_match_key() {
        let key = SigningKey::from_slice(&[3u8; 32]).unwrap();
        let der = key.verifying_key().to_public_key_der().unwrap();
        let (x, y) = p256_coordinates(der.as_bytes()).unwrap();
        let point = key.verifying_key().to_encoded_point(false);
        assert_eq!(x.as_slice(), point.x().unwrap().as_slice());
        assert_eq!(y.as_slice(), point.y().unwrap().as_slice());
    }

    #[test]
    fn encoded_assertion_decodes_and_verifies() {
        let key = SigningKey::from_slice(&[3u8; 32]).unwrap();
        let point = key.verifying_key().to_encoded_point(false);
        let challenge = [0xab; 32];
        let raw = assertion(&key, &challenge);

        let encoded = encode_webauthn_signature(&raw).unwrap();
        let decoded = decode_webauthn_signature(&encoded).unwrap();
        assert_eq!(decoded.client_data_json, raw.client_data_json);
        assert!(U256::from_be_bytes(decoded.s.0) <= P256_N >> 1);
        assert!(crypto::verify_webauthn_assertion(
            B256::from_slice(point.x().unwrap()),
            B256::from_slice(point.y().unwrap()),
            &decoded.authenticator_data,
            decoded.client_data_json.as_bytes(),
            decoded.r,
            decoded.s,
        ));
    }

    #[test]
    fn rejects_registration_style_client_data() {
        let raw = WebAuthnAssertion {
            authenticator_data: Bytes::new(),
            client_data_json: r#"{"type":"webauthn.create","challenge":"x"}"#.into(),
            r: B256::ZERO,
            s: B256::ZERO,
        };
        assert!(encode_webauthn_signature(&raw).is_err());
    }

    #[test]
    fn dummy_has_assertion_shape() {
        let dummy = dummy_webauthn_signature();
        let decoded = decode_webauthn_signature(&dummy).unwrap();
        assert!(decoded.client_data_json.contains("webauthn.get"));
        assert_eq!(decoded.authenticator_data.len(), 37);
    }

    #[test]
    fn credential_id_hash_uses_decoded_bytes() {
        let id = challenge_string(b"credential-1");
        assert_eq!(credential_id_hash(&id), keccak256(b"credential-1"));
    }
}
