//! Simulated chain node, bundler, paymaster and passkey server on one wiremock server.
//!
//! Accounts registered with [`Harness::register_account`] are validated the way the Kernel
//! account would do it, through [`OfflineVerifier`]. Validation failures are reported at
//! inclusion (a receipt with `success: false`), never at submission.

#![allow(dead_code)]

use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy_primitives::{b256, keccak256, Address, Bytes, B256, I256, U256};
use alloy_sol_types::{Eip712Domain, SolCall, SolStruct, SolValue};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use kernel_session::{
    kernel::{
        constants::ENTRY_POINT_V06,
        interfaces::{
            ExecutionDetail, IEntryPoint, IKernel, IOrderGateway, ISignatureRequestor,
            IUniversalSigValidator, Order as SolOrder,
        },
    },
    passkey::{challenge_string, CreatedCredential, PasskeyAuthenticator, WebAuthnAssertion},
    user_op::{TransactionReceipt, UserOperation, UserOperationReceipt},
    utils::{crypto, kernel},
    verifier::{OfflineVerifier, ValidationMode},
    ArgPattern, CallData, KernelDeployment, NetworkConfig, Order, PermissionEntry, PolicyEngine,
    RootSignerDescriptor, SessionClient, SessionError, SessionKey, SessionValidity, SmartAccount,
    TypedDomain,
};
use p256::{
    ecdsa::{signature::Signer as _, Signature, SigningKey},
    pkcs8::EncodePublicKey,
};
use serde_json::{json, Value};
use wiremock::{matchers::method, Mock, MockServer, Request, Respond, ResponseTemplate};

pub const CHAIN_ID: u64 = 11155420;
pub const REQUESTOR: Address = Address::repeat_byte(0x5e);
pub const UNIVERSAL_VALIDATOR: Address = Address::repeat_byte(0x64);
pub const PAYMASTER: Address = Address::repeat_byte(0x9a);
pub const TOKEN: Address = Address::repeat_byte(0x70);
pub const GATEWAY: Address = Address::repeat_byte(0x6a);
pub const OTHER_GATEWAY: Address = Address::repeat_byte(0x6b);
pub const RECIPIENT: Address = Address::repeat_byte(0x4c);

pub const POLL: Duration = Duration::from_millis(10);
pub const TIMEOUT: Duration = Duration::from_secs(5);

pub const TRANSFER_SIGNATURE: &str = "transfer(address,uint256)";
pub const CANCEL_ORDER_SIGNATURE: &str =
    "cancelOrder(((uint8,uint256,int256,uint256,uint256,uint8,address,uint256,uint256,bytes32),bytes))";

pub fn deployment() -> KernelDeployment {
    KernelDeployment {
        entry_point: ENTRY_POINT_V06,
        factory: Address::repeat_byte(0xfa),
        implementation: Address::repeat_byte(0x1e),
        account_init_code_hash: B256::repeat_byte(0xc0),
        permission_validator: Address::repeat_byte(0xa1),
        ecdsa_signer: Address::repeat_byte(0xa2),
        webauthn_signer: Address::repeat_byte(0xa3),
        sudo_policy: Address::repeat_byte(0xa4),
        merkle_policy: Address::repeat_byte(0xa5),
        signature_policy: Address::repeat_byte(0xa6),
    }
}

pub fn owner_key() -> SessionKey {
    SessionKey::from_bytes(&[0x11; 32]).unwrap()
}

pub fn session_key() -> SessionKey {
    SessionKey::from_bytes(&[0x22; 32]).unwrap()
}

pub fn gateway_domain() -> TypedDomain {
    TypedDomain::new("OrderGateway", "1", CHAIN_ID, GATEWAY)
}

/// The order of the end-to-end trading scenario, owned by `owner`.
pub fn scenario_order(owner: Address) -> Order {
    Order {
        action: 0,
        market_id: U256::ZERO,
        amount: I256::try_from(2545687128687666i64).unwrap(),
        price: U256::from(10u64).pow(U256::from(42u64)),
        expiry: U256::from(1709882290u64),
        trade_type: 1,
        owner,
        margin_xcd: U256::from(5000000u64),
        relay_fee: U256::from(1000000u64),
        id: b256!("00000000000000000000000000000000336cd3e995be4803a7fe836fb3411deb"),
    }
}

/// Session over the owner's account: token transfers to [`RECIPIENT`] and order cancellation,
/// message signatures for `requestors`.
pub async fn session_account_with_scope(
    client: &SessionClient,
    requestors: impl IntoIterator<Item = Address>,
) -> eyre::Result<SmartAccount> {
    let root = client
        .compose_root(RootSignerDescriptor::Eoa(Arc::new(owner_key())))
        .await?;
    let mut engine = PolicyEngine::new();
    engine.register_signatures(TOKEN, ["function transfer(address to, uint256 amount)"])?;
    let permissions = engine.build_permission_set(&[
        PermissionEntry::new(TOKEN, "transfer")
            .with_args(vec![ArgPattern::equal_address(RECIPIENT), ArgPattern::Any]),
        PermissionEntry::new(GATEWAY, CANCEL_ORDER_SIGNATURE),
    ])?;
    let scope = engine.build_signature_scope(requestors)?;
    let account = client
        .compose_session(&root, permissions, scope, session_key(), SessionValidity::default())
        .await?;
    Ok(account)
}

pub async fn session_account(client: &SessionClient) -> eyre::Result<SmartAccount> {
    session_account_with_scope(
        client,
        [GATEWAY, OTHER_GATEWAY, REQUESTOR, UNIVERSAL_VALIDATOR],
    )
    .await
}

pub async fn root_account(client: &SessionClient) -> eyre::Result<SmartAccount> {
    let root = client
        .compose_root(RootSignerDescriptor::Eoa(Arc::new(owner_key())))
        .await?;
    Ok(client.composer().root_account(root))
}

/// ERC-20 style `transfer(to, amount)` calldata.
pub fn transfer(to: Address, amount: u64) -> CallData {
    let mut data = vec![0xa9, 0x05, 0x9c, 0xbb];
    data.extend_from_slice((to, U256::from(amount)).abi_encode_params().as_slice());
    CallData::new(TOKEN, U256::ZERO, data)
}

struct AccountEntry {
    verifier: OfflineVerifier,
    init_code: Bytes,
}

struct PendingReceipt {
    receipt: UserOperationReceipt,
    polls_left: u32,
}

#[derive(Default)]
struct ChainState {
    accounts: HashMap<Address, AccountEntry>,
    deployed: HashSet<Address>,
    session_enabled: HashSet<Address>,
    nonces: HashMap<Address, U256>,
    gateways: HashMap<Address, TypedDomain>,
    receipts: HashMap<B256, PendingReceipt>,
    submitted: Vec<UserOperation>,
    cancelled: Vec<B256>,
    passkeys: HashMap<String, String>,
    withhold_receipts: bool,
    paymaster_down: bool,
    reject_passkeys: bool,
}

impl ChainState {
    fn message_valid(
        &self,
        requestor: Address,
        signer: Address,
        hash: B256,
        signature: &[u8],
        accept_erc6492: bool,
    ) -> bool {
        let Some(entry) = self.accounts.get(&signer) else {
            return false;
        };
        let wrapped = kernel::unwrap_erc6492(signature).is_some();
        let deployed = self.deployed.contains(&signer);
        let acceptable = if accept_erc6492 {
            deployed || wrapped
        } else {
            deployed && !wrapped
        };
        acceptable
            && entry
                .verifier
                .verify_message(requestor, hash, signature, self.session_enabled.contains(&signer))
                .is_ok()
    }

    fn order_digest(&self, gateway: Address, order: &SolOrder) -> Option<B256> {
        let domain = self.gateways.get(&gateway)?;
        let eip712 = Eip712Domain::new(
            Some(Cow::Owned(domain.name.clone())),
            Some(Cow::Owned(domain.version.clone())),
            Some(U256::from(domain.chain_id)),
            Some(domain.verifying_contract),
            None,
        );
        Some(order.eip712_signing_hash(&eip712))
    }
}

#[derive(Clone)]
struct Simulator {
    state: Arc<Mutex<ChainState>>,
}

fn ok(id: &Value, result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

fn rpc_error(id: &Value, code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message }
    }))
}

fn revert(id: &Value) -> ResponseTemplate {
    rpc_error(id, 3, "execution reverted")
}

fn returns(encoded: Vec<u8>) -> Value {
    json!(Bytes::from(encoded))
}

impl Respond for Simulator {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return ResponseTemplate::new(400);
        };
        let path = request.url.path();
        if path.starts_with("/passkeys") {
            return self.passkey(path, &body);
        }

        let id = body["id"].clone();
        let params = body["params"].clone();
        match body["method"].as_str().unwrap_or_default() {
            "eth_chainId" => ok(&id, json!(U256::from(CHAIN_ID))),
            "eth_gasPrice" => ok(&id, json!(U256::from(1_000_000_000u64))),
            "eth_maxPriorityFeePerGas" => ok(&id, json!(U256::from(1_500_000_000u64))),
            "eth_getCode" => {
                let address: Address = serde_json::from_value(params[0].clone()).unwrap();
                let deployed = self.state.lock().unwrap().deployed.contains(&address);
                let code = if deployed {
                    Bytes::from(vec![0x60, 0x80])
                } else {
                    Bytes::new()
                };
                ok(&id, json!(code))
            }
            "eth_call" => {
                let to: Address = serde_json::from_value(params[0]["to"].clone()).unwrap();
                let data: Bytes = serde_json::from_value(params[0]["data"].clone()).unwrap();
                match self.eth_call(to, &data) {
                    Some(result) => ok(&id, result),
                    None => revert(&id),
                }
            }
            "zd_sponsorUserOperation" => {
                if self.state.lock().unwrap().paymaster_down {
                    return ResponseTemplate::new(503).set_body_string("paymaster unavailable");
                }
                if params[0]["entryPointAddress"] != json!(ENTRY_POINT_V06)
                    || params[0]["chainId"] != json!(CHAIN_ID)
                    || params[0]["userOp"]["sender"].is_null()
                {
                    return rpc_error(&id, -32602, "invalid sponsorship request");
                }
                let mut paymaster_and_data = PAYMASTER.to_vec();
                paymaster_and_data.extend_from_slice(&[0x77; 45]);
                ok(
                    &id,
                    json!({
                        "paymasterAndData": Bytes::from(paymaster_and_data),
                        "preVerificationGas": U256::from(60_000u64),
                        "verificationGasLimit": U256::from(900_000u64),
                        "callGasLimit": U256::from(400_000u64),
                    }),
                )
            }
            "eth_estimateUserOperationGas" => ok(
                &id,
                json!({
                    "preVerificationGas": U256::from(55_000u64),
                    "verificationGasLimit": U256::from(850_000u64),
                    "callGasLimit": U256::from(350_000u64),
                }),
            ),
            "eth_sendUserOperation" => {
                let op: UserOperation = match serde_json::from_value(params[0].clone()) {
                    Ok(op) => op,
                    Err(_) => return rpc_error(&id, -32602, "invalid user operation"),
                };
                if params[1] != json!(ENTRY_POINT_V06) {
                    return rpc_error(&id, -32602, "unsupported entry point");
                }
                match self.include(op) {
                    Ok(hash) => ok(&id, json!(hash)),
                    Err(message) => rpc_error(&id, -32500, &message),
                }
            }
            "eth_getUserOperationReceipt" => {
                let hash: B256 = serde_json::from_value(params[0].clone()).unwrap();
                let mut state = self.state.lock().unwrap();
                if state.withhold_receipts {
                    return ok(&id, Value::Null);
                }
                match state.receipts.get_mut(&hash) {
                    Some(pending) if pending.polls_left == 0 => ok(&id, json!(pending.receipt)),
                    Some(pending) => {
                        pending.polls_left -= 1;
                        ok(&id, Value::Null)
                    }
                    None => ok(&id, Value::Null),
                }
            }
            other => rpc_error(&id, -32601, &format!("method {other} not found")),
        }
    }
}

impl Simulator {
    fn eth_call(&self, to: Address, data: &[u8]) -> Option<Value> {
        let state = self.state.lock().unwrap();
        let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;

        if selector == IEntryPoint::getNonceCall::SELECTOR && to == ENTRY_POINT_V06 {
            let call = IEntryPoint::getNonceCall::abi_decode(data, true).ok()?;
            let nonce = state.nonces.get(&call.sender).copied().unwrap_or_default();
            return Some(returns((nonce,).abi_encode_params()));
        }
        if selector == IKernel::getExecutionCall::SELECTOR {
            state.deployed.get(&to)?;
            let validator = if state.session_enabled.contains(&to) {
                deployment().permission_validator
            } else {
                Address::ZERO
            };
            let detail = ExecutionDetail {
                validAfter: Default::default(),
                validUntil: Default::default(),
                executor: Address::ZERO,
                validator,
            };
            return Some(returns((detail,).abi_encode_params()));
        }
        if selector == IOrderGateway::getOrderHashCall::SELECTOR {
            let call = IOrderGateway::getOrderHashCall::abi_decode(data, true).ok()?;
            return Some(returns((state.order_digest(to, &call.order)?,).abi_encode_params()));
        }
        if selector == IOrderGateway::ORDER_TYPEHASHCall::SELECTOR {
            state.gateways.get(&to)?;
            let type_hash = keccak256(SolOrder::eip712_encode_type().as_bytes());
            return Some(returns((type_hash,).abi_encode_params()));
        }
        if selector == IOrderGateway::eip712DomainCall::SELECTOR {
            let domain = state.gateways.get(&to)?;
            return Some(returns((
                alloy_primitives::FixedBytes::<1>::from([0x0f]),
                domain.name.clone(),
                domain.version.clone(),
                U256::from(domain.chain_id),
                domain.verifying_contract,
                B256::ZERO,
                Vec::<U256>::new(),
            ).abi_encode_params()));
        }
        if selector == IOrderGateway::verifyOrderSignatureCall::SELECTOR {
            let call = IOrderGateway::verifyOrderSignatureCall::abi_decode(data, true).ok()?;
            let signed = call.signedOrder;
            let digest = state.order_digest(to, &signed.order)?;
            let valid =
                state.message_valid(to, signed.order.owner, digest, &signed.signature, false);
            return Some(returns((valid,).abi_encode_params()));
        }
        if selector == ISignatureRequestor::verifySignatureCall::SELECTOR && to == REQUESTOR {
            let call = ISignatureRequestor::verifySignatureCall::abi_decode(data, true).ok()?;
            state.accounts.get(&call.signer)?;
            let valid = state.message_valid(to, call.signer, call.hash, &call.signature, false);
            return Some(returns((valid,).abi_encode_params()));
        }
        if selector == IUniversalSigValidator::isValidSigCall::SELECTOR
            && to == UNIVERSAL_VALIDATOR
        {
            let call = IUniversalSigValidator::isValidSigCall::abi_decode(data, true).ok()?;
            let valid = state.message_valid(to, call.signer, call.hash, &call.signature, true);
            return Some(returns((valid,).abi_encode_params()));
        }
        None
    }

    /// Bundler admission checks, then validation and execution at inclusion.
    fn include(&self, op: UserOperation) -> Result<B256, String> {
        let mut state = self.state.lock().unwrap();
        let sender = op.sender;
        let (init_code, verifier) = match state.accounts.get(&sender) {
            Some(entry) => (entry.init_code.clone(), entry.verifier.clone()),
            None => return Err(format!("AA20 account not deployed: {sender}")),
        };

        let deployed = state.deployed.contains(&sender);
        match (deployed, op.init_code.is_empty()) {
            (false, true) => return Err("AA20 account not deployed".into()),
            (false, false) if op.init_code != init_code => {
                return Err("AA14 initCode must return sender".into())
            }
            (true, false) => return Err("AA10 sender already constructed".into()),
            _ => {}
        }
        let expected_nonce = state.nonces.get(&sender).copied().unwrap_or_default();
        if op.nonce != expected_nonce {
            return Err("AA25 invalid account nonce".into());
        }

        let hash = op.hash(ENTRY_POINT_V06, CHAIN_ID);
        state.submitted.push(op.clone());
        state.nonces.insert(sender, expected_nonce + U256::from(1u64));
        state.deployed.insert(sender);

        let enabled = state.session_enabled.contains(&sender);
        let outcome = match verifier.verify_user_operation(&op, enabled) {
            Ok(mode) => {
                if mode == ValidationMode::Enable {
                    state.session_enabled.insert(sender);
                }
                execute(&mut state, &op)
            }
            Err(rejection) => Err(format!("AA24 signature error: {rejection}")),
        };

        let receipt = UserOperationReceipt {
            user_op_hash: hash,
            sender,
            nonce: op.nonce,
            success: outcome.is_ok(),
            reason: outcome.err(),
            actual_gas_cost: U256::from(123_456u64),
            actual_gas_used: U256::from(98_765u64),
            receipt: Some(TransactionReceipt {
                transaction_hash: keccak256(hash),
                block_hash: Some(keccak256(keccak256(hash))),
                block_number: Some(U256::from(1_000u64 + state.submitted.len() as u64)),
                status: Some(U256::from(1u64)),
            }),
        };
        state.receipts.insert(
            hash,
            PendingReceipt {
                receipt,
                polls_left: 1,
            },
        );
        Ok(hash)
    }

    fn passkey(&self, path: &str, body: &Value) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();
        let verified = !state.reject_passkeys;
        if path.ends_with("/register/options") {
            return ResponseTemplate::new(200).set_body_json(json!({
                "options": { "challenge": "cmVnaXN0ZXI", "user": { "name": body["username"] } },
                "userId": "user-1",
            }));
        }
        if path.ends_with("/register/verify") {
            let cred = &body["cred"];
            if let (Some(id), Some(key)) = (cred["id"].as_str(), cred["publicKey"].as_str()) {
                state.passkeys.insert(id.to_string(), key.to_string());
            }
            return ResponseTemplate::new(200).set_body_json(json!({ "verified": verified }));
        }
        if path.ends_with("/login/options") {
            return ResponseTemplate::new(200)
                .set_body_json(json!({ "options": { "challenge": "bG9naW4" } }));
        }
        if path.ends_with("/login/verify") {
            let id = body["cred"]["id"].as_str().unwrap_or_default();
            return match state.passkeys.get(id) {
                Some(pubkey) => ResponseTemplate::new(200).set_body_json(json!({
                    "verification": { "verified": verified },
                    "pubkey": pubkey,
                })),
                None => ResponseTemplate::new(404).set_body_string("unknown credential"),
            };
        }
        ResponseTemplate::new(404)
    }
}

/// Execution phase: gateways check the order signature before cancelling.
fn execute(state: &mut ChainState, op: &UserOperation) -> Result<(), String> {
    let calls = kernel::decode_execution(&op.call_data).ok_or("unknown execute calldata")?;
    for call in calls {
        if !state.gateways.contains_key(&call.to)
            || call.selector() != IOrderGateway::cancelOrderCall::SELECTOR
        {
            continue;
        }
        let cancel = IOrderGateway::cancelOrderCall::abi_decode(&call.data, true)
            .map_err(|e| format!("OrderGateway: bad calldata: {e}"))?;
        let signed = cancel.signedOrder;
        let digest = state
            .order_digest(call.to, &signed.order)
            .ok_or("OrderGateway: unknown domain")?;
        if signed.order.owner != op.sender
            || !state.message_valid(call.to, signed.order.owner, digest, &signed.signature, false)
        {
            return Err("OrderGateway: invalid signature".into());
        }
        state.cancelled.push(signed.order.id);
    }
    Ok(())
}

pub struct Harness {
    pub server: MockServer,
    state: Arc<Mutex<ChainState>>,
}

impl Harness {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(Mutex::new(ChainState::default()));
        Mock::given(method("POST"))
            .respond_with(Simulator {
                state: state.clone(),
            })
            .mount(&server)
            .await;
        let harness = Self { server, state };
        harness.add_gateway(gateway_domain());
        harness.add_gateway(TypedDomain::new("OrderGateway", "1", CHAIN_ID, OTHER_GATEWAY));
        harness
    }

    pub fn config(&self) -> NetworkConfig {
        let uri = self.server.uri();
        NetworkConfig {
            chain_id: CHAIN_ID,
            rpc_url: format!("{uri}/rpc"),
            bundler_url: format!("{uri}/bundler"),
            paymaster_url: Some(format!("{uri}/paymaster")),
            passkey_server_url: Some(format!("{uri}/passkeys")),
            paymaster_method: "zd_sponsorUserOperation".into(),
            kernel_version: "0.2.4".into(),
            deployment: deployment(),
        }
    }

    pub fn config_without_paymaster(&self) -> NetworkConfig {
        NetworkConfig {
            paymaster_url: None,
            ..self.config()
        }
    }

    pub fn passkey_url(&self) -> String {
        format!("{}/passkeys", self.server.uri())
    }

    pub fn register_account(&self, account: &SmartAccount) {
        self.state.lock().unwrap().accounts.insert(
            account.address(),
            AccountEntry {
                verifier: OfflineVerifier::new(account),
                init_code: account.init_code(),
            },
        );
    }

    pub fn add_gateway(&self, domain: TypedDomain) {
        self.state
            .lock()
            .unwrap()
            .gateways
            .insert(domain.verifying_contract, domain);
    }

    pub fn withhold_receipts(&self) {
        self.state.lock().unwrap().withhold_receipts = true;
    }

    pub fn paymaster_down(&self) {
        self.state.lock().unwrap().paymaster_down = true;
    }

    pub fn reject_passkeys(&self) {
        self.state.lock().unwrap().reject_passkeys = true;
    }

    pub fn is_deployed(&self, account: Address) -> bool {
        self.state.lock().unwrap().deployed.contains(&account)
    }

    pub fn session_enabled(&self, account: Address) -> bool {
        self.state.lock().unwrap().session_enabled.contains(&account)
    }

    pub fn cancelled(&self) -> Vec<B256> {
        self.state.lock().unwrap().cancelled.clone()
    }

    pub fn submitted(&self) -> Vec<UserOperation> {
        self.state.lock().unwrap().submitted.clone()
    }
}

/// Software P-256 authenticator standing in for the browser ceremony.
pub struct SoftwareAuthenticator {
    key: SigningKey,
    credential_id: String,
}

impl SoftwareAuthenticator {
    pub fn new(seed: u8) -> Self {
        Self {
            key: SigningKey::from_slice(&[seed; 32]).unwrap(),
            credential_id: base64::engine::general_purpose::URL_SAFE_NO_PAD.encode([seed; 16]),
        }
    }

    fn spki(&self) -> Vec<u8> {
        self.key
            .verifying_key()
            .to_public_key_der()
            .unwrap()
            .as_bytes()
            .to_vec()
    }
}

#[async_trait]
impl PasskeyAuthenticator for SoftwareAuthenticator {
    async fn create_credential(
        &self,
        _username: &str,
        _options: &Value,
    ) -> kernel_session::Result<CreatedCredential> {
        let spki = self.spki();
        Ok(CreatedCredential {
            credential_id: self.credential_id.clone(),
            public_key_spki: spki.clone().into(),
            response: json!({
                "id": self.credential_id,
                "type": "public-key",
                "publicKey": STANDARD.encode(&spki),
            }),
        })
    }

    async fn get_assertion(&self, _options: &Value) -> kernel_session::Result<Value> {
        Ok(json!({ "id": self.credential_id, "type": "public-key" }))
    }

    async fn sign_challenge(
        &self,
        credential_id: &str,
        challenge: &[u8],
    ) -> kernel_session::Result<WebAuthnAssertion> {
        if credential_id != self.credential_id {
            return Err(SessionError::Passkey(format!("unknown credential {credential_id}")));
        }
        let mut authenticator_data = keccak256(b"localhost").to_vec();
        authenticator_data.extend_from_slice(&[0x05, 0, 0, 0, 1]);
        let client_data_json = format!(
            r#"{{"type":"webauthn.get","challenge":"{}","origin":"https://localhost","crossOrigin":false}}"#,
            challenge_string(challenge)
        );
        let mut message = authenticator_data.clone();
        message.extend_from_slice(&crypto::sha256(client_data_json.as_bytes()));
        let signature: Signature = self.key.sign(&message);
        let (r, s) = signature.split_bytes();
        Ok(WebAuthnAssertion {
            authenticator_data: authenticator_data.into(),
            client_data_json,
            r: B256::from_slice(&r),
            s: B256::from_slice(&s),
        })
    }
}
