use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use alloy_primitives::{Address, Bytes, B256, I256, U256};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use kernel_session::{
    CallData, NetworkConfig, Order, PermissionEntry, PolicyEngine, RootSignerDescriptor,
    SessionClient, SessionError, SessionKey, SessionValidity, SignatureVerifier, SmartAccount,
    TypedDomain, VerificationRequest,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Operate Kernel smart accounts through policy-bound session keys.
///
/// Every command reads the network config (chain id, RPC/bundler/paymaster URLs and the Kernel
/// deployment address book) from `--network`. `.env.local` and `.env` are loaded first.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Network config JSON.
    #[arg(long, env = "NETWORK_CONFIG", default_value = "deployments.devnet.json", global = true)]
    network: PathBuf,

    /// Overrides the config's RPC URL.
    #[arg(long, env = "RPC_URL", global = true)]
    rpc_url: Option<String>,

    /// Overrides the config's bundler URL.
    #[arg(long, env = "BUNDLER_URL", global = true)]
    bundler_url: Option<String>,

    /// Overrides the config's paymaster URL.
    #[arg(long, env = "PAYMASTER_URL", global = true)]
    paymaster_url: Option<String>,

    /// Debug-level logs (otherwise `RUST_LOG`, default `info`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh session private key and its address.
    NewKey,

    /// Compose an EOA-rooted session account and write it to a session file.
    Compose(ComposeArgs),

    /// Print the EIP-712 digest of an order.
    OrderHash {
        #[command(flatten)]
        order: OrderArgs,

        /// Compare with the gateway's `getOrderHash` and fail on a mismatch.
        #[arg(long)]
        check: bool,
    },

    /// Sign an order with the session and optionally verify it on-chain.
    SignOrder {
        #[command(flatten)]
        order: OrderArgs,

        #[arg(long, value_enum)]
        verify: Option<VerifyWith>,

        /// Requestor contract for `--verify erc1271`.
        #[arg(long, env = "SIGNATURE_REQUESTOR")]
        requestor: Option<Address>,

        /// Validator contract for `--verify universal`.
        #[arg(long, env = "UNIVERSAL_VALIDATOR")]
        validator: Option<Address>,
    },

    /// Submit calls as one user operation and wait for the receipt.
    Send(SendArgs),
}

#[derive(Args, Debug)]
struct ComposeArgs {
    /// Root owner private key (hex).
    #[arg(long, env = "OWNER_KEY")]
    owner_key: String,

    /// Session private key (hex); a fresh key is generated when omitted.
    #[arg(long, env = "SESSION_KEY")]
    session_key: Option<String>,

    /// Permission entries, requestors and validity window.
    #[arg(long)]
    policy: PathBuf,

    /// Factory salt index.
    #[arg(long, default_value = "0")]
    index: U256,

    #[arg(long, env = "SESSION_FILE", default_value = "session.json")]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct OrderArgs {
    #[arg(long, env = "SESSION_FILE", default_value = "session.json")]
    session: PathBuf,

    #[arg(long, default_value = "OrderGateway")]
    domain_name: String,

    #[arg(long, default_value = "1")]
    domain_version: String,

    #[arg(long, env = "ORDER_GATEWAY")]
    verifying_contract: Address,

    #[arg(long, default_value_t = 0)]
    action: u8,

    #[arg(long, default_value = "0")]
    market_id: U256,

    /// Signed order size; negative for the short side.
    #[arg(long, allow_hyphen_values = true)]
    amount: I256,

    #[arg(long)]
    price: U256,

    #[arg(long)]
    expiry: U256,

    #[arg(long, default_value_t = 0)]
    trade_type: u8,

    #[arg(long, default_value = "0")]
    margin_xcd: U256,

    #[arg(long, default_value = "0")]
    relay_fee: U256,

    #[arg(long)]
    id: B256,
}

#[derive(Args, Debug)]
struct SendArgs {
    #[arg(long, env = "SESSION_FILE", default_value = "session.json")]
    session: PathBuf,

    /// `<to>:<value>:<data>`, e.g. `0xabc…:0:0xa9059cbb…`. Repeat for a batch.
    #[arg(long = "call", required = true)]
    calls: Vec<String>,

    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    #[arg(long, default_value_t = 2_000)]
    poll_ms: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VerifyWith {
    Erc1271,
    Universal,
    OrderGateway,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PolicyFile {
    /// Human-readable signatures per target, so entries may name bare functions.
    #[serde(default)]
    interfaces: Vec<InterfaceFile>,
    permissions: Vec<PermissionEntry>,
    #[serde(default)]
    requestors: Vec<Address>,
    #[serde(default)]
    valid_after: u64,
    #[serde(default)]
    valid_until: u64,
}

#[derive(Deserialize, Debug)]
struct InterfaceFile {
    target: Address,
    signatures: Vec<String>,
}

/// On-disk session: the account address plus the exported session blob.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    account: Address,
    chain_id: u64,
    session: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::from_filename(".env.local").ok();
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::NewKey => {
            let key = SessionKey::generate();
            print_json(&json!({ "address": key.address(), "privateKey": key.to_hex() }))
        }
        Command::Compose(args) => compose(&cli, args).await,
        Command::OrderHash { order, check } => order_hash(&cli, order, *check).await,
        Command::SignOrder {
            order,
            verify,
            requestor,
            validator,
        } => sign_order(&cli, order, *verify, *requestor, *validator).await,
        Command::Send(args) => send(&cli, args).await,
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn client(cli: &Cli) -> Result<SessionClient> {
    let mut config = NetworkConfig::from_json_file(&cli.network)
        .with_context(|| format!("failed loading network config {}", cli.network.display()))?;
    if let Some(url) = &cli.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(url) = &cli.bundler_url {
        config.bundler_url = url.clone();
    }
    if let Some(url) = &cli.paymaster_url {
        config.paymaster_url = Some(url.clone());
    }
    debug!(chain_id = config.chain_id, rpc = %config.rpc_url, "network config loaded");
    Ok(SessionClient::new(config)?)
}

async fn compose(cli: &Cli, args: &ComposeArgs) -> Result<()> {
    let client = client(cli)?;
    let owner = SessionKey::from_hex(&args.owner_key).context("invalid --owner-key")?;
    let session_key = match &args.session_key {
        Some(hex) => SessionKey::from_hex(hex).context("invalid --session-key")?,
        None => SessionKey::generate(),
    };

    let raw = fs::read_to_string(&args.policy)
        .with_context(|| format!("failed reading {}", args.policy.display()))?;
    let policy: PolicyFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing policy {}", args.policy.display()))?;

    let mut engine = PolicyEngine::new();
    for interface in &policy.interfaces {
        let signatures = interface.signatures.iter().map(String::as_str);
        engine.register_signatures(interface.target, signatures)?;
    }
    let permissions = engine.build_permission_set(&policy.permissions)?;
    let scope = engine.build_signature_scope(policy.requestors.iter().copied())?;
    let validity = SessionValidity {
        valid_after: policy.valid_after,
        valid_until: policy.valid_until,
    };

    let composer = client.composer().clone().with_index(args.index);
    let root = composer
        .compose_root(RootSignerDescriptor::Eoa(Arc::new(owner)))
        .await?;
    let account = composer
        .compose_session(&root, permissions, scope, session_key, validity)
        .await?;
    let blob = client.export_session(&account)?;

    let now = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());
    let file = json!({
        "account": account.address(),
        "chainId": account.chain_id(),
        "exportedAt": now,
        "session": blob,
    });
    write_json_atomic(&args.out, &file)?;

    info!(account = %account.address(), out = %args.out.display(), "session composed");
    print_json(&json!({ "account": account.address(), "sessionFile": args.out }))
}

fn load_session(client: &SessionClient, path: &Path) -> Result<SmartAccount> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading session file {}", path.display()))?;
    let file: SessionFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing session file {}", path.display()))?;
    if file.chain_id != client.config().chain_id {
        bail!(
            "session file {} is for chain {}, network config is chain {}",
            path.display(),
            file.chain_id,
            client.config().chain_id
        );
    }
    Ok(client.import_session(&file.session, file.account)?)
}

fn domain_and_order(
    args: &OrderArgs,
    client: &SessionClient,
    owner: Address,
) -> (TypedDomain, Order) {
    let domain = TypedDomain::new(
        args.domain_name.clone(),
        args.domain_version.clone(),
        client.config().chain_id,
        args.verifying_contract,
    );
    let order = Order {
        action: args.action,
        market_id: args.market_id,
        amount: args.amount,
        price: args.price,
        expiry: args.expiry,
        trade_type: args.trade_type,
        owner,
        margin_xcd: args.margin_xcd,
        relay_fee: args.relay_fee,
        id: args.id,
    };
    (domain, order)
}

async fn order_hash(cli: &Cli, args: &OrderArgs, check: bool) -> Result<()> {
    let client = client(cli)?;
    let account = load_session(&client, &args.session)?;
    let (domain, order) = domain_and_order(args, &client, account.address());

    let hash = if check {
        match client.order_hash(&domain, &order).await {
            Ok(hash) => hash,
            Err(SessionError::HashMismatch { local, onchain }) => {
                bail!("order hash mismatch: local {local}, gateway {onchain}")
            }
            Err(e) => return Err(e).context("getOrderHash call failed"),
        }
    } else {
        SignatureVerifier::compute_order_hash(&domain, &order)
    };
    print_json(&json!({ "orderHash": hash, "checked": check }))
}

async fn sign_order(
    cli: &Cli,
    args: &OrderArgs,
    verify: Option<VerifyWith>,
    requestor: Option<Address>,
    validator: Option<Address>,
) -> Result<()> {
    let client = client(cli)?;
    let account = load_session(&client, &args.session)?;
    let (domain, order) = domain_and_order(args, &client, account.address());
    let hash = SignatureVerifier::compute_order_hash(&domain, &order);
    let signed = client.sign_order(&account, &domain, order).await?;

    let mut output = json!({
        "orderHash": hash,
        "signer": account.address(),
        "signature": signed.signature,
    });

    if let Some(verify) = verify {
        let request = match verify {
            VerifyWith::Erc1271 => VerificationRequest::Erc1271 {
                requestor: requestor.ok_or_else(|| anyhow!("--verify erc1271 needs --requestor"))?,
                signer: account.address(),
                hash,
                signature: signed.signature.clone(),
            },
            VerifyWith::Universal => VerificationRequest::Universal {
                validator: validator
                    .ok_or_else(|| anyhow!("--verify universal needs --validator"))?,
                signer: account.address(),
                hash,
                signature: signed.signature.clone(),
            },
            VerifyWith::OrderGateway => VerificationRequest::TypedOrder {
                gateway: domain.verifying_contract,
                signed_order: signed.clone(),
            },
        };
        let valid = client.verifier().verify_on_chain(&request).await?;
        output["verified"] = json!({ "verifier": request.kind().to_string(), "valid": valid });
        print_json(&output)?;
        if !valid {
            bail!("{} rejected the signature", request.kind());
        }
        return Ok(());
    }
    print_json(&output)
}

async fn send(cli: &Cli, args: &SendArgs) -> Result<()> {
    let client = client(cli)?;
    let account = load_session(&client, &args.session)?;
    let calls = args
        .calls
        .iter()
        .map(String::as_str)
        .map(parse_call)
        .collect::<Result<Vec<_>>>()?;

    let receipt = client
        .send(
            &account,
            calls,
            Duration::from_millis(args.poll_ms),
            Duration::from_secs(args.timeout_secs),
        )
        .await
        .map_err(|e| {
            if e.is_ambiguous() {
                anyhow!(e).context(
                    "operation may still be included; query the bundler before resending",
                )
            } else {
                anyhow!(e)
            }
        })?;
    print_json(&serde_json::to_value(&receipt).context("failed serialising receipt")?)
}

fn parse_call(raw: &str) -> Result<CallData> {
    let re_call = Regex::new(r"^(0x[a-fA-F0-9]{40}):(0x[a-fA-F0-9]+|[0-9]*):(0x(?:[a-fA-F0-9]{2})*)$")?;
    let caps = re_call
        .captures(raw.trim())
        .ok_or_else(|| anyhow!("--call `{raw}` is not <to>:<value>:<data>"))?;

    let to: Address = caps[1].parse().with_context(|| format!("bad address in `{raw}`"))?;
    let value = match &caps[2] {
        "" => U256::ZERO,
        v => v.parse::<U256>().with_context(|| format!("bad value in `{raw}`"))?,
    };
    let data: Bytes = caps[3].parse().with_context(|| format!("bad calldata in `{raw}`"))?;
    Ok(CallData::new(to, value, data))
}

fn print_json(value: &Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed serialising output")?
    );
    Ok(())
}

fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let serialised =
        serde_json::to_string_pretty(value).context("failed serialising session file")?;
    let tmp_path = tmp_path_for(path);
    // A leftover temp file would keep its old mode; start from a fresh one.
    match fs::remove_file(&tmp_path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed removing stale {}", tmp_path.display()));
        }
    }
    let mut file = private_file_options()
        .open(&tmp_path)
        .with_context(|| format!("failed creating temp file {}", tmp_path.display()))?;
    file.write_all(serialised.as_bytes())
        .and_then(|()| file.sync_all())
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    drop(file);
    fs::rename(&tmp_path, path)
        .with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

/// The session file carries the session private key: owner read/write only.
fn private_file_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
