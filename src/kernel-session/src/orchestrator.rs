//! User operation lifecycle: `prepare -> sponsor | estimate -> submit -> await_receipt`.
//!
//! Every step is one asynchronous unit of work and nothing is retried here. The account's
//! on-chain nonce orders submissions; two operations prepared from the same nonce race and one
//! of them fails at inclusion.

use std::time::Duration;

use alloy_primitives::{aliases::U192, Address, Bytes, B256};
use alloy_sol_types::SolCall;
use kernel_session_types::CallData;
use serde_json::{json, Value};
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::{
    authority::{SignPayload, SmartAccount},
    config::{NetworkConfig, DEFAULT_PAYMASTER_METHOD},
    errors::{Result, SessionError},
    kernel::interfaces::{IEntryPoint, IKernel},
    rpc::RpcClient,
    signing::SigningService,
    user_op::{
        GasFields, OperationHash, SponsoredUserOperation, UnsignedUserOperation, UserOperation,
        UserOperationReceipt,
    },
    utils::kernel,
};

#[derive(Clone, Debug)]
pub struct OperationOrchestrator {
    chain: RpcClient,
    bundler: RpcClient,
    paymaster: Option<RpcClient>,
    paymaster_method: String,
    entry_point: Address,
    chain_id: u64,
    signing: SigningService,
}

impl OperationOrchestrator {
    pub fn new(config: &NetworkConfig) -> Self {
        let chain = RpcClient::new(&config.rpc_url);
        Self {
            bundler: RpcClient::new(&config.bundler_url),
            paymaster: config.paymaster_url.as_deref().map(RpcClient::new),
            paymaster_method: config.paymaster_method.clone(),
            entry_point: config.deployment.entry_point,
            chain_id: config.chain_id,
            signing: SigningService::with_rpc(chain.clone()),
            chain,
        }
    }

    pub fn has_paymaster(&self) -> bool {
        self.paymaster.is_some()
    }

    /// Batched-execute calldata for `calls`.
    pub fn encode_call_data(calls: &[CallData]) -> Result<Bytes> {
        check_calls(calls)?;
        Ok(kernel::execute_batch_calldata(calls))
    }

    /// `execute(to, value, data, 0)` for a single call.
    pub fn encode_single_call(call: &CallData) -> Result<Bytes> {
        check_calls(std::slice::from_ref(call))?;
        Ok(kernel::execute_calldata(call))
    }

    pub async fn is_deployed(&self, account: Address) -> Result<bool> {
        Ok(!self.chain.get_code(account).await?.is_empty())
    }

    /// Whether the account already routes `executeBatch` through the permission validator,
    /// i.e. a session was enabled by an earlier operation.
    pub async fn session_enabled(&self, account: &SmartAccount) -> Result<bool> {
        if account.authority().session().is_none() || !self.is_deployed(account.address()).await? {
            return Ok(false);
        }
        let execution = self
            .chain
            .call(
                account.address(),
                &IKernel::getExecutionCall {
                    sig: IKernel::executeBatchCall::SELECTOR.into(),
                },
            )
            .await?;
        Ok(execution.detail.validator == account.deployment().permission_validator)
    }

    /// Build the operation for `calls` with the authority's dummy signature in place.
    ///
    /// Calls outside the session's permissions are built all the same; the account rejects
    /// them when the operation is validated on-chain.
    pub async fn prepare(
        &self,
        account: &SmartAccount,
        calls: Vec<CallData>,
    ) -> Result<UnsignedUserOperation> {
        let call_data = Self::encode_call_data(&calls)?;
        let sender = account.address();

        let deployed = self.is_deployed(sender).await?;
        let session_enabled = self.session_enabled(account).await?;
        let nonce = self
            .chain
            .call(
                self.entry_point,
                &IEntryPoint::getNonceCall {
                    sender,
                    key: U192::ZERO,
                },
            )
            .await?
            .nonce;

        let gas_price = self.chain.gas_price().await?;
        let priority = self.chain.max_priority_fee_per_gas().await?.min(gas_price);

        let signature = account.authority().dummy_signature(SignPayload::UserOperation {
            hash: B256::ZERO,
            calls: &calls,
            session_enabled,
        });
        let op = UserOperation {
            sender,
            nonce,
            init_code: if deployed {
                Bytes::new()
            } else {
                account.init_code()
            },
            call_data,
            max_fee_per_gas: gas_price,
            max_priority_fee_per_gas: priority,
            signature,
            ..Default::default()
        };
        debug!(
            %sender,
            %nonce,
            deployed,
            session_enabled,
            calls = calls.len(),
            "prepared user operation"
        );

        Ok(UnsignedUserOperation {
            op,
            calls,
            session_enabled,
        })
    }

    /// Ask the paymaster for sponsorship and gas limits.
    ///
    /// Failures are [`SessionError::SponsorshipFailure`]; the caller decides whether to retry.
    pub async fn sponsor(&self, unsigned: UnsignedUserOperation) -> Result<SponsoredUserOperation> {
        let Some(paymaster) = &self.paymaster else {
            return Err(SessionError::Config("no paymaster URL configured".into()));
        };
        let params = if self.paymaster_method == DEFAULT_PAYMASTER_METHOD {
            json!([{
                "chainId": self.chain_id,
                "userOp": unsigned.op,
                "entryPointAddress": self.entry_point,
            }])
        } else {
            json!([unsigned.op, self.entry_point])
        };

        let fields: GasFields = paymaster
            .request(&self.paymaster_method, params)
            .await
            .map_err(|e| {
                warn!(
                    error = %e,
                    sender = %unsigned.op.sender,
                    "paymaster declined user operation"
                );
                SessionError::SponsorshipFailure(e)
            })?;

        let UnsignedUserOperation {
            mut op,
            calls,
            session_enabled,
        } = unsigned;
        fields.apply(&mut op);
        debug!(
            sender = %op.sender,
            paymaster_and_data = op.paymaster_and_data.len(),
            "sponsored user operation"
        );
        Ok(SponsoredUserOperation {
            op,
            calls,
            session_enabled,
        })
    }

    /// Fill gas limits through `eth_estimateUserOperationGas`, leaving the operation unsponsored.
    pub async fn estimate(
        &self,
        unsigned: UnsignedUserOperation,
    ) -> Result<SponsoredUserOperation> {
        let fields: GasFields = self
            .bundler
            .request(
                "eth_estimateUserOperationGas",
                json!([unsigned.op, self.entry_point]),
            )
            .await
            .map_err(|e| {
                warn!(
                    error = %e,
                    sender = %unsigned.op.sender,
                    "bundler could not estimate user operation"
                );
                SessionError::SubmissionFailure(e)
            })?;

        let UnsignedUserOperation {
            mut op,
            calls,
            session_enabled,
        } = unsigned;
        fields.apply(&mut op);
        Ok(SponsoredUserOperation {
            op,
            calls,
            session_enabled,
        })
    }

    /// Sign with the account's active authority and hand the operation to the bundler.
    pub async fn submit(
        &self,
        account: &SmartAccount,
        sponsored: SponsoredUserOperation,
    ) -> Result<OperationHash> {
        let mut op = sponsored.op;
        op.signature = self
            .signing
            .sign_user_operation(account, &op, &sponsored.calls, sponsored.session_enabled)
            .await?;

        let hash: B256 = self
            .bundler
            .request("eth_sendUserOperation", json!([op, self.entry_point]))
            .await
            .map_err(|e| {
                warn!(
                    error = %e,
                    sender = %op.sender,
                    nonce = %op.nonce,
                    "bundler rejected user operation"
                );
                SessionError::SubmissionFailure(e)
            })?;

        info!(%hash, sender = %op.sender, nonce = %op.nonce, "user operation submitted");
        Ok(OperationHash(hash))
    }

    /// Poll the bundler until a receipt appears or `timeout` elapses.
    ///
    /// A timeout leaves the outcome unknown; the operation may still be included later.
    pub async fn await_receipt(
        &self,
        hash: OperationHash,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<UserOperationReceipt> {
        let started = Instant::now();
        let deadline = started + timeout;
        let timed_out = |waited: Duration| {
            warn!(%hash, ?waited, "no receipt before timeout");
            SessionError::ReceiptTimeout {
                hash: hash.0,
                waited,
            }
        };
        loop {
            // A bundler that stalls mid-request must not outlast the caller's bound.
            let poll = self
                .bundler
                .request::<_, Option<UserOperationReceipt>>(
                    "eth_getUserOperationReceipt",
                    json!([hash.0]),
                );
            let receipt = match timeout_at(deadline, poll).await {
                Ok(receipt) => receipt?,
                Err(_) => return Err(timed_out(started.elapsed())),
            };

            if let Some(receipt) = receipt {
                if !receipt.success {
                    warn!(%hash, reason = ?receipt.reason, "user operation reverted");
                    return Err(SessionError::OnChainRevert {
                        hash: hash.0,
                        reason: receipt.reason,
                    });
                }
                info!(
                    %hash,
                    tx = ?receipt.receipt.as_ref().map(|r| r.transaction_hash),
                    gas_used = %receipt.actual_gas_used,
                    "user operation included"
                );
                return Ok(receipt);
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(timed_out(waited));
            }
            sleep(poll_interval.min(timeout - waited)).await;
        }
    }

    /// `prepare -> sponsor (or estimate without a paymaster) -> submit -> await_receipt`.
    pub async fn send_user_operation(
        &self,
        account: &SmartAccount,
        calls: Vec<CallData>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<UserOperationReceipt> {
        let unsigned = self.prepare(account, calls).await?;
        let sponsored = if self.has_paymaster() {
            self.sponsor(unsigned).await?
        } else {
            self.estimate(unsigned).await?
        };
        let hash = self.submit(account, sponsored).await?;
        self.await_receipt(hash, poll_interval, timeout).await
    }

    /// Raw bundler call, e.g. for `eth_supportedEntryPoints`.
    pub async fn bundler_request(&self, method: &str, params: Value) -> Result<Value> {
        Ok(self.bundler.request(method, params).await?)
    }
}

fn check_calls(calls: &[CallData]) -> Result<()> {
    if calls.is_empty() {
        return Err(SessionError::Encoding("call batch is empty".into()));
    }
    if let Some(index) = calls.iter().position(|c| c.to.is_zero()) {
        return Err(SessionError::Encoding(format!(
            "call #{index} targets the zero address"
        )));
    }
    Ok(())
}
