//! Network configuration: service endpoints and the Kernel deployment address book.

use std::path::Path;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Result, SessionError},
    kernel::constants::{DEFAULT_KERNEL_VERSION, ENTRY_POINT_V06},
};

pub const DEFAULT_PAYMASTER_METHOD: &str = "zd_sponsorUserOperation";

const ZERODEV_PASSKEY_BASE: &str = "https://passkeys.zerodev.app/api/v2";
const ZERODEV_RPC_BASE: &str = "https://rpc.zerodev.app/api/v2";

fn default_entry_point() -> Address {
    ENTRY_POINT_V06
}

fn default_paymaster_method() -> String {
    DEFAULT_PAYMASTER_METHOD.to_string()
}

fn default_kernel_version() -> String {
    DEFAULT_KERNEL_VERSION.to_string()
}

/// Contracts the account is built from. All addresses are chain-specific inputs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelDeployment {
    #[serde(default = "default_entry_point")]
    pub entry_point: Address,
    pub factory: Address,
    pub implementation: Address,
    /// `keccak256` of the proxy creation code the factory deploys with CREATE2.
    pub account_init_code_hash: B256,
    pub permission_validator: Address,
    pub ecdsa_signer: Address,
    pub webauthn_signer: Address,
    pub sudo_policy: Address,
    pub merkle_policy: Address,
    pub signature_policy: Address,
}

impl KernelDeployment {
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("entryPoint", self.entry_point),
            ("factory", self.factory),
            ("implementation", self.implementation),
            ("permissionValidator", self.permission_validator),
            ("ecdsaSigner", self.ecdsa_signer),
            ("webauthnSigner", self.webauthn_signer),
            ("sudoPolicy", self.sudo_policy),
            ("merklePolicy", self.merkle_policy),
            ("signaturePolicy", self.signature_policy),
        ];
        if let Some((name, _)) = named.iter().find(|(_, a)| a.is_zero()) {
            return Err(SessionError::Config(format!("deployment.{name} is the zero address")));
        }
        if self.account_init_code_hash.is_zero() {
            return Err(SessionError::Config(
                "deployment.accountInitCodeHash is zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    pub bundler_url: String,
    /// Absent means operations are not sponsored.
    #[serde(default)]
    pub paymaster_url: Option<String>,
    #[serde(default)]
    pub passkey_server_url: Option<String>,
    #[serde(default = "default_paymaster_method")]
    pub paymaster_method: String,
    #[serde(default = "default_kernel_version")]
    pub kernel_version: String,
    pub deployment: KernelDeployment,
}

impl NetworkConfig {
    /// Load a deployments-style JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("read {}: {e}", path.display())))?;
        let config: NetworkConfig = serde_json::from_str(&raw)
            .map_err(|e| SessionError::Config(format!("parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Endpoints of the hosted ZeroDev services for `project_id`.
    pub fn zerodev(
        project_id: &str,
        chain_id: u64,
        rpc_url: impl Into<String>,
        deployment: KernelDeployment,
    ) -> Self {
        Self {
            chain_id,
            rpc_url: rpc_url.into(),
            bundler_url: format!("{ZERODEV_RPC_BASE}/bundler/{project_id}"),
            paymaster_url: Some(format!("{ZERODEV_RPC_BASE}/paymaster/{project_id}")),
            passkey_server_url: Some(format!("{ZERODEV_PASSKEY_BASE}/{project_id}")),
            paymaster_method: default_paymaster_method(),
            kernel_version: default_kernel_version(),
            deployment,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err(SessionError::Config("chainId must be non-zero".into()));
        }
        for (name, url) in [("rpcUrl", &self.rpc_url), ("bundlerUrl", &self.bundler_url)] {
            if url.trim().is_empty() {
                return Err(SessionError::Config(format!("{name} is empty")));
            }
        }
        self.deployment.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::deployment;

    #[test]
    fn defaults_fill_optional_fields() {
        let json = serde_json::json!({
            "chainId": 11155420,
            "rpcUrl": "http://localhost:8545",
            "bundlerUrl": "http://localhost:4337",
            "deployment": {
                "factory": Address::repeat_byte(0xfa),
                "implementation": Address::repeat_byte(0x1e),
                "accountInitCodeHash": B256::repeat_byte(0xc0),
                "permissionValidator": Address::repeat_byte(0xa1),
                "ecdsaSigner": Address::repeat_byte(0xa2),
                "webauthnSigner": Address::repeat_byte(0xa3),
                "sudoPolicy": Address::repeat_byte(0xa4),
                "merklePolicy": Address::repeat_byte(0xa5),
                "signaturePolicy": Address::repeat_byte(0xa6),
            }
        });
        let config: NetworkConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.paymaster_method, DEFAULT_PAYMASTER_METHOD);
        assert_eq!(config.kernel_version, DEFAULT_KERNEL_VERSION);
        assert_eq!(config.deployment, deployment());
        assert!(config.paymaster_url.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn zerodev_urls() {
        let config = NetworkConfig::zerodev("abc", 10, "http://rpc", deployment());
        assert_eq!(
            config.bundler_url,
            "https://rpc.zerodev.app/api/v2/bundler/abc"
        );
        assert_eq!(
            config.paymaster_url.as_deref(),
            Some("https://rpc.zerodev.app/api/v2/paymaster/abc")
        );
        assert_eq!(
            config.passkey_server_url.as_deref(),
            Some("https://passkeys.zerodev.app/api/v2/abc")
        );
    }

    #[test]
    fn zero_address_is_rejected() {
        let mut d = deployment();
        d.merkle_policy = Address::ZERO;
        let err = d.validate().unwrap_err();
        assert!(err.to_string().contains("merklePolicy"));
    }
}
