//! Fixtures shared by unit tests.

use alloy_primitives::{Address, B256};

use crate::{
    config::{KernelDeployment, NetworkConfig},
    kernel::constants::ENTRY_POINT_V06,
    signer::SessionKey,
};

pub(crate) fn deployment() -> KernelDeployment {
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

pub(crate) fn network_config() -> NetworkConfig {
    NetworkConfig {
        chain_id: 11155420,
        rpc_url: "http://127.0.0.1:8545".into(),
        bundler_url: "http://127.0.0.1:4337".into(),
        paymaster_url: None,
        passkey_server_url: None,
        paymaster_method: "zd_sponsorUserOperation".into(),
        kernel_version: "0.2.4".into(),
        deployment: deployment(),
    }
}

pub(crate) fn owner_key() -> SessionKey {
    SessionKey::from_bytes(&[0x11; 32]).expect("valid key")
}

pub(crate) fn session_key() -> SessionKey {
    SessionKey::from_bytes(&[0x22; 32]).expect("valid key")
}
