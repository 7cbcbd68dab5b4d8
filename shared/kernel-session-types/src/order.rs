//! Order structures exchanged with the order gateway contracts.

use alloy_primitives::{Address, Bytes, B256, I256, U256};

/// Canonical EIP-712 type string of the `Order` primary type (field order is ABI order).
pub const ORDER_TYPE: &str = "Order(uint8 action,uint256 marketId,int256 amount,uint256 price,uint256 expiry,uint8 tradeType,address owner,uint256 marginXCD,uint256 relayFee,bytes32 id)";

/// EIP-712 domain type string (name, version, chainId, verifyingContract).
pub const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Trading order. Wire layout is the ABI tuple in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Order {
    pub action: u8,
    pub market_id: U256,
    pub amount: I256,
    pub price: U256,
    pub expiry: U256,
    pub trade_type: u8,
    pub owner: Address,
    #[cfg_attr(feature = "serde", serde(rename = "marginXCD"))]
    pub margin_xcd: U256,
    pub relay_fee: U256,
    pub id: B256,
}

/// An order plus the owner's signature over its EIP-712 digest.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignedOrder {
    pub order: Order,
    pub signature: Bytes,
}

/// EIP-712 domain with the four fields used by the order gateways and Kernel.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct TypedDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl TypedDomain {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    /// Same name/version/chain, bound to another verifying contract.
    pub fn with_verifying_contract(&self, verifying_contract: Address) -> Self {
        Self {
            verifying_contract,
            ..self.clone()
        }
    }
}
