//! Order gateway contract: its EIP-712 domain and the calls the client makes on it.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use kernel_session_types::{CallData, Order, SignedOrder, TypedDomain};

use crate::{kernel::interfaces::IOrderGateway, utils::eip712};

/// A deployed gateway. Name, version and address are inputs; gateways are redeployed under new
/// versions, so none of them is fixed here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderGateway {
    domain: TypedDomain,
}

impl OrderGateway {
    pub fn new(domain: TypedDomain) -> Self {
        Self { domain }
    }

    pub fn address(&self) -> Address {
        self.domain.verifying_contract
    }

    pub fn domain(&self) -> &TypedDomain {
        &self.domain
    }

    pub fn order_hash(&self, order: &Order) -> alloy_primitives::B256 {
        eip712::order_digest(&self.domain, order)
    }

    /// `cancelOrder(signedOrder)` as a call for the account to execute.
    pub fn cancel_order_call(&self, signed_order: &SignedOrder) -> CallData {
        let data = IOrderGateway::cancelOrderCall {
            signedOrder: signed_order.into(),
        }
        .abi_encode();
        CallData::new(self.address(), U256::ZERO, data)
    }
}
