//! Shared types for Kernel session-key accounts (library and tooling).

pub mod call;
pub mod order;
pub mod permission;

pub use call::CallData;
pub use order::{Order, SignedOrder, TypedDomain, EIP712_DOMAIN_TYPE, ORDER_TYPE};
pub use permission::{ParamCondition, ParamRule};
