//! Low-level helpers shared by the account, signing and verification layers.

pub mod bytes;
pub mod crypto;
pub mod eip712;
pub mod kernel;
pub mod merkle;
