//! Kernel v2 (ERC-4337) compatibility shims.
//!
//! This module keeps the client ABI-aligned with the Kernel account, its factory, the
//! modular permission validator and the order gateway contracts it talks to.

pub mod constants;
pub mod interfaces;
