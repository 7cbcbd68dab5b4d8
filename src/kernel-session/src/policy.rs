//! Permission sets and signature scopes for session keys.
//!
//! A permission set is an ordered list of `(target, selector, valueLimit, rules)` entries
//! committed to a Merkle root. Each call in a user operation carries an inclusion proof for the
//! entry that covers it; the merkle policy contract checks the proof and the rules on-chain.
//!
//! Leaf encoding: `keccak256(keccak256(abi.encode(uint256 index, Permission)))`. The index is part
//! of the leaf, so reordering entries changes the root.

use std::collections::HashMap;

use alloy_dyn_abi::DynSolType;
use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::{keccak256, Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::SolValue;
use kernel_session_types::{CallData, ParamCondition, ParamRule};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    errors::{Result, SessionError},
    kernel::{constants::UNMATCHED_PERMISSION_INDEX, interfaces},
    utils::merkle::MerkleTree,
};

/// Constraint on one function argument.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ArgPattern {
    /// Wildcard.
    Any,
    Rule { condition: ParamCondition, value: B256 },
}

impl ArgPattern {
    pub fn rule(condition: ParamCondition, value: U256) -> Self {
        ArgPattern::Rule {
            condition,
            value: B256::from(value.to_be_bytes::<32>()),
        }
    }

    pub fn equal_address(address: Address) -> Self {
        ArgPattern::Rule {
            condition: ParamCondition::Equal,
            value: address.into_word(),
        }
    }
}

/// Caller-facing permission entry, before resolution against an interface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    pub target: Address,
    /// Bare function name (looked up in the target's registered interface) or a full
    /// signature such as `transfer(address,uint256)`.
    pub function: String,
    /// One pattern per input, or empty to leave every argument unconstrained.
    #[serde(default)]
    pub args: Vec<ArgPattern>,
    #[serde(default)]
    pub value_limit: U256,
}

impl PermissionEntry {
    pub fn new(target: Address, function: impl Into<String>) -> Self {
        Self {
            target,
            function: function.into(),
            args: Vec::new(),
            value_limit: U256::ZERO,
        }
    }

    pub fn with_args(mut self, args: Vec<ArgPattern>) -> Self {
        self.args = args;
        self
    }

    pub fn with_value_limit(mut self, value_limit: U256) -> Self {
        self.value_limit = value_limit;
        self
    }
}

/// Committed form of an entry: what the merkle policy sees on-chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub target: Address,
    pub selector: FixedBytes<4>,
    pub value_limit: U256,
    pub rules: Vec<ParamRule>,
}

impl Permission {
    pub fn covers(&self, call: &CallData) -> bool {
        call.to == self.target
            && call.selector() == self.selector.0
            && call.value <= self.value_limit
            && self.rules.iter().all(|rule| rule.matches(call))
    }

    pub fn to_sol(&self) -> interfaces::Permission {
        interfaces::Permission {
            target: self.target,
            selector: self.selector,
            valueLimit: self.value_limit,
            rules: self
                .rules
                .iter()
                .map(|rule| interfaces::ParamRule {
                    condition: rule.condition as u8,
                    offset: rule.offset,
                    value: rule.value,
                })
                .collect(),
        }
    }

    /// `None` when a rule carries an unknown condition code.
    pub fn from_sol(permission: &interfaces::Permission) -> Option<Self> {
        let rules = permission
            .rules
            .iter()
            .map(|rule| {
                Some(ParamRule {
                    condition: ParamCondition::try_from(rule.condition).ok()?,
                    offset: rule.offset,
                    value: rule.value,
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            target: permission.target,
            selector: permission.selector,
            value_limit: permission.valueLimit,
            rules,
        })
    }

    pub fn leaf(&self, index: usize) -> B256 {
        let encoded = (U256::from(index), self.to_sol()).abi_encode_params();
        keccak256(keccak256(encoded))
    }
}

/// Ordered permissions plus their Merkle commitment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionSet {
    permissions: Vec<Permission>,
    tree: MerkleTree,
}

impl PermissionSet {
    pub fn from_permissions(permissions: Vec<Permission>) -> Self {
        let leaves = permissions
            .iter()
            .enumerate()
            .map(|(i, p)| p.leaf(i))
            .collect();
        Self {
            permissions,
            tree: MerkleTree::new(leaves),
        }
    }

    pub fn root(&self) -> B256 {
        self.tree.root()
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Index of the first permission covering `call`.
    ///
    /// Advisory only: an uncovered call is still encoded and submitted, and the account rejects
    /// it during validation.
    pub fn find_permission(&self, call: &CallData) -> Option<usize> {
        self.permissions.iter().position(|p| p.covers(call))
    }

    /// Inclusion proof for `call`, or the unmatched marker (`index = uint256.max`, no proof).
    pub fn call_proof(&self, call: &CallData) -> interfaces::CallProof {
        let found = self
            .find_permission(call)
            .and_then(|i| self.tree.proof(i).map(|proof| (i, proof)));
        match found {
            Some((index, proof)) => interfaces::CallProof {
                index: U256::from(index),
                permission: self.permissions[index].to_sol(),
                proof,
            },
            None => interfaces::CallProof {
                index: UNMATCHED_PERMISSION_INDEX,
                permission: interfaces::Permission {
                    target: call.to,
                    selector: FixedBytes(call.selector()),
                    valueLimit: call.value,
                    rules: Vec::new(),
                },
                proof: Vec::new(),
            },
        }
    }

    /// Merkle policy data for a batch: `abi.encode(CallProof[])`.
    pub fn policy_data(&self, calls: &[CallData]) -> Bytes {
        let proofs: Vec<interfaces::CallProof> = calls.iter().map(|c| self.call_proof(c)).collect();
        proofs.abi_encode().into()
    }

    /// Merkle policy install data: the root.
    pub fn init_data(&self) -> Bytes {
        Bytes::copy_from_slice(self.root().as_slice())
    }
}

/// Contracts allowed to request ERC-1271 validation through the account. No wildcards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureScope {
    allowed_requestors: Vec<Address>,
}

impl SignatureScope {
    pub fn allowed_requestors(&self) -> &[Address] {
        &self.allowed_requestors
    }

    pub fn allows(&self, requestor: Address) -> bool {
        self.allowed_requestors.contains(&requestor)
    }

    /// Signature policy install data: `abi.encode(address[])`.
    pub fn init_data(&self) -> Bytes {
        self.allowed_requestors.abi_encode().into()
    }
}

/// Resolves permission entries against known contract interfaces and commits them.
#[derive(Clone, Debug, Default)]
pub struct PolicyEngine {
    interfaces: HashMap<Address, JsonAbi>,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_interface(&mut self, target: Address, abi: JsonAbi) -> &mut Self {
        self.interfaces.insert(target, abi);
        self
    }

    /// Register from human-readable signatures, e.g. `function transfer(address,uint256)`.
    pub fn register_signatures<'a>(
        &mut self,
        target: Address,
        signatures: impl IntoIterator<Item = &'a str>,
    ) -> Result<&mut Self> {
        let abi = JsonAbi::parse(signatures)
            .map_err(|e| SessionError::Config(format!("interface for {target}: {e}")))?;
        Ok(self.register_interface(target, abi))
    }

    /// Register from a JSON ABI document.
    pub fn register_json(&mut self, target: Address, json: &str) -> Result<&mut Self> {
        let abi: JsonAbi = serde_json::from_str(json)
            .map_err(|e| SessionError::Config(format!("interface for {target}: {e}")))?;
        Ok(self.register_interface(target, abi))
    }

    /// Resolve and commit `entries` in the order given.
    pub fn build_permission_set(&self, entries: &[PermissionEntry]) -> Result<PermissionSet> {
        let permissions = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                self.resolve_entry(entry)
                    .map_err(|reason| SessionError::InvalidPermissionEntry { index, reason })
            })
            .collect::<Result<Vec<_>>>()?;

        let set = PermissionSet::from_permissions(permissions);
        debug!(entries = set.len(), root = %set.root(), "built permission set");
        Ok(set)
    }

    pub fn build_signature_scope(
        &self,
        allowed_requestors: impl IntoIterator<Item = Address>,
    ) -> Result<SignatureScope> {
        let allowed_requestors: Vec<Address> = allowed_requestors.into_iter().collect();
        if let Some(index) = allowed_requestors.iter().position(|a| a.is_zero()) {
            return Err(SessionError::InvalidPermissionEntry {
                index,
                reason: "requestor is the zero address".into(),
            });
        }
        Ok(SignatureScope { allowed_requestors })
    }

    fn resolve_entry(&self, entry: &PermissionEntry) -> std::result::Result<Permission, String> {
        if entry.target.is_zero() {
            return Err("target is the zero address".into());
        }
        let function = self.resolve_function(entry.target, &entry.function)?;

        if !entry.args.is_empty() && entry.args.len() != function.inputs.len() {
            return Err(format!(
                "{} takes {} arguments, {} patterns given",
                function.signature(),
                function.inputs.len(),
                entry.args.len()
            ));
        }

        let mut rules = Vec::new();
        let mut offset = 4u64;
        for (i, input) in function.inputs.iter().enumerate() {
            let ty = DynSolType::parse(&input.selector_type())
                .map_err(|e| format!("argument {i}: {e}"))?;
            let words = head_words(&ty);

            if let Some(ArgPattern::Rule { condition, value }) = entry.args.get(i) {
                if is_dynamic(&ty) {
                    return Err(format!(
                        "argument {i} ({}) is dynamic and cannot be constrained",
                        ty.sol_type_name()
                    ));
                }
                if words != 1 {
                    return Err(format!(
                        "argument {i} ({}) spans {words} words and cannot be constrained",
                        ty.sol_type_name()
                    ));
                }
                rules.push(ParamRule {
                    condition: *condition,
                    offset,
                    value: *value,
                });
            }
            offset += 32 * words as u64;
        }

        Ok(Permission {
            target: entry.target,
            selector: function.selector(),
            value_limit: entry.value_limit,
            rules,
        })
    }

    fn resolve_function(
        &self,
        target: Address,
        function: &str,
    ) -> std::result::Result<Function, String> {
        let function = function.trim();
        let known = self.interfaces.get(&target);

        if function.contains('(') {
            let parsed = Function::parse(function)
                .map_err(|e| format!("cannot parse `{function}`: {e}"))?;
            return match known {
                None => Ok(parsed),
                Some(abi) => abi
                    .functions()
                    .find(|f| f.selector() == parsed.selector())
                    .cloned()
                    .ok_or_else(|| {
                        format!(
                            "{} is not in the interface registered for {target}",
                            parsed.signature()
                        )
                    }),
            };
        }

        let abi = known.ok_or_else(|| {
            format!("no interface registered for {target} to resolve `{function}`")
        })?;
        match abi.function(function).map(Vec::as_slice) {
            Some([only]) => Ok(only.clone()),
            Some([]) | None => Err(format!("{target} has no function `{function}`")),
            Some(overloads) => Err(format!(
                "`{function}` is overloaded on {target} ({} candidates), use the full signature",
                overloads.len()
            )),
        }
    }
}

/// Dynamic ABI types are encoded out of line behind a single offset word.
fn is_dynamic(ty: &DynSolType) -> bool {
    match ty {
        DynSolType::Bytes | DynSolType::String | DynSolType::Array(_) => true,
        DynSolType::FixedArray(inner, _) => is_dynamic(inner),
        DynSolType::Tuple(inner) => inner.iter().any(is_dynamic),
        _ => false,
    }
}

/// Number of 32-byte head slots an ABI parameter occupies.
fn head_words(ty: &DynSolType) -> usize {
    if is_dynamic(ty) {
        return 1;
    }
    match ty {
        DynSolType::Tuple(inner) => inner.iter().map(head_words).sum(),
        DynSolType::FixedArray(inner, len) => head_words(inner) * len,
        _ => 1,
    }
}
