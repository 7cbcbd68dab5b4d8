use alloy_primitives::{B256, U256};

use crate::call::CallData;

/// Comparison applied by an argument rule (Kernel modular-permission `ParamCondition`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
#[repr(u8)]
pub enum ParamCondition {
    Equal = 0,
    GreaterThan = 1,
    LessThan = 2,
    GreaterThanOrEqual = 3,
    LessThanOrEqual = 4,
    NotEqual = 5,
}

impl ParamCondition {
    /// Evaluate `actual <condition> expected`, both read as big-endian uint256 words.
    pub fn holds(self, actual: &[u8; 32], expected: &B256) -> bool {
        let actual = U256::from_be_bytes(*actual);
        let expected = U256::from_be_bytes(expected.0);
        match self {
            ParamCondition::Equal => actual == expected,
            ParamCondition::GreaterThan => actual > expected,
            ParamCondition::LessThan => actual < expected,
            ParamCondition::GreaterThanOrEqual => actual >= expected,
            ParamCondition::LessThanOrEqual => actual <= expected,
            ParamCondition::NotEqual => actual != expected,
        }
    }
}

impl TryFrom<u8> for ParamCondition {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use ParamCondition::*;
        let condition = match value {
            0 => Equal,
            1 => GreaterThan,
            2 => LessThan,
            3 => GreaterThanOrEqual,
            4 => LessThanOrEqual,
            5 => NotEqual,
            _ => return Err(()),
        };
        Ok(condition)
    }
}

/// Constraint on one static calldata argument.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamRule {
    pub condition: ParamCondition,
    /// Byte offset into calldata (selector included), i.e. `4 + 32 * argIndex`.
    pub offset: u64,
    pub value: B256,
}

impl ParamRule {
    /// A call whose calldata is too short for the rule never matches.
    pub fn matches(&self, call: &CallData) -> bool {
        let Ok(offset) = usize::try_from(self.offset) else {
            return false;
        };
        match call.word_at(offset) {
            Some(word) => self.condition.holds(&word, &self.value),
            None => false,
        }
    }
}
