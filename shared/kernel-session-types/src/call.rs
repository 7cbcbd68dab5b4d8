use alloy_primitives::{Address, Bytes, U256};

/// One contract invocation inside a user operation batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallData {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl CallData {
    pub fn new(to: Address, value: U256, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value,
            data: data.into(),
        }
    }

    /// Function selector of `data`. Plain value transfers (fewer than 4 bytes) yield zero.
    pub fn selector(&self) -> [u8; 4] {
        let mut out = [0u8; 4];
        if self.data.len() >= 4 {
            out.copy_from_slice(&self.data[..4]);
        }
        out
    }

    /// The 32-byte calldata word starting at `offset`, if fully present.
    pub fn word_at(&self, offset: usize) -> Option<[u8; 32]> {
        let end = offset.checked_add(32)?;
        if self.data.len() < end {
            return None;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.data[offset..end]);
        Some(out)
    }
}
