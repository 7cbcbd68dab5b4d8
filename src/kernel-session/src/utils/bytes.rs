//! Minimal big-endian parsing helpers.
//!
//! These helpers are used for parsing Kernel signature envelopes (mode prefix, enable payload,
//! ERC-6492 wrapper) on the audit path.

use alloy_primitives::{Address, Bytes, B256, U256};

/// Input ended before a field of `wanted` bytes starting at `at`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Truncated {
    pub at: usize,
    pub wanted: usize,
}

impl std::fmt::Display for Truncated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "truncated input: wanted {} bytes at offset {}", self.wanted, self.at)
    }
}

fn take<'a>(bytes: &'a [u8], i: &mut usize, len: usize) -> Result<&'a [u8], Truncated> {
    let truncated = Truncated {
        at: *i,
        wanted: len,
    };
    let end = i.checked_add(len).ok_or(truncated)?;
    if bytes.len() < end {
        return Err(truncated);
    }
    let out = &bytes[*i..end];
    *i = end;
    Ok(out)
}

pub fn read_vec(bytes: &[u8], i: &mut usize, len: usize) -> Result<Bytes, Truncated> {
    take(bytes, i, len).map(Bytes::copy_from_slice)
}

pub fn read_array4(bytes: &[u8], i: &mut usize) -> Result<[u8; 4], Truncated> {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(take(bytes, i, 4)?);
    Ok(buf)
}

/// Solidity `uint48` packed as 6 bytes.
pub fn read_u48_be(bytes: &[u8], i: &mut usize) -> Result<u64, Truncated> {
    let mut buf = [0u8; 8];
    buf[2..].copy_from_slice(take(bytes, i, 6)?);
    Ok(u64::from_be_bytes(buf))
}

pub fn read_u256_be(bytes: &[u8], i: &mut usize) -> Result<U256, Truncated> {
    take(bytes, i, 32).map(U256::from_be_slice)
}

pub fn read_b32(bytes: &[u8], i: &mut usize) -> Result<B256, Truncated> {
    take(bytes, i, 32).map(B256::from_slice)
}

pub fn read_address(bytes: &[u8], i: &mut usize) -> Result<Address, Truncated> {
    take(bytes, i, 20).map(Address::from_slice)
}

/// `uint256` length prefix followed by that many bytes.
pub fn read_len_prefixed(bytes: &[u8], i: &mut usize) -> Result<Bytes, Truncated> {
    let at = *i;
    let len = read_u256_be(bytes, i)?;
    let len = usize::try_from(len).map_err(|_| Truncated {
        at,
        wanted: usize::MAX,
    })?;
    read_vec(bytes, i, len)
}
