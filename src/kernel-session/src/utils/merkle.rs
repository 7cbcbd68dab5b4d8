//! Sorted-pair keccak Merkle tree, compatible with OpenZeppelin `MerkleProof`.

use alloy_primitives::{keccak256, B256};

/// Hash of a pair, smaller value first.
pub fn hash_pair(a: B256, b: B256) -> B256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo.as_slice());
    buf[32..].copy_from_slice(hi.as_slice());
    keccak256(buf)
}

/// Fold `proof` into `leaf` (`MerkleProof.processProof`).
pub fn process_proof(leaf: B256, proof: &[B256]) -> B256 {
    proof.iter().fold(leaf, |node, sibling| hash_pair(node, *sibling))
}

pub fn verify(root: B256, leaf: B256, proof: &[B256]) -> bool {
    process_proof(leaf, proof) == root
}

/// Tree over leaves in the order given. A node without a sibling is promoted unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    layers: Vec<Vec<B256>>,
}

impl MerkleTree {
    pub fn new(leaves: Vec<B256>) -> Self {
        let mut layers = vec![leaves];
        while let Some(last) = layers.last() {
            if last.len() <= 1 {
                break;
            }
            let next = last
                .chunks(2)
                .map(|pair| pair.iter().copied().reduce(hash_pair).unwrap_or(B256::ZERO))
                .collect();
            layers.push(next);
        }
        Self { layers }
    }

    /// Zero for an empty tree.
    pub fn root(&self) -> B256 {
        self.layers
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or(B256::ZERO)
    }

    pub fn leaf_count(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    pub fn proof(&self, mut index: usize) -> Option<Vec<B256>> {
        if index >= self.leaf_count() {
            return None;
        }
        let mut proof = Vec::new();
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling = index ^ 1;
            if let Some(node) = layer.get(sibling) {
                proof.push(*node);
            }
            index /= 2;
        }
        Some(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: u8) -> Vec<B256> {
        (0..n).map(|i| keccak256([i])).collect()
    }

    #[test]
    fn every_leaf_proves_for_odd_and_even_sizes() {
        for n in 1..=7 {
            let leaves = leaves(n);
            let tree = MerkleTree::new(leaves.clone());
            for (i, leaf) in leaves.iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                assert!(verify(tree.root(), *leaf, &proof), "n={n} i={i}");
            }
        }
    }

    #[test]
    fn single_leaf_is_root() {
        let leaf = keccak256(b"only");
        let tree = MerkleTree::new(vec![leaf]);
        assert_eq!(tree.root(), leaf);
        assert_eq!(tree.proof(0), Some(vec![]));
    }

    #[test]
    fn reordering_changes_root() {
        let l = leaves(3);
        let a = MerkleTree::new(l.clone());
        let b = MerkleTree::new(vec![l[2], l[1], l[0]]);
        assert_ne!(a.root(), b.root());
    }

    #[test]
    fn foreign_leaf_fails() {
        let tree = MerkleTree::new(leaves(4));
        let proof = tree.proof(0).unwrap();
        assert!(!verify(tree.root(), keccak256(b"other"), &proof));
        assert_eq!(tree.proof(4), None);
        assert_eq!(MerkleTree::new(vec![]).root(), B256::ZERO);
    }
}
