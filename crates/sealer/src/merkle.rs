use sha2::{Digest, Sha256};

/// Hash a parent node from two children, order-independent.
///
/// Sorting the pair before hashing means a proof path carries no
/// left/right indices.
fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update(lo);
    hasher.update(hi);
    hasher.finalize().into()
}

/// Compute the Merkle root of a list of leaf hashes.
///
/// Uses SHA-256 with sorted-pair internal nodes. Empty input returns all
/// zeros. Single leaf returns that leaf. Odd-length levels duplicate the
/// last element.
pub fn compute_merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    let mut current_level = leaves.to_vec();
    while current_level.len() > 1 {
        let mut next_level = Vec::with_capacity(current_level.len().div_ceil(2));
        for chunk in current_level.chunks(2) {
            let left = &chunk[0];
            let right = if chunk.len() == 2 { &chunk[1] } else { &chunk[0] };
            next_level.push(hash_pair(left, right));
        }
        current_level = next_level;
    }
    current_level[0]
}

/// Compute one proof path (sibling hashes, leaf to root) per leaf.
///
/// `merkle_proofs(leaves)[i]` verifies `leaves[i]` against
/// `compute_merkle_root(leaves)` via [`verify_proof`].
pub fn merkle_proofs(leaves: &[[u8; 32]]) -> Vec<Vec<[u8; 32]>> {
    let mut proofs: Vec<Vec<[u8; 32]>> = vec![Vec::new(); leaves.len()];
    if leaves.len() < 2 {
        return proofs;
    }

    // positions[i] tracks which node of the current level leaf i sits under.
    let mut positions: Vec<usize> = (0..leaves.len()).collect();
    let mut current_level = leaves.to_vec();

    while current_level.len() > 1 {
        for (leaf, pos) in positions.iter().enumerate() {
            let sibling = if pos % 2 == 0 { pos + 1 } else { pos - 1 };
            let sibling = sibling.min(current_level.len() - 1);
            proofs[leaf].push(current_level[sibling]);
        }

        let mut next_level = Vec::with_capacity(current_level.len().div_ceil(2));
        for chunk in current_level.chunks(2) {
            let left = &chunk[0];
            let right = if chunk.len() == 2 { &chunk[1] } else { &chunk[0] };
            next_level.push(hash_pair(left, right));
        }
        current_level = next_level;
        for pos in positions.iter_mut() {
            *pos /= 2;
        }
    }
    proofs
}

/// Fold a leaf through its proof path and compare against the root.
pub fn verify_proof(leaf: &[u8; 32], proof: &[[u8; 32]], root: &[u8; 32]) -> bool {
    let mut current = *leaf;
    for sibling in proof {
        current = hash_pair(&current, sibling);
    }
    current == *root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: u8) -> Vec<[u8; 32]> {
        (0..n).map(|i| [i; 32]).collect()
    }

    #[test]
    fn test_empty_merkle_root() {
        assert_eq!(compute_merkle_root(&[]), [0u8; 32]);
    }

    #[test]
    fn test_single_leaf() {
        let leaf = [42u8; 32];
        assert_eq!(compute_merkle_root(&[leaf]), leaf);
        assert!(verify_proof(&leaf, &[], &leaf));
    }

    #[test]
    fn test_two_leaves() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let root = compute_merkle_root(&[a, b]);
        let proofs = merkle_proofs(&[a, b]);
        assert!(verify_proof(&a, &proofs[0], &root));
        assert!(verify_proof(&b, &proofs[1], &root));
    }

    #[test]
    fn test_proofs_verify_for_all_sizes() {
        for n in 1..=9u8 {
            let leaves = leaves(n);
            let root = compute_merkle_root(&leaves);
            let proofs = merkle_proofs(&leaves);
            for (leaf, proof) in leaves.iter().zip(&proofs) {
                assert!(verify_proof(leaf, proof, &root), "n={n}");
            }
        }
    }

    #[test]
    fn test_wrong_leaf_fails() {
        let leaves = leaves(4);
        let root = compute_merkle_root(&leaves);
        let proofs = merkle_proofs(&leaves);
        assert!(!verify_proof(&[99u8; 32], &proofs[0], &root));
    }

    #[test]
    fn test_deterministic() {
        let leaves = leaves(5);
        assert_eq!(compute_merkle_root(&leaves), compute_merkle_root(&leaves));
    }
}
