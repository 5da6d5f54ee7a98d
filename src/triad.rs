use crate::crypto::{Address, Digest, HashScheme};
use crate::transaction::TransactionNode;
use serde::{Deserialize, Serialize};

/// Content-addressed triad id: the hash of a sealed triad's header.
pub type TriadId = Digest;

/// Number of child positions under every triad.
pub const CHILD_SLOTS: usize = 3;

/// Fixed genesis timestamp (2023-01-01T00:00:00Z, milliseconds)
pub const GENESIS_TIMESTAMP: i64 = 1_672_531_200_000;

/// One of the three Sierpinski sub-triangle positions under a triad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildSlot {
    Empty,
    /// Held by an outstanding mining job for the open triad `triad_id`.
    Reserved { job_id: u64, triad_id: TriadId },
    Occupied(TriadId),
}

impl ChildSlot {
    pub fn is_empty(&self) -> bool {
        matches!(self, ChildSlot::Empty)
    }

    pub fn child(&self) -> Option<TriadId> {
        match self {
            ChildSlot::Occupied(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriadStatus {
    Open,
    Sealed,
}

/// Fields committed to by proof-of-work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriadHeader {
    pub parent_id: Option<TriadId>,
    pub depth: u64,
    pub slot: u8,
    pub transaction_root: Digest,
    pub timestamp: i64,
    pub nonce: u64,
}

impl TriadHeader {
    /// Header bytes up to, but excluding, the trailing nonce.
    pub fn prefix(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(1 + 32 + 8 + 1 + 32 + 8 + 8);
        match self.parent_id {
            Some(parent) => {
                data.push(1);
                data.extend_from_slice(&parent);
            }
            None => {
                data.push(0);
                data.extend_from_slice(&[0u8; 32]);
            }
        }
        data.extend_from_slice(&self.depth.to_le_bytes());
        data.push(self.slot);
        data.extend_from_slice(&self.transaction_root);
        data.extend_from_slice(&self.timestamp.to_le_bytes());
        data
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut data = self.prefix();
        data.extend_from_slice(&self.nonce.to_le_bytes());
        data
    }

    pub fn hash(&self, scheme: HashScheme) -> Digest {
        scheme.digest(&self.encode())
    }
}

/// Root over the ordered transaction hashes of a triad.
pub fn transaction_root(scheme: HashScheme, transactions: &[TransactionNode]) -> Digest {
    let mut data = Vec::with_capacity(transactions.len() * 32);
    for tx in transactions {
        data.extend_from_slice(&tx.hash);
    }
    scheme.digest(&data)
}

/// A fractal ledger unit. Open while it collects transactions, sealed once
/// its proof-of-work has been accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triad {
    /// Provisional id while open, header hash once sealed
    pub id: TriadId,
    pub parent_id: Option<TriadId>,
    pub depth: u64,
    /// Position under the parent (0 for genesis)
    pub slot: u8,
    pub timestamp: i64,
    pub child_slots: [ChildSlot; CHILD_SLOTS],
    pub transactions: Vec<TransactionNode>,
    pub nonce: Option<u64>,
    pub mined_hash: Option<Digest>,
    pub miner: Option<Address>,
    pub reward: f64,
}

impl Triad {
    /// The pre-sealed depth-0 root. It carries no proof-of-work.
    pub fn genesis(scheme: HashScheme) -> Self {
        let mut triad = Triad::open([0u8; 32], None, 0, 0, GENESIS_TIMESTAMP);
        let hash = triad.header(scheme, 0).hash(scheme);
        triad.seal(0, hash, [0u8; 32], 0.0);
        triad
    }

    pub fn open(
        provisional_id: TriadId,
        parent_id: Option<TriadId>,
        depth: u64,
        slot: u8,
        timestamp: i64,
    ) -> Self {
        Triad {
            id: provisional_id,
            parent_id,
            depth,
            slot,
            timestamp,
            child_slots: [ChildSlot::Empty; CHILD_SLOTS],
            transactions: Vec::new(),
            nonce: None,
            mined_hash: None,
            miner: None,
            reward: 0.0,
        }
    }

    pub fn status(&self) -> TriadStatus {
        if self.nonce.is_some() {
            TriadStatus::Sealed
        } else {
            TriadStatus::Open
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.status() == TriadStatus::Sealed
    }

    pub fn is_genesis(&self) -> bool {
        self.depth == 0 && self.parent_id.is_none()
    }

    pub fn transaction_root(&self, scheme: HashScheme) -> Digest {
        transaction_root(scheme, &self.transactions)
    }

    pub fn header(&self, scheme: HashScheme, nonce: u64) -> TriadHeader {
        TriadHeader {
            parent_id: self.parent_id,
            depth: self.depth,
            slot: self.slot,
            transaction_root: self.transaction_root(scheme),
            timestamp: self.timestamp,
            nonce,
        }
    }

    /// Header with the recorded nonce, if sealed.
    pub fn sealed_header(&self, scheme: HashScheme) -> Option<TriadHeader> {
        self.nonce.map(|nonce| self.header(scheme, nonce))
    }

    /// Freezes the triad under its header hash.
    pub fn seal(&mut self, nonce: u64, hash: Digest, miner: Address, reward: f64) {
        self.id = hash;
        self.nonce = Some(nonce);
        self.mined_hash = Some(hash);
        self.miner = Some(miner);
        self.reward = reward;
    }

    pub fn children(&self) -> impl Iterator<Item = (u8, TriadId)> + '_ {
        self.child_slots
            .iter()
            .enumerate()
            .filter_map(|(slot, s)| s.child().map(|id| (slot as u8, id)))
    }

    pub fn child_count(&self) -> usize {
        self.children().count()
    }

    pub fn id_str(&self) -> String {
        hex::encode(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::address_from_string;

    #[test]
    fn test_genesis_is_sealed_and_content_addressed() {
        let genesis = Triad::genesis(HashScheme::Sha256);
        assert!(genesis.is_sealed());
        assert!(genesis.is_genesis());
        assert_eq!(genesis.depth, 0);
        let header = genesis.sealed_header(HashScheme::Sha256).unwrap();
        assert_eq!(header.hash(HashScheme::Sha256), genesis.id);
        assert_eq!(genesis.mined_hash, Some(genesis.id));
    }

    #[test]
    fn test_genesis_depends_on_hash_scheme() {
        assert_ne!(
            Triad::genesis(HashScheme::Sha256).id,
            Triad::genesis(HashScheme::Blake3).id
        );
    }

    #[test]
    fn test_header_prefix_excludes_nonce() {
        let triad = Triad::open([7u8; 32], Some([1u8; 32]), 1, 2, 99);
        let a = triad.header(HashScheme::Sha256, 1);
        let b = triad.header(HashScheme::Sha256, 2);
        assert_eq!(a.prefix(), b.prefix());
        assert_ne!(a.hash(HashScheme::Sha256), b.hash(HashScheme::Sha256));
    }

    #[test]
    fn test_slot_is_part_of_header() {
        let left = Triad::open([7u8; 32], Some([1u8; 32]), 1, 0, 99);
        let right = Triad::open([7u8; 32], Some([1u8; 32]), 1, 1, 99);
        assert_ne!(
            left.header(HashScheme::Sha256, 5).hash(HashScheme::Sha256),
            right.header(HashScheme::Sha256, 5).hash(HashScheme::Sha256)
        );
    }

    #[test]
    fn test_transaction_root_tracks_order() {
        let tx_a = TransactionNode::new(
            HashScheme::Sha256,
            address_from_string("a"),
            address_from_string("b"),
            1.0,
            0.0,
            1,
        );
        let tx_b = TransactionNode::new(
            HashScheme::Sha256,
            address_from_string("b"),
            address_from_string("a"),
            2.0,
            0.0,
            2,
        );
        let forward = transaction_root(HashScheme::Sha256, &[tx_a.clone(), tx_b.clone()]);
        let reverse = transaction_root(HashScheme::Sha256, &[tx_b, tx_a]);
        assert_ne!(forward, reverse);
    }

    #[test]
    fn test_children_lists_occupied_slots_only() {
        let mut triad = Triad::genesis(HashScheme::Sha256);
        triad.child_slots[0] = ChildSlot::Occupied([3u8; 32]);
        triad.child_slots[2] = ChildSlot::Reserved {
            job_id: 1,
            triad_id: [4u8; 32],
        };
        let children: Vec<_> = triad.children().collect();
        assert_eq!(children, vec![(0, [3u8; 32])]);
        assert_eq!(triad.child_count(), 1);
    }
}
