use crate::commitment::AccessGrant;
use crate::crypto::{Address, Digest, HashScheme};
use crate::economics::Target;
use crate::triad::{TriadHeader, TriadId};
use serde::{Deserialize, Serialize};

/// Work handed to a miner: the header to hash and the target to beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningJob {
    pub job_id: u64,
    pub parent_id: TriadId,
    pub slot: u8,
    /// Provisional id of the open triad reserved in the slot
    pub triad_id: TriadId,
    pub depth: u64,
    pub grant: AccessGrant,
    pub hash_scheme: HashScheme,
    /// Header template; its nonce field is ignored
    pub header: TriadHeader,
    pub difficulty: f64,
    pub target: Target,
}

impl MiningJob {
    pub fn identity(&self) -> &Address {
        &self.grant.identity
    }

    /// Header bytes preceding the nonce.
    pub fn prefix(&self) -> Vec<u8> {
        self.header.prefix()
    }

    pub fn hash_with_nonce(&self, nonce: u64) -> Digest {
        let mut data = self.prefix();
        data.extend_from_slice(&nonce.to_le_bytes());
        self.hash_scheme.digest(&data)
    }

    pub fn is_solution(&self, nonce: u64) -> bool {
        self.target.is_met_by(&self.hash_with_nonce(nonce))
    }
}

/// An empty child position under a sealed triad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSlot {
    pub parent_id: TriadId,
    pub parent_depth: u64,
    pub slot: u8,
}

impl OpenSlot {
    /// Depth a triad mined into this slot will have.
    pub fn depth(&self) -> u64 {
        self.parent_depth + 1
    }
}

/// Outcome of an accepted solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningReceipt {
    pub triad_id: TriadId,
    pub parent_id: TriadId,
    pub slot: u8,
    pub depth: u64,
    pub nonce: u64,
    pub miner: Address,
    /// `density(depth) * multiplier`
    pub reward: f64,
    pub transaction_burn: f64,
    pub depth_tax: f64,
}
