use crate::commitment::CommitmentGate;
use crate::crypto::HashScheme;
use crate::economics::EconomicParams;
use crate::error::{MatrixError, Result};
use crate::matrix::ledger::TriadMatrix;
use crate::matrix::state::EconomicState;
use crate::matrix::validation::validate_triads;
use crate::triad::{ChildSlot, Triad, TriadId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Every sealed triad plus the economic counters, sufficient to rebuild a
/// matrix. Open triads and their reservations are not captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixSnapshot {
    pub version: u32,
    pub hash_scheme: HashScheme,
    pub params: EconomicParams,
    pub genesis_id: TriadId,
    /// Ordered by depth, then id
    pub triads: Vec<Triad>,
    pub economics: EconomicState,
}

impl MatrixSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl TriadMatrix {
    /// Captures the sealed triads and counters at one commit boundary, so
    /// the result always rebuilds even while miners keep sealing. Pending
    /// reservations are written as empty slots.
    pub fn snapshot(&self) -> MatrixSnapshot {
        let (sealed, economics) = self.sealed_view();
        let mut triads: Vec<Triad> = sealed
            .into_values()
            .map(|mut triad| {
                for slot in triad.child_slots.iter_mut() {
                    if matches!(slot, ChildSlot::Reserved { .. }) {
                        *slot = ChildSlot::Empty;
                    }
                }
                triad
            })
            .collect();
        triads.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.id.cmp(&b.id)));

        MatrixSnapshot {
            version: SNAPSHOT_VERSION,
            hash_scheme: self.scheme,
            params: self.params,
            genesis_id: self.genesis_id,
            triads,
            economics,
        }
    }

    /// Rebuilds a matrix from a snapshot after validating every triad in it.
    /// Economic counters are restored, not replayed.
    pub fn from_snapshot(snapshot: MatrixSnapshot, gate: CommitmentGate) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(MatrixError::InvalidSnapshot(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        let mut triads: HashMap<TriadId, Triad> = HashMap::with_capacity(snapshot.triads.len());
        for triad in snapshot.triads {
            if triad
                .child_slots
                .iter()
                .any(|s| matches!(s, ChildSlot::Reserved { .. }))
            {
                return Err(MatrixError::InvalidSnapshot(format!(
                    "Triad {} carries a slot reservation",
                    triad.id_str()
                )));
            }
            if let Some(duplicate) = triads.insert(triad.id, triad) {
                return Err(MatrixError::InvalidSnapshot(format!(
                    "Duplicate triad {}",
                    duplicate.id_str()
                )));
            }
        }

        let report = validate_triads(
            snapshot.hash_scheme,
            &snapshot.params,
            &snapshot.genesis_id,
            &triads,
        );
        if let Some(issue) = report.issues.first() {
            return Err(MatrixError::InvalidSnapshot(format!(
                "{} ({} issues)",
                issue,
                report.issues.len()
            )));
        }

        if snapshot.economics.sealed_total() != triads.len() as u64 {
            return Err(MatrixError::InvalidSnapshot(format!(
                "Economic counters record {} sealed triads, snapshot holds {}",
                snapshot.economics.sealed_total(),
                triads.len()
            )));
        }

        info!(
            "Rebuilt triad matrix from snapshot ({} triads, hash = {})",
            triads.len(),
            snapshot.hash_scheme
        );

        let index = triads
            .into_iter()
            .map(|(id, triad)| (id, Arc::new(Mutex::new(triad))))
            .collect();
        Ok(TriadMatrix::assemble(
            gate,
            snapshot.hash_scheme,
            snapshot.params,
            snapshot.genesis_id,
            index,
            snapshot.economics,
        ))
    }
}
