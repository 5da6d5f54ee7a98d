use crate::crypto::HashScheme;
use crate::economics::EconomicParams;
use crate::triad::{ChildSlot, Triad, TriadId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationIssue {
    #[error("Genesis triad {0} is missing")]
    MissingGenesis(String),
    #[error("Genesis triad {0} is malformed")]
    MalformedGenesis(String),
    #[error("Triad {0} is not sealed")]
    Unsealed(String),
    #[error("Triad {0} header hash does not match its id")]
    HashMismatch(String),
    #[error("Triad {triad} transaction {index} hash does not match its contents")]
    TransactionHashMismatch { triad: String, index: usize },
    #[error("Triad {triad} at depth {depth} does not meet its difficulty target")]
    DifficultyNotMet { triad: String, depth: u64 },
    #[error("Triad {triad} has depth {found}, expected {expected}")]
    DepthMismatch {
        triad: String,
        expected: u64,
        found: u64,
    },
    #[error("Triad {parent} slot {slot} references missing child {child}")]
    MissingChild {
        parent: String,
        slot: u8,
        child: String,
    },
    #[error("Triad {child} does not point back to parent {parent} slot {slot}")]
    ParentMismatch {
        parent: String,
        child: String,
        slot: u8,
    },
    #[error("Triad {0} is reachable more than once")]
    Cycle(String),
    #[error("Triad {0} is not reachable from genesis")]
    Orphan(String),
}

/// Verdict of a full matrix validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checked: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

fn short(id: &TriadId) -> String {
    hex::encode(id)
}

/// Checks a set of sealed triads from the genesis down: header hashes,
/// transaction hashes, difficulty per depth, depth continuity and
/// parent/child agreement. Never mutates its input.
pub fn validate_triads(
    scheme: HashScheme,
    params: &EconomicParams,
    genesis_id: &TriadId,
    triads: &HashMap<TriadId, Triad>,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    let genesis = match triads.get(genesis_id) {
        Some(genesis) => genesis,
        None => {
            report.issues.push(ValidationIssue::MissingGenesis(short(genesis_id)));
            return report;
        }
    };
    if !genesis.is_genesis() || !genesis.is_sealed() {
        report
            .issues
            .push(ValidationIssue::MalformedGenesis(short(genesis_id)));
    }

    let mut visited: HashSet<TriadId> = HashSet::new();
    let mut queue = VecDeque::from([*genesis_id]);

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            report.issues.push(ValidationIssue::Cycle(short(&id)));
            continue;
        }
        let triad = match triads.get(&id) {
            Some(triad) => triad,
            None => continue,
        };
        report.checked += 1;
        check_triad(scheme, params, triad, &mut report);

        for (slot, state) in triad.child_slots.iter().enumerate() {
            let child_id = match state {
                ChildSlot::Occupied(child_id) => *child_id,
                _ => continue,
            };
            let slot = slot as u8;
            let child = match triads.get(&child_id) {
                Some(child) => child,
                None => {
                    report.issues.push(ValidationIssue::MissingChild {
                        parent: short(&id),
                        slot,
                        child: short(&child_id),
                    });
                    continue;
                }
            };
            if child.parent_id != Some(id) || child.slot != slot {
                report.issues.push(ValidationIssue::ParentMismatch {
                    parent: short(&id),
                    child: short(&child_id),
                    slot,
                });
            }
            if child.depth != triad.depth + 1 {
                report.issues.push(ValidationIssue::DepthMismatch {
                    triad: short(&child_id),
                    expected: triad.depth + 1,
                    found: child.depth,
                });
            }
            queue.push_back(child_id);
        }
    }

    let mut orphans: Vec<_> = triads
        .keys()
        .filter(|id| !visited.contains(*id))
        .map(short)
        .collect();
    orphans.sort();
    report
        .issues
        .extend(orphans.into_iter().map(ValidationIssue::Orphan));

    report
}

fn check_triad(
    scheme: HashScheme,
    params: &EconomicParams,
    triad: &Triad,
    report: &mut ValidationReport,
) {
    let header = match triad.sealed_header(scheme) {
        Some(header) => header,
        None => {
            report
                .issues
                .push(ValidationIssue::Unsealed(triad.id_str()));
            return;
        }
    };

    for (index, tx) in triad.transactions.iter().enumerate() {
        if tx.calculate_hash(scheme) != tx.hash {
            report.issues.push(ValidationIssue::TransactionHashMismatch {
                triad: triad.id_str(),
                index,
            });
        }
    }

    let hash = header.hash(scheme);
    if hash != triad.id || triad.mined_hash != Some(hash) {
        report
            .issues
            .push(ValidationIssue::HashMismatch(triad.id_str()));
    }

    // genesis carries no proof-of-work
    if !triad.is_genesis() && !params.difficulty.target(triad.depth).is_met_by(&hash) {
        report.issues.push(ValidationIssue::DifficultyNotMet {
            triad: triad.id_str(),
            depth: triad.depth,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genesis_only() -> (TriadId, HashMap<TriadId, Triad>) {
        let genesis = Triad::genesis(HashScheme::Sha256);
        let id = genesis.id;
        (id, HashMap::from([(id, genesis)]))
    }

    #[test]
    fn test_genesis_only_is_valid() {
        let (id, triads) = genesis_only();
        let report = validate_triads(HashScheme::Sha256, &EconomicParams::default(), &id, &triads);
        assert!(report.is_valid(), "{:?}", report.issues);
        assert_eq!(report.checked, 1);
    }

    #[test]
    fn test_missing_genesis() {
        let (_, triads) = genesis_only();
        let report = validate_triads(
            HashScheme::Sha256,
            &EconomicParams::default(),
            &[9u8; 32],
            &triads,
        );
        assert!(matches!(report.issues[0], ValidationIssue::MissingGenesis(_)));
    }

    #[test]
    fn test_dangling_child_reference() {
        let (id, mut triads) = genesis_only();
        if let Some(genesis) = triads.get_mut(&id) {
            genesis.child_slots[1] = ChildSlot::Occupied([5u8; 32]);
        }
        let report = validate_triads(HashScheme::Sha256, &EconomicParams::default(), &id, &triads);
        assert!(matches!(
            report.issues[0],
            ValidationIssue::MissingChild { slot: 1, .. }
        ));
    }

    #[test]
    fn test_orphan_detected() {
        let (id, mut triads) = genesis_only();
        let mut stray = Triad::open([0u8; 32], Some([8u8; 32]), 1, 0, 5);
        stray.seal(0, [6u8; 32], [0u8; 32], 0.0);
        triads.insert(stray.id, stray);
        let report = validate_triads(HashScheme::Sha256, &EconomicParams::default(), &id, &triads);
        assert!(report
            .issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::Orphan(_))));
    }
}
