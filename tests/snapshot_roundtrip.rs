//! Integration tests for snapshot capture, rebuild and tamper detection

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use triadmatrix::commitment::{CommitmentGate, InMemoryCommitmentLedger};
use triadmatrix::crypto::{address_from_string, Address, HashScheme};
use triadmatrix::economics::{DifficultyEngine, EconomicParams, Tokenomics};
use triadmatrix::error::MatrixError;
use triadmatrix::matrix::{MatrixSnapshot, TriadMatrix};
use triadmatrix::miner::Miner;
use triadmatrix::transaction::TransactionNode;
use triadmatrix::triad::ChildSlot;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn gate_for(identity: Address) -> Result<CommitmentGate, Box<dyn std::error::Error>> {
    let ledger = Arc::new(InMemoryCommitmentLedger::new());
    ledger.deposit(identity, 150.0, Utc::now())?;
    Ok(CommitmentGate::new(ledger))
}

/// Mines genesis' three children plus one grandchild carrying a transaction.
fn mined_matrix(identity: Address) -> Result<TriadMatrix, Box<dyn std::error::Error>> {
    let matrix = TriadMatrix::new(gate_for(identity)?);
    let miner = Miner::new(identity, 2)?;
    let genesis_id = matrix.genesis_id();

    let mut first = None;
    for slot in 0..3 {
        let receipt = miner.mine(&matrix, &genesis_id, slot)?.ok_or("cancelled")?;
        first.get_or_insert(receipt.triad_id);
    }

    let parent_id = first.ok_or("no child mined")?;
    let job = matrix.begin_mining_job(&parent_id, 1, &identity, 2)?;
    let tx = TransactionNode::now(
        matrix.hash_scheme(),
        identity,
        address_from_string("receiver"),
        42.0,
        0.1,
    );
    matrix.append_transaction(&job.triad_id, tx)?;
    let job = matrix.refresh_job(job.job_id)?;
    miner.mine_job(&matrix, job)?.ok_or("cancelled")?;
    Ok(matrix)
}

#[test]
fn test_bincode_roundtrip_preserves_matrix() -> TestResult {
    let identity = address_from_string("snapshotter");
    let matrix = mined_matrix(identity)?;
    let snapshot = matrix.snapshot();
    assert_eq!(snapshot.triads.len(), 5);

    let bytes = snapshot.to_bytes()?;
    let rebuilt = TriadMatrix::from_snapshot(MatrixSnapshot::from_bytes(&bytes)?, gate_for(identity)?)?;

    assert_eq!(rebuilt.snapshot(), snapshot);
    assert_eq!(rebuilt.economics(), matrix.economics());
    assert_eq!(rebuilt.genesis_id(), matrix.genesis_id());
    assert!(rebuilt.is_valid());
    Ok(())
}

#[test]
fn test_json_roundtrip_preserves_matrix() -> TestResult {
    let identity = address_from_string("snapshotter");
    let matrix = mined_matrix(identity)?;
    let snapshot = matrix.snapshot();

    let json = snapshot.to_json()?;
    let rebuilt = TriadMatrix::from_snapshot(MatrixSnapshot::from_json(&json)?, gate_for(identity)?)?;
    assert_eq!(rebuilt.snapshot(), snapshot);
    Ok(())
}

#[test]
fn test_rebuilt_matrix_keeps_mining() -> TestResult {
    let identity = address_from_string("snapshotter");
    let matrix = mined_matrix(identity)?;
    let rebuilt = TriadMatrix::from_snapshot(matrix.snapshot(), gate_for(identity)?)?;

    let child_id = rebuilt.triads_at_depth(1)[0].id;
    let receipt = Miner::new(identity, 1)?
        .mine(&rebuilt, &child_id, 0)?
        .ok_or("cancelled")?;
    assert_eq!(receipt.depth, 2);
    assert_eq!(rebuilt.economics().sealed_total(), 6);
    assert!(rebuilt.is_valid());
    Ok(())
}

#[test]
fn test_snapshot_drops_open_reservations() -> TestResult {
    let identity = address_from_string("snapshotter");
    let matrix = mined_matrix(identity)?;
    let child_id = matrix.triads_at_depth(1)[0].id;
    let job = matrix.begin_mining_job(&child_id, 2, &identity, 2)?;

    let snapshot = matrix.snapshot();
    assert!(snapshot.triads.iter().all(|t| t.id != job.triad_id));
    let parent = snapshot
        .triads
        .iter()
        .find(|t| t.id == child_id)
        .ok_or("parent missing from snapshot")?;
    assert_eq!(parent.child_slots[2], ChildSlot::Empty);

    let rebuilt = TriadMatrix::from_snapshot(snapshot, gate_for(identity)?)?;
    assert_eq!(rebuilt.outstanding_jobs(), 0);
    assert!(rebuilt.begin_mining_job(&child_id, 2, &identity, 2).is_ok());
    Ok(())
}

#[test]
fn test_tampered_nonce_rejected() -> TestResult {
    let identity = address_from_string("snapshotter");
    let mut snapshot = mined_matrix(identity)?.snapshot();
    let victim = snapshot
        .triads
        .iter_mut()
        .find(|t| t.depth == 1)
        .ok_or("no depth-1 triad")?;
    victim.nonce = victim.nonce.map(|n| n.wrapping_add(1));

    match TriadMatrix::from_snapshot(snapshot, gate_for(identity)?) {
        Err(MatrixError::InvalidSnapshot(_)) => Ok(()),
        other => panic!("Expected InvalidSnapshot, got {:?}", other),
    }
}

#[test]
fn test_tampered_transaction_rejected() -> TestResult {
    let identity = address_from_string("snapshotter");
    let mut snapshot = mined_matrix(identity)?.snapshot();
    let carrier = snapshot
        .triads
        .iter_mut()
        .find(|t| !t.transactions.is_empty())
        .ok_or("no triad with transactions")?;
    carrier.transactions[0].amount = 4_200.0;

    assert!(matches!(
        TriadMatrix::from_snapshot(snapshot, gate_for(identity)?),
        Err(MatrixError::InvalidSnapshot(_))
    ));
    Ok(())
}

#[test]
fn test_economic_count_mismatch_rejected() -> TestResult {
    let identity = address_from_string("snapshotter");
    let mut snapshot = mined_matrix(identity)?.snapshot();
    *snapshot.economics.sealed_per_depth.entry(1).or_insert(0) += 1;

    assert!(matches!(
        TriadMatrix::from_snapshot(snapshot, gate_for(identity)?),
        Err(MatrixError::InvalidSnapshot(_))
    ));
    Ok(())
}

#[test]
fn test_unknown_version_rejected() -> TestResult {
    let identity = address_from_string("snapshotter");
    let mut snapshot = mined_matrix(identity)?.snapshot();
    snapshot.version += 1;

    assert!(matches!(
        TriadMatrix::from_snapshot(snapshot, gate_for(identity)?),
        Err(MatrixError::InvalidSnapshot(_))
    ));
    Ok(())
}

#[test]
fn test_validation_is_idempotent() -> TestResult {
    let matrix = mined_matrix(address_from_string("snapshotter"))?;
    let before = matrix.snapshot();

    let first = matrix.validate();
    let second = matrix.validate();
    assert!(first.is_valid());
    assert_eq!(first, second);
    assert_eq!(matrix.snapshot(), before);
    Ok(())
}

#[test]
fn test_snapshot_during_mining_always_rebuilds() -> TestResult {
    let identity = address_from_string("busy-miner");
    let params = EconomicParams {
        tokenomics: Tokenomics::default(),
        difficulty: DifficultyEngine::new(0.001),
    };
    let matrix = TriadMatrix::with_options(gate_for(identity)?, HashScheme::Sha256, params);
    let miner = Miner::new(identity, 1)?;
    let done = AtomicBool::new(false);

    let (snapshots, mined) = thread::scope(|scope| -> Result<(u64, u64), Box<dyn std::error::Error>> {
        let mining = scope.spawn(|| {
            let result = (|| -> Result<u64, MatrixError> {
                let mut mined = 0u64;
                loop {
                    let slots: Vec<_> = matrix
                        .open_slots()
                        .into_iter()
                        .filter(|s| s.depth() <= 4)
                        .collect();
                    if slots.is_empty() {
                        return Ok(mined);
                    }
                    for open in slots {
                        if miner.mine(&matrix, &open.parent_id, open.slot)?.is_some() {
                            mined += 1;
                        }
                    }
                }
            })();
            done.store(true, Ordering::SeqCst);
            result
        });

        let mut snapshots = 0u64;
        let mut failure = None;
        while !done.load(Ordering::SeqCst) || snapshots == 0 {
            let snapshot = matrix.snapshot();
            if let Err(e) = TriadMatrix::from_snapshot(snapshot, gate_for(identity)?) {
                failure = Some(e);
                break;
            }
            snapshots += 1;
        }
        let mined = mining.join().expect("mining thread panicked");
        if let Some(e) = failure {
            return Err(e.into());
        }
        Ok((snapshots, mined?))
    })?;

    assert!(snapshots > 0);
    assert_eq!(mined, 3 + 9 + 27 + 81);
    let final_snapshot = matrix.snapshot();
    assert_eq!(final_snapshot.triads.len() as u64, mined + 1);
    TriadMatrix::from_snapshot(final_snapshot, gate_for(identity)?)?;
    Ok(())
}
