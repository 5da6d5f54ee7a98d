//! Proof-of-work search over triad headers
//!
//! A [`Miner`] splits the nonce space into strided partitions, one per
//! worker thread, and stops every worker as soon as one of them finds a
//! hash under the job's target or the search is cancelled. The search
//! itself never touches the matrix; only the final submit does.

use crate::config::MinerConfig;
use crate::crypto::{address_from_string, Address, Digest};
use crate::error::{MatrixError, Result};
use crate::matrix::{MiningJob, MiningReceipt, TriadMatrix};
use crate::triad::TriadId;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared flag that stops a running search.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found {
        nonce: u64,
        hash: Digest,
        attempts: u64,
    },
    Cancelled {
        attempts: u64,
    },
    /// Every nonce was tried without success
    Exhausted {
        attempts: u64,
    },
}

impl SearchOutcome {
    pub fn attempts(&self) -> u64 {
        match self {
            SearchOutcome::Found { attempts, .. }
            | SearchOutcome::Cancelled { attempts }
            | SearchOutcome::Exhausted { attempts } => *attempts,
        }
    }
}

pub struct Miner {
    identity: Address,
    workers: usize,
    max_refreshes: u32,
    start_nonce: Option<u64>,
    cancel: CancellationToken,
    pool: Arc<ThreadPool>,
}

impl Miner {
    pub fn new(identity: Address, workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("triad-miner-{}", i))
            .build()
            .map_err(|e| MatrixError::ConfigError(format!("Failed to build miner pool: {}", e)))?;

        Ok(Miner {
            identity,
            workers,
            max_refreshes: 3,
            start_nonce: None,
            cancel: CancellationToken::new(),
            pool: Arc::new(pool),
        })
    }

    pub fn from_config(config: &MinerConfig) -> Result<Self> {
        let miner = Self::new(address_from_string(&config.identity), config.workers)?;
        Ok(miner.with_max_refreshes(config.max_refreshes))
    }

    /// Starts every search at `nonce` instead of a random offset.
    pub fn with_start_nonce(mut self, nonce: u64) -> Self {
        self.start_nonce = Some(nonce);
        self
    }

    pub fn with_max_refreshes(mut self, max_refreshes: u32) -> Self {
        self.max_refreshes = max_refreshes;
        self
    }

    pub fn identity(&self) -> &Address {
        &self.identity
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Token that cancels the current and any later search until `restart`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Installs a fresh token so a cancelled miner can take new jobs.
    pub fn restart(&mut self) -> CancellationToken {
        self.cancel = CancellationToken::new();
        self.cancel.clone()
    }

    /// Searches for a nonce meeting the job's target.
    pub fn search(&self, job: &MiningJob) -> SearchOutcome {
        let start = self.start_nonce.unwrap_or_else(rand::random);
        let stride = self.workers as u64;
        let per_worker = u64::MAX / stride;
        let prefix = job.prefix();
        let attempts = AtomicU64::new(0);
        let found = AtomicBool::new(false);
        let cancel = &self.cancel;

        let hit = self.pool.install(|| {
            (0..stride).into_par_iter().find_map_any(|worker| {
                let mut data = prefix.clone();
                let base_len = data.len();
                let mut nonce = start.wrapping_add(worker);
                for _ in 0..=per_worker {
                    if found.load(Ordering::Relaxed) || cancel.is_cancelled() {
                        return None;
                    }
                    data.truncate(base_len);
                    data.extend_from_slice(&nonce.to_le_bytes());
                    let hash = job.hash_scheme.digest(&data);
                    attempts.fetch_add(1, Ordering::Relaxed);
                    if job.target.is_met_by(&hash) {
                        found.store(true, Ordering::Relaxed);
                        return Some((nonce, hash));
                    }
                    nonce = nonce.wrapping_add(stride);
                }
                None
            })
        });

        let attempts = attempts.load(Ordering::Relaxed);
        match hit {
            Some((nonce, hash)) => SearchOutcome::Found {
                nonce,
                hash,
                attempts,
            },
            None if cancel.is_cancelled() => SearchOutcome::Cancelled { attempts },
            None => SearchOutcome::Exhausted { attempts },
        }
    }

    /// Reserves `slot` under `parent_id` one level deeper and mines it.
    /// Returns `Ok(None)` when the search was cancelled.
    pub fn mine(
        &self,
        matrix: &TriadMatrix,
        parent_id: &TriadId,
        slot: u8,
    ) -> Result<Option<MiningReceipt>> {
        let parent = matrix
            .triad(parent_id)
            .ok_or_else(|| MatrixError::TriadNotFound(hex::encode(parent_id)))?;
        let job = matrix.begin_mining_job(parent_id, slot, &self.identity, parent.depth + 1)?;
        self.mine_job(matrix, job)
    }

    /// Searches and submits an already issued job. A rejected nonce means
    /// transactions arrived after the template was issued, so the template
    /// is refreshed and the search repeated, up to `max_refreshes` times.
    /// Cancellation abandons the job and releases its slot.
    pub fn mine_job(&self, matrix: &TriadMatrix, job: MiningJob) -> Result<Option<MiningReceipt>> {
        let mut job = job;
        let mut refreshes = 0;
        loop {
            match self.search(&job) {
                SearchOutcome::Found {
                    nonce, attempts, ..
                } => {
                    debug!(
                        "Job {} found nonce {} after {} attempts",
                        job.job_id, nonce, attempts
                    );
                    match matrix.submit_solution(job.job_id, nonce) {
                        Ok(receipt) => return Ok(Some(receipt)),
                        Err(MatrixError::DifficultyNotMet { depth }) => {
                            if refreshes >= self.max_refreshes {
                                return Err(MatrixError::DifficultyNotMet { depth });
                            }
                            refreshes += 1;
                            warn!("Job {} template went stale, refreshing", job.job_id);
                            job = matrix.refresh_job(job.job_id)?;
                        }
                        Err(e) => return Err(e),
                    }
                }
                SearchOutcome::Cancelled { attempts } => {
                    info!(
                        "Job {} cancelled after {} attempts",
                        job.job_id, attempts
                    );
                    matrix.abandon_job(job.job_id)?;
                    return Ok(None);
                }
                SearchOutcome::Exhausted { attempts } => {
                    warn!(
                        "Job {} exhausted the nonce space after {} attempts",
                        job.job_id, attempts
                    );
                    matrix.abandon_job(job.job_id)?;
                    return Ok(None);
                }
            }
        }
    }
}
