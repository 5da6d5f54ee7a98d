use crate::commitment::CommitmentGate;
use crate::config::Config;
use crate::crypto::{Address, HashScheme, Secp256k1Scheme, SignatureScheme};
use crate::economics::EconomicParams;
use crate::error::{MatrixError, Result};
use crate::matrix::job::{MiningJob, MiningReceipt, OpenSlot};
use crate::matrix::state::{EconomicReport, EconomicState};
use crate::matrix::validation::{validate_triads, ValidationReport};
use crate::transaction::TransactionNode;
use crate::triad::{ChildSlot, Triad, TriadId, CHILD_SLOTS};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Arena slot: each triad carries its own mutation lock.
pub(crate) type Entry = Arc<Mutex<Triad>>;

/// The branching ledger rooted at a pre-sealed genesis triad.
///
/// Triads live in an id-indexed arena. Parents own their children through
/// slot ids and children refer back to parents by id only. Mutations lock
/// the entries they touch, in parent-then-child order, so mining under
/// different parents or different slots never contends beyond the
/// reservation step. Seals share the commit lock; consistent reads such as
/// snapshots take it exclusively.
pub struct TriadMatrix {
    pub(crate) scheme: HashScheme,
    pub(crate) params: EconomicParams,
    pub(crate) genesis_id: TriadId,
    pub(crate) index: RwLock<HashMap<TriadId, Entry>>,
    pub(crate) economics: Mutex<EconomicState>,
    commit: RwLock<()>,
    signatures: Arc<dyn SignatureScheme>,
    gate: CommitmentGate,
    jobs: Mutex<HashMap<u64, MiningJob>>,
    next_job_id: AtomicU64,
}

impl fmt::Debug for TriadMatrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TriadMatrix")
            .field("scheme", &self.scheme)
            .field("genesis_id", &hex::encode(self.genesis_id))
            .field("triads", &self.len())
            .finish_non_exhaustive()
    }
}

impl TriadMatrix {
    /// Creates a matrix with SHA-256 headers and the default economics.
    pub fn new(gate: CommitmentGate) -> Self {
        Self::with_options(gate, HashScheme::default(), EconomicParams::default())
    }

    pub fn with_options(gate: CommitmentGate, scheme: HashScheme, params: EconomicParams) -> Self {
        let genesis = Triad::genesis(scheme);
        let genesis_id = genesis.id;
        let index = HashMap::from([(genesis_id, Arc::new(Mutex::new(genesis)))]);
        info!(
            "Created triad matrix (hash = {}, genesis = {})",
            scheme,
            hex::encode(genesis_id)
        );
        let economics = EconomicState::genesis(&params.tokenomics);
        Self::assemble(gate, scheme, params, genesis_id, index, economics)
    }

    pub fn from_config(config: &Config, gate: CommitmentGate) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_options(gate, config.hashing.scheme, config.economic_params()))
    }

    pub(crate) fn assemble(
        gate: CommitmentGate,
        scheme: HashScheme,
        params: EconomicParams,
        genesis_id: TriadId,
        index: HashMap<TriadId, Entry>,
        economics: EconomicState,
    ) -> Self {
        TriadMatrix {
            scheme,
            params,
            genesis_id,
            index: RwLock::new(index),
            economics: Mutex::new(economics),
            commit: RwLock::new(()),
            signatures: Arc::new(Secp256k1Scheme),
            gate,
            jobs: Mutex::new(HashMap::new()),
            next_job_id: AtomicU64::new(1),
        }
    }

    /// Replaces the scheme used to authenticate signed transactions.
    pub fn with_signature_scheme(mut self, signatures: Arc<dyn SignatureScheme>) -> Self {
        self.signatures = signatures;
        self
    }

    pub fn genesis_id(&self) -> TriadId {
        self.genesis_id
    }

    pub fn hash_scheme(&self) -> HashScheme {
        self.scheme
    }

    pub fn params(&self) -> &EconomicParams {
        &self.params
    }

    pub fn gate(&self) -> &CommitmentGate {
        &self.gate
    }

    /// Number of triads, open ones included.
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn triad(&self, id: &TriadId) -> Option<Triad> {
        let entry = self.entry(id).ok()?;
        let triad = entry.lock();
        Some(triad.clone())
    }

    pub fn outstanding_jobs(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn job(&self, job_id: u64) -> Option<MiningJob> {
        self.jobs.lock().get(&job_id).cloned()
    }

    fn entry(&self, id: &TriadId) -> Result<Entry> {
        self.index
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| MatrixError::TriadNotFound(hex::encode(id)))
    }

    /// All arena entries, collected so no index lock is held while the
    /// caller locks individual triads.
    pub(crate) fn entries(&self) -> Vec<Entry> {
        self.index.read().values().cloned().collect()
    }

    fn sealed_triads(&self) -> HashMap<TriadId, Triad> {
        self.entries()
            .into_iter()
            .filter_map(|entry| {
                let triad = entry.lock();
                if triad.is_sealed() {
                    Some((triad.id, triad.clone()))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Sealed triads and economic counters as of one instant: no seal is in
    /// progress while they are read.
    pub(crate) fn sealed_view(&self) -> (HashMap<TriadId, Triad>, EconomicState) {
        let _commit = self.commit.write();
        let economics = self.economics.lock().clone();
        (self.sealed_triads(), economics)
    }

    /// Appends a transaction to an open triad, returning its position.
    pub fn append_transaction(&self, triad_id: &TriadId, tx: TransactionNode) -> Result<usize> {
        let entry = self.entry(triad_id)?;
        let mut triad = entry.lock();
        if triad.is_sealed() {
            return Err(MatrixError::TriadSealed(hex::encode(triad_id)));
        }
        tx.validate(self.scheme, self.signatures.as_ref())?;

        debug!(
            "Appended transaction {} to open triad {}",
            tx.hash_str(),
            triad.id_str()
        );
        triad.transactions.push(tx);
        Ok(triad.transactions.len() - 1)
    }

    /// Reserves `slot` under `parent_id` for `identity` and returns the work
    /// to solve. The open child triad is created under a provisional id and
    /// accepts transactions until the job is solved or abandoned.
    pub fn begin_mining_job(
        &self,
        parent_id: &TriadId,
        slot: u8,
        identity: &Address,
        requested_depth: u64,
    ) -> Result<MiningJob> {
        let parent_entry = self.entry(parent_id)?;
        if slot as usize >= CHILD_SLOTS {
            return Err(MatrixError::InvalidSlot(slot));
        }

        let parent_depth = parent_entry.lock().depth;
        let expected = parent_depth + 1;
        if requested_depth != expected {
            return Err(MatrixError::InvalidDepth {
                expected,
                requested: requested_depth,
            });
        }

        let grant = self.gate.can_mine_at_depth(identity, requested_depth)?;

        let mut parent = parent_entry.lock();
        if !parent.is_sealed() {
            return Err(MatrixError::ParentNotSealed(hex::encode(parent_id)));
        }
        if !parent.child_slots[slot as usize].is_empty() {
            return Err(MatrixError::SlotOccupied {
                parent: hex::encode(parent_id),
                slot,
            });
        }

        let job_id = self.next_job_id.fetch_add(1, Ordering::SeqCst);
        let triad_id = self.provisional_id(parent_id, slot, job_id);
        let open = Triad::open(
            triad_id,
            Some(*parent_id),
            requested_depth,
            slot,
            chrono::Utc::now().timestamp_millis(),
        );
        let header = open.header(self.scheme, 0);

        self.index
            .write()
            .insert(triad_id, Arc::new(Mutex::new(open)));
        parent.child_slots[slot as usize] = ChildSlot::Reserved { job_id, triad_id };

        let difficulty = self.params.difficulty.difficulty(requested_depth);
        let job = MiningJob {
            job_id,
            parent_id: *parent_id,
            slot,
            triad_id,
            depth: requested_depth,
            grant,
            hash_scheme: self.scheme,
            header,
            difficulty,
            target: self.params.difficulty.target(requested_depth),
        };
        self.jobs.lock().insert(job_id, job.clone());

        info!(
            "Job {} reserved slot {} under {} at depth {} (difficulty {:.2}, tier {})",
            job_id,
            slot,
            hex::encode(parent_id),
            requested_depth,
            difficulty,
            grant.tier.name
        );
        Ok(job)
    }

    fn provisional_id(&self, parent_id: &TriadId, slot: u8, job_id: u64) -> TriadId {
        let mut data = Vec::with_capacity(4 + 32 + 1 + 8);
        data.extend_from_slice(b"open");
        data.extend_from_slice(parent_id);
        data.push(slot);
        data.extend_from_slice(&job_id.to_le_bytes());
        self.scheme.digest(&data)
    }

    /// Re-issues a job's header template from the open triad's current
    /// transactions.
    pub fn refresh_job(&self, job_id: u64) -> Result<MiningJob> {
        let triad_id = self
            .jobs
            .lock()
            .get(&job_id)
            .map(|job| job.triad_id)
            .ok_or(MatrixError::JobNotFound(job_id))?;
        let header = {
            let entry = self.entry(&triad_id)?;
            let triad = entry.lock();
            triad.header(self.scheme, 0)
        };

        let mut jobs = self.jobs.lock();
        let job = jobs.get_mut(&job_id).ok_or(MatrixError::JobNotFound(job_id))?;
        job.header = header;
        Ok(job.clone())
    }

    /// Releases a job's reservation and discards its open triad. Fails with
    /// `SlotOccupied` when the job was sealed first.
    pub fn abandon_job(&self, job_id: u64) -> Result<()> {
        let job = self.job(job_id).ok_or(MatrixError::JobNotFound(job_id))?;

        let parent_entry = self.entry(&job.parent_id)?;
        let mut parent = parent_entry.lock();
        match parent.child_slots[job.slot as usize] {
            ChildSlot::Reserved { job_id: held, .. } if held == job_id => {}
            ChildSlot::Occupied(_) => {
                return Err(MatrixError::SlotOccupied {
                    parent: hex::encode(job.parent_id),
                    slot: job.slot,
                })
            }
            _ => return Err(MatrixError::JobNotFound(job_id)),
        }

        parent.child_slots[job.slot as usize] = ChildSlot::Empty;
        self.jobs.lock().remove(&job_id);
        self.index.write().remove(&job.triad_id);

        info!("Job {} abandoned, slot {} released", job_id, job.slot);
        Ok(())
    }

    /// Checks `nonce` against the reserved triad's current header and, if it
    /// meets the target, seals the triad into its slot and applies burns and
    /// reward. A rejected nonce leaves the reservation in place.
    pub fn submit_solution(&self, job_id: u64, nonce: u64) -> Result<MiningReceipt> {
        let job = self
            .jobs
            .lock()
            .get(&job_id)
            .cloned()
            .ok_or(MatrixError::JobNotFound(job_id))?;

        let _commit = self.commit.read();
        let parent_entry = self.entry(&job.parent_id)?;
        let mut parent = parent_entry.lock();
        let reserved = matches!(
            parent.child_slots[job.slot as usize],
            ChildSlot::Reserved { job_id: held, .. } if held == job_id
        );
        if !reserved {
            return Err(MatrixError::SlotOccupied {
                parent: hex::encode(job.parent_id),
                slot: job.slot,
            });
        }

        let child_entry = self.entry(&job.triad_id)?;
        let mut child = child_entry.lock();
        let hash = child.header(self.scheme, nonce).hash(self.scheme);
        if !self.params.difficulty.target(child.depth).is_met_by(&hash) {
            debug!("Job {} nonce {} rejected", job_id, nonce);
            return Err(MatrixError::DifficultyNotMet { depth: child.depth });
        }

        let depth = child.depth;
        let miner = *job.identity();
        let reward_bound = self.params.tokenomics.density_bounded(depth);
        if reward_bound.clamped {
            warn!("Density at depth {} clamped to zero", depth);
        }
        let reward = reward_bound.value * job.grant.multiplier();
        let amounts: Vec<f64> = child.transactions.iter().map(|tx| tx.amount).collect();

        let effects = {
            let mut economics = self.economics.lock();
            let effects =
                economics.apply_seal(&self.params.tokenomics, depth, &amounts, reward, &miner);
            if effects.supply_clamped {
                warn!(
                    "Aggregate supply clamped to zero at depth {} ({:.6} left unburned)",
                    depth, effects.unburned
                );
            }
            effects
        };

        child.seal(nonce, hash, miner, reward);
        {
            let mut index = self.index.write();
            index.remove(&job.triad_id);
            index.insert(hash, child_entry.clone());
        }
        parent.child_slots[job.slot as usize] = ChildSlot::Occupied(hash);
        self.jobs.lock().remove(&job_id);

        info!(
            "Sealed triad {} at depth {} slot {} ({} txs, reward {:.8}, burned {:.6})",
            hex::encode(hash),
            depth,
            job.slot,
            child.transactions.len(),
            reward,
            effects.transaction_burn + effects.depth_tax
        );

        Ok(MiningReceipt {
            triad_id: hash,
            parent_id: job.parent_id,
            slot: job.slot,
            depth,
            nonce,
            miner,
            reward,
            transaction_burn: effects.transaction_burn,
            depth_tax: effects.depth_tax,
        })
    }

    /// Recomputes every sealed triad from its header fields. Read-only.
    pub fn validate(&self) -> ValidationReport {
        let (triads, _) = self.sealed_view();
        let report = validate_triads(self.scheme, &self.params, &self.genesis_id, &triads);
        if !report.is_valid() {
            warn!("Matrix validation found {} issues", report.issues.len());
        }
        report
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_valid()
    }

    pub fn economics(&self) -> EconomicState {
        self.economics.lock().clone()
    }

    pub fn economic_report(&self) -> EconomicReport {
        self.economics.lock().report(&self.params)
    }

    /// Sealed triads at `depth`, ordered by id.
    pub fn triads_at_depth(&self, depth: u64) -> Vec<Triad> {
        let mut triads: Vec<Triad> = self
            .sealed_triads()
            .into_values()
            .filter(|t| t.depth == depth)
            .collect();
        triads.sort_by(|a, b| a.id.cmp(&b.id));
        triads
    }

    /// Empty child slots under sealed triads, shallowest first. These are
    /// the positions a new mining job may reserve.
    pub fn open_slots(&self) -> Vec<OpenSlot> {
        let mut slots: Vec<OpenSlot> = self
            .sealed_triads()
            .into_values()
            .flat_map(|triad| {
                let parent_id = triad.id;
                let parent_depth = triad.depth;
                triad
                    .child_slots
                    .into_iter()
                    .enumerate()
                    .filter(|(_, state)| state.is_empty())
                    .map(move |(slot, _)| OpenSlot {
                        parent_id,
                        parent_depth,
                        slot: slot as u8,
                    })
            })
            .collect();
        slots.sort_by(|a, b| {
            a.parent_depth
                .cmp(&b.parent_depth)
                .then_with(|| a.parent_id.cmp(&b.parent_id))
                .then_with(|| a.slot.cmp(&b.slot))
        });
        slots
    }

    /// Every transaction held by a sealed triad, paired with that triad's id.
    /// Triads are visited by depth, then id; each triad's transactions keep
    /// their order.
    pub fn transactions(&self) -> Vec<(TriadId, TransactionNode)> {
        let mut triads: Vec<Triad> = self.sealed_triads().into_values().collect();
        triads.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.id.cmp(&b.id)));
        triads
            .into_iter()
            .flat_map(|triad| {
                let id = triad.id;
                triad.transactions.into_iter().map(move |tx| (id, tx))
            })
            .collect()
    }
}
