#![forbid(unsafe_code)]
//! Triad Matrix simulator: mines the fractal breadth-first and prints the economy

use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use triadmatrix::commitment::{tier_for, CommitmentGate, InMemoryCommitmentLedger};
use triadmatrix::config::load_config;
use triadmatrix::crypto::{address_from_string, address_to_hex};
use triadmatrix::matrix::TriadMatrix;
use triadmatrix::miner::Miner;
use triadmatrix::transaction::TransactionNode;

#[derive(Parser, Debug)]
#[command(name = "triad-sim", about = "Mine a Triad Matrix breadth-first")]
struct Args {
    /// Path to the TOML config (defaults apply when missing)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Deposit locked by the simulated miner
    #[arg(long, default_value_t = 150.0)]
    deposit: f64,

    /// Deepest depth to mine (capped by the commitment tier)
    #[arg(long, default_value_t = 2)]
    depth: u64,

    /// Transactions embedded in every mined triad
    #[arg(long, default_value_t = 3)]
    txs: usize,

    /// Print the economic report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let config = load_config(&args.config)?;

    let identity = address_from_string(&config.miner.identity);
    let ledger = Arc::new(InMemoryCommitmentLedger::new());
    ledger.deposit(identity, args.deposit, Utc::now())?;

    let tier = tier_for(args.deposit);
    let max_depth = args.depth.min(tier.access_depth);
    println!(
        "Miner {} committed {:.2} ({} tier, access depth {}, x{:.2})",
        address_to_hex(&identity),
        args.deposit,
        tier.name,
        tier.access_depth,
        tier.multiplier
    );

    let matrix = TriadMatrix::from_config(&config, CommitmentGate::new(ledger))?;
    let miner = Miner::from_config(&config.miner)?;
    let scheme = matrix.hash_scheme();

    let start = Instant::now();
    let mut mined = 0u64;
    let mut total_reward = 0.0;

    loop {
        let slots: Vec<_> = matrix
            .open_slots()
            .into_iter()
            .filter(|open| open.depth() <= max_depth)
            .collect();
        if slots.is_empty() {
            break;
        }

        for open in slots {
            let job = matrix.begin_mining_job(&open.parent_id, open.slot, &identity, open.depth())?;
            for i in 0..args.txs {
                let tx = TransactionNode::now(
                    scheme,
                    address_from_string(&format!("sender-{}", i)),
                    address_from_string(&format!("receiver-{}", i)),
                    10.0 * (i + 1) as f64,
                    0.01,
                );
                matrix.append_transaction(&job.triad_id, tx)?;
            }
            let job = matrix.refresh_job(job.job_id)?;

            match miner.mine_job(&matrix, job)? {
                Some(receipt) => {
                    mined += 1;
                    total_reward += receipt.reward;
                    println!(
                        "  sealed {} depth {} slot {} reward {:.6}",
                        hex::encode(&receipt.triad_id[..8]),
                        receipt.depth,
                        receipt.slot,
                        receipt.reward
                    );
                }
                None => return Err("mining stopped before the matrix was filled".into()),
            }
        }
    }

    let elapsed = start.elapsed();
    let verdict = matrix.validate();
    println!(
        "\nMined {} triads ({} transactions) in {:.2}s, total reward {:.6}, matrix valid: {}",
        mined,
        matrix.transactions().len(),
        elapsed.as_secs_f64(),
        total_reward,
        verdict.is_valid()
    );

    let report = matrix.economic_report();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Supply {:.4}, burned {:.4} (tx {:.4}, depth tax {:.4})",
            report.total_supply,
            report.total_burned,
            report.transaction_burned,
            report.depth_tax_burned
        );
        for depth in &report.depths {
            println!(
                "  depth {:>2}: {}/{} units, density {:.6}, difficulty {:.2}",
                depth.depth, depth.sealed, depth.mining_units, depth.density, depth.difficulty
            );
        }
    }

    Ok(())
}
