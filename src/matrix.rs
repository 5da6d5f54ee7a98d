// Thin re-export module: the ledger itself lives in `matrix/ledger.rs`, with
// economic counters, mining jobs, validation and snapshots split out beside it.

pub mod job;
pub mod ledger;
pub mod snapshot;
pub mod state;
pub mod validation;

pub use job::*;
pub use ledger::*;
pub use snapshot::*;
pub use state::*;
pub use validation::*;
