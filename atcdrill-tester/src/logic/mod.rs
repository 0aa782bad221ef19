pub mod drill_tester;
pub mod reports;
pub mod seeds;
pub mod tester;

pub use drill_tester::{DrillPlan, DrillSummary};
pub use seeds::{SeedInfo, resolve_seed_inputs};
pub use tester::*;
