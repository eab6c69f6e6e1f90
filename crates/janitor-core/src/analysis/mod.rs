pub mod batch;
pub mod rules;

pub use batch::{analyze_pending, AnalysisSummary};
pub use rules::RuleSet;
