pub mod reachability;

pub use reachability::{explore, ReachabilityReport, StateGraph};
