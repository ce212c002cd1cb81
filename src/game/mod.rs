//! Game simulation modules

pub mod ai;
pub mod combat;
pub mod fighter;
pub mod input;
pub mod r#match;
pub mod session;
pub mod sync;

pub use fighter::Fighter;
pub use r#match::{MatchPhase, MatchSim};
pub use session::NetplaySession;
