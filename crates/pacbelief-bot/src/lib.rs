pub mod moves;
pub mod policy;

pub use moves::{Direction, legal_moves};
pub use policy::{Policy, PolicyContext, PursuitPolicy};
