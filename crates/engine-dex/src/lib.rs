pub mod chain;
pub mod router;

pub use chain::SimulatedChain;
pub use router::SimulatedRouter;
