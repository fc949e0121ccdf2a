//! Positions and the set of accounts worth sampling.

mod model;
mod repository;

pub use model::PositionDB;
pub use repository::HoldingsRepository;
