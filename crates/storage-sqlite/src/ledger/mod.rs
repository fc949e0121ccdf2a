mod model;
mod repository;

pub use model::{AccountProjectionDB, LedgerEventDB};
pub use repository::LedgerRepository;
