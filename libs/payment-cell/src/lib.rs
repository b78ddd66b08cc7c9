pub mod amount;
pub mod handlers;
pub mod models;
pub mod order_id;
pub mod router;
pub mod services;
pub mod signature;
pub mod store;

pub use models::*;
pub use order_id::OrderId;
pub use router::PaymentCellState;
pub use signature::PayHereSigner;
pub use store::PaymentStore;
