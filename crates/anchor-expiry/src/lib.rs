//! Expiry sweeping and cluster-wide coordination permit (§4.F): a single
//! periodic task per node that decides, via an optimistic last-writer-wins
//! permit, whether it should sweep every registered store's expired rows
//! this tick.

mod error;
mod permit;
mod service;
mod sweep;

pub use error::{ExpiryError, ExpiryResult};
pub use permit::Coordinator;
pub use service::ExpiryService;
pub use sweep::{RegisteredStore, Sweepable};
