//! Domain types

pub mod campaign;
pub mod metrics;
pub mod payout;
pub mod session;
pub mod submission;

pub use campaign::*;
pub use metrics::*;
pub use payout::*;
pub use session::*;
pub use submission::*;
