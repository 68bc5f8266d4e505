//! Reward Core - Submission Lifecycle Domain
//!
//! Domain model for campaign-based content rewards settled in tokens:
//!
//! - **Campaigns**: reward programs with engagement thresholds and a fixed
//!   per-winner reward
//! - **Submissions**: one claim per content item, carrying a metrics snapshot
//!   and a lifecycle status
//! - **Eligibility**: a pure threshold comparison
//! - **Amounts**: decimal token units to 18-decimal base units and back
//!
//! # Submission State Machine
//!
//! | From       | Lifecycle targets     | Operator override           |
//! |------------|-----------------------|-----------------------------|
//! | `pending`  | `eligible`,`rejected` | any except `paid`           |
//! | `eligible` | `winner`,`paid`       | any except `paid`           |
//! | `winner`   | `paid`                | any except `paid`           |
//! | `paid`     | none                  | none                        |
//! | `rejected` | none                  | none                        |
//!
//! Creation always lands in `eligible` or `rejected`. Only a confirmed
//! settlement moves a submission to `paid`.

pub mod address;
pub mod amount;
pub mod content;
pub mod eligibility;
pub mod error;
pub mod types;

pub use address::{normalize_address, validate_address};
pub use amount::{
    format_units, parse_base_units, to_base_units, Uint256, DISPLAY_DECIMALS, TOKEN_DECIMALS,
};
pub use content::{extract_content_id, require_content_id};
pub use eligibility::{evaluate, verdict_message};
pub use error::{CoreError, CoreResult};
pub use types::*;
