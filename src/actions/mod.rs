//! Acting on a resolved run.
//!
//! - [`delete`]: trash or permanently remove the deletion set
//! - [`confirm`]: the interactive yes/no gate in front of it

pub mod confirm;
pub mod delete;
