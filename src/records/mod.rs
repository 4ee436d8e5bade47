//! Records subsystem
//!
//! Records are rows with identity. Objects are argument trees of rows.
//! A `Cud` collects the creations and updates an event carries; the
//! `Records` store materializes them.

mod cud;
mod errors;
mod object;
mod record;
mod store;

pub use cud::{Cud, UpdateRec};
pub use errors::{RecordsError, RecordsResult};
pub use object::Object;
pub use record::Record;
pub use store::Records;
