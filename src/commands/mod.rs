//! CLI commands implementation

pub mod backfill;
pub mod dump;
pub mod init;
pub mod sync;

pub use backfill::*;
pub use dump::*;
pub use init::*;
pub use sync::*;
