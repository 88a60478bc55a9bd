pub mod config;
pub mod error;
pub mod flock;
pub mod lsm;

pub use config::Config;
pub use error::{Error, Result};
pub use lsm::{Entry, LsmStore, Stats};
