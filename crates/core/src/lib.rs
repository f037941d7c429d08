pub mod config;
pub mod error;
pub mod job;
pub mod qualification;

pub use config::Config;
pub use error::*;
pub use job::*;
pub use qualification::*;
