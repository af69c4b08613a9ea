//! CLI command implementations

pub mod config;
pub mod load;
pub mod resolve;
pub mod watch;

pub use config::execute as config;
pub use load::execute as load;
pub use resolve::execute as resolve;
pub use watch::execute as watch;
