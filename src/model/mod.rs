pub mod config;
pub mod line;
pub mod task;

pub use config::*;
pub use line::*;
pub use task::*;
