pub mod buffer;
pub mod cli;
pub mod io;
pub mod model;
pub mod parse;
pub mod store;
pub mod sync;
