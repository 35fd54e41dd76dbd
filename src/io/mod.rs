pub mod config_io;
pub mod wiki_file;
