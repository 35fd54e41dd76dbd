pub mod ansi;
pub mod heading_parser;
pub mod line_parser;
pub mod line_serializer;

pub use ansi::strip_control_sequences;
pub use heading_parser::{parse_project_line, parse_viewport};
pub use line_parser::{parse_task_line, parse_wiki_line};
pub use line_serializer::{serialize_project_line, serialize_task_line, serialize_viewport};
