pub mod cache;
pub mod context;
pub mod order;
pub mod projection;

use crate::buffer::BufferError;
use crate::model::task::TaskUuid;
use crate::store::StoreError;

pub use cache::{SyncCache, SyncSummary};
pub use context::{SectionContext, section_context};
pub use order::dependency_order;
pub use projection::TaskProjection;

/// Error type for cache and save operations
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error("line {}: task {uuid} is not in the store", .line + 1)]
    UnknownTask { line: usize, uuid: TaskUuid },
    #[error("dependency cycle detected between lines {}", human_lines(.lines))]
    DependencyCycle { lines: Vec<usize> },
}

/// 0-based line indices as the 1-based numbers an editor shows
fn human_lines(lines: &[usize]) -> String {
    lines
        .iter()
        .map(|l| (l + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
