//! Transfer errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CopyError {
    #[error("Source path does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("transfer cancelled")]
    Cancelled,

    #[error("destination {} is inside source {}", .destination.display(), .source_dir.display())]
    DestinationInsideSource {
        source_dir: PathBuf,
        destination: PathBuf,
    },

    #[error("destination {} is the source itself", .0.display())]
    DestinationIsSource(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl CopyError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        CopyError::Io {
            context: context.into(),
            source,
        }
    }

    /// Cleanup on failure is skipped when there is nothing of ours to remove.
    pub fn wrote_nothing(&self) -> bool {
        matches!(
            self,
            CopyError::SourceMissing(_)
                | CopyError::DestinationInsideSource { .. }
                | CopyError::DestinationIsSource(_)
        )
    }
}
