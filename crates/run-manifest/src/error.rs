use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("manifest {} is not a JSON object of run timestamps", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode manifest")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write manifest {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to scan run directories under {}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
