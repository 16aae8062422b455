//! # Bay
//!
//! Registry of live wrappers backed by a persistent VIM repository.
//!
//! One [`WrapperBay`] is built at startup and shared by `Arc` with every call
//! processor. Failure to open the repository is fatal for the adaptor.
//!
//! ```rust,no_run
//! use bay::{open_repository, WrapperBay};
//! use adaptor_config::AdaptorConfig;
//! use std::sync::Arc;
//! use wrappers::WrapperFactory;
//!
//! # async fn run(config: AdaptorConfig) -> bay::BayResult<()> {
//! let repository = open_repository(&config.repository).await?;
//! let bay = Arc::new(WrapperBay::new(
//!     repository,
//!     WrapperFactory::new(config.backends.clone(), config.segments.clone()),
//! ));
//! let computes = bay.list_compute().await?;
//! # Ok(())
//! # }
//! ```

pub mod bay;
pub mod file;
pub mod memory;
pub mod repository;

pub use bay::{BayError, BayResult, WrapperBay};
pub use file::FileRepository;
pub use memory::MemoryRepository;
pub use repository::{
    PlacementKind, PlacementRecord, RepositoryError, RepositoryResult, RepositoryState,
    ServiceInstanceRecord, TopologyLink, VimRepository, WimAttachment,
};

use adaptor_config::{RepositoryBackend, RepositoryConfig};
use std::sync::Arc;

/// Build the repository selected by configuration
pub async fn open_repository(config: &RepositoryConfig) -> RepositoryResult<Arc<dyn VimRepository>> {
    match config.backend {
        RepositoryBackend::Memory => Ok(Arc::new(MemoryRepository::new())),
        RepositoryBackend::File => Ok(Arc::new(FileRepository::open(&config.path).await?)),
    }
}
