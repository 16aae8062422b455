//! # Infrabstract Adaptor
//!
//! Routes service-platform calls onto VIM and WIM wrappers.
//!
//! ```mermaid
//! graph LR
//!     Bus[Bus bridge] -->|inbound| D[Dispatcher]
//!     D -->|spawn| P[CallProcessor]
//!     P --> B[WrapperBay]
//!     P --> FG[Decomposer]
//!     FG --> B
//!     B --> W[Wrappers]
//!     P -->|terminal response| M[Mux]
//!     H[Heartbeat] --> M
//!     M -->|outbound| Bus
//! ```
//!
//! ## Modules
//!
//! - [`routing`]: structural topic table
//! - [`dispatcher`]: worker pool and reply correlation
//! - [`processor`] / [`processors`]: one state machine per call, one handler per route
//! - [`decomposer`]: per-backend split of service chains
//! - [`lifecycle`]: adaptor core, plugin handshake and heartbeat
//! - [`bus`]: framed TCP transport
//!
//! ## Embedding
//!
//! ```rust,no_run
//! use infrabstract_adaptor::{AdaptorCore, Mux};
//! use adaptor_config::AdaptorConfig;
//! use bay::{MemoryRepository, WrapperBay};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use wrappers::WrapperFactory;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = AdaptorConfig::default();
//! let bay = Arc::new(WrapperBay::new(Arc::new(MemoryRepository::new()), WrapperFactory::default()));
//! let (mux, _outbound) = Mux::channel(config.bus.queue_capacity);
//! let (_inbound_tx, inbound) = mpsc::channel(config.bus.queue_capacity);
//!
//! let mut core = AdaptorCore::new(config, bay, Arc::new(mux));
//! core.start(inbound).await?;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod correlation;
pub mod decomposer;
pub mod dispatcher;
pub mod error;
pub mod heartbeat;
pub mod lifecycle;
pub mod mux;
pub mod processor;
pub mod processors;
pub mod routing;

pub use bus::{BusBridge, BusEnvelope, BusError};
pub use correlation::{PendingCalls, PendingReply};
pub use decomposer::{decompose, dispatch, PlacementResolver, SubRequest};
pub use dispatcher::Dispatcher;
pub use error::{CallError, CallResult};
pub use heartbeat::HeartbeatTask;
pub use lifecycle::{AdaptorCore, AdaptorState, CoreError, PluginStatus};
pub use mux::{MessageSink, Mux, SinkError};
pub use processor::{CallProcessor, ProcessorContext, ProcessorState, Reply};
pub use routing::{FunctionVerb, ManagementVerb, Route, ServiceVerb, WanVerb};
