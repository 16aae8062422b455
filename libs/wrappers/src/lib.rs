//! # Wrappers
//!
//! Capability contracts and drivers for the backends the adaptor manages.
//!
//! ## Drivers
//!
//! | Kind    | Vendor | Transport                                   |
//! |---------|--------|---------------------------------------------|
//! | compute | `mock` | none, records are synthesised               |
//! | compute | `sp`   | HTTP to a remote gatekeeper, polled         |
//! | network | `mock` | none, calls land in a [`CallJournal`]       |
//! | network | `ovs`  | framed JSON over TCP to the SFC agent       |
//! | wim     | `mock` | none, calls land in a [`CallJournal`]       |
//! | wim     | `vtn`  | HTTP to the VTN flow server                 |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wrappers::WrapperFactory;
//! use types::{Vendor, WrapperConfiguration, WrapperKind};
//!
//! # async fn run(config: WrapperConfiguration) -> wrappers::Result<()> {
//! let factory = WrapperFactory::default();
//! let wrapper = factory.create(&config)?;
//! if let Some(compute) = wrapper.as_compute() {
//!     let usage = compute.resource_utilisation().await?;
//!     println!("{} cores in use", usage.used_cores);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod error;
pub mod factory;
pub mod framing;
pub mod mock;
pub mod ovs;
pub mod sp;
pub mod traits;
pub mod vtn;

pub use backoff::{Backoff, PollStatus};
pub use error::{Result, WrapperError};
pub use factory::WrapperFactory;
pub use mock::{CallJournal, ComputeMock, MockCall, NetworkMock, WimMock};
pub use ovs::{resolve_port_list, OrderedPort, OvsRequest, OvsWrapper};
pub use sp::SonataSpWrapper;
pub use traits::{ComputeWrapper, NetworkWrapper, PreparedService, WimWrapper, Wrapper};
pub use vtn::{instance_digest, VtnWrapper};
