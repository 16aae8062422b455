//! # Infrabstract Types Library
//!
//! Shared data model of the infrastructure adaptor: the bus envelope, wrapper
//! configurations, descriptor/record models and API payloads.
//!
//! ## Design Philosophy
//!
//! - **Wire fidelity**: every struct serialises to the field names used on the bus
//! - **Lenient reads**: unknown fields are ignored, absent collections default to empty
//! - **No I/O**: this crate only describes data; drivers and registries live elsewhere
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{ApiResponse, ContentType, ServicePlatformMessage};
//!
//! let request = ServicePlatformMessage::new(
//!     "infrastructure.management.compute.remove",
//!     "sid-1",
//!     Some("infrastructure.management.compute.remove".to_string()),
//!     ContentType::Json,
//!     r#"{"uuid":"abc"}"#,
//! );
//! let response = request
//!     .respond_with(ContentType::Json, &ApiResponse::completed())
//!     .unwrap();
//! assert_eq!(response.sid(), "sid-1");
//! ```

pub mod descriptors;
pub mod error;
pub mod message;
pub mod payloads;
pub mod wrapper;

pub use descriptors::{
    ConnectionPoint, ConnectionPointRecord, ConnectionPointReference, CpTarget, ForwardingGraph,
    InterfaceRecord, NetworkForwardingPath, NetworkFunction, ServiceDescriptor, VduRecord,
    VirtualDeploymentUnit, VnfDescriptor, VnfRecord, VnfVirtualLink, VnfcInstance,
};
pub use error::{CodecError, ModelError};
pub use message::{decode_body, encode_body, new_sid, ContentType, ServicePlatformMessage};
pub use payloads::*;
pub use wrapper::{Vendor, WrapperConfiguration, WrapperKind};
