//! Wrapper configuration model
//!
//! A [`WrapperConfiguration`] is the persisted identity of one VIM or WIM. It is
//! created by an "add" management call, never mutated, and removed together
//! with every topology link that references it.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Capability family of a wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapperKind {
    Compute,
    Storage,
    Network,
    Wim,
}

impl WrapperKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compute => "compute",
            Self::Storage => "storage",
            Self::Network => "network",
            Self::Wim => "wim",
        }
    }
}

impl fmt::Display for WrapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WrapperKind {
    type Err = ModelError;

    /// Accepts the topic segment names (`compute`, `network`, `storage`, `wan`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compute" => Ok(Self::Compute),
            "storage" => Ok(Self::Storage),
            "network" | "networking" => Ok(Self::Network),
            "wim" | "wan" => Ok(Self::Wim),
            other => Err(ModelError::UnknownKind(other.to_string())),
        }
    }
}

/// Backend technology of a wrapper. Vendor names are only unique within a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    /// Compute mock, synthesises records without a backend
    ComputeMock,
    /// Remote service platform reached through its gatekeeper
    SonataSp,
    /// Software switch driven through the local SFC agent
    Ovs,
    /// Network mock
    NetworkMock,
    /// WAN controller (VTN flow server)
    Vtn,
    /// WIM mock
    WimMock,
}

impl Vendor {
    /// Parse a vendor name in the context of its wrapper kind
    pub fn parse(kind: WrapperKind, name: &str) -> Result<Self, ModelError> {
        let lowered = name.to_ascii_lowercase();
        let vendor = match (kind, lowered.as_str()) {
            (WrapperKind::Compute, "mock") => Some(Self::ComputeMock),
            (WrapperKind::Compute, "sp" | "spvim" | "sonata") => Some(Self::SonataSp),
            (WrapperKind::Network, "ovs") => Some(Self::Ovs),
            (WrapperKind::Network, "mock" | "networkmock") => Some(Self::NetworkMock),
            (WrapperKind::Wim, "vtn") => Some(Self::Vtn),
            (WrapperKind::Wim, "mock" | "wimmock") => Some(Self::WimMock),
            _ => None,
        };
        vendor.ok_or_else(|| ModelError::UnknownVendor {
            kind: kind.to_string(),
            vendor: name.to_string(),
        })
    }

    /// Kind this vendor belongs to
    pub fn kind(&self) -> WrapperKind {
        match self {
            Self::ComputeMock | Self::SonataSp => WrapperKind::Compute,
            Self::Ovs | Self::NetworkMock => WrapperKind::Network,
            Self::Vtn | Self::WimMock => WrapperKind::Wim,
        }
    }

    /// Name used on the wire (`vim_type`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComputeMock | Self::NetworkMock | Self::WimMock => "mock",
            Self::SonataSp => "sp",
            Self::Ovs => "ovs",
            Self::Vtn => "vtn",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted identity and credentials of one VIM or WIM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapperConfiguration {
    pub uuid: String,
    pub kind: WrapperKind,
    pub vendor: Vendor,
    pub endpoint: String,
    #[serde(default)]
    pub auth_user: String,
    #[serde(default)]
    pub auth_secret: String,
    /// Vendor-specific settings, e.g. `compute_uuid` for network wrappers
    #[serde(default)]
    pub configuration: serde_json::Value,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub domain: String,
}

impl WrapperConfiguration {
    /// Look up a string key in the vendor configuration blob
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).and_then(|v| v.as_str())
    }

    /// Parent compute VIM of a network wrapper
    pub fn compute_uuid(&self) -> Result<&str, ModelError> {
        self.setting("compute_uuid")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ModelError::MissingField("configuration.compute_uuid".to_string()))
    }
}

impl fmt::Display for WrapperConfiguration {
    // Credentials are deliberately left out
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{} '{}' @ {}",
            self.uuid, self.kind, self.vendor, self.name, self.endpoint
        )
    }
}
