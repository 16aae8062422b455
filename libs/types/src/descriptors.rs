//! Descriptor and record models
//!
//! Typed views of the network-service descriptor (NSD), function descriptors
//! (VNFD) and the records produced when functions are deployed (VNFR). Only the
//! fields the adaptor reads are modelled; anything else in the incoming
//! documents is ignored on decode.
//!
//! ```text
//! ServiceDescriptor
//!   ├─ network_functions[]      vnf_id → vnf_name
//!   ├─ connection_points[]
//!   └─ forwarding_graphs[]
//!        └─ network_forwarding_paths[]
//!             └─ connection_points[]   "vnf_id:cp" + position
//!
//! VnfDescriptor (by name)           VnfRecord (by descriptor_reference)
//!   └─ virtual_links[]                └─ virtual_deployment_units[]
//!        └─ connection_points_reference     └─ vnfc_instance[]
//!                                                └─ connection_points[] → MAC
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Network service descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_functions: Vec<NetworkFunction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connection_points: Vec<ConnectionPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forwarding_graphs: Vec<ForwardingGraph>,
}

/// Function entry of a service descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFunction {
    pub vnf_id: String,
    pub vnf_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnf_vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnf_version: Option<String>,
}

/// Connection point declared by a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPoint {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub cp_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardingGraph {
    pub fg_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_endpoints: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_virtual_links: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constituent_virtual_links: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constituent_vnfs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_forwarding_paths: Vec<NetworkForwardingPath>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkForwardingPath {
    pub fp_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connection_points: Vec<ConnectionPointReference>,
}

/// Ordered hop of a forwarding path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPointReference {
    pub connection_point_ref: String,
    #[serde(rename = "position")]
    pub order: i32,
}

impl ConnectionPointReference {
    pub fn new(connection_point_ref: impl Into<String>, order: i32) -> Self {
        Self {
            connection_point_ref: connection_point_ref.into(),
            order,
        }
    }

    pub fn target(&self) -> CpTarget<'_> {
        CpTarget::parse(&self.connection_point_ref)
    }
}

/// Parsed form of a connection-point reference string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpTarget<'a> {
    /// Bare `vnf_id`, structural only
    Placeholder(&'a str),
    /// `vnf_id:cp_name`
    Qualified { vnf_id: &'a str, cp: &'a str },
    Malformed,
}

impl<'a> CpTarget<'a> {
    pub fn parse(reference: &'a str) -> Self {
        let mut parts = reference.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(vnf_id), None, None) if !vnf_id.is_empty() => Self::Placeholder(vnf_id),
            (Some(vnf_id), Some(cp), None) if !vnf_id.is_empty() && !cp.is_empty() => {
                Self::Qualified { vnf_id, cp }
            }
            _ => Self::Malformed,
        }
    }
}

impl fmt::Display for ConnectionPointReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.connection_point_ref, self.order)
    }
}

/// Virtual network function descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VnfDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_uuid: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_deployment_units: Vec<VirtualDeploymentUnit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_links: Vec<VnfVirtualLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connection_points: Vec<ConnectionPoint>,
}

impl VnfDescriptor {
    /// Key records are matched on: the descriptor uuid, else its name
    pub fn reference(&self) -> &str {
        self.uuid.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualDeploymentUnit {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_image_md5: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_requirements: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connection_points: Vec<ConnectionPoint>,
}

/// Internal link of a function, joining external and VDU connection points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VnfVirtualLink {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectivity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connection_points_reference: Vec<String>,
}

/// Virtual network function record, as produced by a compute deploy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VnfRecord {
    pub id: String,
    pub descriptor_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_deployment_units: Vec<VduRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VduRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_instances: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vdu_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vnfc_instance: Vec<VnfcInstance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VnfcInstance {
    pub id: String,
    #[serde(default)]
    pub vim_id: String,
    #[serde(default)]
    pub vc_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connection_points: Vec<ConnectionPointRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPointRecord {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub cp_type: Option<String>,
    #[serde(default)]
    pub interface: InterfaceRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netmask: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cp_reference_forms() {
        assert_eq!(CpTarget::parse("vnf1"), CpTarget::Placeholder("vnf1"));
        assert_eq!(
            CpTarget::parse("vnf1:input"),
            CpTarget::Qualified { vnf_id: "vnf1", cp: "input" }
        );
        assert_eq!(CpTarget::parse(""), CpTarget::Malformed);
        assert_eq!(CpTarget::parse("vnf1:"), CpTarget::Malformed);
        assert_eq!(CpTarget::parse("a:b:c"), CpTarget::Malformed);
    }

    #[test]
    fn test_forwarding_path_uses_position_on_the_wire() {
        let yaml = r#"
fp_id: "ns:fg01:fp01"
policy: none
connection_points:
  - connection_point_ref: "vnf_a:output"
    position: 2
  - connection_point_ref: "ns:input"
    position: 1
"#;
        let path: NetworkForwardingPath = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(path.connection_points[0].order, 2);

        let json = serde_json::to_value(&path.connection_points[1]).unwrap();
        assert_eq!(json["position"], 1);
        assert!(json.get("order").is_none());
    }

    #[test]
    fn test_record_decodes_hardware_address() {
        let yaml = r#"
id: vnfr-1
descriptor_reference: vnfd-1
status: normal operation
virtual_deployment_units:
  - id: vdu01
    vnfc_instance:
      - id: "0"
        vim_id: vim-1
        vc_id: server-1
        connection_points:
          - id: eth0
            type: internal
            interface:
              hardware_address: "fa:16:3e:00:00:01"
              address: 10.0.0.2
              netmask: 255.255.255.0
"#;
        let record: VnfRecord = serde_yaml::from_str(yaml).unwrap();
        let cp = &record.virtual_deployment_units[0].vnfc_instance[0].connection_points[0];
        assert_eq!(cp.interface.hardware_address.as_deref(), Some("fa:16:3e:00:00:01"));
    }

    #[test]
    fn test_empty_collections_are_omitted() {
        let nsd = ServiceDescriptor {
            instance_uuid: Some("i-1".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&nsd).unwrap();
        assert!(json.get("forwarding_graphs").is_none());
        assert!(json.get("uuid").is_none());
    }
}
