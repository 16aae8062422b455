//! Software-switch (OVS) network driver
//!
//! Talks to the SFC agent running next to the switch on `<endpoint>:55555`.
//! Each request is one length-prefixed JSON frame; the agent answers with a
//! single text line, and only `SUCCESS` counts as success.
//!
//! Connection points of the forwarding path are resolved to MAC addresses:
//!
//! ```text
//! "vnf_fw:input" ──nsd──▶ vnf_name ──▶ VNFD
//!      VNFD.virtual_links: ["vdu01:eth0", "input"]  ──▶ vdu01 / eth0
//!      VNFR.vdu[vdu01].vnfc_instance[*].connection_points[eth0]
//!           └─▶ interface.hardware_address
//! ```

use crate::error::{Result, WrapperError};
use crate::framing::write_frame;
use crate::traits::NetworkWrapper;
use adaptor_config::protocol::ovs::{MAX_FRAME_SIZE, SUCCESS_REPLY};
use adaptor_config::SegmentConfig;
use async_trait::async_trait;
use bytes::BytesMut;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use types::{CpTarget, NetworkConfigurePayload, VnfDescriptor, VnfRecord, WrapperConfiguration};

/// Port entry of an agent request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderedPort {
    pub port: String,
    pub order: u32,
}

/// Agent request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OvsRequest {
    pub action: &'static str,
    pub instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_list: Option<Vec<OrderedPort>>,
}

#[derive(Debug)]
pub struct OvsWrapper {
    config: WrapperConfiguration,
    agent_port: u16,
    timeout: Duration,
    default_segments: SegmentConfig,
}

impl OvsWrapper {
    pub fn new(
        config: WrapperConfiguration,
        agent_port: u16,
        timeout: Duration,
        default_segments: SegmentConfig,
    ) -> Self {
        Self {
            config,
            agent_port,
            timeout,
            default_segments,
        }
    }

    /// Segment pairs to configure: every (ingress, egress) NAP pair, or the
    /// configured defaults when the call carries no NAP.
    fn segment_pairs(&self, payload: &NetworkConfigurePayload) -> Vec<(String, String)> {
        match &payload.nap {
            Some(nap) if !nap.ingresses.is_empty() && !nap.egresses.is_empty() => nap
                .ingresses
                .iter()
                .flat_map(|i| nap.egresses.iter().map(move |e| (i.nap.clone(), e.nap.clone())))
                .collect(),
            _ => {
                warn!(
                    vim = %self.config.uuid,
                    "NAP not specified, using default segments"
                );
                vec![(
                    self.default_segments.ingress.clone(),
                    self.default_segments.egress.clone(),
                )]
            }
        }
    }

    /// Send one request and wait for the agent's status line
    async fn send(&self, request: &OvsRequest) -> Result<()> {
        let body = serde_json::to_vec(request)
            .map_err(|e| WrapperError::validation(format!("unable to encode agent request: {e}")))?;
        let address = format!("{}:{}", self.config.endpoint, self.agent_port);
        let timeout_ms = self.timeout.as_millis() as u64;

        debug!(vim = %self.config.uuid, %address, action = request.action, "Sending SFC agent request");

        let exchange = async {
            let mut stream = TcpStream::connect(&address)
                .await
                .map_err(|e| WrapperError::transport_with_source(format!("connect to {address}"), e))?;

            let mut buffer = BytesMut::with_capacity(body.len() + 4);
            write_frame(&mut stream, &mut buffer, &body)
                .await
                .map_err(|e| WrapperError::transport_with_source("write agent request", e))?;

            let mut reply = String::new();
            BufReader::new(stream)
                .take(MAX_FRAME_SIZE as u64)
                .read_line(&mut reply)
                .await
                .map_err(|e| WrapperError::transport_with_source("read agent reply", e))?;
            Ok::<_, WrapperError>(reply)
        };

        let reply = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| WrapperError::timeout(format!("SFC agent {address}"), timeout_ms))??;

        let status = reply.trim();
        if status == SUCCESS_REPLY {
            info!(vim = %self.config.uuid, action = request.action, "SFC agent request completed");
            Ok(())
        } else {
            Err(WrapperError::backend(
                self.config.uuid.clone(),
                format!("SFC agent replied '{status}'"),
            ))
        }
    }
}

/// Resolve every qualified connection point of the payload's forwarding paths
/// to a MAC address, numbered consecutively in path order.
pub fn resolve_port_list(payload: &NetworkConfigurePayload) -> Result<Vec<OrderedPort>> {
    let nsd = &payload.nsd;
    let names: HashMap<&str, &str> = nsd
        .network_functions
        .iter()
        .map(|nf| (nf.vnf_id.as_str(), nf.vnf_name.as_str()))
        .collect();
    let descriptors: HashMap<&str, &VnfDescriptor> =
        payload.vnfds.iter().map(|d| (d.name.as_str(), d)).collect();
    let records: HashMap<&str, &VnfRecord> = payload
        .vnfrs
        .iter()
        .map(|r| (r.descriptor_reference.as_str(), r))
        .collect();

    let mut ports = Vec::new();
    for graph in &nsd.forwarding_graphs {
        for path in &graph.network_forwarding_paths {
            let mut hops = path.connection_points.clone();
            hops.sort_by_key(|cp| cp.order);

            for hop in &hops {
                let reference = hop.connection_point_ref.as_str();
                let (vnf_id, cp) = match hop.target() {
                    CpTarget::Placeholder(_) => continue,
                    CpTarget::Qualified { vnf_id, cp } => (vnf_id, cp),
                    CpTarget::Malformed => {
                        return Err(WrapperError::validation(format!(
                            "malformed connection point reference '{reference}'"
                        )))
                    }
                };

                let vnfd = names
                    .get(vnf_id)
                    .and_then(|name| descriptors.get(name))
                    .ok_or_else(|| {
                        WrapperError::validation(format!("no descriptor for '{reference}'"))
                    })?;
                let vnfr = records.get(vnfd.reference()).ok_or_else(|| {
                    WrapperError::validation(format!("no record for '{reference}'"))
                })?;

                let mac = resolve_mac(vnfd, vnfr, cp).ok_or_else(|| {
                    WrapperError::validation(format!(
                        "no hardware address for '{reference}' in record {}",
                        vnfr.id
                    ))
                })?;

                ports.push(OrderedPort {
                    port: mac,
                    order: ports.len() as u32,
                });
            }
        }
    }
    Ok(ports)
}

/// External cp name → VDU connection point → hardware address
fn resolve_mac(vnfd: &VnfDescriptor, vnfr: &VnfRecord, cp: &str) -> Option<String> {
    let (vdu_id, vdu_cp) = vnfd
        .virtual_links
        .iter()
        .filter(|link| link.connection_points_reference.iter().any(|r| r == cp))
        .flat_map(|link| link.connection_points_reference.iter())
        .filter(|r| r.as_str() != cp)
        .find_map(|r| r.split_once(':'))?;

    vnfr.virtual_deployment_units
        .iter()
        .filter(|vdu| vdu.id == vdu_id)
        .flat_map(|vdu| vdu.vnfc_instance.iter())
        .flat_map(|vnfc| vnfc.connection_points.iter())
        .find(|record| record.id == vdu_cp)
        .and_then(|record| record.interface.hardware_address.clone())
}

#[async_trait]
impl NetworkWrapper for OvsWrapper {
    fn config(&self) -> &WrapperConfiguration {
        &self.config
    }

    async fn configure(&self, payload: &NetworkConfigurePayload) -> Result<()> {
        let port_list = resolve_port_list(payload)?;
        if port_list.is_empty() {
            info!(
                vim = %self.config.uuid,
                instance = %payload.service_instance_id,
                "No resolvable hops in forwarding path, nothing to configure"
            );
            return Ok(());
        }

        for (ingress, egress) in self.segment_pairs(payload) {
            let request = OvsRequest {
                action: "add",
                instance_id: payload.service_instance_id.clone(),
                in_segment: Some(ingress),
                out_segment: Some(egress),
                port_list: Some(port_list.clone()),
            };
            self.send(&request).await?;
        }
        Ok(())
    }

    async fn deconfigure(&self, service_instance_id: &str) -> Result<()> {
        let request = OvsRequest {
            action: "delete",
            instance_id: service_instance_id.to_string(),
            in_segment: None,
            out_segment: None,
            port_list: None,
        };
        self.send(&request).await
    }
}
