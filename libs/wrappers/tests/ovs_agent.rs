//! Software-switch driver against a local fake SFC agent

use adaptor_config::protocol::ovs::MAX_FRAME_SIZE;
use adaptor_config::SegmentConfig;
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use types::{
    ConnectionPoint, ConnectionPointRecord, ConnectionPointReference, ForwardingGraph,
    InterfaceRecord, NapObject, NetworkAttachmentPoints, NetworkConfigurePayload,
    NetworkForwardingPath, NetworkFunction, ServiceDescriptor, Vendor, VduRecord,
    VirtualDeploymentUnit, VnfDescriptor, VnfRecord, VnfVirtualLink, VnfcInstance,
    WrapperConfiguration, WrapperKind,
};
use wrappers::framing::read_frame;
use wrappers::{resolve_port_list, NetworkWrapper, OvsWrapper, WrapperError};

/// Accepts connections, forwards each decoded request and answers with `reply`
async fn spawn_agent(reply: &'static str) -> (u16, mpsc::UnboundedReceiver<serde_json::Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut buffer = BytesMut::new();
            let frame = read_frame(&mut stream, &mut buffer, MAX_FRAME_SIZE).await.unwrap();
            let request: serde_json::Value = serde_json::from_slice(&frame).unwrap();
            tx.send(request).unwrap();
            stream.write_all(format!("{reply}\n").as_bytes()).await.unwrap();
        }
    });
    (port, rx)
}

fn ovs(port: u16) -> OvsWrapper {
    let config = WrapperConfiguration {
        uuid: "ovs-1".into(),
        kind: WrapperKind::Network,
        vendor: Vendor::Ovs,
        endpoint: "127.0.0.1".into(),
        auth_user: String::new(),
        auth_secret: String::new(),
        configuration: serde_json::json!({ "compute_uuid": "vim-1" }),
        name: "switch".into(),
        city: String::new(),
        country: String::new(),
        domain: String::new(),
    };
    OvsWrapper::new(config, port, Duration::from_secs(5), SegmentConfig::default())
}

fn firewall_vnfd() -> VnfDescriptor {
    VnfDescriptor {
        uuid: Some("vnfd-fw".into()),
        instance_uuid: Some("fw-inst".into()),
        name: "firewall".into(),
        virtual_deployment_units: vec![VirtualDeploymentUnit {
            id: "vdu01".into(),
            connection_points: vec![
                ConnectionPoint {
                    id: "eth1".into(),
                    interface: None,
                    cp_type: None,
                },
                ConnectionPoint {
                    id: "eth2".into(),
                    interface: None,
                    cp_type: None,
                },
            ],
            ..Default::default()
        }],
        virtual_links: vec![
            VnfVirtualLink {
                id: "input".into(),
                connectivity_type: None,
                connection_points_reference: vec!["vdu01:eth1".into(), "input".into()],
            },
            VnfVirtualLink {
                id: "output".into(),
                connectivity_type: None,
                connection_points_reference: vec!["vdu01:eth2".into(), "output".into()],
            },
        ],
        ..Default::default()
    }
}

fn cp_record(id: &str, mac: &str) -> ConnectionPointRecord {
    ConnectionPointRecord {
        id: id.into(),
        cp_type: None,
        interface: InterfaceRecord {
            hardware_address: Some(mac.into()),
            ..Default::default()
        },
    }
}

fn firewall_vnfr() -> VnfRecord {
    VnfRecord {
        id: "fw-inst".into(),
        descriptor_reference: "vnfd-fw".into(),
        virtual_deployment_units: vec![VduRecord {
            id: "vdu01".into(),
            vnfc_instance: vec![VnfcInstance {
                id: "0".into(),
                vim_id: "vim-1".into(),
                vc_id: "vc-0".into(),
                connection_points: vec![
                    cp_record("eth1", "fa:16:3e:00:00:01"),
                    cp_record("eth2", "fa:16:3e:00:00:02"),
                ],
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn payload(refs: &[(&str, i32)], nap: Option<NetworkAttachmentPoints>) -> NetworkConfigurePayload {
    NetworkConfigurePayload {
        service_instance_id: "svc-1".into(),
        nsd: ServiceDescriptor {
            network_functions: vec![NetworkFunction {
                vnf_id: "vnf_fw".into(),
                vnf_name: "firewall".into(),
                vnf_vendor: None,
                vnf_version: None,
            }],
            forwarding_graphs: vec![ForwardingGraph {
                fg_id: "fg01".into(),
                network_forwarding_paths: vec![NetworkForwardingPath {
                    fp_id: "fp01".into(),
                    policy: None,
                    connection_points: refs
                        .iter()
                        .map(|(r, order)| ConnectionPointReference::new(*r, *order))
                        .collect(),
                }],
                ..Default::default()
            }],
            ..Default::default()
        },
        vnfds: vec![firewall_vnfd()],
        vnfrs: vec![firewall_vnfr()],
        nap,
    }
}

fn nap(ingresses: &[&str], egresses: &[&str]) -> NetworkAttachmentPoints {
    let objects = |segments: &[&str]| {
        segments
            .iter()
            .map(|s| NapObject {
                location: "athens".into(),
                nap: s.to_string(),
            })
            .collect()
    };
    NetworkAttachmentPoints {
        ingresses: objects(ingresses),
        egresses: objects(egresses),
    }
}

#[test]
fn test_port_list_follows_path_order() {
    // Listed out of order, placeholder hop in between
    let request = payload(
        &[("vnf_fw:output", 3), ("ns", 0), ("vnf_fw:input", 1)],
        None,
    );
    let ports = resolve_port_list(&request).unwrap();
    assert_eq!(ports.len(), 2);
    assert_eq!(ports[0].port, "fa:16:3e:00:00:01");
    assert_eq!(ports[0].order, 0);
    assert_eq!(ports[1].port, "fa:16:3e:00:00:02");
    assert_eq!(ports[1].order, 1);
}

#[test]
fn test_unknown_function_is_validation_error() {
    let request = payload(&[("vnf_dpi:input", 0)], None);
    let err = resolve_port_list(&request).unwrap_err();
    assert!(matches!(err, WrapperError::Validation { .. }));
}

#[tokio::test]
async fn test_configure_sends_one_request_per_nap_pair() {
    let (port, mut requests) = spawn_agent("SUCCESS").await;
    let request = payload(
        &[("vnf_fw:input", 0), ("vnf_fw:output", 1)],
        Some(nap(&["10.0.1.0/24", "10.0.3.0/24"], &["10.0.2.0/24"])),
    );

    ovs(port).configure(&request).await.unwrap();

    let first = requests.recv().await.unwrap();
    let second = requests.recv().await.unwrap();
    assert_eq!(first["action"], "add");
    assert_eq!(first["instance_id"], "svc-1");
    assert_eq!(first["in_segment"], "10.0.1.0/24");
    assert_eq!(second["in_segment"], "10.0.3.0/24");
    assert_eq!(second["out_segment"], "10.0.2.0/24");
    assert_eq!(
        first["port_list"],
        serde_json::json!([
            { "port": "fa:16:3e:00:00:01", "order": 0 },
            { "port": "fa:16:3e:00:00:02", "order": 1 }
        ])
    );
}

#[tokio::test]
async fn test_configure_without_nap_uses_default_segments() {
    let (port, mut requests) = spawn_agent("SUCCESS").await;
    let request = payload(&[("vnf_fw:input", 0)], None);

    ovs(port).configure(&request).await.unwrap();

    let sent = requests.recv().await.unwrap();
    let defaults = SegmentConfig::default();
    assert_eq!(sent["in_segment"], defaults.ingress.as_str());
    assert_eq!(sent["out_segment"], defaults.egress.as_str());
}

#[tokio::test]
async fn test_deconfigure_sends_delete() {
    let (port, mut requests) = spawn_agent("SUCCESS").await;

    ovs(port).deconfigure("svc-1").await.unwrap();

    let sent = requests.recv().await.unwrap();
    assert_eq!(sent, serde_json::json!({ "action": "delete", "instance_id": "svc-1" }));
}

#[tokio::test]
async fn test_agent_failure_reply_is_backend_error() {
    let (port, _requests) = spawn_agent("ERROR: port not found").await;

    let err = ovs(port).deconfigure("svc-1").await.unwrap_err();
    assert!(matches!(err, WrapperError::Backend { .. }));
}
