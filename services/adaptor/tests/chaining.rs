//! Service chaining across network backends

mod common;

use adaptor_config::AdaptorConfig;
use bay::ServiceInstanceRecord;
use common::{config, Harness};
use infrabstract_adaptor::{decompose, CallError};
use serde_json::{json, Value};
use types::{NetworkConfigurePayload, RequestStatus, Vendor, WrapperKind};

const CONFIGURE: &str = "infrastructure.service.chain.configure";
const DECONFIGURE: &str = "infrastructure.service.chain.deconfigure";

/// Firewall then transcoder, framed by the service's own ingress and egress
fn chain_request() -> Value {
    json!({
        "service_instance_id": "svc-1",
        "nsd": {
            "uuid": "nsd-1",
            "network_functions": [
                {"vnf_id": "vnf_fw", "vnf_name": "fw"},
                {"vnf_id": "vnf_vtc", "vnf_name": "vtc"}
            ],
            "forwarding_graphs": [{
                "fg_id": "fg01",
                "network_forwarding_paths": [{
                    "fp_id": "fg01:fp01",
                    "policy": "none",
                    "connection_points": [
                        {"connection_point_ref": "vnf_vtc:output", "position": 4},
                        {"connection_point_ref": "ns:input", "position": 0},
                        {"connection_point_ref": "vnf_fw:input", "position": 1},
                        {"connection_point_ref": "vnf_fw:output", "position": 2},
                        {"connection_point_ref": "vnf_vtc:input", "position": 3},
                        {"connection_point_ref": "ns:output", "position": 5}
                    ]
                }]
            }]
        },
        "vnfds": [
            {"uuid": "fw-desc", "instance_uuid": "fw-inst", "name": "fw"},
            {"uuid": "vtc-desc", "instance_uuid": "vtc-inst", "name": "vtc"}
        ],
        "vnfrs": [
            {"id": "fw-inst", "descriptor_reference": "fw-desc"},
            {"id": "vtc-inst", "descriptor_reference": "vtc-desc"}
        ]
    })
}

async fn two_pops() -> Harness {
    let harness = Harness::new();
    harness.add_compute("vim-a").await;
    harness.add_compute("vim-b").await;
    harness.add_network("net-a", "vim-a").await;
    harness.add_network("net-b", "vim-b").await;
    harness.place_function("fw-inst", "svc-1", "vim-a").await;
    harness.place_function("vtc-inst", "svc-1", "vim-b").await;
    harness
}

fn targets(harness: &Harness, network: &str, operation: &str) -> Vec<Vec<String>> {
    harness
        .journal
        .calls_for(network)
        .into_iter()
        .filter(|call| call.operation == operation)
        .map(|call| call.targets)
        .collect()
}

#[tokio::test]
async fn test_chain_split_per_network_backend() {
    let mut harness = two_pops().await;

    let response = harness.call_api(CONFIGURE, &chain_request()).await;
    assert_eq!(response.request_status, RequestStatus::Completed);

    assert_eq!(
        targets(&harness, "net-a", "configure"),
        vec![vec!["vnf_fw:input".to_string(), "vnf_fw:output".to_string()]]
    );
    assert_eq!(
        targets(&harness, "net-b", "configure"),
        vec![vec!["vnf_vtc:input".to_string(), "vnf_vtc:output".to_string()]]
    );
}

#[tokio::test]
async fn test_sub_requests_carry_only_their_functions() {
    let harness = two_pops().await;
    let payload: NetworkConfigurePayload = serde_json::from_value(chain_request()).unwrap();

    let requests = decompose(&payload, harness.bay.as_ref()).await.unwrap();

    let networks: Vec<_> = requests.iter().map(|r| r.network_vim_uuid.as_str()).collect();
    assert_eq!(networks, vec!["net-a", "net-b"]);

    let fw = &requests[0].payload;
    assert_eq!(fw.service_instance_id, "svc-1");
    assert_eq!(fw.nsd.instance_uuid.as_deref(), Some("svc-1"));
    assert_eq!(fw.nsd.forwarding_graphs.len(), 1);
    assert_eq!(fw.vnfds.len(), 1);
    assert_eq!(fw.vnfds[0].name, "fw");
    assert_eq!(fw.vnfrs.len(), 1);
    assert_eq!(fw.vnfrs[0].id, "fw-inst");
}

#[tokio::test]
async fn test_single_backend_gets_whole_path() {
    let mut harness = Harness::new();
    harness.add_compute("vim-a").await;
    harness.add_network("net-a", "vim-a").await;
    harness.place_function("fw-inst", "svc-1", "vim-a").await;
    harness.place_function("vtc-inst", "svc-1", "vim-a").await;

    let response = harness.call_api(CONFIGURE, &chain_request()).await;
    assert_eq!(response.request_status, RequestStatus::Completed);

    assert_eq!(
        targets(&harness, "net-a", "configure"),
        vec![vec![
            "vnf_fw:input".to_string(),
            "vnf_fw:output".to_string(),
            "vnf_vtc:input".to_string(),
            "vnf_vtc:output".to_string(),
        ]]
    );
}

#[tokio::test]
async fn test_unresolvable_hop_configures_nothing() {
    let mut harness = Harness::new();
    harness.add_compute("vim-a").await;
    harness.add_compute("vim-c").await;
    harness.add_network("net-a", "vim-a").await;
    harness.place_function("fw-inst", "svc-1", "vim-a").await;
    // vim-c has no network backend
    harness.place_function("vtc-inst", "svc-1", "vim-c").await;

    let response = harness.call_api(CONFIGURE, &chain_request()).await;
    assert_eq!(response.request_status, RequestStatus::Error);
    assert!(response.message.unwrap_or_default().contains("vim-c"));
    assert!(harness.journal.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_function_is_a_validation_error() {
    let harness = two_pops().await;
    let mut request = chain_request();
    request["nsd"]["network_functions"]
        .as_array_mut()
        .unwrap()
        .pop();
    let payload: NetworkConfigurePayload = serde_json::from_value(request).unwrap();

    let err = decompose(&payload, harness.bay.as_ref()).await.unwrap_err();
    assert!(matches!(err, CallError::Validation(_)));
    assert!(err.to_string().contains("vnf_vtc:input"));
}

#[tokio::test]
async fn test_failed_group_is_compensated_when_enabled() {
    let mut settings = AdaptorConfig::default();
    settings.chain.compensate_on_failure = true;
    let mut harness = Harness::with_config(settings);

    harness.add_compute("vim-a").await;
    harness.add_compute("vim-b").await;
    harness.add_network("net-a", "vim-a").await;
    let mut failing = config("net-b", WrapperKind::Network, Vendor::NetworkMock);
    failing.configuration = json!({"compute_uuid": "vim-b", "mock_fail": true});
    assert!(harness
        .bay
        .register_network(failing, "vim-b")
        .await
        .is_completed());
    harness.place_function("fw-inst", "svc-1", "vim-a").await;
    harness.place_function("vtc-inst", "svc-1", "vim-b").await;

    let response = harness.call_api(CONFIGURE, &chain_request()).await;
    assert_eq!(response.request_status, RequestStatus::Error);

    // net-a finishes even though net-b failed, then is rolled back
    assert_eq!(targets(&harness, "net-a", "configure").len(), 1);
    assert_eq!(targets(&harness, "net-a", "deconfigure").len(), 1);
}

#[tokio::test]
async fn test_failed_group_leaves_others_configured_by_default() {
    let mut harness = Harness::new();
    harness.add_compute("vim-a").await;
    harness.add_compute("vim-b").await;
    harness.add_network("net-a", "vim-a").await;
    let mut failing = config("net-b", WrapperKind::Network, Vendor::NetworkMock);
    failing.configuration = json!({"compute_uuid": "vim-b", "mock_fail": true});
    assert!(harness
        .bay
        .register_network(failing, "vim-b")
        .await
        .is_completed());
    harness.place_function("fw-inst", "svc-1", "vim-a").await;
    harness.place_function("vtc-inst", "svc-1", "vim-b").await;

    let response = harness.call_api(CONFIGURE, &chain_request()).await;
    assert_eq!(response.request_status, RequestStatus::Error);

    assert_eq!(targets(&harness, "net-a", "configure").len(), 1);
    assert!(targets(&harness, "net-a", "deconfigure").is_empty());
}

#[tokio::test]
async fn test_interleaved_path_groups_hops_by_backend() {
    let mut harness = two_pops().await;
    let mut request = chain_request();
    request["nsd"]["forwarding_graphs"][0]["network_forwarding_paths"][0]["connection_points"] = json!([
        {"connection_point_ref": "vnf_fw:input", "position": 0},
        {"connection_point_ref": "vnf_vtc:input", "position": 1},
        {"connection_point_ref": "vnf_fw:output", "position": 2}
    ]);

    let response = harness.call_api(CONFIGURE, &request).await;
    assert_eq!(response.request_status, RequestStatus::Completed);

    assert_eq!(
        targets(&harness, "net-a", "configure"),
        vec![vec!["vnf_fw:input".to_string(), "vnf_fw:output".to_string()]]
    );
    assert_eq!(
        targets(&harness, "net-b", "configure"),
        vec![vec!["vnf_vtc:input".to_string()]]
    );
}

#[tokio::test]
async fn test_missing_function_record_configures_nothing() {
    let mut harness = two_pops().await;
    let mut request = chain_request();
    request["vnfrs"].as_array_mut().unwrap().pop();

    let response = harness.call_api(CONFIGURE, &request).await;
    assert_eq!(response.request_status, RequestStatus::Error);

    let message = response.message.unwrap_or_default();
    assert!(message.contains("no record for descriptor"), "{message}");
    assert!(harness.journal.calls().is_empty());
}

#[tokio::test]
async fn test_deconfigure_reaches_each_network_backend_once() {
    let mut harness = two_pops().await;
    for (vim, n) in [("vim-a", 1), ("vim-b", 2), ("vim-a", 3)] {
        harness
            .bay
            .put_service_instance(ServiceInstanceRecord {
                instance_uuid: "svc-1".into(),
                vim_uuid: vim.into(),
                vim_instance_id: format!("stack-{n}"),
                vim_instance_name: format!("svc-1-{n}"),
            })
            .await
            .unwrap();
    }

    let response = harness
        .call_api(DECONFIGURE, &json!({"service_instance_id": "svc-1"}))
        .await;
    assert_eq!(response.request_status, RequestStatus::Completed);

    assert_eq!(targets(&harness, "net-a", "deconfigure").len(), 1);
    assert_eq!(targets(&harness, "net-b", "deconfigure").len(), 1);
}
