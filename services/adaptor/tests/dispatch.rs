//! Requests through the dispatcher: one terminal response each

mod common;

use common::Harness;
use serde_json::json;
use types::{ContentType, RequestStatus, ServicePlatformMessage, VimResources};

const COMPUTE_ADD: &str = "infrastructure.management.compute.add";
const COMPUTE_LIST: &str = "infrastructure.management.compute.list";
const COMPUTE_REMOVE: &str = "infrastructure.management.compute.remove";
const NETWORK_ADD: &str = "infrastructure.management.network.add";
const WAN_ADD: &str = "infrastructure.management.wan.add";
const WAN_ATTACH: &str = "infrastructure.management.wan.attach";
const WAN_CONFIGURE: &str = "infrastructure.wan.configure";
const WAN_DECONFIGURE: &str = "infrastructure.wan.deconfigure";

fn add_body(name: &str) -> serde_json::Value {
    json!({
        "vim_type": "mock",
        "vim_address": "10.0.0.5",
        "username": "admin",
        "pass": "secret",
        "city": "Athens",
        "country": "GR",
        "name": name
    })
}

async fn add(harness: &mut Harness, topic: &str, body: serde_json::Value) -> String {
    let response = harness.call_api(topic, &body).await;
    assert_eq!(response.request_status, RequestStatus::Completed, "{response:?}");
    response.uuid.expect("generated uuid")
}

#[tokio::test]
async fn test_compute_add_list_remove() {
    let mut harness = Harness::new();

    let uuid = add(&mut harness, COMPUTE_ADD, add_body("pop-1")).await;

    let listed: Vec<VimResources> = harness
        .call(COMPUTE_LIST, &json!({}))
        .await
        .decode()
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].vim_uuid, uuid);
    assert_eq!(listed[0].vim_name, "pop-1");
    assert_eq!(listed[0].vim_city, "Athens");
    assert_eq!(listed[0].vim_type, "mock");
    assert_eq!(listed[0].core_total, 10);

    let removed = harness.call_api(COMPUTE_REMOVE, &json!({ "uuid": uuid })).await;
    assert_eq!(removed.request_status, RequestStatus::Completed);

    let listed: Vec<VimResources> = harness
        .call(COMPUTE_LIST, &json!({}))
        .await
        .decode()
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_second_network_for_compute_is_rejected() {
    let mut harness = Harness::new();
    let compute = add(&mut harness, COMPUTE_ADD, add_body("pop-1")).await;

    let mut network = add_body("sdn-1");
    network["configuration"] = json!({ "compute_uuid": compute });
    add(&mut harness, NETWORK_ADD, network.clone()).await;

    let second = harness.call_api(NETWORK_ADD, &network).await;
    assert_eq!(second.request_status, RequestStatus::Error);
}

#[tokio::test]
async fn test_resource_availability() {
    let mut harness = Harness::new();
    let vim = add(&mut harness, COMPUTE_ADD, add_body("pop-1")).await;
    let topic = "infrastructure.management.compute.resourceAvailability";

    let fits = harness
        .call_api(topic, &json!({"vim_uuid": vim, "resource_request": {"cpu": 4, "memory": 512}}))
        .await;
    assert_eq!(fits.request_status, RequestStatus::Completed);

    let too_big = harness
        .call_api(topic, &json!({"vim_uuid": vim, "resource_request": {"cpu": 64, "memory": 512}}))
        .await;
    assert_eq!(too_big.request_status, RequestStatus::Error);
}

/// Three compute VIMs: a and b behind wim-1, c behind wim-2
async fn wan_topology(harness: &mut Harness) -> (String, String) {
    let wim_1 = add(harness, WAN_ADD, add_body("wim-1")).await;
    let wim_2 = add(harness, WAN_ADD, add_body("wim-2")).await;

    for (name, wim, address) in [
        ("vim-c", &wim_2, "10.0.3.1"),
        ("vim-b", &wim_1, "10.0.2.1"),
        ("vim-a", &wim_1, "10.0.1.1"),
    ] {
        harness.add_compute(name).await;
        let attached = harness
            .call_api(
                WAN_ATTACH,
                &json!({"wim_uuid": wim, "vim_uuid": name, "vim_address": address}),
            )
            .await;
        assert_eq!(attached.request_status, RequestStatus::Completed);
    }
    (wim_1, wim_2)
}

#[tokio::test]
async fn test_wan_configure_groups_vims_per_wim() {
    let mut harness = Harness::new();
    let (wim_1, wim_2) = wan_topology(&mut harness).await;

    let response = harness
        .call_api(
            WAN_CONFIGURE,
            &json!({"instance_id": "svc-1", "vim_list": ["vim-c", "vim-b", "vim-a"]}),
        )
        .await;
    assert_eq!(response.request_status, RequestStatus::Completed);

    let first = harness.journal.calls_for(&wim_1);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].targets, vec!["10.0.1.1", "10.0.2.1"]);
    let second = harness.journal.calls_for(&wim_2);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].targets, vec!["10.0.3.1"]);
}

#[tokio::test]
async fn test_wan_configure_one_rule_per_segment_pair() {
    let mut harness = Harness::new();
    let (wim_1, _) = wan_topology(&mut harness).await;

    let response = harness
        .call_api(
            WAN_CONFIGURE,
            &json!({
                "instance_id": "svc-1",
                "vim_list": ["vim-a", "vim-b"],
                "nap": {
                    "ingresses": [{"location": "Athens", "nap": "10.100.0.0/24"},
                                  {"location": "Paris", "nap": "10.101.0.0/24"}],
                    "egresses": [{"location": "Madrid", "nap": "10.200.0.0/24"}]
                }
            }),
        )
        .await;
    assert_eq!(response.request_status, RequestStatus::Completed);
    assert_eq!(harness.journal.calls_for(&wim_1).len(), 2);
}

#[tokio::test]
async fn test_wan_configure_rejects_duplicates() {
    let mut harness = Harness::new();
    wan_topology(&mut harness).await;

    let response = harness
        .call_api(
            WAN_CONFIGURE,
            &json!({"instance_id": "svc-1", "vim_list": ["vim-a", "vim-a"]}),
        )
        .await;
    assert_eq!(response.request_status, RequestStatus::Error);
    assert!(harness.journal.calls().is_empty());
}

#[tokio::test]
async fn test_wan_configure_unattached_vim() {
    let mut harness = Harness::new();
    wan_topology(&mut harness).await;
    harness.add_compute("vim-z").await;

    let response = harness
        .call_api(
            WAN_CONFIGURE,
            &json!({"instance_id": "svc-1", "vim_list": ["vim-a", "vim-z"]}),
        )
        .await;
    assert_eq!(response.request_status, RequestStatus::Error);
    assert!(response.message.unwrap_or_default().contains("vim-z"));
}

#[tokio::test]
async fn test_wan_deconfigure_reaches_every_wim() {
    let mut harness = Harness::new();
    let (wim_1, wim_2) = wan_topology(&mut harness).await;

    let response = harness
        .call_api(WAN_DECONFIGURE, &json!({"instance_id": "svc-1"}))
        .await;
    assert_eq!(response.request_status, RequestStatus::Completed);

    for wim in [wim_1, wim_2] {
        let calls = harness.journal.calls_for(&wim);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, "remove_network");
    }
}

#[tokio::test]
async fn test_unparsable_body_gets_one_error_response() {
    let mut harness = Harness::new();
    let request = ServicePlatformMessage::new(
        COMPUTE_ADD,
        "sid-broken",
        Some(COMPUTE_ADD.to_string()),
        ContentType::Json,
        "{ not json",
    );

    let handle = harness.dispatcher.dispatch(request).await.unwrap();
    handle.await.unwrap();

    let response = harness.outbound.try_recv().unwrap();
    assert_eq!(response.sid(), "sid-broken");
    assert_eq!(response.topic(), COMPUTE_ADD);
    let body: types::ApiResponse = response.decode().unwrap();
    assert_eq!(body.request_status, RequestStatus::Error);
    assert!(harness.outbound.try_recv().is_err());
}

#[tokio::test]
async fn test_unrouted_and_reply_messages_are_not_answered() {
    let mut harness = Harness::new();

    let unrouted = ServicePlatformMessage::new(
        "infrastructure.teleport",
        "sid-1",
        Some("infrastructure.teleport".into()),
        ContentType::Json,
        "{}",
    );
    assert!(harness.dispatcher.dispatch(unrouted).await.is_none());

    // A response on a routed topic must not be processed as a new call
    let echo = ServicePlatformMessage::new(COMPUTE_LIST, "sid-2", None, ContentType::Json, "{}");
    assert!(harness.dispatcher.dispatch(echo).await.is_none());

    assert!(harness.outbound.try_recv().is_err());
}

#[tokio::test]
async fn test_monitoring_is_acknowledged_with_warning() {
    let mut harness = Harness::new();
    let response = harness
        .call_api("infrastructure.monitoring.vim.list", &json!({}))
        .await;
    assert_eq!(response.request_status, RequestStatus::Warning);
}

#[tokio::test]
async fn test_removing_unknown_service_warns() {
    let mut harness = Harness::new();
    let response = harness
        .call_api(
            "infrastructure.service.remove",
            &json!({"instance_uuid": "never-deployed"}),
        )
        .await;
    assert_eq!(response.request_status, RequestStatus::Warning);
}
