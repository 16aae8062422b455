//! Shared harness: an in-memory bay of mocks behind a dispatcher
#![allow(dead_code)]

use adaptor_config::AdaptorConfig;
use bay::{MemoryRepository, PlacementRecord, WrapperBay};
use infrabstract_adaptor::{Dispatcher, MessageSink, Mux, PendingCalls, ProcessorContext};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use types::{
    new_sid, ApiResponse, ServicePlatformMessage, Vendor, WrapperConfiguration, WrapperKind,
};
use wrappers::{CallJournal, WrapperFactory};

pub struct Harness {
    pub bay: Arc<WrapperBay>,
    pub journal: CallJournal,
    pub context: ProcessorContext,
    pub dispatcher: Dispatcher,
    pub outbound: mpsc::Receiver<ServicePlatformMessage>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AdaptorConfig::default())
    }

    pub fn with_config(config: AdaptorConfig) -> Self {
        let journal = CallJournal::new();
        let factory = WrapperFactory::with_journal(
            config.backends.clone(),
            config.segments.clone(),
            journal.clone(),
        );
        let bay = Arc::new(WrapperBay::new(Arc::new(MemoryRepository::new()), factory));

        let (mux, outbound) = Mux::channel(64);
        let sink: Arc<dyn MessageSink> = Arc::new(mux);
        let context = ProcessorContext::new(Arc::clone(&bay), sink, &config);
        let dispatcher = Dispatcher::new(
            context.clone(),
            Arc::new(PendingCalls::new()),
            config.adaptor.max_workers,
        );

        Self {
            bay,
            journal,
            context,
            dispatcher,
            outbound,
        }
    }

    /// Send one request through the dispatcher and return its terminal response
    pub async fn call<T: Serialize>(&mut self, topic: &str, body: &T) -> ServicePlatformMessage {
        let request = ServicePlatformMessage::json(topic, new_sid(), Some(topic.to_string()), body)
            .expect("encode request");
        let sid = request.sid().to_string();

        let handle = self
            .dispatcher
            .dispatch(request)
            .await
            .expect("topic is routed");
        handle.await.expect("processor task");

        let response = self.outbound.try_recv().expect("terminal response");
        assert_eq!(response.sid(), sid);
        assert!(response.reply_to().is_none());
        assert!(
            self.outbound.try_recv().is_err(),
            "more than one response for {sid}"
        );
        response
    }

    pub async fn call_api<T: Serialize>(&mut self, topic: &str, body: &T) -> ApiResponse {
        self.call(topic, body).await.decode().expect("api response")
    }

    pub async fn add_compute(&self, uuid: &str) {
        let response = self
            .bay
            .register_compute(config(uuid, WrapperKind::Compute, Vendor::ComputeMock))
            .await;
        assert!(response.is_completed(), "{response:?}");
    }

    pub async fn add_network(&self, uuid: &str, compute_uuid: &str) {
        let mut network = config(uuid, WrapperKind::Network, Vendor::NetworkMock);
        network.configuration = serde_json::json!({ "compute_uuid": compute_uuid });
        let response = self.bay.register_network(network, compute_uuid).await;
        assert!(response.is_completed(), "{response:?}");
    }

    pub async fn add_wim(&self, uuid: &str) {
        let response = self
            .bay
            .register_wim(config(uuid, WrapperKind::Wim, Vendor::WimMock))
            .await;
        assert!(response.is_completed(), "{response:?}");
    }

    /// Record that a function instance runs on `vim_uuid`
    pub async fn place_function(&self, function_uuid: &str, service_uuid: &str, vim_uuid: &str) {
        self.bay
            .put_function_instance(PlacementRecord {
                instance_uuid: function_uuid.into(),
                service_instance_uuid: service_uuid.into(),
                vim_uuid: vim_uuid.into(),
            })
            .await
            .expect("placement stored");
    }
}

pub fn config(uuid: &str, kind: WrapperKind, vendor: Vendor) -> WrapperConfiguration {
    WrapperConfiguration {
        uuid: uuid.into(),
        kind,
        vendor,
        endpoint: "10.0.0.1".into(),
        auth_user: String::new(),
        auth_secret: String::new(),
        configuration: serde_json::json!({}),
        name: uuid.into(),
        city: String::new(),
        country: String::new(),
        domain: String::new(),
    }
}
