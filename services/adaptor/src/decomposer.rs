//! Forwarding-graph decomposition
//!
//! A service chain may cross several compute PoPs, each chained by its own
//! network backend. Decomposition splits every forwarding path of a
//! `chain.configure` request into one sub-request per network backend:
//!
//! ```text
//!  path (sorted by position)      placement                   groups
//!  ───────────────────────────    ─────────────────────────   ──────────────────
//!  ns:input          placeholder  skipped
//!  vnf_fw:input      fw  → vim-A  → net-A ─┐                  net-A: fw:in fw:out
//!  vnf_fw:output     fw  → vim-A  → net-A ─┤                  net-B: vtc:in vtc:out
//!  vnf_vtc:input     vtc → vim-B  → net-B ─┤
//!  vnf_vtc:output    vtc → vim-B  → net-B ─┘
//! ```
//!
//! Groups keep the order in which their backend first appears, and hops keep
//! their path order inside a group. Any reference that cannot be resolved
//! aborts the whole path; nothing is dispatched for it.
//!
//! [`dispatch`] configures the groups concurrently. The first failure fails the
//! call once every other group has finished. Groups that configured stay
//! configured unless compensation is enabled.

use crate::error::{CallError, CallResult};
use crate::processor::ProcessorContext;
use async_trait::async_trait;
use bay::WrapperBay;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use types::{
    ConnectionPointReference, CpTarget, ForwardingGraph, NetworkConfigurePayload,
    NetworkForwardingPath, ServiceDescriptor, VnfDescriptor, VnfRecord,
};

/// Where functions run and which network backend chains each compute VIM
#[async_trait]
pub trait PlacementResolver: Send + Sync {
    /// Compute VIM hosting a function instance
    async fn compute_for_function(&self, function_instance_id: &str) -> CallResult<Option<String>>;

    /// Network VIM linked to a compute VIM
    async fn network_for_compute(&self, compute_uuid: &str) -> CallResult<Option<String>>;
}

#[async_trait]
impl PlacementResolver for WrapperBay {
    async fn compute_for_function(&self, function_instance_id: &str) -> CallResult<Option<String>> {
        Ok(self
            .function_instance(function_instance_id)
            .await?
            .map(|record| record.vim_uuid))
    }

    async fn network_for_compute(&self, compute_uuid: &str) -> CallResult<Option<String>> {
        Ok(self.resolve_network_for_compute(compute_uuid).await?)
    }
}

/// Part of a chain handled by one network backend
#[derive(Debug, Clone, PartialEq)]
pub struct SubRequest {
    pub network_vim_uuid: String,
    pub payload: NetworkConfigurePayload,
}

impl SubRequest {
    /// Ordered hops of this group
    pub fn connection_points(&self) -> impl Iterator<Item = &ConnectionPointReference> {
        self.payload
            .nsd
            .forwarding_graphs
            .iter()
            .flat_map(|fg| fg.network_forwarding_paths.iter())
            .flat_map(|path| path.connection_points.iter())
    }
}

/// Lookup tables shared by every path of one request
struct Catalogue<'a> {
    names: HashMap<&'a str, &'a str>,
    descriptors: HashMap<&'a str, usize>,
    records: HashMap<&'a str, usize>,
}

impl<'a> Catalogue<'a> {
    fn new(payload: &'a NetworkConfigurePayload) -> Self {
        Self {
            names: payload
                .nsd
                .network_functions
                .iter()
                .map(|nf| (nf.vnf_id.as_str(), nf.vnf_name.as_str()))
                .collect(),
            descriptors: payload
                .vnfds
                .iter()
                .enumerate()
                .map(|(i, vnfd)| (vnfd.name.as_str(), i))
                .collect(),
            records: payload
                .vnfrs
                .iter()
                .enumerate()
                .map(|(i, vnfr)| (vnfr.descriptor_reference.as_str(), i))
                .collect(),
        }
    }
}

#[derive(Debug)]
struct Group {
    network_vim_uuid: String,
    hops: Vec<ConnectionPointReference>,
    descriptors: Vec<usize>,
    records: Vec<usize>,
}

fn unresolved(reference: &ConnectionPointReference, reason: impl std::fmt::Display) -> CallError {
    CallError::validation(format!(
        "unable to resolve connection point reference '{}': {reason}",
        reference.connection_point_ref
    ))
}

fn unplaced(reference: &ConnectionPointReference, reason: impl std::fmt::Display) -> CallError {
    CallError::addressing(format!(
        "unable to place connection point reference '{}': {reason}",
        reference.connection_point_ref
    ))
}

/// Split every forwarding path of `payload` into per-network-backend sub-requests
pub async fn decompose(
    payload: &NetworkConfigurePayload,
    resolver: &dyn PlacementResolver,
) -> CallResult<Vec<SubRequest>> {
    let catalogue = Catalogue::new(payload);
    let mut requests = Vec::new();

    for graph in &payload.nsd.forwarding_graphs {
        for path in &graph.network_forwarding_paths {
            let groups = partition(payload, &catalogue, path, resolver).await?;
            debug!(
                instance = %payload.service_instance_id,
                graph = %graph.fg_id,
                path = %path.fp_id,
                groups = groups.len(),
                "Forwarding path partitioned"
            );
            requests.extend(
                groups
                    .into_iter()
                    .map(|group| sub_request(payload, graph, path, group)),
            );
        }
    }
    Ok(requests)
}

async fn partition(
    payload: &NetworkConfigurePayload,
    catalogue: &Catalogue<'_>,
    path: &NetworkForwardingPath,
    resolver: &dyn PlacementResolver,
) -> CallResult<Vec<Group>> {
    let mut hops = path.connection_points.clone();
    hops.sort_by_key(|cp| cp.order);

    let mut groups: Vec<Group> = Vec::new();
    for hop in hops {
        let vnf_id = match hop.target() {
            CpTarget::Placeholder(_) => continue,
            CpTarget::Qualified { vnf_id, .. } => vnf_id,
            CpTarget::Malformed => return Err(unresolved(&hop, "malformed reference")),
        };

        let name = catalogue
            .names
            .get(vnf_id)
            .ok_or_else(|| unresolved(&hop, format!("unknown function id {vnf_id}")))?;
        let descriptor = *catalogue
            .descriptors
            .get(name)
            .ok_or_else(|| unresolved(&hop, format!("no descriptor for function {name}")))?;
        let vnfd: &VnfDescriptor = &payload.vnfds[descriptor];
        let record = *catalogue
            .records
            .get(vnfd.reference())
            .ok_or_else(|| unresolved(&hop, format!("no record for descriptor {}", vnfd.reference())))?;

        let instance = vnfd
            .instance_uuid
            .as_deref()
            .ok_or_else(|| unresolved(&hop, format!("descriptor {name} has no instance_uuid")))?;
        let compute = resolver
            .compute_for_function(instance)
            .await?
            .ok_or_else(|| unplaced(&hop, format!("can't find VIM where function instance {instance} is deployed")))?;
        let network = resolver
            .network_for_compute(&compute)
            .await?
            .ok_or_else(|| unplaced(&hop, format!("no network VIM linked to compute VIM {compute}")))?;

        let group = match groups.iter().position(|g| g.network_vim_uuid == network) {
            Some(index) => &mut groups[index],
            None => {
                groups.push(Group {
                    network_vim_uuid: network,
                    hops: Vec::new(),
                    descriptors: Vec::new(),
                    records: Vec::new(),
                });
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };
        group.hops.push(hop);
        if !group.descriptors.contains(&descriptor) {
            group.descriptors.push(descriptor);
        }
        if !group.records.contains(&record) {
            group.records.push(record);
        }
    }
    Ok(groups)
}

fn sub_request(
    payload: &NetworkConfigurePayload,
    graph: &ForwardingGraph,
    path: &NetworkForwardingPath,
    group: Group,
) -> SubRequest {
    let nsd = &payload.nsd;
    let trimmed = ServiceDescriptor {
        uuid: nsd.uuid.clone(),
        instance_uuid: Some(payload.service_instance_id.clone()),
        name: nsd.name.clone(),
        vendor: nsd.vendor.clone(),
        version: nsd.version.clone(),
        network_functions: nsd.network_functions.clone(),
        connection_points: nsd.connection_points.clone(),
        forwarding_graphs: vec![ForwardingGraph {
            fg_id: graph.fg_id.clone(),
            network_forwarding_paths: vec![NetworkForwardingPath {
                fp_id: path.fp_id.clone(),
                policy: path.policy.clone(),
                connection_points: group.hops,
            }],
            ..Default::default()
        }],
    };

    let vnfds: Vec<VnfDescriptor> = group
        .descriptors
        .iter()
        .map(|&i| payload.vnfds[i].clone())
        .collect();
    let vnfrs: Vec<VnfRecord> = group
        .records
        .iter()
        .map(|&i| payload.vnfrs[i].clone())
        .collect();

    SubRequest {
        network_vim_uuid: group.network_vim_uuid,
        payload: NetworkConfigurePayload {
            service_instance_id: payload.service_instance_id.clone(),
            nsd: trimmed,
            vnfds,
            vnfrs,
            nap: payload.nap.clone(),
        },
    }
}

async fn configure_one(request: &SubRequest, ctx: &ProcessorContext) -> CallResult<()> {
    let network = ctx.bay.get_network(&request.network_vim_uuid).await?;
    ctx.bounded("configure", network.configure(&request.payload))
        .await
}

async fn deconfigure_one(request: &SubRequest, ctx: &ProcessorContext) -> CallResult<()> {
    let network = ctx.bay.get_network(&request.network_vim_uuid).await?;
    ctx.bounded("deconfigure", network.deconfigure(&request.payload.service_instance_id))
        .await
}

/// Best-effort deconfigure of groups configured before a failure
async fn compensate(configured: &[&SubRequest], ctx: &ProcessorContext) {
    for request in configured {
        let instance = &request.payload.service_instance_id;
        match deconfigure_one(request, ctx).await {
            Ok(()) => info!(vim = %request.network_vim_uuid, %instance, "Compensated configured group"),
            Err(e) => warn!(vim = %request.network_vim_uuid, %instance, error = %e, "Compensation failed"),
        }
    }
}

/// Configure every sub-request concurrently. The first failure is returned.
///
/// Groups still in flight when a failure arrives are run to completion, so
/// compensation sees every group a backend actually configured.
pub async fn dispatch(requests: &[SubRequest], ctx: &ProcessorContext) -> CallResult<()> {
    let mut in_flight: FuturesUnordered<_> = requests
        .iter()
        .map(|request| async move { (request, configure_one(request, ctx).await) })
        .collect();

    let mut configured: Vec<&SubRequest> = Vec::with_capacity(requests.len());
    let mut failure: Option<(&SubRequest, CallError)> = None;
    while let Some((request, outcome)) = in_flight.next().await {
        match outcome {
            Ok(()) => {
                debug!(vim = %request.network_vim_uuid, "Group configured");
                configured.push(request);
            }
            Err(e) if failure.is_none() => failure = Some((request, e)),
            Err(e) => warn!(vim = %request.network_vim_uuid, error = %e, "Further group failed"),
        }
    }

    match failure {
        None => Ok(()),
        Some((request, err)) => {
            warn!(
                vim = %request.network_vim_uuid,
                configured = configured.len(),
                error = %err,
                "Chain configuration failed"
            );
            if ctx.compensate_on_failure {
                compensate(&configured, ctx).await;
            }
            Err(err)
        }
    }
}
