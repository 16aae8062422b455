//! `infrastructure.wan.{configure,deconfigure}`
//!
//! VIMs of the request are sorted, grouped by the WIM they are attached to,
//! and every WIM receives one rule per (ingress, egress) pair listing the
//! addresses of its VIMs in that order. Without NAPs each WIM gets a single
//! rule with no segments.

use crate::error::{CallError, CallResult};
use crate::processor::{ProcessorContext, Reply};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};
use types::{ApiResponse, ServicePlatformMessage, WanConfigurePayload, WanDeconfigurePayload};

/// Segment pairs to install. `None` when the request carries no NAP.
fn segment_pairs(payload: &WanConfigurePayload) -> Vec<(Option<&str>, Option<&str>)> {
    match &payload.nap {
        None => vec![(None, None)],
        Some(nap) => nap
            .ingresses
            .iter()
            .flat_map(|ingress| {
                nap.egresses
                    .iter()
                    .map(move |egress| (Some(ingress.nap.as_str()), Some(egress.nap.as_str())))
            })
            .collect(),
    }
}

pub async fn configure(message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    let payload: WanConfigurePayload = message.decode()?;

    let unique: HashSet<&String> = payload.vim_list.iter().collect();
    if unique.len() < payload.vim_list.len() {
        return Reply::api(ApiResponse::error("Duplicate VIMs in vim_list"));
    }

    let mut vims = payload.vim_list.clone();
    vims.sort();

    // wim uuid -> addresses of its VIMs, in sorted VIM order
    let mut per_wim: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for vim in &vims {
        let attachment = ctx.bay.wim_for_vim(vim).await?.ok_or_else(|| {
            CallError::addressing(format!("Can't find the WIM to which VIM {vim} is attached"))
        })?;
        per_wim
            .entry(attachment.wim_uuid)
            .or_default()
            .push(attachment.vim_address);
    }

    for (ingress, egress) in segment_pairs(&payload) {
        for (wim_uuid, addresses) in &per_wim {
            let wim = ctx.bay.get_wim(wim_uuid).await?;
            debug!(
                wim = %wim_uuid,
                instance = %payload.instance_id,
                ingress = ingress.unwrap_or("-"),
                egress = egress.unwrap_or("-"),
                vims = addresses.len(),
                "Configuring WAN rule"
            );
            ctx.bounded(
                "configure_network",
                wim.configure_network(&payload.instance_id, ingress, egress, addresses),
            )
            .await?;
        }
    }

    info!(instance = %payload.instance_id, wims = per_wim.len(), "WAN configured");
    Reply::api(ApiResponse::completed())
}

/// Remove the instance's rules from every registered WIM
pub async fn deconfigure(message: &ServicePlatformMessage, ctx: &ProcessorContext) -> CallResult<Reply> {
    let payload: WanDeconfigurePayload = message.decode()?;

    let mut failures = Vec::new();
    for config in ctx.bay.list_wim().await? {
        let wim = ctx.bay.get_wim(&config.uuid).await?;
        if let Err(e) = ctx
            .bounded("remove_network", wim.remove_network(&payload.instance_id))
            .await
        {
            failures.push(format!("{}: {e}", config.uuid));
        }
    }

    if !failures.is_empty() {
        return Reply::api(ApiResponse::error(failures.join("; ")));
    }
    info!(instance = %payload.instance_id, "WAN deconfigured");
    Reply::api(ApiResponse::completed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{NapObject, NetworkAttachmentPoints};

    fn nap(segment: &str) -> NapObject {
        NapObject {
            location: String::new(),
            nap: segment.into(),
        }
    }

    #[test]
    fn test_segment_pairs_cross_product() {
        let payload = WanConfigurePayload {
            instance_id: "i".into(),
            vim_list: Vec::new(),
            nap: Some(NetworkAttachmentPoints {
                ingresses: vec![nap("a"), nap("b")],
                egresses: vec![nap("x")],
            }),
        };
        assert_eq!(
            segment_pairs(&payload),
            vec![(Some("a"), Some("x")), (Some("b"), Some("x"))]
        );
    }

    #[test]
    fn test_no_nap_is_one_unsegmented_rule() {
        let payload = WanConfigurePayload {
            instance_id: "i".into(),
            vim_list: Vec::new(),
            nap: None,
        };
        assert_eq!(segment_pairs(&payload), vec![(None, None)]);
    }
}
