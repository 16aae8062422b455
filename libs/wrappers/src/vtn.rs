//! WAN-controller (VTN) driver
//!
//! The VTN flow server keeps one rule per steering request under
//! `http://<endpoint>:5000/flowchart/`. Rule ids are the instance digest
//! followed by a running index, so every rule of an instance can be found by
//! prefix and removed one by one.

use crate::error::{Result, WrapperError};
use crate::traits::WimWrapper;
use adaptor_config::protocol::vtn::FLOWCHART_PATH;
use adaptor_config::SegmentConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use types::WrapperConfiguration;
use uuid::Uuid;

/// Hop of a VTN rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedSegment {
    pub port: String,
    pub order: u32,
}

/// Rule as stored by the flow server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VtnRule {
    pub instance_id: String,
    #[serde(default)]
    pub in_seg: Option<String>,
    #[serde(default)]
    pub out_seg: Option<String>,
    #[serde(default)]
    pub ports: Vec<OrderedSegment>,
}

/// Hex of the XOR of the uuid's high and low 64 bits, without leading zeros
pub fn instance_digest(instance_id: &str) -> Result<String> {
    let uuid = Uuid::parse_str(instance_id).map_err(|e| {
        WrapperError::validation(format!("instance id '{instance_id}' is not a uuid: {e}"))
    })?;
    let bits = uuid.as_u128();
    let msb = (bits >> 64) as u64;
    let lsb = bits as u64;
    Ok(format!("{:x}", msb ^ lsb))
}

#[derive(Debug)]
pub struct VtnWrapper {
    config: WrapperConfiguration,
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    default_segments: SegmentConfig,
}

impl VtnWrapper {
    pub fn new(
        config: WrapperConfiguration,
        client: reqwest::Client,
        port: u16,
        timeout: Duration,
        default_segments: SegmentConfig,
    ) -> Self {
        let base_url = format!("http://{}:{}{}", config.endpoint, port, FLOWCHART_PATH);
        Self {
            config,
            client,
            base_url,
            timeout,
            default_segments,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Rules currently installed on the flow server
    pub async fn list_rules(&self) -> Result<Vec<VtnRule>> {
        debug!(wim = %self.config.uuid, url = %self.base_url, "[VTN] listing rules");
        let response = self
            .client
            .get(&self.base_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| WrapperError::http("VTN rule list", self.timeout, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(WrapperError::backend(
                self.config.uuid.clone(),
                format!("rule list returned {status}"),
            ));
        }
        response
            .json::<Vec<VtnRule>>()
            .await
            .map_err(|e| WrapperError::backend_with_source(self.config.uuid.clone(), "invalid rule list", e))
    }

    async fn rules_for(&self, digest: &str) -> Result<usize> {
        Ok(self
            .list_rules()
            .await?
            .iter()
            .filter(|rule| rule.instance_id.starts_with(digest))
            .count())
    }
}

#[async_trait]
impl WimWrapper for VtnWrapper {
    fn config(&self) -> &WrapperConfiguration {
        &self.config
    }

    async fn configure_network(
        &self,
        instance_id: &str,
        ingress: Option<&str>,
        egress: Option<&str>,
        vim_addresses: &[String],
    ) -> Result<()> {
        let (ingress, egress) = match (ingress, egress) {
            (Some(i), Some(e)) => (i.to_string(), e.to_string()),
            _ => {
                warn!(wim = %self.config.uuid, "NAP not specified, using default segments");
                (
                    self.default_segments.ingress.clone(),
                    self.default_segments.egress.clone(),
                )
            }
        };

        let digest = instance_digest(instance_id)?;
        let index = self.rules_for(&digest).await?;
        let rule = VtnRule {
            instance_id: format!("{digest}{index}"),
            in_seg: Some(ingress),
            out_seg: Some(egress),
            ports: vim_addresses
                .iter()
                .enumerate()
                .map(|(order, port)| OrderedSegment {
                    port: port.clone(),
                    order: order as u32,
                })
                .collect(),
        };

        debug!(wim = %self.config.uuid, rule = %rule.instance_id, "[VTN] creating rule");
        let response = self
            .client
            .post(&self.base_url)
            .timeout(self.timeout)
            .json(&rule)
            .send()
            .await
            .map_err(|e| WrapperError::http("VTN rule creation", self.timeout, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            error!(wim = %self.config.uuid, %status, "Error while configuring VTN WIM");
            return Err(WrapperError::backend(
                self.config.uuid.clone(),
                format!("rule creation returned {status}"),
            ));
        }

        info!(wim = %self.config.uuid, rule = %rule.instance_id, "VTN-WIM configuration completed");
        Ok(())
    }

    async fn remove_network(&self, instance_id: &str) -> Result<()> {
        let digest = instance_digest(instance_id)?;
        let count = self.rules_for(&digest).await?;
        if count == 0 {
            debug!(wim = %self.config.uuid, instance_id, "[VTN] no rule for this instance");
            return Ok(());
        }

        let mut failed = Vec::new();
        for index in 0..count {
            let url = format!("{}{}{}", self.base_url, digest, index);
            let outcome = self
                .client
                .delete(&url)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| WrapperError::http("VTN rule deletion", self.timeout, e));

            match outcome {
                Ok(response) if response.status() == StatusCode::OK => {
                    debug!(wim = %self.config.uuid, index, "[VTN] rule removed");
                }
                Ok(response) => {
                    error!(
                        wim = %self.config.uuid,
                        instance_id,
                        index,
                        status = %response.status(),
                        "Error while deconfiguring VTN WIM"
                    );
                    failed.push(index);
                }
                Err(e) => {
                    error!(wim = %self.config.uuid, instance_id, index, error = %e, "Rule deletion failed");
                    failed.push(index);
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(WrapperError::backend(
                self.config.uuid.clone(),
                format!("failed to remove rules {failed:?} of {digest}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use types::{Vendor, WrapperKind};

    const INSTANCE: &str = "123e4567-e89b-12d3-a456-426614174000";

    fn wim(server: &Server) -> VtnWrapper {
        let (host, port) = server
            .host_with_port()
            .rsplit_once(':')
            .map(|(h, p)| (h.to_string(), p.parse::<u16>().unwrap()))
            .unwrap();
        let config = WrapperConfiguration {
            uuid: "wim-1".into(),
            kind: WrapperKind::Wim,
            vendor: Vendor::Vtn,
            endpoint: host,
            auth_user: String::new(),
            auth_secret: String::new(),
            configuration: serde_json::json!({}),
            name: "vtn".into(),
            city: String::new(),
            country: String::new(),
            domain: String::new(),
        };
        VtnWrapper::new(
            config,
            reqwest::Client::new(),
            port,
            Duration::from_secs(5),
            SegmentConfig::default(),
        )
    }

    #[test]
    fn test_digest_is_xor_of_halves() {
        // 0x123e4567e89b12d3 ^ 0xa456426614174000
        assert_eq!(instance_digest(INSTANCE).unwrap(), "b6680701fc8c52d3");
        assert!(instance_digest("not-a-uuid").is_err());
    }

    #[tokio::test]
    async fn test_configure_posts_next_rule_index() {
        let mut server = Server::new_async().await;
        let digest = instance_digest(INSTANCE).unwrap();
        let existing = format!(r#"[{{"instance_id":"{digest}0","ports":[]}},{{"instance_id":"ffff0","ports":[]}}]"#);

        let list = server
            .mock("GET", "/flowchart/")
            .with_status(200)
            .with_body(existing)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/flowchart/")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "instance_id": format!("{digest}1"),
                "in_seg": "10.0.1.0/24",
                "out_seg": "10.0.2.0/24",
                "ports": [
                    { "port": "10.1.0.1", "order": 0 },
                    { "port": "10.2.0.1", "order": 1 }
                ]
            })))
            .with_status(200)
            .create_async()
            .await;

        wim(&server)
            .configure_network(
                INSTANCE,
                Some("10.0.1.0/24"),
                Some("10.0.2.0/24"),
                &["10.1.0.1".to_string(), "10.2.0.1".to_string()],
            )
            .await
            .unwrap();

        list.assert_async().await;
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_200_is_backend_error() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/flowchart/")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let _create = server
            .mock("POST", "/flowchart/")
            .with_status(500)
            .create_async()
            .await;

        let err = wim(&server)
            .configure_network(INSTANCE, None, None, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WrapperError::Backend { .. }));
    }

    #[tokio::test]
    async fn test_remove_deletes_every_rule_of_the_instance() {
        let mut server = Server::new_async().await;
        let digest = instance_digest(INSTANCE).unwrap();
        let existing = format!(
            r#"[{{"instance_id":"{digest}0"}},{{"instance_id":"{digest}1"}},{{"instance_id":"abc0"}}]"#
        );

        let _list = server
            .mock("GET", "/flowchart/")
            .with_status(200)
            .with_body(existing)
            .create_async()
            .await;
        let first = server
            .mock("DELETE", format!("/flowchart/{digest}0").as_str())
            .with_status(200)
            .create_async()
            .await;
        let second = server
            .mock("DELETE", format!("/flowchart/{digest}1").as_str())
            .with_status(200)
            .create_async()
            .await;

        wim(&server).remove_network(INSTANCE).await.unwrap();
        first.assert_async().await;
        second.assert_async().await;
    }
}
