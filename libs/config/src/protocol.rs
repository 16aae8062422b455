//! Bus topics and backend wire constants
//!
//! Topic strings are matched structurally by the dispatcher; the constants here
//! are the fixed names the adaptor itself publishes on or listens for.

/// Root segment of every infrastructure call
pub const INFRASTRUCTURE_ROOT: &str = "infrastructure";

/// Plugin lifecycle topics
pub mod plugin {
    pub const REGISTER: &str = "platform.management.plugin.register";
    pub const DEREGISTER: &str = "platform.management.plugin.deregister";

    /// Heartbeat topic for a registered plugin
    pub fn heartbeat_topic(plugin_uuid: &str) -> String {
        format!("platform.management.plugin.{plugin_uuid}.heartbeat")
    }
}

/// Identity announced on registration
pub mod identity {
    pub const APP_ID: &str = "sonata.kernel.InfrAdaptor";
    pub const DESCRIPTION: &str = "Service Platform Infrastructure Adaptor";
}

/// Software-switch SFC agent
pub mod ovs {
    pub const AGENT_PORT: u16 = 55555;
    /// Upper bound on a single agent frame
    pub const MAX_FRAME_SIZE: usize = 1024 * 1024;
    pub const SUCCESS_REPLY: &str = "SUCCESS";
}

/// WAN controller flow server
pub mod vtn {
    pub const SERVER_PORT: u16 = 5000;
    pub const FLOWCHART_PATH: &str = "/flowchart/";
}

/// Remote service-platform gatekeeper
pub mod gatekeeper {
    pub const PORT: u16 = 32001;
    pub const SESSIONS_PATH: &str = "/api/v2/sessions";
    pub const SERVICES_PATH: &str = "/api/v2/services";
    pub const REQUESTS_PATH: &str = "/api/v2/requests";
    pub const SERVICE_RECORDS_PATH: &str = "/api/v2/records/services";
    pub const FUNCTION_RECORDS_PATH: &str = "/api/v2/records/functions";
    pub const VIMS_PATH: &str = "/api/v2/vims";
}

/// Bus bridge framing
pub mod bus {
    /// Upper bound on one framed envelope
    pub const MAX_ENVELOPE_SIZE: usize = 16 * 1024 * 1024;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_topic() {
        assert_eq!(
            plugin::heartbeat_topic("1234"),
            "platform.management.plugin.1234.heartbeat"
        );
    }
}
