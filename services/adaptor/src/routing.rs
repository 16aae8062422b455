//! Topic routing table
//!
//! Topics are matched on their dot-separated structure, top-down:
//!
//! ```text
//! infrastructure.management.<kind>.<verb>   kind ∈ compute|network|storage|wan
//! infrastructure.function.<verb>            deploy | scale
//! infrastructure.cloud_service.<verb>       deploy
//! infrastructure.service.<verb>             deploy | remove | prepare
//!                                           chain.configure | chain.deconfigure
//! infrastructure.wan.<verb>                 configure | deconfigure
//! infrastructure.monitoring.*
//! ```

use adaptor_config::protocol::INFRASTRUCTURE_ROOT;
use std::fmt;
use types::WrapperKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagementVerb {
    Add,
    Remove,
    List,
    ResourceAvailability,
    Attach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionVerb {
    Deploy,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceVerb {
    Deploy,
    Remove,
    Prepare,
    ChainConfigure,
    ChainDeconfigure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WanVerb {
    Configure,
    Deconfigure,
}

/// Processor selected for an inbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Management { kind: WrapperKind, verb: ManagementVerb },
    Function(FunctionVerb),
    CloudServiceDeploy,
    Service(ServiceVerb),
    Wan(WanVerb),
    Monitoring,
}

impl Route {
    /// Route for `topic`, or `None` when no rule matches
    pub fn parse(topic: &str) -> Option<Self> {
        let rest = topic.strip_prefix(INFRASTRUCTURE_ROOT)?.strip_prefix('.')?;
        let segments: Vec<&str> = rest.split('.').collect();

        match segments.as_slice() {
            ["management", kind, verb] => Self::management(kind, verb),
            ["function", "deploy"] => Some(Self::Function(FunctionVerb::Deploy)),
            ["function", "scale"] => Some(Self::Function(FunctionVerb::Scale)),
            ["cloud_service", "deploy"] => Some(Self::CloudServiceDeploy),
            ["service", "deploy"] => Some(Self::Service(ServiceVerb::Deploy)),
            ["service", "remove"] => Some(Self::Service(ServiceVerb::Remove)),
            ["service", "prepare"] => Some(Self::Service(ServiceVerb::Prepare)),
            ["service", "chain", "configure"] => Some(Self::Service(ServiceVerb::ChainConfigure)),
            ["service", "chain", "deconfigure"] => {
                Some(Self::Service(ServiceVerb::ChainDeconfigure))
            }
            ["wan", "configure"] => Some(Self::Wan(WanVerb::Configure)),
            ["wan", "deconfigure"] => Some(Self::Wan(WanVerb::Deconfigure)),
            ["monitoring", ..] => Some(Self::Monitoring),
            _ => None,
        }
    }

    fn management(kind: &str, verb: &str) -> Option<Self> {
        let kind = match kind {
            "compute" => WrapperKind::Compute,
            "network" => WrapperKind::Network,
            "storage" => WrapperKind::Storage,
            "wan" => WrapperKind::Wim,
            _ => return None,
        };
        let verb = match (kind, verb) {
            (_, "add") => ManagementVerb::Add,
            (_, "remove") => ManagementVerb::Remove,
            (_, "list") => ManagementVerb::List,
            (WrapperKind::Compute, "resourceAvailability") => ManagementVerb::ResourceAvailability,
            (WrapperKind::Wim, "attach") => ManagementVerb::Attach,
            _ => return None,
        };
        Some(Self::Management { kind, verb })
    }

    /// Stable label for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Management { verb, .. } => match verb {
                ManagementVerb::Add => "management.add",
                ManagementVerb::Remove => "management.remove",
                ManagementVerb::List => "management.list",
                ManagementVerb::ResourceAvailability => "management.resource_availability",
                ManagementVerb::Attach => "management.attach",
            },
            Self::Function(FunctionVerb::Deploy) => "function.deploy",
            Self::Function(FunctionVerb::Scale) => "function.scale",
            Self::CloudServiceDeploy => "cloud_service.deploy",
            Self::Service(ServiceVerb::Deploy) => "service.deploy",
            Self::Service(ServiceVerb::Remove) => "service.remove",
            Self::Service(ServiceVerb::Prepare) => "service.prepare",
            Self::Service(ServiceVerb::ChainConfigure) => "service.chain.configure",
            Self::Service(ServiceVerb::ChainDeconfigure) => "service.chain.deconfigure",
            Self::Wan(WanVerb::Configure) => "wan.configure",
            Self::Wan(WanVerb::Deconfigure) => "wan.deconfigure",
            Self::Monitoring => "monitoring",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Management { kind, .. } => write!(f, "{} ({kind})", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_management_routes() {
        assert_eq!(
            Route::parse("infrastructure.management.compute.add"),
            Some(Route::Management {
                kind: WrapperKind::Compute,
                verb: ManagementVerb::Add
            })
        );
        assert_eq!(
            Route::parse("infrastructure.management.wan.attach"),
            Some(Route::Management {
                kind: WrapperKind::Wim,
                verb: ManagementVerb::Attach
            })
        );
        // Resource availability only exists for compute
        assert_eq!(
            Route::parse("infrastructure.management.network.resourceAvailability"),
            None
        );
        assert_eq!(Route::parse("infrastructure.management.compute.attach"), None);
    }

    #[test]
    fn test_structural_not_prefix_matching() {
        assert_eq!(Route::parse("infrastructure.function.deploy.extra"), None);
        assert_eq!(Route::parse("infrastructurex.function.deploy"), None);
        assert_eq!(Route::parse("infrastructure.service.chain"), None);
        assert_eq!(
            Route::parse("infrastructure.service.chain.deconfigure"),
            Some(Route::Service(ServiceVerb::ChainDeconfigure))
        );
    }

    #[test]
    fn test_monitoring_matches_any_suffix() {
        assert_eq!(
            Route::parse("infrastructure.monitoring.vim.list"),
            Some(Route::Monitoring)
        );
        assert_eq!(Route::parse("infrastructure.monitoring"), None);
    }
}
