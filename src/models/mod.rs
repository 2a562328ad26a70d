//! Reference Model
//!
//! A bundled interfaces and system model with its hooks and validators,
//! used by the CLI and as a worked example of every hook kind.

pub mod interfaces;
pub mod system;

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::{Engine, EngineBuilder};
use crate::errors::XlateResult;
use crate::schema::SchemaNode;
use crate::store::KvStore;
use crate::transformer::HookRegistry;
use crate::validation::ValidationEngine;

/// Schema roots with the hooks and validators they name
pub struct ReferenceModel {
    pub roots: Vec<SchemaNode>,
    pub hooks: HookRegistry,
    pub validators: ValidationEngine,
}

impl ReferenceModel {
    pub fn builder(self, config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
            .schemas(self.roots)
            .hooks(self.hooks)
            .validators(self.validators)
    }
}

pub fn reference_model() -> ReferenceModel {
    let mut hooks = HookRegistry::new();
    let mut validators = ValidationEngine::new();
    interfaces::register(&mut hooks, &mut validators);
    system::register(&mut hooks, &mut validators);

    ReferenceModel {
        roots: vec![interfaces::schema(), system::schema()],
        hooks,
        validators,
    }
}

/// Engine over the reference model and `store`
pub fn reference_engine(config: EngineConfig, store: Arc<dyn KvStore>) -> XlateResult<Engine> {
    reference_model().builder(config).store(store).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_model_builds() {
        let engine = reference_model().builder(EngineConfig::default()).build().unwrap();
        let index = engine.index();
        for path in [
            "/interfaces/interface/ipv4/addresses/address/config/prefix-length",
            "/interfaces/interface/ethernet/switched-vlan/config/trunk-vlans",
            "/system/ntp/servers/server/config/source-address",
            "/system/ntp/servers/server/state/network-instance",
            "/system/aaa/server-groups/server-group/servers/server/config/port",
            "/system/logging/remote-servers/remote-server/selectors/selector/config/severity",
            "/system/processes/process/state/args",
        ] {
            assert!(index.lookup(path).is_some(), "{} is missing", path);
        }
    }
}
