pub mod node;
pub mod orchestrator;

pub use node::NodeConfig;
pub use orchestrator::{
    AuditConfig, NarratorConfig, NarratorKind, NodeDefinition, OrchestratorConfig, TransportKind,
};
