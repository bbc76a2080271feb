use std::sync::Arc;

use fleet_core::{CommandLine, ExecutionPlan, FleetError, FleetResult};
use tracing::warn;

use crate::registry::NodeRegistry;

/// 按节点允许列表划分后的计划节点
#[derive(Debug, Default)]
pub struct Screening {
    pub authorized: Vec<String>,
    pub rejected: Vec<(String, FleetError)>,
}

impl Screening {
    pub fn all_rejected(&self) -> bool {
        self.authorized.is_empty() && !self.rejected.is_empty()
    }
}

/// 分发前的集中命令检查
///
/// 只看可执行文件的基本名。允许列表为空的节点不做集中限制，
/// 节点自身在执行时还会再检查一次。
pub struct SecurityGate {
    registry: Arc<NodeRegistry>,
}

impl SecurityGate {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self { registry }
    }

    /// 计划中任一节点不允许该命令即失败
    pub fn authorize(&self, plan: &ExecutionPlan, command: &CommandLine) -> FleetResult<()> {
        let program = command.program_basename()?;
        for node_id in &plan.nodes {
            self.check(node_id, &program)?;
        }
        Ok(())
    }

    /// 逐节点检查，返回允许和拒绝的节点
    pub fn screen(&self, nodes: &[String], command: &CommandLine) -> FleetResult<Screening> {
        let program = command.program_basename()?;
        let mut screening = Screening::default();
        for node_id in nodes {
            match self.check(node_id, &program) {
                Ok(()) => screening.authorized.push(node_id.clone()),
                Err(e @ FleetError::CommandNotAllowed { .. }) => {
                    screening.rejected.push((node_id.clone(), e));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(screening)
    }

    fn check(&self, node_id: &str, program: &str) -> FleetResult<()> {
        let definition = self.registry.get_definition(node_id)?;
        if definition.allows_command(program) {
            return Ok(());
        }
        warn!("命令被安全检查拒绝: node_id={}, command={}", node_id, program);
        Err(FleetError::CommandNotAllowed {
            node_id: node_id.to_string(),
            command: program.to_string(),
        })
    }
}
