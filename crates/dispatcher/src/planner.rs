use fleet_core::{
    CommandLine, CommandRequest, ExecutionPlan, FleetError, FleetResult, RouterDecision,
    MAX_COMMAND_TIMEOUT,
};

const BASE_TIMEOUT: f64 = 30.0;
const SECONDS_PER_CHAR: f64 = 0.5;
const MIN_TIMEOUT: f64 = 15.0;

/// 把路由决策变成具体的执行计划
#[derive(Debug, Default, Clone)]
pub struct ExecutionPlanner;

impl ExecutionPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(&self, request: &CommandRequest, decision: RouterDecision) -> FleetResult<ExecutionPlan> {
        let timeout = match request.timeout {
            Some(seconds) => {
                if !seconds.is_finite() || seconds <= 0.0 || seconds > MAX_COMMAND_TIMEOUT {
                    return Err(FleetError::validation(format!(
                        "timeout 必须大于0且不超过 {MAX_COMMAND_TIMEOUT} 秒"
                    )));
                }
                seconds
            }
            None => estimate_timeout(&request.command),
        };

        let reason = format!(
            "{} execution on {} with {:.0}s timeout ({})",
            decision.mode,
            decision.nodes.join(", "),
            timeout,
            if request.timeout.is_some() {
                "caller supplied"
            } else {
                "estimated from command length"
            }
        );

        Ok(ExecutionPlan {
            nodes: decision.nodes,
            mode: decision.mode,
            timeout,
            reason,
            router_reason: decision.reason,
        })
    }
}

/// 命令越长给的时间越多：`30 + 0.5 * 长度`，限制在 15 到 600 秒
pub fn estimate_timeout(command: &CommandLine) -> f64 {
    let length = command.repr().chars().count() as f64;
    (BASE_TIMEOUT + SECONDS_PER_CHAR * length).clamp(MIN_TIMEOUT, MAX_COMMAND_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::{ErrorKind, FanOutMode};

    fn decision() -> RouterDecision {
        RouterDecision {
            nodes: vec!["n1".to_string()],
            mode: FanOutMode::Single,
            reason: "Selected n1 based on lowest CPU utilization".to_string(),
        }
    }

    #[test]
    fn test_estimated_timeout() {
        // "echo hi" 共7个字符
        assert_eq!(estimate_timeout(&CommandLine::from("echo hi")), 33.5);
        let long = "x".repeat(5000);
        assert_eq!(estimate_timeout(&CommandLine::from(long.as_str())), 600.0);
    }

    #[test]
    fn test_explicit_timeout_wins() {
        let request = CommandRequest::new("echo hi").with_timeout(5.0);
        let plan = ExecutionPlanner::new().plan(&request, decision()).unwrap();
        assert_eq!(plan.timeout, 5.0);
        assert_eq!(plan.nodes, vec!["n1"]);
        assert!(plan.router_reason.contains("n1"));
    }

    #[test]
    fn test_invalid_explicit_timeout() {
        let request = CommandRequest::new("echo hi").with_timeout(601.0);
        let err = ExecutionPlanner::new().plan(&request, decision()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    }
}
