use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use fleet_core::{CommandLine, CommandRequest, ListFilesRequest, SyncStrategy};

/// 解析后的子命令
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// 运行节点HTTP服务器
    ServeNode { node_config: String },
    /// 持续刷新节点健康状态，直到收到关闭信号
    Monitor,
    Nodes,
    Info { node_id: String },
    Ls { node_id: String, request: ListFilesRequest },
    Exec(CommandRequest),
    Sync {
        source_node: String,
        source_path: String,
        targets: Vec<String>,
        strategy: SyncStrategy,
    },
    Probe { message: String },
}

/// 全局选项
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalOptions {
    pub config: String,
    pub log_level: String,
    pub log_format: String,
    pub metrics_addr: Option<String>,
}

pub fn build_cli() -> Command {
    Command::new("fleet")
        .version(env!("CARGO_PKG_VERSION"))
        .about("多节点文件与命令编排系统")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("编排器配置文件路径")
                .default_value("config/fleet.toml")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .default_value("info")
                .global(true),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .default_value("pretty")
                .global(true),
        )
        .arg(
            Arg::new("metrics-addr")
                .long("metrics-addr")
                .value_name("ADDR")
                .help("Prometheus指标监听地址，例如 127.0.0.1:9100")
                .global(true),
        )
        .subcommand(
            Command::new("serve-node").about("运行节点HTTP服务器").arg(
                Arg::new("node-config")
                    .short('n')
                    .long("node-config")
                    .value_name("FILE")
                    .help("节点配置文件路径")
                    .required(true),
            ),
        )
        .subcommand(Command::new("monitor").about("持续刷新节点健康状态"))
        .subcommand(Command::new("nodes").about("列出节点及其健康状态"))
        .subcommand(
            Command::new("info")
                .about("查询节点信息")
                .arg(Arg::new("node").value_name("NODE").required(true)),
        )
        .subcommand(
            Command::new("ls")
                .about("列举节点上的文件")
                .arg(
                    Arg::new("node")
                        .value_name("NODE")
                        .help("节点ID，auto 表示选择负载最低的健康节点")
                        .required(true),
                )
                .arg(Arg::new("path").value_name("PATH").default_value("."))
                .arg(
                    Arg::new("recursive")
                        .short('r')
                        .long("recursive")
                        .action(ArgAction::SetTrue),
                )
                .arg(Arg::new("pattern").short('p').long("pattern").value_name("GLOB"))
                .arg(
                    Arg::new("hash")
                        .long("hash")
                        .help("计算SHA-256")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_name("N")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("exec")
                .about("在选出的节点上执行命令")
                .arg(Arg::new("description").short('d').long("description").value_name("TEXT"))
                .arg(
                    Arg::new("tag")
                        .short('t')
                        .long("tag")
                        .value_name("TAG")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("parallel")
                        .short('P')
                        .long("parallel")
                        .value_name("N")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .value_name("SECONDS")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(Arg::new("cwd").long("cwd").value_name("DIR"))
                .arg(
                    Arg::new("env")
                        .short('e')
                        .long("env")
                        .value_name("KEY=VALUE")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("command")
                        .value_name("COMMAND")
                        .num_args(1..)
                        .trailing_var_arg(true)
                        .allow_hyphen_values(true)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("sync")
                .about("把源节点上的路径同步到其他节点")
                .arg(Arg::new("source").value_name("SOURCE_NODE").required(true))
                .arg(Arg::new("path").value_name("PATH").required(true))
                .arg(
                    Arg::new("to")
                        .long("to")
                        .value_name("NODE")
                        .action(ArgAction::Append)
                        .required(true),
                )
                .arg(
                    Arg::new("strategy")
                        .long("strategy")
                        .value_parser(["mirror", "append"])
                        .default_value("append"),
                ),
        )
        .subcommand(
            Command::new("probe")
                .about("检查叙述器是否可用")
                .arg(Arg::new("message").value_name("MESSAGE").default_value("ping")),
        )
}

pub fn global_options(matches: &ArgMatches) -> GlobalOptions {
    GlobalOptions {
        config: string_arg(matches, "config").unwrap_or_else(|| "config/fleet.toml".to_string()),
        log_level: string_arg(matches, "log-level").unwrap_or_else(|| "info".to_string()),
        log_format: string_arg(matches, "log-format").unwrap_or_else(|| "pretty".to_string()),
        metrics_addr: string_arg(matches, "metrics-addr"),
    }
}

pub fn parse_operation(matches: &ArgMatches) -> Result<Operation> {
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("缺少子命令"))?;

    let operation = match name {
        "serve-node" => Operation::ServeNode {
            node_config: required(sub, "node-config")?,
        },
        "monitor" => Operation::Monitor,
        "nodes" => Operation::Nodes,
        "info" => Operation::Info {
            node_id: required(sub, "node")?,
        },
        "ls" => {
            let mut request = ListFilesRequest::new(required(sub, "path")?)
                .recursive(sub.get_flag("recursive"))
                .with_hash(sub.get_flag("hash"));
            request.pattern = string_arg(sub, "pattern");
            request.limit = sub.get_one::<usize>("limit").copied();
            Operation::Ls {
                node_id: required(sub, "node")?,
                request,
            }
        }
        "exec" => Operation::Exec(exec_request(sub)?),
        "sync" => Operation::Sync {
            source_node: required(sub, "source")?,
            source_path: required(sub, "path")?,
            targets: strings(sub, "to"),
            strategy: required(sub, "strategy")?.parse()?,
        },
        "probe" => Operation::Probe {
            message: required(sub, "message")?,
        },
        other => return Err(anyhow!("未知子命令: {other}")),
    };
    Ok(operation)
}

fn exec_request(sub: &ArgMatches) -> Result<CommandRequest> {
    let mut words = strings(sub, "command");
    // 单个参数按shell风格字符串处理，多个参数按参数数组处理
    let command = if words.len() == 1 {
        CommandLine::Shell(words.remove(0))
    } else {
        CommandLine::Argv(words)
    };

    let mut env = BTreeMap::new();
    for pair in strings(sub, "env") {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("环境变量格式应为 KEY=VALUE: {pair}"))?;
        env.insert(key.to_string(), value.to_string());
    }

    let mut request = CommandRequest::new(command)
        .with_tags(strings(sub, "tag"))
        .with_parallelism(sub.get_one::<usize>("parallel").copied().unwrap_or(1));
    if let Some(description) = string_arg(sub, "description") {
        request = request.with_description(description);
    }
    if let Some(timeout) = sub.get_one::<f64>("timeout") {
        request = request.with_timeout(*timeout);
    }
    request.cwd = string_arg(sub, "cwd");
    request.env = env;
    Ok(request)
}

fn string_arg(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.get_one::<String>(id).cloned()
}

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    string_arg(matches, id).ok_or_else(|| anyhow!("缺少参数: {id}"))
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}
