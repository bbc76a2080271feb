use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use fleet::app::{serve_node, Application};
use fleet::cli::{build_cli, global_options, parse_operation, Operation};
use fleet::shutdown::{wait_for_shutdown_signal, ShutdownManager};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let options = global_options(&matches);

    // 标准输出留给JSON结果，日志写到标准错误
    init_logging(&options.log_level, &options.log_format)?;

    if let Some(addr) = &options.metrics_addr {
        init_metrics(addr)?;
    }

    match parse_operation(&matches)? {
        Operation::ServeNode { node_config } => {
            info!("启动节点服务器，配置文件: {node_config}");
            run_until_signal(|shutdown_rx| async move { serve_node(node_config, shutdown_rx).await }).await
        }
        Operation::Monitor => {
            let app = Application::load(&options.config).await?;
            run_until_signal(|shutdown_rx| async move { app.run_monitor(shutdown_rx).await }).await
        }
        operation => {
            let app = Application::load(&options.config).await?;
            let value = app.execute(operation).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
    }
}

/// 在后台运行长期任务，收到信号后触发关闭并等待它退出
async fn run_until_signal<F, Fut>(task: F) -> Result<()>
where
    F: FnOnce(tokio::sync::broadcast::Receiver<()>) -> Fut,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    let shutdown_manager = ShutdownManager::new();
    let shutdown_rx = shutdown_manager.subscribe().await;
    let mut handle = tokio::spawn(task(shutdown_rx));

    tokio::select! {
        result = &mut handle => {
            return result.context("后台任务异常退出")?;
        }
        _ = wait_for_shutdown_signal() => {
            info!("收到关闭信号，开始优雅关闭...");
        }
    }

    shutdown_manager.shutdown().await;

    match tokio::time::timeout(Duration::from_secs(30), handle).await {
        Ok(Ok(result)) => {
            if let Err(e) = &result {
                error!("关闭过程中发生错误: {e:#}");
            } else {
                info!("已优雅关闭");
            }
            result
        }
        Ok(Err(e)) => Err(e).context("后台任务异常退出"),
        Err(_) => {
            warn!("关闭超时，强制退出");
            Ok(())
        }
    }
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        _ => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .context("初始化日志格式失败")?;
        }
    }

    Ok(())
}

/// 启动Prometheus指标端点
fn init_metrics(addr: &str) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("无效的指标监听地址: {addr}"))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("启动Prometheus指标端点失败")?;
    info!("Prometheus指标端点: http://{addr}/metrics");
    Ok(())
}
