//! HQMS服务器主程序

mod config;

use clap::Parser;
use crate::config::HqmsConfig;
use hqms_queue::{QueueEngine, SilentAnnouncer, WaitTimeRefresher};
use hqms_storage::SnapshotStore;
use hqms_web::WebServer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// HQMS服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "hqms-server")]
#[command(about = "HQMS (Hospital Queue Management System) 排队叫号服务器")]
struct Args {
    /// 监听主机
    #[arg(long)]
    host: Option<String>,

    /// 服务器端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 快照文件路径
    #[arg(short, long)]
    snapshot_path: Option<String>,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(&args.log_level)
        .init();

    info!("启动HQMS排队叫号服务器...");

    // 加载配置，命令行参数优先
    let mut config = HqmsConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(snapshot_path) = args.snapshot_path {
        config.storage.snapshot_path = snapshot_path;
    }
    config.validate()?;

    info!("HQMS服务器配置:");
    info!("  监听地址: {}:{}", config.server.host, config.server.port);
    info!("  快照路径: {}", config.storage.snapshot_path);
    info!("  刷新间隔: {}秒", config.queue.refresh_interval_secs);

    // 构建排队引擎
    let mut engine = QueueEngine::new(Arc::new(SilentAnnouncer));
    engine
        .coordinator_mut()
        .set_announce_timeout(Duration::from_secs(config.queue.announce_timeout_secs));
    engine
        .coordinator_mut()
        .set_history_capacity(config.queue.history_capacity);

    // 恢复快照
    let snapshot = SnapshotStore::new(&config.storage.snapshot_path);
    let entries = snapshot.load()?;
    if !entries.is_empty() {
        engine.store().write().await.import_entries(entries);
    }

    // 启动候诊时间刷新任务
    let refresher = WaitTimeRefresher::new(engine.store())
        .with_interval(Duration::from_secs(config.queue.refresh_interval_secs))
        .spawn();

    let store = engine.store();
    let state: hqms_web::AppState = Arc::new(tokio::sync::RwLock::new(engine));

    // 启动Web服务器
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let server = WebServer::new(addr, state);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("服务器异常退出: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("收到退出信号，正在关闭...");
        }
    }

    // 停止刷新任务并保存快照
    refresher.shutdown().await;
    let entries = store.read().await.export_entries();
    snapshot.save(&entries)?;
    info!("HQMS服务器已退出");

    Ok(())
}
