// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 单连接文件服务器
//!
//! 监听一个 TCP 端口，逐个接受连接，解析 GET 请求并返回服务根目录下的文件。
//! 核心功能包括：
//! - 单次模式与持续连接模式
//! - 404 / 400 / 500 错误映射，单个连接的失败不会影响服务器
//! - 后台管理控制台（`stop`、`status`、`help`）与 Ctrl-C 优雅停机

use std::sync::{atomic::Ordering, Arc};

use clap::Parser;
use log::{error, info, warn};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
};

use webexchange::{config::ServerConfig, param::SessionMode, server::Server, util::init_logging};

/// 命令行参数，优先级高于配置文件
#[derive(Parser, Debug)]
#[command(version, about = "Serves files from a local directory over HTTP/1.1")]
struct Args {
    /// TOML 配置文件路径
    #[arg(short, long, default_value = "config/server.toml")]
    config: String,

    /// log4rs 配置文件路径
    #[arg(long, default_value = "config/log4rs.yaml")]
    log_config: String,

    /// 监听地址
    #[arg(long)]
    host: Option<String>,

    /// 监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 服务根目录
    #[arg(short, long)]
    root: Option<String>,

    /// 连接处理模式
    #[arg(short, long, value_enum)]
    mode: Option<SessionMode>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    // 1. 初始化日志系统
    init_logging(&args.log_config);

    // 2. 环境配置加载：命令行参数覆盖配置文件
    let mut config = ServerConfig::from_toml(&args.config);
    if let Some(host) = &args.host {
        config = config.with_host(host);
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(root) = &args.root {
        config = config.with_www_root(root);
    }
    if let Some(mode) = args.mode {
        config = config.with_mode(mode);
    }
    info!("配置文件已载入");
    info!("www root: {}", config.www_root());

    // 3. 绑定端口
    let port = config.port();
    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", port, e);
            std::process::exit(1);
        }
    };

    // 4. 停机信号：来自管理控制台或 Ctrl-C
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    tokio::spawn({
        let shutdown_tx = Arc::clone(&shutdown_tx);
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("收到Ctrl-C，服务器即将关闭...");
                let _ = shutdown_tx.send(true);
            }
        }
    });

    // 5. 启动交互式管理控制台任务
    tokio::spawn({
        let shutdown_tx = Arc::clone(&shutdown_tx);
        let served = server.served_counter();
        async move {
            let stdin = tokio::io::stdin();
            let mut reader = BufReader::new(stdin);
            let mut input = String::new();
            loop {
                input.clear();
                match reader.read_line(&mut input).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                match input.trim() {
                    "stop" => {
                        let _ = shutdown_tx.send(true);
                        println!("停机指令已激活，服务器将在当前连接结束后关闭...");
                        break;
                    }
                    "help" => {
                        println!("== Webexchange Help ==");
                        println!("stop   - 发出停机信号");
                        println!("status - 查看当前服务器运行状态");
                        println!("help   - 显示此帮助信息");
                        println!("======================");
                    }
                    "status" => {
                        println!("== Webexchange 状态 ==");
                        println!("已服务连接数: {}", served.load(Ordering::Relaxed));
                        println!("======================");
                    }
                    "" => {}
                    cmd => {
                        println!("无效的命令：{}", cmd);
                    }
                }
            }
        }
    });

    // 6. 主事件循环
    if let Err(e) = server.run(shutdown_rx).await {
        warn!("服务器异常退出：{}", e);
    }
    info!("服务器已关闭");
}
