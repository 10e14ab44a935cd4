// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP GET 客户端
//!
//! 连接到服务器，请求一个文件，打印收到的原始响应报文。

use clap::Parser;
use log::error;

use webexchange::{
    client::ClientSession, config::ClientConfig, param::Endpoint, util::init_logging,
};

/// 命令行参数，优先级高于配置文件
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Attempts to connect to a server and send HTTP GET request for file"
)]
struct Args {
    /// 服务器标识：IP 地址或主机名
    #[arg(short, long, visible_alias = "ip")]
    identifier: Option<String>,

    /// 服务器端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 请求的文件，缺省时请求 index.html
    #[arg(short, long)]
    file: Option<String>,

    /// TOML 配置文件路径
    #[arg(short, long, default_value = "config/client.toml")]
    config: String,

    /// log4rs 配置文件路径
    #[arg(long, default_value = "config/log4rs.yaml")]
    log_config: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log_config);

    let mut config = ClientConfig::from_toml(&args.config);
    if let Some(host) = &args.identifier {
        config = config.with_host(host);
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(file) = &args.file {
        config = config.with_resource(file);
    }

    let endpoint = match Endpoint::new(config.host(), config.port()) {
        Ok(endpoint) => endpoint,
        Err(e) => exit_with_error(e),
    };

    let mut session = ClientSession::from_config(&config);
    match session.request(&endpoint, config.resource()).await {
        Ok(response) => {
            println!(
                "HTTP response message received:\n{}",
                String::from_utf8_lossy(&response)
            );
        }
        Err(e) => exit_with_error(e),
    }
}

fn exit_with_error(e: webexchange::Exception) -> ! {
    error!("请求失败：{}", e);
    println!("An error has occured: {}\nexiting program...", e);
    std::process::exit(1);
}
