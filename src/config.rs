use serde_derive::Deserialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;
use std::path::PathBuf;

use crate::param::{ConnectionDirective, SessionMode};

/// 服务端配置
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    host: String,
    port: u16,
    www_root: String,
    default_document: String,
    mode: SessionMode,
    /// 请求没有携带可识别的 `Connection` 头部时采用的连接指令
    default_connection: ConnectionDirective,
    chunk_size: usize,
    max_request_size: usize,
    detect_content_type: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6969,
            www_root: ".".to_string(),
            default_document: "index.html".to_string(),
            mode: SessionMode::Persistent,
            default_connection: ConnectionDirective::Close,
            chunk_size: 1024,
            max_request_size: 8192,
            detect_content_type: false,
        }
    }

    /// 从 TOML 文件读取配置。文件缺失或格式错误时使用默认配置。
    pub fn from_toml(filename: &str) -> Self {
        let raw_config: Self = match read_toml(filename) {
            Some(config) => config,
            None => Self::new(),
        };
        raw_config.sanitized()
    }

    fn sanitized(mut self) -> Self {
        if self.chunk_size == 0 {
            warn!("chunk_size被设置为0，该值将被改为1024。");
            self.chunk_size = 1024;
        }
        if self.max_request_size < self.chunk_size {
            warn!(
                "max_request_size({})小于chunk_size({})，将被改为{}。",
                self.max_request_size, self.chunk_size, self.chunk_size
            );
            self.max_request_size = self.chunk_size;
        }
        if self.default_document.is_empty() {
            warn!("default_document为空，该值将被改为index.html。");
            self.default_document = "index.html".to_string();
        }
        self
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_www_root(mut self, www_root: &str) -> Self {
        self.www_root = www_root.to_string();
        self
    }

    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_default_connection(mut self, connection: ConnectionDirective) -> Self {
        self.default_connection = connection;
        self
    }

    pub fn with_max_request_size(mut self, size: usize) -> Self {
        self.max_request_size = size;
        self.sanitized()
    }

    pub fn with_detect_content_type(mut self, detect: bool) -> Self {
        self.detect_content_type = detect;
        self
    }
}

impl ServerConfig {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn www_root(&self) -> &str {
        &self.www_root
    }

    pub fn www_root_path(&self) -> PathBuf {
        PathBuf::from(&self.www_root)
    }

    pub fn default_document(&self) -> &str {
        &self.default_document
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn default_connection(&self) -> ConnectionDirective {
        self.default_connection
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_request_size(&self) -> usize {
        self.max_request_size
    }

    pub fn detect_content_type(&self) -> bool {
        self.detect_content_type
    }
}

/// 客户端配置
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ClientConfig {
    host: String,
    port: u16,
    resource: String,
    chunk_size: usize,
    max_response_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6969,
            resource: String::new(),
            chunk_size: 1024,
            max_response_size: 16 * 1024 * 1024,
        }
    }

    pub fn from_toml(filename: &str) -> Self {
        let mut raw_config: Self = read_toml(filename).unwrap_or_else(Self::new);
        if raw_config.chunk_size == 0 {
            warn!("chunk_size被设置为0，该值将被改为1024。");
            raw_config.chunk_size = 1024;
        }
        raw_config
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = resource.to_string();
        self
    }
}

impl ClientConfig {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_response_size(&self) -> usize {
        self.max_response_size
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(filename: &str) -> Option<T> {
    let mut file = match File::open(filename) {
        Ok(f) => f,
        Err(e) => {
            warn!("无法打开配置文件{}：{}，使用默认配置", filename, e);
            return None;
        }
    };
    let mut str_val = String::new();
    if let Err(e) = file.read_to_string(&mut str_val) {
        error!("读取配置文件{}失败：{}，使用默认配置", filename, e);
        return None;
    }
    match toml::from_str(&str_val) {
        Ok(t) => Some(t),
        Err(e) => {
            error!("无法成功从配置文件构建配置对象：{}，使用默认配置", e);
            None
        }
    }
}
