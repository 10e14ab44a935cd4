// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了客户端与服务端共享的协议词汇，包括：
//! - 报文分隔符与固定的响应体。
//! - HTTP 状态码及其原因短语（Reason Phrase）。
//! - 按扩展名查找的 MIME 类型表。
//! - HTTP 方法、版本、连接指令、会话模式的强类型枚举。
//! - 表示 TCP 目标的 [`Endpoint`]。

use std::{collections::HashMap, fmt, str::FromStr};

use lazy_static::lazy_static;
use serde_derive::Deserialize;

use crate::exception::Exception;

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 报文头部结束标记
pub const HEADER_END: &[u8] = b"\r\n\r\n";

/// 默认的响应内容类型
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

/// 无法识别扩展名时使用的内容类型
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// 404 响应的固定正文
pub const NOT_FOUND_BODY: &str = "<h1>File not found</h1>";

/// 500 响应的固定正文
pub const INTERNAL_ERROR_BODY: &str = "<h1>Oh no</h1>";

/// 400 响应的固定正文
pub const BAD_REQUEST_BODY: &str = "<h1>Bad request</h1>";

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 只收录本程序实际会产生的状态码。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(400, "Bad Request");
        map.insert(404, "Not Found");
        map.insert(500, "Internal Server Error");
        map
    };
}

lazy_static! {
    /// 文件后缀名到 MIME 类型的映射表。
    ///
    /// 仅在配置项 `detect_content_type` 打开时用于 200 响应。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("css", "text/css; charset=UTF-8");
        map.insert("csv", "text/csv");
        map.insert("gif", "image/gif");
        map.insert("htm", DEFAULT_CONTENT_TYPE);
        map.insert("html", DEFAULT_CONTENT_TYPE);
        map.insert("ico", "image/x-icon");
        map.insert("jpeg", "image/jpeg");
        map.insert("jpg", "image/jpeg");
        map.insert("js", "text/javascript; charset=UTF-8");
        map.insert("json", "application/json");
        map.insert("pdf", "application/pdf");
        map.insert("png", "image/png");
        map.insert("svg", "image/svg+xml");
        map.insert("txt", "text/plain; charset=UTF-8");
        map.insert("wasm", "application/wasm");
        map.insert("webp", "image/webp");
        map.insert("xml", "text/xml");
        map
    };
}

/// 根据文件扩展名查找 MIME 类型
pub fn mime_for(path: &str) -> &'static str {
    let extension = match path.rsplit_once('.') {
        Some((_, ext)) if !ext.contains('/') => ext.to_ascii_lowercase(),
        _ => return FALLBACK_CONTENT_TYPE,
    };
    MIME_TYPES
        .get(extension.as_str())
        .copied()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    /// HTTP/1.0 版本，只在解析请求时接受
    V1_0,
    /// HTTP/1.1 版本
    V1_1,
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_0 => write!(f, "HTTP/1.0"),
            HttpVersion::V1_1 => write!(f, "HTTP/1.1"),
        }
    }
}

impl FromStr for HttpVersion {
    type Err = Exception;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HTTP/1.0" => Ok(HttpVersion::V1_0),
            "HTTP/1.1" => Ok(HttpVersion::V1_1),
            _ => Err(Exception::UnsupportedHttpVersion),
        }
    }
}

/// 支持的 HTTP 请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpRequestMethod {
    /// 获取资源
    Get,
}

impl fmt::Display for HttpRequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpRequestMethod::Get => write!(f, "GET"),
        }
    }
}

impl FromStr for HttpRequestMethod {
    type Err = Exception;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpRequestMethod::Get),
            _ => Err(Exception::UnsupportedRequestMethod),
        }
    }
}

/// `Connection` 头部携带的连接指令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionDirective {
    /// 响应发送后关闭连接
    Close,
    /// 响应发送后继续在同一连接上等待请求
    KeepAlive,
}

impl ConnectionDirective {
    /// 解析头部取值，大小写不敏感；无法识别的取值返回 `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "close" => Some(ConnectionDirective::Close),
            "keep-alive" => Some(ConnectionDirective::KeepAlive),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConnectionDirective::Close => write!(f, "close"),
            ConnectionDirective::KeepAlive => write!(f, "keep-alive"),
        }
    }
}

/// 服务端会话的运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    /// 只处理一个请求，随后关闭连接
    SingleShot,
    /// 在同一连接上循环处理请求，直到对端断开、请求方要求关闭或服务器停机
    Persistent,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SessionMode::SingleShot => write!(f, "single-shot"),
            SessionMode::Persistent => write!(f, "persistent"),
        }
    }
}

/// 拼接 `Host` 头部的取值。含 `:` 的主机视为 IPv6 字面量，加方括号。
pub fn format_authority(host: &str, port: Option<u16>) -> String {
    let host = if host.contains(':') {
        format!("[{}]", host)
    } else {
        host.to_string()
    };
    match port {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}

/// TCP 目标：主机（IP 字面量或可解析的名字）与端口。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// 构造目标地址。主机名不能为空，端口必须在 1–65535 之间。
    pub fn new(host: &str, port: u16) -> Result<Self, Exception> {
        let host = host.trim();
        if host.is_empty() || port == 0 {
            return Err(Exception::InvalidEndpoint);
        }
        // 允许调用方传入带方括号的 IPv6 字面量
        let host = host.trim_start_matches('[').trim_end_matches(']');
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `Host` 头部使用的 `host:port` 形式，IPv6 字面量加方括号
    pub fn authority(&self) -> String {
        format_authority(&self.host, Some(self.port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.authority())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_phrases() {
        assert_eq!(STATUS_CODES.get(&200), Some(&"OK"));
        assert_eq!(STATUS_CODES.get(&404), Some(&"Not Found"));
        assert_eq!(STATUS_CODES.get(&500), Some(&"Internal Server Error"));
    }

    #[test]
    fn test_mime_lookup() {
        assert_eq!(mime_for("index.html"), DEFAULT_CONTENT_TYPE);
        assert_eq!(mime_for("img/logo.PNG"), "image/png");
        assert_eq!(mime_for("archive.unknown"), FALLBACK_CONTENT_TYPE);
        assert_eq!(mime_for("dir.d/README"), FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn test_connection_directive_parse() {
        assert_eq!(
            ConnectionDirective::parse("Keep-Alive"),
            Some(ConnectionDirective::KeepAlive)
        );
        assert_eq!(
            ConnectionDirective::parse(" close "),
            Some(ConnectionDirective::Close)
        );
        assert_eq!(ConnectionDirective::parse(""), None);
        assert_eq!(ConnectionDirective::parse("upgrade"), None);
    }

    #[test]
    fn test_method_and_version_parse() {
        assert_eq!("get".parse::<HttpRequestMethod>(), Ok(HttpRequestMethod::Get));
        assert_eq!(
            "POST".parse::<HttpRequestMethod>(),
            Err(Exception::UnsupportedRequestMethod)
        );
        assert_eq!("HTTP/1.0".parse::<HttpVersion>(), Ok(HttpVersion::V1_0));
        assert_eq!(
            "HTTP/2.0".parse::<HttpVersion>(),
            Err(Exception::UnsupportedHttpVersion)
        );
    }

    #[test]
    fn test_format_authority() {
        assert_eq!(format_authority("localhost", Some(80)), "localhost:80");
        assert_eq!(format_authority("localhost", None), "localhost");
        assert_eq!(format_authority("::1", Some(80)), "[::1]:80");
        assert_eq!(format_authority("fe80::1", None), "[fe80::1]");
    }

    #[test]
    fn test_endpoint_validation() {
        assert_eq!(Endpoint::new("", 80), Err(Exception::InvalidEndpoint));
        assert_eq!(Endpoint::new("localhost", 0), Err(Exception::InvalidEndpoint));

        let endpoint = Endpoint::new("127.0.0.1", 6969).unwrap();
        assert_eq!(endpoint.authority(), "127.0.0.1:6969");

        let v6 = Endpoint::new("[::1]", 8080).unwrap();
        assert_eq!(v6.host(), "::1");
        assert_eq!(v6.authority(), "[::1]:8080");
    }
}
