// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求模块
//!
//! 该模块同时承担请求的两个方向：
//! 1. **构建**：客户端根据目标地址与资源路径生成 GET 请求报文（[`Request::get`]）。
//! 2. **解析**：服务端把从 TCP 流中读到的请求头部解析为强类型的 [`Request`]（[`Request::try_from`]）。
//!
//! 路径不做任何转义或百分号编码，原样透传。

use bytes::Bytes;
use log::error;

use crate::{exception::Exception, param::*, util::split_host_port};

/// 表示一个 HTTP GET 请求的元数据。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP 请求方法，固定为 GET
    method: HttpRequestMethod,
    /// 请求的资源路径，总是以 `/` 开头
    path: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// `Host` 头部中的主机部分
    host: Option<String>,
    /// `Host` 头部中的端口部分
    port: Option<u16>,
    /// `Connection` 头部，缺失或无法识别时为 `None`
    connection: Option<ConnectionDirective>,
    /// 请求声明的正文长度，GET 通常没有正文
    content_length: usize,
}

/// 把资源路径规范化为请求行中的 URI。
///
/// 最多去掉一个前导 `/` 后再补回一个 `/`，因此 `"/index.html"` 与 `"index.html"`
/// 得到相同的结果；空路径得到 `"/"`。
pub fn normalize_resource(resource: &str) -> String {
    let stripped = resource.strip_prefix('/').unwrap_or(resource);
    format!("/{}", stripped)
}

impl Request {
    /// 构建一个发往 `endpoint` 的 GET 请求。
    ///
    /// 本实现没有持久连接的客户端模式，因此总是携带 `Connection: close`。
    pub fn get(endpoint: &Endpoint, resource: &str) -> Self {
        Self {
            method: HttpRequestMethod::Get,
            path: normalize_resource(resource),
            version: HttpVersion::V1_1,
            host: Some(endpoint.host().to_string()),
            port: Some(endpoint.port()),
            connection: Some(ConnectionDirective::Close),
            content_length: 0,
        }
    }

    /// 序列化为报文字节：`METHOD SP path SP VERSION CRLF (header CRLF)* CRLF`
    pub fn as_bytes(&self) -> Bytes {
        let mut message = format!("{} {} {}{}", self.method, self.path, self.version, CRLF);
        if let Some(host) = &self.host {
            message.push_str(&format!("Host: {}{}", format_authority(host, self.port), CRLF));
        }
        if let Some(connection) = self.connection {
            message.push_str(&format!("Connection: {}{}", connection, CRLF));
        }
        message.push_str(CRLF);
        Bytes::from(message)
    }

    /// 从请求头部字节尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 验证编码：请求头部必须是合法的 UTF-8。
    /// 2. 解析请求行：第二个以空白分隔的记号即为请求路径。
    /// 3. 迭代解析标头：`Host`、`Connection`、`Content-Length`，名称大小写不敏感。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut request_lines = request_string.split(CRLF);
        let first_line = request_lines.next().unwrap_or_default();
        let first_line_parts: Vec<&str> = first_line.split_whitespace().collect();

        if first_line_parts.len() < 2 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, first_line);
            return Err(Exception::MalformedRequest);
        }

        let method = first_line_parts[0].parse::<HttpRequestMethod>().map_err(|e| {
            error!("[ID{}]不支持的HTTP请求方法：{}", id, first_line_parts[0]);
            e
        })?;

        let version = match first_line_parts.get(2) {
            Some(v) => v.parse::<HttpVersion>().map_err(|e| {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, v);
                e
            })?,
            None => {
                error!("[ID{}]HTTP请求行缺少协议版本：{}", id, first_line);
                return Err(Exception::MalformedRequest);
            }
        };

        let path = normalize_resource(first_line_parts[1]);

        let mut host = None;
        let mut port = None;
        let mut connection = None;
        let mut content_length = 0;
        for line in request_lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = match line.split_once(':') {
                Some((name, value)) => (name.trim().to_ascii_lowercase(), value.trim()),
                None => continue,
            };
            match name.as_str() {
                "host" => {
                    let (h, p) = split_host_port(value);
                    host = Some(h.to_string());
                    port = p;
                }
                "connection" => connection = ConnectionDirective::parse(value),
                "content-length" => content_length = value.parse().unwrap_or(0),
                _ => {}
            }
        }

        Ok(Self {
            method,
            path,
            version,
            host,
            port,
            connection,
            content_length,
        })
    }
}

impl Request {
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 获取请求路径，总是以 `/` 开头
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// 获取请求携带的连接指令
    pub fn connection(&self) -> Option<ConnectionDirective> {
        self.connection
    }

    pub fn content_length(&self) -> usize {
        self.content_length
    }
}
