// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了客户端与服务端在一次 HTTP 交换的生命周期中可能遇到的各类异常情况。
//!
//! ## 分类
//! - **客户端传输错误**：`ConnectError`、`SendError`、`ReceiveError`，均为致命错误，客户端记录后终止。
//! - **服务端资源错误**：`NotFound` 可恢复（404），`ReadFailure` 对连接致命（500 后关闭）。
//! - **协议错误**：请求或响应报文无法解析，服务端一律按 500 处理并关闭连接。
//! - **`EmptyRead`**：对端已关闭连接。它不是真正的错误，会话据此优雅退出。

use std::{fmt, io};

/// 一次 HTTP 交换过程中发生的异常类型。
///
/// 传输层错误携带底层的 [`io::ErrorKind`]，便于日志输出，同时保持 `Copy` 语义。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 无法与服务端建立 TCP 连接。
    ConnectError(io::ErrorKind),
    /// 请求报文写入 Socket 失败。
    SendError(io::ErrorKind),
    /// 从 Socket 读取响应失败，或对端在发送任何字节之前就关闭了连接。
    ReceiveError(io::ErrorKind),
    /// 对端关闭了连接，读取返回 0 字节。
    EmptyRead,
    /// 在服务根目录下未找到所请求的文件。对应 `404 Not Found`。
    NotFound,
    /// 文件存在但无法读取（权限不足、是目录等）。对应 `500 Internal Server Error`。
    ReadFailure(io::ErrorKind),
    /// 请求路径包含 `..`、绝对路径等越权片段。对应 `400 Bad Request`。
    InvalidPath,
    /// 请求行格式不正确，例如缺少路径。
    MalformedRequest,
    /// 请求字节流无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 客户端使用了 GET 以外的方法。
    UnsupportedRequestMethod,
    /// 客户端使用了服务器不支持的 HTTP 协议版本。
    UnsupportedHttpVersion,
    /// 服务端返回的响应报文无法解析。
    MalformedResponse,
    /// 报文头部超过了配置的长度上限。
    MessageTooLarge,
    /// 主机名为空或端口为 0。
    InvalidEndpoint,
}

use Exception::*;

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError(kind) => write!(f, "Couldn't connect to server: {}", kind),
            SendError(kind) => write!(f, "Couldn't send request: {}", kind),
            ReceiveError(kind) => write!(f, "Couldn't receive response: {}", kind),
            EmptyRead => write!(f, "Peer closed the connection"),
            NotFound => write!(f, "File not found (404)"),
            ReadFailure(kind) => write!(f, "Couldn't read file (500): {}", kind),
            InvalidPath => write!(f, "Invalid path (400)"),
            MalformedRequest => write!(f, "Malformed request line"),
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            UnsupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            MalformedResponse => write!(f, "Malformed response"),
            MessageTooLarge => write!(f, "Message head exceeds size limit"),
            InvalidEndpoint => write!(f, "Invalid endpoint"),
        }
    }
}

impl std::error::Error for Exception {}

impl Exception {
    /// 服务端资源错误是否允许连接继续保持。
    ///
    /// 只有 404 和 400 属于可恢复结果，其余错误都会强制关闭连接。
    pub fn is_recoverable(&self) -> bool {
        matches!(self, NotFound | InvalidPath)
    }
}
