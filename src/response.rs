//! # HTTP 响应模块
//!
//! 负责响应报文的构建、序列化，以及客户端一侧的解析。

use bytes::Bytes;
use log::error;

use crate::{exception::Exception, param::*, util::header_value};

/// 一个 HTTP 响应。
///
/// 序列化后的头部依次为 `Content-Length`、`Connection`、`Content-Type`，
/// 随后直接拼接原始正文，不做分块等额外封装。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    connection: ConnectionDirective,
    content_type: String,
    content: Bytes,
}

impl Response {
    /// 由状态码、原因短语、连接指令和正文构建响应。
    ///
    /// 连接指令完全由调用方决定，这里不做任何推断。
    pub fn build(
        status_code: u16,
        information: &str,
        connection: ConnectionDirective,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code,
            information: information.to_string(),
            connection,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            content: content.into(),
        }
    }

    /// 使用状态码表中的标准原因短语构建响应
    pub fn from_status_code(
        code: u16,
        connection: ConnectionDirective,
        content: impl Into<Bytes>,
    ) -> Self {
        let information = match STATUS_CODES.get(&code) {
            Some(&info) => info,
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                "Unknown"
            }
        };
        Self::build(code, information, connection, content)
    }

    pub fn response_200(content: Bytes, connection: ConnectionDirective) -> Self {
        Self::from_status_code(200, connection, content)
    }

    pub fn response_404(connection: ConnectionDirective) -> Self {
        Self::from_status_code(404, connection, NOT_FOUND_BODY)
    }

    pub fn response_400(connection: ConnectionDirective) -> Self {
        Self::from_status_code(400, connection, BAD_REQUEST_BODY)
    }

    /// 500 响应总是携带 `Connection: close`，因为发送后连接必定被关闭
    pub fn response_500() -> Self {
        Self::from_status_code(500, ConnectionDirective::Close, INTERNAL_ERROR_BODY)
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// 覆盖连接指令，用于停机时把即将发送的响应改为关闭连接
    pub fn with_connection(mut self, connection: ConnectionDirective) -> Self {
        self.connection = connection;
        self
    }

    pub fn as_bytes(&self) -> Bytes {
        let version: &str = &self.version.to_string();
        let status_code: &str = &self.status_code.to_string();
        // Content-Length 按正文字节数计算，而非字符数
        let content_length: &str = &self.content.len().to_string();
        let connection: &str = &self.connection.to_string();

        let header = [
            version,
            " ",
            status_code,
            " ",
            self.information.as_str(),
            CRLF,
            "Content-Length: ",
            content_length,
            CRLF,
            "Connection: ",
            connection,
            CRLF,
            "Content-Type: ",
            self.content_type.as_str(),
            CRLF,
            CRLF,
        ]
        .concat();
        Bytes::from([header.as_bytes(), &self.content[..]].concat())
    }

    /// 解析一个完整的响应报文（头部加正文）。
    ///
    /// 正文取头部之后的全部字节；`Content-Length` 只作参考，若声明长度更短则截断。
    pub fn try_from(buffer: &[u8]) -> Result<Self, Exception> {
        let split = buffer
            .windows(HEADER_END.len())
            .position(|w| w == HEADER_END)
            .ok_or(Exception::MalformedResponse)?;
        let head = std::str::from_utf8(&buffer[..split + CRLF.len()])
            .map_err(|_| Exception::MalformedResponse)?;
        let mut content = Bytes::copy_from_slice(&buffer[split + HEADER_END.len()..]);

        let status_line = head.split(CRLF).next().unwrap_or_default();
        let mut parts = status_line.splitn(3, ' ');
        let version = match parts.next() {
            Some(v) => v
                .parse::<HttpVersion>()
                .map_err(|_| Exception::MalformedResponse)?,
            None => return Err(Exception::MalformedResponse),
        };
        let status_code = parts
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or(Exception::MalformedResponse)?;
        let information = parts.next().unwrap_or_default().to_string();

        let connection = header_value(head, "Connection")
            .and_then(ConnectionDirective::parse)
            .unwrap_or(ConnectionDirective::Close);
        let content_type = header_value(head, "Content-Type")
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        if let Some(length) = header_value(head, "Content-Length").and_then(|l| l.parse().ok()) {
            if length < content.len() {
                content.truncate(length);
            }
        }

        Ok(Self {
            version,
            status_code,
            information,
            connection,
            content_type,
            content,
        })
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn connection(&self) -> ConnectionDirective {
        self.connection
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn content_length(&self) -> usize {
        self.content.len()
    }
}
