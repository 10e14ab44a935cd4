use std::io;

use bytes::{Bytes, BytesMut};
use log::{debug, LevelFilter};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::param::{CRLF, HEADER_END};

/// 带缓冲的报文读取器。
///
/// 以 `chunk_size` 为单位从流中读取，直到遇到头部结束标记 `\r\n\r\n`。
/// 头部之后多读到的字节保留在缓冲区中，留给同一连接上的下一个报文。
pub struct MessageReader {
    buffer: BytesMut,
    chunk_size: usize,
    limit: usize,
}

impl MessageReader {
    pub fn new(chunk_size: usize, limit: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            buffer: BytesMut::with_capacity(chunk_size),
            chunk_size,
            limit,
        }
    }

    /// 读取一个完整的报文头部（包含结束标记）。
    ///
    /// - 对端在未发送任何字节时关闭连接，返回 `Ok(None)`。
    /// - 对端发送了部分头部后关闭连接，把已收到的字节原样交给调用方。
    /// - 头部超过上限时返回 `InvalidData` 错误。
    pub async fn read_head<R>(&mut self, stream: &mut R) -> io::Result<Option<Bytes>>
    where
        R: AsyncRead + Unpin,
    {
        let mut searched = 0;
        loop {
            if let Some(pos) = find_subsequence(&self.buffer[searched..], HEADER_END) {
                let end = searched + pos + HEADER_END.len();
                return Ok(Some(self.buffer.split_to(end).freeze()));
            }
            // 结束标记可能跨越两次读取
            searched = self.buffer.len().saturating_sub(HEADER_END.len() - 1);

            if self.buffer.len() > self.limit {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("message head exceeds {} bytes", self.limit),
                ));
            }

            if self.fill(stream).await? == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                debug!("对端在头部结束前关闭连接，已收到{}字节", self.buffer.len());
                return Ok(Some(self.buffer.split().freeze()));
            }
        }
    }

    /// 读取正文。
    ///
    /// 给定长度时恰好读取 `length` 字节（提前遇到流结束则返回已收到的部分），
    /// 否则一直读到流结束。`limit` 限制正文的最大长度。
    pub async fn read_body<R>(
        &mut self,
        stream: &mut R,
        length: Option<usize>,
        limit: usize,
    ) -> io::Result<Bytes>
    where
        R: AsyncRead + Unpin,
    {
        let wanted = match length {
            Some(length) if length > limit => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("message body of {} bytes exceeds {} bytes", length, limit),
                ));
            }
            Some(length) => length,
            // 多读一个字节才能区分“恰好等于上限”与“超过上限”
            None => limit.saturating_add(1),
        };
        while self.buffer.len() < wanted {
            if self.fill(stream).await? == 0 {
                if length.is_some() {
                    debug!(
                        "正文未读完对端即关闭连接：期望{}字节，实际{}字节",
                        wanted,
                        self.buffer.len()
                    );
                }
                return Ok(self.buffer.split().freeze());
            }
        }
        if length.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("message body exceeds {} bytes", limit),
            ));
        }
        Ok(self.buffer.split_to(wanted).freeze())
    }

    async fn fill<R>(&mut self, stream: &mut R) -> io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        self.buffer.reserve(self.chunk_size);
        stream.read_buf(&mut self.buffer).await
    }

    /// 缓冲区中尚未消费的字节数
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// 在报文头部中查找某个头部字段的取值，名称大小写不敏感。第一行（起始行）不参与匹配。
pub fn header_value<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.split(CRLF)
        .skip(1)
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
}

/// 把 `Host` 头部的取值拆分为主机与端口，支持 `[::1]:8080` 形式的 IPv6 字面量。
pub fn split_host_port(value: &str) -> (&str, Option<u16>) {
    if let Some(rest) = value.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return (host, port);
        }
    }
    match value.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (value, None),
        },
        _ => (value, None),
    }
}

/// 初始化 log4rs 日志系统。
///
/// 优先使用外部 YAML 配置；文件缺失或格式错误时退回到一个输出到标准错误的默认配置，标准输出留给程序本身。
pub fn init_logging(path: &str) {
    if let Err(e) = log4rs::init_file(path, Default::default()) {
        eprintln!("无法从{}载入日志配置（{}），使用默认控制台输出", path, e);
        if let Err(e) = init_console_logging(LevelFilter::Info) {
            eprintln!("无法初始化日志系统：{}", e);
        }
    }
}

fn init_console_logging(level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
    use log4rs::{
        append::console::{ConsoleAppender, Target},
        config::{Appender, Root},
        encode::pattern::PatternEncoder,
    };

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {m}{n}",
        )))
        .build();
    let config = log4rs::config::Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))?;
    log4rs::init_config(config)?;
    Ok(())
}
