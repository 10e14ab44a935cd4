// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 客户端模块
//!
//! [`ClientSession`] 持有一个出站连接：建立连接、发送一个 GET 请求、接收一个响应、关闭连接。
//!
//! 响应的读取分两步：先读到头部结束标记，再按 `Content-Length` 读取正文；
//! 没有可用的 `Content-Length` 时一直读到对端关闭连接。

use std::io;

use bytes::{Bytes, BytesMut};
use log::{debug, error, info};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};

use crate::{
    config::ClientConfig,
    exception::Exception,
    param::Endpoint,
    request::Request,
    util::{header_value, MessageReader},
};

/// 客户端会话的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// 正在与服务端建立 TCP 连接
    Connecting,
    /// 连接已建立，正在写出请求
    Sending,
    /// 请求已发出，等待并读取响应
    AwaitingResponse,
    /// 响应接收完毕，连接已释放
    Done,
    /// 任一步骤失败，连接已释放
    Failed,
}

/// 一次性的出站 HTTP 会话
pub struct ClientSession {
    chunk_size: usize,
    max_response_size: usize,
    state: ClientState,
}

impl ClientSession {
    pub fn new(chunk_size: usize, max_response_size: usize) -> Self {
        Self {
            chunk_size,
            max_response_size,
            state: ClientState::Connecting,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.chunk_size(), config.max_response_size())
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// 向 `endpoint` 请求 `resource`，返回原始响应字节。
    ///
    /// 无论成功还是失败，返回前连接都已经关闭。
    pub async fn request(&mut self, endpoint: &Endpoint, resource: &str) -> Result<Bytes, Exception> {
        self.state = ClientState::Connecting;
        let mut stream = match TcpStream::connect((endpoint.host(), endpoint.port())).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("无法连接到{}：{}", endpoint, e);
                self.state = ClientState::Failed;
                return Err(Exception::ConnectError(e.kind()));
            }
        };
        info!("已与{}建立连接，准备发送请求...", endpoint);

        let result = self.exchange(&mut stream, endpoint, resource).await;

        if let Err(e) = stream.shutdown().await {
            debug!("关闭连接时出错：{}", e);
        }
        drop(stream);
        info!("连接已关闭");
        result
    }

    /// 在一个已经建立的流上完成发送与接收。状态在返回时被置为 `Done` 或 `Failed`。
    pub async fn exchange<S>(
        &mut self,
        stream: &mut S,
        endpoint: &Endpoint,
        resource: &str,
    ) -> Result<Bytes, Exception>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = self.send_and_receive(stream, endpoint, resource).await;
        self.state = match result {
            Ok(_) => ClientState::Done,
            Err(_) => ClientState::Failed,
        };
        result
    }

    async fn send_and_receive<S>(
        &mut self,
        stream: &mut S,
        endpoint: &Endpoint,
        resource: &str,
    ) -> Result<Bytes, Exception>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.state = ClientState::Sending;
        let request = Request::get(endpoint, resource);
        info!("正在发送HTTP请求：GET {}", request.path());
        stream
            .write_all(&request.as_bytes())
            .await
            .map_err(|e| Exception::SendError(e.kind()))?;
        stream
            .flush()
            .await
            .map_err(|e| Exception::SendError(e.kind()))?;

        self.state = ClientState::AwaitingResponse;
        let mut reader = MessageReader::new(self.chunk_size, self.max_response_size);
        let head = match reader.read_head(stream).await {
            Ok(Some(head)) => head,
            Ok(None) => {
                error!("服务端未发送任何数据就关闭了连接");
                return Err(Exception::ReceiveError(io::ErrorKind::UnexpectedEof));
            }
            Err(e) => return Err(Exception::ReceiveError(e.kind())),
        };

        let content_length = std::str::from_utf8(&head)
            .ok()
            .and_then(|head| header_value(head, "Content-Length"))
            .and_then(|length| length.parse::<usize>().ok());
        let body = reader
            .read_body(stream, content_length, self.max_response_size)
            .await
            .map_err(|e| Exception::ReceiveError(e.kind()))?;
        debug!("响应接收完毕：头部{}字节，正文{}字节", head.len(), body.len());

        let mut response = BytesMut::with_capacity(head.len() + body.len());
        response.extend_from_slice(&head);
        response.extend_from_slice(&body);
        Ok(response.freeze())
    }
}
