// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 服务端模块
//!
//! - [`ServerSession`]：负责单个入站连接的完整生命周期，是整个程序的核心状态机。
//! - [`Server`]：监听端口，逐个接受连接并交给会话处理。同一时刻只服务一个连接。
//!
//! ## 会话状态机
//! ```text
//! AwaitingRequest --空读/停机--> Terminated
//! AwaitingRequest --收到字节--> Resolving --> Responding
//! Responding --keep-alive--> Looping --> AwaitingRequest
//! Responding --close / 500--> Terminated
//! ```
//! 发出的每个响应的 `Connection` 头部都与随后对 Socket 的处理一致：
//! 声明 `keep-alive` 就继续等待下一个请求，声明 `close` 就关闭连接。

use std::{
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use bytes::Bytes;
use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
    sync::watch,
};

use crate::{
    config::ServerConfig,
    exception::Exception,
    param::{mime_for, ConnectionDirective, SessionMode},
    request::Request,
    resolver::{FileResolver, Resolve},
    response::Response,
    util::MessageReader,
};

/// 服务端会话的状态，状态之间传递的数据直接挂在变体上
#[derive(Debug)]
pub enum SessionState {
    /// 阻塞等待下一个请求
    AwaitingRequest,
    /// 已收到请求头部，正在解析并查找资源
    Resolving(Bytes),
    /// 响应已构建，等待写出
    Responding(Response),
    /// 响应声明了 keep-alive，准备回到等待状态
    Looping,
    /// 会话结束，连接将被关闭
    Terminated,
}

/// 一个会话的处理结果摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSummary {
    /// 成功写出的响应数
    pub responses: usize,
    /// 最后一个响应的状态码
    pub last_status: Option<u16>,
}

/// 负责单个入站连接的会话。
///
/// 对流的唯一要求是实现 `AsyncRead + AsyncWrite + Unpin`，测试中可以直接使用内存管道。
pub struct ServerSession<'a, S, R> {
    id: u128,
    stream: S,
    resolver: &'a R,
    config: &'a ServerConfig,
    reader: MessageReader,
    shutdown: Option<watch::Receiver<bool>>,
    summary: SessionSummary,
}

impl<'a, S, R> ServerSession<'a, S, R>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: Resolve,
{
    pub fn new(id: u128, stream: S, resolver: &'a R, config: &'a ServerConfig) -> Self {
        Self {
            id,
            stream,
            resolver,
            config,
            reader: MessageReader::new(config.chunk_size(), config.max_request_size()),
            shutdown: None,
            summary: SessionSummary::default(),
        }
    }

    /// 关联停机信号。信号置位后，会话不再等待新的请求。
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// 运行会话直到 `Terminated`。
    ///
    /// 任何失败都不会越过这个边界：能回复的错误先转换为 HTTP 错误响应再关闭连接，
    /// 返回前流一定已经关闭。
    pub async fn serve(mut self, mode: SessionMode) -> SessionSummary {
        debug!("[ID{}]会话开始，模式：{}", self.id, mode);
        let mut state = SessionState::AwaitingRequest;
        loop {
            state = match state {
                SessionState::AwaitingRequest => self.receive().await,
                SessionState::Resolving(head) => {
                    SessionState::Responding(self.resolve(&head, mode).await)
                }
                SessionState::Responding(response) => self.respond(response).await,
                SessionState::Looping => {
                    debug!("[ID{}]保持连接，等待下一个请求", self.id);
                    SessionState::AwaitingRequest
                }
                SessionState::Terminated => break,
            };
        }
        self.close().await;
        self.summary
    }

    async fn receive(&mut self) -> SessionState {
        let received = {
            let read = read_request(&mut self.reader, &mut self.stream);
            let stop = wait_for_shutdown(self.shutdown.clone());
            tokio::select! {
                received = read => Some(received),
                _ = stop => None,
            }
        };

        match received {
            None => {
                info!("[ID{}]服务器停机，关闭空闲连接", self.id);
                SessionState::Terminated
            }
            Some(Err(Exception::EmptyRead)) => {
                info!("[ID{}]客户端已关闭连接", self.id);
                SessionState::Terminated
            }
            Some(Ok(head)) => {
                debug!("[ID{}]收到请求，{}字节", self.id, head.len());
                SessionState::Resolving(head)
            }
            Some(Err(e)) => {
                warn!("[ID{}]读取请求失败：{}", self.id, e);
                SessionState::Responding(Response::response_500())
            }
        }
    }

    async fn respond(&mut self, response: Response) -> SessionState {
        let connection = response.connection();
        if !self.send(response).await {
            return SessionState::Terminated;
        }
        match connection {
            ConnectionDirective::KeepAlive => SessionState::Looping,
            ConnectionDirective::Close => SessionState::Terminated,
        }
    }

    async fn resolve(&mut self, head: &Bytes, mode: SessionMode) -> Response {
        let request = match Request::try_from(head, self.id) {
            Ok(request) => request,
            Err(e) => {
                error!("[ID{}]解析HTTP请求失败：{}，返回500", self.id, e);
                return Response::response_500();
            }
        };

        // 丢弃请求声明的正文，避免污染同一连接上的下一个请求
        if request.content_length() > 0 {
            if let Err(e) = self
                .reader
                .read_body(
                    &mut self.stream,
                    Some(request.content_length()),
                    self.config.max_request_size(),
                )
                .await
            {
                error!("[ID{}]读取请求正文失败：{}，返回500", self.id, e);
                return Response::response_500();
            }
        }

        let connection = self.negotiate(&request, mode);
        let response = match self.resolver.resolve(request.path()) {
            Ok(content) => {
                info!("[ID{}]请求的文件已找到：{}", self.id, request.path());
                let response = Response::response_200(content, connection);
                if self.config.detect_content_type() {
                    response.with_content_type(mime_for(request.path()))
                } else {
                    response
                }
            }
            Err(e) => {
                let response = match e {
                    Exception::NotFound => Response::response_404(connection),
                    Exception::InvalidPath => Response::response_400(connection),
                    _ => Response::response_500(),
                };
                if e.is_recoverable() {
                    warn!(
                        "[ID{}]请求的路径：{} 无法提供：{}，返回{}",
                        self.id,
                        request.path(),
                        e,
                        response.status_code()
                    );
                } else {
                    error!("[ID{}]处理请求{}时发生错误：{}，返回500", self.id, request.path(), e);
                }
                response
            }
        };

        if shutdown_requested(&self.shutdown) {
            response.with_connection(ConnectionDirective::Close)
        } else {
            response
        }
    }

    /// 决定响应的连接指令。
    ///
    /// 单次模式总是关闭；持续模式回显请求的 `Connection`，缺失时使用配置的默认值。
    fn negotiate(&self, request: &Request, mode: SessionMode) -> ConnectionDirective {
        match mode {
            SessionMode::SingleShot => ConnectionDirective::Close,
            SessionMode::Persistent => request
                .connection()
                .unwrap_or(self.config.default_connection()),
        }
    }

    /// 写出响应，返回是否成功
    async fn send(&mut self, response: Response) -> bool {
        let bytes = response.as_bytes();
        let result = match self.stream.write_all(&bytes).await {
            Ok(()) => self.stream.flush().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                debug!(
                    "[ID{}]响应已发送：{} {}，{}字节",
                    self.id,
                    response.status_code(),
                    response.information(),
                    bytes.len()
                );
                self.summary.responses += 1;
                self.summary.last_status = Some(response.status_code());
                true
            }
            Err(e) => {
                error!("[ID{}]发送响应失败：{}", self.id, e);
                false
            }
        }
    }

    async fn close(&mut self) {
        if self.reader.buffered() > 0 {
            debug!("[ID{}]丢弃{}字节未处理的数据", self.id, self.reader.buffered());
        }
        if let Err(e) = self.stream.shutdown().await {
            debug!("[ID{}]关闭连接时出错：{}", self.id, e);
        }
        debug!("[ID{}]连接已关闭", self.id);
    }
}

/// 读取一个请求头部，把读取结果归入 [`Exception`]
async fn read_request<S>(reader: &mut MessageReader, stream: &mut S) -> Result<Bytes, Exception>
where
    S: AsyncRead + Unpin,
{
    match reader.read_head(stream).await {
        Ok(Some(head)) => Ok(head),
        Ok(None) => Err(Exception::EmptyRead),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => Err(Exception::MessageTooLarge),
        Err(e) => Err(Exception::ReceiveError(e.kind())),
    }
}

fn shutdown_requested(shutdown: &Option<watch::Receiver<bool>>) -> bool {
    shutdown.as_ref().map_or(false, |rx| *rx.borrow())
}

/// 等待停机信号。没有关联信号或发送端已经丢弃时永远不会完成。
async fn wait_for_shutdown(shutdown: Option<watch::Receiver<bool>>) {
    let mut rx = match shutdown {
        Some(rx) => rx,
        None => return std::future::pending().await,
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

/// 接受连接失败后的重试间隔
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// 记录接受连接的错误并等待一个重试间隔。
///
/// 文件描述符耗尽等错误会持续出现，立即重试会占满运行时。
async fn back_off_after_accept_error(e: &io::Error) {
    error!("接受连接时遇到错误：{}，{}毫秒后重试", e, ACCEPT_RETRY_DELAY.as_millis());
    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
}

/// 单连接文件服务器：接受一个连接，服务完毕，再接受下一个。
pub struct Server {
    listener: TcpListener,
    resolver: FileResolver,
    config: ServerConfig,
    served: Arc<AtomicU64>,
}

impl Server {
    /// 按配置绑定监听地址
    pub async fn bind(config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind((config.host(), config.port())).await?;
        let resolver = FileResolver::new(config.www_root_path(), config.default_document());
        Ok(Self {
            listener,
            resolver,
            config,
            served: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// 已服务完毕的连接数计数器，供管理控制台查询
    pub fn served_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.served)
    }

    /// 主循环：直到停机信号置位为止。单个连接的任何失败都不会使服务器退出。
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> io::Result<()> {
        let mode = self.config.mode();
        info!(
            "服务器开始在{}上接收连接，模式：{}，根目录：{}",
            self.local_addr()?,
            mode,
            self.resolver.root().display()
        );

        let mut id: u128 = 0;
        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = wait_for_shutdown(Some(shutdown.clone())) => {
                    info!("主循环接收到停机指令，正在退出...");
                    break;
                }
            };

            let (stream, addr) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    back_off_after_accept_error(&e).await;
                    continue;
                }
            };
            info!("[ID{}]与{}建立连接", id, addr);

            let summary = ServerSession::new(id, stream, &self.resolver, &self.config)
                .with_shutdown(shutdown.clone())
                .serve(mode)
                .await;
            self.served.fetch_add(1, Ordering::Relaxed);
            info!(
                "[ID{}]连接处理完毕，共发送{}个响应，最后状态：{:?}",
                id, summary.responses, summary.last_status
            );
            id += 1;
        }
        Ok(())
    }
}
