// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 资源解析模块
//!
//! 将请求路径映射到服务根目录下的本地文件，并读取其内容。
//!
//! ## 映射规则
//! 1. `""` 或 `"/"` -> 服务根目录下的默认文档（通常为 `index.html`）。
//! 2. 其余路径去掉一个前导 `/` 后拼接到服务根目录。
//! 3. 含有 `..`、根目录或盘符前缀的路径一律拒绝，防止目录遍历。

use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

use bytes::Bytes;
use log::debug;

use crate::exception::Exception;

/// 资源来源。服务端会话只依赖这个接口，便于在测试中注入各种失败。
#[cfg_attr(test, mockall::automock)]
pub trait Resolve {
    /// 返回请求路径对应的文件内容。
    ///
    /// 文件不存在时返回 [`Exception::NotFound`]，路径越权时返回 [`Exception::InvalidPath`]，
    /// 其余读取失败返回 [`Exception::ReadFailure`]。
    fn resolve(&self, path: &str) -> Result<Bytes, Exception>;
}

/// 基于本地文件系统的资源解析器
#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
    default_document: String,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>, default_document: &str) -> Self {
        Self {
            root: root.into(),
            default_document: default_document.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 计算请求路径对应的物理路径，不访问文件系统。
    pub fn locate(&self, path: &str) -> Result<PathBuf, Exception> {
        let relative = path.strip_prefix('/').unwrap_or(path);
        if relative.is_empty() {
            return Ok(self.root.join(&self.default_document));
        }

        let relative = Path::new(relative);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(Exception::InvalidPath);
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

impl Resolve for FileResolver {
    fn resolve(&self, path: &str) -> Result<Bytes, Exception> {
        let full_path = self.locate(path)?;
        debug!("映射物理路径：{}", full_path.display());

        match fs::read(&full_path) {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Exception::NotFound),
            Err(e) => Err(Exception::ReadFailure(e.kind())),
        }
    }
}
