//! 候选 IP 列表
//!
//! 每行一个地址或 CIDR 段。IPv4 列表从 Cloudflare 官网下载，
//! IPv6 列表由内置地址段生成。

use crate::config::AppConfig;
use crate::download::Fetcher;
use crate::error::{CfstError, Result};
use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Cloudflare 公布的 IPv6 地址段
pub const CLOUDFLARE_IPV6_RANGES: &[&str] = &[
    "2400:cb00::/32",
    "2606:4700::/32",
    "2803:f800::/32",
    "2405:b500::/32",
    "2405:8100::/32",
    "2a06:98c0::/29",
    "2c0f:f248::/32",
];

/// IP 版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpVersion {
    #[default]
    V4,
    V6,
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("IPv4"),
            IpVersion::V6 => f.write_str("IPv6"),
        }
    }
}

impl IpVersion {
    /// 该版本对应的候选列表路径
    pub fn list_path(&self, config: &AppConfig) -> PathBuf {
        match self {
            IpVersion::V4 => config.path_of(&config.ipv4_file),
            IpVersion::V6 => config.path_of(&config.ipv6_file),
        }
    }
}

/// 读取候选列表，跳过空行和 `#` 注释行
///
/// 文件不存在时返回 `NotFound`，存在但无法读取或解码时返回 `EmptyList`。
pub fn read_endpoints(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CfstError::not_found(format!("{}: {}", path.display(), e)),
        _ => CfstError::empty_list(format!("无法读取 {}: {}", path.display(), e)),
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// 写入候选列表（整体覆盖）
pub fn write_endpoints<I, S>(path: &Path, endpoints: I) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut writer = BufWriter::new(fs::File::create(path)?);
    let mut count = 0;
    for endpoint in endpoints {
        writeln!(writer, "{}", endpoint.as_ref())?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

// 准备阶段读不到候选列表无法继续，一律按列表不可用处理
fn read_list(path: &Path) -> Result<Vec<String>> {
    read_endpoints(path).map_err(|e| match e {
        CfstError::EmptyList(_) => e,
        other => CfstError::empty_list(other.to_string()),
    })
}

/// 确保候选列表存在且非空
///
/// 已有的非空文件直接复用；IPv4 从配置的地址下载，IPv6 写入内置地址段。
pub async fn ensure_candidate_list(
    version: IpVersion,
    config: &AppConfig,
    fetcher: &Fetcher,
) -> Result<PathBuf> {
    let path = version.list_path(config);
    if path.is_file() && !read_list(&path)?.is_empty() {
        println!("✅ 使用已有IP文件: {}", path.display());
        return Ok(path);
    }

    match version {
        IpVersion::V4 => {
            println!("正在下载 Cloudflare IPv4 列表...");
            fetcher.fetch(&config.ipv4_url, &path).await?;
        }
        IpVersion::V6 => {
            println!("正在生成 Cloudflare IPv6 地址列表...");
            write_endpoints(&path, CLOUDFLARE_IPV6_RANGES).map_err(|e| {
                CfstError::empty_list(format!("无法写入 {}: {}", path.display(), e))
            })?;
        }
    }

    let count = read_list(&path)?.len();
    if count == 0 {
        return Err(CfstError::empty_list(format!(
            "{} 中没有可用的地址",
            path.display()
        )));
    }
    println!("{} 列表已保存到: {} (共 {} 条)", version, path.display(), count);
    Ok(path)
}
