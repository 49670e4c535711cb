//! 下载模块
//!
//! 按顺序尝试多种下载方式（reqwest、wget、curl、PowerShell、HTTP 降级），
//! 任一成功即返回；全部失败时汇总每种方式的失败原因。
//! 同时负责解压测速程序发布包并设置可执行权限。

use crate::config::AppConfig;
use crate::error::{CfstError, Result};
use crate::platform::Platform;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// 发布包内测速程序文件名前缀
const EXECUTABLE_PREFIX: &str = "CloudflareST_proxy_";

/// 下载方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// reqwest 直接请求原地址
    Reqwest,
    /// 外部 wget
    Wget,
    /// 外部 curl
    Curl,
    /// Windows PowerShell `Invoke-WebRequest`
    PowerShell,
    /// 将 https 降级为 http 后再用 reqwest 请求
    PlainHttp,
}

impl FetchStrategy {
    /// 当前平台的默认下载顺序
    pub fn defaults() -> Vec<FetchStrategy> {
        let mut strategies = vec![
            FetchStrategy::Reqwest,
            FetchStrategy::Wget,
            FetchStrategy::Curl,
        ];
        if cfg!(windows) {
            strategies.push(FetchStrategy::PowerShell);
        }
        strategies.push(FetchStrategy::PlainHttp);
        strategies
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchStrategy::Reqwest => "reqwest",
            FetchStrategy::Wget => "wget",
            FetchStrategy::Curl => "curl",
            FetchStrategy::PowerShell => "powershell",
            FetchStrategy::PlainHttp => "http",
        };
        f.write_str(name)
    }
}

/// 多方式下载器
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    strategies: Vec<FetchStrategy>,
    timeout: Duration,
}

impl Fetcher {
    /// 使用默认下载顺序创建下载器
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_strategies(timeout, FetchStrategy::defaults())
    }

    /// 使用指定的下载顺序创建下载器
    pub fn with_strategies(timeout: Duration, strategies: Vec<FetchStrategy>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cfst-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CfstError::download(format!("无法创建 HTTP 客户端: {}", e)))?;
        Ok(Self {
            client,
            strategies,
            timeout,
        })
    }

    /// 下载 `url` 到 `dest`，返回成功的下载方式
    ///
    /// 先写入 `<dest>.part`，成功后再替换 `dest`，失败不会留下半截文件。
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchStrategy> {
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let partial = partial_path(dest);
        let mut failures = Vec::new();

        for &strategy in &self.strategies {
            log::debug!("尝试使用 {} 下载 {}", strategy, url);
            match self.attempt(strategy, url, &partial).await {
                Ok(()) => {
                    tokio::fs::rename(&partial, dest).await?;
                    log::info!("下载完成 ({}): {}", strategy, dest.display());
                    return Ok(strategy);
                }
                Err(e) => {
                    log::debug!("{} 下载失败: {}", strategy, e);
                    failures.push(format!("{}: {}", strategy, e));
                    let _ = tokio::fs::remove_file(&partial).await;
                }
            }
        }

        Err(CfstError::download(format!(
            "{} -> {} 全部下载方式失败 [{}]",
            url,
            dest.display(),
            failures.join("; ")
        )))
    }

    async fn attempt(&self, strategy: FetchStrategy, url: &str, dest: &Path) -> Result<()> {
        match strategy {
            FetchStrategy::Reqwest => self.fetch_with_reqwest(url, dest).await?,
            FetchStrategy::PlainHttp => {
                let mut parsed = url::Url::parse(url)?;
                if parsed.scheme() != "https" {
                    return Err(CfstError::invalid_input("地址不是 https，跳过降级"));
                }
                parsed
                    .set_scheme("http")
                    .map_err(|_| CfstError::invalid_input("无法降级为 http"))?;
                self.fetch_with_reqwest(parsed.as_str(), dest).await?
            }
            FetchStrategy::Wget => {
                let mut cmd = Command::new("wget");
                cmd.arg("-q").arg("-O").arg(dest).arg(url);
                self.run_tool(cmd, "wget").await?
            }
            FetchStrategy::Curl => {
                let mut cmd = Command::new("curl");
                cmd.arg("-fsSL").arg("-o").arg(dest).arg(url);
                self.run_tool(cmd, "curl").await?
            }
            FetchStrategy::PowerShell => {
                let script = format!(
                    "Invoke-WebRequest -Uri \"{}\" -OutFile \"{}\"",
                    url,
                    dest.display()
                );
                let mut cmd = Command::new("powershell");
                cmd.arg("-NoProfile").arg("-Command").arg(script);
                self.run_tool(cmd, "powershell").await?
            }
        }

        ensure_non_empty(dest)
    }

    async fn fetch_with_reqwest(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(CfstError::Download(format!(
                "{} 返回 HTTP {}",
                url,
                response.status()
            )));
        }
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }

    async fn run_tool(&self, mut cmd: Command, name: &str) -> Result<()> {
        cmd.stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| CfstError::Timeout(format!("{} 超过 {:?}", name, self.timeout)))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CfstError::Download(format!(
                "{} 退出状态 {}: {}",
                name,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

fn ensure_non_empty(path: &Path) -> Result<()> {
    let len = fs::metadata(path)
        .map_err(|e| CfstError::Download(format!("{} 未生成: {}", path.display(), e)))?
        .len();
    if len == 0 {
        return Err(CfstError::Download(format!("{} 为空文件", path.display())));
    }
    Ok(())
}

fn is_executable_entry(name: &Path) -> bool {
    name.file_name()
        .and_then(|n| n.to_str())
        .map(|n| {
            n.starts_with(EXECUTABLE_PREFIX) && !n.ends_with(".zip") && !n.ends_with(".tar.gz")
        })
        .unwrap_or(false)
}

/// 从发布包中解压测速程序到 `dest`
///
/// 支持 `.zip` 与 `.tar.gz`。在 Unix 上会设置 0o755 权限。
pub fn extract_executable(archive: &Path, dest: &Path) -> Result<()> {
    let archive_name = archive.to_string_lossy();
    let found = if archive_name.ends_with(".zip") {
        extract_from_zip(archive, dest)?
    } else if archive_name.ends_with(".tar.gz") || archive_name.ends_with(".tgz") {
        extract_from_tar_gz(archive, dest)?
    } else {
        return Err(CfstError::extract(format!(
            "无法识别的压缩格式: {}",
            archive.display()
        )));
    };

    if !found {
        return Err(CfstError::extract(format!(
            "{} 中未找到 {}* 可执行文件",
            archive.display(),
            EXECUTABLE_PREFIX
        )));
    }

    mark_executable(dest)
}

fn archive_error(archive: &Path, e: impl fmt::Display) -> CfstError {
    CfstError::extract(format!("解压 {} 失败: {}", archive.display(), e))
}

fn extract_from_zip(archive: &Path, dest: &Path) -> Result<bool> {
    let file = fs::File::open(archive).map_err(|e| archive_error(archive, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| archive_error(archive, e))?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| archive_error(archive, e))?;
        if entry.is_dir() || !is_executable_entry(Path::new(entry.name())) {
            continue;
        }
        let mut out = fs::File::create(dest).map_err(|e| archive_error(archive, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| archive_error(archive, e))?;
        return Ok(true);
    }
    Ok(false)
}

fn extract_from_tar_gz(archive: &Path, dest: &Path) -> Result<bool> {
    let file = fs::File::open(archive).map_err(|e| archive_error(archive, e))?;
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(file));

    // 下载到的可能是网页而非压缩包，gzip 头校验失败也算解压失败
    for entry in tar.entries().map_err(|e| archive_error(archive, e))? {
        let mut entry = entry.map_err(|e| archive_error(archive, e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry
            .path()
            .map_err(|e| archive_error(archive, e))?
            .into_owned();
        if is_executable_entry(&path) {
            entry.unpack(dest).map_err(|e| archive_error(archive, e))?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// 设置可执行权限（Unix）
pub fn mark_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let chmod_error = |e: io::Error| {
            CfstError::extract(format!("设置 {} 可执行权限失败: {}", path.display(), e))
        };
        let mut perms = fs::metadata(path).map_err(chmod_error)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).map_err(chmod_error)?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// 确保当前平台的测速程序存在，必要时下载并解压
///
/// 所有下载方式失败时返回的错误中包含手动下载地址和期望的文件名。
pub async fn ensure_executable(
    platform: &Platform,
    config: &AppConfig,
    fetcher: &Fetcher,
) -> Result<PathBuf> {
    let exe_path = config.path_of(&platform.executable_name());
    if exe_path.is_file() {
        log::info!("使用已有测速程序: {}", exe_path.display());
        mark_executable(&exe_path)?;
        return Ok(exe_path);
    }

    let url = platform.download_url(&config.release_base_url);
    let archive_path = config.path_of(&platform.archive_name());
    println!("未找到测速程序，正在下载: {}", url);

    if let Err(e) = fetcher.fetch(&url, &archive_path).await {
        return Err(CfstError::Download(format!(
            "{}；请手动下载 {} 并解压为 {}",
            e,
            url,
            exe_path.display()
        )));
    }

    let extracted = extract_executable(&archive_path, &exe_path);
    if let Err(e) = fs::remove_file(&archive_path) {
        log::warn!("清理压缩包失败 {}: {}", archive_path.display(), e);
    }
    extracted?;

    println!("✓ 测速程序已就绪: {}", exe_path.display());
    Ok(exe_path)
}
