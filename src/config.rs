//! 配置管理模块
//!
//! 提供运行目录、文件名、下载地址和超时等配置。
//! 所有字段都有默认值，可选的 YAML 配置文件只需写出要覆盖的字段。

use crate::error::{CfstError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认的测速程序发布地址（反代版本）
pub const DEFAULT_RELEASE_BASE: &str =
    "https://github.com/byJoey/CloudflareSpeedTest/releases/download/v1.0";

/// 默认的 Cloudflare IPv4 列表地址
pub const DEFAULT_IPV4_URL: &str = "https://www.cloudflare.com/ips-v4/";

/// HTTPing 模式下用于获取地区码的测试地址
pub const DEFAULT_PROBE_URL: &str = "https://cf.xiu2.xyz/url";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// 工作目录，所有相对文件名都相对于此目录
    pub work_dir: PathBuf,
    /// IPv4 候选列表文件名
    pub ipv4_file: String,
    /// IPv6 候选列表文件名
    pub ipv6_file: String,
    /// 地区扫描结果文件名（ScanSession）
    pub scan_file: String,
    /// 完整测速结果文件名
    pub result_file: String,
    /// 反代 IP 列表文件名
    pub proxy_list_file: String,
    /// 本地机场码覆盖文件名
    pub region_overlay_file: String,
    /// 测速程序发布地址
    pub release_base_url: String,
    /// IPv4 列表下载地址
    pub ipv4_url: String,
    /// 地区检测使用的 HTTPing 地址
    pub probe_url: String,
    /// 地区检测超时（秒）
    pub discovery_timeout_secs: u64,
    /// 单次下载超时（秒）
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            ipv4_file: "Cloudflare.txt".to_string(),
            ipv6_file: "Cloudflare_ipv6.txt".to_string(),
            scan_file: "region_scan.csv".to_string(),
            result_file: "result.csv".to_string(),
            proxy_list_file: "ips_ports.txt".to_string(),
            region_overlay_file: "airport_codes.json".to_string(),
            release_base_url: DEFAULT_RELEASE_BASE.to_string(),
            ipv4_url: DEFAULT_IPV4_URL.to_string(),
            probe_url: DEFAULT_PROBE_URL.to_string(),
            discovery_timeout_secs: 120,
            http_timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// 从 YAML 文件加载配置
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cfst_rs::config::AppConfig;
    ///
    /// # fn main() -> cfst_rs::Result<()> {
    /// let config = AppConfig::load_from_file("cfst-rs.yaml")?;
    /// println!("{}", config.scan_file);
    /// # Ok(())
    /// # }
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CfstError::config(format!("无法读取配置文件 {}: {}", path.display(), e))
        })?;
        Self::load_from_str(&content)
            .map_err(|e| CfstError::config(format!("{}: {}", path.display(), e)))
    }

    /// 从 YAML 字符串加载配置
    pub fn load_from_str(content: &str) -> Result<Self> {
        let config: AppConfig = if content.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.discovery_timeout_secs == 0 {
            return Err(CfstError::config("discovery_timeout_secs 必须大于 0"));
        }
        if self.http_timeout_secs == 0 {
            return Err(CfstError::config("http_timeout_secs 必须大于 0"));
        }
        for (field, value) in [
            ("ipv4_file", &self.ipv4_file),
            ("ipv6_file", &self.ipv6_file),
            ("scan_file", &self.scan_file),
            ("result_file", &self.result_file),
            ("proxy_list_file", &self.proxy_list_file),
        ] {
            if value.trim().is_empty() {
                return Err(CfstError::config(format!("{} 不能为空", field)));
            }
        }
        url::Url::parse(&self.release_base_url)?;
        url::Url::parse(&self.ipv4_url)?;
        url::Url::parse(&self.probe_url)?;
        Ok(())
    }

    /// 覆盖工作目录
    pub fn with_work_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// 将文件名解析为工作目录下的路径
    pub fn path_of(&self, file: &str) -> PathBuf {
        self.work_dir.join(file)
    }

    /// 地区扫描结果路径
    pub fn scan_path(&self) -> PathBuf {
        self.path_of(&self.scan_file)
    }

    /// 完整测速结果路径
    pub fn result_path(&self) -> PathBuf {
        self.path_of(&self.result_file)
    }

    /// 反代列表路径
    pub fn proxy_list_path(&self) -> PathBuf {
        self.path_of(&self.proxy_list_file)
    }

    /// 机场码覆盖文件路径
    pub fn region_overlay_path(&self) -> PathBuf {
        self.path_of(&self.region_overlay_file)
    }

    /// 地区检测超时
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    /// 下载超时
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
