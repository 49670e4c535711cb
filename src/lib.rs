//! # cfst-rs
//!
//! Cloudflare SpeedTest（CloudflareST）的跨平台自动化包装。
//! 负责下载测速程序和候选 IP 列表、按地区扫描数据中心、
//! 对指定地区进行完整测速，以及从测速结果生成反代 IP 列表。
//! 延迟和速度的测量全部由外部测速程序完成。

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod iplist;
pub mod logger;
pub mod platform;
pub mod prober;
pub mod prompt;
pub mod proxy_list;
pub mod regions;
pub mod results;
pub mod selector;
pub mod thresholds;
pub mod workflow;

// 重新导出主要的公共接口
pub use aggregate::{aggregate, default_regions, RegionSummary};
pub use config::AppConfig;
pub use download::{ensure_executable, FetchStrategy, Fetcher};
pub use error::{CfstError, ErrorCategory, Result};
pub use iplist::{ensure_candidate_list, IpVersion};
pub use platform::{Arch, Os, Platform};
pub use prober::ProbeRunner;
pub use prompt::Prompter;
pub use proxy_list::{derive_entries, derive_proxy_list, ProxyEntry};
pub use regions::{RegionCodeTable, RegionInfo};
pub use results::{ProbeResultRow, ResultTable, ScanSession};
pub use selector::{scoped_endpoints, select_region, ScopedRetest};
pub use thresholds::{Mode, Preset, Thresholds};
pub use workflow::{Outcome, Workflow};

/// 版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 初始化日志系统
///
/// # Arguments
///
/// * `config` - 日志配置，如果为None则使用默认配置
///
/// # Examples
///
/// ```
/// use cfst_rs::logger::{LogFormat, LoggerConfig};
///
/// // 使用默认配置
/// cfst_rs::init_logger(None);
///
/// // 根据 -v 次数生成配置
/// cfst_rs::init_logger(Some(LoggerConfig::from_verbosity(2, LogFormat::Full)));
/// ```
pub fn init_logger(config: Option<logger::LoggerConfig>) {
    logger::init_logger(config);
}
