//! 错误处理模块
//!
//! 定义了测速流程中使用的所有错误类型和结果类型。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 测速工具的主要错误类型
#[derive(Error, Debug)]
pub enum CfstError {
    /// HTTP 请求错误
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// CSV 解析错误
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// URL 解析错误
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// IO 错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// 不支持的平台
    #[error("不支持的平台: {0}")]
    UnsupportedPlatform(String),

    /// 下载错误（所有下载方式均失败）
    #[error("下载错误: {0}")]
    Download(String),

    /// 解压错误
    #[error("解压错误: {0}")]
    Extract(String),

    /// 候选 IP 列表为空或不可用
    #[error("IP列表不可用: {0}")]
    EmptyList(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 外部测速程序执行失败
    #[error("测速程序执行失败: {0}")]
    ProbeFailed(String),

    /// 超时错误
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// 文件未找到
    #[error("文件未找到: {0}")]
    NotFound(String),

    /// 结果表缺少必需的列
    #[error("缺少必需的列: {0}")]
    MissingColumn(String),

    /// 结果表为空
    #[error("结果表为空: {0}")]
    EmptyTable(String),

    /// 无效的用户输入
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 地区码不在当前地区列表中
    #[error("未知地区: {0}")]
    UnknownRegion(String),

    /// 地区存在但没有可用的 IP
    #[error("地区 {0} 没有可用的IP")]
    NoEndpointsForRegion(String),

    /// 用户取消操作
    #[error("用户取消操作")]
    Cancelled,
}

/// 测速工具的结果类型
pub type Result<T> = std::result::Result<T, CfstError>;

/// 错误分类
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 启动准备阶段的错误，程序无法继续
    Setup,
    /// 地区检测阶段的错误，可回退到默认地区列表
    Discovery,
    /// 输入文件或用户输入错误，可重新输入
    Input,
    /// 网络传输错误
    Transport,
    /// 内部错误
    Internal,
}

impl CfstError {
    /// 创建不支持的平台错误
    pub fn unsupported_platform<S: Into<String>>(msg: S) -> Self {
        let error = CfstError::UnsupportedPlatform(msg.into());
        error.log_error();
        error
    }

    /// 创建下载错误
    pub fn download<S: Into<String>>(msg: S) -> Self {
        let error = CfstError::Download(msg.into());
        error.log_error();
        error
    }

    /// 创建解压错误
    pub fn extract<S: Into<String>>(msg: S) -> Self {
        let error = CfstError::Extract(msg.into());
        error.log_error();
        error
    }

    /// 创建IP列表错误
    pub fn empty_list<S: Into<String>>(msg: S) -> Self {
        let error = CfstError::EmptyList(msg.into());
        error.log_error();
        error
    }

    /// 创建配置错误
    pub fn config<S: Into<String>>(msg: S) -> Self {
        let error = CfstError::Config(msg.into());
        error.log_error();
        error
    }

    /// 创建测速失败错误
    pub fn probe_failed<S: Into<String>>(msg: S) -> Self {
        let error = CfstError::ProbeFailed(msg.into());
        error.log_error();
        error
    }

    /// 创建超时错误
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        let error = CfstError::Timeout(msg.into());
        error.log_error();
        error
    }

    /// 创建文件未找到错误
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        let error = CfstError::NotFound(msg.into());
        error.log_error();
        error
    }

    /// 创建缺少列错误
    pub fn missing_column<S: Into<String>>(msg: S) -> Self {
        let error = CfstError::MissingColumn(msg.into());
        error.log_error();
        error
    }

    /// 创建空表错误
    pub fn empty_table<S: Into<String>>(msg: S) -> Self {
        let error = CfstError::EmptyTable(msg.into());
        error.log_error();
        error
    }

    /// 创建无效输入错误
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        CfstError::InvalidInput(msg.into())
    }

    /// 获取错误分类
    pub fn category(&self) -> ErrorCategory {
        match self {
            CfstError::UnsupportedPlatform(_)
            | CfstError::Download(_)
            | CfstError::Extract(_)
            | CfstError::EmptyList(_)
            | CfstError::Config(_)
            | CfstError::Yaml(_) => ErrorCategory::Setup,
            CfstError::ProbeFailed(_) | CfstError::Timeout(_) => ErrorCategory::Discovery,
            CfstError::NotFound(_)
            | CfstError::MissingColumn(_)
            | CfstError::EmptyTable(_)
            | CfstError::Csv(_)
            | CfstError::Json(_)
            | CfstError::InvalidInput(_)
            | CfstError::UnknownRegion(_)
            | CfstError::NoEndpointsForRegion(_)
            | CfstError::Cancelled => ErrorCategory::Input,
            CfstError::Http(_) | CfstError::UrlParse(_) => ErrorCategory::Transport,
            CfstError::Io(_) => ErrorCategory::Internal,
        }
    }

    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            CfstError::Http(_) => "HTTP_ERROR",
            CfstError::Json(_) => "JSON_ERROR",
            CfstError::Yaml(_) => "YAML_ERROR",
            CfstError::Csv(_) => "CSV_ERROR",
            CfstError::UrlParse(_) => "URL_PARSE_ERROR",
            CfstError::Io(_) => "IO_ERROR",
            CfstError::UnsupportedPlatform(_) => "UNSUPPORTED_PLATFORM",
            CfstError::Download(_) => "DOWNLOAD_ERROR",
            CfstError::Extract(_) => "EXTRACT_ERROR",
            CfstError::EmptyList(_) => "EMPTY_LIST",
            CfstError::Config(_) => "CONFIG_ERROR",
            CfstError::ProbeFailed(_) => "PROBE_FAILED",
            CfstError::Timeout(_) => "TIMEOUT_ERROR",
            CfstError::NotFound(_) => "NOT_FOUND",
            CfstError::MissingColumn(_) => "MISSING_COLUMN",
            CfstError::EmptyTable(_) => "EMPTY_TABLE",
            CfstError::InvalidInput(_) => "INVALID_INPUT",
            CfstError::UnknownRegion(_) => "UNKNOWN_REGION",
            CfstError::NoEndpointsForRegion(_) => "NO_ENDPOINTS_FOR_REGION",
            CfstError::Cancelled => "CANCELLED",
        }
    }

    /// 是否为致命错误（程序应以非零状态退出）
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Setup
    }

    /// 获取建议的解决方案
    pub fn suggestion(&self) -> Option<String> {
        match self {
            CfstError::UnsupportedPlatform(_) => {
                Some("仅支持 windows/macos/linux 的 amd64/arm64/arm 架构".to_string())
            }
            CfstError::Download(_) => Some("请检查网络连接，或按提示手动下载文件".to_string()),
            CfstError::Timeout(_) => Some("请检查网络延迟，或在配置文件中增大超时时间".to_string()),
            CfstError::MissingColumn(_) => {
                Some("CSV 文件需包含 'IP 地址' 或 'ip' 列".to_string())
            }
            CfstError::NotFound(_) => Some("请确认文件路径正确，或先运行常规测速".to_string()),
            CfstError::Config(_) => Some("请检查配置文件格式和内容".to_string()),
            _ => None,
        }
    }

    /// 记录错误日志
    fn log_error(&self) {
        log::error!("[{}] {}", self.code(), self);
    }
}
