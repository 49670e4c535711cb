//! 日志模块
//!
//! 基于 `env_logger` 的日志初始化。日志输出到 stderr，
//! 交互提示和测速结果输出到 stdout，两者互不干扰。

use std::io::Write;
use std::str::FromStr;
use std::sync::Once;

static INIT: Once = Once::new();

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// 日志级别
    pub level: log::LevelFilter,
    /// 是否显示时间戳
    pub show_timestamp: bool,
    /// 是否显示模块路径
    pub show_module: bool,
    /// 日志格式
    pub format: LogFormat,
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 简洁格式（带颜色）
    Compact,
    /// 详细格式
    Full,
    /// JSON格式，每行一条
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "full" => Ok(LogFormat::Full),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: log::LevelFilter::Warn,
            show_timestamp: true,
            show_module: false,
            format: LogFormat::Compact,
        }
    }
}

impl LoggerConfig {
    /// 根据命令行的 verbose 次数生成配置
    pub fn from_verbosity(verbose: u8, format: LogFormat) -> Self {
        let level = match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        Self {
            level,
            show_module: verbose >= 2,
            format,
            ..Default::default()
        }
    }
}

/// 初始化日志系统
///
/// 只有第一次调用生效。`RUST_LOG` 环境变量仍可覆盖模块级别。
///
/// # Examples
///
/// ```
/// use cfst_rs::logger::{init_logger, LogFormat, LoggerConfig};
///
/// init_logger(Some(LoggerConfig::from_verbosity(1, LogFormat::Compact)));
/// ```
pub fn init_logger(config: Option<LoggerConfig>) {
    INIT.call_once(|| {
        let config = config.unwrap_or_default();

        let mut builder = env_logger::Builder::new();
        builder.filter_level(config.level);
        builder.parse_env("RUST_LOG");
        builder.target(env_logger::Target::Stderr);

        match config.format {
            LogFormat::Compact => {
                builder.format(move |buf, record| {
                    let color = match record.level() {
                        log::Level::Error => "\x1b[31m",
                        log::Level::Warn => "\x1b[33m",
                        log::Level::Info => "\x1b[32m",
                        log::Level::Debug => "\x1b[36m",
                        log::Level::Trace => "\x1b[37m",
                    };
                    let reset = "\x1b[0m";

                    if config.show_timestamp {
                        writeln!(
                            buf,
                            "[{}] {}{:5}{} {}",
                            chrono::Local::now().format("%H:%M:%S"),
                            color,
                            record.level(),
                            reset,
                            record.args()
                        )
                    } else {
                        writeln!(buf, "{}{:5}{} {}", color, record.level(), reset, record.args())
                    }
                });
            }
            LogFormat::Full => {
                builder.format(move |buf, record| {
                    let mut parts = Vec::with_capacity(4);

                    if config.show_timestamp {
                        parts.push(format!(
                            "[{}]",
                            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
                        ));
                    }
                    parts.push(format!("[{}]", record.level()));
                    if config.show_module {
                        if let Some(module) = record.module_path() {
                            parts.push(format!("[{}]", module));
                        }
                    }
                    parts.push(record.args().to_string());

                    writeln!(buf, "{}", parts.join(" "))
                });
            }
            LogFormat::Json => {
                builder.format(move |buf, record| {
                    let entry = serde_json::json!({
                        "timestamp": chrono::Local::now().to_rfc3339(),
                        "level": record.level().to_string(),
                        "target": record.target(),
                        "message": record.args().to_string(),
                    });
                    writeln!(buf, "{}", entry)
                });
            }
        }

        // 测试中可能已有其他 logger，忽略重复初始化
        let _ = builder.try_init();
    });
}
