//! 外部测速程序调用
//!
//! 测速本身由 CloudflareST 完成，这里只负责拼接参数、启动进程并等待结束。
//! 地区检测模式有超时限制，超时后结束子进程。

use crate::config::AppConfig;
use crate::error::{CfstError, Result};
use crate::results::ScanSession;
use crate::thresholds::Thresholds;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// 测速程序调用器
#[derive(Debug, Clone)]
pub struct ProbeRunner {
    executable: PathBuf,
    scan_file: PathBuf,
    result_file: PathBuf,
    discovery_timeout: Duration,
    probe_url: String,
}

impl ProbeRunner {
    /// 使用配置中的输出文件、超时和探测地址创建
    pub fn new<P: Into<PathBuf>>(executable: P, config: &AppConfig) -> Self {
        Self {
            executable: executable.into(),
            scan_file: config.scan_path(),
            result_file: config.result_path(),
            discovery_timeout: config.discovery_timeout(),
            probe_url: config.probe_url.clone(),
        }
    }

    /// 修改地区检测超时
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// 地区扫描结果文件
    pub fn scan_file(&self) -> &Path {
        &self.scan_file
    }

    /// 完整测速结果文件
    pub fn result_file(&self) -> &Path {
        &self.result_file
    }

    /// 地区检测参数：只测延迟，并通过 HTTPing 获取地区码
    pub fn discovery_args(&self, list: &Path, output: &Path) -> Vec<String> {
        vec![
            "-dd".to_string(),
            "-tl".to_string(),
            "9999".to_string(),
            "-f".to_string(),
            list.display().to_string(),
            "-httping".to_string(),
            "-url".to_string(),
            self.probe_url.clone(),
            "-o".to_string(),
            output.display().to_string(),
        ]
    }

    /// 完整测速参数
    ///
    /// # Examples
    ///
    /// ```
    /// use cfst_rs::config::AppConfig;
    /// use cfst_rs::prober::ProbeRunner;
    /// use cfst_rs::thresholds::{Mode, Preset};
    /// use std::path::Path;
    ///
    /// let runner = ProbeRunner::new("cfst", &AppConfig::default());
    /// let args = runner.full_test_args(
    ///     Path::new("hkg_ips.txt"),
    ///     &Preset::Standard.thresholds(Mode::Normal),
    ///     Path::new("result.csv"),
    ///     None,
    /// );
    /// assert_eq!(
    ///     args,
    ///     ["-f", "hkg_ips.txt", "-dn", "20", "-sl", "5", "-tl", "500", "-o", "result.csv"]
    /// );
    /// ```
    pub fn full_test_args(
        &self,
        list: &Path,
        thresholds: &Thresholds,
        output: &Path,
        display_limit: Option<u32>,
    ) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            list.display().to_string(),
            "-dn".to_string(),
            thresholds.count.to_string(),
            "-sl".to_string(),
            thresholds.min_speed_mbps.to_string(),
            "-tl".to_string(),
            thresholds.max_latency_ms.to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ];
        if let Some(limit) = display_limit {
            args.push("-p".to_string());
            args.push(limit.to_string());
        }
        args
    }

    fn command(&self, args: Vec<String>) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }

    /// 地区检测：扫描整个候选列表并读取地区码
    ///
    /// 会先删除旧的扫描结果；进程失败、超时或没有生成结果文件都返回可恢复的错误。
    pub async fn run_discovery(&self, list: &Path) -> Result<ScanSession> {
        if tokio::fs::remove_file(&self.scan_file).await.is_ok() {
            log::debug!("已删除旧的扫描结果: {}", self.scan_file.display());
        }

        let args = self.discovery_args(list, &self.scan_file);
        log::info!("地区检测: {} {}", self.executable.display(), args.join(" "));

        let mut child = self.command(args).spawn().map_err(|e| {
            CfstError::probe_failed(format!(
                "无法启动测速程序 {}: {}",
                self.executable.display(),
                e
            ))
        })?;

        let status = match tokio::time::timeout(self.discovery_timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    log::warn!("结束测速进程失败: {}", e);
                }
                return Err(CfstError::timeout(format!(
                    "地区检测超过 {} 秒未完成",
                    self.discovery_timeout.as_secs()
                )));
            }
        };

        if !status.success() {
            return Err(CfstError::probe_failed(format!(
                "地区检测失败，测速程序退出状态: {}",
                status
            )));
        }
        if !self.scan_file.is_file() {
            return Err(CfstError::probe_failed(format!(
                "地区检测未生成结果文件: {}",
                self.scan_file.display()
            )));
        }

        ScanSession::load(&self.scan_file)
    }

    /// 完整测速（无超时），结果写入结果文件
    pub async fn run_full_test(
        &self,
        list: &Path,
        thresholds: &Thresholds,
        display_limit: Option<u32>,
    ) -> Result<ExitStatus> {
        let args = self.full_test_args(list, thresholds, &self.result_file, display_limit);
        log::info!("完整测速: {} {}", self.executable.display(), args.join(" "));

        let status = self
            .command(args)
            .status()
            .await
            .map_err(|e| {
                CfstError::probe_failed(format!(
                    "无法启动测速程序 {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        if !status.success() {
            return Err(CfstError::probe_failed(format!(
                "测速程序退出码: {}",
                status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "被信号终止".to_string())
            )));
        }
        Ok(status)
    }
}
