//! 指定地区测速
//!
//! 从扫描结果中筛出某个地区的地址，写入临时列表后进行完整测速。
//! 临时列表在测速结束后删除，扫描结果保留供下次使用。

use crate::aggregate::RegionSummary;
use crate::error::{CfstError, Result};
use crate::iplist::write_endpoints;
use crate::prober::ProbeRunner;
use crate::results::ScanSession;
use crate::thresholds::Thresholds;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// 校验用户选择的地区码
///
/// 不在汇总中返回 `UnknownRegion`；汇总中数量为 0（默认地区列表）返回
/// `NoEndpointsForRegion`。
pub fn select_region<'a>(summaries: &'a [RegionSummary], tag: &str) -> Result<&'a RegionSummary> {
    let tag = tag.trim().to_ascii_uppercase();
    let summary = summaries
        .iter()
        .find(|s| s.region_tag == tag)
        .ok_or_else(|| CfstError::UnknownRegion(tag.clone()))?;
    if summary.endpoint_count == 0 {
        return Err(CfstError::NoEndpointsForRegion(tag));
    }
    Ok(summary)
}

/// 扫描结果中属于该地区的地址，保持原有顺序
pub fn scoped_endpoints<'a>(session: &'a ScanSession, tag: &str) -> Vec<&'a str> {
    session.endpoints_in(tag)
}

/// 地区临时列表文件名，如 `hkg_ips.txt`
pub fn scoped_file_name(tag: &str) -> String {
    format!("{}_ips.txt", tag.to_ascii_lowercase())
}

/// 指定地区测速
#[derive(Debug)]
pub struct ScopedRetest<'a> {
    runner: &'a ProbeRunner,
    work_dir: PathBuf,
}

/// 测速结束后删除临时列表
struct ScopedFile {
    path: PathBuf,
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("已删除临时列表: {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("删除临时列表失败 {}: {}", self.path.display(), e),
        }
    }
}

impl<'a> ScopedRetest<'a> {
    /// 临时列表写在 `work_dir` 下
    pub fn new<P: AsRef<Path>>(runner: &'a ProbeRunner, work_dir: P) -> Self {
        Self {
            runner,
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    /// 临时列表路径
    pub fn scoped_path(&self, tag: &str) -> PathBuf {
        self.work_dir.join(scoped_file_name(tag))
    }

    /// 对指定地区进行完整测速
    pub async fn run(
        &self,
        session: &ScanSession,
        tag: &str,
        thresholds: &Thresholds,
    ) -> Result<ExitStatus> {
        let tag = tag.trim().to_ascii_uppercase();
        let endpoints = scoped_endpoints(session, &tag);
        if endpoints.is_empty() {
            return Err(CfstError::NoEndpointsForRegion(tag));
        }

        let scoped = ScopedFile {
            path: self.scoped_path(&tag),
        };
        let written = write_endpoints(&scoped.path, &endpoints)?;
        println!(
            "已筛选出 {} 地区的 {} 个 IP: {}",
            tag,
            written,
            scoped.path.display()
        );

        self.runner
            .run_full_test(&scoped.path, thresholds, None)
            .await
    }
}
