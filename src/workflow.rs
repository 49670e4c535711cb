//! 交互流程
//!
//! 三种功能：
//!
//! * 常规测速：地区扫描 → 选择地区 → 选择参数 → 指定地区测速
//! * 优选反代：从 CSV 生成反代列表，可选择继续测速
//! * 小白快速测试：只输入参数，对整个候选列表测速

use crate::aggregate::{aggregate, default_regions, RegionSummary};
use crate::config::AppConfig;
use crate::download::Fetcher;
use crate::error::{CfstError, Result};
use crate::iplist::{ensure_candidate_list, IpVersion};
use crate::prober::ProbeRunner;
use crate::prompt::Prompter;
use crate::proxy_list::derive_proxy_list;
use crate::regions::RegionCodeTable;
use crate::results::ScanSession;
use crate::selector::{select_region, ScopedRetest};
use crate::thresholds::{
    validate_count, validate_latency, validate_speed, Mode, Preset, Thresholds,
};
use std::fmt;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// 反代列表测速时显示的结果数量
pub const PROXY_DISPLAY_LIMIT: u32 = 20;

const SEPARATOR: &str = "============================================================";

/// 功能菜单
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Normal,
    Proxy,
    Quick,
}

impl Function {
    pub const ALL: [Function; 3] = [Function::Normal, Function::Proxy, Function::Quick];

    /// 菜单序号（从 1 开始）
    pub fn from_index(index: usize) -> Option<Self> {
        index.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Function::Normal => "常规测速 - 扫描地区后测试指定地区的 IP",
            Function::Proxy => "优选反代 - 从 CSV 文件生成反代 IP 列表",
            Function::Quick => "小白快速测试 - 简单输入，适合新手",
        };
        f.write_str(text)
    }
}

/// 流程结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 完整测速已完成
    Tested { result_file: PathBuf },
    /// 只生成了反代列表
    ProxyListOnly { entries: usize },
    /// 没有可测速的内容
    NoResult(String),
}

/// 交互流程
pub struct Workflow<R, W> {
    config: AppConfig,
    table: RegionCodeTable,
    fetcher: Fetcher,
    runner: ProbeRunner,
    prompter: Prompter<R, W>,
}

impl<R: BufRead, W: Write> Workflow<R, W> {
    pub fn new(
        config: AppConfig,
        table: RegionCodeTable,
        fetcher: Fetcher,
        runner: ProbeRunner,
        prompter: Prompter<R, W>,
    ) -> Self {
        Self {
            config,
            table,
            fetcher,
            runner,
            prompter,
        }
    }

    /// 取回交互器（测试中用于检查输出）
    pub fn into_prompter(self) -> Prompter<R, W> {
        self.prompter
    }

    /// 显示功能菜单并执行所选功能
    pub async fn run(&mut self) -> Result<Outcome> {
        let function = self.choose_function()?;
        match function {
            Function::Normal => self.normal_mode().await,
            Function::Proxy => self.proxy_mode().await,
            Function::Quick => self.quick_mode().await,
        }
    }

    /// 功能选择
    pub fn choose_function(&mut self) -> Result<Function> {
        self.prompter.say(SEPARATOR)?;
        self.prompter.say(" 功能选择")?;
        self.prompter.say(SEPARATOR)?;
        for (i, function) in Function::ALL.iter().enumerate() {
            self.prompter.say(format!("  {}. {}", i + 1, function))?;
        }
        let index = self
            .prompter
            .choose("请选择功能", Function::ALL.len(), 1)?;
        Function::from_index(index)
            .ok_or_else(|| CfstError::invalid_input(format!("无效的功能序号: {}", index)))
    }

    /// 常规测速
    pub async fn normal_mode(&mut self) -> Result<Outcome> {
        let list = self.prepare_candidates().await?;
        let (summaries, session) = self.discover(&list).await?;
        if summaries.is_empty() {
            self.prompter.say("❌ 未检测到可用地区，请检查网络连接")?;
            return Ok(Outcome::NoResult("未检测到可用地区".to_string()));
        }

        self.prompter.say(render_summaries(&summaries))?;
        let tag = match self.select_tag(&summaries)? {
            Some(tag) => tag,
            None => return Ok(Outcome::NoResult("未选择有效地区".to_string())),
        };
        let session = match session {
            Some(session) => session,
            None => return Ok(Outcome::NoResult(format!("没有 {} 地区的扫描结果", tag))),
        };

        let thresholds = self.choose_thresholds(Mode::Normal)?;
        self.prompter.say(format!(
            "\n测速参数: 地区={}，{}\n模式: 常规测速（指定地区）",
            tag, thresholds
        ))?;

        ScopedRetest::new(&self.runner, &self.config.work_dir)
            .run(&session, &tag, &thresholds)
            .await?;
        self.finish_test()
    }

    /// 小白快速测试
    pub async fn quick_mode(&mut self) -> Result<Outcome> {
        self.prompter.say(SEPARATOR)?;
        self.prompter.say(" 小白快速测试模式：只需输入 3 个数字即可开始")?;
        self.prompter.say(SEPARATOR)?;

        let list = self.prepare_candidates().await?;
        let thresholds = self.custom_thresholds(Mode::Quick)?;
        self.prompter.say(format!(
            "\n测速参数: {}\n模式: 小白快速测试（无需选择地区）",
            thresholds
        ))?;

        self.runner.run_full_test(&list, &thresholds, None).await?;
        self.finish_test()
    }

    /// 优选反代
    pub async fn proxy_mode(&mut self) -> Result<Outcome> {
        self.prompter.say(SEPARATOR)?;
        self.prompter.say(" 优选反代模式")?;
        self.prompter
            .say(" 从 CSV 文件中提取 IP 和端口，生成反代 IP 列表")?;
        self.prompter
            .say(" CSV 需包含 'IP 地址'/'ip' 列，端口列 '端口'/'port' 可选")?;
        self.prompter.say(SEPARATOR)?;

        let input = match self.select_csv_file()? {
            Some(input) => input,
            None => {
                self.prompter.say("未选择有效文件，退出优选反代模式")?;
                return Ok(Outcome::NoResult("未选择有效文件".to_string()));
            }
        };

        let output = self.config.proxy_list_path();
        let entries = match derive_proxy_list(&input, &output) {
            Ok(entries) => entries,
            Err(e) if !e.is_fatal() => {
                self.prompter.say(format!("❌ 生成反代列表失败: {}", e))?;
                return Ok(Outcome::NoResult(e.to_string()));
            }
            Err(e) => return Err(e),
        };
        self.prompter.say(format!(
            "✅ 已生成 {} 条反代地址: {}（格式: IP:端口，每行一个）",
            entries,
            output.display()
        ))?;

        if !self
            .prompter
            .confirm("是否对反代IP列表进行测速？", true)?
        {
            self.prompter.say("跳过测速，优选反代功能完成")?;
            return Ok(Outcome::ProxyListOnly { entries });
        }

        let thresholds = self.choose_thresholds(Mode::Proxy)?;
        self.prompter.say(format!(
            "\n测速参数: {}\n模式: 反代IP列表测速",
            thresholds
        ))?;
        self.runner
            .run_full_test(&output, &thresholds, Some(PROXY_DISPLAY_LIMIT))
            .await?;
        self.finish_test()
    }

    /// 选择参数：预设档位或自定义
    pub fn choose_thresholds(&mut self, mode: Mode) -> Result<Thresholds> {
        self.prompter.say(SEPARATOR)?;
        self.prompter.say(" 预设配置选项")?;
        self.prompter.say(SEPARATOR)?;
        for (i, preset) in Preset::ALL.iter().enumerate() {
            self.prompter.say(format!(
                "  {}. {} ({})",
                i + 1,
                preset.label(),
                preset.thresholds(mode)
            ))?;
        }
        self.prompter
            .say(format!("  {}. 自定义配置", Preset::ALL.len() + 1))?;

        let choice = self
            .prompter
            .choose("请选择配置", Preset::ALL.len() + 1, 1)?;
        match Preset::from_index(choice) {
            Some(preset) => {
                let thresholds = preset.thresholds(mode);
                self.prompter
                    .say(format!("✓ 已选择: {} ({})", preset.label(), thresholds))?;
                Ok(thresholds)
            }
            None => self.custom_thresholds(mode),
        }
    }

    fn custom_thresholds(&mut self, mode: Mode) -> Result<Thresholds> {
        let count =
            self.prompter
                .ask_validated("请输入要测试的IP数量", Some("10"), |raw| {
                    validate_count(raw, mode)
                })?;
        let max_latency_ms =
            self.prompter
                .ask_validated("请输入延迟上限 (ms)", Some("1000"), validate_latency)?;
        let min_speed_mbps =
            self.prompter
                .ask_validated("请输入下载速度下限 (MB/s)", Some("1"), |raw| {
                    validate_speed(raw, mode)
                })?;

        let thresholds = Thresholds {
            count,
            min_speed_mbps,
            max_latency_ms,
        };
        self.prompter
            .say(format!("✓ 自定义配置: {}", thresholds))?;
        Ok(thresholds)
    }

    async fn prepare_candidates(&mut self) -> Result<PathBuf> {
        self.prompter.say("  1. IPv4")?;
        self.prompter.say("  2. IPv6")?;
        let version = match self.prompter.choose("请选择 IP 版本", 2, 1)? {
            2 => IpVersion::V6,
            _ => IpVersion::V4,
        };
        ensure_candidate_list(version, &self.config, &self.fetcher).await
    }

    /// 获取地区汇总：优先复用已有扫描结果，检测失败时使用默认地区列表
    async fn discover(
        &mut self,
        list: &Path,
    ) -> Result<(Vec<RegionSummary>, Option<ScanSession>)> {
        let scan_path = self.runner.scan_file().to_path_buf();
        if scan_path.is_file() {
            self.prompter.say("发现已有的地区扫描结果文件")?;
            if !self.prompter.confirm("是否需要重新扫描？", false)? {
                match ScanSession::load(&scan_path) {
                    Ok(session) => {
                        self.prompter.say("使用已有检测结果...")?;
                        let summaries = aggregate(session.rows(), &self.table);
                        return Ok((summaries, Some(session)));
                    }
                    Err(e) => {
                        self.prompter
                            .say(format!("读取已有扫描结果失败（{}），重新扫描", e))?;
                    }
                }
            }
        }

        self.prompter
            .say("正在扫描所有地区，请稍候（约需1-2分钟）...")?;
        match self.runner.run_discovery(list).await {
            Ok(session) => {
                self.prompter.say(format!(
                    "地区扫描结果已保存到 {}",
                    session.path().display()
                ))?;
                let summaries = aggregate(session.rows(), &self.table);
                Ok((summaries, Some(session)))
            }
            Err(CfstError::Cancelled) => Err(CfstError::Cancelled),
            Err(e) if !e.is_fatal() => {
                self.prompter
                    .say(format!("地区检测失败（{}），使用默认地区列表", e))?;
                Ok((default_regions(&self.table), None))
            }
            Err(e) => Err(e),
        }
    }

    /// 选择地区，可输入序号或地区码
    ///
    /// 序号越界或地区码不在列表中时重新选择；所选地区没有可用 IP 时询问是否换一个。
    fn select_tag(&mut self, summaries: &[RegionSummary]) -> Result<Option<String>> {
        loop {
            let answer = self.prompter.ask(
                &format!("请选择地区 [1-{}] 或输入地区码", summaries.len()),
                Some("1"),
            )?;
            let tag = match answer.parse::<usize>() {
                Ok(index) if (1..=summaries.len()).contains(&index) => {
                    summaries[index - 1].region_tag.clone()
                }
                Ok(_) => {
                    self.prompter
                        .say(format!("✗ 请输入 1-{} 之间的数字", summaries.len()))?;
                    continue;
                }
                Err(_) => answer,
            };

            match select_region(summaries, &tag) {
                Ok(summary) => {
                    self.prompter.say(format!(
                        "✓ 已选择: {} ({}) - 可用 {} 个 IP",
                        summary.display_name, summary.region_tag, summary.endpoint_count
                    ))?;
                    return Ok(Some(summary.region_tag.clone()));
                }
                Err(CfstError::UnknownRegion(tag)) => {
                    self.prompter
                        .say(format!("✗ 地区 {} 不在列表中", tag))?;
                }
                Err(CfstError::NoEndpointsForRegion(tag)) => {
                    self.prompter
                        .say(format!("❌ 没有 {} 地区的可用 IP", tag))?;
                    if !self.prompter.confirm("是否选择其他地区？", false)? {
                        return Ok(None);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn select_csv_file(&mut self) -> Result<Option<PathBuf>> {
        loop {
            let answer = self
                .prompter
                .ask("请输入CSV文件路径", Some(self.config.result_file.as_str()))?;
            let path = PathBuf::from(&answer);
            let path = if path.is_relative() {
                self.config.work_dir.join(path)
            } else {
                path
            };
            if path.is_file() {
                self.prompter.say(format!("找到文件: {}", path.display()))?;
                return Ok(Some(path));
            }

            self.prompter.say(format!("文件不存在: {}", path.display()))?;
            self.prompter
                .say("请确保文件路径正确，或先运行常规测速生成 result.csv")?;
            if !self.prompter.confirm("是否重新输入？", true)? {
                return Ok(None);
            }
        }
    }

    fn finish_test(&mut self) -> Result<Outcome> {
        let result_file = self.runner.result_file().to_path_buf();
        self.prompter.say(format!(
            "\n✅ 测速完成！结果已保存到 {}",
            result_file.display()
        ))?;
        Ok(Outcome::Tested { result_file })
    }
}

/// 地区列表文本
pub fn render_summaries(summaries: &[RegionSummary]) -> String {
    let mut text = format!("\n可选地区（共 {} 个）:", summaries.len());
    for (i, summary) in summaries.iter().enumerate() {
        text.push_str(&format!(
            "\n  {}. {} - {} (可用{}个IP)",
            i + 1,
            summary.region_tag,
            summary.display_name,
            summary.endpoint_count
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;
    use tempfile::TempDir;

    type TestWorkflow = Workflow<Cursor<Vec<u8>>, Vec<u8>>;

    fn workflow(dir: &Path, input: &str) -> TestWorkflow {
        let config = AppConfig::default().with_work_dir(dir);
        let fetcher = Fetcher::with_strategies(Duration::from_secs(1), vec![]).unwrap();
        let runner = ProbeRunner::new(dir.join("missing-cfst"), &config);
        Workflow::new(
            config,
            RegionCodeTable::builtin(),
            fetcher,
            runner,
            Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new()),
        )
    }

    fn output(workflow: TestWorkflow) -> String {
        String::from_utf8(workflow.into_prompter().into_output()).unwrap()
    }

    #[test]
    fn test_function_from_index() {
        assert_eq!(Function::from_index(1), Some(Function::Normal));
        assert_eq!(Function::from_index(2), Some(Function::Proxy));
        assert_eq!(Function::from_index(3), Some(Function::Quick));
        assert_eq!(Function::from_index(4), None);
    }

    #[test]
    fn test_choose_thresholds_preset() {
        let dir = TempDir::new().unwrap();
        let mut wf = workflow(dir.path(), "3\n");
        let thresholds = wf.choose_thresholds(Mode::Proxy).unwrap();
        assert_eq!(thresholds, Preset::HighQuality.thresholds(Mode::Proxy));
    }

    #[test]
    fn test_choose_thresholds_custom() {
        let dir = TempDir::new().unwrap();
        let mut wf = workflow(dir.path(), "4\n30\n800\n2.5\n");
        let thresholds = wf.choose_thresholds(Mode::Normal).unwrap();
        assert_eq!(
            thresholds,
            Thresholds {
                count: 30,
                min_speed_mbps: 2.5,
                max_latency_ms: 800
            }
        );
    }

    #[tokio::test]
    async fn test_discovery_failure_offers_default_regions() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Cloudflare.txt"), "104.16.0.0/24\n").unwrap();
        // 功能 1，IPv4，选择第 1 个默认地区，不再选择其他地区
        let mut wf = workflow(dir.path(), "1\n1\n1\nn\n");

        let outcome = wf.run().await.unwrap();
        assert!(matches!(outcome, Outcome::NoResult(_)));
        let text = output(wf);
        assert!(text.contains("使用默认地区列表"));
        assert!(text.contains("HKG - 香港 (中国香港) (可用0个IP)"));
        assert!(text.contains("没有 HKG 地区的可用 IP"));
    }

    #[tokio::test]
    async fn test_proxy_mode_missing_file_cancelled() {
        let dir = TempDir::new().unwrap();
        let mut wf = workflow(dir.path(), "2\nnope.csv\nn\n");
        let outcome = wf.run().await.unwrap();
        assert!(matches!(outcome, Outcome::NoResult(_)));
        assert!(output(wf).contains("文件不存在"));
    }

    #[tokio::test]
    async fn test_proxy_mode_skip_retest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("result.csv"),
            "IP 地址,端口\n1.1.1.1,2053\n1.0.0.1,\n",
        )
        .unwrap();
        let mut wf = workflow(dir.path(), "2\n\nn\n");

        let outcome = wf.run().await.unwrap();
        assert_eq!(outcome, Outcome::ProxyListOnly { entries: 2 });
        assert_eq!(
            std::fs::read_to_string(dir.path().join("ips_ports.txt")).unwrap(),
            "1.1.1.1:2053\n1.0.0.1:443\n"
        );
    }

    #[tokio::test]
    async fn test_cancel_on_end_of_input() {
        let dir = TempDir::new().unwrap();
        let mut wf = workflow(dir.path(), "");
        assert!(matches!(wf.run().await, Err(CfstError::Cancelled)));
    }

    #[test]
    fn test_render_summaries() {
        let table = RegionCodeTable::builtin();
        let text = render_summaries(&default_regions(&table)[..2]);
        assert!(text.contains("共 2 个"));
        assert!(text.contains("2. SIN - 新加坡 (新加坡) (可用0个IP)"));
    }
}
