use crate::logger::LogFormat;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cfst-rs")]
#[command(about = "Cloudflare SpeedTest 跨平台自动化工具", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(short, long, global = true, help = "配置文件路径 (YAML)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "工作目录，默认为当前目录")]
    pub work_dir: Option<PathBuf>,

    #[arg(short, long, global = true, action = ArgAction::Count, help = "日志详细程度，可重复 (-v/-vv/-vvv)")]
    pub verbose: u8,

    #[arg(long, global = true, default_value = "compact", help = "日志格式: compact/full/json")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "交互式测速（默认）")]
    Run,

    #[command(about = "浏览内置机场码")]
    Codes {
        #[arg(short, long, help = "只显示指定大区，如 亚太/北美/欧洲；popular 显示热门地区")]
        region: Option<String>,

        #[arg(long, help = "将当前码表导出到本地机场码文件，便于手动修改")]
        export: bool,
    },

    #[command(about = "按城市、国家或机场码搜索")]
    Find {
        #[arg(help = "搜索关键字")]
        query: String,
    },

    #[command(about = "从测速结果 CSV 生成反代 IP 列表")]
    Derive {
        #[arg(short, long, help = "输入 CSV 文件，默认为 result.csv")]
        input: Option<PathBuf>,

        #[arg(short, long, help = "输出文件，默认为 ips_ports.txt")]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// 未指定子命令时进入交互模式
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}
