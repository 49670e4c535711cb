//! cfst-rs 命令行工具
//!
//! 交互式的 Cloudflare SpeedTest 测速入口

use anyhow::Context;
use cfst_rs::cli::{print_banner, print_codes, print_error, print_matches, print_success};
use cfst_rs::cli::{Cli, Commands};
use cfst_rs::logger::LoggerConfig;
use cfst_rs::{
    derive_proxy_list, ensure_executable, init_logger, AppConfig, CfstError, Fetcher, Outcome,
    Platform, ProbeRunner, Prompter, RegionCodeTable, Workflow,
};
use clap::Parser;
use std::io;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(Some(LoggerConfig::from_verbosity(
        cli.verbose,
        cli.log_format,
    )));

    // Ctrl-C 随时退出，状态码 0
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n\n用户取消操作，程序退出");
            std::process::exit(0);
        }
    });

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<CfstError>() {
            Some(CfstError::Cancelled) => {
                println!("\n\n用户取消操作，程序退出");
                ExitCode::SUCCESS
            }
            Some(error) => {
                print_error(error);
                log::debug!("{:#}", e);
                if error.is_fatal() {
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                }
            }
            None => {
                eprintln!("❌ {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let table = RegionCodeTable::load(&config.region_overlay_path());

    match cli.command() {
        Commands::Run => interactive(config, table).await?,
        Commands::Codes { region, export } => {
            print_codes(&mut io::stdout().lock(), &table, region.as_deref())?;
            if export {
                let path = config.region_overlay_path();
                table.save(&path)?;
                print_success(&format!("机场码已导出到: {}", path.display()));
            }
        }
        Commands::Find { query } => {
            print_matches(&mut io::stdout().lock(), &query, &table.find(&query))?;
        }
        Commands::Derive { input, output } => {
            let input = input.unwrap_or_else(|| config.result_path());
            let output = output.unwrap_or_else(|| config.proxy_list_path());
            let entries = derive_proxy_list(&input, &output)?;
            print_success(&format!(
                "已生成 {} 条反代地址: {}",
                entries,
                output.display()
            ));
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = &cli.work_dir {
        config = config.with_work_dir(dir);
    }
    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("无法创建工作目录 {}", config.work_dir.display()))?;
    log::debug!("配置: {:?}", config);
    Ok(config)
}

async fn interactive(config: AppConfig, table: RegionCodeTable) -> anyhow::Result<()> {
    print_banner(&mut io::stdout().lock(), &table)?;

    let platform = Platform::current()?;
    println!("\n[系统信息]");
    println!("  平台: {}", platform);
    println!("  测速程序: {}", platform.executable_name());

    println!("\n[程序准备]");
    let fetcher = Fetcher::new(config.http_timeout())?;
    let executable = ensure_executable(&platform, &config, &fetcher).await?;
    let runner = ProbeRunner::new(executable, &config);

    let mut workflow = Workflow::new(config, table, fetcher, runner, Prompter::stdio());
    match workflow.run().await? {
        Outcome::Tested { .. } => println!("\n测速已完成"),
        Outcome::ProxyListOnly { entries } => {
            println!("\n优选反代功能已完成，共 {} 条", entries)
        }
        Outcome::NoResult(reason) => println!("\n未进行测速: {}", reason),
    }
    Ok(())
}
