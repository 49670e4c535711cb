//! 集成测试
//!
//! 使用伪测速程序跑通完整的交互流程

#![cfg(unix)]


use cfst_rs::{
    aggregate, derive_proxy_list, CfstError, Fetcher, Outcome, ProbeRunner, Prompter,
    RegionCodeTable, ScanSession, ScopedRetest, Workflow,
};
use cfst_rs::thresholds::{Mode, Preset};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use test_utils::*;
use tokio::test;

type TestWorkflow = Workflow<Cursor<Vec<u8>>, Vec<u8>>;

fn workflow(dir: &Path, executable: &Path, input: &str) -> TestWorkflow {
    let config = config_in(dir);
    let fetcher = Fetcher::with_strategies(Duration::from_secs(1), vec![]).unwrap();
    let runner = ProbeRunner::new(executable, &config);
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

/// 测试地区扫描后的汇总与排序
#[test]
async fn test_discovery_aggregates_regions() {
    let dir = TempDir::new().unwrap();
    let exe = fake_prober(dir.path(), 0);
    let config = config_in(dir.path());
    let list = dir.path().join("Cloudflare.txt");
    fs::write(&list, IPV4_LIST).unwrap();

    let runner = ProbeRunner::new(&exe, &config);
    let session = runner.run_discovery(&list).await.unwrap();
    assert_eq!(session.len(), 100);

    let summaries = aggregate(session.rows(), &RegionCodeTable::builtin());
    let counts: Vec<_> = summaries
        .iter()
        .map(|s| (s.region_tag.as_str(), s.endpoint_count))
        .collect();
    assert_eq!(counts, vec![("HKG", 60), ("LAX", 30)]);

    let calls = recorded_calls(dir.path());
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("-dd -tl 9999 -f "));
    assert!(calls[0].contains("-httping -url "));
}

/// 测试地区检测失败时返回可恢复错误
#[test]
async fn test_discovery_failure_is_recoverable() {
    let dir = TempDir::new().unwrap();
    let exe = fake_prober(dir.path(), 3);
    let runner = ProbeRunner::new(&exe, &config_in(dir.path()));

    let err = runner
        .run_discovery(&dir.path().join("Cloudflare.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err, CfstError::ProbeFailed(_)));
    assert!(!err.is_fatal());
}

/// 测试地区检测超时会结束子进程
#[test]
async fn test_discovery_timeout() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let exe = dir.path().join("slow_cfst.sh");
    fs::write(&exe, "#!/bin/sh\nsleep 30\n").unwrap();
    fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();

    let runner = ProbeRunner::new(&exe, &config_in(dir.path()))
        .with_discovery_timeout(Duration::from_millis(300));
    let started = std::time::Instant::now();
    let err = runner
        .run_discovery(&dir.path().join("Cloudflare.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err, CfstError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(10));
}

/// 测试指定地区测速只使用该地区的 IP，且临时列表会被删除
#[test]
async fn test_scoped_retest_uses_only_selected_region() {
    let dir = TempDir::new().unwrap();
    let exe = fake_prober(dir.path(), 0);
    let config = config_in(dir.path());
    let scan = dir.path().join("region_scan.csv");
    fs::write(&scan, scan_csv(&[("HKG", 60), ("LAX", 30), ("N/A", 10)])).unwrap();

    let session = ScanSession::load(&scan).unwrap();
    let runner = ProbeRunner::new(&exe, &config);
    let retest = ScopedRetest::new(&runner, dir.path());
    retest
        .run(&session, "hkg", &Preset::Standard.thresholds(Mode::Normal))
        .await
        .unwrap();

    let seen = fs::read_to_string(dir.path().join("seen_list.txt")).unwrap();
    assert_eq!(seen.lines().count(), 60);
    assert!(!dir.path().join("hkg_ips.txt").exists());
    assert!(scan.exists());

    let calls = recorded_calls(dir.path());
    assert!(calls[0].contains("hkg_ips.txt -dn 20 -sl 5 -tl 500 -o "));
}

/// 测试常规测速完整流程：扫描 → 选择地区 → 预设参数 → 测速
#[test]
async fn test_normal_mode_end_to_end() {
    let dir = TempDir::new().unwrap();
    let exe = fake_prober(dir.path(), 0);
    fs::write(dir.path().join("Cloudflare.txt"), IPV4_LIST).unwrap();

    // 功能 1，IPv4，地区 1（HKG），预设 1
    let mut wf = workflow(dir.path(), &exe, "1\n1\n1\n1\n");
    let outcome = wf.run().await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Tested {
            result_file: dir.path().join("result.csv")
        }
    );

    let text = output(wf);
    assert!(text.contains("1. HKG - 香港 (中国香港) (可用60个IP)"));
    assert!(text.contains("2. LAX - 洛杉矶 (美国) (可用30个IP)"));
    assert!(!text.contains("N/A"));

    let seen = fs::read_to_string(dir.path().join("seen_list.txt")).unwrap();
    assert_eq!(seen.lines().count(), 60);
    assert!(!dir.path().join("hkg_ips.txt").exists());
    assert!(dir.path().join("region_scan.csv").exists());
    assert!(dir.path().join("result.csv").exists());
}

/// 测试复用已有扫描结果时不会重新扫描，并可按地区码选择
#[test]
async fn test_normal_mode_reuses_scan_session() {
    let dir = TempDir::new().unwrap();
    let exe = fake_prober(dir.path(), 0);
    fs::write(dir.path().join("Cloudflare.txt"), IPV4_LIST).unwrap();
    fs::write(
        dir.path().join("region_scan.csv"),
        scan_csv(&[("SIN", 5), ("NRT", 7)]),
    )
    .unwrap();

    // 功能 1，IPv4，不重新扫描，输入无效地区后改选 SIN，预设 2
    let mut wf = workflow(dir.path(), &exe, "1\n1\n\nICN\nsin\n2\n");
    let outcome = wf.run().await.unwrap();
    assert!(matches!(outcome, Outcome::Tested { .. }));

    let calls = recorded_calls(dir.path());
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].contains("-dd"));
    assert!(calls[0].contains("sin_ips.txt"));

    let seen = fs::read_to_string(dir.path().join("seen_list.txt")).unwrap();
    assert_eq!(seen.lines().count(), 5);
    assert!(output(wf).contains("地区 ICN 不在列表中"));
}

/// 测试小白快速测试：自定义参数后对整个列表测速
#[test]
async fn test_quick_mode_tests_whole_list() {
    let dir = TempDir::new().unwrap();
    let exe = fake_prober(dir.path(), 0);
    fs::write(dir.path().join("Cloudflare.txt"), IPV4_LIST).unwrap();

    // 功能 3，IPv4，数量 150 需确认（y），延迟默认，速度 2
    let mut wf = workflow(dir.path(), &exe, "3\n1\n150\ny\n\n2\n");
    wf.run().await.unwrap();

    let calls = recorded_calls(dir.path());
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("Cloudflare.txt -dn 150 -sl 2 -tl 1000 -o "));
    assert_eq!(
        fs::read_to_string(dir.path().join("seen_list.txt")).unwrap(),
        IPV4_LIST
    );
}

/// 测试优选反代后继续测速，显示数量为 20
#[test]
async fn test_proxy_mode_with_retest() {
    let dir = TempDir::new().unwrap();
    let exe = fake_prober(dir.path(), 0);
    let input = dir.path().join("proxies.csv");
    fs::write(&input, "ip,port\n1.1.1.1:8443,\n1.0.0.1,2053\n").unwrap();

    let answers = format!("2\n{}\ny\n1\n", input.display());
    let mut wf = workflow(dir.path(), &exe, &answers);
    let outcome = wf.run().await.unwrap();
    assert!(matches!(outcome, Outcome::Tested { .. }));

    let calls = recorded_calls(dir.path());
    assert!(calls[0].contains("ips_ports.txt -dn 10 -sl 1 -tl 1000 -o "));
    assert!(calls[0].ends_with("-p 20"));
    assert_eq!(
        fs::read_to_string(dir.path().join("seen_list.txt")).unwrap(),
        "1.1.1.1:8443\n1.0.0.1:2053\n"
    );
}

/// 测试完整测速失败时返回退出码
#[test]
async fn test_full_test_failure_reports_exit_code() {
    let dir = TempDir::new().unwrap();
    let exe = fake_prober(dir.path(), 2);
    let list = dir.path().join("ips_ports.txt");
    fs::write(&list, "1.1.1.1:443\n").unwrap();

    let runner = ProbeRunner::new(&exe, &config_in(dir.path()));
    let err = runner
        .run_full_test(&list, &Preset::Quick.thresholds(Mode::Proxy), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CfstError::ProbeFailed(ref msg) if msg.contains('2')));
}

/// 测试反代列表生成（非交互）
#[test]
async fn test_derive_proxy_list_from_cfst_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("result.csv");
    let output = dir.path().join("ips_ports.txt");
    fs::write(&input, scan_csv(&[("HKG", 3)])).unwrap();

    assert_eq!(derive_proxy_list(&input, &output).unwrap(), 3);
    let lines: Vec<_> = fs::read_to_string(&output)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(lines, vec!["104.16.0.0:443", "104.16.0.1:443", "104.16.0.2:443"]);
}
