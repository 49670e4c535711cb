//! 下载相关测试
//!
//! 使用 wiremock 模拟发布页和 IP 列表地址


use cfst_rs::{
    ensure_candidate_list, ensure_executable, CfstError, FetchStrategy, Fetcher, IpVersion,
    Platform,
};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use test_utils::*;
use tokio::test;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(strategies: Vec<FetchStrategy>) -> Fetcher {
    Fetcher::with_strategies(Duration::from_secs(5), strategies).unwrap()
}

/// 测试 reqwest 下载成功
#[test]
async fn test_fetch_with_reqwest() {
    let server = create_mock_server("unused.zip", Vec::new()).await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("Cloudflare.txt");

    let used = fetcher(vec![FetchStrategy::Reqwest])
        .fetch(&format!("{}/ips-v4", server.uri()), &dest)
        .await
        .unwrap();
    assert_eq!(used, FetchStrategy::Reqwest);
    assert_eq!(fs::read_to_string(&dest).unwrap(), IPV4_LIST);
    assert!(!dir.path().join("Cloudflare.txt.part").exists());
}

/// 测试第一种方式失败后继续尝试下一种
#[test]
async fn test_fetch_falls_through_to_next_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1.1.1.0/24\n"))
        .with_priority(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("list.txt");
    let used = fetcher(vec![FetchStrategy::Reqwest, FetchStrategy::Reqwest])
        .fetch(&format!("{}/flaky", server.uri()), &dest)
        .await
        .unwrap();
    assert_eq!(used, FetchStrategy::Reqwest);
    assert_eq!(fs::read_to_string(&dest).unwrap(), "1.1.1.0/24\n");
}

/// 测试全部方式失败时汇总失败原因
#[test]
async fn test_fetch_reports_every_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("missing.bin");

    let err = fetcher(vec![FetchStrategy::Reqwest, FetchStrategy::PlainHttp])
        .fetch(&format!("{}/missing", server.uri()), &dest)
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, CfstError::Download(_)));
    assert!(message.contains("reqwest: "));
    assert!(message.contains("http: "));
    assert!(message.contains("404"));
    assert!(!dest.exists());
}

/// 测试空响应视为下载失败
#[test]
async fn test_empty_body_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let result = fetcher(vec![FetchStrategy::Reqwest])
        .fetch(&format!("{}/empty", server.uri()), &dir.path().join("x"))
        .await;
    assert!(result.is_err());
}

/// 测试下载并解压测速程序
#[test]
async fn test_ensure_executable_downloads_release() {
    let platform = Platform::resolve("linux", "amd64").unwrap();
    let archive = tar_gz_release(&platform.executable_name(), b"#!/bin/sh\nexit 0\n");
    let server = create_mock_server(&platform.archive_name(), archive).await;

    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path());
    config.release_base_url = server.uri();

    let exe = ensure_executable(&platform, &config, &fetcher(vec![FetchStrategy::Reqwest]))
        .await
        .unwrap();
    assert_eq!(exe, dir.path().join("CloudflareST_proxy_linux_amd64"));
    assert_eq!(fs::read(&exe).unwrap(), b"#!/bin/sh\nexit 0\n");
    assert!(!dir.path().join(platform.archive_name()).exists());
}

/// 测试 zip 发布包（Windows/macOS）
#[test]
async fn test_ensure_executable_from_zip() {
    let platform = Platform::resolve("darwin", "arm64").unwrap();
    let archive = zip_release(&platform.executable_name(), b"mach-o");
    let server = create_mock_server(&platform.archive_name(), archive).await;

    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path());
    config.release_base_url = format!("{}/", server.uri());

    let exe = ensure_executable(&platform, &config, &fetcher(vec![FetchStrategy::Reqwest]))
        .await
        .unwrap();
    assert_eq!(fs::read(exe).unwrap(), b"mach-o");
}

/// 测试下载到网页而非发布包时以致命错误结束
#[test]
async fn test_html_instead_of_release_is_fatal() {
    let platform = Platform::resolve("linux", "amd64").unwrap();
    let server =
        create_mock_server(&platform.archive_name(), b"<html>captive portal</html>".to_vec()).await;

    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path());
    config.release_base_url = server.uri();

    let err = ensure_executable(&platform, &config, &fetcher(vec![FetchStrategy::Reqwest]))
        .await
        .unwrap_err();
    assert!(matches!(err, CfstError::Extract(_)));
    assert!(err.is_fatal());
    assert!(!dir.path().join(platform.executable_name()).exists());
    assert!(!dir.path().join(platform.archive_name()).exists());
}

/// 测试已有测速程序时不再下载
#[test]
async fn test_existing_executable_is_reused() {
    let platform = Platform::resolve("linux", "arm64").unwrap();
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    let existing = dir.path().join(platform.executable_name());
    fs::write(&existing, b"local").unwrap();

    let exe = ensure_executable(&platform, &config, &fetcher(vec![]))
        .await
        .unwrap();
    assert_eq!(exe, existing);
    assert_eq!(fs::read(exe).unwrap(), b"local");
}

/// 测试下载失败时给出手动下载地址
#[test]
async fn test_download_failure_mentions_manual_url() {
    let server = MockServer::start().await;
    let platform = Platform::resolve("windows", "amd64").unwrap();
    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path());
    config.release_base_url = server.uri();

    let err = ensure_executable(&platform, &config, &fetcher(vec![FetchStrategy::Reqwest]))
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    let message = err.to_string();
    assert!(message.contains(&platform.download_url(&server.uri())));
    assert!(message.contains("CloudflareST_proxy_win_amd64.exe"));
}

/// 测试下载 IPv4 列表
#[test]
async fn test_ipv4_list_download() {
    let server = create_mock_server("unused.zip", Vec::new()).await;
    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path());
    config.ipv4_url = format!("{}/ips-v4", server.uri());

    let list = ensure_candidate_list(
        IpVersion::V4,
        &config,
        &fetcher(vec![FetchStrategy::Reqwest]),
    )
    .await
    .unwrap();
    assert_eq!(list, dir.path().join("Cloudflare.txt"));
    assert_eq!(fs::read_to_string(list).unwrap(), IPV4_LIST);
}
