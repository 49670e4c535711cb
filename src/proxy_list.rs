//! 反代 IP 列表生成
//!
//! 从测速结果 CSV 中提取 `地址:端口`，每行一条，供优选反代使用。

use crate::error::{CfstError, Result};
use crate::iplist::write_endpoints;
use crate::results::{split_host_port, ResultTable};
use std::fmt;
use std::net::Ipv6Addr;
use std::path::Path;

/// 没有端口信息时使用的端口
pub const DEFAULT_PROXY_PORT: u16 = 443;

/// 一条反代地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEntry {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for ProxyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// 从结果表生成反代地址
///
/// 端口列有值时优先使用端口列，其次使用地址中自带的端口，都没有时使用 443。
pub fn derive_entries(table: &ResultTable) -> Vec<ProxyEntry> {
    table
        .rows()
        .iter()
        .filter_map(|row| {
            let (host, embedded_port) = split_host_port(&row.address);
            if host.is_empty() {
                return None;
            }
            Some(ProxyEntry {
                host: host.to_string(),
                port: row.port.or(embedded_port).unwrap_or(DEFAULT_PROXY_PORT),
            })
        })
        .collect()
}

/// 读取 `input` 并写出反代列表到 `output`，返回写入条数
///
/// 文件不存在、表为空或缺少地址列时返回错误，不会生成输出文件。
pub fn derive_proxy_list(input: &Path, output: &Path) -> Result<usize> {
    let table = ResultTable::from_path(input)?;
    let entries = derive_entries(&table);
    if entries.is_empty() {
        return Err(CfstError::empty_table(format!(
            "{} 中没有有效的 IP 地址",
            input.display()
        )));
    }

    let written = write_endpoints(output, entries.iter().map(ProxyEntry::to_string))?;
    log::info!(
        "已从 {} 生成 {} 条反代地址: {}",
        input.display(),
        written,
        output.display()
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn table(csv: &str) -> ResultTable {
        ResultTable::from_reader(csv.as_bytes(), "test").unwrap()
    }

    #[test]
    fn test_embedded_port_is_split() {
        let entries = derive_entries(&table("IP 地址,平均延迟\n1.2.3.4:8443,100\n"));
        assert_eq!(entries[0].to_string(), "1.2.3.4:8443");
    }

    #[test]
    fn test_port_column_wins() {
        let entries = derive_entries(&table("ip,port\n1.2.3.4:8443,443\n"));
        assert_eq!(entries[0].to_string(), "1.2.3.4:443");
    }

    #[test]
    fn test_default_port() {
        let entries = derive_entries(&table("ip,端口\n1.2.3.4,\n5.6.7.8,2053\n"));
        assert_eq!(entries[0].to_string(), "1.2.3.4:443");
        assert_eq!(entries[1].to_string(), "5.6.7.8:2053");
    }

    #[test]
    fn test_empty_embedded_port_uses_default() {
        let entries = derive_entries(&table("ip\n1.2.3.4:\n"));
        assert_eq!(entries[0].to_string(), "1.2.3.4:443");
    }

    #[test]
    fn test_ipv6_entries() {
        let entries = derive_entries(&table("ip\n[2606:4700::1]:2096\n2606:4700::2\n"));
        assert_eq!(entries[0].to_string(), "[2606:4700::1]:2096");
        assert_eq!(entries[1].to_string(), "[2606:4700::2]:443");
    }

    #[test]
    fn test_derive_proxy_list_writes_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("result.csv");
        let output = dir.path().join("ips_ports.txt");
        fs::write(&input, "IP 地址,端口\n1.1.1.1,443\n,80\n1.0.0.1:2053,\n").unwrap();

        assert_eq!(derive_proxy_list(&input, &output).unwrap(), 2);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "1.1.1.1:443\n1.0.0.1:2053\n"
        );
    }

    #[test]
    fn test_header_only_table_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("result.csv");
        let output = dir.path().join("ips_ports.txt");
        fs::write(&input, "IP 地址,端口\n").unwrap();

        assert!(matches!(
            derive_proxy_list(&input, &output),
            Err(CfstError::EmptyTable(_))
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_address_column_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("result.csv");
        let output = dir.path().join("ips_ports.txt");
        fs::write(&input, "端口,地区码\n443,HKG\n").unwrap();

        assert!(matches!(
            derive_proxy_list(&input, &output),
            Err(CfstError::MissingColumn(_))
        ));
        assert!(!output.exists());
    }
}
