//! 测速结果表解析
//!
//! 外部测速程序输出的 CSV 表头在不同版本间并不稳定，
//! 这里按列名（含多个别名）定位字段，解析为强类型的结果行。

use crate::error::{CfstError, Result};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// 地区码占位值，表示未识别
pub const UNCLASSIFIED_TAG: &str = "N/A";

/// 结果表中可识别的列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Address,
    Port,
    Region,
    Latency,
    Speed,
    Sent,
    Received,
    Loss,
}

impl Column {
    const ALL: [Column; 8] = [
        Column::Address,
        Column::Port,
        Column::Region,
        Column::Latency,
        Column::Speed,
        Column::Sent,
        Column::Received,
        Column::Loss,
    ];

    /// 归一化后的别名
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::Address => &["ip地址", "ip", "address", "ipaddress", "ip_address"],
            Column::Port => &["端口", "port"],
            Column::Region => &["地区码", "colo", "region", "regioncode", "region_code"],
            Column::Latency => &["平均延迟", "latency", "avglatency", "delay"],
            Column::Speed => &[
                "下载速度(mb/s)",
                "下载速度",
                "speed",
                "downloadspeed",
                "download_speed",
            ],
            Column::Sent => &["已发送", "sent"],
            Column::Received => &["已接收", "received"],
            Column::Loss => &["丢包率", "loss", "lossrate"],
        }
    }

    /// 将表头解析为列
    ///
    /// # Examples
    ///
    /// ```
    /// use cfst_rs::results::Column;
    ///
    /// assert_eq!(Column::resolve("IP 地址"), Some(Column::Address));
    /// assert_eq!(Column::resolve("下载速度 (MB/s)"), Some(Column::Speed));
    /// assert_eq!(Column::resolve("Port"), Some(Column::Port));
    /// assert_eq!(Column::resolve("备注"), None);
    /// ```
    pub fn resolve(header: &str) -> Option<Column> {
        let normalized = normalize_header(header);
        if normalized.is_empty() {
            return None;
        }
        if let Some(column) = Column::ALL
            .iter()
            .find(|column| column.aliases().contains(&normalized.as_str()))
        {
            return Some(*column);
        }
        if normalized.contains("ip") && normalized.contains("地址") {
            return Some(Column::Address);
        }
        None
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// 拆分 `host:port` 形式的地址
///
/// 支持 `1.2.3.4:443` 与 `[2606:4700::1]:443`；不带端口的 IPv6 地址原样返回。
/// 端口为空或无法解析时只保留主机部分。
pub fn split_host_port(address: &str) -> (&str, Option<u16>) {
    let address = address.trim();
    if let Some(rest) = address.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return (host, port);
        }
        return (address, None);
    }
    match address.split_once(':') {
        Some((host, port)) if !port.contains(':') => (host, port.parse().ok()),
        _ => (address, None),
    }
}

/// 结果表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResultRow {
    /// 地址原文，可能包含端口
    pub address: String,
    /// 端口列的值
    pub port: Option<u16>,
    /// 地区码，未识别时为 `None`
    pub region_tag: Option<String>,
    /// 平均延迟（毫秒）
    pub latency_ms: Option<f64>,
    /// 下载速度（MB/s）
    pub download_speed: Option<f64>,
    pub sent: Option<u32>,
    pub received: Option<u32>,
    /// 丢包率
    pub loss_rate: Option<f64>,
}

impl ProbeResultRow {
    /// 只有地址的行
    pub fn new<S: Into<String>>(address: S) -> Self {
        Self {
            address: address.into(),
            port: None,
            region_tag: None,
            latency_ms: None,
            download_speed: None,
            sent: None,
            received: None,
            loss_rate: None,
        }
    }

    /// 设置地区码，空值与 `N/A` 视为未识别
    pub fn with_region(mut self, tag: &str) -> Self {
        self.region_tag = parse_region_tag(tag);
        self
    }

    /// 设置端口
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// 去掉端口后的主机部分
    pub fn host(&self) -> &str {
        split_host_port(&self.address).0
    }

    /// 是否已识别地区
    pub fn is_classified(&self) -> bool {
        self.region_tag.is_some()
    }
}

fn parse_region_tag(raw: &str) -> Option<String> {
    let tag = raw.trim();
    if tag.is_empty() || tag.eq_ignore_ascii_case(UNCLASSIFIED_TAG) {
        None
    } else {
        Some(tag.to_ascii_uppercase())
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str) -> Option<T> {
    raw.trim().trim_end_matches('%').trim().parse().ok()
}

/// 解析后的结果表
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    columns: HashMap<Column, usize>,
    rows: Vec<ProbeResultRow>,
}

impl ResultTable {
    /// 从 CSV 文件读取
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CfstError::not_found(path.display().to_string()));
        }
        let file = fs::File::open(path)?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// 从任意读取器解析，`source` 用于错误信息
    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(CfstError::empty_table(format!("{} 没有表头", source)));
        }

        let mut columns = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(column) = Column::resolve(header) {
                columns.entry(column).or_insert(idx);
            }
        }
        let address_idx = *columns.get(&Column::Address).ok_or_else(|| {
            CfstError::missing_column(format!(
                "{} 中没有地址列，表头为 [{}]",
                source,
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })?;

        let field = |record: &csv::StringRecord, column: Column| -> Option<String> {
            columns
                .get(&column)
                .and_then(|&idx| record.get(idx))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut rows = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record?;
            let address = record.get(address_idx).unwrap_or("").trim();
            if address.is_empty() {
                log::debug!("{} 第 {} 行缺少地址，已跳过", source, line + 2);
                continue;
            }
            rows.push(ProbeResultRow {
                address: address.to_string(),
                port: field(&record, Column::Port).and_then(|v| parse_number(&v)),
                region_tag: field(&record, Column::Region).and_then(|v| parse_region_tag(&v)),
                latency_ms: field(&record, Column::Latency).and_then(|v| parse_number(&v)),
                download_speed: field(&record, Column::Speed).and_then(|v| parse_number(&v)),
                sent: field(&record, Column::Sent).and_then(|v| parse_number(&v)),
                received: field(&record, Column::Received).and_then(|v| parse_number(&v)),
                loss_rate: field(&record, Column::Loss).and_then(|v| parse_number(&v)),
            });
        }

        Ok(Self { columns, rows })
    }

    /// 是否包含某列
    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains_key(&column)
    }

    /// 所有结果行
    pub fn rows(&self) -> &[ProbeResultRow] {
        &self.rows
    }

    /// 取出所有结果行
    pub fn into_rows(self) -> Vec<ProbeResultRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 一次地区扫描的持久化结果
///
/// 由地区检测生成，之后的指定地区测速都读取它，直到用户要求重新扫描。
/// 重新扫描会整体替换文件，不会原地修改。
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSession {
    path: PathBuf,
    rows: Vec<ProbeResultRow>,
}

impl ScanSession {
    /// 从扫描结果文件加载，文件必须包含地区码列
    pub fn load(path: &Path) -> Result<Self> {
        let table = ResultTable::from_path(path)?;
        if !table.has_column(Column::Region) {
            return Err(CfstError::missing_column(format!(
                "{} 中没有地区码列",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            rows: table.into_rows(),
        })
    }

    /// 由内存中的结果行构造
    pub fn from_rows<P: Into<PathBuf>>(path: P, rows: Vec<ProbeResultRow>) -> Self {
        Self {
            path: path.into(),
            rows,
        }
    }

    /// 扫描结果文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> &[ProbeResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 指定地区的所有地址，保持原有顺序
    pub fn endpoints_in(&self, region_tag: &str) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|row| row.region_tag.as_deref() == Some(region_tag))
            .map(|row| row.address.as_str())
            .collect()
    }
}
