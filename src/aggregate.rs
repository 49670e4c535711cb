//! 地区汇总
//!
//! 按地区码统计扫描结果中的地址数量，生成供用户选择的地区列表。

use crate::regions::{RegionCodeTable, UNKNOWN_REGION_LABEL};
use crate::results::ProbeResultRow;
use serde::Serialize;
use std::collections::HashMap;

/// 地区检测失败时使用的默认地区
pub const DEFAULT_REGION_CODES: &[&str] = &["HKG", "SIN", "NRT", "ICN", "LAX", "FRA", "LHR"];

/// 单个地区的汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionSummary {
    pub region_tag: String,
    /// 如 `香港 (中国香港)`，未收录的地区码为 `未知地区`
    pub display_name: String,
    pub country_name: String,
    pub endpoint_count: usize,
}

impl RegionSummary {
    fn labelled(tag: &str, count: usize, table: &RegionCodeTable) -> Self {
        let (display_name, country_name) = match table.get(tag) {
            Some(info) => (info.label(), info.country.clone()),
            None => (UNKNOWN_REGION_LABEL.to_string(), String::new()),
        };
        Self {
            region_tag: tag.to_string(),
            display_name,
            country_name,
            endpoint_count: count,
        }
    }
}

/// 按地区码汇总
///
/// 未识别地区的行不计入；未收录的地区码保留并使用占位名称。
/// 结果按地址数量降序，数量相同时按地区码升序。
///
/// # Examples
///
/// ```
/// use cfst_rs::aggregate::aggregate;
/// use cfst_rs::regions::RegionCodeTable;
/// use cfst_rs::results::ProbeResultRow;
///
/// let rows = vec![
///     ProbeResultRow::new("1.1.1.1").with_region("LAX"),
///     ProbeResultRow::new("1.1.1.2").with_region("HKG"),
///     ProbeResultRow::new("1.1.1.3").with_region("HKG"),
///     ProbeResultRow::new("1.1.1.4").with_region("N/A"),
/// ];
/// let summaries = aggregate(&rows, &RegionCodeTable::builtin());
/// assert_eq!(summaries.len(), 2);
/// assert_eq!(summaries[0].region_tag, "HKG");
/// assert_eq!(summaries[0].endpoint_count, 2);
/// ```
pub fn aggregate(rows: &[ProbeResultRow], table: &RegionCodeTable) -> Vec<RegionSummary> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tag in rows.iter().filter_map(|row| row.region_tag.as_deref()) {
        *counts.entry(tag).or_insert(0) += 1;
    }

    let mut summaries: Vec<RegionSummary> = counts
        .into_iter()
        .map(|(tag, count)| RegionSummary::labelled(tag, count, table))
        .collect();
    summaries.sort_by(|a, b| {
        b.endpoint_count
            .cmp(&a.endpoint_count)
            .then_with(|| a.region_tag.cmp(&b.region_tag))
    });
    summaries
}

/// 默认地区列表，数量均为 0
pub fn default_regions(table: &RegionCodeTable) -> Vec<RegionSummary> {
    DEFAULT_REGION_CODES
        .iter()
        .map(|tag| RegionSummary::labelled(tag, 0, table))
        .collect()
}
