//! 地区码（机场码）表
//!
//! 内置 Cloudflare 数据中心机场码，启动时可合并本地 JSON 覆盖文件，
//! 同名条目以覆盖文件为准。加载后不再修改。

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// 未收录地区码的显示名称
pub const UNKNOWN_REGION_LABEL: &str = "未知地区";

/// 大区显示顺序
pub const BROAD_REGION_ORDER: &[&str] = &["亚太", "北美", "欧洲", "中东", "南美", "非洲", "其他"];

/// 热门地区码
pub const POPULAR_CODES: &[&str] = &["HKG", "SIN", "NRT", "ICN", "LAX", "SJC", "LHR", "FRA"];

/// (地区码, 城市, 大区, 国家/地区)
const BUILTIN_CODES: &[(&str, &str, &str, &str)] = &[
    ("HKG", "香港", "亚太", "中国香港"),
    ("TPE", "台北", "亚太", "中国台湾"),
    ("NRT", "东京成田", "亚太", "日本"),
    ("KIX", "大阪", "亚太", "日本"),
    ("ITM", "大阪伊丹", "亚太", "日本"),
    ("FUK", "福冈", "亚太", "日本"),
    ("ICN", "首尔仁川", "亚太", "韩国"),
    ("SIN", "新加坡", "亚太", "新加坡"),
    ("BKK", "曼谷", "亚太", "泰国"),
    ("HAN", "河内", "亚太", "越南"),
    ("SGN", "胡志明市", "亚太", "越南"),
    ("MNL", "马尼拉", "亚太", "菲律宾"),
    ("CGK", "雅加达", "亚太", "印度尼西亚"),
    ("KUL", "吉隆坡", "亚太", "马来西亚"),
    ("RGN", "仰光", "亚太", "缅甸"),
    ("PNH", "金边", "亚太", "柬埔寨"),
    ("BOM", "孟买", "亚太", "印度"),
    ("DEL", "新德里", "亚太", "印度"),
    ("MAA", "金奈", "亚太", "印度"),
    ("BLR", "班加罗尔", "亚太", "印度"),
    ("HYD", "海得拉巴", "亚太", "印度"),
    ("CCU", "加尔各答", "亚太", "印度"),
    ("SYD", "悉尼", "亚太", "澳大利亚"),
    ("MEL", "墨尔本", "亚太", "澳大利亚"),
    ("BNE", "布里斯班", "亚太", "澳大利亚"),
    ("PER", "珀斯", "亚太", "澳大利亚"),
    ("AKL", "奥克兰", "亚太", "新西兰"),
    ("LAX", "洛杉矶", "北美", "美国"),
    ("SJC", "圣何塞", "北美", "美国"),
    ("SEA", "西雅图", "北美", "美国"),
    ("SFO", "旧金山", "北美", "美国"),
    ("PDX", "波特兰", "北美", "美国"),
    ("SAN", "圣地亚哥", "北美", "美国"),
    ("PHX", "凤凰城", "北美", "美国"),
    ("LAS", "拉斯维加斯", "北美", "美国"),
    ("EWR", "纽瓦克", "北美", "美国"),
    ("IAD", "华盛顿", "北美", "美国"),
    ("BOS", "波士顿", "北美", "美国"),
    ("PHL", "费城", "北美", "美国"),
    ("ATL", "亚特兰大", "北美", "美国"),
    ("MIA", "迈阿密", "北美", "美国"),
    ("MCO", "奥兰多", "北美", "美国"),
    ("ORD", "芝加哥", "北美", "美国"),
    ("DFW", "达拉斯", "北美", "美国"),
    ("IAH", "休斯顿", "北美", "美国"),
    ("DEN", "丹佛", "北美", "美国"),
    ("MSP", "明尼阿波利斯", "北美", "美国"),
    ("DTW", "底特律", "北美", "美国"),
    ("STL", "圣路易斯", "北美", "美国"),
    ("MCI", "堪萨斯城", "北美", "美国"),
    ("YYZ", "多伦多", "北美", "加拿大"),
    ("YVR", "温哥华", "北美", "加拿大"),
    ("YUL", "蒙特利尔", "北美", "加拿大"),
    ("LHR", "伦敦", "欧洲", "英国"),
    ("CDG", "巴黎", "欧洲", "法国"),
    ("FRA", "法兰克福", "欧洲", "德国"),
    ("AMS", "阿姆斯特丹", "欧洲", "荷兰"),
    ("BRU", "布鲁塞尔", "欧洲", "比利时"),
    ("ZRH", "苏黎世", "欧洲", "瑞士"),
    ("VIE", "维也纳", "欧洲", "奥地利"),
    ("MUC", "慕尼黑", "欧洲", "德国"),
    ("DUS", "杜塞尔多夫", "欧洲", "德国"),
    ("HAM", "汉堡", "欧洲", "德国"),
    ("MAD", "马德里", "欧洲", "西班牙"),
    ("BCN", "巴塞罗那", "欧洲", "西班牙"),
    ("MXP", "米兰", "欧洲", "意大利"),
    ("FCO", "罗马", "欧洲", "意大利"),
    ("ATH", "雅典", "欧洲", "希腊"),
    ("LIS", "里斯本", "欧洲", "葡萄牙"),
    ("ARN", "斯德哥尔摩", "欧洲", "瑞典"),
    ("CPH", "哥本哈根", "欧洲", "丹麦"),
    ("OSL", "奥斯陆", "欧洲", "挪威"),
    ("HEL", "赫尔辛基", "欧洲", "芬兰"),
    ("WAW", "华沙", "欧洲", "波兰"),
    ("PRG", "布拉格", "欧洲", "捷克"),
    ("BUD", "布达佩斯", "欧洲", "匈牙利"),
    ("OTP", "布加勒斯特", "欧洲", "罗马尼亚"),
    ("SOF", "索非亚", "欧洲", "保加利亚"),
    ("DXB", "迪拜", "中东", "阿联酋"),
    ("TLV", "特拉维夫", "中东", "以色列"),
    ("BAH", "巴林", "中东", "巴林"),
    ("AMM", "安曼", "中东", "约旦"),
    ("KWI", "科威特", "中东", "科威特"),
    ("DOH", "多哈", "中东", "卡塔尔"),
    ("MCT", "马斯喀特", "中东", "阿曼"),
    ("GRU", "圣保罗", "南美", "巴西"),
    ("GIG", "里约热内卢", "南美", "巴西"),
    ("EZE", "布宜诺斯艾利斯", "南美", "阿根廷"),
    ("BOG", "波哥大", "南美", "哥伦比亚"),
    ("LIM", "利马", "南美", "秘鲁"),
    ("SCL", "圣地亚哥", "南美", "智利"),
    ("JNB", "约翰内斯堡", "非洲", "南非"),
    ("CPT", "开普敦", "非洲", "南非"),
    ("CAI", "开罗", "非洲", "埃及"),
    ("LOS", "拉各斯", "非洲", "尼日利亚"),
    ("NBO", "内罗毕", "非洲", "肯尼亚"),
    ("ACC", "阿克拉", "非洲", "加纳"),
];

/// 地区码信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    /// 城市名称
    pub name: String,
    /// 所属大区
    #[serde(default = "default_broad_region")]
    pub region: String,
    /// 国家/地区
    #[serde(default)]
    pub country: String,
}

fn default_broad_region() -> String {
    "其他".to_string()
}

impl RegionInfo {
    /// 显示名称，如 `香港 (中国香港)`
    pub fn label(&self) -> String {
        if self.country.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.country)
        }
    }
}

/// 名称搜索结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMatch<'a> {
    pub code: &'a str,
    pub info: &'a RegionInfo,
    /// 1 = 城市名匹配，2 = 国家名匹配
    pub priority: u8,
}

/// 地区码表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCodeTable {
    entries: BTreeMap<String, RegionInfo>,
}

impl Default for RegionCodeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RegionCodeTable {
    /// 内置地区码表
    pub fn builtin() -> Self {
        let entries = BUILTIN_CODES
            .iter()
            .map(|(code, name, region, country)| {
                (
                    code.to_string(),
                    RegionInfo {
                        name: name.to_string(),
                        region: region.to_string(),
                        country: country.to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// 合并覆盖条目，返回新表；同名条目以覆盖条目为准
    ///
    /// 地区码不区分大小写。同一地区码有多种写法时，全大写的写法优先，
    /// 其余写法按字典序取第一个。
    pub fn merged_with(&self, overlay: BTreeMap<String, RegionInfo>) -> Self {
        let mut entries = self.entries.clone();
        let mut merged = BTreeSet::new();
        for (code, info) in overlay {
            let key = code.trim().to_ascii_uppercase();
            if !merged.insert(key.clone()) && code.trim() != key {
                log::warn!("机场码 {} 与 {} 重复，已忽略", code, key);
                continue;
            }
            entries.insert(key, info);
        }
        Self { entries }
    }

    /// 读取覆盖文件并与内置表合并
    pub fn with_overlay_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let overlay: BTreeMap<String, RegionInfo> = serde_json::from_str(&content)?;
        log::info!("已加载本地机场码配置（{} 个）: {}", overlay.len(), path.display());
        Ok(Self::builtin().merged_with(overlay))
    }

    /// 启动时加载：覆盖文件不存在或无效时使用内置表
    pub fn load(overlay_path: &Path) -> Self {
        if !overlay_path.is_file() {
            return Self::builtin();
        }
        match Self::with_overlay_file(overlay_path) {
            Ok(table) => table,
            Err(e) => {
                log::warn!(
                    "加载本地机场码失败 {}: {}，使用内置表",
                    overlay_path.display(),
                    e
                );
                Self::builtin()
            }
        }
    }

    /// 保存整张表到 JSON 文件
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// 查询地区码
    pub fn get(&self, code: &str) -> Option<&RegionInfo> {
        self.entries.get(code)
    }

    /// 是否包含地区码
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按地区码顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegionInfo)> {
        self.entries.iter().map(|(code, info)| (code.as_str(), info))
    }

    /// 地区码的显示名称，未收录时返回占位名称
    pub fn display_name(&self, code: &str) -> String {
        self.get(code)
            .map(RegionInfo::label)
            .unwrap_or_else(|| UNKNOWN_REGION_LABEL.to_string())
    }

    /// 按城市名或地区码查找
    ///
    /// 地区码或城市名完全匹配时只返回该条；否则返回城市名包含关系（优先级 1）
    /// 与国家名包含关系（优先级 2）的匹配，按优先级、地区码排序。
    pub fn find(&self, query: &str) -> Vec<RegionMatch<'_>> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let upper = query.to_uppercase();
        if let Some((code, info)) = self.entries.get_key_value(&upper) {
            return vec![RegionMatch {
                code,
                info,
                priority: 0,
            }];
        }

        let lower = query.to_lowercase();
        let mut matches = Vec::new();
        for (code, info) in &self.entries {
            let name = info.name.to_lowercase();
            if name == lower {
                return vec![RegionMatch {
                    code,
                    info,
                    priority: 0,
                }];
            }
            if name.contains(&lower) || (!name.is_empty() && lower.contains(&name)) {
                matches.push(RegionMatch {
                    code,
                    info,
                    priority: 1,
                });
            } else if info.country.to_lowercase().contains(&lower) {
                matches.push(RegionMatch {
                    code,
                    info,
                    priority: 2,
                });
            }
        }
        matches.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.code.cmp(b.code)));
        matches
    }

    /// 常用地区码（仅返回表中存在的）
    pub fn popular(&self) -> Vec<(&str, &RegionInfo)> {
        POPULAR_CODES
            .iter()
            .filter_map(|code| self.entries.get_key_value(*code))
            .map(|(code, info)| (code.as_str(), info))
            .collect()
    }

    /// 按大区分组，大区按固定顺序排列，未列出的大区排在最后
    pub fn by_broad_region(&self) -> Vec<(String, Vec<(&str, &RegionInfo)>)> {
        let mut groups: BTreeMap<&str, Vec<(&str, &RegionInfo)>> = BTreeMap::new();
        for (code, info) in self.iter() {
            groups.entry(info.region.as_str()).or_default().push((code, info));
        }

        let mut ordered = Vec::with_capacity(groups.len());
        for region in BROAD_REGION_ORDER {
            if let Some(codes) = groups.remove(region) {
                ordered.push((region.to_string(), codes));
            }
        }
        for (region, codes) in groups {
            ordered.push((region.to_string(), codes));
        }
        ordered
    }
}
