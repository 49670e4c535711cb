use crate::error::CfstError;
use crate::regions::{RegionCodeTable, RegionInfo, RegionMatch};
use std::io::{self, Write};

const WIDE_SEPARATOR: &str =
    "================================================================================";

pub fn print_banner<W: Write>(out: &mut W, table: &RegionCodeTable) -> io::Result<()> {
    writeln!(out, "{}", WIDE_SEPARATOR)?;
    writeln!(out, " Cloudflare SpeedTest 跨平台自动化工具 v{}", crate::VERSION)?;
    writeln!(out, "{}", WIDE_SEPARATOR)?;
    writeln!(out, " 支持 Windows / Linux / macOS (Darwin)")?;
    writeln!(out, " 内置 {} 个全球数据中心机场码", table.len())?;
    writeln!(out, " 支持地区扫描后指定地区测速")?;
    writeln!(out, " 支持优选反代IP列表生成")?;
    writeln!(out, "{}", WIDE_SEPARATOR)
}

fn print_entry<W: Write>(out: &mut W, code: &str, info: &RegionInfo) -> io::Result<()> {
    writeln!(out, "  {:<5} {}", code, info.label())
}

/// 按大区列出机场码；`region` 为 `popular` 时只列出热门地区
pub fn print_codes<W: Write>(
    out: &mut W,
    table: &RegionCodeTable,
    region: Option<&str>,
) -> io::Result<()> {
    if let Some("popular") = region {
        writeln!(out, "\n热门地区:")?;
        for (code, info) in table.popular() {
            print_entry(out, code, info)?;
        }
        return Ok(());
    }

    let groups = table.by_broad_region();
    let mut shown = 0;
    for (name, codes) in &groups {
        if region.map_or(false, |r| r != name.as_str()) {
            continue;
        }
        writeln!(out, "\n[{}] {} 个", name, codes.len())?;
        for (code, info) in codes {
            print_entry(out, code, info)?;
        }
        shown += codes.len();
    }

    if shown == 0 {
        let names: Vec<_> = groups.iter().map(|(name, _)| name.as_str()).collect();
        writeln!(
            out,
            "没有找到大区 {}，可选: {}",
            region.unwrap_or(""),
            names.join(" / ")
        )?;
    } else {
        writeln!(out, "\n共 {} 个机场码", shown)?;
    }
    Ok(())
}

pub fn print_matches<W: Write>(
    out: &mut W,
    query: &str,
    matches: &[RegionMatch<'_>],
) -> io::Result<()> {
    if matches.is_empty() {
        return writeln!(out, "未找到与 \"{}\" 匹配的机场码", query);
    }
    writeln!(out, "找到 {} 个匹配:", matches.len())?;
    for m in matches {
        writeln!(out, "  {:<5} {} [{}]", m.code, m.info.label(), m.info.region)?;
    }
    Ok(())
}

pub fn print_error(error: &CfstError) {
    eprintln!("❌ {}", error);
    if let Some(suggestion) = error.suggestion() {
        eprintln!("   建议: {}", suggestion);
    }
}

pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_print_codes_filtered() {
        let table = RegionCodeTable::builtin();
        let text = render(|out| print_codes(out, &table, Some("中东")));
        assert!(text.contains("[中东]"));
        assert!(text.contains("DXB"));
        assert!(!text.contains("HKG"));
    }

    #[test]
    fn test_print_codes_unknown_region() {
        let table = RegionCodeTable::builtin();
        let text = render(|out| print_codes(out, &table, Some("南极")));
        assert!(text.contains("没有找到大区 南极"));
    }

    #[test]
    fn test_print_popular() {
        let table = RegionCodeTable::builtin();
        let text = render(|out| print_codes(out, &table, Some("popular")));
        assert!(text.contains("热门地区"));
        assert!(text.contains("SJC"));
    }

    #[test]
    fn test_print_matches() {
        let table = RegionCodeTable::builtin();
        let text = render(|out| print_matches(out, "日本", &table.find("日本")));
        assert!(text.starts_with("找到 4 个匹配"));

        let none = render(|out| print_matches(out, "火星", &table.find("火星")));
        assert!(none.contains("未找到"));
    }
}
