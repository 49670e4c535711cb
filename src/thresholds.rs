//! 测速参数
//!
//! 预设档位与自定义参数校验。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 运行模式，决定预设档位与自定义参数上限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// 常规测速（地区扫描后指定地区测速）
    #[default]
    Normal,
    /// 优选反代
    Proxy,
    /// 小白快速测试
    Quick,
}

impl Mode {
    /// 自定义数量超过该值时需要确认
    fn count_soft_cap(&self) -> u32 {
        match self {
            Mode::Normal => 1000,
            Mode::Proxy => 200,
            Mode::Quick => 100,
        }
    }

    /// 自定义速度超过该值时需要确认
    fn speed_soft_cap(&self) -> f64 {
        match self {
            Mode::Quick => 50.0,
            Mode::Normal | Mode::Proxy => 100.0,
        }
    }
}

const LATENCY_SOFT_CAP: u32 = 5000;

/// 测速参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// 需要的结果数量（-dn）
    pub count: u32,
    /// 下载速度下限，MB/s（-sl）
    pub min_speed_mbps: f64,
    /// 延迟上限，毫秒（-tl）
    pub max_latency_ms: u32,
}

impl fmt::Display for Thresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "数量 {}，速度下限 {} MB/s，延迟上限 {} ms",
            self.count, self.min_speed_mbps, self.max_latency_ms
        )
    }
}

/// 预设档位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Quick,
    Standard,
    HighQuality,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Quick, Preset::Standard, Preset::HighQuality];

    /// 菜单序号（从 1 开始）转换为档位
    pub fn from_index(index: usize) -> Option<Self> {
        index.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    /// 档位名称
    pub fn label(&self) -> &'static str {
        match self {
            Preset::Quick => "快速测试",
            Preset::Standard => "标准测试",
            Preset::HighQuality => "高质量测试",
        }
    }

    /// 该档位在指定模式下的参数
    ///
    /// # Examples
    ///
    /// ```
    /// use cfst_rs::thresholds::{Mode, Preset};
    ///
    /// let normal = Preset::Standard.thresholds(Mode::Normal);
    /// assert_eq!((normal.count, normal.min_speed_mbps, normal.max_latency_ms), (20, 5.0, 500));
    ///
    /// let proxy = Preset::Standard.thresholds(Mode::Proxy);
    /// assert_eq!(proxy.min_speed_mbps, 2.0);
    /// ```
    pub fn thresholds(&self, mode: Mode) -> Thresholds {
        let (count, min_speed_mbps, max_latency_ms) = match (self, mode) {
            (Preset::Quick, _) => (10, 1.0, 1000),
            (Preset::Standard, Mode::Proxy) => (20, 2.0, 500),
            (Preset::Standard, _) => (20, 5.0, 500),
            (Preset::HighQuality, Mode::Proxy) => (50, 5.0, 200),
            (Preset::HighQuality, _) => (50, 10.0, 200),
        };
        Thresholds {
            count,
            min_speed_mbps,
            max_latency_ms,
        }
    }
}

/// 自定义参数的校验结果
#[derive(Debug, Clone, PartialEq)]
pub enum Validation<T> {
    Accepted(T),
    /// 取值偏大，需要用户确认
    NeedsConfirmation(T, String),
    Rejected(String),
}

impl<T> Validation<T> {
    /// 未被拒绝时返回取值
    pub fn value(&self) -> Option<&T> {
        match self {
            Validation::Accepted(v) | Validation::NeedsConfirmation(v, _) => Some(v),
            Validation::Rejected(_) => None,
        }
    }
}

/// 校验自定义数量
pub fn validate_count(raw: &str, mode: Mode) -> Validation<u32> {
    let count = match raw.trim().parse::<u32>() {
        Ok(count) => count,
        Err(_) => return Validation::Rejected(format!("无效的数量: {}", raw.trim())),
    };
    if count == 0 {
        return Validation::Rejected("数量必须大于 0".to_string());
    }
    let cap = mode.count_soft_cap();
    if count > cap {
        return Validation::NeedsConfirmation(
            count,
            format!("数量 {} 超过建议值 {}，测试时间会较长", count, cap),
        );
    }
    Validation::Accepted(count)
}

/// 校验自定义下载速度下限
pub fn validate_speed(raw: &str, mode: Mode) -> Validation<f64> {
    let speed = match raw.trim().parse::<f64>() {
        Ok(speed) if speed.is_finite() => speed,
        _ => return Validation::Rejected(format!("无效的速度: {}", raw.trim())),
    };
    if speed < 0.0 {
        return Validation::Rejected("速度不能为负数".to_string());
    }
    let cap = mode.speed_soft_cap();
    if speed > cap {
        return Validation::NeedsConfirmation(
            speed,
            format!("速度下限 {} MB/s 超过建议值 {} MB/s，可能找不到结果", speed, cap),
        );
    }
    Validation::Accepted(speed)
}

/// 校验自定义延迟上限
pub fn validate_latency(raw: &str) -> Validation<u32> {
    let latency = match raw.trim().parse::<u32>() {
        Ok(latency) => latency,
        Err(_) => return Validation::Rejected(format!("无效的延迟: {}", raw.trim())),
    };
    if latency == 0 {
        return Validation::Rejected("延迟上限必须大于 0".to_string());
    }
    if latency > LATENCY_SOFT_CAP {
        return Validation::NeedsConfirmation(
            latency,
            format!("延迟上限 {} ms 超过建议值 {} ms", latency, LATENCY_SOFT_CAP),
        );
    }
    Validation::Accepted(latency)
}
