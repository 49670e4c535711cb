//! 平台识别模块
//!
//! 将运行环境的操作系统和 CPU 架构映射为测速程序发布包使用的名称。
//! 无法识别的平台直接报错：选错二进制只会在执行时静默失败。

use crate::error::{CfstError, Result};
use std::fmt;

/// 操作系统
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Windows,
    MacOs,
    Linux,
}

/// CPU 架构
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
    Arm,
}

impl Os {
    /// 解析操作系统名称
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "windows" | "win" | "win32" => Ok(Os::Windows),
            "macos" | "darwin" | "osx" => Ok(Os::MacOs),
            "linux" => Ok(Os::Linux),
            other => Err(CfstError::unsupported_platform(format!(
                "不支持的操作系统: {}",
                other
            ))),
        }
    }

    /// 规范名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Windows => "windows",
            Os::MacOs => "macos",
            Os::Linux => "linux",
        }
    }

    /// 可执行文件名中使用的系统标识
    fn exec_token(&self) -> &'static str {
        match self {
            Os::Windows => "win",
            Os::MacOs => "darwin",
            Os::Linux => "linux",
        }
    }

    /// 发布包文件名中使用的系统标识
    fn release_token(&self) -> &'static str {
        match self {
            Os::Windows => "windows",
            Os::MacOs => "darwin",
            Os::Linux => "linux",
        }
    }
}

impl Arch {
    /// 解析 CPU 架构名称
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Ok(Arch::Amd64),
            "aarch64" | "arm64" => Ok(Arch::Arm64),
            "arm" | "armv7" | "armv7l" | "armv6l" => Ok(Arch::Arm),
            other => Err(CfstError::unsupported_platform(format!(
                "不支持的架构: {}",
                other
            ))),
        }
    }

    /// 规范名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
            Arch::Arm => "arm",
        }
    }
}

/// 规范化后的平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// 从原始字符串解析平台
    ///
    /// # Examples
    ///
    /// ```
    /// use cfst_rs::platform::{Arch, Os, Platform};
    ///
    /// let platform = Platform::resolve("darwin", "aarch64").unwrap();
    /// assert_eq!(platform.os, Os::MacOs);
    /// assert_eq!(platform.arch, Arch::Arm64);
    /// assert!(Platform::resolve("freebsd", "x86_64").is_err());
    /// ```
    pub fn resolve(os: &str, arch: &str) -> Result<Self> {
        Ok(Self {
            os: Os::parse(os)?,
            arch: Arch::parse(arch)?,
        })
    }

    /// 当前运行平台
    pub fn current() -> Result<Self> {
        Self::resolve(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// 本地可执行文件名，如 `CloudflareST_proxy_linux_amd64`
    pub fn executable_name(&self) -> String {
        let name = format!(
            "CloudflareST_proxy_{}_{}",
            self.os.exec_token(),
            self.arch.as_str()
        );
        if self.os == Os::Windows {
            format!("{}.exe", name)
        } else {
            name
        }
    }

    /// 发布包中使用的架构名
    ///
    /// 发布页没有 Windows arm/arm64 与 macOS arm 构建，
    /// 分别使用 386 与 arm64 构建代替。
    fn release_arch(&self) -> &'static str {
        match (self.os, self.arch) {
            (Os::Windows, Arch::Amd64) => "amd64",
            (Os::Windows, _) => "386",
            (Os::MacOs, Arch::Amd64) => "amd64",
            (Os::MacOs, _) => "arm64",
            (Os::Linux, arch) => arch.as_str(),
        }
    }

    /// 发布包文件名
    pub fn archive_name(&self) -> String {
        let extension = match self.os {
            Os::Linux => "tar.gz",
            Os::Windows | Os::MacOs => "zip",
        };
        format!(
            "CloudflareST_proxy_{}_{}.{}",
            self.os.release_token(),
            self.release_arch(),
            extension
        )
    }

    /// 发布包下载地址
    pub fn download_url(&self, release_base: &str) -> String {
        format!(
            "{}/{}",
            release_base.trim_end_matches('/'),
            self.archive_name()
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_aliases() {
        assert_eq!(Os::parse("Darwin").unwrap(), Os::MacOs);
        assert_eq!(Os::parse("win32").unwrap(), Os::Windows);
        assert_eq!(Os::parse("linux").unwrap(), Os::Linux);
        assert!(matches!(
            Os::parse("solaris"),
            Err(CfstError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn test_arch_aliases() {
        assert_eq!(Arch::parse("x86_64").unwrap(), Arch::Amd64);
        assert_eq!(Arch::parse("X64").unwrap(), Arch::Amd64);
        assert_eq!(Arch::parse("aarch64").unwrap(), Arch::Arm64);
        assert_eq!(Arch::parse("armv7l").unwrap(), Arch::Arm);
        assert!(Arch::parse("riscv64").is_err());
        assert!(Arch::parse("i686").is_err());
    }

    #[test]
    fn test_executable_names() {
        let win = Platform::resolve("windows", "x86_64").unwrap();
        assert_eq!(win.executable_name(), "CloudflareST_proxy_win_amd64.exe");

        let mac = Platform::resolve("macos", "aarch64").unwrap();
        assert_eq!(mac.executable_name(), "CloudflareST_proxy_darwin_arm64");
    }

    #[test]
    fn test_archive_names() {
        let linux = Platform::resolve("linux", "aarch64").unwrap();
        assert_eq!(linux.archive_name(), "CloudflareST_proxy_linux_arm64.tar.gz");

        let win_arm = Platform::resolve("windows", "arm64").unwrap();
        assert_eq!(win_arm.archive_name(), "CloudflareST_proxy_windows_386.zip");

        let mac = Platform::resolve("darwin", "amd64").unwrap();
        assert_eq!(
            mac.download_url("https://example.com/releases/"),
            "https://example.com/releases/CloudflareST_proxy_darwin_amd64.zip"
        );
    }

    #[test]
    fn test_display() {
        let p = Platform::resolve("linux", "arm").unwrap();
        assert_eq!(p.to_string(), "linux-arm");
    }
}
