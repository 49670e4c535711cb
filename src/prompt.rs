//! 交互输入
//!
//! 对输入输出流做了抽象，测试时可用内存缓冲代替终端。
//! 输入流结束（EOF）视为用户取消。

use crate::error::{CfstError, Result};
use crate::thresholds::Validation;
use std::fmt::Display;
use std::io::{self, BufRead, StdinLock, Stdout, Write};

/// 交互式提问
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<StdinLock<'static>, Stdout> {
    /// 基于终端标准输入输出
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// 取回输出流
    pub fn into_output(self) -> W {
        self.output
    }

    /// 输出一行文本
    pub fn say<D: Display>(&mut self, message: D) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(CfstError::Cancelled);
        }
        Ok(line.trim().to_string())
    }

    /// 提问并读取一行，空输入时使用默认值
    pub fn ask(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        match default {
            Some(default) => write!(self.output, "{} [默认: {}]: ", question, default)?,
            None => write!(self.output, "{}: ", question)?,
        }
        let answer = self.read_line()?;
        if answer.is_empty() {
            if let Some(default) = default {
                return Ok(default.to_string());
            }
        }
        Ok(answer)
    }

    /// 是/否确认，无法识别的回答会重新提问
    pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            write!(self.output, "{} [{}]: ", question, hint)?;
            let answer = self.read_line()?.to_lowercase();
            match answer.as_str() {
                "" => return Ok(default),
                "y" | "yes" | "是" => return Ok(true),
                "n" | "no" | "否" => return Ok(false),
                _ => self.say("请输入 y 或 n")?,
            }
        }
    }

    /// 从 1..=`count` 中选择一项，返回序号（从 1 开始）
    pub fn choose(&mut self, question: &str, count: usize, default: usize) -> Result<usize> {
        loop {
            let answer = self.ask(question, Some(&default.to_string()))?;
            match answer.parse::<usize>() {
                Ok(index) if (1..=count).contains(&index) => return Ok(index),
                _ => self.say(format!("无效的选择，请输入 1-{}", count))?,
            }
        }
    }

    /// 读取并校验，被拒绝时重新提问，取值偏大时要求确认
    pub fn ask_validated<T, F>(
        &mut self,
        question: &str,
        default: Option<&str>,
        validate: F,
    ) -> Result<T>
    where
        F: Fn(&str) -> Validation<T>,
    {
        loop {
            let answer = self.ask(question, default)?;
            match validate(&answer) {
                Validation::Accepted(value) => return Ok(value),
                Validation::NeedsConfirmation(value, reason) => {
                    self.say(format!("⚠️  {}", reason))?;
                    if self.confirm("确认使用该值吗？", false)? {
                        return Ok(value);
                    }
                }
                Validation::Rejected(reason) => self.say(format!("❌ {}", reason))?,
            }
        }
    }
}
