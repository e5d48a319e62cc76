//! 通用工具函数

use crate::models::Department;

/// 生成排队票号 (如 Doctor 第3号 -> "D-003")
pub fn format_queue_number(department: Department, sequence: u32) -> String {
    format!("{}-{:03}", department.initial(), sequence)
}

/// 验证票号格式：单个前缀字母 + '-' + 至少3位数字
pub fn is_valid_queue_number(token: &str) -> bool {
    let mut parts = token.splitn(2, '-');
    let prefix = match parts.next() {
        Some(p) => p,
        None => return false,
    };
    let digits = match parts.next() {
        Some(d) => d,
        None => return false,
    };
    prefix.len() == 1
        && prefix.chars().all(|c| c.is_ascii_uppercase())
        && digits.len() >= 3
        && digits.chars().all(|c| c.is_ascii_digit())
}

/// 将票号转成适合语音播报的形式 ("D-001" -> "D dash 0 0 1")
pub fn spell_queue_number(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            '-' => "dash".to_string(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
