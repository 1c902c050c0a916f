//! 安全过滤：黑名单子串检查
//!
//! 将指令转小写后逐个检查黑名单关键字是否为其子串（不做分词），命中即拒绝。
//! 宁可误拒：文件名里恰好含有 "kill" 之类的指令同样会被拦截。

/// 默认黑名单（顺序即匹配优先级）：破坏性/提权指令与重定向、管道、串联符号
pub const DEFAULT_DENYLIST: &[&str] = &[
    "rm", "mv", "chmod", "chown", "sudo", "su", "kill", "dd", ">", ">>", "|", ";",
];

/// 过滤结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    Allowed,
    /// 命中的第一个黑名单关键字
    Denied(String),
}

impl FilterVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, FilterVerdict::Allowed)
    }
}

/// 指令安全过滤器：只持有静态黑名单，check 为纯函数
#[derive(Debug, Clone)]
pub struct SecurityFilter {
    denylist: Vec<String>,
}

impl SecurityFilter {
    pub fn new(denylist: Vec<String>) -> Self {
        let denylist = denylist
            .into_iter()
            .map(|s| s.to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { denylist }
    }

    pub fn denylist(&self) -> &[String] {
        &self.denylist
    }

    /// 按黑名单顺序返回第一个命中的关键字
    pub fn check(&self, command: &str) -> FilterVerdict {
        let lowered = command.to_lowercase();
        match self.denylist.iter().find(|kw| lowered.contains(kw.as_str())) {
            Some(keyword) => {
                tracing::warn!(keyword = %keyword, "command blocked by denylist");
                FilterVerdict::Denied(keyword.clone())
            }
            None => FilterVerdict::Allowed,
        }
    }
}

impl Default for SecurityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect())
    }
}
