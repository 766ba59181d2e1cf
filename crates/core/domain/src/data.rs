use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 邮件室状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Closed,
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Closed => "closed",
            Status::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 状态字符串解析失败。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(pub String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid status: {}", self.0)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for Status {
    type Err = ParseStatusError;

    /// 忽略首尾空格与大小写。
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Status::Open),
            "closed" => Ok(Status::Closed),
            "unknown" => Ok(Status::Unknown),
            _ => Err(ParseStatusError(value.to_string())),
        }
    }
}

/// 持久化的邮件室记录（每个楼栋一条）。
///
/// `last_updated` 为空表示从未上报，此时 `raw_status` 必为 `Unknown`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub name: String,
    pub raw_status: Status,
    pub last_updated: Option<DateTime<Utc>>,
}

impl LocationRecord {
    /// 从未上报的默认记录。
    pub fn unreported(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_status: Status::Unknown,
            last_updated: None,
        }
    }

    /// 一次状态上报产生的记录。
    pub fn reported(name: impl Into<String>, status: Status, at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            raw_status: status,
            last_updated: Some(at),
        }
    }

    /// 在 `now` 时刻的派生视图。
    pub fn view_at(&self, now: DateTime<Utc>) -> EffectiveView {
        EffectiveView {
            name: self.name.clone(),
            effective_status: crate::freshness::effective_status(
                self.raw_status,
                self.last_updated,
                now,
            ),
            last_updated: self.last_updated,
        }
    }
}

/// 派生视图：读取时重新计算，不落库。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveView {
    pub name: String,
    pub effective_status: Status,
    pub last_updated: Option<DateTime<Utc>>,
}
