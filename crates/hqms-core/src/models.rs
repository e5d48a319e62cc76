//! 核心数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HqmsError, Result};

/// 科室（排队通道按科室独立）
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum Department {
    Doctor,          // 门诊医生
    GeneralMedicine, // 全科
    Pharmacy,        // 药房
    Laboratory,      // 检验科
    Radiology,       // 放射科
    Billing,         // 收费处
    Triage,          // 分诊台
    Maternity,       // 产科
}

impl Department {
    /// 排队号前缀字母 (如 Doctor -> 'D', 票号形如 D-001)
    pub fn initial(&self) -> char {
        match self {
            Department::Doctor => 'D',
            Department::GeneralMedicine => 'G',
            Department::Pharmacy => 'P',
            Department::Laboratory => 'L',
            Department::Radiology => 'R',
            Department::Billing => 'B',
            Department::Triage => 'T',
            Department::Maternity => 'M',
        }
    }

    /// 所有科室通道
    pub fn all() -> Vec<Department> {
        vec![
            Department::Doctor,
            Department::GeneralMedicine,
            Department::Pharmacy,
            Department::Laboratory,
            Department::Radiology,
            Department::Billing,
            Department::Triage,
            Department::Maternity,
        ]
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Department::Doctor => "Doctor",
            Department::GeneralMedicine => "General Medicine",
            Department::Pharmacy => "Pharmacy",
            Department::Laboratory => "Laboratory",
            Department::Radiology => "Radiology",
            Department::Billing => "Billing",
            Department::Triage => "Triage",
            Department::Maternity => "Maternity",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Department {
    type Err = HqmsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Doctor" => Ok(Department::Doctor),
            "General Medicine" | "GeneralMedicine" => Ok(Department::GeneralMedicine),
            "Pharmacy" => Ok(Department::Pharmacy),
            "Laboratory" => Ok(Department::Laboratory),
            "Radiology" => Ok(Department::Radiology),
            "Billing" => Ok(Department::Billing),
            "Triage" => Ok(Department::Triage),
            "Maternity" => Ok(Department::Maternity),
            other => Err(HqmsError::Validation(format!(
                "Unknown department: {}",
                other
            ))),
        }
    }
}

// 反序列化委托给 FromStr，同时接受变体名与显示名 ("General Medicine")
impl<'de> Deserialize<'de> for Department {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 候诊优先级
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum Priority {
    Emergency, // 急救
    Urgent,    // 急诊
    Normal,    // 普通
}

// 反序列化走宽松解析：外部输入里未识别的优先级落到 Normal 而不是拒收
impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Priority::from_loose(&raw))
    }
}

impl Priority {
    /// 调度排序权重，数值越小越先被叫号
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Emergency => 0,
            Priority::Urgent => 1,
            Priority::Normal => 2,
        }
    }

    /// 宽松解析：未识别的优先级按最低级 (Normal) 处理而不是报错
    pub fn from_loose(s: &str) -> Priority {
        match s.trim() {
            "Emergency" => Priority::Emergency,
            "Urgent" => Priority::Urgent,
            "Normal" => Priority::Normal,
            other => {
                tracing::warn!("Unrecognized priority '{}', treating as Normal", other);
                Priority::Normal
            }
        }
    }
}

/// 排队状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QueueStatus {
    Waiting,   // 候诊中
    Called,    // 已叫号
    InService, // 就诊中
    Completed, // 已完成
    Cancelled, // 已取消
}

impl QueueStatus {
    /// 终态不允许任何后续转换
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueStatus::Completed | QueueStatus::Cancelled)
    }

    /// 活跃状态：仍占用排队号
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

/// 排队条目：一次患者-服务请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub queue_number: String, // 显示票号 (如 D-001)，每科室每运营日唯一
    pub patient_id: Option<String>, // 医院内部患者ID，登记前可为空
    pub patient_name: String,
    pub department: Department,
    pub service: String, // 请求的服务描述
    pub priority: Priority,
    pub status: QueueStatus,
    pub check_in_time: DateTime<Utc>,
    pub called_time: Option<DateTime<Utc>>,
    pub service_start_time: Option<DateTime<Utc>>,
    pub service_end_time: Option<DateTime<Utc>>,
    pub wait_time_minutes: i64, // 派生字段，开始就诊后冻结
    pub estimated_wait_minutes: i64,
    pub assigned_staff: Option<String>,
    pub notes: Option<String>,
}

impl QueueEntry {
    /// 根据签到时间重新计算候诊分钟数
    pub fn elapsed_wait_minutes(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.check_in_time).num_minutes()
    }
}

/// 签到请求（草稿），由 QueueStore 校验并补全
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub department: Department,
    pub patient_name: String,
    pub priority: Priority,
    pub patient_id: Option<String>,
    pub service: Option<String>,
    pub notes: Option<String>,
}

impl CheckInRequest {
    /// 校验必填字段
    pub fn validate(&self) -> Result<()> {
        if self.patient_name.trim().is_empty() {
            return Err(HqmsError::Validation(
                "Patient name is required for check-in".to_string(),
            ));
        }
        Ok(())
    }
}

/// 条目补丁：仅更新 Some 的字段
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryPatch {
    pub status: Option<QueueStatus>,
    pub called_time: Option<DateTime<Utc>>,
    pub service_start_time: Option<DateTime<Utc>>,
    pub service_end_time: Option<DateTime<Utc>>,
    pub wait_time_minutes: Option<i64>,
    pub patient_id: Option<String>,
    pub assigned_staff: Option<String>,
    pub notes: Option<String>,
}

/// 条目过滤器
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFilter {
    pub department: Option<Department>,
    pub statuses: Option<Vec<QueueStatus>>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &QueueEntry) -> bool {
        if let Some(department) = self.department {
            if entry.department != department {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&entry.status) {
                return false;
            }
        }
        true
    }
}

/// 排队统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub waiting: usize,
    pub called: usize,
    pub in_service: usize,
    pub average_wait_minutes: f64,
}
