//! 排队存储
//!
//! 会话内权威的排队条目集合，所有组件的唯一共享可变状态

use chrono::{NaiveDate, Utc};
use hqms_core::{
    utils::format_queue_number, CheckInRequest, Department, EntryFilter, EntryPatch, HqmsError,
    Priority, QueueEntry, QueueStats, QueueStatus, Result,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// 跨组件共享的存储句柄
pub type SharedStore = Arc<tokio::sync::RwLock<QueueStore>>;

/// 排队存储管理器
#[derive(Debug)]
pub struct QueueStore {
    entries: HashMap<Uuid, QueueEntry>,
    // 票号序列按 (科室, 运营日) 独立递增，每日重置
    sequences: HashMap<(Department, NaiveDate), u32>,
}

impl QueueStore {
    /// 创建新的排队存储
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            sequences: HashMap::new(),
        }
    }

    /// 签到：校验必填字段并分配 id、票号、签到时间
    pub fn add_entry(&mut self, draft: CheckInRequest) -> Result<QueueEntry> {
        draft.validate()?;

        let now = Utc::now();
        let queue_number = self.next_queue_number(draft.department, now.date_naive());
        let estimated_wait_minutes = match draft.priority {
            Priority::Emergency => 0,
            _ => 15,
        };

        let entry = QueueEntry {
            id: Uuid::new_v4(),
            queue_number,
            patient_id: draft.patient_id,
            patient_name: draft.patient_name,
            department: draft.department,
            service: draft.service.unwrap_or_default(),
            priority: draft.priority,
            status: QueueStatus::Waiting,
            check_in_time: now,
            called_time: None,
            service_start_time: None,
            service_end_time: None,
            wait_time_minutes: 0,
            estimated_wait_minutes,
            assigned_staff: None,
            notes: draft.notes,
        };

        self.entries.insert(entry.id, entry.clone());

        tracing::info!(
            "Checked in {} as {} for {}",
            entry.patient_name,
            entry.queue_number,
            entry.department
        );
        Ok(entry)
    }

    /// 合并补丁到指定条目
    pub fn update_entry(&mut self, id: Uuid, patch: EntryPatch) -> Result<QueueEntry> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| HqmsError::NotFound(format!("Queue entry {} not found", id)))?;

        if let Some(status) = patch.status {
            entry.status = status;
        }
        if let Some(called_time) = patch.called_time {
            entry.called_time = Some(called_time);
        }
        if let Some(service_start_time) = patch.service_start_time {
            entry.service_start_time = Some(service_start_time);
        }
        if let Some(service_end_time) = patch.service_end_time {
            entry.service_end_time = Some(service_end_time);
        }
        if let Some(wait_time_minutes) = patch.wait_time_minutes {
            entry.wait_time_minutes = wait_time_minutes;
        }
        if let Some(patient_id) = patch.patient_id {
            entry.patient_id = Some(patient_id);
        }
        if let Some(assigned_staff) = patch.assigned_staff {
            entry.assigned_staff = Some(assigned_staff);
        }
        if let Some(notes) = patch.notes {
            entry.notes = Some(notes);
        }

        Ok(entry.clone())
    }

    /// 获取单个条目
    pub fn get_entry(&self, id: Uuid) -> Option<&QueueEntry> {
        self.entries.get(&id)
    }

    /// 查询条目（不保证顺序，排序由调度器负责）
    pub fn list_entries(&self, filter: &EntryFilter) -> Vec<QueueEntry> {
        self.entries
            .values()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect()
    }

    /// 排队统计
    pub fn stats(&self, filter: &EntryFilter) -> QueueStats {
        let entries = self.list_entries(filter);
        let waiting = entries
            .iter()
            .filter(|e| e.status == QueueStatus::Waiting)
            .count();
        let called = entries
            .iter()
            .filter(|e| e.status == QueueStatus::Called)
            .count();
        let in_service = entries
            .iter()
            .filter(|e| e.status == QueueStatus::InService)
            .count();
        let total = entries.len();
        let average_wait_minutes = if total == 0 {
            0.0
        } else {
            entries.iter().map(|e| e.wait_time_minutes as f64).sum::<f64>() / total as f64
        };

        QueueStats {
            total,
            waiting,
            called,
            in_service,
            average_wait_minutes,
        }
    }

    /// 导出全部条目（持久化快照用）
    pub fn export_entries(&self) -> Vec<QueueEntry> {
        self.entries.values().cloned().collect()
    }

    /// 从快照恢复条目，并把票号序列推进到已有条目之后
    pub fn import_entries(&mut self, entries: Vec<QueueEntry>) {
        for entry in entries {
            let key = (entry.department, entry.check_in_time.date_naive());
            if let Some(sequence) = parse_sequence(&entry.queue_number) {
                let current = self.sequences.entry(key).or_insert(0);
                if sequence > *current {
                    *current = sequence;
                }
            }
            self.entries.insert(entry.id, entry);
        }
    }

    /// 分配下一个票号
    ///
    /// 单调递增的科室内计数器，已取消的条目不会导致票号复用。
    fn next_queue_number(&mut self, department: Department, date: NaiveDate) -> String {
        let sequence = self.sequences.entry((department, date)).or_insert(0);
        *sequence += 1;
        format_queue_number(department, *sequence)
    }
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_sequence(queue_number: &str) -> Option<u32> {
    queue_number.split('-').nth(1)?.parse().ok()
}
