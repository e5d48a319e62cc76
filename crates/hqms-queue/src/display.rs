//! 大屏投影
//!
//! 各科室"就诊中 / 叫号中 / 即将叫号"的只读视图，纯读侧投影

use crate::scheduler;
use hqms_core::{Department, QueueEntry, QueueStatus};
use serde::{Deserialize, Serialize};

/// 每科室默认展示的"即将叫号"人数
pub const DEFAULT_UP_NEXT_COUNT: usize = 3;

/// 单个科室的叫号面板
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentPanel {
    pub department: Department,
    /// 当前就诊中的条目
    pub now_serving: Option<QueueEntry>,
    /// 已叫号、尚未开始就诊的条目
    pub now_calling: Vec<QueueEntry>,
    /// 即将叫号的候诊条目，按调度顺序
    pub up_next: Vec<QueueEntry>,
    pub waiting_count: usize,
}

/// 全院大屏
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayBoard {
    pub panels: Vec<DepartmentPanel>,
}

impl DisplayBoard {
    /// 从条目集合投影出大屏视图
    pub fn project(entries: &[QueueEntry], up_next_count: usize) -> Self {
        let panels = Department::all()
            .into_iter()
            .map(|department| Self::project_department(department, entries, up_next_count))
            .collect();
        Self { panels }
    }

    /// 投影单个科室面板
    pub fn project_department(
        department: Department,
        entries: &[QueueEntry],
        up_next_count: usize,
    ) -> DepartmentPanel {
        let lane: Vec<QueueEntry> = entries
            .iter()
            .filter(|e| e.department == department && e.status.is_active())
            .cloned()
            .collect();

        let now_serving = lane
            .iter()
            .find(|e| e.status == QueueStatus::InService)
            .cloned();

        let now_calling = lane
            .iter()
            .filter(|e| e.status == QueueStatus::Called)
            .cloned()
            .collect();

        let waiting: Vec<QueueEntry> = lane
            .iter()
            .filter(|e| e.status == QueueStatus::Waiting)
            .cloned()
            .collect();
        let waiting_count = waiting.len();
        let up_next = scheduler::rank(&waiting)
            .into_iter()
            .take(up_next_count)
            .collect();

        DepartmentPanel {
            department,
            now_serving,
            now_calling,
            up_next,
            waiting_count,
        }
    }
}
