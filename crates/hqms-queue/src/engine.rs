//! 排队引擎
//!
//! 协调存储、状态机、调度器和叫号协调器的统一入口

use crate::announcer::{Announcer, CallCoordinator, CallOutcome, CallRecord};
use crate::display::{DisplayBoard, DEFAULT_UP_NEXT_COUNT};
use crate::scheduler;
use crate::state_machine::{QueueEvent, QueueStateMachine};
use crate::store::{QueueStore, SharedStore};
use chrono::Utc;
use hqms_core::{
    CheckInRequest, Department, EntryFilter, EntryPatch, HqmsError, QueueEntry, QueueStats, Result,
};
use std::sync::Arc;
use uuid::Uuid;

/// 排队引擎
///
/// 所有变更经由引擎进入，保证状态机校验先于存储写入
pub struct QueueEngine {
    store: SharedStore,
    state_machine: QueueStateMachine,
    coordinator: CallCoordinator,
}

impl QueueEngine {
    /// 创建新的排队引擎
    pub fn new(announcer: Arc<dyn Announcer>) -> Self {
        let store: SharedStore = Arc::new(tokio::sync::RwLock::new(QueueStore::new()));
        let coordinator = CallCoordinator::new(store.clone(), announcer);
        Self {
            store,
            state_machine: QueueStateMachine::new(),
            coordinator,
        }
    }

    /// 共享存储句柄（刷新器与持久化层使用）
    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// 可变叫号协调器（配置用）
    pub fn coordinator_mut(&mut self) -> &mut CallCoordinator {
        &mut self.coordinator
    }

    /// 患者签到
    pub async fn check_in(&self, draft: CheckInRequest) -> Result<QueueEntry> {
        self.store.write().await.add_entry(draft)
    }

    /// 叫号：委托给叫号协调器
    pub async fn call_next(&mut self, department: Department) -> Result<CallOutcome> {
        self.coordinator.call_next(department).await
    }

    /// 开始服务：Waiting|Called -> InService，冻结候诊时间
    pub async fn start_service(&self, id: Uuid) -> Result<QueueEntry> {
        let mut store = self.store.write().await;
        let entry = store
            .get_entry(id)
            .ok_or_else(|| HqmsError::NotFound(format!("Queue entry {} not found", id)))?
            .clone();

        let next = self.state_machine.transition(&entry.status, &QueueEvent::Start)?;
        let started_at = Utc::now();
        let updated = store.update_entry(
            id,
            EntryPatch {
                status: Some(next),
                service_start_time: Some(started_at),
                // 冻结：之后刷新器不再触碰该条目
                wait_time_minutes: Some(entry.elapsed_wait_minutes(started_at)),
                ..Default::default()
            },
        )?;

        tracing::info!("Service started for {}", updated.queue_number);
        Ok(updated)
    }

    /// 完成服务：仅允许从 InService
    pub async fn complete_service(&self, id: Uuid) -> Result<QueueEntry> {
        let mut store = self.store.write().await;
        let entry = store
            .get_entry(id)
            .ok_or_else(|| HqmsError::NotFound(format!("Queue entry {} not found", id)))?
            .clone();

        // 转换校验在写入之前；重复完成不会篡改 service_end_time
        let next = self
            .state_machine
            .transition(&entry.status, &QueueEvent::Complete)?;
        let updated = store.update_entry(
            id,
            EntryPatch {
                status: Some(next),
                service_end_time: Some(Utc::now()),
                ..Default::default()
            },
        )?;

        tracing::info!("Service completed for {}", updated.queue_number);
        Ok(updated)
    }

    /// 取消：任何非终态可取消（操作员确认在UI边界完成）
    pub async fn cancel(&self, id: Uuid) -> Result<QueueEntry> {
        let mut store = self.store.write().await;
        let entry = store
            .get_entry(id)
            .ok_or_else(|| HqmsError::NotFound(format!("Queue entry {} not found", id)))?
            .clone();

        let next = self
            .state_machine
            .transition(&entry.status, &QueueEvent::Cancel)?;
        let updated = store.update_entry(
            id,
            EntryPatch {
                status: Some(next),
                ..Default::default()
            },
        )?;

        tracing::info!("Cancelled {}", updated.queue_number);
        Ok(updated)
    }

    /// 更新备注、指派人员等非生命周期字段
    pub async fn amend(&self, id: Uuid, patch: EntryPatch) -> Result<QueueEntry> {
        // 生命周期字段只能通过转换操作修改
        let patch = EntryPatch {
            status: None,
            called_time: None,
            service_start_time: None,
            service_end_time: None,
            wait_time_minutes: None,
            ..patch
        };
        self.store.write().await.update_entry(id, patch)
    }

    /// 查询条目
    pub async fn list(&self, filter: &EntryFilter) -> Vec<QueueEntry> {
        self.store.read().await.list_entries(filter)
    }

    /// 按调度顺序查询条目
    pub async fn list_ranked(&self, filter: &EntryFilter) -> Vec<QueueEntry> {
        let entries = self.store.read().await.list_entries(filter);
        scheduler::rank(&entries)
    }

    /// 排队统计
    pub async fn stats(&self, filter: &EntryFilter) -> QueueStats {
        self.store.read().await.stats(filter)
    }

    /// 最近叫号历史
    pub fn recently_called(&self) -> Vec<CallRecord> {
        self.coordinator.recently_called()
    }

    /// 大屏视图
    pub async fn display_board(&self) -> DisplayBoard {
        let entries = self.store.read().await.list_entries(&EntryFilter::default());
        DisplayBoard::project(&entries, DEFAULT_UP_NEXT_COUNT)
    }
}
