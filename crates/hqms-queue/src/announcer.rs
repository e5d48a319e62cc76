//! 叫号协调
//!
//! 选出下一位候诊患者，触发外部播报能力，播报成功后才转换到 Called 状态

use crate::scheduler;
use crate::state_machine::{QueueEvent, QueueStateMachine};
use crate::store::SharedStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hqms_core::{
    utils::spell_queue_number, Department, EntryFilter, EntryPatch, HqmsError, QueueEntry,
    QueueStatus, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// 最近叫号历史默认容量
pub const DEFAULT_HISTORY_CAPACITY: usize = 5;

/// 播报默认超时；超时视为播报失败，条目保持 Waiting 可重试
pub const DEFAULT_ANNOUNCE_TIMEOUT: Duration = Duration::from_secs(10);

/// 播报能力（外部协作方，注入实现）
///
/// 同一时刻至多一次播报；新的叫号请求会取代仍在进行的播报。
#[async_trait]
pub trait Announcer: Send + Sync {
    /// 播报票号；完成或失败后返回
    async fn announce(
        &self,
        token: &str,
        department: Department,
        patient_name: Option<&str>,
    ) -> Result<()>;
}

/// 无声播报器：仅记录日志，始终成功
///
/// 用于没有音频设备的部署环境以及默认装配。
#[derive(Debug, Default)]
pub struct SilentAnnouncer;

#[async_trait]
impl Announcer for SilentAnnouncer {
    async fn announce(
        &self,
        token: &str,
        department: Department,
        patient_name: Option<&str>,
    ) -> Result<()> {
        tracing::info!(
            "Announcing token {} ({}) for {} counter, patient {:?}",
            token,
            spell_queue_number(token),
            department,
            patient_name
        );
        Ok(())
    }
}

/// 叫号结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallOutcome {
    /// 已叫号并完成播报
    Called(QueueEntry),
    /// 该科室没有候诊患者，无任何副作用
    NothingToCall,
}

/// 叫号历史记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub entry_id: Uuid,
    pub queue_number: String,
    pub department: Department,
    pub patient_name: String,
    pub called_at: DateTime<Utc>,
}

/// 叫号协调器
pub struct CallCoordinator {
    store: SharedStore,
    state_machine: QueueStateMachine,
    announcer: Arc<dyn Announcer>,
    announce_timeout: Duration,
    // 最近叫号，最新在前，容量固定
    history: VecDeque<CallRecord>,
    history_capacity: usize,
}

impl CallCoordinator {
    /// 创建新的叫号协调器
    pub fn new(store: SharedStore, announcer: Arc<dyn Announcer>) -> Self {
        Self {
            store,
            state_machine: QueueStateMachine::new(),
            announcer,
            announce_timeout: DEFAULT_ANNOUNCE_TIMEOUT,
            history: VecDeque::with_capacity(DEFAULT_HISTORY_CAPACITY),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// 设置播报超时
    pub fn with_announce_timeout(mut self, timeout: Duration) -> Self {
        self.announce_timeout = timeout;
        self
    }

    /// 设置历史容量
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }

    /// 运行期调整播报超时
    pub fn set_announce_timeout(&mut self, timeout: Duration) {
        self.announce_timeout = timeout;
    }

    /// 运行期调整历史容量
    pub fn set_history_capacity(&mut self, capacity: usize) {
        self.history_capacity = capacity.max(1);
        self.history.truncate(self.history_capacity);
    }

    /// 叫号：选出下一位并播报，播报成功才转换状态
    pub async fn call_next(&mut self, department: Department) -> Result<CallOutcome> {
        // 1. 调度器选出候选人
        let candidate = {
            let store = self.store.read().await;
            let entries = store.list_entries(&EntryFilter {
                department: Some(department),
                statuses: Some(vec![QueueStatus::Waiting]),
            });
            scheduler::next_for(department, &entries)
        };

        let candidate = match candidate {
            Some(entry) => entry,
            None => {
                tracing::debug!("No waiting entries for {}", department);
                return Ok(CallOutcome::NothingToCall);
            }
        };

        // 2. 播报成功是状态转换的前提；失败或超时则条目保持 Waiting
        let announce = self.announcer.announce(
            &candidate.queue_number,
            department,
            Some(candidate.patient_name.as_str()),
        );
        match tokio::time::timeout(self.announce_timeout, announce).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(
                    "Announcement failed for {}: {}, entry stays Waiting",
                    candidate.queue_number,
                    e
                );
                return Err(HqmsError::Announcement(e.to_string()));
            }
            Err(_) => {
                tracing::warn!(
                    "Announcement timed out after {:?} for {}",
                    self.announce_timeout,
                    candidate.queue_number
                );
                return Err(HqmsError::Announcement(format!(
                    "Announcement timed out after {:?}",
                    self.announce_timeout
                )));
            }
        }

        // 3. 转换到 Called 并记录叫号时间
        let called_at = Utc::now();
        let updated = {
            let mut store = self.store.write().await;
            let current = store
                .get_entry(candidate.id)
                .ok_or_else(|| {
                    HqmsError::NotFound(format!("Queue entry {} not found", candidate.id))
                })?
                .status;
            let next_status = self.state_machine.transition(&current, &QueueEvent::Call)?;
            store.update_entry(
                candidate.id,
                EntryPatch {
                    status: Some(next_status),
                    called_time: Some(called_at),
                    ..Default::default()
                },
            )?
        };

        self.push_history(CallRecord {
            entry_id: updated.id,
            queue_number: updated.queue_number.clone(),
            department,
            patient_name: updated.patient_name.clone(),
            called_at,
        });

        tracing::info!("Called {} for {}", updated.queue_number, department);
        Ok(CallOutcome::Called(updated))
    }

    /// 最近叫号历史（最新在前）
    pub fn recently_called(&self) -> Vec<CallRecord> {
        self.history.iter().cloned().collect()
    }

    fn push_history(&mut self, record: CallRecord) {
        self.history.push_front(record);
        self.history.truncate(self.history_capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hqms_core::{CheckInRequest, Priority};
    use crate::store::QueueStore;

    /// 始终失败的播报器（模拟不支持语音合成的环境）
    struct FailingAnnouncer;

    #[async_trait]
    impl Announcer for FailingAnnouncer {
        async fn announce(
            &self,
            _token: &str,
            _department: Department,
            _patient_name: Option<&str>,
        ) -> Result<()> {
            Err(HqmsError::Announcement(
                "Speech synthesis not supported".to_string(),
            ))
        }
    }

    /// 永不完成的播报器（模拟挂起的外部设备）
    struct HangingAnnouncer;

    #[async_trait]
    impl Announcer for HangingAnnouncer {
        async fn announce(
            &self,
            _token: &str,
            _department: Department,
            _patient_name: Option<&str>,
        ) -> Result<()> {
            std::future::pending().await
        }
    }

    fn shared_store() -> SharedStore {
        Arc::new(tokio::sync::RwLock::new(QueueStore::new()))
    }

    async fn check_in(store: &SharedStore, name: &str, priority: Priority) -> QueueEntry {
        store
            .write()
            .await
            .add_entry(CheckInRequest {
                department: Department::Doctor,
                patient_name: name.to_string(),
                priority,
                patient_id: Some("PAT001".to_string()),
                service: Some("Consultation".to_string()),
                notes: None,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_call_next_transitions_and_records_history() {
        let store = shared_store();
        let entry = check_in(&store, "John Doe", Priority::Normal).await;

        let mut coordinator = CallCoordinator::new(store.clone(), Arc::new(SilentAnnouncer));
        let outcome = coordinator.call_next(Department::Doctor).await.unwrap();

        match outcome {
            CallOutcome::Called(called) => {
                assert_eq!(called.id, entry.id);
                assert_eq!(called.status, QueueStatus::Called);
                assert!(called.called_time.is_some());
            }
            CallOutcome::NothingToCall => panic!("expected a call"),
        }

        let history = coordinator.recently_called();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].entry_id, entry.id);
    }

    #[tokio::test]
    async fn test_call_next_empty_lane_has_no_side_effects() {
        let store = shared_store();
        let mut coordinator = CallCoordinator::new(store.clone(), Arc::new(SilentAnnouncer));

        let outcome = coordinator.call_next(Department::Doctor).await.unwrap();
        assert!(matches!(outcome, CallOutcome::NothingToCall));
        assert!(coordinator.recently_called().is_empty());
    }

    #[tokio::test]
    async fn test_failed_announcement_leaves_entry_waiting() {
        let store = shared_store();
        let entry = check_in(&store, "John Doe", Priority::Normal).await;

        let mut coordinator = CallCoordinator::new(store.clone(), Arc::new(FailingAnnouncer));
        let result = coordinator.call_next(Department::Doctor).await;
        assert!(matches!(result, Err(HqmsError::Announcement(_))));

        let status = store.read().await.get_entry(entry.id).unwrap().status;
        assert_eq!(status, QueueStatus::Waiting);
        assert!(coordinator.recently_called().is_empty());
    }

    #[tokio::test]
    async fn test_announcement_timeout_leaves_entry_waiting() {
        let store = shared_store();
        let entry = check_in(&store, "John Doe", Priority::Normal).await;

        let mut coordinator = CallCoordinator::new(store.clone(), Arc::new(HangingAnnouncer))
            .with_announce_timeout(Duration::from_millis(20));
        let result = coordinator.call_next(Department::Doctor).await;
        assert!(matches!(result, Err(HqmsError::Announcement(_))));

        let status = store.read().await.get_entry(entry.id).unwrap().status;
        assert_eq!(status, QueueStatus::Waiting);
    }

    #[tokio::test]
    async fn test_history_is_bounded_most_recent_first() {
        let store = shared_store();
        for i in 0..7 {
            check_in(&store, &format!("Patient {}", i), Priority::Normal).await;
        }

        let mut coordinator = CallCoordinator::new(store.clone(), Arc::new(SilentAnnouncer));
        for _ in 0..7 {
            coordinator.call_next(Department::Doctor).await.unwrap();
        }

        let history = coordinator.recently_called();
        assert_eq!(history.len(), DEFAULT_HISTORY_CAPACITY);
        // 最新叫号在最前
        assert_eq!(history[0].queue_number, "D-007");
        assert_eq!(history[4].queue_number, "D-003");
    }
}
