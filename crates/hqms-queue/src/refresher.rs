//! 候诊时间刷新
//!
//! 周期性重算 Waiting/Called 条目的候诊分钟数，仅在数值变化时写回存储

use crate::store::SharedStore;
use chrono::{DateTime, Utc};
use hqms_core::{EntryFilter, EntryPatch, QueueStatus, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 默认刷新间隔
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// 单次刷新的结果摘要，通过 watch 通道发布给读侧消费者
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub ticked_at: Option<DateTime<Utc>>,
    pub scanned: usize,
    pub updated: usize,
}

/// 候诊时间刷新器
pub struct WaitTimeRefresher {
    store: SharedStore,
    interval: Duration,
}

impl WaitTimeRefresher {
    /// 创建新的刷新器
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    /// 设置刷新间隔
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// 启动后台刷新任务
    ///
    /// 返回的句柄被用于停止任务；句柄停止后定时器随之退出，不留悬挂任务。
    pub fn spawn(self) -> RefresherHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (summary_tx, summary_rx) = watch::channel(RefreshSummary::default());
        let store = self.store;
        let interval = self.interval;

        let task = tokio::spawn(async move {
            info!("Starting wait-time refresher with interval {:?}", interval);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match Self::refresh_once(&store).await {
                            Ok(summary) => {
                                debug!(
                                    "Wait-time refresh: {}/{} entries updated",
                                    summary.updated, summary.scanned
                                );
                                let _ = summary_tx.send(summary);
                            }
                            Err(e) => {
                                // 本轮跳过，下个周期重试；条目不会因漏掉一轮而损坏
                                warn!("Wait-time refresh cycle skipped: {}", e);
                            }
                        }
                    }
                    result = shutdown_rx.changed() => {
                        if result.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Wait-time refresher stopped");
        });

        RefresherHandle {
            shutdown: shutdown_tx,
            summaries: summary_rx,
            task,
        }
    }

    /// 执行单次刷新
    pub async fn refresh_once(store: &SharedStore) -> Result<RefreshSummary> {
        let now = Utc::now();
        let mut store = store.write().await;

        let active = store.list_entries(&EntryFilter {
            department: None,
            statuses: Some(vec![QueueStatus::Waiting, QueueStatus::Called]),
        });

        let scanned = active.len();
        let mut updated = 0;
        for entry in active {
            let minutes = entry.elapsed_wait_minutes(now);
            // 数值未变化时不写回，避免多余的通知
            if minutes != entry.wait_time_minutes {
                store.update_entry(
                    entry.id,
                    EntryPatch {
                        wait_time_minutes: Some(minutes),
                        ..Default::default()
                    },
                )?;
                updated += 1;
            }
        }

        Ok(RefreshSummary {
            ticked_at: Some(now),
            scanned,
            updated,
        })
    }
}

/// 刷新任务句柄
pub struct RefresherHandle {
    shutdown: watch::Sender<bool>,
    summaries: watch::Receiver<RefreshSummary>,
    task: JoinHandle<()>,
}

impl RefresherHandle {
    /// 订阅刷新摘要
    pub fn subscribe(&self) -> watch::Receiver<RefreshSummary> {
        self.summaries.clone()
    }

    /// 请求任务停止
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// 停止并等待任务退出
    pub async fn shutdown(self) {
        self.stop();
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::QueueStore;
    use chrono::Duration as ChronoDuration;
    use hqms_core::{CheckInRequest, Department, Priority};
    use std::sync::Arc;

    fn shared_store() -> SharedStore {
        Arc::new(tokio::sync::RwLock::new(QueueStore::new()))
    }

    async fn check_in_backdated(store: &SharedStore, minutes_ago: i64) -> uuid::Uuid {
        let entry = store
            .write()
            .await
            .add_entry(CheckInRequest {
                department: Department::Doctor,
                patient_name: "John Doe".to_string(),
                priority: Priority::Normal,
                patient_id: Some("PAT001".to_string()),
                service: None,
                notes: None,
            })
            .unwrap();
        // 回拨签到时间以模拟已等待的患者
        let backdated = Utc::now() - ChronoDuration::minutes(minutes_ago);
        {
            let mut guard = store.write().await;
            let mut patched = guard.get_entry(entry.id).unwrap().clone();
            patched.check_in_time = backdated;
            guard.import_entries(vec![patched]);
        }
        entry.id
    }

    #[tokio::test]
    async fn test_refresh_once_updates_active_entries() {
        let store = shared_store();
        let id = check_in_backdated(&store, 12).await;

        let summary = WaitTimeRefresher::refresh_once(&store).await.unwrap();
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.updated, 1);

        let wait = store.read().await.get_entry(id).unwrap().wait_time_minutes;
        assert!(wait >= 12);
    }

    #[tokio::test]
    async fn test_refresh_once_skips_unchanged_and_inactive() {
        let store = shared_store();
        let id = check_in_backdated(&store, 30).await;

        // 第一轮写入，第二轮数值未变则不再计为更新
        let first = WaitTimeRefresher::refresh_once(&store).await.unwrap();
        assert_eq!(first.updated, 1);
        let second = WaitTimeRefresher::refresh_once(&store).await.unwrap();
        assert_eq!(second.updated, 0);

        // InService 条目被冻结，不参与刷新
        store
            .write()
            .await
            .update_entry(
                id,
                EntryPatch {
                    status: Some(QueueStatus::InService),
                    ..Default::default()
                },
            )
            .unwrap();
        let third = WaitTimeRefresher::refresh_once(&store).await.unwrap();
        assert_eq!(third.scanned, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_refresher_publishes_and_stops() {
        let store = shared_store();
        check_in_backdated(&store, 5).await;

        let handle = WaitTimeRefresher::new(store.clone())
            .with_interval(Duration::from_secs(60))
            .spawn();

        let mut summaries = handle.subscribe();
        summaries.changed().await.unwrap();
        let summary = summaries.borrow().clone();
        assert_eq!(summary.updated, 1);

        handle.shutdown().await;
    }
}
