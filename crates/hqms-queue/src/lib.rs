//! # HQMS 排队叫号模块
//!
//! 提供完整的患者排队管理功能，包括：
//! - 排队存储：会话内权威的排队条目集合
//! - 优先级调度：按优先级与签到时间排序并选出下一位
//! - 状态机：管理排队条目的完整生命周期
//! - 叫号协调：触发语音播报并记录最近叫号历史
//! - 候诊时间刷新：周期性重算活跃条目的候诊分钟数
//! - 大屏投影：各科室"就诊中/叫号中/即将叫号"的只读视图

pub mod announcer;
pub mod display;
pub mod engine;
pub mod refresher;
pub mod scheduler;
pub mod state_machine;
pub mod store;

// 重新导出主要类型
pub use announcer::{Announcer, CallCoordinator, CallOutcome, CallRecord, SilentAnnouncer};
pub use display::{DepartmentPanel, DisplayBoard};
pub use engine::QueueEngine;
pub use refresher::{RefreshSummary, RefresherHandle, WaitTimeRefresher};
pub use scheduler::{next_for, rank};
pub use state_machine::{QueueEvent, QueueStateMachine};
pub use store::{QueueStore, SharedStore};
