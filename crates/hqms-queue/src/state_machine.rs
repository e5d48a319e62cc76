//! 排队状态机
//!
//! 管理排队条目的完整生命周期状态转换

use hqms_core::{HqmsError, QueueStatus, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 排队状态转换事件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QueueEvent {
    Call,     // 叫号成功
    Start,    // 工作人员开始服务
    Complete, // 服务完成
    Cancel,   // 取消（需操作员在UI侧确认）
}

/// 排队状态机
#[derive(Debug)]
pub struct QueueStateMachine {
    transitions: HashMap<(QueueStatus, QueueEvent), QueueStatus>,
}

impl QueueStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        // 定义状态转换规则
        transitions.insert((QueueStatus::Waiting, QueueEvent::Call), QueueStatus::Called);
        transitions.insert((QueueStatus::Waiting, QueueEvent::Start), QueueStatus::InService);
        transitions.insert((QueueStatus::Called, QueueEvent::Start), QueueStatus::InService);
        transitions.insert((QueueStatus::InService, QueueEvent::Complete), QueueStatus::Completed);
        transitions.insert((QueueStatus::Waiting, QueueEvent::Cancel), QueueStatus::Cancelled);
        transitions.insert((QueueStatus::Called, QueueEvent::Cancel), QueueStatus::Cancelled);
        transitions.insert((QueueStatus::InService, QueueEvent::Cancel), QueueStatus::Cancelled);

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: &QueueStatus, event: &QueueEvent) -> bool {
        self.transitions.contains_key(&(*from, event.clone()))
    }

    /// 执行状态转换
    pub fn transition(&self, from: &QueueStatus, event: &QueueEvent) -> Result<QueueStatus> {
        match self.transitions.get(&(*from, event.clone())) {
            Some(to) => Ok(*to),
            None => Err(HqmsError::InvalidStateTransition {
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            }),
        }
    }

    /// 获取所有可能的状态
    pub fn get_all_states() -> Vec<QueueStatus> {
        vec![
            QueueStatus::Waiting,
            QueueStatus::Called,
            QueueStatus::InService,
            QueueStatus::Completed,
            QueueStatus::Cancelled,
        ]
    }

    /// 获取状态的所有可能事件
    pub fn get_possible_events(&self, current_state: &QueueStatus) -> Vec<QueueEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| state == current_state)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

impl Default for QueueStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
