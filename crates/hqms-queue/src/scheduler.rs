//! 优先级调度
//!
//! 纯函数排序：先按优先级 (Emergency > Urgent > Normal)，同级按签到时间先到先服务

use hqms_core::{Department, QueueEntry, QueueStatus};

/// 对条目排序，返回新的有序序列，不修改输入
///
/// 同一时刻签到的条目按票号决胜；票号编码了通道内的签发顺序，
/// 存储层的 HashMap 不保证枚举顺序，因此不能依赖输入顺序。
pub fn rank(entries: &[QueueEntry]) -> Vec<QueueEntry> {
    let mut ranked: Vec<QueueEntry> = entries.to_vec();
    ranked.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then(a.check_in_time.cmp(&b.check_in_time))
            .then_with(|| queue_number_order(&a.queue_number, &b.queue_number))
    });
    ranked
}

// 票号顺序：先比长度再比字典序，保证 D-1000 排在 D-999 之后
fn queue_number_order(a: &str, b: &str) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// 选出指定科室下一位候诊患者
///
/// 仅考虑该科室 Waiting 状态的条目；通道为空时返回 None。
pub fn next_for(department: Department, entries: &[QueueEntry]) -> Option<QueueEntry> {
    let waiting: Vec<QueueEntry> = entries
        .iter()
        .filter(|e| e.department == department && e.status == QueueStatus::Waiting)
        .cloned()
        .collect();

    rank(&waiting).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use hqms_core::Priority;
    use uuid::Uuid;

    fn entry(
        department: Department,
        priority: Priority,
        status: QueueStatus,
        minutes_ago: i64,
    ) -> QueueEntry {
        QueueEntry {
            id: Uuid::new_v4(),
            queue_number: "T-000".to_string(),
            patient_id: Some("PAT001".to_string()),
            patient_name: "Test Patient".to_string(),
            department,
            service: "Consultation".to_string(),
            priority,
            status,
            check_in_time: Utc::now() - Duration::minutes(minutes_ago),
            called_time: None,
            service_start_time: None,
            service_end_time: None,
            wait_time_minutes: 0,
            estimated_wait_minutes: 15,
            assigned_staff: None,
            notes: None,
        }
    }

    #[test]
    fn test_rank_orders_by_priority_then_time() {
        let entries = vec![
            entry(Department::Doctor, Priority::Normal, QueueStatus::Waiting, 30),
            entry(Department::Doctor, Priority::Urgent, QueueStatus::Waiting, 20),
            entry(Department::Doctor, Priority::Emergency, QueueStatus::Waiting, 5),
            entry(Department::Doctor, Priority::Urgent, QueueStatus::Waiting, 25),
        ];

        let ranked = rank(&entries);

        assert_eq!(ranked[0].priority, Priority::Emergency);
        assert_eq!(ranked[1].priority, Priority::Urgent);
        assert_eq!(ranked[2].priority, Priority::Urgent);
        assert_eq!(ranked[3].priority, Priority::Normal);
        // 同级内先到先服务
        assert!(ranked[1].check_in_time <= ranked[2].check_in_time);
    }

    #[test]
    fn test_rank_does_not_mutate_input() {
        let entries = vec![
            entry(Department::Doctor, Priority::Normal, QueueStatus::Waiting, 30),
            entry(Department::Doctor, Priority::Emergency, QueueStatus::Waiting, 5),
        ];
        let first_before = entries[0].id;

        let _ = rank(&entries);

        assert_eq!(entries[0].id, first_before);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(&[]).is_empty());
    }

    #[test]
    fn test_rank_breaks_check_in_ties_by_queue_number() {
        // 同一秒批量签到时，排序必须是确定的：按票号（通道内签发顺序）
        let check_in = Utc::now();
        let tokens = ["D-015", "D-004", "D-010", "D-001", "D-1000", "D-999"];
        let entries: Vec<QueueEntry> = tokens
            .iter()
            .map(|token| {
                let mut e = entry(Department::Doctor, Priority::Normal, QueueStatus::Waiting, 0);
                e.queue_number = token.to_string();
                e.check_in_time = check_in;
                e
            })
            .collect();

        let ranked: Vec<String> = rank(&entries)
            .into_iter()
            .map(|e| e.queue_number)
            .collect();
        assert_eq!(
            ranked,
            vec!["D-001", "D-004", "D-010", "D-015", "D-999", "D-1000"]
        );

        // 输入顺序打乱也得到同一结果
        let mut reversed = entries.clone();
        reversed.reverse();
        let ranked_again: Vec<String> = rank(&reversed)
            .into_iter()
            .map(|e| e.queue_number)
            .collect();
        assert_eq!(ranked, ranked_again);
    }

    #[test]
    fn test_next_for_emergency_preempts_earlier_normal() {
        // 场景：Normal 先签到，Emergency 后签到，仍先叫 Emergency
        let normal = entry(Department::Doctor, Priority::Normal, QueueStatus::Waiting, 40);
        let emergency = entry(Department::Doctor, Priority::Emergency, QueueStatus::Waiting, 1);
        let entries = vec![normal, emergency.clone()];

        let next = next_for(Department::Doctor, &entries).unwrap();
        assert_eq!(next.id, emergency.id);
    }

    #[test]
    fn test_next_for_skips_other_departments_and_statuses() {
        let entries = vec![
            entry(Department::Pharmacy, Priority::Emergency, QueueStatus::Waiting, 50),
            entry(Department::Doctor, Priority::Emergency, QueueStatus::Called, 45),
            entry(Department::Doctor, Priority::Normal, QueueStatus::InService, 40),
            entry(Department::Doctor, Priority::Normal, QueueStatus::Waiting, 10),
        ];

        let next = next_for(Department::Doctor, &entries).unwrap();
        assert_eq!(next.department, Department::Doctor);
        assert_eq!(next.status, QueueStatus::Waiting);
        assert_eq!(next.priority, Priority::Normal);
    }

    #[test]
    fn test_next_for_empty_lane() {
        assert!(next_for(Department::Maternity, &[]).is_none());

        let entries = vec![entry(
            Department::Doctor,
            Priority::Normal,
            QueueStatus::Completed,
            60,
        )];
        assert!(next_for(Department::Doctor, &entries).is_none());
    }
}
