//! Teacher attendance: daily overview and per-class roll call

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::Result;
use crate::gateway::DataGateway;
use crate::models::{AttendanceRecord, AttendanceStatus, Class, Profile};
use crate::pages::{percentage, Notice};

pub const SAVED: &str = "Attendance saved!";
pub const SAVE_FAILED: &str = "Could not save. Please try again.";

/// Where a class stands for the day
#[derive(Debug, Clone, PartialEq)]
pub struct ClassStatus {
    pub class: Class,
    pub total_students: usize,
    pub present_count: usize,
    /// At least one student has been marked
    pub is_completed: bool,
}

/// The teacher's classes for one day
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceOverview {
    pub date: NaiveDate,
    pub classes: Vec<ClassStatus>,
    pub present_today: usize,
    pub absent_today: usize,
    /// Percentage of present among present and absent; 0 before any marking
    pub attendance_rate: u32,
}

impl AttendanceOverview {
    pub fn total_classes(&self) -> usize {
        self.classes.len()
    }
}

/// Load the overview of the teacher's classes on `date`
pub async fn load_overview(
    gateway: &dyn DataGateway,
    teacher_id: &str,
    date: NaiveDate,
) -> Result<AttendanceOverview> {
    let classes = gateway.classes(Some(teacher_id)).await?;
    let class_ids: Vec<String> = classes.iter().map(|c| c.id.clone()).collect();

    let (enrollments, attendance) = tokio::try_join!(
        gateway.enrollments_for_classes(&class_ids),
        gateway.attendance_on(date, &class_ids),
    )?;

    let classes = classes
        .into_iter()
        .map(|class| {
            let marked: Vec<&AttendanceRecord> =
                attendance.iter().filter(|a| a.class_id == class.id).collect();
            ClassStatus {
                total_students: enrollments.iter().filter(|e| e.class_id == class.id).count(),
                present_count: marked
                    .iter()
                    .filter(|a| a.status == AttendanceStatus::Present)
                    .count(),
                is_completed: !marked.is_empty(),
                class,
            }
        })
        .collect();

    let count = |status: AttendanceStatus| attendance.iter().filter(|a| a.status == status).count();
    let present_today = count(AttendanceStatus::Present);
    let absent_today = count(AttendanceStatus::Absent);

    Ok(AttendanceOverview {
        date,
        classes,
        present_today,
        absent_today,
        attendance_rate: percentage(present_today, present_today + absent_today).unwrap_or(0),
    })
}

/// Roll call of one class on one day
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceSheet {
    pub class: Class,
    pub date: NaiveDate,
    pub students: Vec<Profile>,
    statuses: HashMap<String, AttendanceStatus>,
}

impl AttendanceSheet {
    /// Load the enrolled students and what has already been recorded
    pub async fn open(gateway: &dyn DataGateway, class: Class, date: NaiveDate) -> Result<Self> {
        let class_ids = [class.id.clone()];
        let enrollments = gateway.enrollments_for_classes(&class_ids).await?;
        if enrollments.is_empty() {
            return Ok(Self {
                class,
                date,
                students: Vec::new(),
                statuses: HashMap::new(),
            });
        }

        let student_ids: Vec<String> = enrollments.into_iter().map(|e| e.student_id).collect();
        let (students, recorded) = tokio::try_join!(
            gateway.profiles(&student_ids),
            gateway.attendance_on(date, &class_ids),
        )?;

        Ok(Self {
            class,
            date,
            students,
            statuses: recorded
                .into_iter()
                .map(|record| (record.student_id, record.status))
                .collect(),
        })
    }

    pub fn status(&self, student_id: &str) -> Option<AttendanceStatus> {
        self.statuses.get(student_id).copied()
    }

    /// "Present", "Absent", "Late" or "Pending"
    pub fn status_label(&self, student_id: &str) -> &'static str {
        match self.status(student_id) {
            Some(AttendanceStatus::Present) => "Present",
            Some(AttendanceStatus::Absent) => "Absent",
            Some(AttendanceStatus::Late) => "Late",
            None => "Pending",
        }
    }

    /// Record a student's status.
    ///
    /// The sheet shows the new status right away and goes back to the
    /// previous one if the write fails.
    pub async fn mark(
        &mut self,
        gateway: &dyn DataGateway,
        student_id: &str,
        status: AttendanceStatus,
    ) -> Notice {
        let previous = self.statuses.insert(student_id.to_string(), status);

        let record = AttendanceRecord {
            date: self.date,
            class_id: self.class.id.clone(),
            student_id: student_id.to_string(),
            status,
        };

        match gateway.upsert_attendance(&record).await {
            Ok(()) => Notice::success(SAVED),
            Err(e) => {
                log::error!("Error saving attendance for {}: {}", student_id, e);
                match previous {
                    Some(previous) => self.statuses.insert(student_id.to_string(), previous),
                    None => self.statuses.remove(student_id),
                };
                Notice::error(SAVE_FAILED)
            }
        }
    }

    pub fn notify_parents(&self, student_id: &str) -> Notice {
        Notice::info(format!("Notifying parents of student {}...", student_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{InMemoryGateway, Tables};
    use crate::models::ClassEnrollment;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 12).unwrap()
    }

    fn class(id: &str, teacher: &str) -> Class {
        Class {
            id: id.to_string(),
            name: format!("Class {}", id),
            teacher_id: Some(teacher.to_string()),
        }
    }

    fn enroll(class_id: &str, student_id: &str) -> ClassEnrollment {
        ClassEnrollment {
            class_id: class_id.to_string(),
            student_id: student_id.to_string(),
        }
    }

    fn record(class_id: &str, student_id: &str, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            date: day(),
            class_id: class_id.to_string(),
            student_id: student_id.to_string(),
            status,
        }
    }

    fn profile(id: &str, first: &str) -> Profile {
        Profile {
            id: id.to_string(),
            first_name: Some(first.to_string()),
            last_name: None,
        }
    }

    fn gateway() -> InMemoryGateway {
        InMemoryGateway::with_tables(Tables {
            classes: vec![class("c1", "t1"), class("c2", "t1"), class("c3", "t2")],
            enrollments: vec![
                enroll("c1", "s1"),
                enroll("c1", "s2"),
                enroll("c1", "s3"),
                enroll("c2", "s4"),
                enroll("c3", "s5"),
            ],
            attendance: vec![
                record("c1", "s1", AttendanceStatus::Present),
                record("c1", "s2", AttendanceStatus::Present),
                record("c1", "s3", AttendanceStatus::Absent),
                record("c3", "s5", AttendanceStatus::Absent),
            ],
            profiles: vec![profile("s1", "Ada"), profile("s2", "Alan"), profile("s3", "Grace")],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_overview_counts() {
        let overview = load_overview(&gateway(), "t1", day()).await.unwrap();

        assert_eq!(overview.total_classes(), 2);
        let c1 = &overview.classes[0];
        assert_eq!((c1.total_students, c1.present_count, c1.is_completed), (3, 2, true));
        let c2 = &overview.classes[1];
        assert_eq!((c2.total_students, c2.present_count, c2.is_completed), (1, 0, false));

        assert_eq!(overview.present_today, 2);
        assert_eq!(overview.absent_today, 1);
        assert_eq!(overview.attendance_rate, 67);
    }

    #[tokio::test]
    async fn test_overview_rate_is_zero_without_records() {
        let overview = load_overview(&gateway(), "t1", day().succ_opt().unwrap())
            .await
            .unwrap();
        assert_eq!(overview.attendance_rate, 0);
        assert!(overview.classes.iter().all(|c| !c.is_completed));
    }

    #[tokio::test]
    async fn test_sheet_and_marking() {
        let gateway = gateway();
        let mut sheet = AttendanceSheet::open(&gateway, class("c1", "t1"), day()).await.unwrap();
        assert_eq!(sheet.students.len(), 3);
        assert_eq!(sheet.status_label("s3"), "Absent");

        let notice = sheet.mark(&gateway, "s3", AttendanceStatus::Late).await;
        assert_eq!(notice, Notice::success(SAVED));
        assert_eq!(sheet.status("s3"), Some(AttendanceStatus::Late));

        let stored = gateway.tables().attendance.clone();
        assert_eq!(stored.len(), 4);
        assert!(stored.contains(&record("c1", "s3", AttendanceStatus::Late)));
    }

    #[tokio::test]
    async fn test_failed_mark_restores_previous_status() {
        let gateway = gateway();
        let mut sheet = AttendanceSheet::open(&gateway, class("c2", "t1"), day()).await.unwrap();
        gateway.fail("upsert_attendance");

        let notice = sheet.mark(&gateway, "s4", AttendanceStatus::Present).await;
        assert_eq!(notice, Notice::error(SAVE_FAILED));
        assert_eq!(sheet.status_label("s4"), "Pending");
    }

    #[tokio::test]
    async fn test_empty_class() {
        let gateway = gateway();
        gateway.fail("profiles");
        let sheet = AttendanceSheet::open(&gateway, class("c9", "t1"), day()).await.unwrap();
        assert!(sheet.students.is_empty());
    }
}
