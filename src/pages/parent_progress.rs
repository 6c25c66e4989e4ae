//! Parent progress: a child's attendance, grades, skills and monthly results

use chrono::{Datelike, NaiveDate};

use crate::error::Result;
use crate::gateway::DataGateway;
use crate::models::{AttendanceStatus, MonthlyGrade, Profile, SkillAssessment};
use crate::pages::{french_short_month, percentage};

pub const CHILDREN_LOAD_FAILED: &str = "Could not load your children's data.";
pub const PROGRESS_LOAD_FAILED: &str = "Could not load child's progress.";

/// Grades are out of 100; GPA is on a 4 point scale
const GPA_DIVISOR: f64 = 25.0;
const DEFAULT_GPA: f64 = 4.0;
const DEFAULT_ATTENDANCE_RATE: u32 = 100;

/// The parent's children and which one is shown
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildSelection {
    pub children: Vec<Profile>,
    selected: Option<String>,
}

impl ChildSelection {
    /// Load the parent's children; the first one starts selected
    pub async fn load(gateway: &dyn DataGateway, parent_id: &str) -> Result<Self> {
        let relations = gateway.children_of(parent_id).await?;
        if relations.is_empty() {
            return Ok(Self::default());
        }

        let child_ids: Vec<String> = relations.into_iter().map(|r| r.child_id).collect();
        let children = gateway.profiles(&child_ids).await?;
        Ok(Self {
            selected: children.first().map(|c| c.id.clone()),
            children,
        })
    }

    pub fn selected(&self) -> Option<&Profile> {
        let id = self.selected.as_deref()?;
        self.children.iter().find(|c| c.id == id)
    }

    /// Switch to another child. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, child_id: &str) -> bool {
        if self.children.iter().any(|c| c.id == child_id) {
            self.selected = Some(child_id.to_string());
            true
        } else {
            false
        }
    }

    /// First name of the selected child, or "your child"
    pub fn selected_name(&self) -> &str {
        self.selected()
            .map(Profile::first_name)
            .filter(|name| !name.is_empty())
            .unwrap_or("your child")
    }
}

/// Headline figures of a child
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressStats {
    pub attendance_rate: u32,
    pub gpa: f64,
}

/// One class's monthly averages, aligned with the chart labels
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSeries {
    pub label: String,
    /// `None` where the class has no grade for the month
    pub data: Vec<Option<f64>>,
}

/// Monthly averages per class
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceChart {
    pub labels: Vec<String>,
    pub datasets: Vec<PerformanceSeries>,
}

impl PerformanceChart {
    /// Build the chart from grades ordered by month.
    ///
    /// Months are keyed by year and month, so the same month of two years
    /// gets two columns.
    pub fn from_grades(grades: &[MonthlyGrade]) -> Self {
        let month_key = |date: NaiveDate| (date.year(), date.month());

        let mut months: Vec<NaiveDate> = Vec::new();
        for grade in grades {
            if !months.iter().any(|m| month_key(*m) == month_key(grade.month_date)) {
                months.push(grade.month_date);
            }
        }

        let mut subjects: Vec<&str> = Vec::new();
        for name in grades.iter().filter_map(MonthlyGrade::class_name) {
            if !subjects.contains(&name) {
                subjects.push(name);
            }
        }

        let datasets = subjects
            .iter()
            .map(|subject| PerformanceSeries {
                label: subject.to_string(),
                data: months
                    .iter()
                    .map(|month| {
                        grades
                            .iter()
                            .find(|g| {
                                month_key(g.month_date) == month_key(*month)
                                    && g.class_name() == Some(*subject)
                            })
                            .map(|g| g.average_grade)
                    })
                    .collect(),
            })
            .collect();

        Self {
            labels: months
                .iter()
                .map(|m| french_short_month(*m).to_string())
                .collect(),
            datasets,
        }
    }
}

/// Everything the progress page shows for one child
#[derive(Debug, Clone, PartialEq)]
pub struct ChildProgress {
    pub stats: ProgressStats,
    pub skills: Vec<SkillAssessment>,
    pub performance: PerformanceChart,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Load a child's progress, running the four queries concurrently
pub async fn load_progress(gateway: &dyn DataGateway, child_id: &str) -> Result<ChildProgress> {
    let (attendance, grades, skills, monthly) = tokio::try_join!(
        gateway.attendance_for_student(child_id),
        gateway.graded_submissions(child_id),
        gateway.skill_assessments(child_id),
        gateway.monthly_grades(child_id),
    )?;

    let present = attendance
        .iter()
        .filter(|a| a.status == AttendanceStatus::Present)
        .count();
    let attendance_rate =
        percentage(present, attendance.len()).unwrap_or(DEFAULT_ATTENDANCE_RATE);

    let gpa = if grades.is_empty() {
        DEFAULT_GPA
    } else {
        let total: f64 = grades.iter().filter_map(|s| s.grade).sum();
        round1(total / grades.len() as f64 / GPA_DIVISOR)
    };

    log::debug!(
        "Progress of {}: {} attendance records, {} grades",
        child_id,
        attendance.len(),
        grades.len()
    );

    Ok(ChildProgress {
        stats: ProgressStats {
            attendance_rate,
            gpa,
        },
        skills,
        performance: PerformanceChart::from_grades(&monthly),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{InMemoryGateway, Tables};
    use crate::models::*;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn monthly(month: NaiveDate, class: &str, average: f64) -> MonthlyGrade {
        MonthlyGrade {
            student_id: "k1".to_string(),
            class_id: None,
            month_date: month,
            average_grade: average,
            classes: Some(ClassRef {
                name: class.to_string(),
            }),
        }
    }

    fn attendance(day: u32, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            class_id: "c1".to_string(),
            student_id: "k1".to_string(),
            status,
        }
    }

    fn graded(grade: f64) -> Submission {
        Submission {
            id: None,
            assignment_id: "a".to_string(),
            student_id: "k1".to_string(),
            status: SubmissionStatus::Graded,
            grade: Some(grade),
        }
    }

    fn profile(id: &str, first: &str) -> Profile {
        Profile {
            id: id.to_string(),
            first_name: Some(first.to_string()),
            last_name: Some("Martin".to_string()),
        }
    }

    fn gateway() -> InMemoryGateway {
        InMemoryGateway::with_tables(Tables {
            relations: vec![
                ParentChildRelation {
                    parent_id: "p1".to_string(),
                    child_id: "k1".to_string(),
                },
                ParentChildRelation {
                    parent_id: "p1".to_string(),
                    child_id: "k2".to_string(),
                },
            ],
            profiles: vec![profile("k1", "Léa"), profile("k2", "Hugo")],
            attendance: vec![
                attendance(1, AttendanceStatus::Present),
                attendance(2, AttendanceStatus::Present),
                attendance(3, AttendanceStatus::Late),
            ],
            submissions: vec![graded(80.0), graded(90.0), graded(75.0)],
            skills: vec![SkillAssessment {
                student_id: "k1".to_string(),
                skill_name: "Lecture".to_string(),
                score: 7.5,
            }],
            monthly_grades: vec![
                monthly(date(2024, 2), "Maths", 14.0),
                monthly(date(2024, 1), "Maths", 12.0),
                monthly(date(2024, 1), "Français", 15.0),
            ],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_children_first_selected() {
        let mut selection = ChildSelection::load(&gateway(), "p1").await.unwrap();
        assert_eq!(selection.children.len(), 2);
        assert_eq!(selection.selected_name(), "Léa");

        assert!(selection.select("k2"));
        assert_eq!(selection.selected_name(), "Hugo");
        assert!(!selection.select("nobody"));
        assert_eq!(selection.selected().map(|c| c.id.as_str()), Some("k2"));
    }

    #[tokio::test]
    async fn test_no_children() {
        let selection = ChildSelection::load(&gateway(), "p2").await.unwrap();
        assert!(selection.children.is_empty());
        assert_eq!(selection.selected_name(), "your child");
    }

    #[tokio::test]
    async fn test_progress_stats() {
        let progress = load_progress(&gateway(), "k1").await.unwrap();
        assert_eq!(progress.stats.attendance_rate, 67);
        assert_eq!(progress.stats.gpa, 3.3);
        assert_eq!(progress.skills.len(), 1);
    }

    #[tokio::test]
    async fn test_progress_defaults_without_data() {
        let progress = load_progress(&gateway(), "k2").await.unwrap();
        assert_eq!(
            progress.stats,
            ProgressStats {
                attendance_rate: 100,
                gpa: 4.0,
            }
        );
        assert_eq!(progress.performance, PerformanceChart::default());
    }

    #[tokio::test]
    async fn test_any_failing_query_fails_the_load() {
        let gateway = gateway();
        gateway.fail("skill_assessments");
        assert!(load_progress(&gateway, "k1").await.is_err());
    }

    #[tokio::test]
    async fn test_performance_chart() {
        let progress = load_progress(&gateway(), "k1").await.unwrap();
        let chart = progress.performance;
        assert_eq!(chart.labels, ["janv.", "févr."]);
        assert_eq!(chart.datasets.len(), 2);
        assert_eq!(chart.datasets[0].label, "Maths");
        assert_eq!(chart.datasets[0].data, [Some(12.0), Some(14.0)]);
        assert_eq!(chart.datasets[1].label, "Français");
        assert_eq!(chart.datasets[1].data, [Some(15.0), None]);
    }

    #[test]
    fn test_same_month_of_two_years() {
        let chart = PerformanceChart::from_grades(&[
            monthly(date(2023, 9), "Maths", 11.0),
            monthly(date(2024, 9), "Maths", 13.0),
        ]);
        assert_eq!(chart.labels, ["sept.", "sept."]);
        assert_eq!(chart.datasets[0].data, [Some(11.0), Some(13.0)]);
    }
}
