//! Rows of the school tables

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Table names
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const CLASSES: &str = "classes";
    pub const CLASS_ENROLLMENTS: &str = "class_enrollments";
    pub const ASSIGNMENTS: &str = "assignments";
    pub const SUBMISSIONS: &str = "submissions";
    pub const ATTENDANCE: &str = "attendance";
    pub const SKILL_ASSESSMENTS: &str = "skill_assessments";
    pub const MONTHLY_GRADES: &str = "monthly_grades";
    pub const PARENT_CHILD_RELATIONS: &str = "parent_child_relations";
}

/// A person's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl Profile {
    pub fn first_name(&self) -> &str {
        self.first_name.as_deref().unwrap_or("")
    }

    pub fn last_name(&self) -> &str {
        self.last_name.as_deref().unwrap_or("")
    }
}

/// A class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub teacher_id: Option<String>,
}

/// A student enrolled in a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassEnrollment {
    pub class_id: String,
    pub student_id: String,
}

/// The `classes(name)` embed PostgREST attaches to a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRef {
    pub name: String,
}

/// Accept an embedded class as an object, a one-element array or null
fn embedded_class<'de, D>(deserializer: D) -> Result<Option<ClassRef>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Embed {
        One(ClassRef),
        Many(Vec<ClassRef>),
    }

    Ok(match Option::<Embed>::deserialize(deserializer)? {
        Some(Embed::One(class)) => Some(class),
        Some(Embed::Many(classes)) => classes.into_iter().next(),
        None => None,
    })
}

/// Accept a timestamp with offset, a naive timestamp (read as UTC) or a bare date
fn flexible_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp {:?}", raw)))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(at.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
}

/// Kind of assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentKind {
    #[serde(rename = "devoir")]
    Homework,
    #[serde(rename = "controle_examen")]
    Exam,
    #[serde(rename = "evaluation")]
    Evaluation,
}

impl AssignmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentKind::Homework => "devoir",
            AssignmentKind::Exam => "controle_examen",
            AssignmentKind::Evaluation => "evaluation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "devoir" => Some(AssignmentKind::Homework),
            "controle_examen" => Some(AssignmentKind::Exam),
            "evaluation" => Some(AssignmentKind::Evaluation),
            _ => None,
        }
    }
}

/// Teacher-side workflow state of an assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Open,
    Corrected,
    #[serde(other)]
    Other,
}

/// An assignment row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: Option<AssignmentKind>,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(deserialize_with = "flexible_timestamp")]
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub max_points: Option<f64>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub correction_file_url: Option<String>,
    #[serde(default)]
    pub status: Option<AssignmentStatus>,
    #[serde(default, deserialize_with = "embedded_class", skip_serializing)]
    pub classes: Option<ClassRef>,
}

impl Assignment {
    pub fn is_corrected(&self) -> bool {
        self.status == Some(AssignmentStatus::Corrected)
    }

    pub fn class_name(&self) -> Option<&str> {
        self.classes.as_ref().map(|c| c.name.as_str())
    }
}

/// Values for a new assignment row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAssignment {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: AssignmentKind,
    pub class_id: String,
    pub teacher_id: String,
    pub instructions: Option<String>,
    pub due_date: NaiveDateTime,
    pub max_points: Option<f64>,
    pub attachment_url: Option<String>,
}

/// Values written when a teacher uploads a correction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentCorrection {
    pub correction_file_url: String,
    pub status: AssignmentStatus,
}

/// Student-side state of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Submitted,
    Graded,
}

/// A submission row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub id: Option<String>,
    pub assignment_id: String,
    pub student_id: String,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub grade: Option<f64>,
}

/// Presence of a student on a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

/// An attendance row; unique on (date, class_id, student_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub date: NaiveDate,
    pub class_id: String,
    pub student_id: String,
    pub status: AttendanceStatus,
}

/// Conflict target for attendance upserts
pub const ATTENDANCE_CONFLICT_COLUMNS: &str = "date,class_id,student_id";

/// A skill score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillAssessment {
    pub student_id: String,
    pub skill_name: String,
    pub score: f64,
}

/// Average grade of a student in a class for a month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyGrade {
    pub student_id: String,
    #[serde(default)]
    pub class_id: Option<String>,
    pub month_date: NaiveDate,
    pub average_grade: f64,
    #[serde(default, deserialize_with = "embedded_class", skip_serializing)]
    pub classes: Option<ClassRef>,
}

impl MonthlyGrade {
    pub fn class_name(&self) -> Option<&str> {
        self.classes.as_ref().map(|c| c.name.as_str())
    }
}

/// Link between a parent and a child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentChildRelation {
    pub parent_id: String,
    pub child_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn assignment_json(classes: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "a-1",
            "title": "Fractions",
            "type": "devoir",
            "due_date": "2024-05-02T08:00:00+00:00",
            "status": null,
            "classes": classes
        })
    }

    #[test]
    fn test_embedded_class_shapes() {
        let one: Assignment =
            serde_json::from_value(assignment_json(json!({ "name": "6e A" }))).unwrap();
        assert_eq!(one.class_name(), Some("6e A"));

        let many: Assignment =
            serde_json::from_value(assignment_json(json!([{ "name": "6e B" }]))).unwrap();
        assert_eq!(many.class_name(), Some("6e B"));

        let none: Assignment = serde_json::from_value(assignment_json(json!(null))).unwrap();
        assert_eq!(none.class_name(), None);
        assert_eq!(none.kind, Some(AssignmentKind::Homework));
        assert!(!none.is_corrected());
    }

    #[test]
    fn test_unknown_assignment_status() {
        let mut value = assignment_json(json!(null));
        value["status"] = json!("archived");
        let assignment: Assignment = serde_json::from_value(value).unwrap();
        assert_eq!(assignment.status, Some(AssignmentStatus::Other));
    }

    #[test]
    fn test_due_date_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 10, 8, 30, 0).unwrap();
        for raw in [
            "2024-05-10T08:30:00+00:00",
            "2024-05-10T10:30:00+02:00",
            "2024-05-10T08:30:00Z",
            "2024-05-10T08:30:00",
            "2024-05-10 08:30:00",
            "2024-05-10 08:30:00+00",
        ] {
            let mut value = assignment_json(json!(null));
            value["due_date"] = json!(raw);
            let assignment: Assignment = serde_json::from_value(value).unwrap();
            assert_eq!(assignment.due_date, expected, "{}", raw);
        }

        let mut value = assignment_json(json!(null));
        value["due_date"] = json!("2024-05-10");
        let assignment: Assignment = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(assignment.due_date, Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap());

        value["due_date"] = json!("next week");
        assert!(serde_json::from_value::<Assignment>(value).is_err());
    }

    #[test]
    fn test_new_assignment_reads_back() {
        let row = NewAssignment {
            title: "Fractions".to_string(),
            kind: AssignmentKind::Exam,
            class_id: "c-1".to_string(),
            teacher_id: "t-1".to_string(),
            instructions: None,
            due_date: NaiveDate::from_ymd_opt(2024, 5, 10)
                .and_then(|d| d.and_hms_opt(8, 30, 0))
                .unwrap(),
            max_points: Some(20.0),
            attachment_url: None,
        };
        let mut value = serde_json::to_value(&row).unwrap();
        value["id"] = json!("a-9");

        let read: Assignment = serde_json::from_value(value).unwrap();
        assert_eq!(read.due_date, Utc.with_ymd_and_hms(2024, 5, 10, 8, 30, 0).unwrap());
        assert_eq!(read.kind, Some(AssignmentKind::Exam));
    }

    #[test]
    fn test_attendance_wire_format() {
        let record = AttendanceRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            class_id: "c-1".to_string(),
            student_id: "s-1".to_string(),
            status: AttendanceStatus::Late,
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({ "date": "2024-05-02", "class_id": "c-1", "student_id": "s-1", "status": "late" })
        );
    }
}
