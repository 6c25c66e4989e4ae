use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::gateway::DataGateway;
use crate::models::*;
use crate::storage::FileOptions;

/// Base of the public URLs handed out by [`InMemoryGateway::upload_file`]
pub const MEMORY_STORAGE_URL: &str = "memory://attachments/";

/// Rows held by an [`InMemoryGateway`]
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub profiles: Vec<Profile>,
    pub classes: Vec<Class>,
    pub enrollments: Vec<ClassEnrollment>,
    pub assignments: Vec<Assignment>,
    pub submissions: Vec<Submission>,
    pub attendance: Vec<AttendanceRecord>,
    pub skills: Vec<SkillAssessment>,
    pub monthly_grades: Vec<MonthlyGrade>,
    pub relations: Vec<ParentChildRelation>,

    /// Uploaded files by object path
    pub files: HashMap<String, Vec<u8>>,
}

/// [`DataGateway`] over in-process tables.
///
/// Any operation can be made to fail with [`InMemoryGateway::fail`], using
/// the trait method name as the key.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<&'static str>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: Tables) -> Self {
        Self {
            tables: Mutex::new(tables),
            failing: Mutex::default(),
        }
    }

    /// Lock the tables for inspection or seeding
    pub fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `operation` fail from now on
    pub fn fail(&self, operation: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation);
    }

    /// Let `operation` succeed again
    pub fn heal(&self, operation: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(operation);
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(operation) {
            return Err(Error::Api {
                status: 500,
                message: format!("{} unavailable", operation),
            });
        }
        Ok(())
    }

    fn select<T, F>(&self, operation: &'static str, rows: F) -> Result<Vec<T>>
    where
        F: FnOnce(&Tables) -> Vec<T>,
    {
        self.check(operation)?;
        Ok(rows(&*self.tables()))
    }
}

fn contains(ids: &[String], id: &str) -> bool {
    ids.iter().any(|i| i == id)
}

#[async_trait]
impl DataGateway for InMemoryGateway {
    async fn classes(&self, teacher_id: Option<&str>) -> Result<Vec<Class>> {
        self.select("classes", |t| {
            t.classes
                .iter()
                .filter(|c| teacher_id.is_none() || c.teacher_id.as_deref() == teacher_id)
                .cloned()
                .collect()
        })
    }

    async fn enrollments_for_classes(&self, class_ids: &[String]) -> Result<Vec<ClassEnrollment>> {
        self.select("enrollments_for_classes", |t| {
            t.enrollments
                .iter()
                .filter(|e| contains(class_ids, &e.class_id))
                .cloned()
                .collect()
        })
    }

    async fn enrollments_for_student(&self, student_id: &str) -> Result<Vec<ClassEnrollment>> {
        self.select("enrollments_for_student", |t| {
            t.enrollments
                .iter()
                .filter(|e| e.student_id == student_id)
                .cloned()
                .collect()
        })
    }

    async fn profiles(&self, ids: &[String]) -> Result<Vec<Profile>> {
        self.select("profiles", |t| {
            t.profiles
                .iter()
                .filter(|p| contains(ids, &p.id))
                .cloned()
                .collect()
        })
    }

    async fn attendance_on(&self, date: NaiveDate, class_ids: &[String]) -> Result<Vec<AttendanceRecord>> {
        self.select("attendance_on", |t| {
            t.attendance
                .iter()
                .filter(|a| a.date == date && contains(class_ids, &a.class_id))
                .cloned()
                .collect()
        })
    }

    async fn attendance_for_student(&self, student_id: &str) -> Result<Vec<AttendanceRecord>> {
        self.select("attendance_for_student", |t| {
            t.attendance
                .iter()
                .filter(|a| a.student_id == student_id)
                .cloned()
                .collect()
        })
    }

    async fn upsert_attendance(&self, record: &AttendanceRecord) -> Result<()> {
        self.check("upsert_attendance")?;
        let mut tables = self.tables();
        let existing = tables.attendance.iter_mut().find(|a| {
            a.date == record.date && a.class_id == record.class_id && a.student_id == record.student_id
        });
        match existing {
            Some(row) => row.status = record.status,
            None => tables.attendance.push(record.clone()),
        }
        Ok(())
    }

    async fn assignments_for_teacher(&self, teacher_id: &str) -> Result<Vec<Assignment>> {
        self.select("assignments_for_teacher", |t| {
            t.assignments
                .iter()
                .filter(|a| a.teacher_id.as_deref() == Some(teacher_id))
                .cloned()
                .collect()
        })
    }

    async fn assignments_for_classes(&self, class_ids: &[String]) -> Result<Vec<Assignment>> {
        self.select("assignments_for_classes", |t| {
            t.assignments
                .iter()
                .filter(|a| a.class_id.as_deref().map_or(false, |id| contains(class_ids, id)))
                .cloned()
                .collect()
        })
    }

    async fn insert_assignment(&self, assignment: &NewAssignment) -> Result<()> {
        self.check("insert_assignment")?;
        // Stored the way the table hands it back.
        let mut row = serde_json::to_value(assignment)?;
        row["id"] = serde_json::Value::String(uuid::Uuid::new_v4().to_string());
        let row: Assignment = serde_json::from_value(row)?;
        self.tables().assignments.push(row);
        Ok(())
    }

    async fn update_assignment(&self, assignment_id: &str, correction: &AssignmentCorrection) -> Result<()> {
        self.check("update_assignment")?;
        let mut tables = self.tables();
        if let Some(row) = tables.assignments.iter_mut().find(|a| a.id == assignment_id) {
            row.correction_file_url = Some(correction.correction_file_url.clone());
            row.status = Some(correction.status.clone());
        }
        Ok(())
    }

    async fn submissions_for_student(
        &self,
        student_id: &str,
        assignment_ids: &[String],
    ) -> Result<Vec<Submission>> {
        self.select("submissions_for_student", |t| {
            t.submissions
                .iter()
                .filter(|s| s.student_id == student_id && contains(assignment_ids, &s.assignment_id))
                .cloned()
                .collect()
        })
    }

    async fn graded_submissions(&self, student_id: &str) -> Result<Vec<Submission>> {
        self.select("graded_submissions", |t| {
            t.submissions
                .iter()
                .filter(|s| s.student_id == student_id && s.grade.is_some())
                .cloned()
                .collect()
        })
    }

    async fn skill_assessments(&self, student_id: &str) -> Result<Vec<SkillAssessment>> {
        self.select("skill_assessments", |t| {
            t.skills
                .iter()
                .filter(|s| s.student_id == student_id)
                .cloned()
                .collect()
        })
    }

    async fn monthly_grades(&self, student_id: &str) -> Result<Vec<MonthlyGrade>> {
        let mut grades = self.select("monthly_grades", |t| {
            t.monthly_grades
                .iter()
                .filter(|g| g.student_id == student_id)
                .cloned()
                .collect::<Vec<_>>()
        })?;
        grades.sort_by_key(|g| g.month_date);
        Ok(grades)
    }

    async fn children_of(&self, parent_id: &str) -> Result<Vec<ParentChildRelation>> {
        self.select("children_of", |t| {
            t.relations
                .iter()
                .filter(|r| r.parent_id == parent_id)
                .cloned()
                .collect()
        })
    }

    async fn upload_file(&self, path: &str, data: Vec<u8>, options: FileOptions) -> Result<String> {
        self.check("upload_file")?;
        let mut tables = self.tables();
        if tables.files.contains_key(path) && !options.upsert {
            return Err(Error::storage(format!("{} already exists", path)));
        }
        tables.files.insert(path.to_string(), data);
        Ok(format!("{}{}", MEMORY_STORAGE_URL, path))
    }

    async fn download_file(&self, public_url: &str) -> Result<Vec<u8>> {
        self.check("download_file")?;
        public_url
            .strip_prefix(MEMORY_STORAGE_URL)
            .and_then(|path| self.tables().files.get(path).cloned())
            .ok_or_else(|| Error::storage(format!("{} not found", public_url)))
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        self.check("remove_file")?;
        self.tables().files.remove(path);
        Ok(())
    }
}
