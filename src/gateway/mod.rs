//! Data access used by the feature pages
//!
//! Pages talk to a [`DataGateway`] rather than to the HTTP clients directly.
//! [`SupabaseGateway`] runs every call against the Supabase project as the
//! signed-in user, [`InMemoryGateway`] keeps the tables in memory.

mod memory;
mod supabase;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::*;
use crate::storage::FileOptions;

pub use memory::*;
pub use supabase::*;

/// Every read and write the dashboard pages perform
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Classes, optionally only those taught by `teacher_id`
    async fn classes(&self, teacher_id: Option<&str>) -> Result<Vec<Class>>;

    /// Enrollments of the given classes
    async fn enrollments_for_classes(&self, class_ids: &[String]) -> Result<Vec<ClassEnrollment>>;

    /// Enrollments of one student
    async fn enrollments_for_student(&self, student_id: &str) -> Result<Vec<ClassEnrollment>>;

    /// Profiles by id
    async fn profiles(&self, ids: &[String]) -> Result<Vec<Profile>>;

    /// Attendance recorded on `date` for the given classes
    async fn attendance_on(&self, date: NaiveDate, class_ids: &[String]) -> Result<Vec<AttendanceRecord>>;

    /// Every attendance record of a student
    async fn attendance_for_student(&self, student_id: &str) -> Result<Vec<AttendanceRecord>>;

    /// Insert or replace the record for (date, class, student)
    async fn upsert_attendance(&self, record: &AttendanceRecord) -> Result<()>;

    /// Assignments created by a teacher
    async fn assignments_for_teacher(&self, teacher_id: &str) -> Result<Vec<Assignment>>;

    /// Assignments of the given classes
    async fn assignments_for_classes(&self, class_ids: &[String]) -> Result<Vec<Assignment>>;

    async fn insert_assignment(&self, assignment: &NewAssignment) -> Result<()>;

    async fn update_assignment(&self, assignment_id: &str, correction: &AssignmentCorrection) -> Result<()>;

    /// Submissions of a student for the given assignments
    async fn submissions_for_student(
        &self,
        student_id: &str,
        assignment_ids: &[String],
    ) -> Result<Vec<Submission>>;

    /// Submissions of a student that carry a grade
    async fn graded_submissions(&self, student_id: &str) -> Result<Vec<Submission>>;

    async fn skill_assessments(&self, student_id: &str) -> Result<Vec<SkillAssessment>>;

    /// Monthly averages of a student, oldest month first
    async fn monthly_grades(&self, student_id: &str) -> Result<Vec<MonthlyGrade>>;

    async fn children_of(&self, parent_id: &str) -> Result<Vec<ParentChildRelation>>;

    /// Store a file in the attachments bucket and return its public URL
    async fn upload_file(&self, path: &str, data: Vec<u8>, options: FileOptions) -> Result<String>;

    /// Fetch a file by the public URL `upload_file` returned
    async fn download_file(&self, public_url: &str) -> Result<Vec<u8>>;

    /// Delete a file from the attachments bucket
    async fn remove_file(&self, path: &str) -> Result<()>;
}
