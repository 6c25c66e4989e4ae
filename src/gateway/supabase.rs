use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;

use crate::auth::SessionStore;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::Fetch;
use crate::gateway::DataGateway;
use crate::models::*;
use crate::postgrest::PostgrestClient;
use crate::storage::{FileOptions, StorageClient};

const ASSIGNMENT_COLUMNS: &str = "id,title,type,class_id,teacher_id,instructions,due_date,\
max_points,attachment_url,correction_file_url,status,classes(name)";
const ATTENDANCE_COLUMNS: &str = "date,class_id,student_id,status";
const SUBMISSION_COLUMNS: &str = "id,assignment_id,student_id,status,grade";
const MONTHLY_GRADE_COLUMNS: &str = "student_id,class_id,month_date,average_grade,classes(name)";

/// [`DataGateway`] backed by PostgREST and Storage
pub struct SupabaseGateway {
    url: String,
    key: String,
    bucket: String,
    client: Client,
    sessions: Arc<SessionStore>,
}

impl SupabaseGateway {
    /// Create a gateway that runs requests as the user signed in to `sessions`
    pub fn new(config: &Config, client: Client, sessions: Arc<SessionStore>) -> Self {
        Self {
            url: config.url.clone(),
            key: config.anon_key.clone(),
            bucket: config.options.attachments_bucket.clone(),
            client,
            sessions,
        }
    }

    /// The user's access token, or the anon key when nobody is signed in
    async fn token(&self) -> String {
        match self.sessions.access_token().await {
            Some(token) => token,
            None => self.key.clone(),
        }
    }

    async fn from(&self, table: &str) -> PostgrestClient {
        let token = self.token().await;
        PostgrestClient::new(&self.url, &self.key, &token, table, self.client.clone())
    }

    async fn storage(&self) -> StorageClient {
        let token = self.token().await;
        StorageClient::new(&self.url, &self.key, &token, self.client.clone())
    }

    /// Object path inside the attachments bucket for one of its public URLs
    fn object_path(&self, public_url: &str) -> Option<String> {
        let prefix = format!("{}/storage/v1/object/public/{}/", self.url, self.bucket);
        let encoded = public_url.strip_prefix(&prefix)?;
        urlencoding::decode(encoded).ok().map(|path| path.into_owned())
    }
}

#[async_trait]
impl DataGateway for SupabaseGateway {
    async fn classes(&self, teacher_id: Option<&str>) -> Result<Vec<Class>> {
        let table = self.from(tables::CLASSES).await;
        let mut query = table.select("id,name,teacher_id");
        if let Some(teacher_id) = teacher_id {
            query.eq("teacher_id", teacher_id);
        }
        query.order("name", true).execute().await
    }

    async fn enrollments_for_classes(&self, class_ids: &[String]) -> Result<Vec<ClassEnrollment>> {
        if class_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.from(tables::CLASS_ENROLLMENTS)
            .await
            .select("class_id,student_id")
            .in_list("class_id", class_ids)
            .execute()
            .await
    }

    async fn enrollments_for_student(&self, student_id: &str) -> Result<Vec<ClassEnrollment>> {
        self.from(tables::CLASS_ENROLLMENTS)
            .await
            .select("class_id,student_id")
            .eq("student_id", student_id)
            .execute()
            .await
    }

    async fn profiles(&self, ids: &[String]) -> Result<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.from(tables::PROFILES)
            .await
            .select("id,first_name,last_name")
            .in_list("id", ids)
            .execute()
            .await
    }

    async fn attendance_on(&self, date: NaiveDate, class_ids: &[String]) -> Result<Vec<AttendanceRecord>> {
        if class_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.from(tables::ATTENDANCE)
            .await
            .select(ATTENDANCE_COLUMNS)
            .eq("date", date)
            .in_list("class_id", class_ids)
            .execute()
            .await
    }

    async fn attendance_for_student(&self, student_id: &str) -> Result<Vec<AttendanceRecord>> {
        self.from(tables::ATTENDANCE)
            .await
            .select(ATTENDANCE_COLUMNS)
            .eq("student_id", student_id)
            .execute()
            .await
    }

    async fn upsert_attendance(&self, record: &AttendanceRecord) -> Result<()> {
        self.from(tables::ATTENDANCE)
            .await
            .upsert(record)
            .on_conflict(ATTENDANCE_CONFLICT_COLUMNS)
            .execute_no_return()
            .await
    }

    async fn assignments_for_teacher(&self, teacher_id: &str) -> Result<Vec<Assignment>> {
        self.from(tables::ASSIGNMENTS)
            .await
            .select(ASSIGNMENT_COLUMNS)
            .eq("teacher_id", teacher_id)
            .order("due_date", true)
            .execute()
            .await
    }

    async fn assignments_for_classes(&self, class_ids: &[String]) -> Result<Vec<Assignment>> {
        if class_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.from(tables::ASSIGNMENTS)
            .await
            .select(ASSIGNMENT_COLUMNS)
            .in_list("class_id", class_ids)
            .order("due_date", true)
            .execute()
            .await
    }

    async fn insert_assignment(&self, assignment: &NewAssignment) -> Result<()> {
        self.from(tables::ASSIGNMENTS)
            .await
            .insert(assignment)
            .execute_no_return()
            .await
    }

    async fn update_assignment(&self, assignment_id: &str, correction: &AssignmentCorrection) -> Result<()> {
        self.from(tables::ASSIGNMENTS)
            .await
            .update(correction)
            .eq("id", assignment_id)
            .execute_no_return()
            .await
    }

    async fn submissions_for_student(
        &self,
        student_id: &str,
        assignment_ids: &[String],
    ) -> Result<Vec<Submission>> {
        if assignment_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.from(tables::SUBMISSIONS)
            .await
            .select(SUBMISSION_COLUMNS)
            .eq("student_id", student_id)
            .in_list("assignment_id", assignment_ids)
            .execute()
            .await
    }

    async fn graded_submissions(&self, student_id: &str) -> Result<Vec<Submission>> {
        self.from(tables::SUBMISSIONS)
            .await
            .select(SUBMISSION_COLUMNS)
            .eq("student_id", student_id)
            .not_null("grade")
            .execute()
            .await
    }

    async fn skill_assessments(&self, student_id: &str) -> Result<Vec<SkillAssessment>> {
        self.from(tables::SKILL_ASSESSMENTS)
            .await
            .select("student_id,skill_name,score")
            .eq("student_id", student_id)
            .execute()
            .await
    }

    async fn monthly_grades(&self, student_id: &str) -> Result<Vec<MonthlyGrade>> {
        self.from(tables::MONTHLY_GRADES)
            .await
            .select(MONTHLY_GRADE_COLUMNS)
            .eq("student_id", student_id)
            .order("month_date", true)
            .execute()
            .await
    }

    async fn children_of(&self, parent_id: &str) -> Result<Vec<ParentChildRelation>> {
        self.from(tables::PARENT_CHILD_RELATIONS)
            .await
            .select("parent_id,child_id")
            .eq("parent_id", parent_id)
            .execute()
            .await
    }

    async fn upload_file(&self, path: &str, data: Vec<u8>, options: FileOptions) -> Result<String> {
        let storage = self.storage().await;
        let bucket = storage.from(&self.bucket);
        bucket.upload(path, data, options).await?;
        Ok(bucket.get_public_url(path))
    }

    async fn download_file(&self, public_url: &str) -> Result<Vec<u8>> {
        if let Some(path) = self.object_path(public_url) {
            return self.storage().await.from(&self.bucket).download(&path).await;
        }

        log::debug!("Downloading {} outside the attachments bucket", public_url);
        let response = Fetch::get(&self.client, public_url)
            .execute_checked()
            .await
            .map_err(|e| Error::storage(format!("Download of {} failed: {}", public_url, e)))?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        self.storage().await.from(&self.bucket).remove(&[path]).await
    }
}
