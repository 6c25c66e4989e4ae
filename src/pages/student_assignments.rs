//! Student assignments: what is due in the student's classes

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::gateway::DataGateway;
use crate::models::SubmissionStatus;
use crate::pages::french_short_date;

pub const LOAD_FAILED: &str = "Impossible de charger les devoirs: ";
pub const NO_INSTRUCTIONS: &str = "No instructions provided.";

/// An assignment joined with the student's submission state
#[derive(Debug, Clone, PartialEq)]
pub struct StudentAssignment {
    pub id: String,
    pub title: String,
    /// Class name, `N/A` when the class is unknown
    pub course: String,
    pub due_date: DateTime<Utc>,
    pub instructions: Option<String>,
    pub attachment_url: Option<String>,
    pub status: SubmissionStatus,
}

impl StudentAssignment {
    pub fn instructions_text(&self) -> &str {
        self.instructions
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(NO_INSTRUCTIONS)
    }

    /// "Due 02 mai 2024"
    pub fn due_label(&self) -> String {
        format!("Due {}", french_short_date(self.due_date.date_naive()))
    }
}

/// Assignments of every class the student is enrolled in
pub async fn load_assignments(
    gateway: &dyn DataGateway,
    student_id: &str,
) -> Result<Vec<StudentAssignment>> {
    let enrollments = gateway.enrollments_for_student(student_id).await?;
    if enrollments.is_empty() {
        return Ok(Vec::new());
    }

    let class_ids: Vec<String> = enrollments.into_iter().map(|e| e.class_id).collect();
    let assignments = gateway.assignments_for_classes(&class_ids).await?;

    let assignment_ids: Vec<String> = assignments.iter().map(|a| a.id.clone()).collect();
    let submissions = gateway
        .submissions_for_student(student_id, &assignment_ids)
        .await?;

    Ok(assignments
        .into_iter()
        .map(|a| {
            let status = submissions
                .iter()
                .find(|s| s.assignment_id == a.id)
                .map(|s| s.status)
                .unwrap_or_default();
            StudentAssignment {
                course: a.class_name().unwrap_or("N/A").to_string(),
                id: a.id,
                title: a.title,
                due_date: a.due_date,
                instructions: a.instructions,
                attachment_url: a.attachment_url,
                status,
            }
        })
        .collect())
}

/// Fetch the file attached to an assignment
pub async fn download_attachment(
    gateway: &dyn DataGateway,
    assignment: &StudentAssignment,
) -> Result<Vec<u8>> {
    match assignment.attachment_url {
        Some(ref url) => gateway.download_file(url).await,
        None => Err(Error::storage(format!(
            "Assignment {} has no attachment",
            assignment.id
        ))),
    }
}
