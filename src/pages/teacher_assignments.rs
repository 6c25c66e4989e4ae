//! Teacher assignments: board, creation and correction upload

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::Result;
use crate::gateway::DataGateway;
use crate::models::{
    Assignment, AssignmentCorrection, AssignmentKind, AssignmentStatus, Class, NewAssignment,
};
use crate::pages::Notice;
use crate::storage::FileOptions;
use crate::validation::{has_min_chars, is_uuid, ValidationErrors};

pub const TITLE_REQUIRED: &str = "Le titre est requis.";
pub const CLASS_REQUIRED: &str = "Veuillez sélectionner une classe.";
pub const DUE_DATE_REQUIRED: &str = "La date d'échéance est requise.";
pub const DUE_DATE_INVALID: &str = "La date d'échéance est invalide.";
pub const MAX_POINTS_NEGATIVE: &str = "Le barème ne peut pas être négatif.";
pub const FILE_REQUIRED: &str = "Veuillez sélectionner un fichier.";

pub const CREATED: &str = "Évaluation créée !";
pub const CORRECTION_SAVED: &str = "Correction enregistrée !";

/// Assignments due within this window count as due soon
const DUE_SOON_DAYS: i64 = 3;

/// Board tabs, one per kind of assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignmentTab {
    #[default]
    Assignments,
    Exams,
    Evaluations,
}

impl AssignmentTab {
    pub fn kind(&self) -> AssignmentKind {
        match self {
            AssignmentTab::Assignments => AssignmentKind::Homework,
            AssignmentTab::Exams => AssignmentKind::Exam,
            AssignmentTab::Evaluations => AssignmentKind::Evaluation,
        }
    }
}

/// Class selector above the board
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClassFilter {
    #[default]
    All,
    Class(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssignmentStats {
    pub total: usize,
    /// Not yet corrected
    pub to_grade: usize,
    pub completed: usize,
    /// Due between now and three days from now
    pub due_soon: usize,
}

impl AssignmentStats {
    pub fn compute(assignments: &[Assignment], now: DateTime<Utc>) -> Self {
        let horizon = now + Duration::days(DUE_SOON_DAYS);
        let completed = assignments.iter().filter(|a| a.is_corrected()).count();
        Self {
            total: assignments.len(),
            to_grade: assignments.len() - completed,
            completed,
            due_soon: assignments
                .iter()
                .filter(|a| a.due_date >= now && a.due_date <= horizon)
                .count(),
        }
    }
}

/// Everything the assignments page shows
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentBoard {
    pub assignments: Vec<Assignment>,
    pub classes: Vec<Class>,
    pub stats: AssignmentStats,
}

impl AssignmentBoard {
    /// Load the teacher's assignments and classes
    pub async fn load(gateway: &dyn DataGateway, teacher_id: &str, now: DateTime<Utc>) -> Result<Self> {
        let (assignments, classes) = tokio::try_join!(
            gateway.assignments_for_teacher(teacher_id),
            gateway.classes(Some(teacher_id)),
        )?;

        Ok(Self {
            stats: AssignmentStats::compute(&assignments, now),
            assignments,
            classes,
        })
    }

    /// Assignments of the tab's kind, restricted to the selected class
    pub fn filtered(&self, tab: AssignmentTab, class: &ClassFilter) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| match class {
                ClassFilter::All => true,
                ClassFilter::Class(id) => a.class_id.as_deref() == Some(id.as_str()),
            })
            .filter(|a| a.kind == Some(tab.kind()))
            .collect()
    }
}

/// A file picked by the user
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn new(file_name: &str, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            data,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    fn options(&self, upsert: bool) -> FileOptions {
        let options = FileOptions::new().with_upsert(upsert);
        match self.content_type {
            Some(ref content_type) => options.with_content_type(content_type),
            None => options,
        }
    }
}

/// Values of the "new assessment" form
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAssignmentForm {
    pub kind: AssignmentKind,
    pub title: String,
    pub class_id: String,
    pub instructions: Option<String>,
    /// `YYYY-MM-DDTHH:MM` as a datetime input produces, or a bare date
    pub due_date: String,
    pub max_points: Option<f64>,
    pub attachment: Option<Attachment>,
}

fn parse_due_date(value: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

impl CreateAssignmentForm {
    /// Check the form and build the row to insert, without the attachment URL
    pub fn validate(&self, teacher_id: &str) -> std::result::Result<NewAssignment, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = self.title.trim();
        if !has_min_chars(title, 3) {
            errors.add("title", TITLE_REQUIRED);
        }
        if !is_uuid(&self.class_id) {
            errors.add("class_id", CLASS_REQUIRED);
        }
        let due_date = self.due_date.trim();
        let parsed = parse_due_date(due_date);
        if due_date.is_empty() {
            errors.add("due_date", DUE_DATE_REQUIRED);
        } else if parsed.is_none() {
            errors.add("due_date", DUE_DATE_INVALID);
        }
        if self.max_points.map_or(false, |points| points < 0.0) {
            errors.add("max_points", MAX_POINTS_NEGATIVE);
        }

        let due_date = match parsed {
            Some(due_date) if errors.is_empty() => due_date,
            _ => return Err(errors),
        };

        Ok(NewAssignment {
            title: title.to_string(),
            kind: self.kind,
            class_id: self.class_id.clone(),
            teacher_id: teacher_id.to_string(),
            instructions: self
                .instructions
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            due_date,
            max_points: self.max_points,
            attachment_url: None,
        })
    }
}

/// Storage path of a new assignment's attachment
pub fn attachment_path(teacher_id: &str, millis: i64, file_name: &str) -> String {
    format!("{}/{}_{}", teacher_id, millis, file_name)
}

/// Storage path of an assignment's correction
pub fn correction_path(teacher_id: &str, assignment_id: &str, file_name: &str) -> String {
    format!("{}/corrections/{}/{}", teacher_id, assignment_id, file_name)
}

/// Create an assignment, uploading its attachment first.
///
/// Form errors come back as `Error::Validation`; the outcome of the remote
/// work comes back as a notice. An attachment whose row could not be written
/// is removed again.
pub async fn create_assignment(
    gateway: &dyn DataGateway,
    teacher_id: &str,
    form: &CreateAssignmentForm,
) -> Result<Notice> {
    let mut assignment = form.validate(teacher_id)?;

    let mut uploaded = None;
    if let Some(ref attachment) = form.attachment {
        let path = attachment_path(teacher_id, Utc::now().timestamp_millis(), &attachment.file_name);
        match gateway
            .upload_file(&path, attachment.data.clone(), attachment.options(false))
            .await
        {
            Ok(url) => {
                assignment.attachment_url = Some(url);
                uploaded = Some(path);
            }
            Err(e) => return Ok(Notice::failure("Erreur: ", &e)),
        }
    }

    if let Err(e) = gateway.insert_assignment(&assignment).await {
        if let Some(path) = uploaded {
            if let Err(cleanup) = gateway.remove_file(&path).await {
                log::warn!("Could not remove orphaned attachment {}: {}", path, cleanup);
            }
        }
        return Ok(Notice::failure("Erreur: ", &e));
    }

    log::info!("Teacher {} created assignment {:?}", teacher_id, assignment.title);
    Ok(Notice::success(CREATED))
}

/// Upload a correction and mark the assignment corrected
pub async fn submit_correction(
    gateway: &dyn DataGateway,
    teacher_id: &str,
    assignment: &Assignment,
    file: Option<&Attachment>,
) -> Result<Notice> {
    let file = match file {
        Some(file) => file,
        None => {
            let mut errors = ValidationErrors::new();
            errors.add("correction_file", FILE_REQUIRED);
            return Err(errors.into());
        }
    };

    let path = correction_path(teacher_id, &assignment.id, &file.file_name);
    let url = match gateway.upload_file(&path, file.data.clone(), file.options(true)).await {
        Ok(url) => url,
        Err(e) => return Ok(Notice::failure("Erreur: ", &e)),
    };

    let correction = AssignmentCorrection {
        correction_file_url: url,
        status: AssignmentStatus::Corrected,
    };
    match gateway.update_assignment(&assignment.id, &correction).await {
        Ok(()) => Ok(Notice::success(CORRECTION_SAVED)),
        Err(e) => Ok(Notice::failure("Erreur: ", &e)),
    }
}
