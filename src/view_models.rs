//! Payload structs published on the outcome channel. Each is built once
//! by a handler run and never mutated after publication; views that need
//! fresher data re-dispatch the operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregation::{PerformanceMatrix, SubQuestionStatistics};
use crate::models::{Assignment, ConceptPerformances, PerformanceLevel, User};

/// Assignment line on a dashboard: name plus formatted due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueAssignment {
    pub name: String,
    pub due: String,
}

/// Headline numbers derived from the performance matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub display_name: String,
    pub total_questions_answered: i64,
    pub average_level: String,
    pub best_concept: String,
    pub best_process: String,
    /// Progress within the current grade, 0..=99.
    pub level_percent: u8,
    /// Roman-numeral grade letter.
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    /// `None` when the student is not enrolled in any class; all other
    /// fields are empty in that case.
    pub class_name: Option<String>,
    pub display_name: String,
    pub assignments: Vec<DueAssignment>,
    pub stats: Option<DashboardStats>,
    pub matrix: Option<PerformanceMatrix>,
}

impl DashboardData {
    pub fn not_enrolled() -> Self {
        Self {
            class_name: None,
            display_name: String::new(),
            assignments: Vec::new(),
            stats: None,
            matrix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentClassData {
    pub class_name: Option<String>,
    pub enter_code: Option<String>,
    pub students: Vec<User>,
    pub assignments: Vec<Assignment>,
    pub performances: Option<ConceptPerformances>,
}

impl StudentClassData {
    pub fn not_enrolled() -> Self {
        Self {
            class_name: None,
            enter_code: None,
            students: Vec::new(),
            assignments: Vec::new(),
            performances: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubQuestionKind {
    MultipleChoice,
    Text,
}

impl SubQuestionKind {
    pub fn from_options(options: Option<&Vec<String>>) -> Self {
        if options.is_some() { SubQuestionKind::MultipleChoice } else { SubQuestionKind::Text }
    }
}

/// A stored answer as shown back to the user: free text as-is,
/// multi-select as the list of selected options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserAnswer {
    Text(String),
    Selected(Vec<String>),
}

/// One sub-question in the answering or review views. Submission fields
/// are populated only when `is_submitted` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuestionView {
    pub id: i64,
    pub kind: SubQuestionKind,
    pub text: String,
    pub options: Option<Vec<String>>,
    pub image: Option<Vec<u8>>,
    pub keywords: Vec<String>,
    pub is_submitted: bool,
    pub user_answer: Option<UserAnswer>,
    pub performance: Option<String>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: i64,
    pub title: String,
    pub attribution: String,
    pub sub_questions: Vec<SubQuestionView>,
}

/// Assignment payload for the question-answering view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentData {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub questions: Vec<QuestionView>,
}

/// Assignment payload for the student's review view. `id` is `None`
/// when the requested assignment no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentReviewData {
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub questions: Vec<QuestionView>,
}

impl AssignmentReviewData {
    pub fn missing() -> Self {
        Self { id: None, title: String::new(), description: String::new(), questions: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionReviewData {
    pub id: i64,
    pub title: String,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    Concept,
    Process,
    Result,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
    pub kind: TagKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedSubQuestionSummary {
    /// Letter title by position: "Question A", "Question B", ...
    pub title: String,
    pub text: String,
    pub image: Option<Vec<u8>>,
    pub tags: Vec<Tag>,
}

/// One entry in the student's completed-question history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedQuestionSummary {
    pub id: i64,
    pub title: String,
    pub footer: String,
    pub sub_questions: Vec<CompletedSubQuestionSummary>,
}

/// Instant feedback shown next to a just-submitted sub-question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuestionFeedbackView {
    pub feedback: String,
    pub performance: String,
}

/// Chart-ready series: formatted date labels with matching scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSeries {
    pub dates: Vec<String>,
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherClassOverview {
    pub id: i64,
    pub name: String,
    pub student_count: i64,
    pub assignments: Vec<DueAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentCard {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSeries {
    pub id: i64,
    pub name: String,
    pub performance_data: PerformanceSeries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherDashboardData {
    pub classes: Vec<TeacherClassOverview>,
    pub recent_assignments: Vec<AssignmentCard>,
    pub students: Vec<StudentSeries>,
}

/// Question-bank row in the teacher's questions table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub id: i64,
    pub name: String,
    pub source: String,
    pub is_audited: bool,
    pub sub_questions_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassStudent {
    pub id: i64,
    pub name: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassAssignmentView {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// "Assigned" while the due date is in the future, "Closed" after.
    pub status: String,
    pub due_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherClassData {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub students: Vec<ClassStudent>,
    pub assignments: Vec<ClassAssignmentView>,
    pub performance_data: ConceptPerformances,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentStatistics {
    pub student_id: i64,
    pub student_name: String,
    pub matrix_30_days: ConceptPerformances,
    pub matrix_all_time: ConceptPerformances,
    pub performance_chart_data: PerformanceSeries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentPerformanceView {
    pub user: User,
    /// Multi-select answers are rendered with ", " between options.
    pub answer: Option<String>,
    pub performance: Option<PerformanceLevel>,
    pub feedback: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSubQuestionView {
    pub id: i64,
    pub kind: SubQuestionKind,
    pub text: String,
    pub answer: Option<String>,
    pub options: Option<Vec<String>>,
    pub image: Option<Vec<u8>>,
    pub statistics: SubQuestionStatistics,
    pub student_performances: Vec<StudentPerformanceView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewQuestionView {
    pub title: String,
    pub attribution: String,
    pub sub_questions: Vec<ReviewSubQuestionView>,
}

/// Whole-class review of one assignment, with per-sub-question response
/// statistics precomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassAssignmentReview {
    pub title: String,
    pub class_id: i64,
    pub assignment_id: i64,
    pub total_students: usize,
    pub questions: Vec<ReviewQuestionView>,
}

/// Sub-question with its expected answer, for teacher-facing views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherSubQuestionView {
    pub id: i64,
    pub kind: SubQuestionKind,
    pub text: String,
    pub answer: Option<String>,
    pub options: Option<Vec<String>>,
    pub image: Option<Vec<u8>>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherQuestionView {
    pub id: i64,
    pub title: String,
    pub attribution: String,
    pub sub_questions: Vec<TeacherSubQuestionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentQuestionsData {
    pub title: String,
    pub description: String,
    pub questions: Vec<TeacherQuestionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableAssignment {
    pub id: i64,
    pub name: String,
    pub description: String,
}
