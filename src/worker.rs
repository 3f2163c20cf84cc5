//! Single-flight background operation dispatcher. The UI thread hands
//! over `(operation name, parameters)` pairs; handlers run on a spawned
//! task and report back through the outcome channel, so the interactive
//! thread never blocks on a remote call.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::errors::OperationFailure;
use crate::outcomes::{Outcome, OutcomeSender};
use crate::service::ApiService;
use crate::{log_op_error, log_op_start, log_op_success};
use crate::{student_handlers as student, teacher_handlers as teacher};

/// Operation parameters: a JSON object keyed by parameter name.
pub type Params = Map<String, Value>;

/// Operation name constants. The vocabulary is closed; adding an
/// operation means a new constant, a new [`OperationKind`] arm, and a
/// new outcome kind, never a change to an existing payload shape.
pub mod op {
    pub const SIGNIN: &str = "signin";
    pub const SIGNUP: &str = "signup";

    pub const LOAD_DASHBOARD_DATA: &str = "load_dashboard_data";
    pub const LOAD_CLASS_DATA: &str = "load_class_data";
    pub const LOAD_ASSIGNMENT_DATA: &str = "load_assignment_data";
    pub const LOAD_ASSIGNMENT_REVIEW_DATA: &str = "load_assignment_review_data";
    pub const LOAD_QUESTION_REVIEW_DATA: &str = "load_question_review_data";
    pub const LOAD_QUESTIONS: &str = "load_questions";
    pub const SUBMIT_SUB_QUESTION: &str = "submit_sub_question";
    pub const SEND_AI_MESSAGE: &str = "send_ai_message";
    pub const JOIN_CLASS: &str = "join_class";

    pub const LOAD_TEACHER_DASHBOARD_DATA: &str = "load_teacher_dashboard_data";
    pub const LOAD_TEACHER_ASSIGNMENTS_DATA: &str = "load_teacher_assignments_data";
    pub const LOAD_TEACHER_QUESTIONS_DATA: &str = "load_teacher_questions_data";
    pub const LOAD_TEACHER_CLASS_DATA: &str = "load_teacher_class_data";
    pub const LOAD_TEACHER_STUDENT_STATISTICS: &str = "load_teacher_student_statistics";
    pub const LOAD_AVAILABLE_ASSIGNMENTS: &str = "load_available_assignments";
    pub const CREATE_ASSIGNMENT: &str = "create_assignment";
    pub const CREATE_CLASS: &str = "create_class";
    pub const CREATE_QUESTION: &str = "create_question";
    pub const LOAD_CLASS_ASSIGNMENT_REVIEW: &str = "load_class_assignment_review";
    pub const REMOVE_STUDENT_FROM_CLASS: &str = "remove_student_from_class";
    pub const LOAD_ASSIGNMENT_QUESTIONS: &str = "load_assignment_questions";
    pub const ASSIGN_ASSIGNMENT_TO_CLASS: &str = "assign_assignment_to_class";
    pub const LOAD_FILTERED_QUESTIONS: &str = "load_filtered_questions";
}

/// The closed operation vocabulary, one variant per registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Signin,
    Signup,
    LoadDashboardData,
    LoadClassData,
    LoadAssignmentData,
    LoadAssignmentReviewData,
    LoadQuestionReviewData,
    LoadQuestions,
    SubmitSubQuestion,
    SendAiMessage,
    JoinClass,
    LoadTeacherDashboardData,
    LoadTeacherAssignmentsData,
    LoadTeacherQuestionsData,
    LoadTeacherClassData,
    LoadTeacherStudentStatistics,
    LoadAvailableAssignments,
    CreateAssignment,
    CreateClass,
    CreateQuestion,
    LoadClassAssignmentReview,
    RemoveStudentFromClass,
    LoadAssignmentQuestions,
    AssignAssignmentToClass,
    LoadFilteredQuestions,
}

impl OperationKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            op::SIGNIN => Some(Self::Signin),
            op::SIGNUP => Some(Self::Signup),
            op::LOAD_DASHBOARD_DATA => Some(Self::LoadDashboardData),
            op::LOAD_CLASS_DATA => Some(Self::LoadClassData),
            op::LOAD_ASSIGNMENT_DATA => Some(Self::LoadAssignmentData),
            op::LOAD_ASSIGNMENT_REVIEW_DATA => Some(Self::LoadAssignmentReviewData),
            op::LOAD_QUESTION_REVIEW_DATA => Some(Self::LoadQuestionReviewData),
            op::LOAD_QUESTIONS => Some(Self::LoadQuestions),
            op::SUBMIT_SUB_QUESTION => Some(Self::SubmitSubQuestion),
            op::SEND_AI_MESSAGE => Some(Self::SendAiMessage),
            op::JOIN_CLASS => Some(Self::JoinClass),
            op::LOAD_TEACHER_DASHBOARD_DATA => Some(Self::LoadTeacherDashboardData),
            op::LOAD_TEACHER_ASSIGNMENTS_DATA => Some(Self::LoadTeacherAssignmentsData),
            op::LOAD_TEACHER_QUESTIONS_DATA => Some(Self::LoadTeacherQuestionsData),
            op::LOAD_TEACHER_CLASS_DATA => Some(Self::LoadTeacherClassData),
            op::LOAD_TEACHER_STUDENT_STATISTICS => Some(Self::LoadTeacherStudentStatistics),
            op::LOAD_AVAILABLE_ASSIGNMENTS => Some(Self::LoadAvailableAssignments),
            op::CREATE_ASSIGNMENT => Some(Self::CreateAssignment),
            op::CREATE_CLASS => Some(Self::CreateClass),
            op::CREATE_QUESTION => Some(Self::CreateQuestion),
            op::LOAD_CLASS_ASSIGNMENT_REVIEW => Some(Self::LoadClassAssignmentReview),
            op::REMOVE_STUDENT_FROM_CLASS => Some(Self::RemoveStudentFromClass),
            op::LOAD_ASSIGNMENT_QUESTIONS => Some(Self::LoadAssignmentQuestions),
            op::ASSIGN_ASSIGNMENT_TO_CLASS => Some(Self::AssignAssignmentToClass),
            op::LOAD_FILTERED_QUESTIONS => Some(Self::LoadFilteredQuestions),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Signin => op::SIGNIN,
            Self::Signup => op::SIGNUP,
            Self::LoadDashboardData => op::LOAD_DASHBOARD_DATA,
            Self::LoadClassData => op::LOAD_CLASS_DATA,
            Self::LoadAssignmentData => op::LOAD_ASSIGNMENT_DATA,
            Self::LoadAssignmentReviewData => op::LOAD_ASSIGNMENT_REVIEW_DATA,
            Self::LoadQuestionReviewData => op::LOAD_QUESTION_REVIEW_DATA,
            Self::LoadQuestions => op::LOAD_QUESTIONS,
            Self::SubmitSubQuestion => op::SUBMIT_SUB_QUESTION,
            Self::SendAiMessage => op::SEND_AI_MESSAGE,
            Self::JoinClass => op::JOIN_CLASS,
            Self::LoadTeacherDashboardData => op::LOAD_TEACHER_DASHBOARD_DATA,
            Self::LoadTeacherAssignmentsData => op::LOAD_TEACHER_ASSIGNMENTS_DATA,
            Self::LoadTeacherQuestionsData => op::LOAD_TEACHER_QUESTIONS_DATA,
            Self::LoadTeacherClassData => op::LOAD_TEACHER_CLASS_DATA,
            Self::LoadTeacherStudentStatistics => op::LOAD_TEACHER_STUDENT_STATISTICS,
            Self::LoadAvailableAssignments => op::LOAD_AVAILABLE_ASSIGNMENTS,
            Self::CreateAssignment => op::CREATE_ASSIGNMENT,
            Self::CreateClass => op::CREATE_CLASS,
            Self::CreateQuestion => op::CREATE_QUESTION,
            Self::LoadClassAssignmentReview => op::LOAD_CLASS_ASSIGNMENT_REVIEW,
            Self::RemoveStudentFromClass => op::REMOVE_STUDENT_FROM_CLASS,
            Self::LoadAssignmentQuestions => op::LOAD_ASSIGNMENT_QUESTIONS,
            Self::AssignAssignmentToClass => op::ASSIGN_ASSIGNMENT_TO_CLASS,
            Self::LoadFilteredQuestions => op::LOAD_FILTERED_QUESTIONS,
        }
    }
}

/// One dispatched request; consumed exactly once.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub name: String,
    pub params: Params,
}

/// The dispatcher. At most one operation is in flight at a time; the
/// `(name, params)` slot is the only shared mutable state and is only
/// rewritten after the previous run has published its outcome.
pub struct ApiWorker {
    service: Arc<dyn ApiService>,
    outcomes: OutcomeSender,
    pending: Option<OperationRequest>,
    running: Option<JoinHandle<()>>,
}

impl ApiWorker {
    pub fn new(service: Arc<dyn ApiService>, outcomes: OutcomeSender) -> Self {
        Self { service, outcomes, pending: None, running: None }
    }

    /// Records the next operation to run. Waits for any in-flight run
    /// to publish its outcome first, so two operations never interleave
    /// on the request slot. This is the only point a caller may block,
    /// and the wait is bounded by the current handler's completion.
    pub async fn setup(&mut self, name: impl Into<String>, params: Params) {
        if let Some(handle) = self.running.take() {
            let _ = handle.await;
        }
        self.pending = Some(OperationRequest { name: name.into(), params });
    }

    /// Spawns the pending operation off the interactive thread. A call
    /// with nothing pending is a no-op.
    pub fn start(&mut self) {
        if let Some(request) = self.pending.take() {
            let service = Arc::clone(&self.service);
            let outcomes = self.outcomes.clone();
            self.running = Some(tokio::spawn(run_operation(service, outcomes, request)));
        }
    }

    /// `setup` followed by `start`.
    pub async fn dispatch(&mut self, name: impl Into<String>, params: Params) {
        self.setup(name, params).await;
        self.start();
    }

    /// Waits until the in-flight run, if any, has published its outcome.
    pub async fn join(&mut self) {
        if let Some(handle) = self.running.take() {
            let _ = handle.await;
        }
    }
}

/// Executes one request to completion: registry lookup, handler run,
/// and exactly one published outcome. Handler failures are converted
/// here; nothing propagates past this boundary.
async fn run_operation(
    service: Arc<dyn ApiService>,
    outcomes: OutcomeSender,
    request: OperationRequest,
) {
    let Some(kind) = OperationKind::from_name(&request.name) else {
        outcomes.publish(Outcome::OperationFailed {
            operation: request.name.clone(),
            message: format!("Unknown operation: {}", request.name),
        });
        return;
    };

    log_op_start!(request.name.as_str());

    let service = service.as_ref();
    let params = &request.params;
    let result = match kind {
        OperationKind::Signin => student::signin(service, params).await,
        OperationKind::Signup => student::signup(service, params).await,
        OperationKind::LoadDashboardData => student::load_dashboard_data(service, params).await,
        OperationKind::LoadClassData => student::load_class_data(service, params).await,
        OperationKind::LoadAssignmentData => student::load_assignment_data(service, params).await,
        OperationKind::LoadAssignmentReviewData => {
            student::load_assignment_review_data(service, params).await
        }
        OperationKind::LoadQuestionReviewData => {
            student::load_question_review_data(service, params).await
        }
        OperationKind::LoadQuestions => student::load_questions(service, params).await,
        OperationKind::SubmitSubQuestion => student::submit_sub_question(service, params).await,
        OperationKind::SendAiMessage => student::send_ai_message(service, params).await,
        OperationKind::JoinClass => student::join_class(service, params).await,
        OperationKind::LoadTeacherDashboardData => {
            teacher::load_teacher_dashboard_data(service, params).await
        }
        OperationKind::LoadTeacherAssignmentsData => {
            teacher::load_teacher_assignments_data(service, params).await
        }
        OperationKind::LoadTeacherQuestionsData => {
            teacher::load_teacher_questions_data(service, params).await
        }
        OperationKind::LoadTeacherClassData => {
            teacher::load_teacher_class_data(service, params).await
        }
        OperationKind::LoadTeacherStudentStatistics => {
            teacher::load_teacher_student_statistics(service, params).await
        }
        OperationKind::LoadAvailableAssignments => {
            teacher::load_available_assignments(service, params).await
        }
        OperationKind::CreateAssignment => teacher::create_assignment(service, params).await,
        OperationKind::CreateClass => teacher::create_class(service, params).await,
        OperationKind::CreateQuestion => teacher::create_question(service, params).await,
        OperationKind::LoadClassAssignmentReview => {
            teacher::load_class_assignment_review(service, params).await
        }
        OperationKind::RemoveStudentFromClass => {
            teacher::remove_student_from_class(service, params).await
        }
        OperationKind::LoadAssignmentQuestions => {
            teacher::load_assignment_questions(service, params).await
        }
        OperationKind::AssignAssignmentToClass => {
            teacher::assign_assignment_to_class(service, params).await
        }
        OperationKind::LoadFilteredQuestions => {
            teacher::load_filtered_questions(service, params).await
        }
    };

    match result {
        Ok(outcome) => {
            log_op_success!(request.name.as_str(), kind = outcome.kind());
            outcomes.publish(outcome);
        }
        Err(failure) => {
            log_op_error!(request.name.as_str(), error = failure.message);
            outcomes.publish(Outcome::OperationFailed {
                operation: request.name,
                message: failure.message,
            });
        }
    }
}

// Parameter extraction helpers shared by the handlers. Missing string
// parameters read as empty, matching the client-side validation rules
// that treat absent and empty the same way.

pub(crate) fn str_param<'a>(params: &'a Params, key: &str) -> &'a str {
    params.get(key).and_then(Value::as_str).unwrap_or("")
}

pub(crate) fn i64_param(params: &Params, key: &str) -> Option<i64> {
    params.get(key).and_then(Value::as_i64)
}

pub(crate) fn require_i64(params: &Params, key: &str) -> Result<i64, OperationFailure> {
    i64_param(params, key).ok_or_else(|| OperationFailure::new(format!("Missing parameter: {key}")))
}

pub(crate) fn i64_list_param(params: &Params, key: &str) -> Vec<i64> {
    params
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default()
}
