//! The typed result channel between the dispatcher and the UI. Each
//! variant is one outcome stream; subscribers match on the variant they
//! render. Delivery is in run-completion order, which equals start
//! order since only one operation runs at a time.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::models::User;
use crate::view_models::{
    AssignmentCard, AssignmentData, AssignmentQuestionsData, AssignmentReviewData,
    AvailableAssignment, ClassAssignmentReview, CompletedQuestionSummary, DashboardData,
    QuestionReviewData, QuestionSummary, StudentClassData, StudentStatistics,
    SubQuestionFeedbackView, TeacherClassData, TeacherDashboardData, TeacherQuestionView,
};

/// One published result. Ownership transfers to the subscriber; payloads
/// are never shared between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Outcome {
    SignInFinished { success: bool, message: String, user: Option<User> },
    SignUpFinished { success: bool, message: String },

    // Student streams
    DashboardDataLoaded(DashboardData),
    ClassDataLoaded(StudentClassData),
    QuestionsLoaded(Vec<CompletedQuestionSummary>),
    QuestionAnsweringDataLoaded(AssignmentData),
    QuestionReviewDataLoaded(QuestionReviewData),
    AssignmentReviewDataLoaded(AssignmentReviewData),
    SubQuestionFeedbackReceived { sub_question_id: i64, feedback: SubQuestionFeedbackView },
    JoinClassFinished { success: bool, message: String },
    AiResponseReceived { text: String },

    // Teacher streams
    TeacherDashboardDataLoaded(TeacherDashboardData),
    TeacherAssignmentsDataLoaded(Vec<AssignmentCard>),
    TeacherQuestionsDataLoaded(Vec<QuestionSummary>),
    TeacherClassDataLoaded(TeacherClassData),
    TeacherStudentStatisticsLoaded(StudentStatistics),
    AssignmentCreated { success: bool, message: String },
    ClassCreated { success: bool, message: String },
    QuestionCreated { success: bool, message: String },
    ClassAssignmentReviewLoaded(ClassAssignmentReview),
    StudentRemovedFromClass { success: bool, message: String },
    AssignmentQuestionsDataLoaded(AssignmentQuestionsData),
    AssignmentAssigned { success: bool, message: String },
    AvailableAssignmentsDataLoaded(Vec<AvailableAssignment>),
    FilteredQuestionsLoaded(Vec<TeacherQuestionView>),

    OperationFailed { operation: String, message: String },
}

impl Outcome {
    /// Stream tag identifying which subscriber the payload belongs to.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::SignInFinished { .. } => "sign_in_finished",
            Outcome::SignUpFinished { .. } => "sign_up_finished",
            Outcome::DashboardDataLoaded(_) => "dashboard_data_loaded",
            Outcome::ClassDataLoaded(_) => "class_data_loaded",
            Outcome::QuestionsLoaded(_) => "questions_loaded",
            Outcome::QuestionAnsweringDataLoaded(_) => "question_answering_data_loaded",
            Outcome::QuestionReviewDataLoaded(_) => "question_review_data_loaded",
            Outcome::AssignmentReviewDataLoaded(_) => "assignment_review_data_loaded",
            Outcome::SubQuestionFeedbackReceived { .. } => "sub_question_feedback_received",
            Outcome::JoinClassFinished { .. } => "join_class_finished",
            Outcome::AiResponseReceived { .. } => "ai_response_received",
            Outcome::TeacherDashboardDataLoaded(_) => "teacher_dashboard_data_loaded",
            Outcome::TeacherAssignmentsDataLoaded(_) => "teacher_assignments_data_loaded",
            Outcome::TeacherQuestionsDataLoaded(_) => "teacher_questions_data_loaded",
            Outcome::TeacherClassDataLoaded(_) => "teacher_class_data_loaded",
            Outcome::TeacherStudentStatisticsLoaded(_) => "teacher_student_statistics_loaded",
            Outcome::AssignmentCreated { .. } => "assignment_created",
            Outcome::ClassCreated { .. } => "class_created",
            Outcome::QuestionCreated { .. } => "question_created",
            Outcome::ClassAssignmentReviewLoaded(_) => "class_assignment_review_loaded",
            Outcome::StudentRemovedFromClass { .. } => "student_removed_from_class",
            Outcome::AssignmentQuestionsDataLoaded(_) => "assignment_questions_data_loaded",
            Outcome::AssignmentAssigned { .. } => "assignment_assigned",
            Outcome::AvailableAssignmentsDataLoaded(_) => "available_assignments_data_loaded",
            Outcome::FilteredQuestionsLoaded(_) => "filtered_questions_loaded",
            Outcome::OperationFailed { .. } => "operation_failed",
        }
    }
}

/// Publishing side of the outcome channel, held by the dispatcher.
#[derive(Debug, Clone)]
pub struct OutcomeSender {
    tx: mpsc::UnboundedSender<Outcome>,
}

impl OutcomeSender {
    /// Hands the outcome to the subscriber. A closed channel means the
    /// UI is shutting down; the outcome is dropped silently.
    pub fn publish(&self, outcome: Outcome) {
        debug!(kind = outcome.kind(), "Publishing outcome");
        let _ = self.tx.send(outcome);
    }
}

/// Creates the outcome channel: the sender goes to the dispatcher, the
/// receiver to the UI event loop.
pub fn outcome_channel() -> (OutcomeSender, mpsc::UnboundedReceiver<Outcome>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OutcomeSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_delivers_in_order() {
        let (sender, mut rx) = outcome_channel();

        sender.publish(Outcome::AiResponseReceived { text: "first".to_string() });
        sender.publish(Outcome::AiResponseReceived { text: "second".to_string() });

        match rx.recv().await {
            Some(Outcome::AiResponseReceived { text }) => assert_eq!(text, "first"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        match rx.recv().await {
            Some(Outcome::AiResponseReceived { text }) => assert_eq!(text, "second"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_publish_to_closed_channel_does_not_panic() {
        let (sender, rx) = outcome_channel();
        drop(rx);
        sender.publish(Outcome::SignUpFinished { success: true, message: "ok".to_string() });
    }

    #[test]
    fn test_kind_tags() {
        let outcome = Outcome::OperationFailed {
            operation: "load_dashboard_data".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(outcome.kind(), "operation_failed");
    }
}
