//! Student-side operation handlers. Each handler makes one or more
//! facade calls, shapes the responses into a view model, and returns
//! exactly one outcome; classified failures it does not translate are
//! republished by the dispatcher as `OperationFailed`.

use std::collections::HashMap;

use serde_json::Value;

use crate::aggregation::{
    aggregate, average_level, completed_sub_question_view, merge_sub_question, PerformanceMatrix,
};
use crate::errors::{OperationFailure, ServiceError};
use crate::models::{CompletedSubQuestion, LlmMessage, Permission};
use crate::outcomes::Outcome;
use crate::service::{fetch_optional_image, ApiService, Registration};
use crate::text;
use crate::view_models::{
    AssignmentData, AssignmentReviewData, CompletedQuestionSummary, CompletedSubQuestionSummary,
    DashboardData, DashboardStats, DueAssignment, QuestionReviewData, QuestionView,
    StudentClassData, SubQuestionFeedbackView, Tag, TagKind,
};
use crate::worker::{i64_param, require_i64, str_param, Params};

pub(crate) async fn signin(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let username = str_param(params, "username");
    let password = str_param(params, "password");

    match service.login(username, password).await {
        Ok(()) => {
            let user = service.current_user().await?;
            Ok(Outcome::SignInFinished {
                success: true,
                message: "Signin successful".to_string(),
                user: Some(user),
            })
        }
        // Wrong credentials are a user-facing outcome, not a failure.
        Err(ServiceError::Unauthorized(detail)) => Ok(Outcome::SignInFinished {
            success: false,
            message: detail,
            user: None,
        }),
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn signup(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let role = str_param(params, "role");
    let Some(permission) = Permission::from_role(role) else {
        return Err(OperationFailure::new(format!("Invalid role: {role}")));
    };

    let registration = Registration {
        username: str_param(params, "username").to_string(),
        email: str_param(params, "email").to_string(),
        display_name: format!(
            "{} {}",
            str_param(params, "first_name"),
            str_param(params, "last_name")
        ),
        password: str_param(params, "password").to_string(),
        permission,
    };

    match service.register(&registration).await {
        Ok(()) => Ok(Outcome::SignUpFinished {
            success: true,
            message: "Signup successful".to_string(),
        }),
        Err(ServiceError::BadRequest(detail)) => Ok(Outcome::SignUpFinished {
            success: false,
            message: detail,
        }),
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn load_dashboard_data(
    service: &dyn ApiService,
    _params: &Params,
) -> Result<Outcome, OperationFailure> {
    let overview = match service.get_overview().await {
        Ok(overview) => overview,
        // Not enrolled in any class yet; a well-formed empty dashboard.
        Err(ServiceError::NotFound(_)) => {
            return Ok(Outcome::DashboardDataLoaded(DashboardData::not_enrolled()));
        }
        Err(err) => return Err(err.into()),
    };

    let assignments = overview
        .assignments
        .iter()
        .map(|assignment| DueAssignment {
            name: assignment.name.clone(),
            due: text::format_due_date(assignment.due_date),
        })
        .collect();

    let matrix = PerformanceMatrix::from_performances(&overview.performances);
    let aggregated = aggregate(&matrix);
    let stats = DashboardStats {
        display_name: overview.display_name.clone(),
        total_questions_answered: overview.total_question_number,
        average_level: average_level(aggregated.average_score).label(),
        best_concept: aggregated.best_concept.label(),
        best_process: aggregated.best_process.label(),
        level_percent: aggregated.level_percent,
        grade: aggregated.grade.symbol().to_string(),
    };

    Ok(Outcome::DashboardDataLoaded(DashboardData {
        class_name: Some(overview.class_name),
        display_name: overview.display_name,
        assignments,
        stats: Some(stats),
        matrix: Some(matrix),
    }))
}

pub(crate) async fn load_class_data(
    service: &dyn ApiService,
    _params: &Params,
) -> Result<Outcome, OperationFailure> {
    match service.get_class_data(None).await {
        Ok(data) => Ok(Outcome::ClassDataLoaded(StudentClassData {
            class_name: Some(data.name),
            enter_code: Some(data.enter_code),
            students: data.students,
            assignments: data.assignments,
            performances: Some(data.performances),
        })),
        Err(ServiceError::NotFound(_)) => {
            Ok(Outcome::ClassDataLoaded(StudentClassData::not_enrolled()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Joins an assignment's question bank entries against the student's
/// completed submissions for the answering view.
pub(crate) async fn load_assignment_data(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let assignment_id = require_i64(params, "assignment_id")?;

    let assignments = service.get_assignments().await?;
    let Some(assignment) = assignments.into_iter().find(|a| a.id == assignment_id) else {
        return Err(OperationFailure::new("Assignment not found"));
    };

    let questions =
        merged_question_views(service, assignment.id, &assignment.question_ids, false).await?;

    Ok(Outcome::QuestionAnsweringDataLoaded(AssignmentData {
        id: assignment.id,
        title: assignment.name,
        description: assignment.description,
        questions,
    }))
}

/// Same joins as the answering view, but multi-select answers are split
/// back into option lists, and a vanished assignment id is a
/// recoverable empty payload rather than a failure.
pub(crate) async fn load_assignment_review_data(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let assignment_id = require_i64(params, "assignment_id")?;

    let assignments = service.get_assignments().await?;
    let Some(assignment) = assignments.into_iter().find(|a| a.id == assignment_id) else {
        return Ok(Outcome::AssignmentReviewDataLoaded(AssignmentReviewData::missing()));
    };

    let questions =
        merged_question_views(service, assignment.id, &assignment.question_ids, true).await?;

    Ok(Outcome::AssignmentReviewDataLoaded(AssignmentReviewData {
        id: Some(assignment.id),
        title: assignment.name,
        description: assignment.description,
        questions,
    }))
}

async fn merged_question_views(
    service: &dyn ApiService,
    assignment_id: i64,
    question_ids: &[i64],
    split_multi_select: bool,
) -> Result<Vec<QuestionView>, OperationFailure> {
    let questions = service.get_questions(question_ids).await?;
    let completed = service.get_completed_sub_questions(assignment_id).await?;
    let submissions: HashMap<i64, CompletedSubQuestion> =
        completed.into_iter().map(|submission| (submission.id, submission)).collect();

    let mut views = Vec::with_capacity(questions.len());
    for question in &questions {
        let mut sub_views = Vec::with_capacity(question.sub_questions.len());
        for sub_question in &question.sub_questions {
            let mut view = merge_sub_question(sub_question, &submissions, split_multi_select);
            view.image = fetch_optional_image(service, sub_question.image_id).await?;
            sub_views.push(view);
        }
        views.push(QuestionView {
            id: question.id,
            title: question.name.clone(),
            attribution: text::attribution(&question.source),
            sub_questions: sub_views,
        });
    }
    Ok(views)
}

pub(crate) async fn load_question_review_data(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let question_id = require_i64(params, "question_id")?;

    let question = service.get_completed_question(question_id).await?;
    let mut sub_views = Vec::with_capacity(question.sub_questions.len());
    for sub_question in &question.sub_questions {
        let mut view = completed_sub_question_view(sub_question);
        view.image = fetch_optional_image(service, sub_question.image_id).await?;
        sub_views.push(view);
    }

    Ok(Outcome::QuestionReviewDataLoaded(QuestionReviewData {
        id: question.id,
        title: question.name.clone(),
        questions: vec![QuestionView {
            id: question.id,
            title: question.name,
            attribution: text::attribution(&question.source),
            sub_questions: sub_views,
        }],
    }))
}

pub(crate) async fn load_questions(
    service: &dyn ApiService,
    _params: &Params,
) -> Result<Outcome, OperationFailure> {
    let mut questions = service.get_completed_questions().await?;
    questions.sort_by_key(|question| question.id);

    let mut summaries = Vec::with_capacity(questions.len());
    for question in &questions {
        let mut sub_summaries = Vec::with_capacity(question.sub_questions.len());
        for (index, sub_question) in question.sub_questions.iter().enumerate() {
            sub_summaries.push(CompletedSubQuestionSummary {
                title: text::question_letter_title(index),
                text: sub_question.description.clone(),
                image: fetch_optional_image(service, sub_question.image_id).await?,
                tags: vec![
                    Tag { label: sub_question.concept.label(), kind: TagKind::Concept },
                    Tag { label: sub_question.process.label(), kind: TagKind::Process },
                    Tag { label: sub_question.performance.label(), kind: TagKind::Result },
                ],
            });
        }
        summaries.push(CompletedQuestionSummary {
            id: question.id,
            title: question.name.clone(),
            footer: text::attribution(&question.source),
            sub_questions: sub_summaries,
        });
    }

    Ok(Outcome::QuestionsLoaded(summaries))
}

/// Submits one sub-question answer for instant feedback. Multi-select
/// answers arrive as a list and are joined with the reserved delimiter
/// before transmission.
pub(crate) async fn submit_sub_question(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let assignment_id = require_i64(params, "assignment_id")?;
    let sub_question_id = require_i64(params, "sub_question_id")?;

    let answer = match params.get("answer") {
        Some(Value::String(answer)) => answer.clone(),
        Some(Value::Array(options)) => text::join_answer(
            &options
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<Vec<_>>(),
        ),
        _ => return Err(OperationFailure::new("Missing parameter: answer")),
    };

    let feedback = service
        .submit_sub_question(assignment_id, sub_question_id, &answer)
        .await?;

    Ok(Outcome::SubQuestionFeedbackReceived {
        sub_question_id,
        feedback: SubQuestionFeedbackView {
            feedback: feedback.comment,
            performance: feedback.performance.label(),
        },
    })
}

pub(crate) async fn send_ai_message(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let message = str_param(params, "message");
    let sub_question_id = i64_param(params, "sub_question_id").unwrap_or(0);
    let history: Vec<LlmMessage> = params
        .get("history")
        .map(|value| serde_json::from_value(value.clone()))
        .transpose()
        .map_err(|err| OperationFailure::new(format!("Invalid message history: {err}")))?
        .unwrap_or_default();

    let hint = service.get_hint(sub_question_id, message, &history).await?;

    Ok(Outcome::AiResponseReceived { text: hint })
}

pub(crate) async fn join_class(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let class_name = str_param(params, "class_name");
    let enter_code = str_param(params, "enter_code");

    // Validated client-side; no remote call with incomplete input.
    if class_name.is_empty() || enter_code.is_empty() {
        return Ok(Outcome::JoinClassFinished {
            success: false,
            message: "Invalid class name or enter code.".to_string(),
        });
    }

    match service.join_class(class_name, enter_code).await {
        Ok(()) => Ok(Outcome::JoinClassFinished {
            success: true,
            message: format!("Successfully joined class '{class_name}'!"),
        }),
        Err(ServiceError::Forbidden(_)) => {
            Err(OperationFailure::new("You are already enrolled in this class."))
        }
        Err(ServiceError::NotFound(_)) => {
            Err(OperationFailure::new("Invalid class name or enter code."))
        }
        Err(err) => Err(err.into()),
    }
}
