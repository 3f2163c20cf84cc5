//! Teacher-side operation handlers: dashboards, class management,
//! authoring, and whole-class assignment review.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::aggregation::sub_question_statistics;
use crate::errors::OperationFailure;
use crate::models::{
    ConceptType, NewQuestion, NewSubQuestion, PerformanceDateData, ProcessType,
};
use crate::outcomes::Outcome;
use crate::service::{fetch_optional_image, ApiService};
use crate::text;
use crate::view_models::{
    AssignmentCard, AssignmentQuestionsData, AvailableAssignment, ClassAssignmentReview,
    ClassAssignmentView, ClassStudent, DueAssignment, PerformanceSeries, QuestionSummary,
    ReviewQuestionView, ReviewSubQuestionView, StudentPerformanceView, StudentSeries,
    StudentStatistics, SubQuestionKind, Tag, TagKind, TeacherClassData, TeacherClassOverview,
    TeacherDashboardData, TeacherQuestionView, TeacherSubQuestionView,
};
use crate::worker::{i64_list_param, i64_param, require_i64, str_param, Params};

/// Window for "recent" performance queries on the teacher views.
const RECENT_DAYS: i64 = 30;

fn performance_series(data: &PerformanceDateData) -> PerformanceSeries {
    PerformanceSeries {
        dates: data.dates.iter().map(|date| text::format_chart_date(*date)).collect(),
        scores: data.performances.clone(),
    }
}

/// Builds the whole teacher dashboard: class overviews, recent
/// assignment cards with their images, and a 30-day performance series
/// per student. The classes summary the class list view renders also
/// rides in this payload.
pub(crate) async fn load_teacher_dashboard_data(
    service: &dyn ApiService,
    _params: &Params,
) -> Result<Outcome, OperationFailure> {
    let overview = service.get_teacher_overview().await?;

    let classes = overview
        .classes
        .iter()
        .map(|class| TeacherClassOverview {
            id: class.class_id,
            name: class.name.clone(),
            student_count: class.student_number,
            assignments: class
                .assignments
                .iter()
                .map(|assignment| DueAssignment {
                    name: assignment.name.clone(),
                    due: text::format_short_datetime(assignment.due_date),
                })
                .collect(),
        })
        .collect();

    let mut recent_assignments = Vec::with_capacity(overview.assignments.len());
    for assignment in &overview.assignments {
        recent_assignments.push(AssignmentCard {
            id: assignment.id,
            name: assignment.name.clone(),
            description: assignment.description.clone(),
            image: Some(service.get_assignment_image(assignment.id).await?),
        });
    }

    let since = Utc::now() - Duration::days(RECENT_DAYS);
    let mut students = Vec::with_capacity(overview.students.len());
    for student in &overview.students {
        let series = service.get_performance_date_data(student.id, since).await?;
        students.push(StudentSeries {
            id: student.id,
            name: student.display_name.clone(),
            performance_data: performance_series(&series),
        });
    }

    Ok(Outcome::TeacherDashboardDataLoaded(TeacherDashboardData {
        classes,
        recent_assignments,
        students,
    }))
}

pub(crate) async fn load_teacher_assignments_data(
    service: &dyn ApiService,
    _params: &Params,
) -> Result<Outcome, OperationFailure> {
    let assignments = service.get_assignments().await?;

    let mut cards = Vec::with_capacity(assignments.len());
    for assignment in &assignments {
        cards.push(AssignmentCard {
            id: assignment.id,
            name: assignment.name.clone(),
            description: assignment.description.clone(),
            image: Some(service.get_assignment_image(assignment.id).await?),
        });
    }

    Ok(Outcome::TeacherAssignmentsDataLoaded(cards))
}

pub(crate) async fn load_teacher_questions_data(
    service: &dyn ApiService,
    _params: &Params,
) -> Result<Outcome, OperationFailure> {
    // An unfiltered search lists the teacher's question bank.
    let questions = service.search_questions("", None, None).await?;

    let summaries = questions
        .iter()
        .map(|question| QuestionSummary {
            id: question.id,
            name: question.name.clone(),
            source: question.source.clone(),
            is_audited: question.is_audited,
            sub_questions_count: question.sub_questions.len(),
        })
        .collect();

    Ok(Outcome::TeacherQuestionsDataLoaded(summaries))
}

pub(crate) async fn load_teacher_class_data(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let class_id = require_i64(params, "class_id")?;

    let data = service.get_class_data(Some(class_id)).await?;
    let now = Utc::now();

    let students = data
        .students
        .iter()
        .map(|student| ClassStudent {
            id: student.id,
            name: student.display_name.clone(),
            username: student.name.clone(),
        })
        .collect();

    let assignments = data
        .assignments
        .iter()
        .map(|assignment| ClassAssignmentView {
            id: assignment.id,
            name: assignment.name.clone(),
            description: assignment.description.clone(),
            status: (if now < assignment.due_date { "Assigned" } else { "Closed" }).to_string(),
            due_date: text::format_datetime(assignment.due_date),
        })
        .collect();

    Ok(Outcome::TeacherClassDataLoaded(TeacherClassData {
        id: class_id,
        name: data.name,
        code: data.enter_code,
        students,
        assignments,
        performance_data: data.performances,
    }))
}

pub(crate) async fn load_teacher_student_statistics(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let student_id = require_i64(params, "student_id")?;
    let student_name = str_param(params, "student_name").to_string();
    let since = Utc::now() - Duration::days(RECENT_DAYS);

    let matrix_30_days = service.get_recent_average_performances(student_id, since).await?;
    let matrix_all_time = service.get_average_performances(student_id).await?;
    let chart = service.get_performance_date_data(student_id, since).await?;

    Ok(Outcome::TeacherStudentStatisticsLoaded(StudentStatistics {
        student_id,
        student_name,
        matrix_30_days,
        matrix_all_time,
        performance_chart_data: performance_series(&chart),
    }))
}

pub(crate) async fn load_available_assignments(
    service: &dyn ApiService,
    _params: &Params,
) -> Result<Outcome, OperationFailure> {
    let assignments = service.get_assignments().await?;

    let available = assignments
        .iter()
        .map(|assignment| AvailableAssignment {
            id: assignment.id,
            name: assignment.name.clone(),
            description: assignment.description.clone(),
        })
        .collect();

    Ok(Outcome::AvailableAssignmentsDataLoaded(available))
}

pub(crate) async fn create_assignment(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let name = str_param(params, "name");
    let description = str_param(params, "description");
    let question_ids = i64_list_param(params, "question_ids");

    if name.is_empty() || description.is_empty() {
        return Ok(Outcome::AssignmentCreated {
            success: false,
            message: "Assignment name and description are required.".to_string(),
        });
    }
    if question_ids.is_empty() {
        return Ok(Outcome::AssignmentCreated {
            success: false,
            message: "At least one question is required.".to_string(),
        });
    }

    let assignment = service.create_assignment(name, description, &question_ids).await?;

    Ok(Outcome::AssignmentCreated {
        success: true,
        message: format!("Assignment '{}' created successfully!", assignment.name),
    })
}

pub(crate) async fn create_class(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let class_name = str_param(params, "class_name");
    let enter_code = str_param(params, "enter_code");

    if class_name.is_empty() {
        return Ok(Outcome::ClassCreated {
            success: false,
            message: "Class name is required.".to_string(),
        });
    }
    if enter_code.is_empty() {
        return Ok(Outcome::ClassCreated {
            success: false,
            message: "Enter code is required.".to_string(),
        });
    }

    let class = service.create_class(class_name, enter_code).await?;

    Ok(Outcome::ClassCreated {
        success: true,
        message: format!("Class '{}' created successfully!", class.name),
    })
}

/// Sub-question form data for `create_question`, as passed in the
/// parameter map. Concept and process arrive as display labels.
#[derive(Debug, Clone, Deserialize)]
struct SubQuestionDraft {
    description: String,
    answer: String,
    concept: String,
    process: String,
    #[serde(default)]
    keywords: Vec<String>,
    options: Option<Vec<String>>,
    image_path: Option<String>,
    image_description: Option<String>,
}

/// Creates a question: all attached images are uploaded and registered
/// first, so every image reference resolves to an id before the single
/// create call. Any upload failure aborts the whole operation, leaving
/// no partially created entity.
pub(crate) async fn create_question(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let name = str_param(params, "name");
    let source = str_param(params, "source");
    let drafts: Vec<SubQuestionDraft> = params
        .get("sub_questions_data")
        .map(|value| serde_json::from_value(value.clone()))
        .transpose()
        .map_err(|err| OperationFailure::new(format!("Invalid sub-question data: {err}")))?
        .unwrap_or_default();

    if name.is_empty() || drafts.is_empty() {
        return Ok(Outcome::QuestionCreated {
            success: false,
            message: "Question name and sub-questions are required.".to_string(),
        });
    }

    let mut path_to_id: HashMap<String, i64> = HashMap::new();
    for draft in &drafts {
        let Some(image_path) = draft.image_path.as_deref() else { continue };
        let data = tokio::fs::read(image_path)
            .await
            .map_err(|err| OperationFailure::new(format!("Failed to read '{image_path}': {err}")))?;
        let content_type =
            if image_path.ends_with(".png") { "image/png" } else { "image/jpeg" };
        let hash = service.upload_image(data, content_type).await?;
        let image_id = service
            .add_image(&hash, draft.image_description.as_deref().unwrap_or(""))
            .await?;
        path_to_id.insert(image_path.to_string(), image_id);
    }

    let mut sub_questions = Vec::with_capacity(drafts.len());
    for draft in &drafts {
        let concept = ConceptType::from_name(&text::text_to_enum_name(&draft.concept))
            .ok_or_else(|| OperationFailure::new(format!("Unknown concept: {}", draft.concept)))?;
        let process = ProcessType::from_name(&text::text_to_enum_name(&draft.process))
            .ok_or_else(|| OperationFailure::new(format!("Unknown process: {}", draft.process)))?;
        sub_questions.push(NewSubQuestion {
            description: draft.description.clone(),
            answer: draft.answer.clone(),
            concept,
            process,
            keywords: draft.keywords.clone(),
            options: draft.options.clone(),
            image_id: draft.image_path.as_ref().and_then(|path| path_to_id.get(path).copied()),
        });
    }

    let sub_question_count = sub_questions.len();
    let question =
        NewQuestion { name: name.to_string(), source: source.to_string(), sub_questions };
    service.add_question(&question).await?;

    Ok(Outcome::QuestionCreated {
        success: true,
        message: format!(
            "Question '{name}' created successfully with {sub_question_count} sub-questions!"
        ),
    })
}

/// Loads the whole-class review of one assignment, with per-sub-question
/// response statistics attached so the view renders thresholds directly.
pub(crate) async fn load_class_assignment_review(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let class_id = require_i64(params, "class_id")?;
    let assignment_id = require_i64(params, "assignment_id")?;

    let records = service.get_assignment_review_data(class_id, assignment_id).await?;

    let total_students = records
        .questions
        .first()
        .and_then(|question| question.sub_questions.first())
        .map(|sub_question| sub_question.student_performances.len())
        .unwrap_or(0);

    let mut questions = Vec::with_capacity(records.questions.len());
    for question in &records.questions {
        let mut sub_views = Vec::with_capacity(question.sub_questions.len());
        for sub_question in &question.sub_questions {
            let kind = SubQuestionKind::from_options(sub_question.options.as_ref());
            let performances: Vec<_> = sub_question
                .student_performances
                .iter()
                .map(|record| record.performance)
                .collect();

            let student_performances = sub_question
                .student_performances
                .iter()
                .map(|record| StudentPerformanceView {
                    user: record.user.clone(),
                    answer: record.answer.as_ref().map(|answer| {
                        if kind == SubQuestionKind::MultipleChoice {
                            answer.replace(text::OPTION_DELIMITER, ", ")
                        } else {
                            answer.clone()
                        }
                    }),
                    performance: record.performance,
                    feedback: record.feedback.clone(),
                    date: record.date,
                })
                .collect();

            sub_views.push(ReviewSubQuestionView {
                id: sub_question.id,
                kind,
                text: sub_question.description.clone(),
                answer: sub_question.answer.clone(),
                options: sub_question.options.clone(),
                image: fetch_optional_image(service, sub_question.image_id).await?,
                statistics: sub_question_statistics(&performances),
                student_performances,
            });
        }
        questions.push(ReviewQuestionView {
            title: question.name.clone(),
            attribution: text::attribution(&question.source),
            sub_questions: sub_views,
        });
    }

    Ok(Outcome::ClassAssignmentReviewLoaded(ClassAssignmentReview {
        title: records.title,
        class_id,
        assignment_id,
        total_students,
        questions,
    }))
}

pub(crate) async fn remove_student_from_class(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let Some(student_id) = i64_param(params, "student_id") else {
        return Ok(Outcome::StudentRemovedFromClass {
            success: false,
            message: "Student id is required.".to_string(),
        });
    };

    service.kick_student(student_id).await?;

    Ok(Outcome::StudentRemovedFromClass {
        success: true,
        message: "Student removed from class".to_string(),
    })
}

pub(crate) async fn load_assignment_questions(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let assignment_id = require_i64(params, "assignment_id")?;

    let assignments = service.get_assignments().await?;
    let Some(assignment) = assignments.into_iter().find(|a| a.id == assignment_id) else {
        return Err(OperationFailure::new("Assignment not found"));
    };

    let questions = service.get_questions(&assignment.question_ids).await?;
    let mut views = Vec::with_capacity(questions.len());
    for question in &questions {
        views.push(teacher_question_view(service, question, false).await?);
    }

    Ok(Outcome::AssignmentQuestionsDataLoaded(AssignmentQuestionsData {
        title: assignment.name,
        description: assignment.description,
        questions: views,
    }))
}

pub(crate) async fn assign_assignment_to_class(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let assignment_id = require_i64(params, "assignment_id")?;
    let class_id = require_i64(params, "class_id")?;
    let due_date = str_param(params, "due_date")
        .parse::<DateTime<Utc>>()
        .map_err(|_| OperationFailure::new("Invalid due date"))?;

    service.assign_assignment(assignment_id, class_id, due_date).await?;

    Ok(Outcome::AssignmentAssigned {
        success: true,
        message: "Assignment successfully assigned".to_string(),
    })
}

pub(crate) async fn load_filtered_questions(
    service: &dyn ApiService,
    params: &Params,
) -> Result<Outcome, OperationFailure> {
    let search_text = str_param(params, "search_text").to_lowercase();
    let concept_filter = str_param(params, "concept_filter");
    let process_filter = str_param(params, "process_filter");

    let concept = if concept_filter.is_empty() || concept_filter == "All Concepts" {
        None
    } else {
        Some(
            ConceptType::from_name(&text::text_to_enum_name(concept_filter)).ok_or_else(|| {
                OperationFailure::new(format!("Unknown concept filter: {concept_filter}"))
            })?,
        )
    };
    let process = if process_filter.is_empty() || process_filter == "All Processes" {
        None
    } else {
        Some(
            ProcessType::from_name(&text::text_to_enum_name(process_filter)).ok_or_else(|| {
                OperationFailure::new(format!("Unknown process filter: {process_filter}"))
            })?,
        )
    };

    let questions = service.search_questions(&search_text, concept, process).await?;
    let mut views = Vec::with_capacity(questions.len());
    for question in &questions {
        views.push(teacher_question_view(service, question, true).await?);
    }

    Ok(Outcome::FilteredQuestionsLoaded(views))
}

async fn teacher_question_view(
    service: &dyn ApiService,
    question: &crate::models::Question,
    with_tags: bool,
) -> Result<TeacherQuestionView, OperationFailure> {
    let mut sub_views = Vec::with_capacity(question.sub_questions.len());
    for sub_question in &question.sub_questions {
        let tags = if with_tags {
            vec![
                Tag { label: sub_question.concept.label(), kind: TagKind::Concept },
                Tag { label: sub_question.process.label(), kind: TagKind::Process },
            ]
        } else {
            Vec::new()
        };
        sub_views.push(TeacherSubQuestionView {
            id: sub_question.id,
            kind: SubQuestionKind::from_options(sub_question.options.as_ref()),
            text: sub_question.description.clone(),
            answer: sub_question.answer.clone(),
            options: sub_question.options.clone(),
            image: fetch_optional_image(service, sub_question.image_id).await?,
            tags,
        });
    }
    Ok(TeacherQuestionView {
        id: question.id,
        title: question.name.clone(),
        attribution: text::attribution(&question.source),
        sub_questions: sub_views,
    })
}
