use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use numeracy_client::errors::ServiceError;
use numeracy_client::models::{
    Assignment, AssignmentReviewRecords, ClassData, ClassInfo, CompletedQuestion,
    CompletedSubQuestion, ConceptPerformances, ConceptType, LlmMessage, NewQuestion, Overview,
    PerformanceDateData, PerformanceLevel, Permission, ProcessPerformances, ProcessType, Question,
    ReviewQuestion, ReviewSubQuestion, StudentPerformance, SubQuestion, SubmissionFeedback,
    TeacherOverview, User,
};
use numeracy_client::outcomes::{outcome_channel, Outcome};
use numeracy_client::service::{ApiService, Registration};
use numeracy_client::view_models::{SubQuestionKind, UserAnswer};
use numeracy_client::worker::{op, ApiWorker, Params};

/// Configurable facade stub. Unconfigured calls resolve to an Unknown
/// error; every call is recorded by method name.
#[derive(Default)]
struct StubService {
    calls: Mutex<Vec<String>>,
    overview: Option<Result<Overview, ServiceError>>,
    overview_delay_ms: u64,
    assignments: Vec<Assignment>,
    questions: Vec<Question>,
    completed_sub_questions: Vec<CompletedSubQuestion>,
    review_records: Option<AssignmentReviewRecords>,
    login_result: Option<Result<(), ServiceError>>,
    current_user: Option<User>,
    join_class_result: Option<Result<(), ServiceError>>,
}

impl StubService {
    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ApiService for StubService {
    async fn login(&self, _username: &str, _password: &str) -> Result<(), ServiceError> {
        self.record("login");
        self.login_result.clone().unwrap_or(Ok(()))
    }

    async fn current_user(&self) -> Result<User, ServiceError> {
        self.record("current_user");
        self.current_user
            .clone()
            .ok_or_else(|| ServiceError::Unknown("not stubbed".to_string()))
    }

    async fn register(&self, _registration: &Registration) -> Result<(), ServiceError> {
        self.record("register");
        Ok(())
    }

    async fn get_overview(&self) -> Result<Overview, ServiceError> {
        self.record("get_overview");
        if self.overview_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.overview_delay_ms)).await;
        }
        self.overview
            .clone()
            .unwrap_or_else(|| Err(ServiceError::Unknown("not stubbed".to_string())))
    }

    async fn get_teacher_overview(&self) -> Result<TeacherOverview, ServiceError> {
        self.record("get_teacher_overview");
        Err(ServiceError::Unknown("not stubbed".to_string()))
    }

    async fn get_class_data(&self, _class_id: Option<i64>) -> Result<ClassData, ServiceError> {
        self.record("get_class_data");
        Err(ServiceError::Unknown("not stubbed".to_string()))
    }

    async fn get_assignments(&self) -> Result<Vec<Assignment>, ServiceError> {
        self.record("get_assignments");
        Ok(self.assignments.clone())
    }

    async fn get_questions(&self, question_ids: &[i64]) -> Result<Vec<Question>, ServiceError> {
        self.record("get_questions");
        Ok(self
            .questions
            .iter()
            .filter(|question| question_ids.contains(&question.id))
            .cloned()
            .collect())
    }

    async fn search_questions(
        &self,
        _keyword: &str,
        _concept: Option<ConceptType>,
        _process: Option<ProcessType>,
    ) -> Result<Vec<Question>, ServiceError> {
        self.record("search_questions");
        Ok(self.questions.clone())
    }

    async fn get_image(&self, _image_id: i64) -> Result<Vec<u8>, ServiceError> {
        self.record("get_image");
        Ok(vec![0xAB, 0xCD])
    }

    async fn get_assignment_image(&self, _assignment_id: i64) -> Result<Vec<u8>, ServiceError> {
        self.record("get_assignment_image");
        Ok(vec![0x01])
    }

    async fn get_completed_sub_questions(
        &self,
        _assignment_id: i64,
    ) -> Result<Vec<CompletedSubQuestion>, ServiceError> {
        self.record("get_completed_sub_questions");
        Ok(self.completed_sub_questions.clone())
    }

    async fn get_completed_question(
        &self,
        _question_id: i64,
    ) -> Result<CompletedQuestion, ServiceError> {
        self.record("get_completed_question");
        Err(ServiceError::Unknown("not stubbed".to_string()))
    }

    async fn get_completed_questions(&self) -> Result<Vec<CompletedQuestion>, ServiceError> {
        self.record("get_completed_questions");
        Ok(Vec::new())
    }

    async fn get_assignment_review_data(
        &self,
        _class_id: i64,
        _assignment_id: i64,
    ) -> Result<AssignmentReviewRecords, ServiceError> {
        self.record("get_assignment_review_data");
        self.review_records
            .clone()
            .ok_or_else(|| ServiceError::Unknown("not stubbed".to_string()))
    }

    async fn get_performance_date_data(
        &self,
        _user_id: i64,
        _since: DateTime<Utc>,
    ) -> Result<PerformanceDateData, ServiceError> {
        self.record("get_performance_date_data");
        Ok(PerformanceDateData { dates: Vec::new(), performances: Vec::new() })
    }

    async fn get_recent_average_performances(
        &self,
        _user_id: i64,
        _since: DateTime<Utc>,
    ) -> Result<ConceptPerformances, ServiceError> {
        self.record("get_recent_average_performances");
        Ok(ConceptPerformances::default())
    }

    async fn get_average_performances(
        &self,
        _user_id: i64,
    ) -> Result<ConceptPerformances, ServiceError> {
        self.record("get_average_performances");
        Ok(ConceptPerformances::default())
    }

    async fn submit_sub_question(
        &self,
        _assignment_id: i64,
        _sub_question_id: i64,
        answer: &str,
    ) -> Result<SubmissionFeedback, ServiceError> {
        self.record(&format!("submit_sub_question:{answer}"));
        Ok(SubmissionFeedback {
            comment: "Nice work".to_string(),
            performance: PerformanceLevel::Proficient,
        })
    }

    async fn create_assignment(
        &self,
        name: &str,
        _description: &str,
        _question_ids: &[i64],
    ) -> Result<Assignment, ServiceError> {
        self.record("create_assignment");
        Ok(sample_assignment(99, name))
    }

    async fn create_class(
        &self,
        class_name: &str,
        enter_code: &str,
    ) -> Result<ClassInfo, ServiceError> {
        self.record("create_class");
        Ok(ClassInfo {
            id: 1,
            name: class_name.to_string(),
            enter_code: enter_code.to_string(),
        })
    }

    async fn add_question(&self, _question: &NewQuestion) -> Result<(), ServiceError> {
        self.record("add_question");
        Ok(())
    }

    async fn upload_image(
        &self,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, ServiceError> {
        self.record("upload_image");
        Ok("hash".to_string())
    }

    async fn add_image(&self, _hash: &str, _description: &str) -> Result<i64, ServiceError> {
        self.record("add_image");
        Ok(7)
    }

    async fn join_class(&self, _class_name: &str, _enter_code: &str) -> Result<(), ServiceError> {
        self.record("join_class");
        self.join_class_result.clone().unwrap_or(Ok(()))
    }

    async fn assign_assignment(
        &self,
        _assignment_id: i64,
        _class_id: i64,
        _due_date: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        self.record("assign_assignment");
        Ok(())
    }

    async fn kick_student(&self, _student_id: i64) -> Result<(), ServiceError> {
        self.record("kick_student");
        Ok(())
    }

    async fn get_hint(
        &self,
        _sub_question_id: i64,
        _message: &str,
        _history: &[LlmMessage],
    ) -> Result<String, ServiceError> {
        self.record("get_hint");
        Ok("Try smaller numbers first.".to_string())
    }
}

fn build_worker(
    stub: StubService,
) -> (ApiWorker, tokio::sync::mpsc::UnboundedReceiver<Outcome>, Arc<StubService>) {
    let service = Arc::new(stub);
    let (sender, rx) = outcome_channel();
    let worker = ApiWorker::new(Arc::clone(&service) as Arc<dyn ApiService>, sender);
    (worker, rx, service)
}

fn params(value: serde_json::Value) -> Params {
    value.as_object().expect("params must be an object").clone()
}

fn sample_user(id: i64) -> User {
    User {
        id,
        name: format!("user{id}"),
        display_name: format!("Student {id}"),
        email: format!("user{id}@school.nz"),
        permission: Permission::Student,
    }
}

fn sample_assignment(id: i64, name: &str) -> Assignment {
    Assignment {
        id,
        name: name.to_string(),
        description: "Fractions practice".to_string(),
        due_date: Utc.with_ymd_and_hms(2026, 3, 14, 4, 30, 0).unwrap(),
        question_ids: vec![10],
    }
}

fn sample_sub_question(id: i64, options: Option<Vec<String>>) -> SubQuestion {
    SubQuestion {
        id,
        description: format!("sub question {id}"),
        answer: Some("42".to_string()),
        concept: ConceptType::OperationsOnNumbers,
        process: ProcessType::Apply,
        keywords: Vec::new(),
        options,
        image_id: None,
    }
}

fn sample_submission(id: i64, answer: &str) -> CompletedSubQuestion {
    CompletedSubQuestion {
        id,
        description: format!("sub question {id}"),
        options: None,
        image_id: None,
        keywords: Vec::new(),
        concept: ConceptType::OperationsOnNumbers,
        process: ProcessType::Apply,
        submitted_answer: answer.to_string(),
        performance: PerformanceLevel::Proficient,
        feedback: "Good working.".to_string(),
    }
}

fn uniform_performances(score: f64) -> ConceptPerformances {
    let row = ProcessPerformances { apply: score, formulate: score, explain: score };
    ConceptPerformances {
        operations_on_numbers: row,
        mathematical_relationships: row,
        spatial_properties_and_representations: row,
        location_and_navigation: row,
        measurement: row,
        statistics_and_data: row,
        elements_of_chance: row,
    }
}

fn sample_overview(score: f64) -> Overview {
    Overview {
        class_name: "Room 5".to_string(),
        display_name: "Alex".to_string(),
        total_question_number: 12,
        assignments: vec![sample_assignment(1, "Week 3 homework")],
        performances: uniform_performances(score),
    }
}

#[tokio::test]
async fn test_outcomes_publish_in_dispatch_order() {
    let (mut worker, mut rx, _service) = build_worker(StubService {
        overview: Some(Ok(sample_overview(2.0))),
        overview_delay_ms: 50,
        ..Default::default()
    });

    worker.dispatch(op::LOAD_DASHBOARD_DATA, Params::new()).await;
    worker
        .dispatch(
            op::JOIN_CLASS,
            params(json!({ "class_name": "Room 5", "enter_code": "KIWI" })),
        )
        .await;
    worker.join().await;

    // The slow dashboard load still publishes before the join outcome.
    assert!(matches!(rx.recv().await, Some(Outcome::DashboardDataLoaded(_))));
    assert!(matches!(rx.recv().await, Some(Outcome::JoinClassFinished { success: true, .. })));
}

#[tokio::test]
async fn test_dashboard_not_found_is_recoverable() {
    let (mut worker, mut rx, _service) = build_worker(StubService {
        overview: Some(Err(ServiceError::NotFound("no class".to_string()))),
        ..Default::default()
    });

    worker.dispatch(op::LOAD_DASHBOARD_DATA, Params::new()).await;
    worker.join().await;

    match rx.recv().await {
        Some(Outcome::DashboardDataLoaded(data)) => {
            assert_eq!(data.class_name, None);
            assert!(data.stats.is_none());
            assert!(data.matrix.is_none());
            assert!(data.assignments.is_empty());
        }
        other => panic!("expected a dashboard payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dashboard_aggregates_matrix() {
    let (mut worker, mut rx, _service) = build_worker(StubService {
        overview: Some(Ok(sample_overview(2.0))),
        ..Default::default()
    });

    worker.dispatch(op::LOAD_DASHBOARD_DATA, Params::new()).await;
    worker.join().await;

    match rx.recv().await {
        Some(Outcome::DashboardDataLoaded(data)) => {
            assert_eq!(data.class_name.as_deref(), Some("Room 5"));
            assert_eq!(data.assignments.len(), 1);
            let stats = data.stats.expect("stats expected");
            assert_eq!(stats.total_questions_answered, 12);
            assert_eq!(stats.average_level, "Familiar");
            assert_eq!(stats.best_concept, "Operations on numbers");
            assert_eq!(stats.best_process, "Apply");
            assert_eq!(stats.grade, "Ⅲ");
            assert_eq!(stats.level_percent, 0);
            let matrix = data.matrix.expect("matrix expected");
            assert_eq!(matrix.get(ConceptType::Measurement, ProcessType::Explain), 2.0);
        }
        other => panic!("expected a dashboard payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_class_empty_params_makes_no_remote_call() {
    let (mut worker, mut rx, service) = build_worker(StubService::default());

    worker.dispatch(op::JOIN_CLASS, Params::new()).await;
    worker.join().await;

    match rx.recv().await {
        Some(Outcome::JoinClassFinished { success, message }) => {
            assert!(!success);
            assert_eq!(message, "Invalid class name or enter code.");
        }
        other => panic!("expected a join outcome, got {other:?}"),
    }
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn test_join_class_forbidden_means_already_enrolled() {
    let (mut worker, mut rx, _service) = build_worker(StubService {
        join_class_result: Some(Err(ServiceError::Forbidden("enrolled".to_string()))),
        ..Default::default()
    });

    worker
        .dispatch(
            op::JOIN_CLASS,
            params(json!({ "class_name": "Room 5", "enter_code": "KIWI" })),
        )
        .await;
    worker.join().await;

    match rx.recv().await {
        Some(Outcome::OperationFailed { operation, message }) => {
            assert_eq!(operation, op::JOIN_CLASS);
            assert_eq!(message, "You are already enrolled in this class.");
        }
        other => panic!("expected a failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_operation_is_a_failure() {
    let (mut worker, mut rx, service) = build_worker(StubService::default());

    worker.dispatch("load_assignments", Params::new()).await;
    worker.join().await;

    match rx.recv().await {
        Some(Outcome::OperationFailed { operation, message }) => {
            assert_eq!(operation, "load_assignments");
            assert!(message.contains("Unknown operation"));
        }
        other => panic!("expected a failure, got {other:?}"),
    }
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn test_start_without_setup_is_a_noop() {
    let (mut worker, mut rx, _service) = build_worker(StubService::default());

    worker.start();
    worker.join().await;

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_signin_unauthorized_is_recoverable() {
    let (mut worker, mut rx, _service) = build_worker(StubService {
        login_result: Some(Err(ServiceError::Unauthorized(
            "Incorrect username or password".to_string(),
        ))),
        ..Default::default()
    });

    worker
        .dispatch(op::SIGNIN, params(json!({ "username": "alex", "password": "wrong" })))
        .await;
    worker.join().await;

    match rx.recv().await {
        Some(Outcome::SignInFinished { success, message, user }) => {
            assert!(!success);
            assert_eq!(message, "Incorrect username or password");
            assert!(user.is_none());
        }
        other => panic!("expected a sign-in outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn test_assignment_data_merges_submissions() {
    let question = Question {
        id: 10,
        name: "Fractions".to_string(),
        source: "nzqa".to_string(),
        is_audited: true,
        sub_questions: vec![
            sample_sub_question(1, None),
            sample_sub_question(2, Some(vec!["A".to_string(), "B".to_string()])),
        ],
    };
    let stub = StubService {
        assignments: vec![sample_assignment(5, "Week 3 homework")],
        questions: vec![question],
        completed_sub_questions: vec![sample_submission(2, "A<OPTION>B")],
        ..Default::default()
    };
    let (mut worker, mut rx, _service) = build_worker(stub);

    worker
        .dispatch(op::LOAD_ASSIGNMENT_DATA, params(json!({ "assignment_id": 5 })))
        .await;
    worker.join().await;

    match rx.recv().await {
        Some(Outcome::QuestionAnsweringDataLoaded(data)) => {
            assert_eq!(data.id, 5);
            assert_eq!(data.questions.len(), 1);
            let subs = &data.questions[0].sub_questions;
            assert_eq!(subs.len(), 2);

            assert!(!subs[0].is_submitted);
            assert_eq!(subs[0].kind, SubQuestionKind::Text);
            assert!(subs[0].user_answer.is_none());

            assert!(subs[1].is_submitted);
            assert_eq!(subs[1].kind, SubQuestionKind::MultipleChoice);
            // The answering view keeps the stored string form.
            assert_eq!(subs[1].user_answer, Some(UserAnswer::Text("A<OPTION>B".to_string())));
            assert_eq!(subs[1].performance.as_deref(), Some("Proficient"));
        }
        other => panic!("expected answering data, got {other:?}"),
    }
}

#[tokio::test]
async fn test_assignment_review_splits_multi_select_answers() {
    let question = Question {
        id: 10,
        name: "Fractions".to_string(),
        source: "nzqa".to_string(),
        is_audited: true,
        sub_questions: vec![sample_sub_question(2, Some(vec!["A".to_string(), "B".to_string()]))],
    };
    let stub = StubService {
        assignments: vec![sample_assignment(5, "Week 3 homework")],
        questions: vec![question],
        completed_sub_questions: vec![sample_submission(2, "A<OPTION>B")],
        ..Default::default()
    };
    let (mut worker, mut rx, _service) = build_worker(stub);

    worker
        .dispatch(op::LOAD_ASSIGNMENT_REVIEW_DATA, params(json!({ "assignment_id": 5 })))
        .await;
    worker.join().await;

    match rx.recv().await {
        Some(Outcome::AssignmentReviewDataLoaded(data)) => {
            assert_eq!(data.id, Some(5));
            let sub = &data.questions[0].sub_questions[0];
            assert_eq!(
                sub.user_answer,
                Some(UserAnswer::Selected(vec!["A".to_string(), "B".to_string()]))
            );
        }
        other => panic!("expected review data, got {other:?}"),
    }
}

#[tokio::test]
async fn test_assignment_review_missing_assignment_is_recoverable() {
    let (mut worker, mut rx, _service) = build_worker(StubService::default());

    worker
        .dispatch(op::LOAD_ASSIGNMENT_REVIEW_DATA, params(json!({ "assignment_id": 404 })))
        .await;
    worker.join().await;

    match rx.recv().await {
        Some(Outcome::AssignmentReviewDataLoaded(data)) => {
            assert_eq!(data.id, None);
            assert!(data.questions.is_empty());
        }
        other => panic!("expected review data, got {other:?}"),
    }
}

#[tokio::test]
async fn test_class_assignment_review_statistics() {
    // 10 students; 7 answered with scores summing to 21.
    let mut student_performances: Vec<StudentPerformance> = [
        PerformanceLevel::Mastered,
        PerformanceLevel::Mastered,
        PerformanceLevel::Mastered,
        PerformanceLevel::Proficient,
        PerformanceLevel::Proficient,
        PerformanceLevel::Familiar,
        PerformanceLevel::Attempted,
    ]
    .into_iter()
    .enumerate()
    .map(|(index, level)| StudentPerformance {
        user: sample_user(index as i64 + 1),
        answer: Some("3/4".to_string()),
        performance: Some(level),
        feedback: Some("ok".to_string()),
        date: None,
    })
    .collect();
    for index in 8..=10 {
        student_performances.push(StudentPerformance {
            user: sample_user(index),
            answer: None,
            performance: None,
            feedback: None,
            date: None,
        });
    }

    let records = AssignmentReviewRecords {
        title: "Week 3 homework".to_string(),
        questions: vec![ReviewQuestion {
            name: "Fractions".to_string(),
            source: "nzqa".to_string(),
            sub_questions: vec![ReviewSubQuestion {
                id: 2,
                description: "Shade three quarters".to_string(),
                answer: Some("3/4".to_string()),
                options: None,
                image_id: None,
                student_performances,
            }],
        }],
    };
    let (mut worker, mut rx, _service) = build_worker(StubService {
        review_records: Some(records),
        ..Default::default()
    });

    worker
        .dispatch(
            op::LOAD_CLASS_ASSIGNMENT_REVIEW,
            params(json!({ "class_id": 3, "assignment_id": 5 })),
        )
        .await;
    worker.join().await;

    match rx.recv().await {
        Some(Outcome::ClassAssignmentReviewLoaded(review)) => {
            assert_eq!(review.total_students, 10);
            let stats = review.questions[0].sub_questions[0].statistics;
            assert_eq!(stats.students_answered, 7);
            assert!((stats.average_score - 3.0).abs() < 1e-9);
            assert!((stats.response_rate - 0.7).abs() < 1e-9);
        }
        other => panic!("expected a class review, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_assignment_validation_short_circuits() {
    let (mut worker, mut rx, service) = build_worker(StubService::default());

    worker
        .dispatch(op::CREATE_ASSIGNMENT, params(json!({ "name": "Only a name" })))
        .await;
    worker.join().await;

    match rx.recv().await {
        Some(Outcome::AssignmentCreated { success, message }) => {
            assert!(!success);
            assert_eq!(message, "Assignment name and description are required.");
        }
        other => panic!("expected a create outcome, got {other:?}"),
    }
    assert_eq!(service.call_count(), 0);

    worker
        .dispatch(
            op::CREATE_ASSIGNMENT,
            params(json!({ "name": "Week 4", "description": "Decimals" })),
        )
        .await;
    worker.join().await;

    match rx.recv().await {
        Some(Outcome::AssignmentCreated { success, message }) => {
            assert!(!success);
            assert_eq!(message, "At least one question is required.");
        }
        other => panic!("expected a create outcome, got {other:?}"),
    }
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn test_submit_sub_question_joins_multi_select() {
    let (mut worker, mut rx, service) = build_worker(StubService::default());

    worker
        .dispatch(
            op::SUBMIT_SUB_QUESTION,
            params(json!({
                "assignment_id": 5,
                "sub_question_id": 2,
                "answer": ["A", "C"],
            })),
        )
        .await;
    worker.join().await;

    match rx.recv().await {
        Some(Outcome::SubQuestionFeedbackReceived { sub_question_id, feedback }) => {
            assert_eq!(sub_question_id, 2);
            assert_eq!(feedback.performance, "Proficient");
        }
        other => panic!("expected feedback, got {other:?}"),
    }
    let calls = service.calls.lock().unwrap().clone();
    assert_eq!(calls, vec!["submit_sub_question:A<OPTION>C".to_string()]);
}
