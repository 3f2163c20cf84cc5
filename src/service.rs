//! The remote-service boundary. Handlers depend on the [`ApiService`]
//! trait only; [`HttpApiService`] is the production implementation and
//! tests substitute stubs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::config::ApiConfig;
use crate::errors::ServiceError;
use crate::models::{
    Assignment, AssignmentReviewRecords, ClassData, ClassInfo, CompletedQuestion,
    CompletedSubQuestion, ConceptPerformances, ConceptType, LlmMessage, NewQuestion, Overview,
    PerformanceDateData, Permission, ProcessType, Question, SubmissionFeedback, TeacherOverview,
    User,
};

/// Sign-up form data forwarded to the service.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub permission: Permission,
}

/// Domain operations exposed by the remote service. Every method is a
/// single remote call and resolves to a classified [`ServiceError`] on
/// failure.
#[async_trait]
pub trait ApiService: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<(), ServiceError>;
    async fn current_user(&self) -> Result<User, ServiceError>;
    async fn register(&self, registration: &Registration) -> Result<(), ServiceError>;

    async fn get_overview(&self) -> Result<Overview, ServiceError>;
    async fn get_teacher_overview(&self) -> Result<TeacherOverview, ServiceError>;
    async fn get_class_data(&self, class_id: Option<i64>) -> Result<ClassData, ServiceError>;
    async fn get_assignments(&self) -> Result<Vec<Assignment>, ServiceError>;
    async fn get_questions(&self, question_ids: &[i64]) -> Result<Vec<Question>, ServiceError>;
    async fn search_questions(
        &self,
        keyword: &str,
        concept: Option<ConceptType>,
        process: Option<ProcessType>,
    ) -> Result<Vec<Question>, ServiceError>;
    async fn get_image(&self, image_id: i64) -> Result<Vec<u8>, ServiceError>;
    async fn get_assignment_image(&self, assignment_id: i64) -> Result<Vec<u8>, ServiceError>;
    async fn get_completed_sub_questions(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<CompletedSubQuestion>, ServiceError>;
    async fn get_completed_question(
        &self,
        question_id: i64,
    ) -> Result<CompletedQuestion, ServiceError>;
    async fn get_completed_questions(&self) -> Result<Vec<CompletedQuestion>, ServiceError>;
    async fn get_assignment_review_data(
        &self,
        class_id: i64,
        assignment_id: i64,
    ) -> Result<AssignmentReviewRecords, ServiceError>;
    async fn get_performance_date_data(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<PerformanceDateData, ServiceError>;
    async fn get_recent_average_performances(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<ConceptPerformances, ServiceError>;
    async fn get_average_performances(
        &self,
        user_id: i64,
    ) -> Result<ConceptPerformances, ServiceError>;

    async fn submit_sub_question(
        &self,
        assignment_id: i64,
        sub_question_id: i64,
        answer: &str,
    ) -> Result<SubmissionFeedback, ServiceError>;
    async fn create_assignment(
        &self,
        name: &str,
        description: &str,
        question_ids: &[i64],
    ) -> Result<Assignment, ServiceError>;
    async fn create_class(
        &self,
        class_name: &str,
        enter_code: &str,
    ) -> Result<ClassInfo, ServiceError>;
    async fn add_question(&self, question: &NewQuestion) -> Result<(), ServiceError>;
    /// Uploads raw image bytes; returns the content hash to register.
    async fn upload_image(&self, data: Vec<u8>, content_type: &str)
        -> Result<String, ServiceError>;
    /// Registers an uploaded image; returns its id.
    async fn add_image(&self, hash: &str, description: &str) -> Result<i64, ServiceError>;
    async fn join_class(&self, class_name: &str, enter_code: &str) -> Result<(), ServiceError>;
    async fn assign_assignment(
        &self,
        assignment_id: i64,
        class_id: i64,
        due_date: DateTime<Utc>,
    ) -> Result<(), ServiceError>;
    async fn kick_student(&self, student_id: i64) -> Result<(), ServiceError>;
    async fn get_hint(
        &self,
        sub_question_id: i64,
        message: &str,
        history: &[LlmMessage],
    ) -> Result<String, ServiceError>;
}

/// Resolves an optional image reference through the facade.
pub(crate) async fn fetch_optional_image(
    service: &dyn ApiService,
    image_id: Option<i64>,
) -> Result<Option<Vec<u8>>, ServiceError> {
    match image_id {
        Some(id) => Ok(Some(service.get_image(id).await?)),
        None => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// REST implementation of the service boundary. The bearer token is
/// captured by `login` and attached to every later request.
pub struct HttpApiService {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpApiService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token: RwLock::new(None),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token: RwLock::new(None),
        })
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "Sending service request");
        let mut builder = self.client.request(method, url);
        if let Some(token) = self.token.read().await.as_ref() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Classifies non-success responses, preferring the `detail` field
    /// of the error body as the message.
    async fn check(response: Response) -> Result<Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail);
        error!(status = %status, detail = ?detail, "Service request failed");
        Err(ServiceError::from_status(status, detail))
    }

    async fn receive_json<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
        Ok(Self::check(response).await?.json::<T>().await?)
    }

    async fn receive_bytes(response: Response) -> Result<Vec<u8>, ServiceError> {
        Ok(Self::check(response).await?.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ApiService for HttpApiService {
    async fn login(&self, username: &str, password: &str) -> Result<(), ServiceError> {
        let response = self
            .request(Method::POST, "/auth/login")
            .await
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = Self::receive_json(response).await?;
        *self.token.write().await = Some(token.access_token);
        Ok(())
    }

    async fn current_user(&self) -> Result<User, ServiceError> {
        let response = self.request(Method::GET, "/user/me").await.send().await?;
        Self::receive_json(response).await
    }

    async fn register(&self, registration: &Registration) -> Result<(), ServiceError> {
        let response = self
            .request(Method::POST, "/auth/register")
            .await
            .json(registration)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_overview(&self) -> Result<Overview, ServiceError> {
        let response = self
            .request(Method::GET, "/service/overview")
            .await
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn get_teacher_overview(&self) -> Result<TeacherOverview, ServiceError> {
        let response = self
            .request(Method::GET, "/service/teacher/overview")
            .await
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn get_class_data(&self, class_id: Option<i64>) -> Result<ClassData, ServiceError> {
        let mut builder = self.request(Method::GET, "/user/class").await;
        if let Some(id) = class_id {
            builder = builder.query(&[("class_id", id)]);
        }
        Self::receive_json(builder.send().await?).await
    }

    async fn get_assignments(&self) -> Result<Vec<Assignment>, ServiceError> {
        let response = self
            .request(Method::GET, "/user/assignments")
            .await
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn get_questions(&self, question_ids: &[i64]) -> Result<Vec<Question>, ServiceError> {
        let query: Vec<(&str, i64)> = question_ids.iter().map(|id| ("question_ids", *id)).collect();
        let response = self
            .request(Method::GET, "/bank/questions")
            .await
            .query(&query)
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn search_questions(
        &self,
        keyword: &str,
        concept: Option<ConceptType>,
        process: Option<ProcessType>,
    ) -> Result<Vec<Question>, ServiceError> {
        let mut query: Vec<(&str, String)> = vec![("keyword", keyword.to_string())];
        if let Some(concept) = concept {
            query.push(("concept", concept.name().to_lowercase()));
        }
        if let Some(process) = process {
            query.push(("process", process.name().to_lowercase()));
        }
        let response = self
            .request(Method::GET, "/bank/questions/search")
            .await
            .query(&query)
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn get_image(&self, image_id: i64) -> Result<Vec<u8>, ServiceError> {
        let response = self
            .request(Method::GET, &format!("/bank/images/{image_id}"))
            .await
            .send()
            .await?;
        Self::receive_bytes(response).await
    }

    async fn get_assignment_image(&self, assignment_id: i64) -> Result<Vec<u8>, ServiceError> {
        let response = self
            .request(Method::GET, &format!("/user/assignments/{assignment_id}/image"))
            .await
            .send()
            .await?;
        Self::receive_bytes(response).await
    }

    async fn get_completed_sub_questions(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<CompletedSubQuestion>, ServiceError> {
        let response = self
            .request(Method::GET, "/user/sub-questions/completed")
            .await
            .query(&[("assignment_id", assignment_id)])
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn get_completed_question(
        &self,
        question_id: i64,
    ) -> Result<CompletedQuestion, ServiceError> {
        let response = self
            .request(Method::GET, &format!("/user/questions/completed/{question_id}"))
            .await
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn get_completed_questions(&self) -> Result<Vec<CompletedQuestion>, ServiceError> {
        let response = self
            .request(Method::GET, "/user/questions/completed")
            .await
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn get_assignment_review_data(
        &self,
        class_id: i64,
        assignment_id: i64,
    ) -> Result<AssignmentReviewRecords, ServiceError> {
        let response = self
            .request(Method::GET, "/service/review")
            .await
            .query(&[("class_id", class_id), ("assignment_id", assignment_id)])
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn get_performance_date_data(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<PerformanceDateData, ServiceError> {
        let response = self
            .request(Method::GET, "/service/performance/dates")
            .await
            .query(&[("user_id", user_id.to_string()), ("start_time", since.to_rfc3339())])
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn get_recent_average_performances(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<ConceptPerformances, ServiceError> {
        let response = self
            .request(Method::GET, "/service/performance/recent")
            .await
            .query(&[("user_id", user_id.to_string()), ("start_time", since.to_rfc3339())])
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn get_average_performances(
        &self,
        user_id: i64,
    ) -> Result<ConceptPerformances, ServiceError> {
        let response = self
            .request(Method::GET, "/service/performance/average")
            .await
            .query(&[("user_id", user_id)])
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn submit_sub_question(
        &self,
        assignment_id: i64,
        sub_question_id: i64,
        answer: &str,
    ) -> Result<SubmissionFeedback, ServiceError> {
        let response = self
            .request(Method::POST, "/user/submit")
            .await
            .json(&json!({
                "assignment_id": assignment_id,
                "sub_question_id": sub_question_id,
                "answer": answer,
            }))
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn create_assignment(
        &self,
        name: &str,
        description: &str,
        question_ids: &[i64],
    ) -> Result<Assignment, ServiceError> {
        let response = self
            .request(Method::POST, "/user/assignments")
            .await
            .json(&json!({
                "assignment_name": name,
                "description": description,
                "question_ids": question_ids,
            }))
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn create_class(
        &self,
        class_name: &str,
        enter_code: &str,
    ) -> Result<ClassInfo, ServiceError> {
        let response = self
            .request(Method::POST, "/user/classes")
            .await
            .json(&json!({ "class_name": class_name, "enter_code": enter_code }))
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn add_question(&self, question: &NewQuestion) -> Result<(), ServiceError> {
        let response = self
            .request(Method::POST, "/bank/questions")
            .await
            .json(question)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn upload_image(
        &self,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ServiceError> {
        let response = self
            .request(Method::POST, "/bank/images/upload")
            .await
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn add_image(&self, hash: &str, description: &str) -> Result<i64, ServiceError> {
        let response = self
            .request(Method::POST, "/bank/images")
            .await
            .json(&json!({ "hash": hash, "description": description }))
            .send()
            .await?;
        Self::receive_json(response).await
    }

    async fn join_class(&self, class_name: &str, enter_code: &str) -> Result<(), ServiceError> {
        let response = self
            .request(Method::POST, "/user/class/join")
            .await
            .json(&json!({ "class_name": class_name, "enter_code": enter_code }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn assign_assignment(
        &self,
        assignment_id: i64,
        class_id: i64,
        due_date: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let response = self
            .request(Method::POST, "/user/assignments/assign")
            .await
            .json(&json!({
                "assignment_id": assignment_id,
                "class_id": class_id,
                "due_date": due_date.to_rfc3339(),
            }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn kick_student(&self, student_id: i64) -> Result<(), ServiceError> {
        let response = self
            .request(Method::DELETE, &format!("/user/class/students/{student_id}"))
            .await
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_hint(
        &self,
        sub_question_id: i64,
        message: &str,
        history: &[LlmMessage],
    ) -> Result<String, ServiceError> {
        let response = self
            .request(Method::POST, "/llm/hint")
            .await
            .json(&json!({
                "sub_question_id": sub_question_id,
                "message": message,
                "history": history,
            }))
            .send()
            .await?;
        Self::receive_json(response).await
    }
}
