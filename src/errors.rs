use reqwest::StatusCode;

/// Classified remote-service failure. Every facade call resolves to one
/// of these categories; the carried string is the service-provided
/// detail message when one was present, or a generic description.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Unknown(String),
}

impl ServiceError {
    /// Classify an HTTP status together with the error body's detail
    /// message (when the service supplied one).
    pub fn from_status(status: StatusCode, detail: Option<String>) -> Self {
        let message = detail.unwrap_or_else(|| {
            status.canonical_reason().unwrap_or("request failed").to_string()
        });

        match status {
            StatusCode::BAD_REQUEST => ServiceError::BadRequest(message),
            StatusCode::UNAUTHORIZED => ServiceError::Unauthorized(message),
            StatusCode::FORBIDDEN => ServiceError::Forbidden(message),
            StatusCode::NOT_FOUND => ServiceError::NotFound(message),
            _ => ServiceError::Unknown(message),
        }
    }

    /// The user-facing detail message for this failure.
    pub fn detail(&self) -> &str {
        match self {
            ServiceError::BadRequest(message)
            | ServiceError::Unauthorized(message)
            | ServiceError::Forbidden(message)
            | ServiceError::NotFound(message)
            | ServiceError::Unknown(message) => message,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Unknown(err.to_string())
    }
}

/// Terminal failure of one dispatched operation. Published as
/// `Outcome::OperationFailed` together with the operation name so the
/// caller can route retries without matching message text.
#[derive(Debug, Clone)]
pub struct OperationFailure {
    pub message: String,
}

impl OperationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<ServiceError> for OperationFailure {
    fn from(err: ServiceError) -> Self {
        Self { message: err.detail().to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = ServiceError::from_status(StatusCode::BAD_REQUEST, None);
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let err = ServiceError::from_status(StatusCode::UNAUTHORIZED, None);
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let err = ServiceError::from_status(StatusCode::FORBIDDEN, None);
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = ServiceError::from_status(StatusCode::NOT_FOUND, None);
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = ServiceError::from_status(StatusCode::INTERNAL_SERVER_ERROR, None);
        assert!(matches!(err, ServiceError::Unknown(_)));
    }

    #[test]
    fn test_detail_prefers_service_message() {
        let err = ServiceError::from_status(
            StatusCode::NOT_FOUND,
            Some("User is not enrolled in any class".to_string()),
        );
        assert_eq!(err.detail(), "User is not enrolled in any class");
    }

    #[test]
    fn test_detail_falls_back_to_status_text() {
        let err = ServiceError::from_status(StatusCode::NOT_FOUND, None);
        assert_eq!(err.detail(), "Not Found");
    }

    #[test]
    fn test_operation_failure_carries_detail() {
        let err = ServiceError::Forbidden("Teacher permission required".to_string());
        let failure = OperationFailure::from(err);
        assert_eq!(failure.message, "Teacher permission required");
    }
}
