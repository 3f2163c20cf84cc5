pub mod aggregation;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod outcomes;
pub mod service;
mod student_handlers;
mod teacher_handlers;
pub mod text;
pub mod view_models;
pub mod worker;

pub use aggregation::{aggregate, AggregatedStats, Grade, PerformanceMatrix};
pub use config::Config;
pub use errors::{OperationFailure, ServiceError};
pub use outcomes::{outcome_channel, Outcome, OutcomeSender};
pub use service::{ApiService, HttpApiService, Registration};
pub use worker::{op, ApiWorker, OperationKind, OperationRequest, Params};
