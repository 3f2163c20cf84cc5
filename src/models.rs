use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::text::enum_name_to_text;

/// The seven numeracy content areas. Ordinal values are the row indices
/// of the performance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptType {
    OperationsOnNumbers,
    MathematicalRelationships,
    SpatialPropertiesAndRepresentations,
    LocationAndNavigation,
    Measurement,
    StatisticsAndData,
    ElementsOfChance,
}

pub const CONCEPT_COUNT: usize = 7;

impl ConceptType {
    pub const ALL: [ConceptType; CONCEPT_COUNT] = [
        ConceptType::OperationsOnNumbers,
        ConceptType::MathematicalRelationships,
        ConceptType::SpatialPropertiesAndRepresentations,
        ConceptType::LocationAndNavigation,
        ConceptType::Measurement,
        ConceptType::StatisticsAndData,
        ConceptType::ElementsOfChance,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ConceptType::OperationsOnNumbers => "OPERATIONS_ON_NUMBERS",
            ConceptType::MathematicalRelationships => "MATHEMATICAL_RELATIONSHIPS",
            ConceptType::SpatialPropertiesAndRepresentations => {
                "SPATIAL_PROPERTIES_AND_REPRESENTATIONS"
            }
            ConceptType::LocationAndNavigation => "LOCATION_AND_NAVIGATION",
            ConceptType::Measurement => "MEASUREMENT",
            ConceptType::StatisticsAndData => "STATISTICS_AND_DATA",
            ConceptType::ElementsOfChance => "ELEMENTS_OF_CHANCE",
        }
    }

    /// Display label, e.g. "Operations on numbers".
    pub fn label(self) -> String {
        enum_name_to_text(self.name())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|concept| concept.name() == name)
    }
}

/// The three cognitive processes. Ordinal values are the column indices
/// of the performance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    Apply,
    Formulate,
    Explain,
}

pub const PROCESS_COUNT: usize = 3;

impl ProcessType {
    pub const ALL: [ProcessType; PROCESS_COUNT] =
        [ProcessType::Apply, ProcessType::Formulate, ProcessType::Explain];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ProcessType::Apply => "APPLY",
            ProcessType::Formulate => "FORMULATE",
            ProcessType::Explain => "EXPLAIN",
        }
    }

    pub fn label(self) -> String {
        enum_name_to_text(self.name())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|process| process.name() == name)
    }
}

/// Evaluation level of a single submission, and the scale the grade
/// letters are derived from. Values run 0..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    NotStarted,
    Attempted,
    Familiar,
    Proficient,
    Mastered,
}

impl PerformanceLevel {
    pub const ALL: [PerformanceLevel; 5] = [
        PerformanceLevel::NotStarted,
        PerformanceLevel::Attempted,
        PerformanceLevel::Familiar,
        PerformanceLevel::Proficient,
        PerformanceLevel::Mastered,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            PerformanceLevel::NotStarted => "NOT_STARTED",
            PerformanceLevel::Attempted => "ATTEMPTED",
            PerformanceLevel::Familiar => "FAMILIAR",
            PerformanceLevel::Proficient => "PROFICIENT",
            PerformanceLevel::Mastered => "MASTERED",
        }
    }

    /// Display label, e.g. "Not started".
    pub fn label(self) -> String {
        enum_name_to_text(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Student,
    Teacher,
}

impl Permission {
    /// Maps the role string shown in the sign-up form to a permission.
    pub fn from_role(role: &str) -> Option<Self> {
        match role {
            "Student" => Some(Permission::Student),
            "Teacher" => Some(Permission::Teacher),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub email: String,
    pub permission: Permission,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub question_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuestion {
    pub id: i64,
    pub description: String,
    pub answer: Option<String>,
    pub concept: ConceptType,
    pub process: ProcessType,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub options: Option<Vec<String>>,
    pub image_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub is_audited: bool,
    pub sub_questions: Vec<SubQuestion>,
}

/// Payload for registering a new question together with its
/// sub-questions. Image ids must already be resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    pub name: String,
    pub source: String,
    pub sub_questions: Vec<NewSubQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubQuestion {
    pub description: String,
    pub answer: String,
    pub concept: ConceptType,
    pub process: ProcessType,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub options: Option<Vec<String>>,
    pub image_id: Option<i64>,
}

/// A stored submission for one sub-question, as returned for review and
/// history listings. Keyed by the sub-question id when merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedSubQuestion {
    pub id: i64,
    pub description: String,
    pub options: Option<Vec<String>>,
    pub image_id: Option<i64>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub concept: ConceptType,
    pub process: ProcessType,
    pub submitted_answer: String,
    pub performance: PerformanceLevel,
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedQuestion {
    pub id: i64,
    pub name: String,
    pub source: String,
    pub sub_questions: Vec<CompletedSubQuestion>,
}

/// Per-concept scores for each of the three processes, in [0, 4].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessPerformances {
    pub apply: f64,
    pub formulate: f64,
    pub explain: f64,
}

impl ProcessPerformances {
    pub fn get(&self, process: ProcessType) -> f64 {
        match process {
            ProcessType::Apply => self.apply,
            ProcessType::Formulate => self.formulate,
            ProcessType::Explain => self.explain,
        }
    }
}

/// One `ProcessPerformances` per concept row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptPerformances {
    pub operations_on_numbers: ProcessPerformances,
    pub mathematical_relationships: ProcessPerformances,
    pub spatial_properties_and_representations: ProcessPerformances,
    pub location_and_navigation: ProcessPerformances,
    pub measurement: ProcessPerformances,
    pub statistics_and_data: ProcessPerformances,
    pub elements_of_chance: ProcessPerformances,
}

impl ConceptPerformances {
    pub fn get(&self, concept: ConceptType) -> &ProcessPerformances {
        match concept {
            ConceptType::OperationsOnNumbers => &self.operations_on_numbers,
            ConceptType::MathematicalRelationships => &self.mathematical_relationships,
            ConceptType::SpatialPropertiesAndRepresentations => {
                &self.spatial_properties_and_representations
            }
            ConceptType::LocationAndNavigation => &self.location_and_navigation,
            ConceptType::Measurement => &self.measurement,
            ConceptType::StatisticsAndData => &self.statistics_and_data,
            ConceptType::ElementsOfChance => &self.elements_of_chance,
        }
    }
}

/// Student overview returned by the service: upcoming work plus the
/// accumulated performance scores the dashboard aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overview {
    pub class_name: String,
    pub display_name: String,
    pub total_question_number: i64,
    pub assignments: Vec<Assignment>,
    pub performances: ConceptPerformances,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherClassSummary {
    pub class_id: i64,
    pub name: String,
    pub student_number: i64,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherOverview {
    pub classes: Vec<TeacherClassSummary>,
    pub assignments: Vec<Assignment>,
    pub students: Vec<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassData {
    pub name: String,
    pub enter_code: String,
    pub students: Vec<User>,
    pub assignments: Vec<Assignment>,
    pub performances: ConceptPerformances,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: i64,
    pub name: String,
    pub enter_code: String,
}

/// One student's record against one sub-question in a class review.
/// `performance` is absent for students who have not answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentPerformance {
    pub user: User,
    pub answer: Option<String>,
    pub performance: Option<PerformanceLevel>,
    pub feedback: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSubQuestion {
    pub id: i64,
    pub description: String,
    pub answer: Option<String>,
    pub options: Option<Vec<String>>,
    pub image_id: Option<i64>,
    pub student_performances: Vec<StudentPerformance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewQuestion {
    pub name: String,
    pub source: String,
    pub sub_questions: Vec<ReviewSubQuestion>,
}

/// Raw review records for one assignment in one class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentReviewRecords {
    pub title: String,
    pub questions: Vec<ReviewQuestion>,
}

/// Dated average scores for one student, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceDateData {
    pub dates: Vec<DateTime<Utc>>,
    pub performances: Vec<f64>,
}

/// Instant feedback for a submitted sub-question answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionFeedback {
    pub comment: String,
    pub performance: PerformanceLevel,
}

/// A single turn in the hint conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_ordinals_match_matrix_rows() {
        for (row, concept) in ConceptType::ALL.into_iter().enumerate() {
            assert_eq!(concept.index(), row);
        }
        assert_eq!(ConceptType::ALL.len(), CONCEPT_COUNT);
    }

    #[test]
    fn test_process_ordinals_match_matrix_columns() {
        assert_eq!(ProcessType::Apply.index(), 0);
        assert_eq!(ProcessType::Formulate.index(), 1);
        assert_eq!(ProcessType::Explain.index(), 2);
    }

    #[test]
    fn test_concept_name_round_trip() {
        for concept in ConceptType::ALL {
            assert_eq!(ConceptType::from_name(concept.name()), Some(concept));
        }
        assert_eq!(ConceptType::from_name("NOT_A_CONCEPT"), None);
    }

    #[test]
    fn test_performance_level_values() {
        assert_eq!(PerformanceLevel::NotStarted.value(), 0);
        assert_eq!(PerformanceLevel::Mastered.value(), 4);
        assert_eq!(PerformanceLevel::from_value(2), Some(PerformanceLevel::Familiar));
        assert_eq!(PerformanceLevel::from_value(5), None);
    }

    #[test]
    fn test_performance_level_labels() {
        assert_eq!(PerformanceLevel::NotStarted.label(), "Not started");
        assert_eq!(PerformanceLevel::Mastered.label(), "Mastered");
    }

    #[test]
    fn test_permission_from_role() {
        assert_eq!(Permission::from_role("Student"), Some(Permission::Student));
        assert_eq!(Permission::from_role("Teacher"), Some(Permission::Teacher));
        assert_eq!(Permission::from_role("Admin"), None);
    }

    #[test]
    fn test_concept_performances_lookup() {
        let mut performances = ConceptPerformances::default();
        performances.measurement.apply = 3.0;

        assert_eq!(performances.get(ConceptType::Measurement).apply, 3.0);
        assert_eq!(performances.get(ConceptType::ElementsOfChance).apply, 0.0);
    }
}
