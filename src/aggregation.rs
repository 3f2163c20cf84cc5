//! Pure data-shaping primitives shared by the operation handlers:
//! performance-matrix aggregation for dashboards, submission merging for
//! review views, and per-sub-question response statistics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{
    CompletedSubQuestion, ConceptPerformances, ConceptType, PerformanceLevel, ProcessType,
    SubQuestion, CONCEPT_COUNT, PROCESS_COUNT,
};
use crate::text::split_answer;
use crate::view_models::{SubQuestionKind, SubQuestionView, UserAnswer};

/// 7x3 grid of scores in [0, 4]; rows are concepts, columns processes.
/// Every cell is populated (zero by default) before aggregation runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMatrix {
    cells: [[f64; PROCESS_COUNT]; CONCEPT_COUNT],
}

impl PerformanceMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_performances(performances: &ConceptPerformances) -> Self {
        let mut matrix = Self::new();
        for concept in ConceptType::ALL {
            for process in ProcessType::ALL {
                matrix.set(concept, process, performances.get(concept).get(process));
            }
        }
        matrix
    }

    pub fn get(&self, concept: ConceptType, process: ProcessType) -> f64 {
        self.cells[concept.index()][process.index()]
    }

    pub fn set(&mut self, concept: ConceptType, process: ProcessType, score: f64) {
        self.cells[concept.index()][process.index()] = score;
    }
}

/// Roman-numeral grade letters for the 0..=4 score scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    I,
    II,
    III,
    IV,
    V,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::I, Grade::II, Grade::III, Grade::IV, Grade::V];

    /// The grade for an average score in [0, 4]: the ceiling of the
    /// score indexes the letter table, so any fraction above a whole
    /// number already earns the next letter.
    pub fn from_average(average: f64) -> Self {
        let index = (average.ceil().max(0.0) as usize).min(Self::ALL.len() - 1);
        Self::ALL[index]
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Grade::I => "Ⅰ",
            Grade::II => "Ⅱ",
            Grade::III => "Ⅲ",
            Grade::IV => "Ⅳ",
            Grade::V => "Ⅴ",
        }
    }
}

/// Headline values derived from one performance matrix. Recomputed on
/// every dashboard load; never cached across loads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStats {
    pub average_score: f64,
    pub best_concept: ConceptType,
    pub best_process: ProcessType,
    pub grade: Grade,
    /// Progress within the current whole-number score, 0..=99.
    pub level_percent: u8,
}

/// Aggregates a populated matrix. The overall average is the mean over
/// concepts of each concept's mean process score; the best process is
/// the single highest-valued cell across all 21 cells, not a
/// per-process aggregate. First-seen wins on ties in both scans.
pub fn aggregate(matrix: &PerformanceMatrix) -> AggregatedStats {
    let mut average_score = 0.0;
    let mut best_concept = ConceptType::ALL[0];
    let mut best_concept_score = f64::NEG_INFINITY;

    for concept in ConceptType::ALL {
        let concept_score = ProcessType::ALL
            .into_iter()
            .map(|process| matrix.get(concept, process))
            .sum::<f64>()
            / PROCESS_COUNT as f64;
        average_score += concept_score;
        if concept_score > best_concept_score {
            best_concept_score = concept_score;
            best_concept = concept;
        }
    }

    average_score /= CONCEPT_COUNT as f64;

    let mut best_process = ProcessType::ALL[0];
    let mut best_process_score = f64::NEG_INFINITY;
    for process in ProcessType::ALL {
        for concept in ConceptType::ALL {
            let score = matrix.get(concept, process);
            if score > best_process_score {
                best_process_score = score;
                best_process = process;
            }
        }
    }

    AggregatedStats {
        average_score,
        best_concept,
        best_process,
        grade: Grade::from_average(average_score),
        level_percent: (average_score.fract() * 100.0).floor() as u8,
    }
}

/// The performance level whose value equals the ceiling of the average
/// score; labels the "Average Level" stat.
pub fn average_level(average_score: f64) -> PerformanceLevel {
    let value = (average_score.ceil().max(0.0) as u8).min(4);
    PerformanceLevel::from_value(value).unwrap_or(PerformanceLevel::Mastered)
}

/// Joins one sub-question of the question bank against the student's
/// completed-submission set, keyed by sub-question id. Pending
/// sub-questions carry content only; submitted ones additionally carry
/// the stored answer, performance label, and feedback. With
/// `split_multi_select`, a submitted multi-select answer is split back
/// into the selected options (the review presentation); otherwise the
/// stored string is passed through unchanged (the answering
/// presentation). Images are resolved separately by the caller.
pub fn merge_sub_question(
    sub_question: &SubQuestion,
    submissions: &HashMap<i64, CompletedSubQuestion>,
    split_multi_select: bool,
) -> SubQuestionView {
    let kind = SubQuestionKind::from_options(sub_question.options.as_ref());
    let mut view = SubQuestionView {
        id: sub_question.id,
        kind,
        text: sub_question.description.clone(),
        options: sub_question.options.clone(),
        image: None,
        keywords: sub_question.keywords.clone(),
        is_submitted: false,
        user_answer: None,
        performance: None,
        feedback: None,
    };

    if let Some(submission) = submissions.get(&sub_question.id) {
        view.is_submitted = true;
        view.user_answer = Some(stored_answer(
            &submission.submitted_answer,
            kind,
            split_multi_select,
        ));
        view.performance = Some(submission.performance.label());
        view.feedback = Some(submission.feedback.clone());
    }

    view
}

/// Review presentation of an already-completed sub-question (question
/// history), where every entry carries its submission.
pub fn completed_sub_question_view(sub_question: &CompletedSubQuestion) -> SubQuestionView {
    let kind = SubQuestionKind::from_options(sub_question.options.as_ref());
    SubQuestionView {
        id: sub_question.id,
        kind,
        text: sub_question.description.clone(),
        options: sub_question.options.clone(),
        image: None,
        keywords: sub_question.keywords.clone(),
        is_submitted: true,
        user_answer: Some(stored_answer(&sub_question.submitted_answer, kind, true)),
        performance: Some(sub_question.performance.label()),
        feedback: Some(sub_question.feedback.clone()),
    }
}

fn stored_answer(raw: &str, kind: SubQuestionKind, split_multi_select: bool) -> UserAnswer {
    if split_multi_select && kind == SubQuestionKind::MultipleChoice {
        UserAnswer::Selected(split_answer(raw))
    } else {
        UserAnswer::Text(raw.to_string())
    }
}

/// Response statistics for one sub-question across a class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubQuestionStatistics {
    pub students_answered: usize,
    /// Mean score over the students who answered; 0 with no answers.
    pub average_score: f64,
    /// Fraction of the class that answered; 0 with no students.
    pub response_rate: f64,
}

/// Computes the statistics for one sub-question from the per-student
/// performance entries (`None` for students who have not answered).
/// Always computed per sub-question; never aggregated across an
/// assignment implicitly.
pub fn sub_question_statistics(performances: &[Option<PerformanceLevel>]) -> SubQuestionStatistics {
    let total_students = performances.len();
    let answered: Vec<u8> = performances
        .iter()
        .filter_map(|performance| performance.map(PerformanceLevel::value))
        .collect();
    let students_answered = answered.len();

    let average_score = if students_answered > 0 {
        answered.iter().map(|value| f64::from(*value)).sum::<f64>() / students_answered as f64
    } else {
        0.0
    };
    let response_rate = if total_students > 0 {
        students_answered as f64 / total_students as f64
    } else {
        0.0
    };

    SubQuestionStatistics { students_answered, average_score, response_rate }
}
