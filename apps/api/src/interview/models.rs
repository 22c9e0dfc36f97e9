use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of questions a generated set is expected to hold.
pub const EXPECTED_QUESTION_COUNT: usize = 25;
/// Minimum options per question.
pub const MIN_OPTIONS: usize = 5;

/// A candidate's answer. Questions may have several correct options, so the
/// candidate may pick one or many.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Single(String),
    Multiple(Vec<String>),
}

impl Answer {
    pub fn is_blank(&self) -> bool {
        match self {
            Answer::Single(s) => s.trim().is_empty(),
            Answer::Multiple(v) => v.iter().all(|s| s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    /// Absent on generation; filled in by the candidate before evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub questions: Vec<Question>,
}

impl QuestionSet {
    pub fn answered_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| q.answer.as_ref().is_some_and(|a| !a.is_blank()))
            .count()
    }

    /// Deviations from the structure the generation prompt asks for.
    /// Reported, never enforced: the model's output is returned as written.
    pub fn shape_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.questions.len() != EXPECTED_QUESTION_COUNT {
            issues.push(format!(
                "expected {EXPECTED_QUESTION_COUNT} questions, got {}",
                self.questions.len()
            ));
        }

        for (i, q) in self.questions.iter().enumerate() {
            if q.question.trim().is_empty() {
                issues.push(format!("question {} has empty text", i + 1));
            }
            if q.options.len() < MIN_OPTIONS {
                issues.push(format!(
                    "question {} has {} options (minimum {MIN_OPTIONS})",
                    i + 1,
                    q.options.len()
                ));
            }
        }

        issues
    }
}

/// Evaluation fields are free text; models often emit lists instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FreeText {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub strengths: FreeText,
    pub correct_answers: FreeText,
    pub incorrect_answers: FreeText,
    pub technical_knowledge: FreeText,
    pub areas_of_improvement: FreeText,
    /// 1 = worst, 5 = best.
    pub performance_rank: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub evaluation: Evaluation,
}

impl EvaluationReport {
    pub fn shape_issues(&self) -> Vec<String> {
        let rank = self.evaluation.performance_rank;
        if (1..=5).contains(&rank) {
            Vec::new()
        } else {
            vec![format!("performance_rank {rank} is outside 1..=5")]
        }
    }
}

/// Checks a persisted document against the shape expected for `T`.
pub fn document_issues<T, F>(document: &Value, issues: F) -> Vec<String>
where
    T: serde::de::DeserializeOwned,
    F: FnOnce(&T) -> Vec<String>,
{
    match T::deserialize(document) {
        Ok(parsed) => issues(&parsed),
        Err(e) => vec![format!("document does not match the expected shape: {e}")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(options: usize, answer: Option<Answer>) -> Question {
        Question {
            question: "Which service stores objects durably?".to_string(),
            options: (1..=options).map(|i| format!("Option {i}")).collect(),
            answer,
        }
    }

    #[test]
    fn test_generated_question_has_no_answer_field() {
        let value = serde_json::to_value(question(5, None)).unwrap();
        assert!(value.get("answer").is_none());
    }

    #[test]
    fn test_answer_accepts_single_and_multiple() {
        let single: Question = serde_json::from_value(json!({
            "question": "q", "options": ["a", "b", "c", "d", "e"], "answer": "a"
        }))
        .unwrap();
        assert_eq!(single.answer, Some(Answer::Single("a".to_string())));

        let multiple: Question = serde_json::from_value(json!({
            "question": "q", "options": ["a", "b", "c", "d", "e"], "answer": ["a", "c"]
        }))
        .unwrap();
        assert_eq!(
            multiple.answer,
            Some(Answer::Multiple(vec!["a".to_string(), "c".to_string()]))
        );
    }

    #[test]
    fn test_answered_count_ignores_blank_answers() {
        let set = QuestionSet {
            questions: vec![
                question(5, Some(Answer::Single("Option 1".to_string()))),
                question(5, Some(Answer::Single("  ".to_string()))),
                question(5, None),
                question(5, Some(Answer::Multiple(vec!["Option 2".to_string()]))),
            ],
        };
        assert_eq!(set.answered_count(), 2);
    }

    #[test]
    fn test_shape_issues_flags_count_and_options() {
        let mut questions: Vec<Question> = (0..EXPECTED_QUESTION_COUNT)
            .map(|_| question(5, None))
            .collect();
        assert!(QuestionSet {
            questions: questions.clone()
        }
        .shape_issues()
        .is_empty());

        questions[3] = question(4, None);
        questions.pop();
        let issues = QuestionSet { questions }.shape_issues();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("expected 25 questions, got 24"));
        assert!(issues[1].contains("question 4 has 4 options"));
    }

    #[test]
    fn test_evaluation_report_accepts_list_fields() {
        let report: EvaluationReport = serde_json::from_value(json!({
            "evaluation": {
                "strengths": ["Solid AWS fundamentals", "Good OOP knowledge"],
                "correct_answers": "Questions 1, 2 and 5",
                "incorrect_answers": [],
                "technical_knowledge": "Above average",
                "areas_of_improvement": "Design patterns",
                "performance_rank": 4
            }
        }))
        .unwrap();
        assert!(report.shape_issues().is_empty());
        assert!(matches!(report.evaluation.strengths, FreeText::List(ref v) if v.len() == 2));
    }

    #[test]
    fn test_rank_out_of_range_is_reported() {
        let doc = json!({
            "evaluation": {
                "strengths": "", "correct_answers": "", "incorrect_answers": "",
                "technical_knowledge": "", "areas_of_improvement": "",
                "performance_rank": 7
            }
        });
        let issues = document_issues(&doc, EvaluationReport::shape_issues);
        assert_eq!(issues, vec!["performance_rank 7 is outside 1..=5".to_string()]);
    }

    #[test]
    fn test_document_issues_reports_wrong_shape() {
        let issues = document_issues(&json!({"items": []}), QuestionSet::shape_issues);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("does not match"));
    }
}
