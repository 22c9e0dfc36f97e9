// Prompt templates for the interview agents.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::interview::models::{EXPECTED_QUESTION_COUNT, MIN_OPTIONS};
use crate::llm_client::prompts::tool_delivery_instruction;

pub const QUESTION_SETTER_AGENT: &str = "Question Setter Agent";
pub const EVALUATOR_AGENT: &str = "Evaluator Agent";

/// User message sent to the evaluator. Generation takes its message from the request.
pub const EVALUATION_MESSAGE: &str =
    "Evaluate the candidate's answers and provide a detailed evaluation report.";

/// Question generation system prompt.
/// Replace: {jobdesc}, {criteria}, {question_count}, {min_options}, {delivery}
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"You are a senior technical interviewer preparing a screening test for prospective candidates.

JOB DESCRIPTION:
{jobdesc}

CRITERIA the questions must cover:
{criteria}

Prepare scenario-based multiple-choice questions that assess the candidate's
problem-solving ability, technical knowledge and hands-on experience with the
technologies and practices named above.

HARD RULES:
1. Create exactly {question_count} questions, answerable in 30 minutes by an expert candidate
2. Every question must have at least {min_options} options
3. Some questions may have multiple correct answers
4. Vary the difficulty; keep every question clear, concise and unambiguous
5. Do NOT include the correct answers in the output

Return ONLY a JSON object with this EXACT schema:
{
  "questions": [
    {
      "question": "Question text here",
      "options": ["Option 1", "Option 2", "Option 3", "Option 4", "Option 5"]
    }
  ]
}

{delivery}"#;

/// Evaluation system prompt.
/// Replace: {jobdesc}, {criteria}, {interview_json}, {delivery}
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"You are a technical interview evaluator.

Evaluate the candidate's answers against this JOB DESCRIPTION:
{jobdesc}

and these CRITERIA:
{criteria}

The candidate's test is a JSON object of this shape, where `answer` is the
option (or list of options) the candidate chose:
{
  "questions": [
    {"question": "...", "options": ["..."], "answer": "..."}
  ]
}

Rules:
1. Evaluate every answered question
2. An answer is correct only if it matches the correct option(s) for that question
3. Judge correctness only; do not weigh the depth of the answer
4. Rank overall performance from 1 (worst) to 5 (best)

Return ONLY a JSON object with this EXACT schema:
{
  "evaluation": {
    "strengths": "List of strengths",
    "correct_answers": "List of correct answers if any",
    "incorrect_answers": "List of incorrect answers if any",
    "technical_knowledge": "Evaluation of technical knowledge",
    "areas_of_improvement": "List of areas of improvement",
    "performance_rank": 1
  }
}

CANDIDATE'S TEST:
{interview_json}

{delivery}"#;

/// Substitutes `{name}` slots in one pass over the template. Inserted values are
/// never rescanned, so user text containing a slot name is kept literally.
/// Braces that do not name a slot (the JSON schema examples) pass through.
fn fill_template(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let slot = slots.iter().find(|(name, _)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(name))
                .is_some_and(|t| t.starts_with('}'))
        });
        match slot {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Builds the question setter's system prompt.
pub fn build_question_prompt(jobdesc: &str, criteria: &str, tool_name: &str) -> String {
    let question_count = EXPECTED_QUESTION_COUNT.to_string();
    let min_options = MIN_OPTIONS.to_string();
    let delivery = tool_delivery_instruction(tool_name);
    fill_template(
        QUESTION_PROMPT_TEMPLATE,
        &[
            ("jobdesc", jobdesc.trim()),
            ("criteria", criteria.trim()),
            ("question_count", &question_count),
            ("min_options", &min_options),
            ("delivery", &delivery),
        ],
    )
}

/// Builds the evaluator's system prompt with the full interview inline.
pub fn build_evaluation_prompt(
    jobdesc: &str,
    criteria: &str,
    interview_json: &str,
    tool_name: &str,
) -> String {
    let delivery = tool_delivery_instruction(tool_name);
    fill_template(
        EVALUATION_PROMPT_TEMPLATE,
        &[
            ("jobdesc", jobdesc.trim()),
            ("criteria", criteria.trim()),
            ("interview_json", interview_json),
            ("delivery", &delivery),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_prompt_embeds_inputs_and_rules() {
        let prompt = build_question_prompt(
            "  Senior .NET developer with AWS experience ",
            "ASP.NET Core, RESTful APIs",
            "save_questions",
        );
        assert!(prompt.contains("Senior .NET developer with AWS experience\n"));
        assert!(prompt.contains("ASP.NET Core, RESTful APIs"));
        assert!(prompt.contains("exactly 25 questions"));
        assert!(prompt.contains("at least 5 options"));
        assert!(prompt.contains("multiple correct answers"));
        assert!(prompt.contains("`save_questions`"));
        assert!(!prompt.contains("{jobdesc}"));
        assert!(!prompt.contains("{delivery}"));
    }

    #[test]
    fn test_question_prompt_is_deterministic() {
        let a = build_question_prompt("jd", "criteria", "save_questions");
        let b = build_question_prompt("jd", "criteria", "save_questions");
        assert_eq!(a, b);
    }

    #[test]
    fn test_evaluation_prompt_embeds_interview_inline() {
        let interview = r#"{"questions":[{"question":"q1","options":["a","b","c","d","e"],"answer":"b"}]}"#;
        let prompt =
            build_evaluation_prompt("jd", "criteria", interview, "save_evaluation_report");
        assert!(prompt.contains(interview));
        assert!(prompt.contains("performance_rank"));
        assert!(prompt.contains("`save_evaluation_report`"));
        assert!(!prompt.contains("{interview_json}"));
    }

    #[test]
    fn test_inputs_mentioning_slot_names_are_kept_literally() {
        let interview = r#"{"questions":[{"question":"q1","options":["a"],"answer":"a"}]}"#;
        let prompt = build_evaluation_prompt(
            "Use {interview_json} format",
            "criteria",
            interview,
            "save_evaluation_report",
        );
        assert_eq!(prompt.matches(interview).count(), 1);
        assert!(prompt.contains("Use {interview_json} format"));

        let prompt = build_question_prompt("JD mentions {criteria}", "CRIT", "save_questions");
        assert!(prompt.contains("JD mentions {criteria}"));
        assert!(!prompt.contains("JD mentions CRIT"));
    }

    #[test]
    fn test_fill_template_leaves_unknown_braces() {
        let filled = fill_template("{\n  \"a\": {x}, {y} {", &[("x", "1")]);
        assert_eq!(filled, "{\n  \"a\": 1, {y} {");
    }
}
