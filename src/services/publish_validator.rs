use std::collections::HashSet;
use uuid::Uuid;

use crate::error::FieldIssue;
use crate::models::graph::TestGraph;
use crate::models::test::TestType;

/// Structural checks run once, right before a draft becomes published.
/// An empty list means the test may be published.
pub fn validate_for_publish(graph: &TestGraph) -> Vec<FieldIssue> {
    let mut issues = Vec::new();

    let has_welcome_title = graph
        .welcome_screen
        .as_ref()
        .map(|w| !w.title.trim().is_empty())
        .unwrap_or(false);
    if !has_welcome_title {
        issues.push(FieldIssue::new(
            "welcome_screen.title",
            "Welcome screen with a title is required",
        ));
    }

    if graph.questions.is_empty() {
        issues.push(FieldIssue::new("questions", "At least one question is required"));
    }

    for (qi, node) in graph.questions.iter().enumerate() {
        if node.answers.len() < 2 {
            issues.push(FieldIssue::new(
                format!("questions[{}].answers", qi),
                "Each question needs at least 2 answers",
            ));
        }
    }

    match graph.test.test_type {
        TestType::Quiz => check_quiz(graph, &mut issues),
        TestType::Personality => check_personality(graph, &mut issues),
        TestType::Branching => check_branching(graph, &mut issues),
    }

    issues
}

fn require_results(graph: &TestGraph, issues: &mut Vec<FieldIssue>) {
    if graph.results.is_empty() {
        issues.push(FieldIssue::new("results", "At least one result is required"));
    }
}

fn check_quiz(graph: &TestGraph, issues: &mut Vec<FieldIssue>) {
    for (qi, node) in graph.questions.iter().enumerate() {
        if !node.answers.iter().any(|a| a.answer.is_correct) {
            issues.push(FieldIssue::new(
                format!("questions[{}].answers", qi),
                "Mark at least one answer as correct",
            ));
        }
    }
}

fn check_personality(graph: &TestGraph, issues: &mut Vec<FieldIssue>) {
    require_results(graph, issues);
    for (qi, node) in graph.questions.iter().enumerate() {
        for (ai, answer) in node.answers.iter().enumerate() {
            if answer.points.is_empty() {
                issues.push(FieldIssue::new(
                    format!("questions[{}].answers[{}].points", qi, ai),
                    "Answer must award points to at least one result",
                ));
            }
        }
    }
}

fn check_branching(graph: &TestGraph, issues: &mut Vec<FieldIssue>) {
    require_results(graph, issues);
    let question_ids: HashSet<Uuid> = graph.questions.iter().map(|q| q.question.id).collect();
    let result_ids: HashSet<Uuid> = graph.results.iter().map(|r| r.id).collect();

    for (qi, node) in graph.questions.iter().enumerate() {
        for (ai, answer) in node.answers.iter().enumerate() {
            let routes_to_question = answer
                .answer
                .next_question_id
                .map(|id| question_ids.contains(&id))
                .unwrap_or(false);
            let routes_to_result = answer
                .answer
                .result_id
                .map(|id| result_ids.contains(&id))
                .unwrap_or(false);
            if !routes_to_question && !routes_to_result {
                issues.push(FieldIssue::new(
                    format!("questions[{}].answers[{}]", qi, ai),
                    "Answer must lead to another question or to a result",
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::graph::fixtures;

    fn fields(issues: &[FieldIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.field.as_str()).collect()
    }

    #[test]
    fn empty_draft_reports_welcome_and_questions() {
        let test = fixtures::test(TestType::Quiz);
        let graph = fixtures::graph(test, None, Vec::new(), Vec::new());
        assert_eq!(
            fields(&validate_for_publish(&graph)),
            vec!["welcome_screen.title", "questions"]
        );
    }

    #[test]
    fn blank_welcome_title_is_rejected() {
        let test = fixtures::test(TestType::Quiz);
        let welcome = fixtures::welcome(test.id, "   ");
        let q = fixtures::question(test.id, 0, vec![fixtures::correct(), fixtures::answer()]);
        let graph = fixtures::graph(test, Some(welcome), vec![q], Vec::new());
        assert_eq!(fields(&validate_for_publish(&graph)), vec!["welcome_screen.title"]);
    }

    #[test]
    fn quiz_requires_two_answers_and_a_correct_one() {
        let test = fixtures::test(TestType::Quiz);
        let welcome = fixtures::welcome(test.id, "Hello");
        let q1 = fixtures::question(test.id, 0, vec![fixtures::correct()]);
        let q2 = fixtures::question(test.id, 1, vec![fixtures::answer(), fixtures::answer()]);
        let q3 = fixtures::question(test.id, 2, vec![fixtures::answer(), fixtures::correct()]);
        let graph = fixtures::graph(test, Some(welcome), vec![q1, q2, q3], Vec::new());
        assert_eq!(
            fields(&validate_for_publish(&graph)),
            vec!["questions[0].answers", "questions[1].answers"]
        );
    }

    #[test]
    fn valid_quiz_has_no_issues() {
        let test = fixtures::test(TestType::Quiz);
        let welcome = fixtures::welcome(test.id, "Hello");
        let q = fixtures::question(test.id, 0, vec![fixtures::answer(), fixtures::correct()]);
        let graph = fixtures::graph(test, Some(welcome), vec![q], Vec::new());
        assert!(validate_for_publish(&graph).is_empty());
    }

    #[test]
    fn personality_requires_results_and_points() {
        let test = fixtures::test(TestType::Personality);
        let welcome = fixtures::welcome(test.id, "Who are you?");
        let q = fixtures::question(test.id, 0, vec![fixtures::answer(), fixtures::answer()]);
        let graph = fixtures::graph(test, Some(welcome), vec![q], Vec::new());
        assert_eq!(
            fields(&validate_for_publish(&graph)),
            vec![
                "results",
                "questions[0].answers[0].points",
                "questions[0].answers[1].points"
            ]
        );
    }

    #[test]
    fn valid_personality_has_no_issues() {
        let test = fixtures::test(TestType::Personality);
        let welcome = fixtures::welcome(test.id, "Who are you?");
        let owl = fixtures::result(test.id, "Owl");
        let q = fixtures::question(
            test.id,
            0,
            vec![fixtures::awarding(&[(owl.id, 1)]), fixtures::awarding(&[(owl.id, 0)])],
        );
        let graph = fixtures::graph(test, Some(welcome), vec![q], vec![owl]);
        assert!(validate_for_publish(&graph).is_empty());
    }

    #[test]
    fn branching_rejects_dangling_and_foreign_edges() {
        let test = fixtures::test(TestType::Branching);
        let welcome = fixtures::welcome(test.id, "Story");
        let end = fixtures::result(test.id, "The end");
        let q = fixtures::question(
            test.id,
            0,
            vec![
                fixtures::leading_to_result(end.id),
                fixtures::answer(),
                fixtures::leading_to_question(Uuid::new_v4()),
                fixtures::leading_to_result(Uuid::new_v4()),
            ],
        );
        let graph = fixtures::graph(test, Some(welcome), vec![q], vec![end]);
        assert_eq!(
            fields(&validate_for_publish(&graph)),
            vec![
                "questions[0].answers[1]",
                "questions[0].answers[2]",
                "questions[0].answers[3]"
            ]
        );
    }

    #[test]
    fn branching_without_results_is_rejected() {
        let test = fixtures::test(TestType::Branching);
        let welcome = fixtures::welcome(test.id, "Story");
        let q2 = fixtures::question(test.id, 1, vec![fixtures::answer(), fixtures::answer()]);
        let q1 = fixtures::question(
            test.id,
            0,
            vec![
                fixtures::leading_to_question(q2.question.id),
                fixtures::leading_to_question(q2.question.id),
            ],
        );
        let graph = fixtures::graph(test, Some(welcome), vec![q1, q2], Vec::new());
        let issues = validate_for_publish(&graph);
        assert_eq!(issues[0].field, "results");
        assert_eq!(
            fields(&issues[1..]),
            vec!["questions[1].answers[0]", "questions[1].answers[1]"]
        );
    }
}
