use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::graph::{AnswerNode, QuestionNode, TestGraph};
use crate::models::test::TestType;
use crate::models::test_result::TestResult;
use crate::models::user_session::{UserAnswer, UserSession};
use crate::models::welcome_screen::WelcomeScreen;
use crate::services::scoring::{Outcome, Submission};

/// What a player sees of a published test. Correctness flags and result
/// points never leave the server.
#[derive(Debug, Clone, Serialize)]
pub struct PlayTest {
    pub id: Uuid,
    pub slug: Option<String>,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub test_type: TestType,
    pub allow_retake: bool,
    pub welcome_screen: Option<PlayWelcomeScreen>,
    pub questions: Vec<PlayQuestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayWelcomeScreen {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub button_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayQuestion {
    pub id: Uuid,
    pub order: i32,
    pub text: String,
    pub image_url: Option<String>,
    pub answers: Vec<PlayAnswer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayAnswer {
    pub id: Uuid,
    pub order: i32,
    pub text: String,
    pub image_url: Option<String>,
    /// Present for branching tests only.
    #[serde(flatten)]
    pub route: Option<AnswerRoute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnswerRoute {
    pub next_question_id: Option<Uuid>,
    pub is_terminal: bool,
}

impl From<&TestGraph> for PlayTest {
    fn from(graph: &TestGraph) -> Self {
        let branching = graph.test.test_type == TestType::Branching;
        Self {
            id: graph.test.id,
            slug: graph.test.slug.clone(),
            title: graph.test.title.clone(),
            description: graph.test.description.clone(),
            test_type: graph.test.test_type,
            allow_retake: graph.test.allow_retake,
            welcome_screen: graph.welcome_screen.as_ref().map(PlayWelcomeScreen::from),
            questions: graph
                .questions
                .iter()
                .map(|q| PlayQuestion::new(q, branching))
                .collect(),
        }
    }
}

impl From<&WelcomeScreen> for PlayWelcomeScreen {
    fn from(w: &WelcomeScreen) -> Self {
        Self {
            title: w.title.clone(),
            description: w.description.clone(),
            image_url: w.image_url.clone(),
            button_text: w.button_text.clone(),
        }
    }
}

impl PlayQuestion {
    fn new(node: &QuestionNode, branching: bool) -> Self {
        Self {
            id: node.question.id,
            order: node.question.order_index,
            text: node.question.text.clone(),
            image_url: node.question.image_url.clone(),
            answers: node
                .answers
                .iter()
                .map(|a| PlayAnswer::new(a, branching))
                .collect(),
        }
    }
}

impl PlayAnswer {
    fn new(node: &AnswerNode, branching: bool) -> Self {
        let route = branching.then(|| AnswerRoute {
            next_question_id: node.answer.next_question_id,
            is_terminal: node.answer.result_id.is_some(),
        });
        Self {
            id: node.answer.id,
            order: node.answer.order_index,
            text: node.answer.text.clone(),
            image_url: node.answer.image_url.clone(),
            route,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitPayload {
    #[validate(length(max = 1000, message = "Too many answers in one submission"))]
    pub answers: Vec<Submission>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session: UserSession,
    pub answers: Vec<UserAnswer>,
    pub result: Option<TestResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub session: UserSession,
    pub outcome: Outcome,
    pub result: Option<TestResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::graph::fixtures;

    #[test]
    fn quiz_view_hides_correctness_and_routing() {
        let test = fixtures::test(TestType::Quiz);
        let q = fixtures::question(test.id, 0, vec![fixtures::correct(), fixtures::answer()]);
        let graph = fixtures::graph(test, None, vec![q], Vec::new());

        let json = serde_json::to_value(PlayTest::from(&graph)).unwrap();
        let answer = &json["questions"][0]["answers"][0];
        assert!(answer.get("is_correct").is_none());
        assert!(answer.get("points").is_none());
        assert!(answer.get("next_question_id").is_none());
        assert!(answer.get("is_terminal").is_none());
        assert_eq!(json["type"], "quiz");
    }

    #[test]
    fn branching_view_exposes_navigation() {
        let test = fixtures::test(TestType::Branching);
        let end = fixtures::result(test.id, "End");
        let q2 = fixtures::question(test.id, 1, vec![fixtures::leading_to_result(end.id)]);
        let q1 = fixtures::question(
            test.id,
            0,
            vec![fixtures::leading_to_question(q2.question.id)],
        );
        let next = q2.question.id;
        let graph = fixtures::graph(test, None, vec![q1, q2], vec![end]);

        let json = serde_json::to_value(PlayTest::from(&graph)).unwrap();
        let first = &json["questions"][0]["answers"][0];
        assert_eq!(first["next_question_id"], next.to_string());
        assert_eq!(first["is_terminal"], false);
        let last = &json["questions"][1]["answers"][0];
        assert!(last["next_question_id"].is_null());
        assert_eq!(last["is_terminal"], true);
        assert!(last.get("result_id").is_none());
    }
}
