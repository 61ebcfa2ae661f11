//! Scoring engine: maps a test definition and the player's submitted answers
//! to an outcome. Pure computation; persistence happens in the session
//! service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::graph::TestGraph;
use crate::models::test::TestType;

/// One (question, chosen answer) pair as submitted by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub question_id: Uuid,
    pub answer_id: Uuid,
}

impl Submission {
    pub fn new(question_id: Uuid, answer_id: Uuid) -> Self {
        Self {
            question_id,
            answer_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionVerdict {
    pub question_id: Uuid,
    pub answer_id: Option<Uuid>,
    pub is_correct: bool,
}

/// Outcome of a finished attempt. Each test type carries only what it
/// produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outcome {
    Quiz {
        score: i32,
        max_score: i32,
        breakdown: Vec<QuestionVerdict>,
    },
    Personality {
        result_id: Option<Uuid>,
        score: i32,
    },
    Branching {
        result_id: Option<Uuid>,
    },
}

impl Outcome {
    pub fn result_id(&self) -> Option<Uuid> {
        match self {
            Outcome::Quiz { .. } => None,
            Outcome::Personality { result_id, .. } | Outcome::Branching { result_id } => *result_id,
        }
    }

    pub fn score(&self) -> Option<i32> {
        match self {
            Outcome::Quiz { score, .. } | Outcome::Personality { score, .. } => Some(*score),
            Outcome::Branching { .. } => None,
        }
    }

    pub fn max_score(&self) -> Option<i32> {
        match self {
            Outcome::Quiz { max_score, .. } => Some(*max_score),
            _ => None,
        }
    }
}

pub fn score(graph: &TestGraph, submissions: &[Submission]) -> Outcome {
    let submissions = latest_per_question(submissions);
    match graph.test.test_type {
        TestType::Quiz => score_quiz(graph, &submissions),
        TestType::Personality => score_personality(graph, &submissions),
        TestType::Branching => score_branching(graph, &submissions),
    }
}

/// Collapses repeated answers to the same question into the latest one, kept
/// at the position of its latest occurrence.
pub fn latest_per_question(submissions: &[Submission]) -> Vec<Submission> {
    let mut kept: Vec<Submission> = Vec::with_capacity(submissions.len());
    for (idx, s) in submissions.iter().enumerate() {
        let superseded = submissions[idx + 1..]
            .iter()
            .any(|later| later.question_id == s.question_id);
        if !superseded {
            kept.push(*s);
        }
    }
    kept
}

fn score_quiz(graph: &TestGraph, submissions: &[Submission]) -> Outcome {
    let breakdown: Vec<QuestionVerdict> = graph
        .questions
        .iter()
        .map(|node| {
            let chosen = submissions
                .iter()
                .find(|s| s.question_id == node.question.id)
                .map(|s| s.answer_id);
            let is_correct = chosen
                .and_then(|answer_id| node.answer(answer_id))
                .map(|a| a.answer.is_correct)
                .unwrap_or(false);
            QuestionVerdict {
                question_id: node.question.id,
                answer_id: chosen,
                is_correct,
            }
        })
        .collect();

    let score = breakdown.iter().filter(|v| v.is_correct).count() as i32;
    Outcome::Quiz {
        score,
        max_score: graph.questions.len() as i32,
        breakdown,
    }
}

fn score_personality(graph: &TestGraph, submissions: &[Submission]) -> Outcome {
    // Totals stay in first-accumulation order; that order breaks ties.
    let mut totals: Vec<(Uuid, i32)> = Vec::new();
    for s in submissions {
        let Some(answer) = graph
            .question(s.question_id)
            .and_then(|q| q.answer(s.answer_id))
        else {
            continue;
        };
        for award in &answer.points {
            match totals.iter_mut().find(|(id, _)| *id == award.result_id) {
                Some((_, total)) => *total += award.points,
                None => totals.push((award.result_id, award.points)),
            }
        }
    }

    let mut winner: Option<Uuid> = None;
    let mut best = 0;
    for (result_id, total) in totals {
        if total > best {
            best = total;
            winner = Some(result_id);
        }
    }

    Outcome::Personality {
        result_id: winner,
        score: best,
    }
}

fn score_branching(graph: &TestGraph, submissions: &[Submission]) -> Outcome {
    let result_id = submissions.last().and_then(|last| {
        graph
            .questions
            .iter()
            .find_map(|q| q.answer(last.answer_id))
            .and_then(|a| a.answer.result_id)
    });
    Outcome::Branching { result_id }
}
