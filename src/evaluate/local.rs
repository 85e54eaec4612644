use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

use super::{Evaluator, common::{EvaluationRequest, EvaluationResult, EvaluationSource, Rating, clamp_score}};

const LOW_SCORE_FEEDBACK: &str = "翻译与原文有较大差异，请尝试更准确地表达。";
const MINOR_DIFFERENCE_FEEDBACK: &str = "基本正确，但还有一些细微差异。";
const PERFECT_FEEDBACK: &str = "翻译非常准确，继续保持！";
const LOW_SCORE_TIPS: [&str; 2] = ["注意时态的一致性", "检查主谓搭配"];

/// Local evaluation: word-overlap scoring, used offline and as the remote fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalEvaluator;

#[async_trait]
impl Evaluator for LocalEvaluator {
    async fn evaluate_detailed(&self, request: &EvaluationRequest) -> (EvaluationResult, EvaluationSource) {
        let result = score_locally(&request.user_translation, &request.reference_target);
        (result, EvaluationSource::Local)
    }
}

/// Lowercase, keep only word characters and whitespace, trim
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Jaccard similarity of the two texts' word sets, in 0.0..=1.0.
/// Texts that normalize identically score 1.0; two empty word sets score 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    if a == b {
        return 1.0;
    }

    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();

    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count();

    intersection as f64 / union as f64
}

/// Score a translation against the reference without any I/O
pub fn score_locally(user_translation: &str, reference_target: &str) -> EvaluationResult {
    let similarity = similarity(user_translation, reference_target);
    let score = clamp_score((similarity * 5.0).round() as i64);

    debug!("Local similarity {:.3} -> score {}", similarity, score);

    let (feedback, grammar_tips): (&str, Vec<String>) = if score < 3 {
        (LOW_SCORE_FEEDBACK, LOW_SCORE_TIPS.iter().map(|t| t.to_string()).collect())
    } else if score < 5 {
        (MINOR_DIFFERENCE_FEEDBACK, Vec::new())
    } else {
        (PERFECT_FEEDBACK, Vec::new())
    };

    EvaluationResult {
        score,
        rating: Rating::from_score(score).as_str().to_string(),
        original_text: reference_target.to_string(),
        feedback: Some(feedback.to_string()),
        grammar_tips,
    }
}
