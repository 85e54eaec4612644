use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, LineRunError};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;
pub const NEUTRAL_SCORE: u8 = 3;

/// One translation attempt. Built per call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
    pub user_translation: String,
    pub reference_source: String,
    pub reference_target: String,
}

impl EvaluationRequest {
    /// Build a request, rejecting blank submissions.
    pub fn new(
        user_translation: impl Into<String>,
        reference_source: impl Into<String>,
        reference_target: impl Into<String>,
    ) -> Result<Self> {
        let user_translation = user_translation.into();
        if user_translation.trim().is_empty() {
            return Err(LineRunError::EmptyTranslation);
        }

        Ok(Self {
            user_translation,
            reference_source: reference_source.into(),
            reference_target: reference_target.into(),
        })
    }
}

/// Verdict returned to the caller. `score` is always within 1..=5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub score: u8,
    pub rating: String,
    pub original_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default)]
    pub grammar_tips: Vec<String>,
}

/// Which path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationSource {
    /// Remote verdict decoded from the schema
    Remote,
    /// Remote replied but the reply did not match the schema
    Degraded,
    /// Local fallback scorer
    Local,
}

impl fmt::Display for EvaluationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Remote => "remote",
            Self::Degraded => "degraded",
            Self::Local => "local",
        };
        f.write_str(s)
    }
}

/// Severity tiers shown next to a score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Perfect,
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl Rating {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 5 => Self::Perfect,
            4 => Self::Excellent,
            3 => Self::Good,
            2 => Self::Fair,
            _ => Self::NeedsImprovement,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Perfect => "完美！",
            Self::Excellent => "优秀",
            Self::Good => "良好",
            Self::Fair => "一般",
            Self::NeedsImprovement => "需要改进",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rating used when a remote reply carries none
pub const NEUTRAL_RATING: Rating = Rating::Fair;

/// Clamp any score into the valid range
pub fn clamp_score(score: i64) -> u8 {
    score.clamp(MIN_SCORE as i64, MAX_SCORE as i64) as u8
}

// Chat-completion wire types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Completion text of the first choice, if any
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// Verdict as the model writes it. Every field is optional and loosely typed;
/// a field of the wrong type falls back to its default instead of failing the decode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVerdict {
    #[serde(default)]
    pub score: Option<serde_json::Value>,
    #[serde(default)]
    pub rating: Option<serde_json::Value>,
    #[serde(default)]
    pub original_text: Option<serde_json::Value>,
    #[serde(default)]
    pub feedback: Option<serde_json::Value>,
    #[serde(default)]
    pub grammar_tips: Option<serde_json::Value>,
}

impl RawVerdict {
    /// Fill in defaults and clamp the score.
    pub fn normalize(self, reference_target: &str) -> EvaluationResult {
        let score = self
            .score
            .as_ref()
            .and_then(score_value)
            .filter(|s| *s != 0)
            .map(clamp_score)
            .unwrap_or(NEUTRAL_SCORE);

        EvaluationResult {
            score,
            rating: non_blank(text_value(self.rating))
                .unwrap_or_else(|| NEUTRAL_RATING.as_str().to_string()),
            original_text: non_blank(text_value(self.original_text))
                .unwrap_or_else(|| reference_target.to_string()),
            feedback: non_blank(text_value(self.feedback)),
            grammar_tips: tips_value(self.grammar_tips)
                .into_iter()
                .map(|tip| tip.trim().to_string())
                .filter(|tip| !tip.is_empty())
                .collect(),
        }
    }
}

/// Models sometimes send the score as a float or a quoted number.
fn score_value(value: &serde_json::Value) -> Option<i64> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then(|| n.round() as i64)
}

/// String fields only; anything else counts as missing
fn text_value(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    }
}

/// A list of strings, or a single string as a one-item list
fn tips_value(value: Option<serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| text_value(Some(item)))
            .collect(),
        Some(serde_json::Value::String(tip)) => vec![tip],
        _ => Vec::new(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Decode a completion as the verdict schema.
pub fn decode_verdict(content: &str, reference_target: &str) -> serde_json::Result<EvaluationResult> {
    let raw: RawVerdict = serde_json::from_str(strip_code_fence(content))?;
    Ok(raw.normalize(reference_target))
}

/// Result kept when the model answered outside the schema: its text becomes the feedback.
pub fn degraded_result(content: &str, reference_target: &str) -> EvaluationResult {
    EvaluationResult {
        score: NEUTRAL_SCORE,
        rating: NEUTRAL_RATING.as_str().to_string(),
        original_text: reference_target.to_string(),
        feedback: Some(content.to_string()),
        grammar_tips: Vec::new(),
    }
}

/// Remove a surrounding Markdown code fence, if present
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    match rest.rfind("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

pub const SYSTEM_PROMPT: &str =
    "你是一个英语学习助手。评估用户的英语翻译是否准确，给出1-5的评分和详细的语法建议。返回JSON格式。";

/// Build the user message carrying both reference lines and the attempt
pub fn build_evaluation_prompt(request: &EvaluationRequest) -> String {
    format!(
        "请评估以下翻译：\n\
         原始中文：{}\n\
         原始英文：{}\n\
         用户翻译：{}\n\
         \n\
         请只返回一个JSON对象，不要包含其他内容，字段如下：\n\
         - score: 1-5的评分（5为完美）\n\
         - rating: 简短的评价（如\"优秀\"、\"良好\"、\"一般\"、\"需要改进\"等）\n\
         - originalText: 原始英文台词\n\
         - feedback: 针对错误的具体反馈\n\
         - grammarTips: 语法知识点数组（如果有错误）",
        request.reference_source, request.reference_target, request.user_translation
    )
}

pub fn build_messages(request: &EvaluationRequest) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system".to_string(),
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: "user".to_string(),
            content: build_evaluation_prompt(request),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "So am I.";

    #[test]
    fn test_blank_submission_rejected() {
        assert!(matches!(
            EvaluationRequest::new("   \n", "我也是。", REFERENCE),
            Err(LineRunError::EmptyTranslation)
        ));
    }

    #[test]
    fn test_decode_full_verdict() {
        let content = r#"{"score":4,"rating":"优秀","originalText":"So am I.","feedback":"Close.","grammarTips":["Use 'So am I' for agreement"]}"#;
        let result = decode_verdict(content, REFERENCE).unwrap();
        assert_eq!(result.score, 4);
        assert_eq!(result.rating, "优秀");
        assert_eq!(result.feedback.as_deref(), Some("Close."));
        assert_eq!(result.grammar_tips.len(), 1);
    }

    #[test]
    fn test_decode_fills_defaults() {
        let result = decode_verdict("{}", REFERENCE).unwrap();
        assert_eq!(result.score, NEUTRAL_SCORE);
        assert_eq!(result.rating, "一般");
        assert_eq!(result.original_text, REFERENCE);
        assert_eq!(result.feedback, None);
        assert!(result.grammar_tips.is_empty());
    }

    #[test]
    fn test_decode_clamps_score() {
        assert_eq!(decode_verdict(r#"{"score":9}"#, REFERENCE).unwrap().score, 5);
        assert_eq!(decode_verdict(r#"{"score":-2}"#, REFERENCE).unwrap().score, 1);
        assert_eq!(decode_verdict(r#"{"score":0}"#, REFERENCE).unwrap().score, 3);
        assert_eq!(decode_verdict(r#"{"score":"4"}"#, REFERENCE).unwrap().score, 4);
        assert_eq!(decode_verdict(r#"{"score":4.6}"#, REFERENCE).unwrap().score, 5);
    }

    #[test]
    fn test_decode_fenced_reply() {
        let content = "```json\n{\"score\":5,\"rating\":\"完美！\"}\n```";
        let result = decode_verdict(content, REFERENCE).unwrap();
        assert_eq!(result.score, 5);
        assert_eq!(result.rating, "完美！");
    }

    #[test]
    fn test_decode_uppercase_fence_tag() {
        let result = decode_verdict("```JSON\n{\"score\":5}\n```", REFERENCE).unwrap();
        assert_eq!(result.score, 5);
    }

    #[test]
    fn test_decode_single_string_tip() {
        let content = r#"{"score":4,"rating":"优秀","grammarTips":"注意时态"}"#;
        let result = decode_verdict(content, REFERENCE).unwrap();
        assert_eq!(result.score, 4);
        assert_eq!(result.rating, "优秀");
        assert_eq!(result.grammar_tips, vec!["注意时态"]);
    }

    #[test]
    fn test_decode_wrongly_typed_fields_keep_score() {
        let content = r#"{"score":2,"rating":2,"originalText":null,"feedback":{"text":"x"},"grammarTips":["ok",3,""]}"#;
        let result = decode_verdict(content, REFERENCE).unwrap();
        assert_eq!(result.score, 2);
        assert_eq!(result.rating, "一般");
        assert_eq!(result.original_text, REFERENCE);
        assert_eq!(result.feedback, None);
        assert_eq!(result.grammar_tips, vec!["ok"]);
    }

    #[test]
    fn test_decode_prose_fails() {
        assert!(decode_verdict("Your translation is quite good!", REFERENCE).is_err());
    }

    #[test]
    fn test_degraded_keeps_raw_text() {
        let raw = "  Not JSON at all\n";
        let result = degraded_result(raw, REFERENCE);
        assert_eq!(result.score, 3);
        assert_eq!(result.rating, "一般");
        assert_eq!(result.feedback.as_deref(), Some(raw));
        assert!(result.grammar_tips.is_empty());
    }

    #[test]
    fn test_rating_thresholds() {
        assert_eq!(Rating::from_score(5), Rating::Perfect);
        assert_eq!(Rating::from_score(4), Rating::Excellent);
        assert_eq!(Rating::from_score(3), Rating::Good);
        assert_eq!(Rating::from_score(2), Rating::Fair);
        assert_eq!(Rating::from_score(1), Rating::NeedsImprovement);
    }

    #[test]
    fn test_prompt_contains_all_texts() {
        let request = EvaluationRequest::new("Me too.", "我也是。", REFERENCE).unwrap();
        let prompt = build_evaluation_prompt(&request);
        assert!(prompt.contains("我也是。"));
        assert!(prompt.contains(REFERENCE));
        assert!(prompt.contains("Me too."));
        assert!(prompt.contains("grammarTips"));
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = degraded_result("text", REFERENCE);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["originalText"], REFERENCE);
        assert!(json["grammarTips"].as_array().unwrap().is_empty());
    }
}
