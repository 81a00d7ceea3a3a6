//! LLM re-ranking with an escalating prompt cascade and reconciliation.
//!
//! Model output is treated as untrusted: it may be prose-wrapped, may skip
//! jobs, and may invent ids. After the cascade every submitted job has exactly
//! one `MatchResult`, unless no attempt produced parseable JSON at all, in
//! which case the result is empty and hybrid scores drive the ranking.

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::llm_client::json::{extract_embedded_json, strip_json_fences};
use crate::llm_client::{ChatMessage, ChatProvider, ChatReply, LlmError, ResponseFormat};
use crate::matching::prompts::rerank_prompts;
use crate::matching::{Candidate, MatchConfig, MatchResult};
use crate::text::truncate_chars;

/// Scores `candidates` against `resume_text` with the chat provider.
///
/// Provider failures propagate; callers decide whether to fall back.
pub async fn rerank(
    chat: &dyn ChatProvider,
    resume_text: &str,
    candidates: &[Candidate],
    config: &MatchConfig,
) -> Result<HashMap<String, MatchResult>, LlmError> {
    if candidates.is_empty() {
        return Ok(HashMap::new());
    }

    let job_ids: Vec<String> = candidates.iter().map(|c| c.job_id.clone()).collect();
    let user_content = build_payload(resume_text, candidates, config).to_string();
    info!("LLM rerank input: {} jobs sent (ids={:?})", job_ids.len(), job_ids);

    let prompts = rerank_prompts();
    // Best parse so far, with its missing-id count. Ties go to the later attempt.
    let mut best: Option<(Vec<Value>, usize)> = None;
    let mut last_raw = String::new();

    for (attempt, prompt) in prompts.iter().enumerate() {
        let messages = [
            ChatMessage::system(prompt.as_str()),
            ChatMessage::user(user_content.as_str()),
        ];
        let reply = chat.chat(&messages, Some(ResponseFormat::Json)).await?;

        let Some(items) = parse_llm_json(&reply) else {
            last_raw = reply.as_log_text();
            warn!("LLM rerank attempt {} returned no parseable JSON", attempt + 1);
            continue;
        };

        let missing = missing_ids(&job_ids, &items);
        let complete = missing.is_empty();
        if best.as_ref().map_or(true, |(_, m)| missing.len() <= *m) {
            best = Some((items, missing.len()));
        }
        if complete {
            break;
        }
        if attempt + 1 < prompts.len() {
            info!(
                "LLM rerank missing {}/{} jobs after prompt {}; retrying",
                missing.len(),
                job_ids.len(),
                attempt + 1
            );
        }
    }

    let Some((items, _)) = best else {
        warn!("LLM rerank parse failed after retries: {last_raw}");
        return Ok(HashMap::new());
    };

    Ok(reconcile(candidates, &items))
}

/// Maps parsed items onto the submitted candidates.
///
/// Unknown ids are logged and dropped. Jobs with no usable item get a result
/// synthesized from their hybrid score. Later duplicates of an id win.
pub fn reconcile(candidates: &[Candidate], items: &[Value]) -> HashMap<String, MatchResult> {
    let known: HashSet<&str> = candidates.iter().map(|c| c.job_id.as_str()).collect();
    let mut matches = HashMap::new();
    let mut unknown = Vec::new();

    for item in items {
        let Some(job_id) = item_job_id(item) else {
            continue;
        };
        if !known.contains(job_id.as_str()) {
            unknown.push(job_id);
            continue;
        }
        if let Some(result) = MatchResult::from_value(&job_id, item) {
            matches.insert(job_id, result);
        }
    }

    info!(
        "LLM rerank output: {} jobs scored ({:?})",
        matches.len(),
        matches.keys().collect::<Vec<_>>()
    );
    if !unknown.is_empty() {
        info!(
            "LLM rerank returned {} unknown job ids (not in prompt): {:?}",
            unknown.len(),
            unknown
        );
    }

    let mut filled = Vec::new();
    for candidate in candidates {
        if !matches.contains_key(&candidate.job_id) {
            matches.insert(
                candidate.job_id.clone(),
                MatchResult::filled_from_hybrid(&candidate.job_id, candidate.hybrid_score),
            );
            filled.push(candidate.job_id.as_str());
        }
    }
    if !filled.is_empty() {
        info!(
            "LLM rerank filled {} missing jobs using hybrid scores: {:?}",
            filled.len(),
            filled
        );
    }

    matches
}

/// Leniently recovers a list of items from a reply.
///
/// Structured replies are used directly. Text is de-fenced and parsed; on
/// failure the first embedded array (or object) is extracted. A bare object
/// becomes a one-item list and empty text an empty list. `None` means nothing
/// parseable was found.
pub fn parse_llm_json(reply: &ChatReply) -> Option<Vec<Value>> {
    match reply {
        ChatReply::Structured(Value::Null) => Some(Vec::new()),
        ChatReply::Structured(value) => into_items(value.clone()),
        ChatReply::Text(raw) => {
            let cleaned = strip_json_fences(raw);
            if cleaned.is_empty() {
                return Some(Vec::new());
            }
            match serde_json::from_str::<Value>(cleaned) {
                Ok(value) => into_items(value),
                Err(_) => extract_embedded_json(cleaned).and_then(into_items),
            }
        }
    }
}

/// Requested ids that no item in `items` mentions, in request order.
pub fn missing_ids(requested: &[String], items: &[Value]) -> Vec<String> {
    let returned: HashSet<String> = items.iter().filter_map(item_job_id).collect();
    requested
        .iter()
        .filter(|id| !returned.contains(id.as_str()))
        .cloned()
        .collect()
}

fn into_items(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(_) => Some(vec![value]),
        _ => None,
    }
}

/// `job_id` as a string; numeric ids are accepted and stringified.
fn item_job_id(item: &Value) -> Option<String> {
    match item.get("job_id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn build_payload(resume_text: &str, candidates: &[Candidate], config: &MatchConfig) -> Value {
    let jobs: Vec<Value> = candidates
        .iter()
        .map(|c| {
            json!({
                "job_id": c.job_id,
                "title": c.title,
                "company": c.company,
                "url": c.url,
                "source": c.source,
                "posted_at": c.posted_at,
                "distance": c.distance,
                "distance_score": c.distance_score,
                "keyword_score": c.keyword_score,
                "hybrid_score": c.hybrid_score,
                "description": truncate_chars(&c.description, config.max_llm_job_chars),
            })
        })
        .collect();

    json!({
        "resume": truncate_chars(resume_text, config.max_llm_resume_chars),
        "jobs": jobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::FILLED_FROM_HYBRID_REASON;
    use crate::test_support::{FailingProvider, ScriptedChat};

    fn candidate(job_id: &str, hybrid_score: u32) -> Candidate {
        Candidate {
            job_id: job_id.to_string(),
            title: format!("Role {job_id}"),
            company: "Acme".to_string(),
            url: format!("https://example.com/{job_id}"),
            source: "dummy".to_string(),
            posted_at: None,
            distance: 0.4,
            description: "x".repeat(50),
            distance_score: 71,
            keyword_score: 20,
            hybrid_score,
            match_result: None,
        }
    }

    fn item(job_id: &str, score: u32) -> String {
        format!(
            r#"{{"job_id": "{job_id}", "score_0_to_100": {score}, "strengths": ["rust"], "gaps": [], "short_reason": "ok"}}"#
        )
    }

    #[test]
    fn test_parse_llm_json_extracts_embedded_array() {
        let raw = r#"Based on the provided JSON data, here are insights:
        [{"job_id": "job-1", "score_0_to_100": 90, "strengths": ["python"], "gaps": [], "short_reason": "solid fit"}]
        Additional commentary."#;
        let parsed = parse_llm_json(&ChatReply::Text(raw.to_string())).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(
            parsed[0],
            json!({"job_id": "job-1", "score_0_to_100": 90, "strengths": ["python"], "gaps": [], "short_reason": "solid fit"})
        );
    }

    #[test]
    fn test_parse_llm_json_no_structure_is_none_not_empty() {
        let reply = ChatReply::Text("Just a narrative with no JSON here.".to_string());
        assert_eq!(parse_llm_json(&reply), None);
    }

    #[test]
    fn test_parse_llm_json_wraps_bare_object() {
        let reply = ChatReply::Text(format!("```json\n{}\n```", item("a", 5)));
        let parsed = parse_llm_json(&reply).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["job_id"], "a");
    }

    #[test]
    fn test_parse_llm_json_structured_passthrough() {
        let reply = ChatReply::Structured(json!([{"job_id": "a"}, {"job_id": "b"}]));
        assert_eq!(parse_llm_json(&reply).unwrap().len(), 2);
        assert_eq!(parse_llm_json(&ChatReply::Structured(Value::Null)), Some(vec![]));
        assert_eq!(parse_llm_json(&ChatReply::Structured(json!(42))), None);
    }

    #[test]
    fn test_parse_llm_json_empty_text_is_empty_list() {
        assert_eq!(parse_llm_json(&ChatReply::Text("   ".to_string())), Some(vec![]));
    }

    #[test]
    fn test_parse_llm_json_scalar_is_none() {
        assert_eq!(parse_llm_json(&ChatReply::Text("\"sure\"".to_string())), None);
    }

    #[test]
    fn test_missing_ids_preserves_request_order() {
        let requested = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let items = vec![json!({"job_id": "b"}), json!({"job_id": "zzz"}), json!({"score": 1})];
        assert_eq!(missing_ids(&requested, &items), vec!["a", "c"]);
    }

    #[test]
    fn test_reconcile_drops_unknown_and_fills_missing() {
        let candidates = vec![candidate("a", 61), candidate("b", 44)];
        let items = vec![
            json!({"job_id": "a", "score_0_to_100": 88, "strengths": [], "gaps": [], "short_reason": "good"}),
            json!({"job_id": "ghost", "score_0_to_100": 99}),
        ];
        let matches = reconcile(&candidates, &items);
        assert_eq!(matches.len(), 2);
        assert!(!matches.contains_key("ghost"));
        assert_eq!(matches["a"].score_0_to_100, 88);
        assert_eq!(matches["b"].score_0_to_100, 44);
        assert_eq!(matches["b"].short_reason, FILLED_FROM_HYBRID_REASON);
    }

    #[test]
    fn test_reconcile_fills_item_with_unusable_score() {
        let candidates = vec![candidate("a", 30)];
        let items = vec![json!({"job_id": "a", "score_0_to_100": "great"})];
        let matches = reconcile(&candidates, &items);
        assert_eq!(matches["a"].short_reason, FILLED_FROM_HYBRID_REASON);
        assert_eq!(matches["a"].score_0_to_100, 30);
    }

    #[tokio::test]
    async fn test_rerank_retries_when_first_response_not_json() {
        let chat = ScriptedChat::text(&[
            "Here are some thoughts but no JSON.",
            &format!("[{}]", item("job-x", 42)),
        ]);
        let result = rerank(&chat, "resume text", &[candidate("job-x", 10)], &MatchConfig::default())
            .await
            .unwrap();
        assert_eq!(result["job-x"].score_0_to_100, 42);
        assert_eq!(chat.call_count(), 2);
    }

    #[tokio::test]
    async fn test_rerank_stops_after_full_coverage() {
        let chat = ScriptedChat::text(&[&format!("[{}, {}]", item("a", 80), item("b", 20))]);
        let result = rerank(
            &chat,
            "resume",
            &[candidate("a", 1), candidate("b", 2)],
            &MatchConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(chat.call_count(), 1);
        assert_eq!(result["a"].score_0_to_100, 80);
        assert_eq!(result["b"].score_0_to_100, 20);
    }

    #[tokio::test]
    async fn test_rerank_partial_coverage_uses_all_prompts_then_fills() {
        let chat = ScriptedChat::text(&[&format!("[{}]", item("a", 90))]);
        let candidates = vec![candidate("a", 55), candidate("b", 47)];
        let result = rerank(&chat, "resume", &candidates, &MatchConfig::default())
            .await
            .unwrap();

        assert_eq!(chat.call_count(), 3);
        assert_eq!(result.len(), 2);
        assert_eq!(result["a"].score_0_to_100, 90);
        assert_eq!(result["b"].score_0_to_100, 47);
        assert_eq!(result["b"].short_reason, FILLED_FROM_HYBRID_REASON);
    }

    #[tokio::test]
    async fn test_rerank_prompts_escalate_in_order() {
        let chat = ScriptedChat::text(&["nope"]);
        rerank(&chat, "resume", &[candidate("a", 1)], &MatchConfig::default())
            .await
            .unwrap();

        let requests = chat.requests.lock().unwrap();
        let systems: Vec<&str> = requests.iter().map(|m| m[0].content.as_str()).collect();
        assert_eq!(systems, rerank_prompts());
        assert!(systems[1].ends_with("Begin with '[' and end with ']'."));
    }

    #[tokio::test]
    async fn test_rerank_no_parse_on_any_attempt_is_empty() {
        let chat = ScriptedChat::text(&["no json", "still none", "sorry"]);
        let result = rerank(&chat, "resume", &[candidate("a", 1)], &MatchConfig::default())
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(chat.call_count(), 3);
    }

    #[tokio::test]
    async fn test_rerank_keeps_earlier_partial_parse_when_last_attempt_unparseable() {
        let chat = ScriptedChat::text(&[&format!("[{}]", item("a", 70)), "prose", "prose"]);
        let candidates = vec![candidate("a", 10), candidate("b", 33)];
        let result = rerank(&chat, "resume", &candidates, &MatchConfig::default())
            .await
            .unwrap();
        assert_eq!(result["a"].score_0_to_100, 70);
        assert_eq!(result["b"].score_0_to_100, 33);
    }

    #[tokio::test]
    async fn test_rerank_truncates_descriptions_and_resume() {
        let chat = ScriptedChat::text(&[&format!("[{}]", item("a", 1))]);
        let config = MatchConfig {
            max_llm_job_chars: 10,
            max_llm_resume_chars: 4,
            ..MatchConfig::default()
        };
        rerank(&chat, "resume body", &[candidate("a", 1)], &config).await.unwrap();

        let requests = chat.requests.lock().unwrap();
        let payload: Value = serde_json::from_str(&requests[0][1].content).unwrap();
        assert_eq!(payload["resume"], "resu");
        assert_eq!(payload["jobs"][0]["description"].as_str().unwrap().len(), 10);
        assert_eq!(payload["jobs"][0]["job_id"], "a");
    }

    #[tokio::test]
    async fn test_rerank_provider_error_propagates() {
        let err = rerank(&FailingProvider, "resume", &[candidate("a", 1)], &MatchConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_rerank_empty_candidates_skips_provider() {
        let chat = ScriptedChat::text(&["[]"]);
        let result = rerank(&chat, "resume", &[], &MatchConfig::default()).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(chat.call_count(), 0);
    }
}
