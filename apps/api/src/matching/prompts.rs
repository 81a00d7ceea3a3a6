// Rerank prompt variants, tried in order until the model covers every job.

/// Base instruction: one JSON item per submitted job, fixed schema.
pub const RERANK_BASE_PROMPT: &str = "You are a ranking function. \
    Return only a JSON array (no code fences, no prose) with one item PER job provided (do not drop any). \
    Use this shape exactly for every job: \
    [{\"job_id\": \"string\", \"score_0_to_100\": 0-100 integer, \"strengths\": [\"string\"], \
    \"gaps\": [\"string\"], \"short_reason\": \"string\"}]. \
    If there are no matches, return [].";

/// Second attempt: the base instruction plus an explicit array-only constraint.
pub const RERANK_STRICT_SUFFIX: &str =
    " Respond ONLY with the JSON array. Begin with '[' and end with ']'.";

/// Final attempt: minimal fallback.
pub const RERANK_FALLBACK_PROMPT: &str = "Return ONLY the JSON array of matches using the exact shape above. \
    If unsure, return an empty array [].";

/// The escalating system prompts, in the order they are tried.
pub fn rerank_prompts() -> Vec<String> {
    vec![
        RERANK_BASE_PROMPT.to_string(),
        format!("{RERANK_BASE_PROMPT}{RERANK_STRICT_SUFFIX}"),
        RERANK_FALLBACK_PROMPT.to_string(),
    ]
}
