/*!
 * Mock completion backends and canned replies for tests
 */

use std::sync::Arc;

use cuealign::llm::{CompletionService, LlmClient, MockService, RequestLog};
use serde_json::json;

/// Client over a single mock backend with an in-memory request log
pub fn mock_client(service: MockService) -> LlmClient {
    LlmClient::new(vec![Arc::new(service) as Arc<dyn CompletionService>], RequestLog::in_memory()).with_retry_count(1)
}

/// Client trying each backend in order
pub fn fallback_client(services: Vec<MockService>) -> LlmClient {
    let backends = services
        .into_iter()
        .map(|s| Arc::new(s) as Arc<dyn CompletionService>)
        .collect();
    LlmClient::new(backends, RequestLog::in_memory()).with_retry_count(1)
}

/// Literal translation reply for `pairs` of (source, translation)
pub fn faithfulness_reply(pairs: &[(&str, &str)]) -> String {
    let mut object = serde_json::Map::new();
    for (i, (origin, direct)) in pairs.iter().enumerate() {
        object.insert((i + 1).to_string(), json!({"origin": origin, "direct": direct}));
    }
    serde_json::Value::Object(object).to_string()
}

/// Free translation reply for `pairs` of (source, translation)
pub fn expressiveness_reply(pairs: &[(&str, &str)]) -> String {
    let mut object = serde_json::Map::new();
    for (i, (origin, free)) in pairs.iter().enumerate() {
        object.insert(
            (i + 1).to_string(),
            json!({"origin": origin, "direct": free, "reflection": "reads naturally", "free": free}),
        );
    }
    serde_json::Value::Object(object).to_string()
}

/// Trim reply carrying `text` as the shortened translation
pub fn trim_reply(text: &str) -> String {
    json!({"analysis": "too long for the cue", "trans_text_processed": text}).to_string()
}
