/*!
 * Structured response validation.
 *
 * Every structured request names the schema its answer must satisfy. A
 * response that fails validation is treated like a failed request: the client
 * moves on to the next backend or retries.
 */

use serde_json::{Map, Value};

use crate::errors::SchemaViolation;

/// Shape expected from a structured completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSchema {
    /// `{"1": {"origin", "direct"}, ...}` with one entry per line
    Faithfulness { lines: usize },
    /// `{"1": {"origin", "direct", "reflection", "free"}, ...}` with one entry per line
    Expressiveness { lines: usize },
    /// `analysis`, `split_1`, `split_2`, `eval` and `best`
    Split,
    /// `analysis` and `trans_text_processed`
    Trim,
    /// `best` plus an `align_<best>` object of `target_part_<k>` strings
    Align { parts: usize },
    /// Any JSON object
    Object,
}

impl ResponseSchema {
    pub fn name(&self) -> &'static str {
        match self {
            ResponseSchema::Faithfulness { .. } => "faithfulness",
            ResponseSchema::Expressiveness { .. } => "expressiveness",
            ResponseSchema::Split => "split",
            ResponseSchema::Trim => "trim",
            ResponseSchema::Align { .. } => "align",
            ResponseSchema::Object => "object",
        }
    }

    fn violation(&self, reason: impl Into<String>) -> SchemaViolation {
        SchemaViolation::new(self.name(), reason)
    }

    /// Check a parsed response against this schema
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        let object = value
            .as_object()
            .ok_or_else(|| self.violation("response must be a JSON object"))?;

        match self {
            ResponseSchema::Faithfulness { lines } => self.validate_numbered(object, *lines, &["origin", "direct"]),
            ResponseSchema::Expressiveness { lines } => {
                self.validate_numbered(object, *lines, &["origin", "direct", "reflection", "free"])
            }
            ResponseSchema::Split => {
                if !object.contains_key("best") {
                    return Err(self.violation("missing required key `best`"));
                }
                self.require_strings(object, &["analysis", "split_1", "split_2", "eval"])
            }
            ResponseSchema::Trim => self.require_strings(object, &["analysis", "trans_text_processed"]),
            ResponseSchema::Align { parts } => {
                let best = object
                    .get("best")
                    .ok_or_else(|| self.violation("missing required key `best`"))?;
                let best = best_choice(best).ok_or_else(|| self.violation("`best` is not a number"))?;
                let key = format!("align_{}", best);
                let Some(Value::Object(alignment)) = object.get(&key) else {
                    return Err(self.violation(format!("missing object `{}`", key)));
                };
                // Individual parts may be missing, but not all of them
                let any_part = (1..=*parts).any(|k| alignment.get(&format!("target_part_{}", k)).is_some_and(Value::is_string));
                if *parts > 0 && !any_part {
                    return Err(self.violation(format!("`{}` has no target parts", key)));
                }
                Ok(())
            }
            ResponseSchema::Object => Ok(()),
        }
    }

    fn require_strings(&self, object: &Map<String, Value>, keys: &[&str]) -> Result<(), SchemaViolation> {
        for key in keys {
            match object.get(*key) {
                Some(Value::String(s)) if !s.trim().is_empty() => {}
                Some(_) => return Err(self.violation(format!("key `{}` must be a non-empty string", key))),
                None => return Err(self.violation(format!("missing required key `{}`", key))),
            }
        }
        Ok(())
    }

    fn validate_numbered(&self, object: &Map<String, Value>, lines: usize, sub_keys: &[&str]) -> Result<(), SchemaViolation> {
        if object.len() != lines {
            return Err(self.violation(format!("expected {} lines, got {}", lines, object.len())));
        }
        for i in 1..=lines {
            let key = i.to_string();
            let entry = object
                .get(&key)
                .ok_or_else(|| self.violation(format!("keys must be consecutive numbers, `{}` is missing", key)))?;
            let entry = entry
                .as_object()
                .ok_or_else(|| self.violation(format!("value of `{}` must be an object", key)))?;
            for sub_key in sub_keys {
                if !entry.contains_key(*sub_key) {
                    return Err(self.violation(format!("`{}` is missing `{}`", key, sub_key)));
                }
            }
            if !entry.values().all(Value::is_string) {
                return Err(self.violation(format!("all values of `{}` must be strings", key)));
            }
        }
        Ok(())
    }
}

/// Read a `best` field that may be a number, a numeric string or prose mentioning a number
pub fn best_choice(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize).or_else(|| n.as_f64().map(|f| f as usize)),
        Value::String(s) => s
            .trim()
            .parse::<usize>()
            .ok()
            .or_else(|| s.chars().find(|c| ('1'..='9').contains(c)).and_then(|c| c.to_digit(10)).map(|d| d as usize)),
        _ => None,
    }
}

/// Parse model output as JSON, tolerating code fences and surrounding prose
pub fn parse_lenient(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty response".to_string());
    }

    let unfenced = strip_code_fence(trimmed);
    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return Ok(value);
    }

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => serde_json::from_str::<Value>(&unfenced[start..=end])
            .map_err(|e| format!("invalid JSON: {}", e)),
        _ => Err("no JSON object found in response".to_string()),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
