/*!
 * Prompt templates.
 *
 * Every template asks for a single JSON object whose shape matches one of
 * the schemas in `llm::schema`.
 */

use serde_json::Value;

/// Prompt template with `{name}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: &'static str,
}

impl PromptTemplate {
    pub const SPLIT: &'static str = r#"## Role
You are a professional subtitle splitter for {language}.

## Task
Split the sentence below into {parts} parts, each no longer than {word_limit} words.
1. Keep each part semantically complete and natural to read.
2. Prefer breaks at punctuation, conjunctions or clause boundaries.
3. Do not add, remove or reorder words. Mark each break with [br].
4. Give two different ways to split, compare them, then choose the better one.

## Sentence
{sentence}

## Output
Return only a JSON object:
{
    "analysis": "brief analysis of the sentence structure",
    "split_1": "first way, with [br] at each break",
    "split_2": "second way, with [br] at each break",
    "eval": "which way reads better and why",
    "best": "1 or 2"
}"#;

    pub const ALIGN: &'static str = r#"## Role
You align {source_language} subtitles with their {target_language} translation.

## Task
The original subtitle was split into {parts} parts. Split the translation the
same way so that each translated part matches its source part in meaning.
Give two candidate alignments and choose the better one.

## Original subtitle
{source}

## Translation
{translation}

## Source parts
{source_parts}

## Output
Return only a JSON object:
{
    "analysis": "how the translation maps onto the source parts",
{align_shape}
    "best": "1 or 2"
}"#;

    pub const TRIM: &'static str = r#"## Role
You shorten subtitles for dubbing.

## Task
The subtitle below takes too long to speak. It must be spoken within {duration} seconds.
Shorten it while keeping its meaning: drop filler words, merge repeated ideas,
remove unnecessary punctuation. Keep the original language.

## Subtitle
{text}

## Output
Return only a JSON object:
{
    "analysis": "what can be removed",
    "trans_text_processed": "the shortened subtitle"
}"#;

    pub const FAITHFULNESS: &'static str = r#"## Role
You are a professional subtitle translator from {source_language} to {target_language}.

## Task
Translate each line below literally and accurately, one translation per line.
Keep the line count and order unchanged.

## Lines
{lines}

## Output
Return only a JSON object with one entry per line:
{shape}"#;

    pub const EXPRESSIVENESS: &'static str = r#"## Role
You are a professional subtitle editor for {target_language}.

## Task
Each line below has a literal translation. Reflect on its fluency, then give a
free translation that sounds natural to a native {target_language} viewer while
keeping the meaning. Keep the line count and order unchanged.

## Lines with literal translations
{faithful}

## Output
Return only a JSON object with one entry per line:
{shape}"#;

    pub const fn new(template: &'static str) -> Self {
        Self { template }
    }

    /// Replace each `{name}` with its value
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        vars.iter().fold(self.template.to_string(), |acc, (name, value)| {
            acc.replace(&format!("{{{}}}", name), value)
        })
    }
}

/// Ask for a meaning-preserving split into `parts` parts
pub fn split_prompt(sentence: &str, parts: usize, word_limit: usize, language: &str) -> String {
    PromptTemplate::new(PromptTemplate::SPLIT).render(&[
        ("language", language),
        ("parts", &parts.to_string()),
        ("word_limit", &word_limit.to_string()),
        ("sentence", sentence),
    ])
}

/// Ask how `translation` splits along `source_parts`
pub fn align_prompt(source: &str, translation: &str, source_parts: &[String], source_language: &str, target_language: &str) -> String {
    let listed: Vec<String> = source_parts
        .iter()
        .enumerate()
        .map(|(i, part)| format!("{}. {}", i + 1, part))
        .collect();

    let mut shape = String::new();
    for candidate in 1..=2 {
        let fields: Vec<String> = (1..=source_parts.len())
            .map(|k| format!("\"target_part_{}\": \"translation of part {}\"", k, k))
            .collect();
        shape.push_str(&format!("    \"align_{}\": {{{}}},\n", candidate, fields.join(", ")));
    }
    let shape = shape.trim_end_matches('\n').to_string();

    PromptTemplate::new(PromptTemplate::ALIGN).render(&[
        ("source_language", source_language),
        ("target_language", target_language),
        ("parts", &source_parts.len().to_string()),
        ("source", source),
        ("translation", translation),
        ("source_parts", &listed.join("\n")),
        ("align_shape", &shape),
    ])
}

/// Ask for a shorter version of `text` that fits `duration` seconds
pub fn trim_prompt(text: &str, duration: f64) -> String {
    PromptTemplate::new(PromptTemplate::TRIM).render(&[("duration", &format!("{:.2}", duration)), ("text", text)])
}

fn numbered_shape(line_count: usize, fields: &[&str]) -> String {
    let entries: Vec<String> = (1..=line_count)
        .map(|i| {
            let inner: Vec<String> = fields.iter().map(|f| format!("\"{}\": \"...\"", f)).collect();
            format!("    \"{}\": {{{}}}", i, inner.join(", "))
        })
        .collect();
    format!("{{\n{}\n}}", entries.join(",\n"))
}

/// Literal translation of each line
pub fn faithfulness_prompt(lines: &[String], source_language: &str, target_language: &str) -> String {
    PromptTemplate::new(PromptTemplate::FAITHFULNESS).render(&[
        ("source_language", source_language),
        ("target_language", target_language),
        ("lines", &lines.join("\n")),
        ("shape", &numbered_shape(lines.len(), &["origin", "direct"])),
    ])
}

/// Free translation built on a faithfulness response
pub fn expressiveness_prompt(faithful: &Value, line_count: usize, target_language: &str) -> String {
    let faithful = serde_json::to_string_pretty(faithful).unwrap_or_else(|_| faithful.to_string());
    PromptTemplate::new(PromptTemplate::EXPRESSIVENESS).render(&[
        ("target_language", target_language),
        ("faithful", &faithful),
        ("shape", &numbered_shape(line_count, &["origin", "direct", "reflection", "free"])),
    ])
}
