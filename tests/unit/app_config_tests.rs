/*!
 * Tests for configuration loading and validation
 */

use cuealign::app_config::{Config, LogLevel};
use cuealign::subtitle::{AlignStrategy, SubtitleVariant};
use cuealign::text::{Joiner, TokenizerBackend};

#[test]
fn test_default_shouldValidateAndRoundTripThroughJson() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let json = serde_json::to_string_pretty(&config).unwrap();
    let reloaded: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(reloaded.language, config.language);
    assert_eq!(reloaded.outputs.audio_tasks, "tts_tasks.json");
    assert_eq!(reloaded.log_level, LogLevel::Info);
}

#[test]
fn test_deserialize_emptyObject_shouldUseDefaults() {
    let config: Config = serde_json::from_str("{}").unwrap();
    assert_eq!(config.language, "en");
    assert_eq!(config.target_language, "zh");
    assert_eq!(config.subtitle.target_multiplier, 1.2);
    assert_eq!(config.alignment.strategy, AlignStrategy::Exact);
    assert_eq!(config.alignment.search_span, 300);
    assert_eq!(config.split.word_limit, 18);
    assert_eq!(config.trim_passes, 2);
}

#[test]
fn test_validate_unknownTargetLanguage_shouldFail() {
    let config = Config {
        target_language: "xx".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_autoLanguageWithoutDetection_shouldFail() {
    let config = Config {
        language: "auto".to_string(),
        detected_language: None,
        ..Config::default()
    };
    assert!(config.validate().is_err());

    let config = Config {
        detected_language: Some("ja".to_string()),
        ..config
    };
    assert!(config.validate().is_ok());
    assert_eq!(config.resolved_tokenizer().unwrap(), TokenizerBackend::Characters);
}

#[test]
fn test_validate_zeroMaxLength_shouldFail() {
    let mut config = Config::default();
    config.subtitle.max_length = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_acceptScoreOutOfRange_shouldFail() {
    let mut config = Config::default();
    config.alignment.accept_score = 1.5;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_excessiveHttpRetries_shouldFail() {
    let mut config = Config::default();
    config.llm.http_retries = 64;
    let error = config.validate().unwrap_err();
    assert!(error.to_string().contains("http_retries"));

    config.llm.http_retries = 10;
    assert!(config.validate().is_ok());
}

#[test]
fn test_alignmentOptions_unspacedLanguage_shouldJoinWithoutSpaces() {
    let config = Config::default();
    assert_eq!(config.alignment.options("zh").joiner, Joiner::Empty);
    assert_eq!(config.alignment.options("en").joiner, Joiner::Space);

    let policy = config.alignment.timing_policy();
    assert_eq!(policy.overlap_margin, 0.1);
    assert_eq!(policy.bridge_gap_below, 1.0);
}

#[test]
fn test_outputFileName_shouldFollowVariant() {
    let config = Config::default();
    for variant in SubtitleVariant::ALL {
        assert_eq!(config.outputs.file_name(variant), variant.default_file_name());
    }
}
