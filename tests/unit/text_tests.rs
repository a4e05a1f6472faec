/*!
 * Tests for length metrics, normalization and matching
 */

use cuealign::text::{
    Joiner, SpeechRates, SpeedFactor, Tokenizer, TokenizerBackend, estimate_speech, normalize, render_diff, similarity,
    truncate_text, visual_width,
};

#[test]
fn test_visualWidth_mixedScripts_shouldWeightWideCharacters() {
    assert_eq!(visual_width("abc"), 3.0);
    assert_eq!(visual_width("你好"), 3.5);
    assert_eq!(visual_width("한국"), 3.0);
    assert_eq!(visual_width("a你"), 2.75);
}

#[test]
fn test_estimateSpeech_cjkWithPause_shouldCountMarksBeforeText() {
    let estimate = estimate_speech("你好，世界。", &SpeechRates::default(), &SpeedFactor::default());
    assert_eq!(estimate.cjk_chars, 4);
    assert_eq!(estimate.words, 0);
    // The trailing full stop is not followed by anything
    assert_eq!(estimate.punctuation, 1);
    assert!((estimate.seconds - 1.25).abs() < 1e-9);
}

#[test]
fn test_estimateSpeech_fasterSpeed_shouldShortenEstimate() {
    let rates = SpeechRates::default();
    let normal = estimate_speech("Hello, world.", &rates, &SpeedFactor::default());
    let fast = estimate_speech("Hello, world.", &rates, &SpeedFactor { normal: 1.0, max: 2.0 });
    assert_eq!(normal.words, 2);
    assert!((normal.seconds - 0.65).abs() < 1e-9);
    assert!((fast.seconds - normal.seconds / 2.0).abs() < 1e-9);
}

#[test]
fn test_normalize_shouldLowercaseAndStripPunctuation() {
    assert_eq!(normalize("Well,  it's   FINE!"), "well its fine");
    assert_eq!(normalize("你好，世界。"), "你好世界");
}

#[test]
fn test_joiner_shouldFollowLanguage() {
    assert_eq!(Joiner::for_language("ja").join(&["東京", "です"]), "東京です");
    assert_eq!(Joiner::for_language("en-US").join(&["new", "york"]), "new york");
}

#[test]
fn test_tokenizer_backends_shouldCountDifferently() {
    let text = "state-of-the-art models";
    assert_eq!(TokenizerBackend::Whitespace.count(text), 2);
    assert!(TokenizerBackend::Unicode.count(text) >= 2);
    assert_eq!(TokenizerBackend::Characters.count("東京です"), 4);
}

#[test]
fn test_similarity_andDiff_shouldDescribeTypo() {
    let score = similarity("the quick brown fox", "the quick brown fax");
    assert!(score > 0.9 && score < 1.0);
    let diff = render_diff("brown fox", "brown fax");
    assert!(diff.starts_with("brown f"));
    assert!(diff.contains("[-o-]"));
    assert!(diff.contains("{+a+}"));
}

#[test]
fn test_truncateText_longText_shouldAddEllipsis() {
    assert_eq!(truncate_text("abcdef", 3), "abc...");
    assert_eq!(truncate_text("abc", 3), "abc");
}
