/*!
 * Tests for language utility functions
 */

use cuealign::language_utils::{display_name, get_language_name, normalize_to_part1_or_part2t, resolve_language};

/// Test normalization of language codes
#[test]
fn test_normalize_withValidCodes_shouldReturnPart1() {
    assert_eq!(normalize_to_part1_or_part2t("en").unwrap(), "en");
    assert_eq!(normalize_to_part1_or_part2t("eng").unwrap(), "en");
    assert_eq!(normalize_to_part1_or_part2t("fre").unwrap(), "fr");
    assert_eq!(normalize_to_part1_or_part2t(" DE ").unwrap(), "de");
    assert_eq!(normalize_to_part1_or_part2t("zh-CN").unwrap(), "zh");
    assert_eq!(normalize_to_part1_or_part2t("pt_BR").unwrap(), "pt");
}

#[test]
fn test_normalize_withInvalidCodes_shouldFail() {
    assert!(normalize_to_part1_or_part2t("xyz").is_err());
    assert!(normalize_to_part1_or_part2t("e").is_err());
    assert!(normalize_to_part1_or_part2t("").is_err());
}

#[test]
fn test_getLanguageName_shouldReturnEnglishName() {
    assert_eq!(get_language_name("ja").unwrap(), "Japanese");
    assert_eq!(get_language_name("ger").unwrap(), "German");
    assert_eq!(display_name("not-a-code"), "not-a-code");
}

#[test]
fn test_resolveLanguage_autoWithDetected_shouldUseDetected() {
    assert_eq!(resolve_language("auto", Some("fra")).unwrap(), "fr");
    assert_eq!(resolve_language("AUTO", Some("en")).unwrap(), "en");
    assert_eq!(resolve_language("es", Some("en")).unwrap(), "es");
    assert!(resolve_language("auto", None).is_err());
    assert!(resolve_language("auto", Some("  ")).is_err());
}
