/*!
 * Tests for input loading and file writing
 */

use anyhow::Result;

use cuealign::Sentence;
use cuealign::file_utils::FileManager;

use crate::common;

#[test]
fn test_loadWords_fromJsonFile_shouldKeepOrderAndTimes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "words.json", &common::sample_words_json())?;

    let words = FileManager::load_words(&path)?;
    assert_eq!(words.len(), 12);
    assert_eq!(words[3].text, "Today");
    assert_eq!(words[3].index, 3);
    assert_eq!(words[11].end, 8.8);
    Ok(())
}

#[test]
fn test_loadWords_invalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "words.json", "not json")?;
    assert!(FileManager::load_words(&path).is_err());
    Ok(())
}

#[test]
fn test_loadSentences_tsvAndJson_shouldAgree() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let tsv = common::create_test_file(temp_dir.path(), "sentences.tsv", "Hello there.\tBonjour.\nSecond line\t\n")?;
    let json = common::create_test_file(
        temp_dir.path(),
        "sentences.json",
        r#"[{"source": "Hello there.", "translation": "Bonjour."}, {"source": "Second line", "translation": ""}]"#,
    )?;

    let from_tsv = FileManager::load_sentences(&tsv)?;
    let from_json = FileManager::load_sentences(&json)?;
    assert_eq!(from_tsv, from_json);
    assert_eq!(from_tsv[1], Sentence::new("Second line", ""));
    Ok(())
}

#[test]
fn test_loadSentences_missingFile_shouldFail() {
    assert!(FileManager::load_sentences("/nonexistent/sentences.tsv").is_err());
}
