/*!
 * Integration tests for alignment from input files to subtitle files
 */

use anyhow::Result;

use cuealign::errors::AlignError;
use cuealign::file_utils::FileManager;
use cuealign::llm::MockService;
use cuealign::subtitle::render::parse_srt_cues;
use cuealign::subtitle::{AlignStrategy, SubtitleVariant, UnmatchedSentence};
use cuealign::{Pipeline, Sentence};

use crate::common;
use crate::common::mock_services::mock_client;

/// Load inputs from disk, align them and read the written subtitles back
#[test]
fn test_alignmentWorkflow_withFilesOnDisk_shouldWriteFourVariants() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let words_path = common::create_test_file(temp_dir.path(), "words.json", &common::sample_words_json())?;
    let tsv: String = common::sample_sentences()
        .iter()
        .map(|s| format!("{}\t{}\n", s.source, s.translation))
        .collect();
    let sentences_path = common::create_test_file(temp_dir.path(), "sentences.tsv", &tsv)?;

    let words = FileManager::load_words(&words_path)?;
    let sentences = FileManager::load_sentences(&sentences_path)?;

    let service = MockService::failing();
    let pipeline = Pipeline::new(common::test_config(temp_dir.path()), mock_client(service.clone()))?;
    let report = pipeline.run_alignment(&words, &sentences)?;

    assert_eq!(report.cues, 3);
    assert!(report.unmatched.is_empty());
    assert_eq!(report.files.len(), 4);
    assert_eq!(service.request_count(), 0, "alignment must not call the completion service");

    let source_path = temp_dir.path().join("output").join(SubtitleVariant::Source.default_file_name());
    let cues = parse_srt_cues(&FileManager::read_to_string(&source_path)?, SubtitleVariant::Source)?;
    let times: Vec<(f64, f64)> = cues.iter().map(|c| (c.start, c.end)).collect();
    assert_eq!(times, vec![(0.0, 1.8), (3.0, 5.2), (7.0, 8.8)]);
    assert_eq!(cues[1].source, "Today we talk about rivers.");

    for variant in SubtitleVariant::ALL {
        assert!(FileManager::file_exists(temp_dir.path().join("output").join(variant.default_file_name())));
    }
    Ok(())
}

#[test]
fn test_alignmentWorkflow_unmatchedSentence_shouldWriteDiagnostics() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let diagnostics = temp_dir.path().join("unmatched.json");

    let mut config = common::test_config(temp_dir.path());
    config.alignment.diagnostics_file = Some(diagnostics.to_string_lossy().to_string());

    let mut sentences = common::sample_sentences();
    sentences.insert(1, Sentence::new("Zebras never visit this meeting.", ""));

    let pipeline = Pipeline::new(config, mock_client(MockService::failing()))?;
    let report = pipeline.run_alignment(&common::sample_words(), &sentences)?;

    // The other sentences keep their own timings
    assert_eq!(report.cues, 3);
    assert_eq!(report.unmatched.len(), 1);
    assert_eq!(report.unmatched[0].index, 1);
    assert!(report.is_degraded());

    let source_path = temp_dir.path().join("output").join(SubtitleVariant::Source.default_file_name());
    let cues = parse_srt_cues(&FileManager::read_to_string(&source_path)?, SubtitleVariant::Source)?;
    let times: Vec<(f64, f64)> = cues.iter().map(|c| (c.start, c.end)).collect();
    assert_eq!(times, vec![(0.0, 1.8), (3.0, 5.2), (7.0, 8.8)]);

    let written: Vec<UnmatchedSentence> = serde_json::from_str(&FileManager::read_to_string(&diagnostics)?)?;
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].index, 1);
    assert_eq!(written[0].diff, report.unmatched[0].diff);
    assert_eq!(written[0].expected, "zebras never visit this meeting");
    Ok(())
}

/// Aligned cues can feed the audio path directly
#[test]
fn test_alignmentWorkflow_thenAudio_shouldProduceOneTaskPerCue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let pipeline = Pipeline::new(common::test_config(temp_dir.path()), mock_client(MockService::failing()))?;
    let report = pipeline.run_alignment(&common::sample_words(), &common::sample_sentences())?;

    let bilingual = temp_dir
        .path()
        .join("output")
        .join(SubtitleVariant::SourceTranslation.default_file_name());
    let content = FileManager::read_to_string(&bilingual)?;

    let audio = tokio_test::block_on(async { pipeline.run_audio(&content, None).await })?;
    assert_eq!(audio.audio_tasks, report.cues);
    Ok(())
}

#[test]
fn test_alignmentWorkflow_strictMode_shouldFailOnMiss() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path());
    config.alignment.fuzzy_fallback = false;
    config.alignment.strict = true;

    let mut sentences = common::sample_sentences();
    sentences.push(Sentence::new("Nothing like this was said.", ""));

    let pipeline = Pipeline::new(config, mock_client(MockService::failing()))?;
    let error = match pipeline.run_alignment(&common::sample_words(), &sentences) {
        Ok(_) => panic!("strict alignment should fail on a missing sentence"),
        Err(error) => error,
    };
    assert!(matches!(
        error.downcast_ref::<AlignError>(),
        Some(AlignError::Unmatched { index: 3, .. })
    ));
    Ok(())
}

#[test]
fn test_alignmentWorkflow_fuzzyStrategy_shouldTolerateTranscriptionErrors() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path());
    config.alignment.strategy = AlignStrategy::Fuzzy;

    let sentences = vec![
        Sentence::new("Good morning everybody.", ""),
        Sentence::new("Today we talk about rivers.", ""),
        Sentence::new("They shape the lands.", ""),
    ];

    let pipeline = Pipeline::new(config, mock_client(MockService::failing()))?;
    let report = pipeline.run_alignment(&common::sample_words(), &sentences)?;
    assert_eq!(report.cues, 3);
    assert!(report.unmatched.is_empty());
    Ok(())
}
