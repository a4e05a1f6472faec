/*!
 * Integration tests for the display and audio paths with mock backends
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;

use cuealign::file_utils::FileManager;
use cuealign::llm::MockService;
use cuealign::pipeline::PipelineReport;
use cuealign::subtitle::SubtitleVariant;
use cuealign::subtitle::render::{AudioTaskRow, parse_srt_cues};
use cuealign::{Cue, Pipeline, Sentence};

use crate::common;
use crate::common::mock_services::{expressiveness_reply, fallback_client, faithfulness_reply, mock_client, trim_reply};

fn untranslated() -> Vec<Sentence> {
    common::sample_sentences()
        .into_iter()
        .map(|s| Sentence::new(s.source, ""))
        .collect()
}

fn read_tasks(dir: &std::path::Path) -> Result<Vec<AudioTaskRow>> {
    let content = FileManager::read_to_string(dir.join("output/audio/tts_tasks.json"))?;
    Ok(serde_json::from_str(&content)?)
}

/// Translated input whose lines all fit their cues needs no completion calls
#[tokio::test]
async fn test_run_translatedInput_shouldWriteEverythingWithoutRequests() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let service = MockService::failing();
    let pipeline = Pipeline::new(common::test_config(temp_dir.path()), mock_client(service.clone()))?;

    let report = pipeline.run(&common::sample_words(), common::sample_sentences(), None).await?;

    assert_eq!(service.request_count(), 0);
    assert_eq!(report.cues, 3);
    assert_eq!(report.audio_tasks, 3);
    assert_eq!(report.files.len(), 6);
    assert!(!report.is_degraded());

    // Short cues are lengthened to the minimum duration when the next cue allows it
    let content = FileManager::read_to_string(temp_dir.path().join("output/trans_subtitles.srt"))?;
    let cues = parse_srt_cues(&content, SubtitleVariant::Translation)?;
    assert_eq!((cues[0].start, cues[0].end), (0.0, 2.5));
    assert_eq!(cues[0].translation, "大家早上好");

    let tasks = read_tasks(temp_dir.path())?;
    let numbers: Vec<usize> = tasks.iter().map(|t| t.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(tasks[1].text, "今天我们谈谈河流。");
    assert_eq!(tasks[1].origin, "Today we talk about rivers.");
    Ok(())
}

#[tokio::test]
async fn test_run_missingTranslations_shouldTranslateInTwoSteps() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let pairs = [
        ("Good morning, everyone.", "大家早上好。"),
        ("Today we talk about rivers.", "今天我们谈谈河流。"),
        ("They shape the land.", "它们塑造了大地。"),
    ];
    let service = MockService::working().with_script([faithfulness_reply(&pairs), expressiveness_reply(&pairs)]);

    let progress_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&progress_calls);
    let pipeline = Pipeline::new(common::test_config(temp_dir.path()), mock_client(service.clone()))?
        .with_progress(Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

    let report = pipeline.run(&common::sample_words(), untranslated(), None).await?;

    assert_eq!(service.request_count(), 2);
    let prompts = service.prompts();
    assert!(prompts[0].contains("They shape the land."));
    assert_eq!(report.untranslated_lines, 0);
    assert!(report.unsplit_sentences.is_empty());
    assert!(progress_calls.load(Ordering::SeqCst) > 0);

    let tasks = read_tasks(temp_dir.path())?;
    assert_eq!(tasks[2].text, "它们塑造了大地。");
    Ok(())
}

#[tokio::test]
async fn test_run_translationUnavailable_shouldKeepSourceText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let pipeline = Pipeline::new(common::test_config(temp_dir.path()), mock_client(MockService::failing()))?;

    let report = pipeline.run(&common::sample_words(), untranslated(), None).await?;

    assert_eq!(report.untranslated_lines, 3);
    assert!(report.is_degraded());
    let tasks = read_tasks(temp_dir.path())?;
    assert_eq!(tasks[0].text, "Good morning, everyone.");
    Ok(())
}

#[tokio::test]
async fn test_run_secondBackend_shouldServeWhenFirstFails() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let pairs = [
        ("Good morning, everyone.", "早上好。"),
        ("Today we talk about rivers.", "今天谈河流。"),
        ("They shape the land.", "它们塑造大地。"),
    ];
    let broken = MockService::garbage().named("broken", "model-a");
    let backup = MockService::working()
        .named("backup", "model-b")
        .with_script([faithfulness_reply(&pairs), expressiveness_reply(&pairs)]);
    let pipeline = Pipeline::new(
        common::test_config(temp_dir.path()),
        fallback_client(vec![broken.clone(), backup.clone()]),
    )?;

    let report = pipeline.run(&common::sample_words(), untranslated(), None).await?;

    assert_eq!(report.untranslated_lines, 0);
    assert_eq!(broken.request_count(), 2);
    assert_eq!(backup.request_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_run_cuesTooWideAndServiceDown_shouldReportTooLong() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path());
    config.subtitle.max_length = 10;
    config.split.max_attempts = 1;
    config.split.max_split_rounds = 1;
    let pipeline = Pipeline::new(config, mock_client(MockService::failing()))?;

    let report = pipeline.run(&common::sample_words(), common::sample_sentences(), None).await?;

    assert_eq!(report.cues, 3);
    assert_eq!(report.too_long_cues, 3);
    assert!(report.is_degraded());
    Ok(())
}

#[tokio::test]
async fn test_audioTasks_longTranslation_shouldBeTrimmed() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let service = MockService::working().with_script([trim_reply("河流很长。")]);
    let pipeline = Pipeline::new(common::test_config(temp_dir.path()), mock_client(service.clone()))?;

    let cues = vec![Cue::new(
        1,
        0.0,
        3.0,
        "Rivers are long.",
        "河流非常非常非常长，比你想象的还要长得多得多得多。",
    )];
    let mut report = PipelineReport::default();
    let (trimmed, tasks) = pipeline.audio_tasks(&cues, None, &mut report).await;

    assert_eq!(service.request_count(), 1);
    assert_eq!(trimmed[0].translation, "河流很长。");
    assert_eq!(tasks[0].text, "河流很长。");
    assert_eq!(report.trim_fallbacks, 0);
    Ok(())
}

#[tokio::test]
async fn test_audioTasks_trimUnavailable_shouldStripPunctuation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let pipeline = Pipeline::new(common::test_config(temp_dir.path()), mock_client(MockService::failing()))?;

    let cues = vec![Cue::new(
        1,
        0.0,
        3.0,
        "Rivers are long.",
        "河流，非常，非常，非常长，比你想象的，还要长得多得多。",
    )];
    let mut report = PipelineReport::default();
    let (_, tasks) = pipeline.audio_tasks(&cues, None, &mut report).await;

    assert!(report.trim_fallbacks >= 1);
    assert!(!tasks[0].text.contains('，'));
    assert!(!tasks[0].text.contains('。'));
    Ok(())
}

#[tokio::test]
async fn test_runAudio_fromWrittenSubtitle_shouldExtendLastCueToMediaEnd() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let pipeline = Pipeline::new(common::test_config(temp_dir.path()), mock_client(MockService::failing()))?;
    pipeline.run(&common::sample_words(), common::sample_sentences(), None).await?;

    let subtitle = FileManager::read_to_string(temp_dir.path().join("output/audio/bilingual_subs_for_audio.srt"))?;
    let report = pipeline.run_audio(&subtitle, Some(10.0)).await?;

    assert_eq!(report.audio_tasks, 3);
    let tasks = read_tasks(temp_dir.path())?;
    assert_eq!(tasks[2].start_time, "00:00:07.000");
    assert_eq!(tasks[2].end_time, "00:00:09.500");
    assert_eq!(tasks[2].origin, "They shape the land.");
    Ok(())
}
