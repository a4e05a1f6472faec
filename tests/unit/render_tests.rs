/*!
 * Tests for SRT and audio-task output
 */

use cuealign::subtitle::SubtitleVariant;
use cuealign::subtitle::render::{AudioTaskRow, format_srt_timestamp, parse_srt_cues, render_audio_tasks, render_srt};
use cuealign::{AudioTask, Cue};

fn sample() -> Vec<Cue> {
    vec![
        Cue::new(1, 0.0, 2.5, "Good morning, everyone.", "大家早上好。"),
        Cue::new(2, 3.0, 5.2, "Today we talk about rivers.", "今天，我们谈谈河流。"),
    ]
}

#[test]
fn test_formatSrtTimestamp_shouldRoundToMillis() {
    assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
    assert_eq!(format_srt_timestamp(3661.2346), "01:01:01,235");
}

#[test]
fn test_renderSrt_translationSource_shouldPutTranslationFirst() {
    let srt = render_srt(&sample(), SubtitleVariant::TranslationSource, true);
    let expected_start = "1\n00:00:00,000 --> 00:00:02,500\n大家早上好\nGood morning, everyone.\n\n";
    assert!(srt.starts_with(expected_start), "unexpected SRT:\n{}", srt);
    assert!(srt.contains("今天 我们谈谈河流"));
}

#[test]
fn test_renderSrt_withoutPolish_shouldKeepFullWidthPunctuation() {
    let srt = render_srt(&sample(), SubtitleVariant::Translation, false);
    assert!(srt.contains("今天，我们谈谈河流。"));
    assert!(!srt.contains("Good morning"));
}

#[test]
fn test_parseSrtCues_bilingual_shouldRecoverBothLines() {
    let srt = render_srt(&sample(), SubtitleVariant::SourceTranslation, false);
    let cues = parse_srt_cues(&srt, SubtitleVariant::SourceTranslation).unwrap();
    assert_eq!(cues, sample());
}

#[test]
fn test_parseSrtCues_noBlocks_shouldFail() {
    assert!(parse_srt_cues("just some text", SubtitleVariant::Source).is_err());
}

#[test]
fn test_renderAudioTasks_shouldUseDottedTimestamps() {
    let tasks: Vec<AudioTask> = sample().iter().map(AudioTask::from_cue).collect();
    let json = render_audio_tasks(&tasks).unwrap();
    let rows: Vec<AudioTaskRow> = serde_json::from_str(&json).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].number, 2);
    assert_eq!(rows[1].start_time, "00:00:03.000");
    assert_eq!(rows[1].end_time, "00:00:05.200");
    assert!((rows[1].duration - 2.2).abs() < 1e-9);
    assert_eq!(rows[1].text, "今天，我们谈谈河流。");
    assert_eq!(rows[1].origin, "Today we talk about rivers.");
}
