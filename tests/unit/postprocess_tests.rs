/*!
 * Tests for cue post-processing
 */

use cuealign::Cue;
use cuealign::concurrency::WorkerPool;
use cuealign::llm::MockService;
use cuealign::splitter::Trimmer;
use cuealign::subtitle::postprocess::{drop_anomalies, drop_out_of_order, enforce_no_overlap, merge_short_cues, strip_asides};
use cuealign::subtitle::aligner::resolve_timing;
use cuealign::subtitle::{PostProcessor, TimingPolicy};
use cuealign::text::{SpeechRates, SpeedFactor};

use crate::common::mock_services::mock_client;

fn cue(index: usize, start: f64, end: f64, text: &str) -> Cue {
    Cue::new(index, start, end, text, text)
}

#[test]
fn test_mergeShortCues_closeSuccessor_shouldAbsorbIt() {
    let cues = vec![cue(1, 0.0, 1.0, "a"), cue(2, 1.5, 4.0, "b"), cue(3, 10.0, 13.0, "c")];
    let merged = merge_short_cues(cues, 2.5, None);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].source, "a b");
    assert_eq!((merged[0].start, merged[0].end), (0.0, 4.0));
}

#[test]
fn test_mergeShortCues_distantSuccessor_shouldExtend() {
    let cues = vec![cue(1, 0.0, 1.0, "a"), cue(2, 5.0, 8.0, "b")];
    let merged = merge_short_cues(cues, 2.5, None);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].end, 2.5);
}

#[test]
fn test_mergeShortCues_lastCue_shouldStopAtMediaEnd() {
    let cues = vec![cue(1, 0.0, 3.0, "a"), cue(2, 9.0, 9.5, "b")];
    let merged = merge_short_cues(cues.clone(), 2.5, Some(10.0));
    assert_eq!(merged[1].end, 10.0);

    let untouched = merge_short_cues(cues, 2.5, None);
    assert_eq!(untouched[1].end, 9.5);
}

#[test]
fn test_enforceNoOverlap_shouldClampToNextStart() {
    let cues = vec![cue(1, 0.0, 3.0, "a"), cue(2, 2.0, 4.0, "b")];
    let fixed = enforce_no_overlap(cues);
    assert_eq!(fixed[0].end, 2.0);
    assert!(fixed.windows(2).all(|w| w[0].end <= w[1].start));
}

#[test]
fn test_enforceNoOverlap_sameStart_shouldMergeForward() {
    let cues = vec![cue(1, 2.0, 3.0, "a"), cue(2, 2.0, 4.0, "b")];
    let fixed = enforce_no_overlap(cues);
    assert_eq!(fixed.len(), 1);
    assert_eq!(fixed[0].source, "a b");
    assert_eq!(fixed[0].index, 2);
}

#[test]
fn test_dropAnomalies_overlongCue_shouldBeRemoved() {
    let cues = vec![
        cue(1, 0.0, 2.0, "a"),
        cue(2, 2.0, 4.0, "b"),
        cue(3, 4.0, 28.0, "c"),
        cue(4, 4.5, 6.0, "d"),
    ];
    let kept = drop_anomalies(cues);
    let sources: Vec<&str> = kept.iter().map(|c| c.source.as_str()).collect();
    assert_eq!(sources, vec!["a", "b", "d"]);
}

#[test]
fn test_dropAnomalies_outOfSequenceStart_shouldBeRemoved() {
    let cues = vec![cue(1, 0.0, 2.0, "a"), cue(2, 40.0, 42.0, "b"), cue(3, 3.0, 5.0, "c")];
    let kept = drop_anomalies(cues);
    let sources: Vec<&str> = kept.iter().map(|c| c.source.as_str()).collect();
    assert_eq!(sources, vec!["a", "c"]);
}

#[test]
fn test_stripAsides_shouldRemoveParenthesesAndDashes() {
    assert_eq!(strip_asides("(applause) Thank you"), "Thank you");
    assert_eq!(strip_asides("（笑）好的"), "好的");
    assert_eq!(strip_asides("- Yes"), "Yes");
}

#[test]
fn test_resolveTiming_shortGap_shouldBridge() {
    let mut cues = vec![cue(1, 0.0, 2.0, "a"), cue(2, 2.5, 4.0, "b"), cue(3, 6.0, 8.0, "c")];
    resolve_timing(&mut cues, &TimingPolicy::default());
    assert_eq!(cues[0].end, 2.5);
    assert_eq!(cues[1].end, 4.0);
}

#[test]
fn test_resolveTiming_overlap_shouldLeaveMargin() {
    let mut cues = vec![cue(1, 0.0, 3.0, "a"), cue(2, 2.0, 4.0, "b")];
    resolve_timing(&mut cues, &TimingPolicy::default());
    assert!((cues[0].end - 1.9).abs() < 1e-9);
}

#[test]
fn test_tidy_shouldRenumberFromOne() {
    let cues = vec![cue(7, 0.0, 1.0, "a"), cue(8, 1.5, 4.0, "b"), cue(9, 10.0, 13.0, "c")];
    let tidied = PostProcessor::new(2.5, 1).tidy(cues);
    let numbers: Vec<usize> = tidied.iter().map(|c| c.index).collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[test]
fn test_dropOutOfOrder_earlierStart_shouldBeRemoved() {
    let cues = vec![cue(1, 0.0, 3.0, "a"), cue(2, 5.0, 8.0, "b"), cue(3, 3.0, 4.5, "c"), cue(4, 5.0, 6.0, "d")];
    let kept: Vec<String> = drop_out_of_order(cues).into_iter().map(|c| c.source).collect();
    assert_eq!(kept, vec!["a", "b", "d"]);
}

/// A hand-edited subtitle with one cue moved back in time keeps its other cues intact
#[tokio::test]
async fn test_run_cueOutOfOrder_shouldNotSwallowLaterCues() {
    let trimmer = Trimmer::new(
        mock_client(MockService::failing()),
        WorkerPool::new(2),
        SpeechRates::default(),
        SpeedFactor::default(),
    );
    let cues = vec![cue(1, 0.0, 3.0, "a"), cue(2, 5.0, 8.0, "b"), cue(3, 3.0, 4.5, "c"), cue(4, 9.0, 12.0, "d")];

    let outcome = PostProcessor::new(1.0, 1).run(cues, &trimmer).await;

    let timed: Vec<(usize, &str, f64, f64)> = outcome
        .cues
        .iter()
        .map(|c| (c.index, c.source.as_str(), c.start, c.end))
        .collect();
    assert_eq!(timed, vec![(1, "a", 0.0, 3.0), (2, "b", 5.0, 8.0), (3, "d", 9.0, 12.0)]);
    assert_eq!(outcome.dropped, 1);
    assert_eq!(outcome.trim_fallbacks, 0);
}
