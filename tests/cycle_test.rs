mod common;

use common::*;
use mesos_stats::collector::{run_once, CycleOutcome, Dispatch};
use mesos_stats::error::{SinkError, SourceError};
use mesos_stats::metrics::MetricSource;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// 22:14:00 UTC, a minute boundary
const BOUNDARY: i64 = 1_700_000_040;

#[tokio::test]
async fn test_failing_source_does_not_stop_others() {
    // One of three sources fails; the batch holds the other two in order
    let log = CallLog::default();
    let clock = ManualClock::at(BOUNDARY - 25);
    let mut sources = vec![
        ScriptedSource::new("a", vec![Step::Samples(samples("a", 3))], &log).boxed(),
        ScriptedSource::new("b", vec![Step::Fail], &log).boxed(),
        ScriptedSource::new("c", vec![Step::Samples(samples("c", 2))], &log).boxed(),
    ];
    let mut sink = RecordingSink::default();

    let outcome = run_once(&mut sources, &mut sink, &clock, &CancellationToken::new()).await;

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    let paths: Vec<_> = sent[0].samples.iter().map(|s| s.path.as_str()).collect();
    assert_eq!(paths, ["a.m0", "a.m1", "a.m2", "c.m0", "c.m1"]);

    match outcome {
        CycleOutcome::SourceFailures(report) => {
            assert_eq!(report.collected, 5);
            assert_eq!(report.source_failures.len(), 1);
            assert_eq!(report.source_failures[0].source, "b");
            assert!(matches!(
                report.source_failures[0].error,
                SourceError::NoReachableSlaves { .. }
            ));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_is_what_remains_after_collection() {
    // A returns 3 samples taking 2.5s, B fails: one send with 56.5s left
    let log = CallLog::default();
    let clock = ManualClock::at(BOUNDARY - 7);
    let mut sources = vec![
        ScriptedSource::new("a", vec![Step::Samples(samples("a", 3))], &log)
            .taking(&clock, Duration::from_millis(2500))
            .boxed(),
        ScriptedSource::new("b", vec![Step::Fail], &log).boxed(),
    ];
    let mut sink = RecordingSink::default();

    run_once(&mut sources, &mut sink, &clock, &CancellationToken::new()).await;

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].samples.len(), 3);
    assert_eq!(sent[0].cycle_timestamp, BOUNDARY as f64);
    assert_eq!(sent[0].timeout_seconds, 56.5);
    assert!(sent[0].samples.iter().all(|s| s.timestamp.is_none()));
}

#[tokio::test]
async fn test_overrun_still_sends_with_negative_timeout() {
    let log = CallLog::default();
    let clock = ManualClock::at(BOUNDARY);
    let mut sources = vec![ScriptedSource::new("slow", vec![Step::Samples(samples("s", 1))], &log)
        .taking(&clock, Duration::from_secs(70))
        .boxed()];
    let mut sink = RecordingSink::default();

    let outcome = run_once(&mut sources, &mut sink, &clock, &CancellationToken::new()).await;

    assert_eq!(sink.sent()[0].timeout_seconds, -11.0);
    assert!(matches!(outcome, CycleOutcome::Success(_)));
}

#[tokio::test]
async fn test_empty_batch_is_never_sent() {
    let log = CallLog::default();
    let clock = ManualClock::at(BOUNDARY - 1);
    let mut sources = vec![
        ScriptedSource::new("a", vec![Step::Samples(vec![])], &log).boxed(),
        ScriptedSource::new("b", vec![Step::Samples(vec![])], &log).boxed(),
    ];
    let mut sink = RecordingSink::default();

    let outcome = run_once(&mut sources, &mut sink, &clock, &CancellationToken::new()).await;

    assert!(sink.sent().is_empty());
    match outcome {
        CycleOutcome::Success(report) => {
            assert_eq!(report.collected, 0);
            assert!(matches!(report.dispatch, Dispatch::Skipped));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_all_sources_failing_skips_sink() {
    let log = CallLog::default();
    let clock = ManualClock::at(BOUNDARY);
    let mut sources = vec![
        ScriptedSource::new("a", vec![Step::Fail], &log).boxed(),
        ScriptedSource::new("b", vec![Step::Fail], &log).boxed(),
    ];
    let mut sink = RecordingSink::default();

    let outcome = run_once(&mut sources, &mut sink, &clock, &CancellationToken::new()).await;

    assert!(sink.sent().is_empty());
    assert!(matches!(outcome, CycleOutcome::SourceFailures(ref r) if r.source_failures.len() == 2));
}

#[tokio::test]
async fn test_each_source_is_reset_right_before_sampling() {
    let log = CallLog::default();
    let clock = ManualClock::at(BOUNDARY);
    let mut sources = vec![
        ScriptedSource::new("slaves", vec![Step::Samples(samples("s", 1))], &log).boxed(),
        ScriptedSource::new("tasks", vec![Step::Fail], &log).boxed(),
        ScriptedSource::new("cluster", vec![Step::Samples(samples("c", 1))], &log).boxed(),
    ];
    let mut sink = RecordingSink::default();

    run_once(&mut sources, &mut sink, &clock, &CancellationToken::new()).await;

    assert_eq!(
        *log.lock().unwrap(),
        [
            "reset:slaves",
            "sample:slaves",
            "reset:tasks",
            "sample:tasks",
            "reset:cluster",
            "sample:cluster"
        ]
    );
}

#[tokio::test]
async fn test_panicking_source_is_isolated() {
    let log = CallLog::default();
    let clock = ManualClock::at(BOUNDARY);
    let mut sources = vec![
        ScriptedSource::new("bad", vec![Step::Panic], &log).boxed(),
        ScriptedSource::new("good", vec![Step::Samples(samples("g", 2))], &log).boxed(),
    ];
    let mut sink = RecordingSink::default();

    let outcome = run_once(&mut sources, &mut sink, &clock, &CancellationToken::new()).await;

    assert_eq!(sink.sent()[0].samples.len(), 2);
    match outcome {
        CycleOutcome::UnexpectedFailure(report) => {
            assert!(matches!(report.source_failures[0].error, SourceError::Panicked(_)));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_failing_sink_is_reported() {
    let log = CallLog::default();
    let clock = ManualClock::at(BOUNDARY);
    let mut sources = vec![ScriptedSource::new("a", vec![Step::Samples(samples("a", 1))], &log).boxed()];
    let mut sink = RecordingSink::failing();

    let outcome = run_once(&mut sources, &mut sink, &clock, &CancellationToken::new()).await;

    assert_eq!(sink.sent().len(), 1);
    assert!(matches!(outcome, CycleOutcome::SinkFailure(_)));
}

#[tokio::test]
async fn test_panicking_sink_is_unexpected_failure() {
    let log = CallLog::default();
    let clock = ManualClock::at(BOUNDARY);
    let mut sources = vec![ScriptedSource::new("a", vec![Step::Samples(samples("a", 2))], &log).boxed()];
    let mut sink = RecordingSink::panicking();

    let outcome = run_once(&mut sources, &mut sink, &clock, &CancellationToken::new()).await;

    assert_eq!(sink.sent().len(), 1);
    match outcome {
        CycleOutcome::UnexpectedFailure(report) => {
            assert!(report.source_failures.is_empty());
            match report.dispatch {
                Dispatch::Failed {
                    timeout_seconds,
                    error: SinkError::Panicked(reason),
                } => {
                    assert_eq!(timeout_seconds, 59.0);
                    assert_eq!(reason, "sink boom");
                }
                other => panic!("unexpected dispatch: {:?}", other),
            }
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_interrupt_during_hanging_source() {
    let log = CallLog::default();
    let clock = ManualClock::at(BOUNDARY);
    let mut sources: Vec<Box<dyn MetricSource>> = vec![
        ScriptedSource::new("hang", vec![Step::Hang], &log).boxed(),
        ScriptedSource::new("never", vec![Step::Samples(samples("n", 1))], &log).boxed(),
    ];
    let mut sink = RecordingSink::default();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let outcome = run_once(&mut sources, &mut sink, &clock, &cancel).await;

    assert!(outcome.is_interrupted());
    assert!(sink.sent().is_empty());
    assert_eq!(*log.lock().unwrap(), ["reset:hang", "sample:hang"]);
}

#[tokio::test]
async fn test_clock_can_be_shared() {
    // The supervisor holds the clock behind an Arc
    let clock: Arc<dyn mesos_stats::collector::Clock> = Arc::new(ManualClock::at(BOUNDARY - 59));
    let log = CallLog::default();
    let mut sources = vec![ScriptedSource::new("a", vec![Step::Samples(samples("a", 1))], &log).boxed()];
    let mut sink = RecordingSink::default();

    run_once(&mut sources, &mut sink, clock.as_ref(), &CancellationToken::new()).await;

    assert_eq!(sink.sent()[0].cycle_timestamp, BOUNDARY as f64);
}
