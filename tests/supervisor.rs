mod common;

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use common::{config, harness, harness_with_timeout, wait_until, ScriptedRecognizer};
use screenshot_ocr_lib::{storage::ImageCategory, supervisor::SupervisorStatus};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test(flavor = "multi_thread")]
async fn start_and_stop_are_guarded_and_idempotent() {
    let h = harness(config(0.05), ScriptedRecognizer::ok(""));
    assert_eq!(h.supervisor.status().await, SupervisorStatus::Idle);

    h.supervisor.start().await.unwrap();
    assert_eq!(h.supervisor.status().await, SupervisorStatus::Running);
    assert!(h.supervisor.start().await.is_err());
    assert!(h.input.is_subscribed());

    h.supervisor.stop().await;
    h.supervisor.stop().await;
    assert_eq!(h.supervisor.status().await, SupervisorStatus::Stopped);
    assert!(!h.input.is_subscribed());
    assert!(h.supervisor.start().await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_before_start_is_a_no_op() {
    let h = harness(config(0.05), ScriptedRecognizer::ok(""));
    h.supervisor.stop().await;

    assert_eq!(h.supervisor.status().await, SupervisorStatus::Stopped);
    assert_eq!(h.display.calls.load(Ordering::SeqCst), 0);
    assert!(h.sink.event_logs.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_interrupts_a_long_sleep() {
    let h = harness(config(30.0), ScriptedRecognizer::ok("desktop"));
    h.supervisor.start().await.unwrap();

    let frames = h.supervisor.frames().clone();
    assert!(wait_until(WAIT, || !frames.is_empty()).await);

    let started = Instant::now();
    h.supervisor.stop().await;
    assert!(started.elapsed() < Duration::from_secs(2), "stop waited for the sleep");

    let captures = h.display.calls.load(Ordering::SeqCst);
    assert_eq!(captures, 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.display.calls.load(Ordering::SeqCst), captures);
}

#[tokio::test(flavor = "multi_thread")]
async fn recognition_failures_do_not_stop_the_loop() {
    let h = harness(config(0.02), ScriptedRecognizer::failing());
    h.supervisor.start().await.unwrap();

    let recognizer = h.recognizer.clone();
    assert!(wait_until(WAIT, || recognizer.calls.load(Ordering::SeqCst) >= 3).await);
    h.supervisor.stop().await;

    let report = h.supervisor.status_report().await;
    assert!(report.frames_captured >= 3);
    assert_eq!(report.capture_failures, 0);
    assert!(h.sink.texts.lock().unwrap().is_empty());
    assert!(h.sink.count(ImageCategory::Screenshot) >= 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn clicks_are_logged_extracted_and_flushed_on_stop() {
    let h = harness(config(0.05), ScriptedRecognizer::ok("OK"));
    h.supervisor.start().await.unwrap();

    let frames = h.supervisor.frames().clone();
    assert!(wait_until(WAIT, || !frames.is_empty()).await);

    assert!(h.input.click(750, 550));
    assert!(h.input.click(10, 10));

    let observer = h.observer.clone();
    assert!(wait_until(WAIT, || observer.texts.lock().unwrap().len() == 2).await);
    assert_eq!(h.supervisor.clicks().len(), 2);

    let regions: Vec<_> = h
        .sink
        .images
        .lock()
        .unwrap()
        .iter()
        .filter(|(category, _)| *category == ImageCategory::Region)
        .filter_map(|(_, meta)| meta.click)
        .collect();
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].bounds.right, 800);
    assert_eq!(regions[1].bounds.left, 0);

    h.supervisor.stop().await;

    let logs = h.sink.event_logs.lock().unwrap();
    assert_eq!(logs.len(), 1);
    let xs: Vec<_> = logs[0].iter().map(|c| c.x).collect();
    assert_eq!(xs, vec![750, 10]);
}

#[tokio::test(flavor = "multi_thread")]
async fn no_clicks_are_delivered_after_stop() {
    let h = harness(config(0.05), ScriptedRecognizer::ok("x"));
    h.supervisor.start().await.unwrap();
    h.supervisor.stop().await;

    assert!(!h.input.click(100, 100));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.supervisor.clicks().is_empty());
    assert!(h.observer.texts.lock().unwrap().is_empty());
    // Nothing to flush.
    assert!(h.sink.event_logs.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn status_report_tracks_the_run() {
    let h = harness(config(0.05), ScriptedRecognizer::ok(""));

    let idle = h.supervisor.status_report().await;
    assert!(!idle.running);
    assert!(!idle.last_frame_available);
    assert_eq!(idle.last_frame_size, None);
    assert_eq!(idle.extraction_radius, 100);

    h.supervisor.start().await.unwrap();
    let frames = h.supervisor.frames().clone();
    assert!(wait_until(WAIT, || !frames.is_empty()).await);
    h.input.click(1, 1);
    let clicks = h.supervisor.clicks().clone();
    assert!(wait_until(WAIT, || clicks.len() == 1).await);

    let running = h.supervisor.status_report().await;
    assert!(running.running);
    assert_eq!(running.capture_interval_secs, 0.05);
    assert_eq!(running.click_count, 1);
    assert_eq!(running.last_frame_size, Some((800, 600)));

    h.supervisor.stop().await;
    assert!(!h.supervisor.status_report().await.running);
}

#[tokio::test(flavor = "multi_thread")]
async fn capture_stops_while_queued_clicks_drain() {
    let h = harness(
        config(0.02),
        ScriptedRecognizer::slow_regions("menu", Duration::from_millis(300)),
    );
    h.supervisor.start().await.unwrap();

    let frames = h.supervisor.frames().clone();
    assert!(wait_until(WAIT, || !frames.is_empty()).await);
    for x in [100, 200, 300, 400, 500] {
        assert!(h.input.click(x, 300));
    }

    let stop_began = Instant::now();
    h.supervisor.stop().await;

    // At most the iteration already in flight when stop was requested.
    assert!(h.display.captures_since(stop_began) <= 1);
    // In-flight and queued extractions still complete within the drain timeout.
    assert_eq!(h.observer.texts.lock().unwrap().len(), 5);
    assert_eq!(h.sink.event_logs.lock().unwrap()[0].len(), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn presses_survive_a_drain_timeout() {
    let h = harness_with_timeout(
        config(0.05),
        ScriptedRecognizer::slow_regions("slow", Duration::from_millis(800)),
        Duration::from_millis(200),
    );
    h.supervisor.start().await.unwrap();

    let frames = h.supervisor.frames().clone();
    assert!(wait_until(WAIT, || !frames.is_empty()).await);
    for x in [10, 20, 30, 40, 50] {
        assert!(h.input.click(x, 10));
    }
    // Logged on delivery, before any extraction finishes.
    assert_eq!(h.supervisor.clicks().len(), 5);
    assert_eq!(h.supervisor.status_report().await.click_count, 5);

    h.supervisor.stop().await;

    assert!(h.observer.texts.lock().unwrap().len() < 5);
    let logs = h.sink.event_logs.lock().unwrap();
    assert_eq!(logs.len(), 1);
    let xs: Vec<_> = logs[0].iter().map(|c| c.x).collect();
    assert_eq!(xs, vec![10, 20, 30, 40, 50]);
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_unsubscribes_then_stops_capture_then_flushes() {
    let h = harness(
        config(0.02),
        ScriptedRecognizer::slow_regions("ok", Duration::from_millis(100)),
    );
    h.supervisor.start().await.unwrap();

    let frames = h.supervisor.frames().clone();
    assert!(wait_until(WAIT, || !frames.is_empty()).await);
    assert!(h.input.click(400, 300));
    assert!(h.input.click(410, 300));

    h.supervisor.stop().await;

    let unsubscribed = h.input.unsubscribed_at.lock().unwrap().expect("input unsubscribed");
    let flushed = h.sink.flushed_at.lock().unwrap().expect("click log flushed");
    assert!(unsubscribed <= flushed);

    assert!(h.display.captures_since(unsubscribed) <= 1);
    let last_capture = *h.display.captured_at.lock().unwrap().last().unwrap();
    assert!(last_capture <= flushed);

    assert_eq!(h.observer.texts.lock().unwrap().len(), 2);
}
