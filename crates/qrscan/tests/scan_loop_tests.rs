mod common;

use common::{Behavior, MockEngine, Tally, counting_source, eventually};
use qrscan::{ChannelError, ScanConfig, ScanError, ScanEvents, ScanLoop, ScanState};
use qrscan_image::GrayscaleWeights;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

fn fast_config() -> ScanConfig {
    ScanConfig::default().with_out_size(48).with_frame_rate(200.0)
}

fn ignore() -> ScanEvents<String> {
    ScanEvents::new(|_| {})
}

async fn wait_for_state(scan_loop: &ScanLoop, wanted: impl Fn(ScanState) -> bool) {
    let mut state = scan_loop.watch_state();
    tokio::time::timeout(Duration::from_secs(2), state.wait_for(|s| wanted(*s)))
        .await
        .expect("timed out waiting for scan state")
        .expect("scan loop state closed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_found_invokes_callback_in_order() {
    let tally = Tally::default();
    let source = counting_source(&tally);
    source.play();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let events = ScanEvents::new(move |payload: String| {
        let _ = tx.send(payload);
    });
    let engine = MockEngine::with_tally(Behavior::Counter, tally.clone());
    let scan_loop = ScanLoop::spawn(source, engine, fast_config(), events).unwrap();

    for expected in ["code-1", "code-2", "code-3"] {
        let payload = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload, expected);
    }
    scan_loop.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_not_found_resamples_without_callback() {
    let tally = Tally::default();
    let source = counting_source(&tally);
    source.play();

    let found = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&found);
    let events = ScanEvents::new(move |_: String| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let engine = MockEngine::with_tally(Behavior::NotFound, tally.clone());
    let scan_loop = ScanLoop::spawn(source, engine, fast_config(), events).unwrap();

    assert!(eventually(|| tally.finished() >= 5).await);
    scan_loop.shutdown().await;

    assert_eq!(found.load(Ordering::SeqCst), 0);
    // one sample per settled decode, plus at most the one in flight
    assert!(tally.samples() <= tally.finished() + 1);
    assert_eq!(tally.overlaps(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_never_samples_while_decoding() {
    let tally = Tally::default();
    let source = counting_source(&tally);
    source.play();

    let engine = MockEngine::with_tally(Behavior::NotFound, tally.clone())
        .with_delay(Duration::from_millis(15));
    let config = fast_config().with_frame_rate(1000.0);
    let scan_loop = ScanLoop::spawn(source, engine, config, ignore()).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    scan_loop.shutdown().await;

    assert!(tally.finished() >= 3);
    assert_eq!(tally.overlaps(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_frames_have_configured_size() {
    let tally = Tally::default();
    let source = counting_source(&tally);
    source.play();

    let engine = MockEngine::with_tally(Behavior::NotFound, tally.clone());
    let scan_loop = ScanLoop::spawn(source, engine, fast_config(), ignore()).unwrap();

    assert!(eventually(|| tally.finished() >= 1).await);
    scan_loop.shutdown().await;
    assert_eq!(tally.last_size(), Some(qrscan_base::Vec2::new(48, 48)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_waits_for_play_signal() {
    let tally = Tally::default();
    let source = counting_source(&tally);

    let engine = MockEngine::with_tally(Behavior::NotFound, tally.clone());
    let scan_loop = ScanLoop::spawn(source.clone(), engine, fast_config(), ignore()).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(scan_loop.state(), ScanState::Stopped);
    assert_eq!(tally.calls(), 0);

    assert!(source.play());
    assert!(eventually(|| tally.calls() >= 1).await);
    scan_loop.shutdown().await;
}

fn record_states(states: &Arc<Mutex<Vec<ScanState>>>) -> ScanEvents<String> {
    let states = Arc::clone(states);
    ScanEvents::new(|_| {}).with_state_change(move |state| {
        states.lock().unwrap().push(state);
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn test_playing_source_enters_idle_first() {
    let tally = Tally::default();
    let source = counting_source(&tally);
    source.play();

    let states = Arc::new(Mutex::new(Vec::new()));
    let engine = MockEngine::with_tally(Behavior::NotFound, tally.clone());
    let scan_loop = ScanLoop::spawn(source, engine, fast_config(), record_states(&states)).unwrap();
    assert!(eventually(|| states.lock().unwrap().len() >= 3).await);
    scan_loop.shutdown().await;

    let states = states.lock().unwrap();
    assert_eq!(states[..3], [ScanState::Idle, ScanState::WaitingForDecode, ScanState::Idle]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_play_signal_enters_idle_first() {
    let tally = Tally::default();
    let source = counting_source(&tally);

    let states = Arc::new(Mutex::new(Vec::new()));
    let engine = MockEngine::with_tally(Behavior::NotFound, tally.clone());
    let scan_loop =
        ScanLoop::spawn(source.clone(), engine, fast_config(), record_states(&states)).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(states.lock().unwrap().is_empty());

    source.play();
    assert!(eventually(|| tally.finished() >= 1).await);
    scan_loop.shutdown().await;

    let states = states.lock().unwrap();
    assert_eq!(states[..2], [ScanState::Idle, ScanState::WaitingForDecode]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pause_stops_and_play_resumes() {
    let tally = Tally::default();
    let source = counting_source(&tally);
    source.play();

    let engine = MockEngine::with_tally(Behavior::NotFound, tally.clone());
    let scan_loop = ScanLoop::spawn(source.clone(), engine, fast_config(), ignore()).unwrap();
    assert!(eventually(|| tally.finished() >= 2).await);

    source.pause();
    wait_for_state(&scan_loop, |s| s == ScanState::Stopped).await;
    let calls = tally.calls();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(tally.calls(), calls);
    assert!(!scan_loop.is_finished());

    assert!(source.play());
    assert!(eventually(|| tally.calls() > calls).await);
    scan_loop.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_engine_failure_surfaces_once() {
    let tally = Tally::default();
    let source = counting_source(&tally);
    source.play();

    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let events = ScanEvents::new(|_: String| {}).with_error(move |e| sink.lock().unwrap().push(e));
    let engine = MockEngine::with_tally(Behavior::FailOn(3), tally.clone());
    let scan_loop = ScanLoop::spawn(source.clone(), engine, fast_config(), events).unwrap();

    assert!(eventually(|| scan_loop.is_finished()).await);
    assert_eq!(scan_loop.state(), ScanState::Stopped);

    // a fresh play signal does not revive a failed loop
    source.pause();
    source.play();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(tally.calls(), 3);
    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        ScanError::EngineFailure(ChannelError::Engine(reason)) if reason.contains("call 3")
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_grayscale_weights_pushed_only_on_change() {
    let tally = Tally::default();
    let source = counting_source(&tally);

    let engine = MockEngine::with_tally(Behavior::NotFound, tally.clone());
    let mut scan_loop = ScanLoop::spawn(source, engine, fast_config(), ignore()).unwrap();
    assert!(eventually(|| tally.weight_updates() == 1).await);
    assert_eq!(tally.last_weights(), Some(GrayscaleWeights::default()));

    scan_loop.set_grayscale_weights(GrayscaleWeights::default()).unwrap();
    let red = GrayscaleWeights::new(1.0, 0.0, 0.0);
    scan_loop.set_grayscale_weights(red).unwrap();
    scan_loop.set_grayscale_weights(red).unwrap();

    assert!(eventually(|| tally.last_weights() == Some(red)).await);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(tally.weight_updates(), 2);
    assert_eq!(scan_loop.grayscale_weights(), red);
    scan_loop.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_disposes_engine() {
    let tally = Tally::default();
    let source = counting_source(&tally);
    source.play();

    let engine = MockEngine::with_tally(Behavior::NotFound, tally.clone());
    let scan_loop = ScanLoop::spawn(source, engine, fast_config(), ignore()).unwrap();
    let mut state = scan_loop.watch_state();
    assert!(eventually(|| tally.finished() >= 1).await);

    scan_loop.shutdown().await;
    assert_eq!(*state.borrow_and_update(), ScanState::Stopped);
    assert!(state.changed().await.is_err());
    assert!(eventually(|| tally.is_dropped()).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_drop_stops_loop() {
    let tally = Tally::default();
    let source = counting_source(&tally);
    source.play();

    let engine = MockEngine::with_tally(Behavior::NotFound, tally.clone());
    let scan_loop = ScanLoop::spawn(source, engine, fast_config(), ignore()).unwrap();
    assert!(eventually(|| tally.finished() >= 1).await);

    drop(scan_loop);
    assert!(eventually(|| tally.is_dropped()).await);
    let calls = tally.calls();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(tally.calls(), calls);
}

#[test]
fn test_config_defaults() {
    let config = ScanConfig::default();
    assert_eq!(config.out_size(), 400);
    assert_eq!(config.frame_rate(), 30.0);
    assert_eq!(config.weights(), GrayscaleWeights::default());

    let ignored = ScanConfig::default().with_frame_rate(0.0).with_frame_rate(f64::NAN);
    assert_eq!(ignored.frame_rate(), 30.0);
    assert_eq!(
        ScanConfig::default().with_frame_rate(50.0).frame_interval(),
        Duration::from_millis(20)
    );
}

#[test]
fn test_config_extreme_frame_rates_keep_interval_valid() {
    let fast = ScanConfig::default().with_frame_rate(1e12);
    assert_eq!(fast.frame_interval(), Duration::from_millis(1));

    let slow = ScanConfig::default().with_frame_rate(1e-300);
    assert_eq!(slow.frame_interval(), Duration::from_secs(3600));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_huge_frame_rate_still_scans() {
    let tally = Tally::default();
    let source = counting_source(&tally);
    source.play();

    let config = fast_config().with_frame_rate(1e12);
    let engine = MockEngine::with_tally(Behavior::NotFound, tally.clone());
    let scan_loop = ScanLoop::spawn(source, engine, config, ignore()).unwrap();

    assert!(eventually(|| tally.finished() >= 3).await);
    assert!(!scan_loop.is_finished());
    scan_loop.shutdown().await;
}
