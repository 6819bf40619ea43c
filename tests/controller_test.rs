//! End-to-end controller tests: instant flush, paced delivery, pause/resume
//! exactness, fast-forward, stop idempotence and the stale create-experiment
//! guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Notify;

use tp_sampler::experiment::{ExperimentController, Speed};
use tp_sampler::sequence::Sequence;
use tp_sampler::sink::{Collection, DataSink, MemorySink};
use tp_sampler::view::NullView;
use tp_sampler::Result;

fn controller(seed: u64) -> ExperimentController<MemorySink, NullView> {
    ExperimentController::with_seed(MemorySink::new(), NullView, seed)
}

/// Labels the seeded controller will draw, given it generates one sequence
/// from a fresh RNG over the default pool `["a", "b", "a"]`.
fn expected_runs(seed: u64, draw: u32, repeat: u32) -> Vec<Vec<String>> {
    let pool = ["a", "b", "a"];
    let mut rng = StdRng::seed_from_u64(seed);
    Sequence::random(draw, repeat, pool.len(), &mut rng)
        .runs()
        .iter()
        .map(|run| run.draws().iter().map(|&i| pool[i].to_string()).collect())
        .collect()
}

#[tokio::test]
async fn test_instant_start_flushes_all_runs_in_order() {
    let ctl = controller(3);
    ctl.change_speed(Speed::Instant).await;
    ctl.start().await;

    assert_eq!(ctl.sink().experiments(), vec![(1, 5)]);
    let batches = ctl.sink().batches();
    assert_eq!(batches.len(), 3);
    for (i, batch) in batches.iter().enumerate() {
        assert_eq!(batch.run_index, u32::try_from(i).unwrap() + 1);
        assert_eq!(batch.values.len(), 5);
        assert!(!batch.collector);
    }

    let state = ctl.state();
    assert!(state.is_idle());
    assert!(!ctl.has_live_sequence());
    assert_eq!(state.experiment_number, 1);
}

#[tokio::test]
async fn test_experiment_number_is_monotonic() {
    let ctl = controller(8);
    ctl.change_speed(Speed::Instant).await;
    ctl.start().await;
    ctl.start().await;

    assert_eq!(ctl.sink().experiments(), vec![(1, 5), (2, 5)]);
    assert_eq!(ctl.state().experiment_number, 2);
}

#[tokio::test]
async fn test_start_while_running_is_noop() {
    let ctl = controller(5);
    ctl.start().await; // Medium speed: stays running until driven or stopped
    assert!(ctl.is_running());

    ctl.start().await;
    assert_eq!(ctl.sink().experiments(), vec![(1, 5)]);
    assert_eq!(ctl.state().experiment_number, 1);
}

#[tokio::test]
async fn test_stop_twice_matches_single_stop() {
    let once = controller(9);
    let twice = controller(9);
    once.start().await;
    twice.start().await;

    once.stop();
    twice.stop();
    twice.stop();

    assert_eq!(once.state(), twice.state());
    assert!(once.state().is_idle());
    assert!(!once.has_live_sequence());
    assert!(!twice.has_live_sequence());
    assert_eq!(once.state().sent_run, 0);
}

#[tokio::test(start_paused = true)]
async fn test_paced_run_flushes_each_run_exactly_once() {
    let ctl = Arc::new(controller(21));
    ctl.set_sample_size(3);
    ctl.set_num_runs(4);
    ctl.start().await;
    assert!(ctl.is_running());

    let driver = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.drive().await }
    });
    driver.await.unwrap();

    let batches = ctl.sink().batches();
    let indices: Vec<u32> = batches.iter().map(|b| b.run_index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);

    let values: Vec<Vec<String>> = batches.into_iter().map(|b| b.values).collect();
    assert_eq!(values, expected_runs(21, 3, 4));
    assert!(ctl.state().is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_pause_holds_ticks_and_resume_continues_exactly() {
    let ctl = Arc::new(controller(33));
    ctl.set_sample_size(2);
    ctl.set_num_runs(3);
    ctl.start().await;

    let driver = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.drive().await }
    });

    // A few draws in, freeze.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    ctl.pause();
    assert!(ctl.state().paused);

    // The clock keeps firing but nothing is sent while paused.
    tokio::time::sleep(Duration::from_millis(5000)).await;
    let frozen = ctl.sink().batches().len();
    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert_eq!(ctl.sink().batches().len(), frozen);

    ctl.resume().await;
    driver.await.unwrap();

    // Exactly once each, ascending, and the exact draws the seed dictates:
    // nothing was skipped or repeated across the pause.
    let batches = ctl.sink().batches();
    let indices: Vec<u32> = batches.iter().map(|b| b.run_index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    let values: Vec<Vec<String>> = batches.into_iter().map(|b| b.values).collect();
    assert_eq!(values, expected_runs(33, 2, 3));
}

#[tokio::test(start_paused = true)]
async fn test_change_speed_to_instant_fast_forwards() {
    let ctl = Arc::new(controller(13));
    ctl.set_sample_size(2);
    ctl.set_num_runs(5);
    ctl.start().await;

    let driver = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.drive().await }
    });

    tokio::time::sleep(Duration::from_millis(2500)).await;
    ctl.change_speed(Speed::Instant).await;
    assert!(ctl.state().is_idle());
    driver.await.unwrap();

    let indices: Vec<u32> = ctl.sink().batches().iter().map(|b| b.run_index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn test_instant_while_paused_defers_to_resume() {
    let ctl = Arc::new(controller(17));
    ctl.set_sample_size(2);
    ctl.set_num_runs(4);
    ctl.start().await;

    let driver = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.drive().await }
    });

    tokio::time::sleep(Duration::from_millis(1500)).await;
    ctl.pause();
    ctl.change_speed(Speed::Instant).await;

    // Paused: the speed change alone sends nothing further.
    assert!(ctl.is_running());
    let frozen = ctl.sink().batches().len();
    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(ctl.sink().batches().len(), frozen);

    ctl.resume().await;
    driver.await.unwrap();

    assert!(ctl.state().is_idle());
    let indices: Vec<u32> = ctl.sink().batches().iter().map(|b| b.run_index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn test_timed_speed_restored_after_instant_while_paused() {
    let ctl = Arc::new(controller(29));
    ctl.set_sample_size(2);
    ctl.set_num_runs(3);
    ctl.start().await;

    let driver = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.drive().await }
    });

    tokio::time::sleep(Duration::from_millis(1500)).await;
    ctl.pause();
    ctl.change_speed(Speed::Instant).await;

    // The driver observes the instant setting while paused yet must keep
    // the experiment alive for the switch back to a timed speed.
    tokio::time::sleep(Duration::from_millis(1000)).await;
    ctl.change_speed(Speed::Medium).await;
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert!(ctl.is_running());
    assert_eq!(ctl.sink().batches().len(), 1);

    ctl.resume().await;
    driver.await.unwrap();

    assert!(ctl.state().is_idle());
    let batches = ctl.sink().batches();
    let indices: Vec<u32> = batches.iter().map(|b| b.run_index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    let values: Vec<Vec<String>> = batches.into_iter().map(|b| b.values).collect();
    assert_eq!(values, expected_runs(29, 2, 3));
}

#[tokio::test(start_paused = true)]
async fn test_restart_retires_stale_driver() {
    let ctl = Arc::new(controller(41));
    ctl.set_sample_size(2);
    ctl.set_num_runs(2);
    ctl.start().await;

    let stale = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.drive().await }
    });

    tokio::time::sleep(Duration::from_millis(1500)).await;
    ctl.stop();
    ctl.start().await;

    let driver = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.drive().await }
    });

    // The sleeping first driver wakes into the second experiment and must
    // exit without advancing it; a lingering driver alongside the new one
    // would pace two draws per period.
    stale.await.unwrap();
    driver.await.unwrap();

    assert_eq!(ctl.sink().experiments(), vec![(1, 2), (2, 2)]);
    let indices: Vec<u32> = ctl.sink().batches().iter().map(|b| b.run_index).collect();
    assert_eq!(indices, vec![1, 1, 2]);
    assert!(ctl.state().is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_end_of_animation_one_period_after_last_draw() {
    let ctl = Arc::new(controller(25));
    ctl.set_sample_size(2);
    ctl.set_num_runs(1);
    ctl.start().await;
    let started = tokio::time::Instant::now();

    let driver = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.drive().await }
    });
    driver.await.unwrap();

    // Two draws at t=0 and t=1000; the run ends exactly one period later.
    assert_eq!(started.elapsed(), Duration::from_millis(2000));
    assert!(ctl.state().is_idle());
    assert_eq!(ctl.sink().batches().len(), 1);
}

// Sink whose create-experiment call blocks until the test releases it.
#[derive(Clone, Default)]
struct GatedSink {
    log: Arc<MemorySink>,
    gate: Arc<Notify>,
    create_called: Arc<AtomicBool>,
}

impl DataSink for GatedSink {
    async fn start_experiment(&self, experiment_number: u32, sample_size: u32) -> Result<()> {
        self.create_called.store(true, Ordering::SeqCst);
        self.gate.notified().await;
        self.log.start_experiment(experiment_number, sample_size).await
    }

    async fn add_values(&self, run_index: u32, values: Vec<String>, collector: bool) -> Result<()> {
        self.log.add_values(run_index, values, collector).await
    }

    async fn delete_all(&self) -> Result<()> {
        self.log.delete_all().await
    }

    async fn get_contexts(&self) -> Result<Vec<Collection>> {
        self.log.get_contexts().await
    }

    async fn cases_from_context(&self, collection: &str) -> Result<Vec<String>> {
        self.log.cases_from_context(collection).await
    }
}

#[tokio::test]
async fn test_stop_discards_inflight_create_response() {
    let sink = GatedSink::default();
    let ctl = Arc::new(ExperimentController::with_seed(sink.clone(), NullView, 2));

    let starter = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.start().await }
    });

    while !sink.create_called.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }
    ctl.stop();
    sink.gate.notify_one();
    starter.await.unwrap();

    // The late response must not install a sequence or write any values.
    assert!(!ctl.has_live_sequence());
    assert!(ctl.state().is_idle());
    assert!(ctl.sink().log.batches().is_empty());
}

#[tokio::test]
async fn test_clear_experiment_data_zeroes_counter_and_sink() {
    let ctl = controller(4);
    ctl.change_speed(Speed::Instant).await;
    ctl.start().await;
    assert!(!ctl.sink().is_empty());

    ctl.clear_experiment_data().await;
    assert_eq!(ctl.state().experiment_number, 0);
    assert!(ctl.sink().is_empty());

    // Numbering restarts after a wipe.
    ctl.start().await;
    assert_eq!(ctl.sink().experiments(), vec![(1, 5)]);
}

#[tokio::test]
async fn test_collector_flow_uses_case_pool() {
    use tp_sampler::experiment::Device;

    let sink = MemorySink::new();
    sink.add_context(
        "pets",
        vec!["dog".to_string(), "cat".to_string(), "emu".to_string()],
    );
    let ctl = ExperimentController::with_seed(sink, NullView, 6);

    ctl.switch_device(Device::Collector);
    let contexts = ctl.refresh_contexts().await;
    assert_eq!(contexts.len(), 1);
    ctl.load_collector_cases("pets").await;
    assert_eq!(ctl.variables(), vec!["dog", "cat", "emu"]);

    ctl.change_speed(Speed::Instant).await;
    ctl.start().await;

    let batches = ctl.sink().batches();
    assert_eq!(batches.len(), 3);
    assert!(batches.iter().all(|b| b.collector));
    assert!(batches
        .iter()
        .flat_map(|b| &b.values)
        .all(|v| ["dog", "cat", "emu"].contains(&v.as_str())));
}
