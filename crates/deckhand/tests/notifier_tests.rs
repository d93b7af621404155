//! Progress notifications as seen by subscribers.

mod common;

use common::{collect_until_terminal, TestHarness};

use deckhand::pipeline::PipelineStep;
use deckhand::{JobStatus, ProcessingOptions};

#[tokio::test]
async fn test_subscriber_sees_monotonic_progress() {
    let harness = TestHarness::new();
    let job = harness.upload_sample().await;
    let mut rx = harness.broadcaster.subscribe();

    let handle = harness
        .runner
        .submit(&job.job_id, ProcessingOptions::default())
        .unwrap();
    let seen = collect_until_terminal(&mut rx, &job.job_id).await;
    handle.await.unwrap();

    assert_eq!(seen[0].status, JobStatus::Processing);
    assert!(seen
        .windows(2)
        .all(|pair| pair[0].steps_completed <= pair[1].steps_completed));

    let last = seen.last().unwrap();
    assert_eq!(last.status, JobStatus::Completed);
    assert_eq!(last.steps_completed, 4);

    // Each step is announced before it runs.
    for step in PipelineStep::ALL {
        assert!(seen.iter().any(|j| j.current_step == step.label()));
    }
}

#[tokio::test]
async fn test_two_subscribers_see_same_terminal_snapshot() {
    let harness = TestHarness::new();
    let job = harness.upload_sample().await;
    let mut first = harness.broadcaster.subscribe();
    let mut second = harness.broadcaster.subscribe();
    assert_eq!(harness.broadcaster.subscriber_count(), 2);

    harness.run(&job.job_id, ProcessingOptions::default()).await;

    let a = collect_until_terminal(&mut first, &job.job_id).await;
    let b = collect_until_terminal(&mut second, &job.job_id).await;
    assert_eq!(a, b);
    assert_eq!(a.last().unwrap(), &harness.store.get(&job.job_id).unwrap());
}

#[tokio::test]
async fn test_snapshots_for_other_jobs_are_interleaved_not_mixed() {
    let harness = TestHarness::new();
    let one = harness.upload_sample().await;
    let two = harness.upload_sample().await;
    let mut rx_one = harness.broadcaster.subscribe();
    let mut rx_two = harness.broadcaster.subscribe();

    let h1 = harness
        .runner
        .submit(&one.job_id, ProcessingOptions::default())
        .unwrap();
    let h2 = harness
        .runner
        .submit(&two.job_id, ProcessingOptions::default())
        .unwrap();
    h1.await.unwrap();
    h2.await.unwrap();

    let seen_one = collect_until_terminal(&mut rx_one, &one.job_id).await;
    let seen_two = collect_until_terminal(&mut rx_two, &two.job_id).await;
    assert!(seen_one.iter().all(|j| j.job_id == one.job_id));
    assert!(seen_two.iter().all(|j| j.job_id == two.job_id));
    assert_eq!(seen_one.last().unwrap().status, JobStatus::Completed);
    assert_eq!(seen_two.last().unwrap().status, JobStatus::Completed);
}

#[tokio::test]
async fn test_store_lists_newest_first() {
    let harness = TestHarness::new();
    let older = harness.upload_sample().await;
    let newer = harness.upload("second.pptx", &common::sample_pptx()).await;

    let listed: Vec<String> = harness
        .store
        .list()
        .into_iter()
        .map(|j| j.job_id)
        .collect();
    assert_eq!(listed, vec![newer.job_id, older.job_id]);
    assert_eq!(harness.store.counts().uploaded, 2);
}
