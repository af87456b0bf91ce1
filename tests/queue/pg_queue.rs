use crate::helpers;
use galleryd::app::App;
use galleryd::db::sea_orm_adapter::SeaOrmAdapter;
use galleryd::queue::pg_queue::PgJobQueue;
use galleryd::queue::{EnqueueOptions, JobQueue};
use loco_rs::testing::prelude::*;
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn enqueue_dedups_on_job_id_while_waiting() {
    let boot = boot_test::<App>().await.unwrap();
    helpers::teardown(&boot.app_context.db).await;
    let queue = PgJobQueue::new(Arc::new(SeaOrmAdapter::new(boot.app_context.db.clone())));

    let opts = EnqueueOptions {
        job_id: Some("photo-1".to_string()),
        ..Default::default()
    };
    queue
        .enqueue("process-photo", serde_json::json!({"n": 1}), opts.clone())
        .await
        .unwrap();
    queue
        .enqueue("process-photo", serde_json::json!({"n": 2}), opts)
        .await
        .unwrap();

    let counts = queue.counts("process-photo").await.unwrap();
    assert_eq!(counts.waiting, 1, "second enqueue with the same job_id must be a no-op");
}

#[tokio::test]
#[serial]
async fn claim_then_complete_drains_the_queue() {
    let boot = boot_test::<App>().await.unwrap();
    helpers::teardown(&boot.app_context.db).await;
    let queue = PgJobQueue::new(Arc::new(SeaOrmAdapter::new(boot.app_context.db.clone())));

    queue
        .enqueue(
            "process-photo",
            serde_json::json!({"photo_id": "abc"}),
            EnqueueOptions::default(),
        )
        .await
        .unwrap();

    let claimed = queue.claim("process-photo", 10, 300).await.unwrap();
    assert_eq!(claimed.len(), 1);

    // Claimed again before completing: it's locked, so nothing comes back.
    let reclaimed = queue.claim("process-photo", 10, 300).await.unwrap();
    assert!(reclaimed.is_empty());

    queue.complete(claimed[0].id).await.unwrap();
    let counts = queue.counts("process-photo").await.unwrap();
    assert_eq!(counts.waiting, 0);
}

#[tokio::test]
#[serial]
async fn fail_schedules_a_retry_until_max_attempts_is_exhausted() {
    let boot = boot_test::<App>().await.unwrap();
    helpers::teardown(&boot.app_context.db).await;
    let queue = PgJobQueue::new(Arc::new(SeaOrmAdapter::new(boot.app_context.db.clone())));

    queue
        .enqueue(
            "process-photo",
            serde_json::json!({"photo_id": "abc"}),
            EnqueueOptions {
                attempts: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let claimed = queue.claim("process-photo", 1, 300).await.unwrap();
    assert_eq!(claimed.len(), 1);
    queue.fail(claimed[0].id, "boom", 10).await.unwrap();

    let counts = queue.counts("process-photo").await.unwrap();
    assert_eq!(counts.failed, 1, "attempts == max_attempts must dead-letter on the first failure");
    assert_eq!(counts.waiting, 0);
}
