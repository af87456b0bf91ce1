use crate::helpers;
use galleryd::app::App;
use galleryd::db::sea_orm_adapter::SeaOrmAdapter;
use galleryd::models::{albums, photos};
use galleryd::pipeline::recovery;
use galleryd::queue::pg_queue::PgJobQueue;
use galleryd::queue::JobQueue;
use loco_rs::testing::prelude::*;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serial_test::serial;
use std::sync::Arc;
use uuid::Uuid;

async fn seed_album(db: &sea_orm::DatabaseConnection) -> Uuid {
    let id = Uuid::new_v4();
    albums::ActiveModel {
        id: Set(id),
        slug: Set(format!("album-{id}")),
        title: Set("Test Album".to_string()),
        description: Set(None),
        is_public: Set(true),
        allow_download: Set(true),
        allow_batch_download: Set(true),
        allow_share: Set(true),
        show_exif: Set(false),
        layout: Set("grid".to_string()),
        sort_rule: Set("created_at".to_string()),
        password: Set(None),
        expires_at: Set(None),
        watermark_enabled: Set(false),
        watermark_type: Set("none".to_string()),
        watermark_config: Set(None),
        color_grading: Set(None),
        cover_photo_id: Set(None),
        photo_count: Set(0),
        selected_count: Set(0),
        view_count: Set(0),
        upload_token: Set(Uuid::new_v4().to_string()),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    id
}

/// Inserts a photo already stuck in `processing`, with `processing_started_at`
/// set far enough in the past to be past any recovery horizon used below.
async fn seed_stuck_photo(db: &sea_orm::DatabaseConnection, album_id: Uuid) -> Uuid {
    let id = Uuid::new_v4();
    let stuck_since = chrono::Utc::now() - chrono::Duration::hours(1);
    photos::ActiveModel {
        id: Set(id),
        album_id: Set(album_id),
        filename: Set("photo.jpg".to_string()),
        original_key: Set(format!("originals/{album_id}/{id}.jpg")),
        thumb_key: Set(None),
        preview_key: Set(None),
        variant_keys: Set(None),
        mime_type: Set("image/jpeg".to_string()),
        file_size: Set(1024),
        width: Set(None),
        height: Set(None),
        rotation: Set(0),
        captured_at: Set(None),
        sort_order: Set(0),
        status: Set(photos::PhotoStatus::Processing.as_str().to_string()),
        error_message: Set(None),
        attempts: Set(1),
        processing_started_at: Set(Some(stuck_since.into())),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    id
}

#[tokio::test]
#[serial]
async fn sweep_requeues_stuck_photos_and_reenqueues_them() {
    let boot = boot_test::<App>().await.unwrap();
    helpers::teardown(&boot.app_context.db).await;
    let db: Arc<dyn galleryd::db::DatabaseAdapter> =
        Arc::new(SeaOrmAdapter::new(boot.app_context.db.clone()));
    let queue = PgJobQueue::new(db.clone());

    let album_id = seed_album(&boot.app_context.db).await;
    let photo_id = seed_stuck_photo(&boot.app_context.db, album_id).await;

    // Horizon of 5 minutes: the photo has been "processing" for an hour, so
    // it's well past due.
    let recovered = recovery::sweep(db.as_ref(), &queue, 5 * 60 * 1000)
        .await
        .unwrap();
    assert_eq!(recovered, 1);

    let photo = photos::find_stuck_processing(
        db.as_ref(),
        chrono::Utc::now() + chrono::Duration::hours(1),
    )
    .await
    .unwrap();
    assert!(photo.is_empty(), "the row must no longer be in processing");

    let counts = queue.counts(recovery::PROCESS_PHOTO_QUEUE).await.unwrap();
    assert_eq!(counts.waiting, 1, "sweep must re-enqueue the recovered photo");

    let _ = photo_id;
}

#[tokio::test]
#[serial]
async fn sweep_ignores_photos_within_the_horizon() {
    let boot = boot_test::<App>().await.unwrap();
    helpers::teardown(&boot.app_context.db).await;
    let db: Arc<dyn galleryd::db::DatabaseAdapter> =
        Arc::new(SeaOrmAdapter::new(boot.app_context.db.clone()));
    let queue = PgJobQueue::new(db.clone());

    let album_id = seed_album(&boot.app_context.db).await;
    let pending_id = Uuid::new_v4();
    photos::ActiveModel {
        id: Set(pending_id),
        album_id: Set(album_id),
        filename: Set("photo.jpg".to_string()),
        original_key: Set(format!("originals/{album_id}/{pending_id}.jpg")),
        thumb_key: Set(None),
        preview_key: Set(None),
        variant_keys: Set(None),
        mime_type: Set("image/jpeg".to_string()),
        file_size: Set(1024),
        width: Set(None),
        height: Set(None),
        rotation: Set(0),
        captured_at: Set(None),
        sort_order: Set(0),
        status: Set(photos::PhotoStatus::Pending.as_str().to_string()),
        error_message: Set(None),
        attempts: Set(0),
        processing_started_at: Set(None),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&boot.app_context.db)
    .await
    .unwrap();

    // Claimed "now", so its `processing_started_at` is within any reasonable
    // horizon.
    let photo_id = photos::claim_for_processing(db.as_ref(), pending_id)
        .await
        .unwrap()
        .unwrap()
        .id;

    let recovered = recovery::sweep(db.as_ref(), &queue, 15 * 60 * 1000)
        .await
        .unwrap();
    assert_eq!(recovered, 0);

    let still_processing = photos::Entity::find_by_id(photo_id)
        .one(&boot.app_context.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(still_processing.status, "processing");
}
