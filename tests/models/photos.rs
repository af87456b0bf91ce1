use crate::helpers;
use galleryd::app::App;
use galleryd::db::sea_orm_adapter::SeaOrmAdapter;
use galleryd::models::{albums, photos};
use loco_rs::testing::prelude::*;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serial_test::serial;
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

async fn seed_photo(db: &sea_orm::DatabaseConnection, album_id: Uuid) -> Uuid {
    let id = Uuid::new_v4();
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
        status: Set(photos::PhotoStatus::Pending.as_str().to_string()),
        error_message: Set(None),
        attempts: Set(0),
        processing_started_at: Set(None),
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
async fn claim_for_processing_transitions_pending_to_processing_once() {
    let boot = boot_test::<App>().await.unwrap();
    helpers::teardown(&boot.app_context.db).await;
    let db = SeaOrmAdapter::new(boot.app_context.db.clone());

    let album_id = seed_album(&boot.app_context.db).await;
    let photo_id = seed_photo(&boot.app_context.db, album_id).await;

    let claimed = photos::claim_for_processing(&db, photo_id).await.unwrap();
    assert!(claimed.is_some());
    assert_eq!(claimed.unwrap().status, "processing");

    // A second concurrent claim must not also win: the row is no longer
    // `pending|failed|completed`.
    let second = photos::claim_for_processing(&db, photo_id).await.unwrap();
    assert!(second.is_none());
}

#[tokio::test]
#[serial]
async fn soft_delete_hides_the_photo_without_touching_storage_keys() {
    let boot = boot_test::<App>().await.unwrap();
    helpers::teardown(&boot.app_context.db).await;
    let db = SeaOrmAdapter::new(boot.app_context.db.clone());

    let album_id = seed_album(&boot.app_context.db).await;
    let photo_id = seed_photo(&boot.app_context.db, album_id).await;

    let tombstoned = photos::soft_delete(&db, photo_id).await.unwrap();
    assert!(tombstoned.deleted_at.is_some());
    assert_eq!(tombstoned.original_key, format!("originals/{album_id}/{photo_id}.jpg"));

    // Claiming a tombstoned photo must never succeed.
    let claimed = photos::claim_for_processing(&db, photo_id).await.unwrap();
    assert!(claimed.is_none());
}
