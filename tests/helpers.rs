use sea_orm::{ConnectionTrait, DatabaseConnection};

/// Clears every table between tests sharing the same test database, since
/// `loco_rs::testing::boot_test` reuses one connection for the whole run
/// rather than rolling back a transaction per test.
pub async fn teardown(db: &DatabaseConnection) {
    db.execute_unprepared(
        "TRUNCATE TABLE photo_group_assignments, photo_views, download_logs, \
         album_views, audit_logs, jobs, translations, photos, photo_groups, \
         albums, users CASCADE",
    )
    .await
    .expect("failed to truncate tables between tests");
}
