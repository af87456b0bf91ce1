use crate::helpers;
use galleryd::app::App;
use galleryd::db::sea_orm_adapter::SeaOrmAdapter;
use galleryd::models::users;
use loco_rs::testing::prelude::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn seed_admin_is_idempotent_and_rotates_password() {
    let boot = boot_test::<App>().await.unwrap();
    helpers::teardown(&boot.app_context.db).await;
    let db = SeaOrmAdapter::new(boot.app_context.db.clone());

    let first = users::seed_admin(&db, "admin@example.com", "first-password")
        .await
        .unwrap();
    assert_eq!(first.role, "admin");
    assert!(first.is_active);
    assert!(users::verify_password(
        "first-password",
        first.password_hash.as_deref().unwrap()
    ));

    let rotated = users::seed_admin(&db, "admin@example.com", "second-password")
        .await
        .unwrap();
    assert_eq!(rotated.id, first.id, "re-seeding the same email must not create a second admin");
    assert!(users::verify_password(
        "second-password",
        rotated.password_hash.as_deref().unwrap()
    ));
    assert!(!users::verify_password(
        "first-password",
        rotated.password_hash.as_deref().unwrap()
    ));
}

#[tokio::test]
#[serial]
async fn guard_last_admin_mutation_rejects_removing_the_only_admin() {
    let boot = boot_test::<App>().await.unwrap();
    helpers::teardown(&boot.app_context.db).await;
    let db = SeaOrmAdapter::new(boot.app_context.db.clone());

    let admin = users::seed_admin(&db, "only-admin@example.com", "password")
        .await
        .unwrap();

    let result = users::guard_last_admin_mutation(&db, &admin, false).await;
    assert!(result.is_err(), "removing the last active admin must be rejected");
}
