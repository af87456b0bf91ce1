#![allow(elided_lifetimes_in_paths)]
#![allow(clippy::wildcard_imports)]
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_users;
mod m20240101_000002_albums;
mod m20240101_000003_photos;
mod m20240101_000004_photo_groups;
mod m20240101_000005_observational;
mod m20240101_000006_jobs;
mod m20240101_000007_jobs_lease_expiry;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_users::Migration),
            Box::new(m20240101_000002_albums::Migration),
            Box::new(m20240101_000003_photos::Migration),
            Box::new(m20240101_000004_photo_groups::Migration),
            Box::new(m20240101_000005_observational::Migration),
            Box::new(m20240101_000006_jobs::Migration),
            Box::new(m20240101_000007_jobs_lease_expiry::Migration),
            // inject-above (do not remove this comment)
        ]
    }
}
