use async_trait::async_trait;
use loco_rs::{
    app::{AppContext, Hooks, Initializer},
    bgworker::Queue,
    boot::{create_app, BootResult, StartMode},
    controller::AppRoutes,
    db::{self, truncate_table},
    environment::Environment,
    task::Tasks,
    Result,
};
use migration::Migrator;
use std::path::Path;

use crate::{
    controllers, initializers,
    models::_entities::{
        album_views, albums, audit_logs, download_logs, jobs, photo_group_assignments,
        photo_groups, photo_views, photos, translations, users,
    },
    tasks,
};

pub struct App;

#[async_trait]
impl Hooks for App {
    fn app_name() -> &'static str {
        env!("CARGO_CRATE_NAME")
    }

    fn app_version() -> String {
        format!(
            "{}-{}",
            env!("CARGO_PKG_VERSION"),
            option_env!("BUILD_SHA")
                .or(option_env!("GITHUB_SHA"))
                .unwrap_or("dev")
        )
    }

    async fn boot(mode: StartMode, environment: &Environment) -> Result<BootResult> {
        create_app::<Self, Migrator>(mode, environment).await
    }

    async fn initializers(_ctx: &AppContext) -> Result<Vec<Box<dyn Initializer>>> {
        Ok(vec![Box::new(initializers::core_initializer::CoreInitializer)])
    }

    fn routes(_ctx: &AppContext) -> AppRoutes {
        AppRoutes::with_default_routes().add_route(controllers::process::routes())
    }

    /// No-op: the core runs its own queue consumers (`workers::spawn_*`,
    /// started from `CoreInitializer::before_run`) rather than loco's
    /// `BackgroundWorker`/sidekiq queue, since the durable `jobs` table is a
    /// first-class component of the core (spec §4.3), not a framework
    /// convenience layered on top of it.
    async fn connect_workers(_ctx: &AppContext, _queue: &Queue) -> Result<()> {
        Ok(())
    }

    fn register_tasks(tasks: &mut Tasks) {
        tasks.register(tasks::seed_admin::SeedAdmin);
    }

    async fn truncate(ctx: &AppContext) -> Result<()> {
        truncate_table(&ctx.db, photo_group_assignments::Entity).await?;
        truncate_table(&ctx.db, photo_views::Entity).await?;
        truncate_table(&ctx.db, download_logs::Entity).await?;
        truncate_table(&ctx.db, album_views::Entity).await?;
        truncate_table(&ctx.db, audit_logs::Entity).await?;
        truncate_table(&ctx.db, jobs::Entity).await?;
        truncate_table(&ctx.db, translations::Entity).await?;
        truncate_table(&ctx.db, photos::Entity).await?;
        truncate_table(&ctx.db, photo_groups::Entity).await?;
        truncate_table(&ctx.db, albums::Entity).await?;
        truncate_table(&ctx.db, users::Entity).await?;
        Ok(())
    }

    async fn seed(ctx: &AppContext, base: &Path) -> Result<()> {
        db::seed::<users::ActiveModel>(&ctx.db, &base.join("users.yaml").display().to_string()).await?;
        Ok(())
    }
}
