//! `cargo run --bin tool -- task seed_admin` (spec §4.8). Wraps
//! `users::seed_admin`, the idempotent admin-seed already used by
//! `App::seed` for fixture loading — this task is the operator-facing path
//! for rotating the admin password in a running environment without a
//! fixture file.

use crate::common::settings::Settings;
use crate::models::users;
use async_trait::async_trait;
use loco_rs::app::AppContext;
use loco_rs::task::{Task, TaskInfo, Vars};
use loco_rs::Result;

pub struct SeedAdmin;

#[async_trait]
impl Task for SeedAdmin {
    fn task(&self) -> TaskInfo {
        TaskInfo {
            name: "seed_admin".to_string(),
            detail: "Create the admin user, or rotate its password if it already exists (vars: email, password)".to_string(),
        }
    }

    async fn run(&self, app_context: &AppContext, vars: &Vars) -> Result<()> {
        let email = vars.cli_arg("email").map_err(|_| {
            loco_rs::Error::Message("seed_admin requires email=<address>".to_string())
        })?;
        let password = vars.cli_arg("password").map_err(|_| {
            loco_rs::Error::Message("seed_admin requires password=<secret>".to_string())
        })?;

        let settings = Settings::from_context(app_context);
        let db = crate::db::build_adapter(&settings.database, app_context.db.clone())
            .map_err(loco_rs::Error::from)?;
        let admin = users::seed_admin(db.as_ref(), email, password)
            .await
            .map_err(loco_rs::Error::from)?;
        println!("admin user ready: {} ({})", admin.email, admin.id);
        Ok(())
    }
}
