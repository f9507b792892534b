//! Wiring: database setup and the route table.

use log::info;
use std::sync::Arc;

use crate::error::Result;
use crate::handlers::{self, artists, shows, venues};
use crate::middleware::{load_flashes, log_requests, start_timer, store_flashes};
use crate::orm::{self, Db};
use crate::route;
use crate::router::{AppState, Router};
use crate::settings::Settings;

/// Connect, migrate every registered model and apply pending `.sql` files.
pub async fn connect_database(settings: &Settings) -> Result<Arc<Db>> {
    let db = Arc::new(Db::connect(&settings.database.url, settings.database.max_connections).await?);
    orm::auto_migrate(db.clone()).await?;
    if let Some(dir) = &settings.database.migrations_dir {
        let applied = orm::apply_migration_files(db.clone(), dir).await?;
        info!("{} migration file(s) applied from {}", applied, dir.display());
    }
    Ok(db)
}

/// Every page and endpoint. `/create` routes come before `/:id` so they win.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new();
    router.add_middleware(start_timer());
    router.add_middleware(load_flashes());
    router.add_post_middleware(store_flashes());
    router.add_post_middleware(log_requests());

    route!(router,
        Get "/" => { handlers::home },

        Get "/venues" => { venues::list },
        Post "/venues/search" => { venues::search },
        Get "/venues/create" => { venues::create_form },
        Post "/venues/create" => { venues::create },
        Get "/venues/:id" => { venues::show },
        Delete "/venues/:id" => { venues::delete },
        Get "/venues/:id/edit" => { venues::edit_form },
        Post "/venues/:id/edit" => { venues::update },

        Get "/artists" => { artists::list },
        Post "/artists/search" => { artists::search },
        Get "/artists/create" => { artists::create_form },
        Post "/artists/create" => { artists::create },
        Get "/artists/:id" => { artists::show },
        Delete "/artists/:id" => { artists::delete },
        Get "/artists/:id/edit" => { artists::edit_form },
        Post "/artists/:id/edit" => { artists::update },

        Get "/shows" => { shows::list },
        Get "/shows/create" => { shows::create_form },
        Post "/shows/create" => { shows::create },
    );

    router.set_app_state(state);
    router
}
