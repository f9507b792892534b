use chrono::Utc;
use log::{info, warn};

use super::{home_with_message, page, put};
use crate::error::Result;
use crate::forms::{FormData, ShowForm};
use crate::models::{NewShow, Show};
use crate::read_model::build_show_listing;
use crate::router::{AppState, RequestContext, Response};

pub async fn list(ctx: RequestContext, state: AppState) -> Result<Response> {
    let mut tx = state.db.begin().await?;
    let rows = Show::listing(&mut *tx).await?;
    tx.commit().await?;

    let mut context = page(&ctx)?;
    put(&mut context, "shows", &build_show_listing(&rows))?;
    state.render("pages/shows.html", &context)
}

pub async fn create_form(ctx: RequestContext, state: AppState) -> Result<Response> {
    let mut context = page(&ctx)?;
    put(&mut context, "form", &ShowForm::starting_at(Utc::now()))?;
    state.render("forms/new_show.html", &context)
}

async fn insert(state: &AppState, form: &FormData) -> Result<i64> {
    let show = NewShow::from_form(form)?;
    let mut tx = state.db.begin().await?;
    let id = Show::insert(&mut *tx, &show).await?;
    tx.commit().await?;
    Ok(id)
}

/// `POST /shows/create`. Unknown venue or artist ids fail on the foreign keys.
pub async fn create(ctx: RequestContext, state: AppState) -> Result<Response> {
    let message = match insert(&state, &ctx.form).await {
        Ok(id) => {
            info!("Show {} listed", id);
            "Show was successfully listed!".to_string()
        }
        Err(e) if e.is_user_recoverable() => {
            warn!("Show could not be listed: {}", e);
            "An error occurred. Show could not be listed.".to_string()
        }
        Err(e) => return Err(e),
    };
    home_with_message(&ctx, &state, message)
}
