use chrono::Utc;
use log::{error, info, warn};

use super::{delete_outcome, home_with_message, page, put, search_term};
use crate::error::{Error, Result};
use crate::forms::{FormData, VenueForm};
use crate::models::{Show, Venue, VenueFields};
use crate::orm::Tx;
use crate::read_model::{build_venue_detail, build_venue_directory};
use crate::router::{AppState, RequestContext, Response};
use crate::search::search_venues;

/// `GET /venues`: venues grouped by city and state.
pub async fn list(ctx: RequestContext, state: AppState) -> Result<Response> {
    let now = Utc::now();
    let mut tx = state.db.begin().await?;
    let venues = Venue::all(&mut *tx).await?;
    let shows = Show::all(&mut *tx).await?;
    tx.commit().await?;

    let mut context = page(&ctx)?;
    put(&mut context, "areas", &build_venue_directory(&venues, &shows, now))?;
    state.render("pages/venues.html", &context)
}

pub async fn search(ctx: RequestContext, state: AppState) -> Result<Response> {
    let term = search_term(&ctx);
    let mut tx = state.db.begin().await?;
    let venues = Venue::all(&mut *tx).await?;
    tx.commit().await?;

    let mut context = page(&ctx)?;
    put(&mut context, "results", &search_venues(&venues, &term))?;
    put(&mut context, "search_term", &term)?;
    state.render("pages/search_venues.html", &context)
}

pub async fn show(ctx: RequestContext, state: AppState) -> Result<Response> {
    let id = ctx.param_id("id")?;
    let now = Utc::now();
    let mut tx = state.db.begin().await?;
    let venue = Venue::find(&mut *tx, id)
        .await?
        .ok_or_else(|| Error::not_found(format!("venue {id}")))?;
    let shows = Show::for_venue(&mut *tx, id).await?;
    tx.commit().await?;

    let mut context = page(&ctx)?;
    put(&mut context, "venue", &build_venue_detail(&venue, &shows, now))?;
    state.render("pages/show_venue.html", &context)
}

pub async fn create_form(ctx: RequestContext, state: AppState) -> Result<Response> {
    let mut context = page(&ctx)?;
    put(&mut context, "form", &VenueForm::blank())?;
    state.render("forms/new_venue.html", &context)
}

async fn insert(state: &AppState, form: &FormData) -> Result<i64> {
    let fields = VenueFields::from_form(form)?;
    let mut tx = state.db.begin().await?;
    let id = Venue::insert(&mut *tx, &fields).await?;
    tx.commit().await?;
    Ok(id)
}

/// `POST /venues/create`: answers with the home page and a success or failure message.
pub async fn create(ctx: RequestContext, state: AppState) -> Result<Response> {
    let name = ctx.form.get("name").unwrap_or_default().to_string();
    let message = match insert(&state, &ctx.form).await {
        Ok(id) => {
            info!("Venue {} listed with id {}", name, id);
            format!("Venue {name} was successfully listed!")
        }
        Err(e) if e.is_user_recoverable() => {
            warn!("Venue {} could not be listed: {}", name, e);
            format!("An error occurred. Venue {name} could not be listed.")
        }
        Err(e) => return Err(e),
    };
    home_with_message(&ctx, &state, message)
}

pub async fn edit_form(ctx: RequestContext, state: AppState) -> Result<Response> {
    let id = ctx.param_id("id")?;
    let mut tx = state.db.begin().await?;
    let venue = Venue::find(&mut *tx, id)
        .await?
        .ok_or_else(|| Error::not_found(format!("venue {id}")))?;
    tx.commit().await?;

    let mut context = page(&ctx)?;
    put(&mut context, "form", &VenueForm::from_venue(&venue))?;
    put(&mut context, "venue", &venue)?;
    state.render("forms/edit_venue.html", &context)
}

async fn save(mut tx: Tx, id: i64, fields: &VenueFields) -> Result<()> {
    Venue::update(&mut *tx, id, fields).await?;
    tx.commit().await?;
    Ok(())
}

/// `POST /venues/:id/edit`: redirects to the detail page with a flash message.
pub async fn update(ctx: RequestContext, state: AppState) -> Result<Response> {
    let id = ctx.param_id("id")?;
    let mut tx = state.db.begin().await?;
    let Some(venue) = Venue::find(&mut *tx, id).await? else {
        return Ok(Response::redirect("/").with_flash(format!("Venue with ID {id} not found.")));
    };

    let outcome = match VenueFields::from_form(&ctx.form) {
        Ok(fields) => save(tx, id, &fields).await.map(|()| fields.name),
        Err(e) => Err(e),
    };
    let message = match outcome {
        Ok(name) => format!("Venue \"{name}\" was successfully updated!"),
        Err(e) if e.is_user_recoverable() => {
            warn!("Venue {} could not be updated: {}", id, e);
            format!("An error occurred. Venue \"{}\" could not be updated.", venue.name)
        }
        Err(e) => return Err(e),
    };
    Ok(Response::redirect(format!("/venues/{id}")).with_flash(message))
}

async fn remove(state: &AppState, id: i64) -> Result<Option<String>> {
    let mut tx = state.db.begin().await?;
    let Some(venue) = Venue::find(&mut *tx, id).await? else {
        return Ok(None);
    };
    Venue::delete(&mut *tx, id).await?;
    tx.commit().await?;
    Ok(Some(venue.name))
}

/// `DELETE /venues/:id`: JSON `{success, message}`; the venue's shows go with it.
pub async fn delete(ctx: RequestContext, state: AppState) -> Result<Response> {
    let raw = ctx.param("id").unwrap_or_default().to_string();
    let Ok(id) = raw.parse::<i64>() else {
        return Ok(delete_outcome(404, format!("Venue with ID {raw} not found.")));
    };
    Ok(match remove(&state, id).await {
        Ok(Some(name)) => {
            info!("Venue {} ({}) deleted", id, name);
            delete_outcome(200, format!("Venue \"{name}\" was successfully deleted."))
        }
        Ok(None) => delete_outcome(404, format!("Venue with ID {raw} not found.")),
        Err(e) => {
            error!("Deleting venue {} failed: {}", id, e);
            delete_outcome(500, format!("An error occurred while deleting the venue: {e}"))
        }
    })
}
