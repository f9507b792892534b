use chrono::Utc;
use log::{error, info, warn};

use super::{delete_outcome, home_with_message, page, put, search_term};
use crate::error::{Error, Result};
use crate::forms::{ArtistForm, FormData};
use crate::models::{Artist, ArtistFields, Show};
use crate::orm::Tx;
use crate::read_model::{build_artist_detail, build_artist_listing};
use crate::router::{AppState, RequestContext, Response};
use crate::search::search_artists;

pub async fn list(ctx: RequestContext, state: AppState) -> Result<Response> {
    let mut tx = state.db.begin().await?;
    let artists = Artist::all(&mut *tx).await?;
    tx.commit().await?;

    let mut context = page(&ctx)?;
    put(&mut context, "artists", &build_artist_listing(&artists))?;
    state.render("pages/artists.html", &context)
}

pub async fn search(ctx: RequestContext, state: AppState) -> Result<Response> {
    let term = search_term(&ctx);
    let now = Utc::now();
    let mut tx = state.db.begin().await?;
    let artists = Artist::all(&mut *tx).await?;
    let shows = Show::all(&mut *tx).await?;
    tx.commit().await?;

    let mut context = page(&ctx)?;
    put(&mut context, "results", &search_artists(&artists, &shows, &term, now))?;
    put(&mut context, "search_term", &term)?;
    state.render("pages/search_artists.html", &context)
}

pub async fn show(ctx: RequestContext, state: AppState) -> Result<Response> {
    let id = ctx.param_id("id")?;
    let now = Utc::now();
    let mut tx = state.db.begin().await?;
    let artist = Artist::find(&mut *tx, id)
        .await?
        .ok_or_else(|| Error::not_found(format!("artist {id}")))?;
    let shows = Show::for_artist(&mut *tx, id).await?;
    tx.commit().await?;

    let mut context = page(&ctx)?;
    put(&mut context, "artist", &build_artist_detail(&artist, &shows, now))?;
    state.render("pages/show_artist.html", &context)
}

pub async fn create_form(ctx: RequestContext, state: AppState) -> Result<Response> {
    let mut context = page(&ctx)?;
    put(&mut context, "form", &ArtistForm::blank())?;
    state.render("forms/new_artist.html", &context)
}

async fn insert(state: &AppState, form: &FormData) -> Result<i64> {
    let fields = ArtistFields::from_form(form)?;
    let mut tx = state.db.begin().await?;
    let id = Artist::insert(&mut *tx, &fields).await?;
    tx.commit().await?;
    Ok(id)
}

pub async fn create(ctx: RequestContext, state: AppState) -> Result<Response> {
    let name = ctx.form.get("name").unwrap_or_default().to_string();
    let message = match insert(&state, &ctx.form).await {
        Ok(id) => {
            info!("Artist {} listed with id {}", name, id);
            format!("Artist {name} was successfully listed!")
        }
        Err(e) if e.is_user_recoverable() => {
            warn!("Artist {} could not be listed: {}", name, e);
            format!("An error occurred. Artist {name} could not be listed.")
        }
        Err(e) => return Err(e),
    };
    home_with_message(&ctx, &state, message)
}

pub async fn edit_form(ctx: RequestContext, state: AppState) -> Result<Response> {
    let id = ctx.param_id("id")?;
    let mut tx = state.db.begin().await?;
    let artist = Artist::find(&mut *tx, id)
        .await?
        .ok_or_else(|| Error::not_found(format!("artist {id}")))?;
    tx.commit().await?;

    let mut context = page(&ctx)?;
    put(&mut context, "form", &ArtistForm::from_artist(&artist))?;
    put(&mut context, "artist", &artist)?;
    state.render("forms/edit_artist.html", &context)
}

async fn save(mut tx: Tx, id: i64, fields: &ArtistFields) -> Result<()> {
    Artist::update(&mut *tx, id, fields).await?;
    tx.commit().await?;
    Ok(())
}

/// `POST /artists/:id/edit`. Unlike venues, an unknown artist is a 404.
pub async fn update(ctx: RequestContext, state: AppState) -> Result<Response> {
    let id = ctx.param_id("id")?;
    let mut tx = state.db.begin().await?;
    let artist = Artist::find(&mut *tx, id)
        .await?
        .ok_or_else(|| Error::not_found(format!("artist {id}")))?;

    let outcome = match ArtistFields::from_form(&ctx.form) {
        Ok(fields) => save(tx, id, &fields).await.map(|()| fields.name),
        Err(e) => Err(e),
    };
    let message = match outcome {
        Ok(name) => format!("Artist \"{name}\" was successfully updated!"),
        Err(e) if e.is_user_recoverable() => {
            warn!("Artist {} could not be updated: {}", id, e);
            format!("An error occurred. Artist \"{}\" could not be updated.", artist.name)
        }
        Err(e) => return Err(e),
    };
    Ok(Response::redirect(format!("/artists/{id}")).with_flash(message))
}

async fn remove(state: &AppState, id: i64) -> Result<Option<String>> {
    let mut tx = state.db.begin().await?;
    let Some(artist) = Artist::find(&mut *tx, id).await? else {
        return Ok(None);
    };
    Artist::delete(&mut *tx, id).await?;
    tx.commit().await?;
    Ok(Some(artist.name))
}

pub async fn delete(ctx: RequestContext, state: AppState) -> Result<Response> {
    let raw = ctx.param("id").unwrap_or_default().to_string();
    let Ok(id) = raw.parse::<i64>() else {
        return Ok(delete_outcome(404, format!("Artist with ID {raw} not found.")));
    };
    Ok(match remove(&state, id).await {
        Ok(Some(name)) => {
            info!("Artist {} ({}) deleted", id, name);
            delete_outcome(200, format!("Artist \"{name}\" was successfully deleted."))
        }
        Ok(None) => delete_outcome(404, format!("Artist with ID {raw} not found.")),
        Err(e) => {
            error!("Deleting artist {} failed: {}", id, e);
            delete_outcome(500, format!("An error occurred while deleting the artist: {e}"))
        }
    })
}
