//! Request handlers, one module per resource.
//!
//! Every handler opens one transaction from the pool; returning early with `?` drops
//! it, which rolls back.

pub mod artists;
pub mod shows;
pub mod venues;

use serde::Serialize;
use std::collections::HashMap;

use crate::error::Result;
use crate::router::{AppState, RequestContext, Response};
use crate::template::{Context, TemplateValue};

/// Base context of every page: the flash messages carried in by the request.
pub fn page(ctx: &RequestContext) -> Result<Context> {
    let mut context = Context::new();
    put(&mut context, "messages", &ctx.flashes)?;
    Ok(context)
}

pub fn put<T: Serialize + ?Sized>(context: &mut Context, key: &str, value: &T) -> Result<()> {
    context.insert(key.to_string(), TemplateValue::from_serialize(value)?);
    Ok(())
}

/// `search_term` from the form body, falling back to the query string.
pub fn search_term(ctx: &RequestContext) -> String {
    ctx.form
        .get("search_term")
        .or_else(|| ctx.query.get("search_term").map(String::as_str))
        .unwrap_or_default()
        .to_string()
}

pub async fn home(ctx: RequestContext, state: AppState) -> Result<Response> {
    state.render("pages/home.html", &page(&ctx)?)
}

/// The home page with one more message; what create submissions answer with.
pub fn home_with_message(ctx: &RequestContext, state: &AppState, message: String) -> Result<Response> {
    let mut messages = ctx.flashes.clone();
    messages.push(message);
    let mut context = Context::new();
    put(&mut context, "messages", &messages)?;
    state.render("pages/home.html", &context)
}

#[derive(Debug, Serialize)]
struct DeleteOutcome {
    success: bool,
    message: String,
}

/// JSON answer of the delete endpoints.
pub fn delete_outcome(status_code: u16, message: String) -> Response {
    let outcome = DeleteOutcome {
        success: status_code == 200,
        message,
    };
    Response::json(outcome, status_code, HashMap::new())
}
