//! Global middleware: flash messages carried in a cookie, and request logging.

use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

use crate::router::{Middleware, PostMiddleware, RequestContext, Response};

pub const FLASH_COOKIE: &str = "flash";

/// Encode messages as `m=first&m=second`.
pub fn encode_flashes(messages: &[String]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(messages.iter().map(|m| ("m", m.as_str())))
        .finish()
}

pub fn decode_flashes(raw: &str) -> Vec<String> {
    url::form_urlencoded::parse(raw.as_bytes())
        .filter(|(key, _)| key == "m")
        .map(|(_, value)| value.into_owned())
        .collect()
}

/// Value of cookie `name` in a `Cookie:` header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

/// Move the flash cookie's messages into `ctx.flashes`.
pub fn load_flashes() -> Middleware {
    Arc::new(|ctx: &mut RequestContext| {
        let incoming = ctx
            .header("cookie")
            .and_then(|header| cookie_value(header, FLASH_COOKIE))
            .map(decode_flashes);
        if let Some(flashes) = incoming {
            ctx.flashes = flashes;
        }
        None
    })
}

/// Write the response's flashes to the cookie, or clear messages already shown.
///
/// A redirect without new flashes leaves the cookie alone so the messages reach the
/// page the browser lands on.
pub fn store_flashes() -> PostMiddleware {
    Arc::new(|ctx: &RequestContext, mut response: Response| {
        if !response.flashes.is_empty() {
            let mut messages = ctx.flashes.clone();
            if !response.is_redirect() {
                messages.clear();
            }
            messages.extend(response.flashes.iter().cloned());
            response.headers.insert(
                "Set-Cookie".to_string(),
                format!(
                    "{}={}; Path=/; HttpOnly; SameSite=Lax",
                    FLASH_COOKIE,
                    encode_flashes(&messages)
                ),
            );
        } else if !ctx.flashes.is_empty() && !response.is_redirect() {
            response.headers.insert(
                "Set-Cookie".to_string(),
                format!("{}=; Path=/; Max-Age=0", FLASH_COOKIE),
            );
        }
        response
    })
}

/// Stamp the request so `log_requests` can report the elapsed time.
pub fn start_timer() -> Middleware {
    Arc::new(|ctx: &mut RequestContext| {
        ctx.start_time = Some(Instant::now());
        None
    })
}

pub fn log_requests() -> PostMiddleware {
    Arc::new(|ctx: &RequestContext, response: Response| {
        let elapsed = ctx
            .start_time
            .map(|start| format!("{:.2?}", start.elapsed()))
            .unwrap_or_else(|| "-".to_string());
        if response.status_code >= 500 {
            warn!(
                "{} {} -> {} ({})",
                ctx.method.as_str(),
                ctx.path,
                response.status_code,
                elapsed
            );
        } else {
            info!(
                "{} {} -> {} ({})",
                ctx.method.as_str(),
                ctx.path,
                response.status_code,
                elapsed
            );
        }
        response
    })
}
