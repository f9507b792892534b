//! gigboard router module
//!
//! This module provides the routing, HTTP and live-reload plumbing for the app:
//!
//! - Method + path-parameter routing of HTTP endpoints (`/venues/:id`)
//! - Global and route-specific middleware (pre and post)
//! - Error pages for handlers that return `Err`
//! - Hot-reload over the `/ws/reload` websocket, triggered by a template file watcher
//!
//! Requests reach the router through an axum fallback service, which reads the body
//! and hands a [`RequestContext`] to [`Router::dispatch`].
use crate::error::{Error, Result};
use crate::forms::FormData;
use crate::orm::Db;
use crate::settings::Settings;
use crate::template::{Context, render_template};
use axum::Router as AxumRouter;
use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use futures::future::BoxFuture;
use log::{debug, error, info, warn};
use notify::event::DataChange;
use notify::event::ModifyKind::Data;
use notify::{EventKind, RecursiveMode, Watcher};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

const RELOAD_SCRIPT: &str = r#"<script>(function(){var s=new WebSocket((location.protocol==="https:"?"wss://":"ws://")+location.host+"/ws/reload");s.onmessage=function(){location.reload();};})();</script>"#;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        match method.as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// Everything a handler may touch besides its request: the pool and the settings.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Db>,
    pub settings: Settings,
}

impl AppState {
    pub fn new(db: Arc<Db>, settings: Settings) -> Self {
        AppState { db, settings }
    }

    /// Render a template from the configured template dir into a 200 HTML response.
    pub fn render(&self, template: &str, context: &Context) -> Result<Response> {
        let mut body = render_template(&self.settings.template.dir, template, context)?;
        if self.settings.debug {
            match body.rfind("</body>") {
                Some(at) => body.insert_str(at, RELOAD_SCRIPT),
                None => body.push_str(RELOAD_SCRIPT),
            }
        }
        Ok(Response::html(body))
    }

    /// The 404 page for `NotFound`, the 500 page for everything else.
    pub fn error_page(&self, err: &Error) -> Response {
        let (status_code, template) = match err {
            Error::NotFound(_) => (404, "errors/404.html"),
            _ => (500, "errors/500.html"),
        };
        if status_code == 500 {
            error!("Request failed: {}", err);
        } else {
            debug!("{}", err);
        }
        match render_template(&self.settings.template.dir, template, &Context::new()) {
            Ok(body) => Response::html(body).with_status(status_code),
            Err(e) => {
                warn!("Falling back to plain error page: {}", e);
                Response::text(format!("{} {}", status_code, status_text(status_code)))
                    .with_status(status_code)
            }
        }
    }
}

/// Represents the outcome of an HTTP handler.
/// Supports HTML, JSON, redirects and custom status/headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status_code: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
    /// Messages for the next rendered page; written to the flash cookie.
    pub flashes: Vec<String>,
}

impl Response {
    fn with_content_type(status_code: u16, body: String, content_type: &str) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), content_type.to_string());
        Response {
            status_code,
            body,
            headers,
            flashes: Vec::new(),
        }
    }

    /// Construct a new HTTP 200 response with HTML body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::html(body)
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::with_content_type(200, body.into(), "text/html; charset=utf-8")
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::with_content_type(200, body.into(), "text/plain; charset=utf-8")
    }

    /// Construct a new HTTP 404 "not found" response.
    pub fn not_found() -> Self {
        Self::text("404 Not Found").with_status(404)
    }

    pub fn method_not_allowed() -> Self {
        Self::text("405 Method Not Allowed").with_status(405)
    }

    pub fn server_error() -> Self {
        Self::text("500 Internal Server Error").with_status(500)
    }

    /// Construct a new HTTP JSON response.
    /// Accepts any serde-serializable payload, status, and custom headers.
    pub fn json<T: Serialize>(data: T, status_code: u16, mut headers: HashMap<String, String>) -> Self {
        headers.insert(
            "Content-Type".to_string(),
            "application/json; charset=utf-8".to_string(),
        );
        let (status_code, body) = match serde_json::to_string(&data) {
            Ok(body) => (status_code, body),
            Err(e) => {
                error!("JSON serialization failed: {}", e);
                (500, "{\"error\": \"Serialization failed\"}".to_string())
            }
        };
        Response {
            status_code,
            body,
            headers,
            flashes: Vec::new(),
        }
    }

    /// `303 See Other`, so a POST is followed by a GET.
    pub fn redirect(location: impl Into<String>) -> Self {
        let mut response = Self::text("").with_status(303);
        response
            .headers
            .insert("Location".to_string(), location.into());
        response
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_flash(mut self, message: impl Into<String>) -> Self {
        self.flashes.push(message.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = axum::http::Response::builder().status(status);
        for (key, value) in &self.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        match builder.body(Body::from(self.body)) {
            Ok(response) => response,
            Err(e) => {
                error!("Invalid response headers: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error").into_response()
            }
        }
    }
}

/// Holds metadata about the current HTTP request and its extracted path parameters.
/// Middleware and handlers can modify/read this context.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub params: HashMap<String, String>,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub form: FormData,
    /// Flash messages carried in from the previous response.
    pub flashes: Vec<String>,
    pub start_time: Option<Instant>,
}

impl RequestContext {
    /// `target` is the request path, optionally followed by `?query`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        RequestContext {
            method,
            path: path.to_string(),
            query: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            params: HashMap::new(),
            headers: HashMap::new(),
            form: FormData::default(),
            flashes: Vec::new(),
            start_time: None,
        }
    }

    pub fn with_form(mut self, form: FormData) -> Self {
        self.form = form;
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Integer path parameter; anything else is treated as a missing record.
    pub fn param_id(&self, name: &str) -> Result<i64> {
        let raw = self.param(name).unwrap_or_default();
        raw.parse()
            .map_err(|_| Error::not_found(format!("no record with {} `{}`", name, raw)))
    }
}

/// Type alias for async handler functions for HTTP routes.
pub type Handler =
    Arc<dyn Fn(RequestContext, AppState) -> BoxFuture<'static, Result<Response>> + Send + Sync>;

/// Type alias for synchronous, pre-processing middleware executed before the handler.
/// If a middleware returns Some(Response), request handling stops and this response is sent.
pub type Middleware = Arc<dyn Fn(&mut RequestContext) -> Option<Response> + Send + Sync>;

/// Type alias for post-processing middleware executed after the handler.
/// Post-middleware can inspect/modify the response before it is sent.
pub type PostMiddleware = Arc<dyn Fn(&RequestContext, Response) -> Response + Send + Sync>;

/// Box an `async fn(RequestContext, AppState) -> Result<Response>` into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(RequestContext, AppState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    Arc::new(
        move |ctx: RequestContext, state: AppState| -> BoxFuture<'static, Result<Response>> {
            Box::pin(f(ctx, state))
        },
    )
}

/// Represents a registered HTTP route and its associated handler + middleware.
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub path_pattern: String,
    pub handler: Handler,
    pub middlewares: Vec<Middleware>,
}

/// The main application router.
/// Manages all HTTP routes and global middleware.
#[derive(Clone, Default)]
pub struct Router {
    pub routes: Vec<Route>,
    pub middlewares: Vec<Middleware>,
    pub post_middlewares: Vec<PostMiddleware>,
    pub app_state: Option<AppState>,
}

/// Maps status codes to HTTP status text for responses.
pub fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        303 => "See Other",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

impl Router {
    /// Create a new, empty application router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route. The first registered route matching method and path wins.
    pub fn add_route(
        &mut self,
        method: Method,
        path_pattern: &str,
        handler: Handler,
        middlewares: Vec<Middleware>,
    ) {
        self.routes.push(Route {
            method,
            path_pattern: path_pattern.to_string(),
            handler,
            middlewares,
        });
    }

    /// Add a global pre-middleware to be run before all HTTP handlers.
    pub fn add_middleware(&mut self, middleware: Middleware) {
        self.middlewares.push(middleware);
    }

    /// Add a post-middleware to be run after each HTTP handler.
    pub fn add_post_middleware(&mut self, middleware: PostMiddleware) {
        self.post_middlewares.push(middleware);
    }

    pub fn set_app_state(&mut self, state: AppState) {
        self.app_state = Some(state);
    }

    /// Run one request through pre-middleware, the matching route and post-middleware.
    pub async fn dispatch(&self, mut ctx: RequestContext) -> Response {
        let Some(state) = self.app_state.clone() else {
            error!("App state not set in Router");
            return Response::server_error();
        };
        let mut response = self.handle(&mut ctx, &state).await;
        for post_middleware in &self.post_middlewares {
            response = (post_middleware)(&ctx, response);
        }
        response
    }

    async fn handle(&self, ctx: &mut RequestContext, state: &AppState) -> Response {
        for middleware in &self.middlewares {
            if let Some(response) = (middleware)(ctx) {
                return response;
            }
        }

        let mut path_matched = false;
        for route in &self.routes {
            let Some(params) = match_path(&route.path_pattern, &ctx.path) else {
                continue;
            };
            if route.method != ctx.method {
                path_matched = true;
                continue;
            }
            ctx.params = params;
            for middleware in &route.middlewares {
                if let Some(response) = (middleware)(ctx) {
                    return response;
                }
            }
            return match (route.handler)(ctx.clone(), state.clone()).await {
                Ok(response) => response,
                Err(err) => state.error_page(&err),
            };
        }

        if path_matched {
            Response::method_not_allowed()
        } else {
            state.error_page(&Error::not_found(format!("no route for {}", ctx.path)))
        }
    }

    /// Turn an axum request into a [`RequestContext`] and dispatch it.
    async fn serve(&self, request: axum::extract::Request) -> Response {
        let (parts, body) = request.into_parts();
        let Some(method) = Method::from_http(&parts.method) else {
            return Response::method_not_allowed();
        };
        let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Unreadable request body: {}", e);
                return Response::text("400 Bad Request").with_status(400);
            }
        };
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let mut ctx = RequestContext::new(method, target).with_form(FormData::parse(&bytes));
        for (name, value) in &parts.headers {
            if let Ok(value) = value.to_str() {
                ctx.headers.insert(name.as_str().to_string(), value.to_string());
            }
        }
        self.dispatch(ctx).await
    }

    /// Build the axum service: every request falls through to [`Router::dispatch`],
    /// plus `/ws/reload` when a reload channel is given.
    pub fn into_axum(self, reload_sender: Option<broadcast::Sender<String>>) -> AxumRouter {
        let router = Arc::new(self);
        let mut app = AxumRouter::new();

        if let Some(sender) = reload_sender {
            app = app.route(
                "/ws/reload",
                get(move |ws: WebSocketUpgrade| {
                    let sender = sender.clone();
                    async move { ws.on_upgrade(move |socket| forward_reloads(socket, sender)) }
                }),
            );
        }

        app.fallback(move |request: axum::extract::Request| {
            let router = router.clone();
            async move { router.serve(request).await }
        })
    }

    /// Bind `settings.host:settings.port` and serve until the process stops.
    pub async fn run(self) -> Result<()> {
        let settings = self
            .app_state
            .as_ref()
            .map(|state| state.settings.clone())
            .ok_or_else(|| Error::Http("App state not set in Router".to_string()))?;

        let mut reload_sender = None;
        if settings.debug {
            let (sender, _) = broadcast::channel::<String>(10);
            watch_templates(settings.template.dir.clone(), sender.clone());
            reload_sender = Some(sender);
        }

        let addr = settings.bind_addr();
        let listener = TcpListener::bind(&addr).await?;
        info!("HTTP Server running on http://{}", addr);

        axum::serve(listener, self.into_axum(reload_sender))
            .await
            .map_err(|e| Error::Http(e.to_string()))
    }
}

async fn forward_reloads(mut socket: WebSocket, sender: broadcast::Sender<String>) {
    let mut rx = sender.subscribe();
    info!("🔌 Hot Reload WebSocket client connected!");
    while let Ok(msg) = rx.recv().await {
        if socket.send(Message::Text(msg.into())).await.is_err() {
            break;
        }
    }
}

/// Watches the template directory for changes; notifies via WS broadcast for live-reload.
pub fn watch_templates(template_path: PathBuf, sender: broadcast::Sender<String>) {
    tokio::spawn(async move {
        let (tx, mut rx) = tokio::sync::mpsc::channel(32);
        let mut watcher = match notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.blocking_send(res);
        }) {
            Ok(watcher) => watcher,
            Err(e) => {
                error!("Failed to create template watcher: {}", e);
                return;
            }
        };

        if let Err(e) = watcher.watch(&template_path, RecursiveMode::Recursive) {
            error!("Cannot watch {}: {}", template_path.display(), e);
            return;
        }

        while let Some(res) = rx.recv().await {
            match res {
                Ok(notify::Event {
                    kind: EventKind::Modify(Data(DataChange::Content)),
                    paths,
                    ..
                }) => {
                    if let Some(file_name) = paths
                        .first()
                        .and_then(|p| p.file_name())
                        .and_then(|n| n.to_str())
                    {
                        info!("📄 Template changed: {}", file_name);
                        let _ = sender.send("reload".to_string());
                    }
                }
                Ok(_) => {}
                Err(e) => error!("Watch error: {:?}", e),
            }
        }
    });
}

#[macro_export]
macro_rules! route {
    ($router:expr, $( $method:ident $path:expr => { $handler:expr $(, $middleware:expr )* } ),* $(,)?) => {
        $(
            $router.add_route(
                $crate::router::Method::$method,
                $path,
                $crate::router::handler($handler),
                vec![$($middleware),*]
            );
        )*
    };
}

/// Matches a path pattern (e.g. `/foo/:id`) against a real path,
/// extracting parameters into a HashMap if matched, or None if not.
pub fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let path_parts: Vec<&str> = path.trim_matches('/').split('/').collect();

    if pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();

    for (p, a) in pattern_parts.iter().zip(path_parts.iter()) {
        if let Some(name) = p.strip_prefix(':') {
            params.insert(name.to_string(), a.to_string());
        } else if p != a {
            return None;
        }
    }

    Some(params)
}
