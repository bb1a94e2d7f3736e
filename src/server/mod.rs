//! Development server with live reload
//!
//! Blog pages are rendered per request from a [`ContentCache`], so edits to a
//! post show up on the next request without a rebuild. Everything else is
//! served from the static directory.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use notify_debouncer_mini::new_debouncer;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

use crate::cache::ContentCache;
use crate::commands::generate::{is_relevant_change, watch_targets};
use crate::content::{parse_page_param, ComponentRegistry};
use crate::error::{ContentError, SiteError};
use crate::helpers::{blog_url, html_escape};
use crate::templates::SitePages;
use crate::Folio;

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// A request for one of the dynamically rendered pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// `/blog?page=N`, with the raw query value
    Blog(Option<String>),
    /// `/blog/page/N/`
    BlogPage(String),
    Post(String),
    Tags,
    Tag(String),
}

/// Server state
pub struct ServerState {
    folio: Folio,
    pages: SitePages,
    cache: Mutex<ContentCache>,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

impl ServerState {
    pub fn new(folio: &Folio, live_reload: bool) -> Result<Self> {
        let (reload_tx, _) = broadcast::channel::<()>(16);
        Ok(Self {
            folio: folio.clone(),
            pages: SitePages::new(&folio.config, ComponentRegistry::with_builtins())?,
            cache: Mutex::new(ContentCache::new(folio.loader())),
            reload_tx,
            live_reload,
        })
    }

    /// Notify every connected browser
    pub fn reload(&self) {
        let _ = self.reload_tx.send(());
    }

    /// Render a page, returning the status code and HTML body
    pub fn render(&self, request: &PageRequest) -> (StatusCode, String) {
        match self.try_render(request) {
            Ok(html) => (StatusCode::OK, self.finish_html(&html)),
            Err(e) if e.is_not_found() => {
                tracing::debug!("Not found: {:?}: {}", request, e);
                (StatusCode::NOT_FOUND, self.error_page("Page not found", &e))
            }
            Err(e) => {
                tracing::error!("Failed to render {:?}: {}", request, e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    self.error_page("Failed to render page", &e),
                )
            }
        }
    }

    fn try_render(&self, request: &PageRequest) -> Result<String, SiteError> {
        let collection = {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            cache.get_or_load()?
        };

        match request {
            PageRequest::Blog(raw) => {
                let page = parse_page_param(raw.as_deref())?;
                self.pages.blog_page(&collection, page)
            }
            PageRequest::BlogPage(raw) => {
                // Only numbers make it into generated links
                let page = raw
                    .parse::<usize>()
                    .map_err(|_| ContentError::NotFound(raw.clone()))?;
                self.pages.blog_page(&collection, page)
            }
            PageRequest::Post(id) => self.pages.post_page(&collection, id),
            PageRequest::Tags => self.pages.tags_page(&collection),
            PageRequest::Tag(tag) => self.pages.tag_page(&collection, tag),
        }
    }

    fn error_page(&self, title: &str, error: &SiteError) -> String {
        self.finish_html(&format!(
            "<!DOCTYPE html>\n<html>\n<head><title>{}</title></head>\n<body>\n<h1>{}</h1>\n<p>{}</p>\n</body>\n</html>\n",
            title,
            title,
            html_escape(&error.to_string())
        ))
    }

    fn finish_html(&self, html: &str) -> String {
        if self.live_reload {
            inject_live_reload(html)
        } else {
            html.to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct BlogQuery {
    page: Option<String>,
}

/// Build the router for `state`
pub fn router(state: Arc<ServerState>) -> Router {
    let config = &state.folio.config;
    let blog = format!("/{}", config.blog_dir.trim_matches('/'));
    let posts = format!("/{}", config.post_dir.trim_matches('/'));
    let tags = format!("/{}", config.tag_dir.trim_matches('/'));
    let blog_pages = format!("{}/{}", blog, config.pagination_dir.trim_matches('/'));

    let pages = Router::new()
        .route(&blog, get(blog_handler))
        .route(&format!("{}/", blog), get(blog_handler))
        .route(&format!("{}/:page", blog_pages), get(blog_page_handler))
        .route(&format!("{}/:page/", blog_pages), get(blog_page_handler))
        .route(&format!("{}/:id", posts), get(post_handler))
        .route(&format!("{}/:id/", posts), get(post_handler))
        .route(&tags, get(tags_handler))
        .route(&format!("{}/", tags), get(tags_handler))
        .route(&format!("{}/:tag", tags), get(tag_handler))
        .route(&format!("{}/:tag/", tags), get(tag_handler));

    let root = config.root.trim_end_matches('/');
    let pages = if root.is_empty() {
        pages
    } else {
        Router::new().nest(root, pages)
    };

    pages
        .route("/__livereload", get(livereload_handler))
        .fallback(fallback_handler)
        .with_state(state)
}

/// Start the development server
pub async fn start(folio: &Folio, ip: &str, port: u16, watch: bool, open: bool) -> Result<()> {
    let state = Arc::new(ServerState::new(folio, watch)?);
    let app = router(Arc::clone(&state));

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}{}", ip, port, blog_url(&folio.config, 1));
    println!("Server running at {}", url);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    // Start file watcher if watch mode is enabled
    if watch {
        let state = Arc::clone(&state);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_reload(&state) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Watch for file changes and tell browsers to reload
fn watch_and_reload(state: &ServerState) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    // Create debouncer to avoid multiple rapid reloads
    let mut debouncer = new_debouncer(Duration::from_millis(300), tx)?;
    for (path, mode) in watch_targets(&state.folio) {
        debouncer.watcher().watch(&path, mode)?;
        tracing::debug!("Watching: {:?}", path);
    }

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<_> = events
                    .iter()
                    .filter(|e| is_relevant_change(&e.path))
                    .collect();
                if changed.is_empty() {
                    continue;
                }
                for event in &changed {
                    tracing::info!("File changed: {}", event.path.display());
                }
                // The cache notices content changes by itself
                state.reload();
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Render on the blocking pool; markdown and highlighting are CPU bound
async fn render_page(state: Arc<ServerState>, request: PageRequest) -> Response {
    match tokio::task::spawn_blocking(move || state.render(&request)).await {
        Ok((status, html)) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Render task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

async fn blog_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<BlogQuery>,
) -> Response {
    render_page(state, PageRequest::Blog(query.page)).await
}

async fn blog_page_handler(
    State(state): State<Arc<ServerState>>,
    Path(page): Path<String>,
) -> Response {
    render_page(state, PageRequest::BlogPage(page)).await
}

async fn post_handler(State(state): State<Arc<ServerState>>, Path(id): Path<String>) -> Response {
    render_page(state, PageRequest::Post(id)).await
}

async fn tags_handler(State(state): State<Arc<ServerState>>) -> Response {
    render_page(state, PageRequest::Tags).await
}

async fn tag_handler(State(state): State<Arc<ServerState>>, Path(tag): Path<String>) -> Response {
    render_page(state, PageRequest::Tag(tag)).await
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            // Wait for reload signal
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            // Handle incoming messages (ping/pong)
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Fallback handler that serves static files and injects the live reload script
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let static_dir = &state.folio.static_dir;
    let path = request.uri().path();
    let clean_path = path.trim_start_matches('/');
    let candidate = static_dir.join(clean_path);

    // Without a static landing page the blog is the home page
    if path == "/" && !static_dir.join("index.html").is_file() {
        return Redirect::temporary(&blog_url(&state.folio.config, 1)).into_response();
    }

    let file_path = if candidate.is_dir() {
        candidate.join("index.html")
    } else {
        candidate
    };

    // Check if it's an HTML file that needs live reload injection
    let is_html = file_path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false);

    if is_html && state.live_reload && file_path.starts_with(static_dir) && !clean_path.contains("..") {
        if let Ok(content) = tokio::fs::read_to_string(&file_path).await {
            return Html(inject_live_reload(&content)).into_response();
        }
    }

    // Serve static file using tower-http
    let mut service = ServeDir::new(static_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replacen("</body>", LIVE_RELOAD_SCRIPT, 1)
    } else {
        // If no </body> tag, append to end
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
