//! A small static file server for previewing the output root. It answers
//! `GET` and `HEAD` requests with files under the root, serves
//! `index.html` for directory requests, and runs until its
//! [`ShutdownHandle`] is triggered (Ctrl-C when started via [`serve`]).

use log::{debug, info, warn};
use percent_encoding::percent_decode_str;
use std::fmt;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Weak};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

/// Settings for the dev server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// The directory to serve.
    pub root: PathBuf,

    /// The address to bind to.
    pub host: String,

    /// The port to listen on.
    pub port: u16,

    /// Whether to open the root URL in a browser once listening.
    pub open_browser: bool,
}

/// Binds the server, stops it on Ctrl-C, and serves until then.
pub fn serve(config: &ServerConfig) -> Result<()> {
    let server = DevServer::bind(config)?;
    let handle = server.shutdown_handle();
    ctrlc::set_handler(move || {
        info!("shutting down");
        handle.shutdown();
    })
    .map_err(Error::Signal)?;
    server.run();
    Ok(())
}

/// A bound, not yet running, server.
pub struct DevServer {
    server: Arc<Server>,
    root: PathBuf,
    url: String,
    open_browser: bool,
}

/// Stops a running [`DevServer`] from any thread. The handle doesn't keep
/// the server alive, so the socket is released as soon as `run` returns.
#[derive(Clone)]
pub struct ShutdownHandle(Weak<Server>);

impl ShutdownHandle {
    /// Makes [`DevServer::run`] return. Does nothing once it has.
    pub fn shutdown(&self) {
        if let Some(server) = self.0.upgrade() {
            server.unblock();
        }
    }
}

impl DevServer {
    /// Binds to `config.host:config.port`.
    pub fn bind(config: &ServerConfig) -> Result<DevServer> {
        let server = Server::http((config.host.as_str(), config.port)).map_err(|err| {
            Error::Bind {
                addr: format!("{}:{}", config.host, config.port),
                err,
            }
        })?;
        Ok(DevServer {
            server: Arc::new(server),
            root: config.root.clone(),
            url: root_url(&config.host, config.port),
            open_browser: config.open_browser,
        })
    }

    /// The URL of the site root.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::downgrade(&self.server))
    }

    /// Serves requests until shut down, then releases the socket.
    pub fn run(self) {
        info!("serving `{}` at {}", self.root.display(), self.url);
        if self.open_browser {
            if let Err(e) = open::that(&self.url) {
                warn!("failed to open browser: {}", e);
            }
        }

        for request in self.server.incoming_requests() {
            handle_request(&self.root, request);
        }
        info!("server stopped");
    }
}

fn root_url(host: &str, port: u16) -> String {
    let host = match host {
        "" | "0.0.0.0" | "::" => "localhost",
        host => host,
    };
    match host.contains(':') {
        true => format!("http://[{}]:{}/", host, port),
        false => format!("http://{}:{}/", host, port),
    }
}

/// What a request path maps to.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolved {
    /// A file to send.
    File(PathBuf),

    /// A directory requested without its trailing slash; the value is the
    /// location to redirect to.
    Redirect(String),

    NotFound,
}

/// Maps a request URL onto a file under `root`. Paths are percent-decoded;
/// any `..` segment resolves to [`Resolved::NotFound`].
pub fn resolve(root: &Path, url: &str) -> Resolved {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or("");
    let decoded = match percent_decode_str(path).decode_utf8() {
        Ok(decoded) => decoded,
        Err(_) => return Resolved::NotFound,
    };

    let mut relative = PathBuf::new();
    for segment in decoded.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => relative.push(name),
            _ => return Resolved::NotFound,
        }
    }

    let candidate = root.join(&relative);
    if candidate.is_dir() {
        if !decoded.ends_with('/') {
            return Resolved::Redirect(format!("{}/", path));
        }
        let index = candidate.join("index.html");
        match index.is_file() {
            true => Resolved::File(index),
            false => Resolved::NotFound,
        }
    } else if candidate.is_file() {
        Resolved::File(candidate)
    } else {
        Resolved::NotFound
    }
}

/// Picks a `Content-Type` from the file extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" | "md" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name, value).ok()
}

fn handle_request(root: &Path, request: Request) {
    let method = request.method().clone();
    let url = request.url().to_owned();

    let result = match method {
        Method::Get | Method::Head => match resolve(root, &url) {
            Resolved::File(path) => match File::open(&path) {
                Ok(file) => {
                    let mut response = Response::from_file(file);
                    if let Some(h) = header("Content-Type", content_type(&path)) {
                        response.add_header(h);
                    }
                    debug!("{} {} -> 200", method, url);
                    request.respond(response)
                }
                Err(e) => {
                    warn!("failed to open `{}`: {}", path.display(), e);
                    request.respond(text_response(500, "500 Internal Server Error"))
                }
            },
            Resolved::Redirect(location) => {
                debug!("{} {} -> 301 {}", method, url, location);
                let mut response = text_response(301, "301 Moved Permanently");
                if let Some(h) = header("Location", &location) {
                    response.add_header(h);
                }
                request.respond(response)
            }
            Resolved::NotFound => {
                debug!("{} {} -> 404", method, url);
                request.respond(text_response(404, "404 Not Found"))
            }
        },
        _ => {
            debug!("{} {} -> 405", method, url);
            let mut response = text_response(405, "405 Method Not Allowed");
            if let Some(h) = header("Allow", "GET, HEAD") {
                response.add_header(h);
            }
            request.respond(response)
        }
    };

    if let Err(e) = result {
        warn!("failed to send response for {}: {}", url, e);
    }
}

fn text_response(status: u16, body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut response = Response::from_string(body).with_status_code(StatusCode(status));
    if let Some(h) = header("Content-Type", "text/plain; charset=utf-8") {
        response.add_header(h);
    }
    response
}

/// The result of a server operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error starting the dev server.
#[derive(Debug)]
pub enum Error {
    /// Returned when the listening socket can't be bound.
    Bind {
        addr: String,
        err: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Returned when the interrupt handler can't be installed.
    Signal(ctrlc::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Bind { addr, err } => write!(f, "binding {}: {}", addr, err),
            Error::Signal(err) => write!(f, "installing Ctrl-C handler: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Bind { err, .. } => Some(err.as_ref()),
            Error::Signal(err) => Some(err),
        }
    }
}
