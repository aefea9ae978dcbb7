//! Minimal HTTP/1.1 mirror for integration tests.
//!
//! Serves fixed bodies by request path; unknown paths get 404. A route can
//! stall mid-body to simulate a slow transfer. Every request path is logged.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
    /// Pause after the first half of the body.
    pub stall: Option<Duration>,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            stall: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: format!("status {}", status).into_bytes(),
            stall: None,
        }
    }

    pub fn stalled(body: impl Into<Vec<u8>>, stall: Duration) -> Self {
        Self {
            stall: Some(stall),
            ..Self::ok(body)
        }
    }
}

pub struct MirrorServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MirrorServer {
    /// Starts serving `routes` (keyed by absolute path, e.g. "/snapshots/amd64/bsd")
    /// on a background thread. Runs until the process exits.
    pub fn start(routes: HashMap<String, Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let routes = Arc::new(routes);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&log);
                thread::spawn(move || handle(stream, &routes, &log));
            }
        });
        Self {
            base_url: format!("http://127.0.0.1:{}/", port),
            requests,
        }
    }

    /// e.g. "http://127.0.0.1:12345/"
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Paths requested so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if buf.len() > 16 * 1024 {
            return None;
        }
    }
    String::from_utf8(buf).ok()
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Route>, log: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let head = match read_head(&mut stream) {
        Some(h) => h,
        None => return,
    };
    let path = head
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string();
    log.lock().unwrap().push(path.clone());

    let route = routes
        .get(&path)
        .cloned()
        .unwrap_or_else(|| Route::status(404));
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status,
        reason(route.status),
        route.body.len()
    );
    if stream.write_all(header.as_bytes()).is_err() {
        return;
    }
    match route.stall {
        Some(stall) => {
            let half = route.body.len() / 2;
            let _ = stream.write_all(&route.body[..half]);
            let _ = stream.flush();
            thread::sleep(stall);
            let _ = stream.write_all(&route.body[half..]);
        }
        None => {
            let _ = stream.write_all(&route.body);
        }
    }
    let _ = stream.flush();
}
