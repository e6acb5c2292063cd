//! Minimal Swift-like HTTP/1.1 server for integration tests.
//!
//! Speaks just enough of the object API for an SLO upload: HEAD and PUT on
//! containers, PUT on objects (replies with an ETag) and PUT of a manifest
//! with `?multipart-manifest=put`, which is checked against stored segments.
//! Every response closes the connection.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const ACCOUNT: &str = "/v1/AUTH_test";
pub const TOKEN: &str = "secret-token";

#[derive(Debug, Default)]
struct State {
    containers: HashSet<String>,
    /// `<container>/<object>` -> body.
    objects: HashMap<String, Vec<u8>>,
    /// `<container>/<object>` -> manifest JSON.
    manifests: HashMap<String, Vec<u8>>,
    /// Object paths that fail with 500 this many more times (`usize::MAX` = always).
    failures: HashMap<String, usize>,
    reject_manifests: bool,
    object_puts: usize,
}

/// Handle to a running server; clones share state.
#[derive(Clone)]
pub struct SwiftServer {
    port: u16,
    state: Arc<Mutex<State>>,
}

impl SwiftServer {
    /// Start the server on an ephemeral port. Runs until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State::default()));
        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&shared);
                thread::spawn(move || handle(stream, &state));
            }
        });
        Self { port, state }
    }

    pub fn storage_url(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, ACCOUNT)
    }

    pub fn add_container(&self, name: &str) {
        self.state.lock().unwrap().containers.insert(name.to_string());
    }

    /// PUTs of `<container>/<object>` fail with 500 `times` times, then succeed.
    pub fn fail_object(&self, path: &str, times: usize) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(path.to_string(), times);
    }

    pub fn reject_manifests(&self) {
        self.state.lock().unwrap().reject_manifests = true;
    }

    pub fn has_container(&self, name: &str) -> bool {
        self.state.lock().unwrap().containers.contains(name)
    }

    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().objects.get(path).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    pub fn object_puts(&self) -> usize {
        self.state.lock().unwrap().object_puts
    }

    pub fn manifest(&self, path: &str) -> Option<serde_json::Value> {
        let state = self.state.lock().unwrap();
        let raw = state.manifests.get(path)?;
        serde_json::from_slice(raw).ok()
    }

    /// Concatenate the segments a stored manifest points at.
    pub fn reassemble(&self, path: &str) -> Option<Vec<u8>> {
        let manifest = self.manifest(path)?;
        let mut out = Vec::new();
        for entry in manifest.as_array()? {
            let seg = entry["path"].as_str()?.trim_start_matches('/');
            out.extend_from_slice(&self.object(seg)?);
        }
        Some(out)
    }
}

struct Request {
    method: String,
    path: String,
    query: Option<String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        if let Some(pos) = find(&data, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
    };
    let head = std::str::from_utf8(&data[..header_end]).ok()?.to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?;
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), Some(q.to_string())),
        None => (target.to_string(), None),
    };
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let mut req = Request {
        method,
        path,
        query,
        headers,
        body: data[header_end + 4..].to_vec(),
    };
    let len: usize = req
        .header("Content-Length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while req.body.len() < len {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        req.body.extend_from_slice(&buf[..n]);
    }
    Some(req)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn etag_of(data: &[u8]) -> String {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in data {
        h ^= *b as u64;
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    format!("{:016x}", h)
}

fn respond(stream: &mut TcpStream, status: &str, extra: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
        status,
        body.len(),
        extra,
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn handle(mut stream: TcpStream, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };

    if req.header("X-Auth-Token") != Some(TOKEN) {
        respond(&mut stream, "401 Unauthorized", "", "<html><h1>Unauthorized</h1></html>");
        return;
    }
    let Some(rest) = req.path.strip_prefix(ACCOUNT) else {
        respond(&mut stream, "404 Not Found", "", "");
        return;
    };
    let rest = rest.trim_start_matches('/');
    let (container, object) = match rest.split_once('/') {
        Some((c, o)) => (c.to_string(), Some(o.to_string())),
        None => (rest.to_string(), None),
    };

    let mut st = state.lock().unwrap();
    match (req.method.as_str(), object) {
        ("HEAD", None) => {
            if st.containers.contains(&container) {
                respond(&mut stream, "204 No Content", "", "");
            } else {
                respond(&mut stream, "404 Not Found", "", "");
            }
        }
        ("PUT", None) => {
            if st.containers.insert(container) {
                respond(&mut stream, "201 Created", "", "");
            } else {
                respond(&mut stream, "202 Accepted", "", "");
            }
        }
        ("PUT", Some(object)) => {
            if !st.containers.contains(&container) {
                respond(&mut stream, "404 Not Found", "", "");
                return;
            }
            let key = format!("{}/{}", container, object);
            if req.query.as_deref() == Some("multipart-manifest=put") {
                let verdict = check_manifest(&st, &req.body);
                if st.reject_manifests {
                    respond(&mut stream, "503 Service Unavailable", "", "manifests disabled");
                } else if let Err(msg) = verdict {
                    respond(&mut stream, "400 Bad Request", "", &msg);
                } else {
                    st.manifests.insert(key, req.body);
                    respond(&mut stream, "201 Created", "", "");
                }
                return;
            }
            st.object_puts += 1;
            if let Some(left) = st.failures.get_mut(&key) {
                if *left > 0 {
                    if *left != usize::MAX {
                        *left -= 1;
                    }
                    respond(&mut stream, "500 Internal Server Error", "", "boom");
                    return;
                }
            }
            let etag = etag_of(&req.body);
            st.objects.insert(key, req.body);
            respond(&mut stream, "201 Created", &format!("Etag: \"{}\"\r\n", etag), "");
        }
        _ => respond(&mut stream, "405 Method Not Allowed", "", ""),
    }
}

/// Every entry must name a stored object with a matching ETag and size.
fn check_manifest(st: &State, body: &[u8]) -> Result<(), String> {
    let entries: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| format!("bad manifest json: {}", e))?;
    let entries = entries.as_array().ok_or("manifest is not a list")?;
    for entry in entries {
        let path = entry["path"].as_str().ok_or("entry without path")?;
        let data = st
            .objects
            .get(path.trim_start_matches('/'))
            .ok_or_else(|| format!("missing segment {}", path))?;
        if entry["etag"].as_str() != Some(etag_of(data).as_str()) {
            return Err(format!("etag mismatch for {}", path));
        }
        if entry["size_bytes"].as_u64() != Some(data.len() as u64) {
            return Err(format!("size mismatch for {}", path));
        }
    }
    Ok(())
}
