//! In-process mock servers for the three protocols
//!
//! Each server binds to an ephemeral port on localhost, serves every
//! connection on its own thread and keeps its entries in memory. The
//! recorded requests let tests check what went over the wire.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cachecon::protocol::rpc::{
    encode_response, read_request, Command, Request, Response, ResponseBody, Status,
};
use cachecon::{ClientKind, Config};

fn spawn_listener<F>(handler: F) -> SocketAddr
where
    F: Fn(TcpStream) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { return };
            let handler = Arc::clone(&handler);
            thread::spawn(move || handler(stream));
        }
    });

    addr
}

/// Config pointing a client of `kind` at `addr`
pub fn config_for(kind: ClientKind, addr: SocketAddr) -> Config {
    Config::builder()
        .client_type(kind)
        .host(addr.ip().to_string())
        .port(addr.port())
        .timeout_ms(2000)
        .build()
}

/// Sleep outside the state lock so other connections keep being served
fn hold_reply(delay: Option<Duration>) {
    if let Some(delay) = delay {
        thread::sleep(delay);
    }
}

// =============================================================================
// RPC Server
// =============================================================================

#[derive(Default)]
pub struct RpcState {
    pub entries: HashMap<Vec<u8>, (i64, Vec<u8>)>,
    pub next_version: i64,
    pub requests: Vec<Request>,
    /// Hold back the next reply this long
    pub reply_delay: Option<Duration>,
}

pub struct MockRpcServer {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<RpcState>>,
}

impl MockRpcServer {
    pub fn start() -> Self {
        Self::start_with(None)
    }

    /// Server whose first reply arrives after `delay`
    pub fn start_delayed(delay: Duration) -> Self {
        Self::start_with(Some(delay))
    }

    fn start_with(reply_delay: Option<Duration>) -> Self {
        let state = Arc::new(Mutex::new(RpcState {
            next_version: 1,
            reply_delay,
            ..Default::default()
        }));
        let shared = Arc::clone(&state);
        let addr = spawn_listener(move |stream| serve_rpc(stream, &shared));
        Self { addr, state }
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn last_request(&self) -> Request {
        self.state.lock().unwrap().requests.last().cloned().unwrap()
    }
}

fn serve_rpc(stream: TcpStream, state: &Mutex<RpcState>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut writer = stream;
    loop {
        let Ok(request) = read_request(&mut reader) else { return };
        let response = handle_rpc(state, request);
        let delay = state.lock().unwrap().reply_delay.take();
        hold_reply(delay);
        if writer.write_all(&encode_response(&response)).is_err() {
            return;
        }
    }
}

fn handle_rpc(state: &Mutex<RpcState>, request: Request) -> Response {
    let mut state = state.lock().unwrap();
    state.requests.push(request.clone());

    let id = request.message_id;
    let code = request.command.opcode().response_code();
    let reply = |status| Response::status_only(id, code, status);

    match request.command {
        Command::Put { key, .. } | Command::Get { key } if key.ends_with(b"boom") => {
            Response::error(id, Status::ServerError, "boom")
        }
        Command::Put { key, value, .. } => {
            let version = state.next_version;
            state.next_version += 1;
            state.entries.insert(key, (version, value));
            reply(Status::Success)
        }
        Command::PutIfAbsent { key, value, .. } => {
            if state.entries.contains_key(&key) {
                return reply(Status::NotExecuted);
            }
            let version = state.next_version;
            state.next_version += 1;
            state.entries.insert(key, (version, value));
            reply(Status::Success)
        }
        Command::ReplaceIfUnmodified {
            key,
            value,
            version,
            ..
        } => match state.entries.get(&key) {
            None => reply(Status::KeyDoesNotExist),
            Some((current, _)) if *current != version => reply(Status::NotExecuted),
            Some(_) => {
                let next = state.next_version;
                state.next_version += 1;
                state.entries.insert(key, (next, value));
                reply(Status::Success)
            }
        },
        Command::Get { key } => match state.entries.get(&key) {
            Some((_, value)) => Response {
                message_id: id,
                opcode: code,
                status: Status::Success,
                body: ResponseBody::Value(value.clone()),
            },
            None => reply(Status::KeyDoesNotExist),
        },
        Command::GetWithVersion { key } => match state.entries.get(&key) {
            Some((version, value)) => Response {
                message_id: id,
                opcode: code,
                status: Status::Success,
                body: ResponseBody::Versioned {
                    version: *version,
                    value: value.clone(),
                },
            },
            None => reply(Status::KeyDoesNotExist),
        },
        Command::ContainsKey { key } => {
            if state.entries.contains_key(&key) {
                reply(Status::Success)
            } else {
                reply(Status::KeyDoesNotExist)
            }
        }
        Command::Remove { key } => match state.entries.remove(&key) {
            Some(_) => reply(Status::Success),
            None => reply(Status::KeyDoesNotExist),
        },
        Command::RemoveIfUnmodified { key, version } => match state.entries.get(&key) {
            None => reply(Status::KeyDoesNotExist),
            Some((current, _)) if *current != version => reply(Status::NotExecuted),
            Some(_) => {
                state.entries.remove(&key);
                reply(Status::Success)
            }
        },
        Command::Clear => {
            state.entries.clear();
            reply(Status::Success)
        }
        Command::Ping => reply(Status::Success),
    }
}

// =============================================================================
// Text Server
// =============================================================================

#[derive(Default)]
pub struct TextState {
    /// key -> (cas, exptime, data)
    pub entries: HashMap<String, (u64, u32, Vec<u8>)>,
    pub next_cas: u64,
    pub commands: Vec<String>,
    /// Answer every failed cas with NOT_STORED
    pub ambiguous_cas: bool,
    /// Hold back the next reply this long
    pub reply_delay: Option<Duration>,
}

pub struct MockTextServer {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<TextState>>,
}

impl MockTextServer {
    pub fn start() -> Self {
        Self::start_with(false, None)
    }

    /// Server whose failed `cas` replies do not say why
    pub fn start_ambiguous() -> Self {
        Self::start_with(true, None)
    }

    /// Server whose first reply arrives after `delay`
    pub fn start_delayed(delay: Duration) -> Self {
        Self::start_with(false, Some(delay))
    }

    fn start_with(ambiguous_cas: bool, reply_delay: Option<Duration>) -> Self {
        let state = Arc::new(Mutex::new(TextState {
            next_cas: 1,
            ambiguous_cas,
            reply_delay,
            ..Default::default()
        }));
        let shared = Arc::clone(&state);
        let addr = spawn_listener(move |stream| serve_text(stream, &shared));
        Self { addr, state }
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }
}

fn serve_text(stream: TcpStream, state: &Mutex<TextState>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut writer = stream;
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let line = line.trim_end_matches("\r\n").to_string();
        let parts: Vec<&str> = line.split(' ').collect();

        // Storage commands carry a data block
        let data = if matches!(parts[0], "set" | "add" | "cas") {
            let len: usize = parts[4].parse().unwrap();
            let mut data = vec![0u8; len + 2];
            if reader.read_exact(&mut data).is_err() {
                return;
            }
            data.truncate(len);
            Some(data)
        } else {
            None
        };

        let reply = handle_text(state, &line, &parts, data);
        let delay = state.lock().unwrap().reply_delay.take();
        hold_reply(delay);
        if writer.write_all(&reply).is_err() {
            return;
        }
    }
}

fn handle_text(state: &Mutex<TextState>, line: &str, parts: &[&str], data: Option<Vec<u8>>) -> Vec<u8> {
    let mut state = state.lock().unwrap();
    state.commands.push(line.to_string());

    let store = |state: &mut TextState, key: &str, exptime: u32, data: Vec<u8>| {
        let cas = state.next_cas;
        state.next_cas += 1;
        state.entries.insert(key.to_string(), (cas, exptime, data));
    };

    match parts[0] {
        "set" => {
            store(&mut *state, parts[1], parts[3].parse().unwrap(), data.unwrap());
            b"STORED\r\n".to_vec()
        }
        "add" => {
            if state.entries.contains_key(parts[1]) {
                return b"NOT_STORED\r\n".to_vec();
            }
            store(&mut *state, parts[1], parts[3].parse().unwrap(), data.unwrap());
            b"STORED\r\n".to_vec()
        }
        "cas" => {
            let expected: u64 = parts[5].parse().unwrap();
            let current = state.entries.get(parts[1]).map(|(cas, _, _)| *cas);
            match current {
                None if state.ambiguous_cas => b"NOT_STORED\r\n".to_vec(),
                None => b"NOT_FOUND\r\n".to_vec(),
                Some(cas) if cas != expected && state.ambiguous_cas => b"NOT_STORED\r\n".to_vec(),
                Some(cas) if cas != expected => b"EXISTS\r\n".to_vec(),
                Some(_) => {
                    store(&mut *state, parts[1], parts[3].parse().unwrap(), data.unwrap());
                    b"STORED\r\n".to_vec()
                }
            }
        }
        "get" | "gets" => match state.entries.get(parts[1]) {
            Some((cas, _, data)) => {
                let mut out = if parts[0] == "gets" {
                    format!("VALUE {} 0 {} {}\r\n", parts[1], data.len(), cas).into_bytes()
                } else {
                    format!("VALUE {} 0 {}\r\n", parts[1], data.len()).into_bytes()
                };
                out.extend_from_slice(data);
                out.extend_from_slice(b"\r\nEND\r\n");
                out
            }
            None => b"END\r\n".to_vec(),
        },
        "delete" => match state.entries.remove(parts[1]) {
            Some(_) => b"DELETED\r\n".to_vec(),
            None => b"NOT_FOUND\r\n".to_vec(),
        },
        "flush_all" => {
            state.entries.clear();
            b"OK\r\n".to_vec()
        }
        _ => b"ERROR\r\n".to_vec(),
    }
}

// =============================================================================
// HTTP Server
// =============================================================================

/// Base path the mock serves caches under (the config default)
pub const REST_PREFIX: &str = "/rest/";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names lowercased
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Default)]
pub struct HttpState {
    /// "cache/key" path -> (etag counter, data)
    pub entries: HashMap<String, (u64, Vec<u8>)>,
    pub next_etag: u64,
    pub requests: Vec<RecordedRequest>,
}

pub struct MockHttpServer {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<HttpState>>,
}

impl MockHttpServer {
    pub fn start() -> Self {
        let state = Arc::new(Mutex::new(HttpState {
            next_etag: 1,
            ..Default::default()
        }));
        let shared = Arc::clone(&state);
        let addr = spawn_listener(move |stream| serve_http(stream, &shared));
        Self { addr, state }
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.state.lock().unwrap().requests.last().cloned().unwrap()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }
}

fn serve_http(stream: TcpStream, state: &Mutex<HttpState>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut writer = stream;
    while let Some(request) = read_http_request(&mut reader) {
        let head = request.method == "HEAD";
        let (status, etag, body) = handle_http(state, request);
        if write_http_response(&mut writer, status, etag, &body, head).is_err() {
            return;
        }
    }
}

fn read_http_request<R: BufRead>(reader: &mut R) -> Option<RecordedRequest> {
    let mut line = String::new();
    if reader.read_line(&mut line).ok()? == 0 {
        return None;
    }
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = HashMap::new();
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).ok()?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let len: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).ok()?;

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn handle_http(state: &Mutex<HttpState>, request: RecordedRequest) -> (u16, Option<u64>, Vec<u8>) {
    let mut state = state.lock().unwrap();
    state.requests.push(request.clone());

    let Some(resource) = request.path.strip_prefix(REST_PREFIX) else {
        return (404, None, Vec::new());
    };

    // Collection level: only clear is supported
    if !resource.contains('/') {
        return match request.method.as_str() {
            "DELETE" => {
                let prefix = format!("{}/", resource);
                state.entries.retain(|path, _| !path.starts_with(&prefix));
                (204, None, Vec::new())
            }
            _ => (500, None, Vec::new()),
        };
    }

    // Entry served without an entity tag
    if resource.ends_with("/untagged") && matches!(request.method.as_str(), "GET" | "HEAD") {
        return (200, None, b"v".to_vec());
    }

    if resource.ends_with("/teapot") {
        return (418, None, Vec::new());
    }

    let resource = resource.to_string();
    let current = state.entries.get(&resource).cloned();
    let if_match = request.headers.get("if-match").cloned();
    let matches = |etag: u64| if_match.as_deref() == Some(format!("\"{}\"", etag).as_str());

    match request.method.as_str() {
        "PUT" | "POST" => {
            if request.method == "POST" && current.is_some() {
                return (409, None, Vec::new());
            }
            if if_match.is_some() {
                match &current {
                    None => return (404, None, Vec::new()),
                    Some((etag, _)) if !matches(*etag) => return (409, None, Vec::new()),
                    Some(_) => {}
                }
            }
            let etag = state.next_etag;
            state.next_etag += 1;
            state.entries.insert(resource, (etag, request.body));
            (200, None, Vec::new())
        }
        "GET" | "HEAD" => match current {
            Some((etag, data)) => (200, Some(etag), data),
            None => (404, None, Vec::new()),
        },
        "DELETE" => match current {
            None => (204, None, Vec::new()),
            Some((etag, _)) if if_match.is_some() && !matches(etag) => (409, None, Vec::new()),
            Some(_) => {
                state.entries.remove(&resource);
                (200, None, Vec::new())
            }
        },
        _ => (500, None, Vec::new()),
    }
}

fn write_http_response<W: Write>(
    writer: &mut W,
    status: u16,
    etag: Option<u64>,
    body: &[u8],
    head: bool,
) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        204 => "No Content",
        404 => "Not Found",
        409 => "Conflict",
        418 => "I'm a teapot",
        _ => "Internal Server Error",
    };

    let mut out = format!("HTTP/1.1 {} {}\r\n", status, reason);
    if status != 204 {
        out.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    if let Some(etag) = etag {
        out.push_str(&format!("ETag: \"{}\"\r\n", etag));
    }
    out.push_str("\r\n");

    writer.write_all(out.as_bytes())?;
    if !head && status != 204 {
        writer.write_all(body)?;
    }
    writer.flush()
}
