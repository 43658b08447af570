//! In-process WebHDFS stand-in for client tests
//!
//! Serves a namenode and a datanode on one loopback port. CREATE and OPEN
//! answer with a 307 redirect back to the same port carrying `datanode=true`,
//! the way a real namenode hands off to a datanode.

use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Default)]
struct Tree {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    /// Pause between body bytes of datanode OPEN responses
    drip: Option<Duration>,
}

struct Reply {
    status: u16,
    reason: &'static str,
    location: Option<String>,
    body: Vec<u8>,
    drip: Option<Duration>,
}

impl Reply {
    fn json(status: u16, reason: &'static str, value: Value) -> Self {
        Self { status, reason, location: None, body: value.to_string().into_bytes(), drip: None }
    }

    fn ok(value: Value) -> Self {
        Self::json(200, "OK", value)
    }

    fn exception(status: u16, reason: &'static str, exception: &str, message: &str) -> Self {
        Self::json(
            status,
            reason,
            json!({"RemoteException": {
                "exception": exception,
                "javaClassName": format!("org.apache.hadoop.{exception}"),
                "message": message,
            }}),
        )
    }

    fn not_found(path: &str) -> Self {
        Self::exception(404, "Not Found", "FileNotFoundException", &format!("File does not exist: {path}"))
    }

    fn redirect(location: String) -> Self {
        Self { status: 307, reason: "Temporary Redirect", location: Some(location), body: Vec::new(), drip: None }
    }
}

pub struct FakeHdfs {
    addr: SocketAddr,
    tree: Arc<Mutex<Tree>>,
    server: JoinHandle<()>,
}

impl FakeHdfs {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let tree = Arc::new(Mutex::new(Tree::default()));
        tree.lock().unwrap().dirs.insert("/".to_string());

        let shared = Arc::clone(&tree);
        let server = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&shared), addr));
            }
        });
        Self { addr, tree, server }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn add_dir(&self, path: &str) {
        insert_dirs(&mut self.tree.lock().unwrap(), path);
    }

    pub fn add_file(&self, path: &str, contents: &[u8]) {
        let mut tree = self.tree.lock().unwrap();
        insert_dirs(&mut tree, &parent(path));
        tree.files.insert(path.to_string(), contents.to_vec());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.tree.lock().unwrap().files.get(path).cloned()
    }

    pub fn exists(&self, path: &str) -> bool {
        let tree = self.tree.lock().unwrap();
        tree.dirs.contains(path) || tree.files.contains_key(path)
    }

    /// Send datanode download bodies one byte at a time, `pause` apart
    pub fn drip_downloads(&self, pause: Duration) {
        self.tree.lock().unwrap().drip = Some(pause);
    }
}

impl Drop for FakeHdfs {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn parent(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((p, _)) => p.to_string(),
    }
}

fn insert_dirs(tree: &mut Tree, path: &str) {
    let mut current = String::new();
    for seg in path.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(seg);
        tree.dirs.insert(current.clone());
    }
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 3 <= bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

async fn serve(stream: TcpStream, tree: Arc<Mutex<Tree>>, addr: SocketAddr) {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await.is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else { return };
    let (method, target) = (method.to_string(), target.to_string());

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).await.unwrap_or(0) == 0 {
            break;
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0u8; content_length];
    if reader.read_exact(&mut body).await.is_err() {
        return;
    }

    let reply = {
        let mut tree = tree.lock().unwrap();
        route(&method, &target, body, &mut tree, addr)
    };

    let mut stream = reader.into_inner();
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n",
        reply.status,
        reply.reason,
        reply.body.len()
    );
    if let Some(location) = &reply.location {
        head.push_str(&format!("Location: {location}\r\n"));
    }
    head.push_str("\r\n");
    if stream.write_all(head.as_bytes()).await.is_err() {
        return;
    }
    match reply.drip {
        Some(pause) => {
            for byte in &reply.body {
                tokio::time::sleep(pause).await;
                if stream.write_all(&[*byte]).await.is_err() || stream.flush().await.is_err() {
                    return;
                }
            }
        }
        None => {
            let _ = stream.write_all(&reply.body).await;
        }
    }
    let _ = stream.shutdown().await;
}

fn status_json(suffix: &str, is_dir: bool) -> Value {
    json!({
        "pathSuffix": suffix,
        "type": if is_dir { "DIRECTORY" } else { "FILE" },
        "length": 0,
    })
}

fn route(method: &str, target: &str, body: Vec<u8>, tree: &mut Tree, addr: SocketAddr) -> Reply {
    let (raw_path, query) = target.split_once('?').unwrap_or((target, ""));
    let mut path = percent_decode(raw_path.strip_prefix("/webhdfs/v1").unwrap_or(raw_path));
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    if path.is_empty() {
        path.push('/');
    }
    let params: HashMap<&str, &str> = query.split('&').filter_map(|kv| kv.split_once('=')).collect();
    let from_datanode = params.contains_key("datanode");
    let op = params.get("op").copied().unwrap_or("");

    match (method, op) {
        ("GET", "GETFILESTATUS") => {
            if tree.dirs.contains(&path) {
                Reply::ok(json!({"FileStatus": status_json("", true)}))
            } else if tree.files.contains_key(&path) {
                Reply::ok(json!({"FileStatus": status_json("", false)}))
            } else {
                Reply::not_found(&path)
            }
        }
        ("GET", "LISTSTATUS") => {
            if tree.files.contains_key(&path) {
                return Reply::ok(json!({"FileStatuses": {"FileStatus": [status_json("", false)]}}));
            }
            if !tree.dirs.contains(&path) {
                return Reply::not_found(&path);
            }
            let mut children: Vec<(String, bool)> = tree
                .dirs
                .iter()
                .map(|d| (d, true))
                .chain(tree.files.keys().map(|f| (f, false)))
                .filter(|(p, _)| p.as_str() != "/" && parent(p) == path)
                .map(|(p, is_dir)| (p.rsplit('/').next().unwrap_or("").to_string(), is_dir))
                .collect();
            children.sort();
            let statuses: Vec<Value> = children.iter().map(|(name, is_dir)| status_json(name, *is_dir)).collect();
            Reply::ok(json!({"FileStatuses": {"FileStatus": statuses}}))
        }
        ("PUT", "MKDIRS") => {
            insert_dirs(tree, &path);
            Reply::ok(json!({"boolean": true}))
        }
        ("DELETE", "DELETE") => {
            if tree.files.remove(&path).is_some() {
                return Reply::ok(json!({"boolean": true}));
            }
            if !tree.dirs.contains(&path) {
                return Reply::ok(json!({"boolean": false}));
            }
            let prefix = format!("{path}/");
            let has_children = tree.dirs.iter().chain(tree.files.keys()).any(|p| p.starts_with(&prefix));
            if has_children && params.get("recursive") != Some(&"true") {
                return Reply::exception(
                    403,
                    "Forbidden",
                    "PathIsNotEmptyDirectoryException",
                    &format!("`{path} is non empty': Directory is not empty"),
                );
            }
            tree.dirs.retain(|p| p != &path && !p.starts_with(&prefix));
            tree.files.retain(|p, _| !p.starts_with(&prefix));
            Reply::ok(json!({"boolean": true}))
        }
        ("PUT", "CREATE") if from_datanode => {
            insert_dirs(tree, &parent(&path));
            tree.files.insert(path, body);
            Reply { status: 201, reason: "Created", location: None, body: Vec::new(), drip: None }
        }
        ("PUT", "CREATE") => Reply::redirect(format!("http://{addr}{raw_path}?{query}&datanode=true")),
        ("GET", "OPEN") => match tree.files.get(&path) {
            None => Reply::not_found(&path),
            Some(data) if from_datanode => Reply {
                status: 200,
                reason: "OK",
                location: None,
                body: data.clone(),
                drip: tree.drip,
            },
            Some(_) => Reply::redirect(format!("http://{addr}{raw_path}?{query}&datanode=true")),
        },
        _ => Reply::exception(400, "Bad Request", "IllegalArgumentException", &format!("unsupported op {op}")),
    }
}
