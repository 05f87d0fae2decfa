//! In-process mock of a Swift-style object storage endpoint.
//!
//! The server runs on its own thread and tokio runtime, since the client
//! under test is blocking. Every request is recorded before it is handled.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use percent_encoding::percent_decode_str;
use tokio::net::TcpListener;

pub const USER: &str = "acct:user";
pub const KEY: &str = "s3cret";
pub const ACCOUNT: &str = "AUTH_acct";

/// One request as received by the mock.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
pub struct CdnState {
    pub enabled: bool,
    pub ttl: Option<String>,
    pub purges: usize,
}

#[derive(Debug, Default)]
struct Store {
    containers: BTreeMap<String, BTreeMap<String, StoredObject>>,
    cdn: BTreeMap<String, CdnState>,
    tokens: BTreeSet<String>,
    issued: usize,
}

#[derive(Debug, Default)]
pub struct MockSwift {
    requests: Mutex<Vec<Recorded>>,
    store: Mutex<Store>,
}

impl MockSwift {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn auth_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path == "/auth/v1.0")
            .count()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    /// Forget every issued token, as if they all expired.
    pub fn expire_tokens(&self) {
        self.store.lock().unwrap().tokens.clear();
    }

    pub fn add_container(&self, name: &str) {
        self.store
            .lock()
            .unwrap()
            .containers
            .entry(name.to_string())
            .or_default();
    }

    pub fn add_object(&self, container: &str, name: &str, data: &[u8]) {
        self.store
            .lock()
            .unwrap()
            .containers
            .entry(container.to_string())
            .or_default()
            .insert(
                name.to_string(),
                StoredObject {
                    data: data.to_vec(),
                    meta: BTreeMap::new(),
                },
            );
    }

    pub fn enable_cdn(&self, container: &str) {
        self.store
            .lock()
            .unwrap()
            .cdn
            .entry(container.to_string())
            .or_default()
            .enabled = true;
    }

    pub fn container_names(&self) -> Vec<String> {
        self.store.lock().unwrap().containers.keys().cloned().collect()
    }

    pub fn object(&self, container: &str, name: &str) -> Option<StoredObject> {
        self.store
            .lock()
            .unwrap()
            .containers
            .get(container)
            .and_then(|objects| objects.get(name))
            .cloned()
    }

    pub fn cdn_state(&self, container: &str) -> Option<(bool, Option<String>, usize)> {
        self.store
            .lock()
            .unwrap()
            .cdn
            .get(container)
            .map(|c| (c.enabled, c.ttl.clone(), c.purges))
    }
}

/// Start a mock endpoint and return its base URL with the shared state.
pub fn start() -> (String, Arc<MockSwift>) {
    let mock = Arc::new(MockSwift::default());
    let state = mock.clone();
    let (tx, rx) = std::sync::mpsc::channel::<SocketAddr>();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            let app = Router::new().fallback(handle).with_state(state);
            axum::serve(listener, app).await.unwrap();
        });
    });

    let addr = rx.recv().unwrap();
    (format!("http://{addr}"), mock)
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

fn parse_form(body: &[u8]) -> BTreeMap<String, String> {
    String::from_utf8_lossy(body)
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (decode(&k.replace('+', " ")), decode(&v.replace('+', " "))))
        .collect()
}

fn status(code: StatusCode) -> Response {
    (code, Vec::<u8>::new()).into_response()
}

async fn handle(
    State(mock): State<Arc<MockSwift>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: headers.clone(),
        body: body.to_vec(),
    };
    mock.requests.lock().unwrap().push(recorded.clone());

    let host = recorded.header(header::HOST.as_str()).unwrap_or("localhost").to_string();
    if recorded.path == "/auth/v1.0" {
        return authenticate(&mock, &recorded, &host);
    }

    // POST carries its parameters in the form body, everything else in headers.
    let form = if method == Method::POST {
        parse_form(&recorded.body)
    } else {
        BTreeMap::new()
    };
    let param = |name: &str| -> Option<String> {
        if method == Method::POST {
            form.get(name).cloned()
        } else {
            recorded.header(name).map(str::to_string)
        }
    };

    let token_ok = match param("X-Auth-Token") {
        Some(token) => mock.store.lock().unwrap().tokens.contains(&token),
        None => false,
    };
    if !token_ok {
        return status(StatusCode::UNAUTHORIZED);
    }

    let segments: Vec<String> = recorded
        .path
        .trim_start_matches('/')
        .split('/')
        .map(decode)
        .collect();
    match segments.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["v1", account] if *account == ACCOUNT => account_request(&mock, &recorded, &param),
        ["v1", account, container] if *account == ACCOUNT => {
            container_request(&mock, &method, container)
        }
        ["v1", account, container, object] if *account == ACCOUNT => {
            object_request(&mock, &recorded, container, object)
        }
        ["cdn", account, container] if *account == ACCOUNT => {
            cdn_request(&mock, &method, container, &param)
        }
        ["cdn", account, container, _object] if *account == ACCOUNT && method == Method::DELETE => {
            mock.store
                .lock()
                .unwrap()
                .cdn
                .entry(container.to_string())
                .or_default()
                .purges += 1;
            status(StatusCode::NO_CONTENT)
        }
        _ => status(StatusCode::NOT_FOUND),
    }
}

fn authenticate(mock: &MockSwift, recorded: &Recorded, host: &str) -> Response {
    if recorded.header("x-auth-user") != Some(USER) || recorded.header("x-auth-key") != Some(KEY) {
        return status(StatusCode::UNAUTHORIZED);
    }
    let mut store = mock.store.lock().unwrap();
    store.issued += 1;
    let token = format!("AUTH_tk{}", store.issued);
    store.tokens.insert(token.clone());

    let mut headers = HeaderMap::new();
    headers.insert("x-auth-token", HeaderValue::from_str(&token).unwrap());
    headers.insert(
        "x-storage-url",
        HeaderValue::from_str(&format!("http://{host}/v1/{ACCOUNT}")).unwrap(),
    );
    headers.insert(
        "x-cdn-management-url",
        HeaderValue::from_str(&format!("http://{host}/cdn/{ACCOUNT}")).unwrap(),
    );
    (StatusCode::OK, headers, Vec::<u8>::new()).into_response()
}

fn account_request(
    mock: &MockSwift,
    recorded: &Recorded,
    param: &dyn Fn(&str) -> Option<String>,
) -> Response {
    let store = mock.store.lock().unwrap();
    let cdn_only = param("X-Content").as_deref() == Some("cdn");

    if recorded.method == Method::HEAD && cdn_only {
        let mut headers = HeaderMap::new();
        headers.insert("x-cdn-url", HeaderValue::from_static("http://cdn.example.com"));
        headers.insert("x-cdn-ssl-url", HeaderValue::from_static("https://ssl.example.com"));
        headers.insert(
            "x-cdn-stream-http-url",
            HeaderValue::from_static("http://stream.example.com"),
        );
        headers.insert(
            "x-cdn-stream-flash-url",
            HeaderValue::from_static("rtmp://flash.example.com"),
        );
        return (StatusCode::NO_CONTENT, headers).into_response();
    }

    if recorded.method != Method::GET {
        return status(StatusCode::METHOD_NOT_ALLOWED);
    }

    if param("X-Context").as_deref() == Some("search") {
        let body = format!("search:{}", recorded.query.clone().unwrap_or_default());
        return (StatusCode::OK, body).into_response();
    }

    let names: Vec<String> = if cdn_only {
        store
            .cdn
            .iter()
            .filter(|(_, state)| state.enabled)
            .map(|(name, _)| name.clone())
            .collect()
    } else {
        store.containers.keys().cloned().collect()
    };
    if names.is_empty() {
        return status(StatusCode::NO_CONTENT);
    }
    (StatusCode::OK, format!("{}\n", names.join("\n"))).into_response()
}

fn container_request(mock: &MockSwift, method: &Method, container: &str) -> Response {
    let mut store = mock.store.lock().unwrap();
    match *method {
        Method::PUT => {
            let created = !store.containers.contains_key(container);
            store.containers.entry(container.to_string()).or_default();
            status(if created {
                StatusCode::CREATED
            } else {
                StatusCode::ACCEPTED
            })
        }
        Method::GET => match store.containers.get(container) {
            Some(objects) if objects.is_empty() => status(StatusCode::NO_CONTENT),
            Some(objects) => {
                let names: Vec<&str> = objects.keys().map(String::as_str).collect();
                (StatusCode::OK, format!("{}\n", names.join("\n"))).into_response()
            }
            None => status(StatusCode::NOT_FOUND),
        },
        Method::DELETE => match store.containers.get(container) {
            Some(objects) if !objects.is_empty() => status(StatusCode::CONFLICT),
            Some(_) => {
                store.containers.remove(container);
                status(StatusCode::NO_CONTENT)
            }
            None => status(StatusCode::NOT_FOUND),
        },
        _ => status(StatusCode::METHOD_NOT_ALLOWED),
    }
}

fn object_request(mock: &MockSwift, recorded: &Recorded, container: &str, object: &str) -> Response {
    let mut store = mock.store.lock().unwrap();
    match recorded.method {
        Method::PUT => {
            let stored = match recorded.header("x-copy-from") {
                Some(source) => {
                    let Some((src_container, src_object)) = source.split_once('/') else {
                        return status(StatusCode::BAD_REQUEST);
                    };
                    let found = store
                        .containers
                        .get(&decode(src_container))
                        .and_then(|objects| objects.get(&decode(src_object)))
                        .cloned();
                    match found {
                        Some(found) => found,
                        None => return status(StatusCode::NOT_FOUND),
                    }
                }
                None => StoredObject {
                    data: recorded.body.clone(),
                    meta: recorded
                        .headers
                        .iter()
                        .filter_map(|(name, value)| {
                            let key = name.as_str().strip_prefix("x-object-meta-")?;
                            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                            Some((key.to_string(), value))
                        })
                        .collect(),
                },
            };
            let Some(objects) = store.containers.get_mut(container) else {
                return status(StatusCode::NOT_FOUND);
            };
            let etag = format!("etag-{}", stored.data.len());
            objects.insert(object.to_string(), stored);
            (StatusCode::CREATED, [(header::ETAG, etag)]).into_response()
        }
        Method::GET => {
            let Some(found) = store.containers.get(container).and_then(|o| o.get(object)) else {
                return status(StatusCode::NOT_FOUND);
            };
            let mut headers = HeaderMap::new();
            for (key, value) in &found.meta {
                let name = HeaderName::from_bytes(format!("x-object-meta-{key}").as_bytes()).unwrap();
                headers.insert(name, HeaderValue::from_str(value).unwrap());
            }
            headers.insert(
                header::ETAG,
                HeaderValue::from_str(&format!("etag-{}", found.data.len())).unwrap(),
            );
            (StatusCode::OK, headers, found.data.clone()).into_response()
        }
        Method::DELETE => {
            let removed = store
                .containers
                .get_mut(container)
                .and_then(|objects| objects.remove(object));
            status(if removed.is_some() {
                StatusCode::NO_CONTENT
            } else {
                StatusCode::NOT_FOUND
            })
        }
        _ => status(StatusCode::METHOD_NOT_ALLOWED),
    }
}

fn cdn_request(
    mock: &MockSwift,
    method: &Method,
    container: &str,
    param: &dyn Fn(&str) -> Option<String>,
) -> Response {
    let mut store = mock.store.lock().unwrap();
    if !store.containers.contains_key(container) {
        return status(StatusCode::NOT_FOUND);
    }
    let state = store.cdn.entry(container.to_string()).or_default();
    match *method {
        Method::PUT => {
            state.enabled = true;
            if let Some(ttl) = param("X-TTL") {
                state.ttl = Some(ttl);
            }
            status(StatusCode::CREATED)
        }
        Method::POST => {
            if let Some(enabled) = param("X-CDN-Enabled") {
                state.enabled = enabled != "false";
            }
            if let Some(ttl) = param("X-TTL") {
                state.ttl = Some(ttl);
            }
            status(StatusCode::ACCEPTED)
        }
        Method::DELETE => {
            state.purges += 1;
            status(StatusCode::NO_CONTENT)
        }
        _ => status(StatusCode::METHOD_NOT_ALLOWED),
    }
}
