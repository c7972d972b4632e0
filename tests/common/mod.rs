//! Shared helpers for integration tests
//!
//! `FakeKibana` keeps saved objects in memory and answers both the native
//! saved objects API and the legacy Elasticsearch proxy path, so a create
//! followed by a read goes through the real request and response shapes.

#![allow(dead_code)]

use kibana_provisioner::config::{Config, KibanaType};
use kibana_provisioner::{KibanaClient, client::NoAuthenticationHandler};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
pub use wiremock::matchers::{any, body_string_contains, header, method, path, query_param};
pub use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const ES_PATH: &str = "/es_admin/.kibana";

#[derive(Clone, Debug, PartialEq)]
pub struct StoredObject {
    pub attributes: Value,
    pub references: Value,
}

/// In-memory Kibana keyed by `(type, id)`.
#[derive(Clone, Default)]
pub struct FakeKibana {
    objects: Arc<Mutex<BTreeMap<(String, String), StoredObject>>>,
    next_id: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeKibana {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount the fake as a catch-all on `server`.
    pub async fn mount(&self, server: &MockServer) {
        Mock::given(any())
            .respond_with(self.clone())
            .mount(server)
            .await;
    }

    pub fn insert(&self, object_type: &str, id: &str, attributes: Value) {
        self.objects.lock().unwrap().insert(
            (object_type.to_string(), id.to_string()),
            StoredObject {
                attributes,
                references: json!([]),
            },
        );
    }

    pub fn get(&self, object_type: &str, id: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(object_type.to_string(), id.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// "METHOD /path" of every request seen so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn generate_id(&self) -> String {
        format!("generated-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn modern_object(object_type: &str, id: &str, stored: &StoredObject) -> Value {
        json!({
            "id": id,
            "type": object_type,
            "version": "WzEsMV0=",
            "attributes": stored.attributes,
            "references": stored.references,
        })
    }

    fn modern(&self, method: &str, segments: &[&str], request: &Request) -> ResponseTemplate {
        let mut objects = self.objects.lock().unwrap();
        match (method, segments) {
            ("GET", ["_find"]) | ("GET", []) => {
                let object_type = request
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "type")
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default();
                let found: Vec<Value> = objects
                    .iter()
                    .filter(|((t, _), _)| *t == object_type)
                    .map(|((t, id), stored)| Self::modern_object(t, id, stored))
                    .collect();
                ResponseTemplate::new(200).set_body_json(json!({
                    "page": 1,
                    "per_page": found.len(),
                    "total": found.len(),
                    "saved_objects": found,
                }))
            }
            ("POST", [object_type]) | ("POST", [object_type, _]) => {
                let id = match segments {
                    [_, id] => id.to_string(),
                    _ => self.generate_id(),
                };
                let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
                let stored = StoredObject {
                    attributes: body["attributes"].clone(),
                    references: body.get("references").cloned().unwrap_or(json!([])),
                };
                let response = Self::modern_object(object_type, &id, &stored);
                objects.insert((object_type.to_string(), id), stored);
                ResponseTemplate::new(200).set_body_json(response)
            }
            ("GET", [object_type, id]) => {
                match objects.get(&(object_type.to_string(), id.to_string())) {
                    Some(stored) => ResponseTemplate::new(200)
                        .set_body_json(Self::modern_object(object_type, id, stored)),
                    None => not_found(),
                }
            }
            ("DELETE", [object_type, id]) => {
                match objects.remove(&(object_type.to_string(), id.to_string())) {
                    Some(_) => ResponseTemplate::new(200).set_body_json(json!({})),
                    None => not_found(),
                }
            }
            _ => ResponseTemplate::new(400),
        }
    }

    fn legacy(&self, method: &str, segments: &[&str]) -> ResponseTemplate {
        let mut objects = self.objects.lock().unwrap();
        match (method, segments) {
            ("POST", [object_type, "_search"]) => {
                let hits: Vec<Value> = objects
                    .iter()
                    .filter(|((t, _), _)| t == object_type)
                    .map(|((t, id), stored)| {
                        json!({"_id": id, "_type": t, "_source": stored.attributes})
                    })
                    .collect();
                ResponseTemplate::new(200)
                    .set_body_json(json!({"hits": {"total": hits.len(), "hits": hits}}))
            }
            ("POST", [object_type, id, "_create"]) => {
                let key = (object_type.to_string(), id.to_string());
                if objects.contains_key(&key) {
                    return ResponseTemplate::new(409).set_body_json(
                        json!({"error": {"type": "version_conflict_engine_exception"}}),
                    );
                }
                ResponseTemplate::new(201).set_body_json(json!({"_id": id, "created": true}))
            }
            ("POST", [_, id]) => {
                ResponseTemplate::new(201).set_body_json(json!({"_id": id, "created": true}))
            }
            ("GET", [object_type, id]) => {
                match objects.get(&(object_type.to_string(), id.to_string())) {
                    Some(stored) => ResponseTemplate::new(200).set_body_json(json!({
                        "_index": ".kibana",
                        "_type": object_type,
                        "_id": id,
                        "_version": 1,
                        "found": true,
                        "_source": stored.attributes,
                    })),
                    None => ResponseTemplate::new(404).set_body_json(json!({"found": false})),
                }
            }
            ("DELETE", [object_type, id]) => {
                match objects.remove(&(object_type.to_string(), id.to_string())) {
                    Some(_) => ResponseTemplate::new(200).set_body_json(json!({"found": true})),
                    None => ResponseTemplate::new(404).set_body_json(json!({"found": false})),
                }
            }
            _ => ResponseTemplate::new(400),
        }
    }

    /// Store the document of a legacy write before answering it.
    fn store_legacy(&self, segments: &[&str], request: &Request) {
        let (object_type, id) = match segments {
            [t, id] if *id != "_search" => (*t, *id),
            [t, id, "_create"] => (*t, *id),
            _ => return,
        };
        let attributes: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        self.objects
            .lock()
            .unwrap()
            .entry((object_type.to_string(), id.to_string()))
            .or_insert(StoredObject {
                attributes,
                references: json!([]),
            });
    }
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "statusCode": 404,
        "error": "Not Found",
        "message": "Saved object not found"
    }))
}

impl Respond for FakeKibana {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let method = request.method.as_str().to_string();
        let url_path = request.url.path().to_string();
        self.requests
            .lock()
            .unwrap()
            .push(format!("{} {}", method, url_path));

        if let Some(rest) = url_path.strip_prefix("/api/saved_objects") {
            let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
            return self.modern(&method, &segments, request);
        }
        if let Some(rest) = url_path.strip_prefix(ES_PATH) {
            let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
            let response = self.legacy(&method, &segments);
            if method == "POST" && response_is_write(&segments) {
                // A plain write overwrites; `_create` only stores when new.
                if let [t, id] = segments.as_slice() {
                    self.objects
                        .lock()
                        .unwrap()
                        .remove(&(t.to_string(), id.to_string()));
                }
                self.store_legacy(&segments, request);
            }
            return response;
        }
        ResponseTemplate::new(404)
    }
}

fn response_is_write(segments: &[&str]) -> bool {
    matches!(segments, [_, id] if *id != "_search") || matches!(segments, [_, _, "_create"])
}

/// Client with no authentication against `server`.
pub fn vanilla_client(server: &MockServer, version: &str) -> KibanaClient {
    KibanaClient::try_new(Config::new(server.uri(), version)).unwrap()
}

/// Client for the hosted variant that skips the login handshake.
pub fn logzio_client_without_login(server: &MockServer, version: &str) -> KibanaClient {
    let config = Config::new(server.uri(), version).with_type(KibanaType::Logzio);
    KibanaClient::with_auth(config, Arc::new(NoAuthenticationHandler)).unwrap()
}

/// Attribute map from a JSON object literal.
pub fn attributes(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
