//! Request routing for the fake server

use base64::Engine as _;
use chrono::Utc;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde_json::{Value as Json, json};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::MockState;
use super::canon::{canonicalize_durations, insert_defaults};
use crate::transport::{ApiRequest, ApiResponse, Method};
use crate::v20231208::models as v1;
use crate::v20250101::models as v2;

/// Domain suffix of hosted authorities
pub const AUTHORITY_DOMAIN_SUFFIX: &str = ".ca.smallstep.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Authority,
    Provisioner,
    AgentConfiguration,
    EndpointConfiguration,
    ManagedConfiguration,
    Collection,
    Instance,
    DeviceCollection,
    Account,
    Workload,
    AttestationAuthority,
    Integration,
    Strategy,
}

impl Kind {
    fn from_root(root: &str) -> Option<Self> {
        Some(match root {
            "authorities" => Kind::Authority,
            "agent-configurations" => Kind::AgentConfiguration,
            "endpoint-configurations" => Kind::EndpointConfiguration,
            "managed-configurations" => Kind::ManagedConfiguration,
            "collections" => Kind::Collection,
            "device-collections" => Kind::DeviceCollection,
            "attestation-authorities" => Kind::AttestationAuthority,
            "device-inventory-integrations" => Kind::Integration,
            "strategies" => Kind::Strategy,
            _ => return None,
        })
    }

    fn from_child(parent: Kind, name: &str) -> Option<Self> {
        Some(match (parent, name) {
            (Kind::Authority, "provisioners") => Kind::Provisioner,
            (Kind::Collection, "instances") => Kind::Instance,
            (Kind::DeviceCollection, "accounts") => Kind::Account,
            (Kind::DeviceCollection, "workloads") => Kind::Workload,
            _ => return None,
        })
    }

    /// Created with POST and a server-assigned id
    fn is_posted(self) -> bool {
        matches!(
            self,
            Kind::Authority
                | Kind::Provisioner
                | Kind::AgentConfiguration
                | Kind::EndpointConfiguration
                | Kind::ManagedConfiguration
                | Kind::AttestationAuthority
                | Kind::Integration
                | Kind::Strategy
        )
    }

    fn is_put(self) -> bool {
        matches!(
            self,
            Kind::AgentConfiguration
                | Kind::Collection
                | Kind::Instance
                | Kind::DeviceCollection
                | Kind::Account
                | Kind::Workload
                | Kind::Integration
                | Kind::Strategy
        )
    }
}

enum Target {
    /// A listable collection at `path`, whose parent object (if any) is at `parent`
    Collection { path: String, parent: Option<String> },
    /// One object at `path`
    Item { path: String, parent: Option<String>, key: String },
}

fn classify(segments: &[&str]) -> Option<(Kind, Target)> {
    let root = Kind::from_root(segments.first()?)?;
    let top = format!("/{}", segments[0]);
    match segments {
        [_] => Some((root, Target::Collection { path: top, parent: None })),
        [_, key] => Some((
            root,
            Target::Item {
                path: format!("{}/{}", top, key),
                parent: None,
                key: key.to_string(),
            },
        )),
        [_, parent, child] => {
            let kind = Kind::from_child(root, child)?;
            let parent = format!("{}/{}", top, parent);
            Some((
                kind,
                Target::Collection {
                    path: format!("{}/{}", parent, child),
                    parent: Some(parent),
                },
            ))
        }
        [_, parent, child, key] => {
            let kind = Kind::from_child(root, child)?;
            let parent = format!("{}/{}", top, parent);
            Some((
                kind,
                Target::Item {
                    path: format!("{}/{}/{}", parent, child, key),
                    parent: Some(parent),
                    key: key.to_string(),
                },
            ))
        }
        _ => None,
    }
}

/// Objects stored directly under `collection`
pub(super) fn children<'a>(
    objects: &'a BTreeMap<String, Json>,
    collection: &str,
) -> impl Iterator<Item = (&'a String, &'a Json)> + 'a {
    let prefix = format!("{}/", collection);
    let depth = prefix.len();
    objects
        .range(prefix.clone()..)
        .take_while(move |(path, _)| path.starts_with(&prefix))
        .filter(move |(path, _)| !path[depth..].contains('/'))
}

/// Remove the object at `path` and everything under it
pub(super) fn remove_tree(objects: &mut BTreeMap<String, Json>, path: &str) -> bool {
    let prefix = format!("{}/", path);
    objects.retain(|key, _| !key.starts_with(&prefix));
    objects.remove(path).is_some()
}

pub(super) fn success_status(method: Method) -> u16 {
    match method {
        Method::Post => 201,
        Method::Delete => 204,
        _ => 200,
    }
}

pub(super) fn error(status: u16, message: impl Into<String>) -> ApiResponse {
    json_response(status, &json!({ "message": message.into() }))
}

fn json_response(status: u16, body: &Json) -> ApiResponse {
    ApiResponse::new(status, serde_json::to_vec(body).unwrap_or_default())
}

fn now() -> Json {
    Json::String(Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

type Rejection = (u16, String);

fn validate<T: DeserializeOwned>(body: &Json) -> Result<T, Rejection> {
    serde_json::from_value(body.clone()).map_err(|e| (400, format!("invalid request body: {}", e)))
}

pub(super) fn handle(state: &mut MockState, request: &ApiRequest) -> ApiResponse {
    let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();
    let Some((kind, target)) = classify(&segments) else {
        return error(404, format!("no route for {}", request));
    };
    let body = request.body.clone().unwrap_or(Json::Null);

    match (request.method, target) {
        (Method::Get, Target::Collection { path, parent }) => {
            state.counts.lists += 1;
            if let Some(parent) = parent
                && !state.objects.contains_key(&parent)
            {
                return error(404, format!("{} not found", parent));
            }
            let view: &MockState = state;
            let items: Vec<Json> = children(&view.objects, &path)
                .map(|(path, object)| render(view, kind, path, object))
                .collect();
            json_response(200, &Json::Array(items))
        }
        (Method::Post, Target::Collection { path, parent }) if kind.is_posted() => {
            state.counts.creates += 1;
            if let Some(parent) = &parent
                && !state.objects.contains_key(parent)
            {
                return error(404, format!("{} not found", parent));
            }
            let id = new_id();
            let item = format!("{}/{}", path, id);
            match prepare(state, kind, &body, &item, &id, parent.as_deref(), None) {
                Ok(object) => store(state, kind, item, object, 201),
                Err((status, message)) => error(status, message),
            }
        }
        (Method::Get, Target::Item { path, .. }) => {
            state.counts.gets += 1;
            match lookup(state, kind, &path) {
                Some((path, object)) => json_response(200, &render(state, kind, &path, &object)),
                None => error(404, format!("{} not found", path)),
            }
        }
        (Method::Put, Target::Item { path, parent, key }) if kind.is_put() => {
            if let Some(parent) = &parent
                && !state.objects.contains_key(parent)
            {
                state.counts.creates += 1;
                return error(404, format!("{} not found", parent));
            }
            let existing = state.objects.get(&path).cloned();
            if existing.is_some() {
                state.counts.updates += 1;
            } else if kind.is_posted() {
                state.counts.updates += 1;
                return error(404, format!("{} not found", path));
            } else {
                state.counts.creates += 1;
            }
            match prepare(state, kind, &body, &path, &key, parent.as_deref(), existing.as_ref()) {
                Ok(object) => store(state, kind, path, object, 200),
                Err((status, message)) => error(status, message),
            }
        }
        (Method::Patch, Target::Item { path, .. }) if kind == Kind::Collection => {
            state.counts.updates += 1;
            let Some(mut object) = state.objects.get(&path).cloned() else {
                return error(404, format!("{} not found", path));
            };
            if let Err((status, message)) = validate::<v1::NewCollection>(&body) {
                return error(status, message);
            }
            if let (Json::Object(fields), Json::Object(patch)) = (&mut object, body) {
                for (key, value) in patch.into_iter().filter(|(_, v)| !v.is_null()) {
                    fields.insert(key, value);
                }
                fields.insert("updatedAt".to_string(), now());
            }
            store(state, kind, path, object, 200)
        }
        (Method::Delete, Target::Item { path, .. }) => {
            state.counts.deletes += 1;
            let Some((path, _)) = lookup(state, kind, &path) else {
                return error(404, format!("{} not found", path));
            };
            if kind == Kind::Collection
                && children(&state.objects, &format!("{}/instances", path)).next().is_some()
            {
                return error(409, "collection is not empty");
            }
            remove_tree(&mut state.objects, &path);
            ApiResponse::new(204, Vec::new())
        }
        (method, _) => error(405, format!("{} not allowed here", method)),
    }
}

fn store(state: &mut MockState, kind: Kind, path: String, object: Json, status: u16) -> ApiResponse {
    let rendered = render(state, kind, &path, &object);
    state.objects.insert(path, object);
    json_response(status, &rendered)
}

/// Find an object by path; authorities also match on domain, provisioners on name
fn lookup(state: &MockState, kind: Kind, path: &str) -> Option<(String, Json)> {
    if let Some(object) = state.objects.get(path) {
        return Some((path.to_string(), object.clone()));
    }
    let (collection, key) = path.rsplit_once('/')?;
    let field = match kind {
        Kind::Authority => "domain",
        Kind::Provisioner => "name",
        _ => return None,
    };
    children(&state.objects, collection)
        .find(|(_, object)| object.get(field).and_then(Json::as_str) == Some(key))
        .map(|(path, object)| (path.clone(), object.clone()))
}

/// The object as the API returns it
fn render(state: &MockState, kind: Kind, path: &str, object: &Json) -> Json {
    let mut rendered = object.clone();
    match kind {
        Kind::Collection => {
            let count = children(&state.objects, &format!("{}/instances", path)).count();
            rendered["instanceCount"] = json!(count);
        }
        Kind::Instance => {
            let mut out = rendered["data"].clone();
            if let Json::Object(fields) = &mut out {
                for (key, value) in &state.decorations {
                    fields.insert(key.clone(), value.clone());
                }
            }
            rendered["outData"] = out;
        }
        Kind::Integration => {
            if let Some(Json::Object(configuration)) = rendered.get_mut("configuration") {
                configuration.remove(v2::CLIENT_SECRET);
            }
        }
        _ => {}
    }
    rendered
}

fn key_info_defaults(object: &mut Json, pointer: &str) {
    if let Some(parent) = object.pointer_mut(pointer) {
        let key_info = parent
            .as_object_mut()
            .map(|fields| fields.entry("keyInfo").or_insert_with(|| json!({})));
        if let Some(key_info) = key_info {
            insert_defaults(key_info, json!({"type": "DEFAULT", "format": "DEFAULT"}));
        }
    }
}

fn certificate_info_defaults(object: &mut Json, pointer: &str) {
    if let Some(info) = object.pointer_mut(pointer) {
        insert_defaults(info, json!({"duration": "24h"}));
    }
}

fn keep_created_at(object: &mut Json, existing: Option<&Json>) {
    object["createdAt"] = existing
        .and_then(|e| e.get("createdAt"))
        .cloned()
        .unwrap_or_else(now);
}

fn fake_root() -> (String, String) {
    let mut der = [0u8; 96];
    rand::rng().fill_bytes(&mut der);
    let fingerprint = hex::encode(Sha256::digest(der));
    let encoded = base64::engine::general_purpose::STANDARD.encode(der);
    let body = encoded
        .as_bytes()
        .chunks(64)
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .collect::<Vec<_>>()
        .join("\n");
    (
        format!(
            "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
            body
        ),
        fingerprint,
    )
}

fn default_claims() -> Json {
    json!({
        "disableRenewal": false,
        "allowRenewalAfterExpiry": false,
        "enableSSHCA": false,
        "minTLSCertDuration": "5m",
        "maxTLSCertDuration": "24h",
        "defaultTLSCertDuration": "24h",
        "minUserSSHCertDuration": "5m",
        "maxUserSSHCertDuration": "24h",
        "defaultUserSSHCertDuration": "16h",
        "minHostSSHCertDuration": "5m",
        "maxHostSSHCertDuration": "720h",
        "defaultHostSSHCertDuration": "720h"
    })
}

fn slugify(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Turn a request body into the object the server stores
fn prepare(
    state: &MockState,
    kind: Kind,
    body: &Json,
    path: &str,
    key: &str,
    parent: Option<&str>,
    existing: Option<&Json>,
) -> Result<Json, Rejection> {
    let parent_key = parent
        .and_then(|p| p.rsplit_once('/'))
        .map(|(_, k)| k.to_string())
        .unwrap_or_default();

    let mut object = match kind {
        Kind::Authority => {
            let new: v1::NewAuthority = validate(body)?;
            let domain = format!("{}{}", new.subdomain, AUTHORITY_DOMAIN_SUFFIX);
            let taken = children(&state.objects, "/authorities")
                .any(|(_, a)| a.get("domain").and_then(Json::as_str) == Some(domain.as_str()));
            if taken {
                return Err((409, format!("subdomain {} is already in use", new.subdomain)));
            }
            let (root, fingerprint) = fake_root();
            json!({
                "id": key,
                "name": new.name,
                "type": new.kind,
                "domain": domain,
                "fingerprint": fingerprint,
                "root": root,
                "adminEmails": new.admin_emails,
                "activeRevocation": new.active_revocation.unwrap_or(false),
            })
        }
        Kind::Provisioner => {
            let provisioner: v1::Provisioner = validate(body)?;
            let collection = parent.map(|p| format!("{}/provisioners", p)).unwrap_or_default();
            let taken = children(&state.objects, &collection).any(|(_, p)| {
                p.get("name").and_then(Json::as_str) == Some(provisioner.name.as_str())
            });
            if taken {
                return Err((409, format!("provisioner {} already exists", provisioner.name)));
            }
            let mut object = body.clone();
            object["id"] = json!(key);
            object["authorityID"] = json!(parent_key);
            let claims = object
                .as_object_mut()
                .map(|fields| fields.entry("claims").or_insert_with(|| json!({})));
            if let Some(claims) = claims {
                insert_defaults(claims, default_claims());
            }
            object
        }
        Kind::AgentConfiguration => {
            validate::<v1::AgentConfiguration>(body)?;
            let mut object = body.clone();
            object["id"] = json!(key);
            object
        }
        Kind::EndpointConfiguration => {
            validate::<v1::EndpointConfiguration>(body)?;
            let mut object = body.clone();
            object["id"] = json!(key);
            certificate_info_defaults(&mut object, "/certificateInfo");
            key_info_defaults(&mut object, "");
            object
        }
        Kind::ManagedConfiguration => {
            validate::<v1::ManagedConfiguration>(body)?;
            let mut object = body.clone();
            object["id"] = json!(key);
            if let Some(Json::Array(endpoints)) = object.get_mut("managedEndpoints") {
                for endpoint in endpoints {
                    endpoint["id"] = json!(new_id());
                }
            }
            object
        }
        Kind::Collection => {
            let new: v1::NewCollection = validate(body)?;
            let mut object = json!({
                "slug": key,
                "displayName": new.display_name.unwrap_or_default(),
                "updatedAt": now(),
            });
            if let Some(uri) = new.schema_uri {
                object["schemaURI"] = json!(uri);
            }
            object
        }
        Kind::Instance => {
            let new: v1::NewCollectionInstance = validate(body)?;
            json!({ "id": key, "data": new.data, "updatedAt": now() })
        }
        Kind::DeviceCollection => {
            let new: v1::NewDeviceCollection = validate(body)?;
            if let Some(existing) = existing
                && existing.get("deviceType") != Some(&json!(new.device_type))
            {
                return Err((400, "deviceType cannot be changed".to_string()));
            }
            json!({
                "slug": key,
                "displayName": new.display_name,
                "adminEmails": new.admin_emails.unwrap_or_default(),
                "deviceType": new.device_type,
                "deviceTypeConfiguration": new.device_type_configuration,
            })
        }
        Kind::Account | Kind::Workload => {
            if kind == Kind::Account {
                validate::<v1::DeviceCollectionAccount>(body)?;
            } else {
                validate::<v1::Workload>(body)?;
            }
            let mut object = body.clone();
            object["slug"] = json!(key);
            certificate_info_defaults(&mut object, "/certificateInfo");
            key_info_defaults(&mut object, "");
            object
        }
        Kind::AttestationAuthority => {
            let new: v1::AttestationAuthority = validate(body)?;
            let (root, _) = fake_root();
            let mut object = body.clone();
            object["id"] = json!(key);
            object["slug"] = json!(format!("{}-{}", slugify(&new.name), &key[..8.min(key.len())]));
            object["root"] = json!(root);
            object
        }
        Kind::Integration => {
            let new: v2::DeviceInventoryIntegration = validate(body)?;
            if let Some(existing) = existing
                && existing.get("kind") != Some(&json!(new.kind))
            {
                return Err((400, "kind cannot be changed".to_string()));
            }
            let mut object = body.clone();
            object["id"] = json!(key);
            object
        }
        Kind::Strategy => {
            validate::<v2::Strategy>(body)?;
            let mut object = body.clone();
            object["id"] = json!(key);
            certificate_info_defaults(&mut object, "/credential/certificateInfo");
            key_info_defaults(&mut object, "/credential");
            object
        }
    };

    keep_created_at(&mut object, existing);
    canonicalize_durations(&mut object);
    tracing::trace!(path, "stored object prepared");
    Ok(object)
}
