//! In-process fake of the Petstore v3 API.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use terraform_provider_petstore::DynamicValue;

type ApiResult = Result<Json<Value>, (StatusCode, &'static str)>;

#[derive(Default)]
pub struct Store {
    pets: Mutex<BTreeMap<i64, Value>>,
    next_id: AtomicI64,
    /// Number of requests served.
    pub hits: AtomicUsize,
    /// Query parameters of every form update, in order.
    pub form_updates: Mutex<Vec<HashMap<String, String>>>,
    /// When set, `POST /pet` fails with this status.
    pub add_pet_failure: Mutex<Option<StatusCode>>,
    /// When set, `POST /pet` answers 200 with a pet that has no id.
    pub omit_pet_ids: AtomicBool,
}

impl Store {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn has_pet(&self, id: i64) -> bool {
        self.pets.lock().unwrap().contains_key(&id)
    }

    pub fn pet(&self, id: i64) -> Option<Value> {
        self.pets.lock().unwrap().get(&id).cloned()
    }

    pub fn pet_count(&self) -> usize {
        self.pets.lock().unwrap().len()
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakePetstore {
    pub base_url: String,
    pub store: Arc<Store>,
}

impl FakePetstore {
    /// Provider configuration pointing at this server.
    pub fn provider_config(&self) -> DynamicValue {
        DynamicValue::object([("server", self.base_url.as_str().into())])
    }
}

/// Provider configuration for a port nothing listens on.
pub async fn closed_port_config() -> DynamicValue {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let server = format!("http://{}/api/v3", addr);
    DynamicValue::object([("server", server.into())])
}

/// Start the fake API on an ephemeral port. Ids are assigned by the server
/// from 1000 upwards, ignoring whatever the client proposed.
pub async fn start() -> FakePetstore {
    let store = Arc::new(Store {
        next_id: AtomicI64::new(1000),
        ..Default::default()
    });

    let api = Router::new()
        .route("/pet", post(add_pet))
        .route("/pet/:id", get(get_pet).post(update_pet).delete(delete_pet))
        .route("/user/:username", get(get_user))
        .with_state(Arc::clone(&store));
    let app = Router::new().nest("/api/v3", api);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakePetstore {
        base_url: format!("http://{}/api/v3", addr),
        store,
    }
}

async fn add_pet(State(store): State<Arc<Store>>, Json(mut pet): Json<Value>) -> ApiResult {
    store.hit();
    if let Some(status) = *store.add_pet_failure.lock().unwrap() {
        return Err((status, "Invalid input"));
    }
    if store.omit_pet_ids.load(Ordering::SeqCst) {
        if let Some(fields) = pet.as_object_mut() {
            fields.remove("id");
        }
        return Ok(Json(pet));
    }
    let id = store.next_id.fetch_add(1, Ordering::SeqCst);
    pet["id"] = json!(id);
    store.pets.lock().unwrap().insert(id, pet.clone());
    Ok(Json(pet))
}

async fn get_pet(State(store): State<Arc<Store>>, Path(id): Path<i64>) -> ApiResult {
    store.hit();
    store
        .pets
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Pet not found"))
}

async fn update_pet(
    State(store): State<Arc<Store>>,
    Path(id): Path<i64>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    store.hit();
    store.form_updates.lock().unwrap().push(params.clone());

    let mut pets = store.pets.lock().unwrap();
    let pet = pets
        .get_mut(&id)
        .ok_or((StatusCode::NOT_FOUND, "Pet not found"))?;
    if let Some(name) = params.get("name") {
        pet["name"] = json!(name);
    }
    if let Some(status) = params.get("status") {
        pet["status"] = json!(status);
    }
    Ok(Json(pet.clone()))
}

async fn delete_pet(State(store): State<Arc<Store>>, Path(id): Path<i64>) -> ApiResult {
    store.hit();
    match store.pets.lock().unwrap().remove(&id) {
        Some(_) => Ok(Json(json!("Pet deleted"))),
        None => Err((StatusCode::NOT_FOUND, "Pet not found")),
    }
}

async fn get_user(State(store): State<Arc<Store>>, Path(username): Path<String>) -> ApiResult {
    store.hit();
    if username == "brokenUser" {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"));
    }
    if username != "theUser" {
        return Err((StatusCode::NOT_FOUND, "User not found"));
    }
    Ok(Json(json!({
        "id": 10,
        "username": "theUser",
        "firstName": "John",
        "lastName": "James",
        "email": "john@email.com",
        "password": "12345",
        "phone": "12345",
        "userStatus": 1
    })))
}

/// Planned/config value of a `petstore_pet` with every attribute present.
pub fn pet_config(name: &str, status: &str) -> DynamicValue {
    DynamicValue::object([
        ("id", DynamicValue::Null),
        ("name", name.into()),
        (
            "category",
            DynamicValue::object([("id", 1.into()), ("name", "dog".into())]),
        ),
        ("tags", DynamicValue::Null),
        ("photo_urls", DynamicValue::Null),
        ("status", status.into()),
    ])
}

/// Like [`pet_config`], with one tag and one photo URL.
pub fn pet_config_with_lists(name: &str, status: &str) -> DynamicValue {
    let mut pet = pet_config(name, status);
    pet.set(
        "tags",
        DynamicValue::List(vec![DynamicValue::object([
            ("id", 7.into()),
            ("name", "friendly".into()),
        ])]),
    );
    pet.set(
        "photo_urls",
        DynamicValue::List(vec!["http://photos.example/1.png".into()]),
    );
    pet
}
