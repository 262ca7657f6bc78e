//! End-to-end provider behaviour against a fake Petstore server.

mod support;

use std::sync::atomic::Ordering;

use axum::http::StatusCode;

use terraform_provider_petstore::testing::{
    assert_has_error, assert_plan_replaces_attribute, assert_plan_updates_in_place,
    assert_planned_unknown, ProviderTester,
};
use terraform_provider_petstore::{DynamicValue, PetstoreProvider, ProviderError};

const PET: &str = "petstore_pet";
const USER: &str = "petstore_user";

async fn configured() -> (support::FakePetstore, ProviderTester<PetstoreProvider>) {
    let fake = support::start().await;
    let tester = ProviderTester::new(PetstoreProvider::new("test"));
    tester.configure(fake.provider_config()).await.unwrap();
    (fake, tester)
}

fn str_attr<'a>(state: &'a DynamicValue, name: &str) -> Option<&'a str> {
    state.get(name).and_then(DynamicValue::as_str)
}

fn with(mut state: DynamicValue, attrs: &[(&str, &str)]) -> DynamicValue {
    for (name, value) in attrs {
        state.set(*name, (*value).into());
    }
    state
}

#[tokio::test]
async fn test_create_pet() {
    let (fake, tester) = configured().await;

    let plan = tester
        .plan_create(PET, support::pet_config("newdog", "available"))
        .await
        .unwrap();
    assert_planned_unknown(&plan, "id");

    let state = tester
        .lifecycle_create(PET, support::pet_config("newdog", "available"))
        .await
        .unwrap();

    assert_eq!(str_attr(&state, "name"), Some("newdog"));
    assert_eq!(str_attr(&state, "status"), Some("available"));
    // the server-assigned id replaces the random placeholder
    let id = str_attr(&state, "id").unwrap();
    assert!(id.parse::<i64>().unwrap() >= 1000);
    assert!(fake.store.has_pet(id.parse().unwrap()));

    let category = state.get("category").unwrap();
    assert_eq!(category.get("id").and_then(DynamicValue::as_i64), Some(1));
    assert_eq!(str_attr(category, "name"), Some("dog"));
}

#[tokio::test]
async fn test_create_and_read_keep_tags_and_photo_urls() {
    let (fake, tester) = configured().await;
    let state = tester
        .lifecycle_create(PET, support::pet_config_with_lists("newdog", "available"))
        .await
        .unwrap();

    let tags = match state.get("tags") {
        Some(DynamicValue::List(tags)) => tags,
        other => panic!("expected a tag list, got {:?}", other),
    };
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].get("id").and_then(DynamicValue::as_i64), Some(7));
    assert_eq!(str_attr(&tags[0], "name"), Some("friendly"));
    assert_eq!(
        state.get("photo_urls"),
        Some(&DynamicValue::List(vec!["http://photos.example/1.png".into()]))
    );

    let id: i64 = str_attr(&state, "id").unwrap().parse().unwrap();
    let stored = fake.store.pet(id).unwrap();
    assert_eq!(stored["tags"][0]["name"], "friendly");
    assert_eq!(stored["photoUrls"][0], "http://photos.example/1.png");

    let reread = tester.read(PET, state.clone()).await.unwrap();
    assert_eq!(reread, state);
}

#[tokio::test]
async fn test_create_rejected_by_server_leaves_no_state() {
    let (fake, tester) = configured().await;
    *fake.store.add_pet_failure.lock().unwrap() = Some(StatusCode::INTERNAL_SERVER_ERROR);

    let err = tester
        .lifecycle_create(PET, support::pet_config("newdog", "available"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Server(_)));
    assert_eq!(err.message(), "Unable to create pet, got status code: 500");
    assert_eq!(err.to_diagnostic().summary, "Server Error");
    assert_eq!(fake.store.pet_count(), 0);
}

#[tokio::test]
async fn test_create_response_without_id_is_server_error() {
    let (fake, tester) = configured().await;
    fake.store.omit_pet_ids.store(true, Ordering::SeqCst);

    let err = tester
        .lifecycle_create(PET, support::pet_config("newdog", "available"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Server(_)));
    assert_eq!(
        err.message(),
        "Unable to create pet, the response carried no id"
    );
    // create failed before any read was attempted
    assert_eq!(fake.store.hits(), 1);
}

#[tokio::test]
async fn test_create_against_closed_port_is_client_error() {
    let tester = ProviderTester::new(PetstoreProvider::new("test"));
    tester
        .configure(support::closed_port_config().await)
        .await
        .unwrap();

    let err = tester
        .lifecycle_create(PET, support::pet_config("newdog", "available"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Client(_)));
    assert_eq!(err.to_diagnostic().summary, "Client Error");
    assert!(
        err.message().starts_with("Unable to create pet, got error: "),
        "unexpected message: {}",
        err.message()
    );
}

#[tokio::test]
async fn test_import_reproduces_created_state() {
    let (_fake, tester) = configured().await;
    let created = tester
        .lifecycle_create(PET, support::pet_config("newdog", "available"))
        .await
        .unwrap();

    let imported = tester
        .import_resource(PET, str_attr(&created, "id").unwrap())
        .await
        .unwrap();
    assert_eq!(imported.len(), 1);

    let state = tester.read(PET, imported[0].state.clone()).await.unwrap();
    assert_eq!(state, created);
}

#[tokio::test]
async fn test_update_name_and_status() {
    let (fake, tester) = configured().await;
    let created = tester
        .lifecycle_create(PET, support::pet_config("newdog", "available"))
        .await
        .unwrap();

    let proposed = with(created.clone(), &[("name", "anotherdog"), ("status", "pending")]);
    let plan = tester
        .plan_update(PET, created.clone(), proposed.clone())
        .await
        .unwrap();
    assert_plan_updates_in_place(&plan);

    let state = tester.lifecycle_update(PET, created, proposed).await.unwrap();
    assert_eq!(str_attr(&state, "name"), Some("anotherdog"));
    assert_eq!(str_attr(&state, "status"), Some("pending"));

    let updates = fake.store.form_updates.lock().unwrap().clone();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["name"], "anotherdog");
    assert_eq!(updates[0]["status"], "pending");
}

#[tokio::test]
async fn test_status_only_update_sends_prior_name() {
    let (fake, tester) = configured().await;
    let created = tester
        .lifecycle_create(PET, support::pet_config("newdog", "available"))
        .await
        .unwrap();

    let proposed = with(created.clone(), &[("status", "sold")]);
    let state = tester.lifecycle_update(PET, created, proposed).await.unwrap();
    assert_eq!(str_attr(&state, "name"), Some("newdog"));
    assert_eq!(str_attr(&state, "status"), Some("sold"));

    let updates = fake.store.form_updates.lock().unwrap().clone();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["name"], "newdog");
    assert_eq!(updates[0]["status"], "sold");
}

#[tokio::test]
async fn test_unchanged_update_makes_no_call() {
    let (fake, tester) = configured().await;
    let created = tester
        .lifecycle_create(PET, support::pet_config("newdog", "available"))
        .await
        .unwrap();

    let state = tester
        .update(PET, created.clone(), created.clone())
        .await
        .unwrap();
    assert_eq!(state, created);
    assert!(fake.store.form_updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_category_change_requires_replacement() {
    let (_fake, tester) = configured().await;
    let created = tester
        .lifecycle_create(PET, support::pet_config("newdog", "available"))
        .await
        .unwrap();

    let mut proposed = created.clone();
    proposed.set(
        "category",
        DynamicValue::object([("id", 2.into()), ("name", "cat".into())]),
    );
    let plan = tester.plan_update(PET, created, proposed).await.unwrap();
    assert_plan_replaces_attribute(&plan, "category");
}

#[tokio::test]
async fn test_delete_pet() {
    let (fake, tester) = configured().await;
    let created = tester
        .lifecycle_create(PET, support::pet_config("newdog", "available"))
        .await
        .unwrap();
    let id: i64 = str_attr(&created, "id").unwrap().parse().unwrap();

    tester.lifecycle_delete(PET, created.clone()).await.unwrap();
    assert!(!fake.store.has_pet(id));

    let err = tester.read(PET, created.clone()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Server(_)));
    assert_eq!(err.message(), "Unable to read pet, got status code: 404");

    let err = tester.delete(PET, created).await.unwrap_err();
    assert_eq!(err.message(), "Unable to delete pet, got status code: 404");
}

#[tokio::test]
async fn test_lookup_user() {
    let (_fake, tester) = configured().await;
    let state = tester
        .read_data_source(USER, DynamicValue::object([("username", "theUser".into())]))
        .await
        .unwrap();

    assert_eq!(str_attr(&state, "firstname"), Some("John"));
    assert_eq!(str_attr(&state, "lastname"), Some("James"));
    assert_eq!(state.get("status").and_then(DynamicValue::as_i64), Some(1));
    assert_eq!(str_attr(&state, "id"), Some("10"));
    assert_eq!(str_attr(&state, "username"), Some("theUser"));
}

#[tokio::test]
async fn test_lookup_missing_user() {
    let (_fake, tester) = configured().await;
    let err = tester
        .read_data_source(USER, DynamicValue::object([("username", "nobody".into())]))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::NotFound(_)));
    let diagnostic = err.to_diagnostic();
    assert_eq!(diagnostic.summary, "Not Found");
    assert_eq!(
        diagnostic.detail.as_deref(),
        Some("User with name nobody not found.")
    );
}

#[tokio::test]
async fn test_lookup_user_server_failure() {
    let (_fake, tester) = configured().await;
    let err = tester
        .read_data_source(USER, DynamicValue::object([("username", "brokenUser".into())]))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Server(_)));
    assert_eq!(err.message(), "Unable to get users, got status code: 500");
}

#[tokio::test]
async fn test_lookup_user_against_closed_port_is_client_error() {
    let tester = ProviderTester::new(PetstoreProvider::new("test"));
    tester
        .configure(support::closed_port_config().await)
        .await
        .unwrap();

    let err = tester
        .read_data_source(USER, DynamicValue::object([("username", "theUser".into())]))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Client(_)));
    assert!(
        err.message().starts_with("Unable to get users: "),
        "unexpected message: {}",
        err.message()
    );
}

#[tokio::test]
async fn test_missing_server_fails_before_any_request() {
    let fake = support::start().await;
    let tester = ProviderTester::new(PetstoreProvider::new("test"));

    let diags = tester
        .provider()
        .configure_with_env(&DynamicValue::object([("server", DynamicValue::Null)]), None)
        .await;
    assert_has_error(&diags, "Unknown Petstore API Host");

    let err = tester
        .read_data_source(USER, DynamicValue::object([("username", "theUser".into())]))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unconfigured(_)));
    assert_eq!(fake.store.hits(), 0);
}

#[tokio::test]
async fn test_unknown_server_is_attribute_error() {
    let tester = ProviderTester::new(PetstoreProvider::new("test"));
    let diags = tester
        .provider()
        .configure_with_env(
            &DynamicValue::object([("server", DynamicValue::Unknown)]),
            Some("http://127.0.0.1:1".into()),
        )
        .await;

    assert_has_error(&diags, "Unknown Petstore API Host");
    assert_eq!(diags[0].attribute.as_deref(), Some("server"));
}

#[tokio::test]
async fn test_resource_config_validation() {
    let (_fake, tester) = configured().await;
    assert!(tester
        .validate_resource_config(PET, support::pet_config("newdog", "available"))
        .await
        .is_ok());

    let mut bad = support::pet_config("newdog", "available");
    bad.set("name", 5.into());
    assert!(tester.validate_resource_config(PET, bad).await.is_err());
}
