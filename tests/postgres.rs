#![cfg(feature = "postgres-tests")]

//! Runs the HTTP surface against `PgStore`. Needs `DATABASE_URL` (a `.env` file works);
//! every test registers its own users, so runs do not interfere with each other.

mod common;

use std::{env, sync::Arc};

use common::{ids, names, TestApp};
use recipe_api::{
    error::Error,
    schema::{AttributeKind, NewUser, User},
    DatabaseConfig, PgStore, Store,
};
use serde_json::json;
use warp::http::StatusCode;

async fn pg_app() -> TestApp {
    dotenv::dotenv().ok();
    let url = env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres tests");

    let store = PgStore::connect(&DatabaseConfig {
        url,
        max_connections: 4,
        connect_retries: 1,
    })
    .await
    .unwrap();
    store.migrate().await.unwrap();

    TestApp::with_store(Arc::new(store))
}

fn email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", rand::random::<u64>())
}

#[tokio::test]
async fn get_or_create_reuses_existing_rows() {
    let app = pg_app().await;
    let user = app.user(&email("reuse")).await;

    let first = app
        .create_recipe(&user, json!({"tags": [{"name": "Dinner"}], "ingredients": [{"name": "Eggs"}, {"name": "Eggs"}]}))
        .await;
    let second = app
        .create_recipe(&user, json!({"tags": [{"name": "Dinner"}, {"name": "Quick"}]}))
        .await;

    assert_eq!(names(&first["ingredients"]), vec!["Eggs"]);
    assert_eq!(second["tags"][0]["id"], first["tags"][0]["id"]);
    let tags = app.get(&user, "/tags").await;
    assert_eq!(names(&tags.body), vec!["Quick", "Dinner"]);
}

#[tokio::test]
async fn concurrent_creates_share_one_row() {
    let app = pg_app().await;
    let user = app.user(&email("race")).await;
    let payload = json!({"tags": [{"name": "Shared"}]});

    let (a, b) = tokio::join!(
        app.create_recipe(&user, payload.clone()),
        app.create_recipe(&user, payload.clone()),
    );

    assert_eq!(a["tags"][0]["id"], b["tags"][0]["id"]);
    let tags = app
        .store
        .list_attributes(user.owner(), AttributeKind::Tag, false)
        .await
        .unwrap();
    assert_eq!(tags.len(), 1);
}

#[tokio::test]
async fn empty_list_clears_associations() {
    let app = pg_app().await;
    let user = app.user(&email("clear")).await;
    let recipe = app
        .create_recipe(
            &user,
            json!({"tags": [{"name": "Breakfast"}], "ingredients": [{"name": "Milk"}]}),
        )
        .await;
    let url = format!("/recipes/{}", recipe["id"]);

    let response = app.patch(&user, &url, json!({"tags": []})).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["tags"], json!([]));
    assert_eq!(names(&response.body["ingredients"]), vec!["Milk"]);

    let replaced = app
        .patch(&user, &url, json!({"ingredients": [{"name": "Oat milk"}]}))
        .await;
    assert_eq!(names(&replaced.body["ingredients"]), vec!["Oat milk"]);
    let tags = app.get(&user, "/tags").await;
    assert_eq!(names(&tags.body), vec!["Breakfast"]);
}

#[tokio::test]
async fn filters_are_or_within_and_between() {
    let app = pg_app().await;
    let user = app.user(&email("filter")).await;
    let both = app
        .create_recipe(
            &user,
            json!({"tags": [{"name": "Vegan"}, {"name": "Quick"}], "ingredients": [{"name": "Tofu"}]}),
        )
        .await;
    let one = app
        .create_recipe(&user, json!({"tags": [{"name": "Quick"}]}))
        .await;
    app.create_recipe(&user, json!({})).await;

    let vegan = both["tags"][0]["id"].as_i64().unwrap();
    let quick = both["tags"][1]["id"].as_i64().unwrap();
    let tofu = both["ingredients"][0]["id"].as_i64().unwrap();

    let response = app.get(&user, &format!("/recipes?tags={vegan},{quick}")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        ids(&response.body),
        vec![one["id"].as_i64().unwrap(), both["id"].as_i64().unwrap()]
    );

    let response = app
        .get(&user, &format!("/recipes?tags={quick}&ingredients={tofu}"))
        .await;
    assert_eq!(ids(&response.body), vec![both["id"].as_i64().unwrap()]);
}

#[tokio::test]
async fn assigned_only_lists_each_row_once() {
    let app = pg_app().await;
    let user = app.user(&email("assigned")).await;
    app.create_recipe(&user, json!({"tags": [{"name": "Breakfast"}]})).await;
    app.create_recipe(&user, json!({"tags": [{"name": "Breakfast"}]})).await;
    let dropped = app
        .create_recipe(&user, json!({"tags": [{"name": "Lunch"}]}))
        .await;
    app.delete(&user, &format!("/recipes/{}", dropped["id"])).await;

    let all = app.get(&user, "/tags").await;
    assert_eq!(names(&all.body), vec!["Lunch", "Breakfast"]);

    let assigned = app.get(&user, "/tags?assigned_only=1").await;
    assert_eq!(assigned.status, StatusCode::OK);
    assert_eq!(names(&assigned.body), vec!["Breakfast"]);
}

#[tokio::test]
async fn names_sort_by_byte_order() {
    let app = pg_app().await;
    let user = app.user(&email("collation")).await;
    app.create_recipe(
        &user,
        json!({"tags": [{"name": "Vegan"}, {"name": "dessert"}, {"name": "Breakfast"}]}),
    )
    .await;

    let tags = app.get(&user, "/tags").await;

    assert_eq!(names(&tags.body), vec!["dessert", "Vegan", "Breakfast"]);
}

#[tokio::test]
async fn foreign_rows_are_not_found() {
    let app = pg_app().await;
    let user = app.user(&email("mine")).await;
    let other = app.user(&email("theirs")).await;
    let recipe = app
        .create_recipe(&other, json!({"tags": [{"name": "Private"}]}))
        .await;
    let recipe_url = format!("/recipes/{}", recipe["id"]);
    let tag_url = format!("/tags/{}", recipe["tags"][0]["id"]);

    assert_eq!(app.get(&user, &recipe_url).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.patch(&user, &recipe_url, json!({"title": "Taken"})).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.delete(&user, &recipe_url).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.patch(&user, &tag_url, json!({"name": "Taken"})).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.delete(&user, &tag_url).await.status, StatusCode::NOT_FOUND);

    let kept = app.get(&other, &recipe_url).await;
    assert_eq!(kept.body["title"], "Sample recipe");
    assert_eq!(names(&kept.body["tags"]), vec!["Private"]);
}

#[tokio::test]
async fn rename_conflict_and_repeated_delete() {
    let app = pg_app().await;
    let user = app.user(&email("rename")).await;
    let recipe = app
        .create_recipe(&user, json!({"tags": [{"name": "Brunch"}, {"name": "Breakfast"}]}))
        .await;
    let url = format!("/tags/{}", recipe["tags"][0]["id"]);

    let taken = app.patch(&user, &url, json!({"name": "Breakfast"})).await;
    assert_eq!(taken.status, StatusCode::BAD_REQUEST);
    assert!(taken.body["name"].is_array());

    assert_eq!(app.delete(&user, &url).await.status, StatusCode::NO_CONTENT);
    assert_eq!(app.delete(&user, &url).await.status, StatusCode::NOT_FOUND);

    let detail = app.get(&user, &format!("/recipes/{}", recipe["id"])).await;
    assert_eq!(names(&detail.body["tags"]), vec!["Breakfast"]);
}

#[tokio::test]
async fn duplicate_email_is_a_validation_error() {
    let app = pg_app().await;
    let address = email("dupe");
    app.user(&address).await;

    let result = app
        .store
        .create_user(NewUser {
            email: address,
            name: String::from("Again"),
            password: String::from("unused"),
        })
        .await;

    assert!(matches!(result, Err(Error::Validation(errors)) if errors.contains_key("email")));
}

#[tokio::test]
async fn session_for_unknown_user_is_unauthorized() {
    let app = pg_app().await;
    let ghost = User {
        id: i32::MAX,
        email: email("ghost"),
        name: String::from("Ghost"),
        password: String::new(),
    };
    let token = app.keys.generate_jwt_session(&ghost).unwrap();

    let response = app
        .request(
            "POST",
            "/recipes",
            Some(&token),
            Some(json!({"title": "x", "time_minutes": 1, "price": "1.00"})),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
