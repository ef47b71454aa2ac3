use std::sync::Arc;

use log::info;
use serde_json::json;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use super::api::{json_body, with_store};
use crate::{
    cryptography::{hash_password_blocking, verify_password_blocking},
    error::{Error, NON_FIELD_ERRORS},
    form::{self, FormData},
    jwt::SessionKeys,
    middleware::with_user,
    schema::{NewUser, User, UserView},
    store::SharedStore,
};

pub fn user_routes(
    store: SharedStore,
    keys: Arc<SessionKeys>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let create = warp::path!("users")
        .and(warp::post())
        .and(with_store(store.clone()))
        .and(json_body())
        .and_then(create_user);

    let token_keys = keys.clone();
    let token = warp::path!("users" / "token")
        .and(warp::post())
        .and(with_store(store.clone()))
        .and(warp::any().map(move || token_keys.clone()))
        .and(json_body())
        .and_then(create_token);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_user(store, keys))
        .map(|user: User| warp::reply::json(&UserView::from(&user)));

    create.or(token).or(me)
}

async fn create_user(store: SharedStore, data: FormData) -> Result<impl Reply, Rejection> {
    let signup = form::signup(data)?;
    let password = hash_password_blocking(signup.password).await?;

    let user = store
        .create_user(NewUser {
            email: signup.email,
            name: signup.name,
            password,
        })
        .await?;
    info!("Registered user {}", user.id);

    Ok(warp::reply::with_status(
        warp::reply::json(&UserView::from(&user)),
        StatusCode::CREATED,
    ))
}

async fn create_token(
    store: SharedStore,
    keys: Arc<SessionKeys>,
    data: FormData,
) -> Result<impl Reply, Rejection> {
    let credentials = form::credentials(data)?;
    let invalid = || Error::field(NON_FIELD_ERRORS, "Unable to authenticate with provided credentials.");

    let user = store
        .find_user_by_email(&credentials.email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password_blocking(credentials.password, user.password.to_owned()).await? {
        return Err(invalid().into());
    }

    let token = keys.generate_jwt_session(&user)?;
    Ok(warp::reply::json(&json!({ "token": token })))
}
