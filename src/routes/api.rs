use std::{convert::Infallible, sync::Arc};

use warp::{Filter, Rejection, Reply};

use super::{attributes, health, recipes, rejection::handle_rejection, users};
use crate::{
    constants::MAX_BODY_BYTES, form::FormData, jwt::SessionKeys, schema::AttributeKind,
    store::SharedStore,
};

/// Full HTTP surface with rejections turned into JSON error responses.
pub fn api(
    store: SharedStore,
    keys: Arc<SessionKeys>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    health::health_routes()
        .or(users::user_routes(store.clone(), keys.clone()))
        .or(recipes::recipe_routes(store.clone(), keys.clone()))
        .or(attributes::attribute_routes(
            AttributeKind::Tag,
            store.clone(),
            keys.clone(),
        ))
        .or(attributes::attribute_routes(
            AttributeKind::Ingredient,
            store,
            keys,
        ))
        .recover(handle_rejection)
        .with(warp::log("recipe_api"))
}

pub fn with_store(
    store: SharedStore,
) -> impl Filter<Extract = (SharedStore,), Error = Infallible> + Clone {
    warp::any().map(move || store.clone())
}

pub fn json_body() -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}
