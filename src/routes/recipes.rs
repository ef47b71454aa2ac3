use std::sync::Arc;

use log::info;
use serde::Deserialize;
use warp::{http::StatusCode, reply::Response, Filter, Rejection, Reply};

use super::api::{json_body, with_store};
use crate::{
    error::Error,
    form::{self, FormData, FormMode},
    jwt::SessionKeys,
    middleware::with_owner,
    schema::{Owner, RecipeDetailView, RecipeListView, RowId},
    store::SharedStore,
};

#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

/// What a request under `/recipes` asks for, decided after authentication.
enum RecipeRequest {
    List(RecipeQuery),
    Create(FormData),
    Get(RowId),
    Update(RowId, FormData, FormMode),
    Delete(RowId),
}

pub fn recipe_routes(
    store: SharedStore,
    keys: Arc<SessionKeys>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("recipes")
        .and(with_owner(store.clone(), keys))
        .and(with_store(store))
        .and(recipe_request())
        .and_then(dispatch)
}

fn recipe_request() -> impl Filter<Extract = (RecipeRequest,), Error = Rejection> + Clone {
    let collection = warp::path::end();
    let member = warp::path::param::<RowId>().and(warp::path::end());

    let list = collection
        .and(warp::get())
        .and(warp::query::<RecipeQuery>())
        .map(RecipeRequest::List);
    let create = collection
        .and(warp::post())
        .and(json_body())
        .map(RecipeRequest::Create);
    let get = member.clone().and(warp::get()).map(RecipeRequest::Get);
    let patch = member
        .clone()
        .and(warp::patch())
        .and(json_body())
        .map(|id: RowId, data: FormData| RecipeRequest::Update(id, data, FormMode::Patch));
    let put = member
        .clone()
        .and(warp::put())
        .and(json_body())
        .map(|id: RowId, data: FormData| RecipeRequest::Update(id, data, FormMode::Replace));
    let delete = member.and(warp::delete()).map(RecipeRequest::Delete);

    list.or(create)
        .unify()
        .or(get)
        .unify()
        .or(patch)
        .unify()
        .or(put)
        .unify()
        .or(delete)
        .unify()
}

async fn dispatch(
    owner: Owner,
    store: SharedStore,
    request: RecipeRequest,
) -> Result<Response, Rejection> {
    match request {
        RecipeRequest::List(query) => list_recipes(owner, store, query)
            .await
            .map(Reply::into_response),
        RecipeRequest::Create(data) => create_recipe(owner, store, data)
            .await
            .map(Reply::into_response),
        RecipeRequest::Get(id) => get_recipe(owner, store, id).await.map(Reply::into_response),
        RecipeRequest::Update(id, data, mode) => update_recipe(owner, store, id, data, mode)
            .await
            .map(Reply::into_response),
        RecipeRequest::Delete(id) => delete_recipe(owner, store, id)
            .await
            .map(Reply::into_response),
    }
}

async fn list_recipes(
    owner: Owner,
    store: SharedStore,
    query: RecipeQuery,
) -> Result<impl Reply, Rejection> {
    let filter = form::recipe_filter(query.tags.as_deref(), query.ingredients.as_deref())?;
    let recipes = store.list_recipes(owner, &filter).await?;

    let rows: Vec<RecipeListView> = recipes.iter().map(RecipeListView::from).collect();
    Ok(warp::reply::json(&rows))
}

async fn create_recipe(
    owner: Owner,
    store: SharedStore,
    data: FormData,
) -> Result<impl Reply, Rejection> {
    let recipe = form::new_recipe(data)?;
    let detail = store.create_recipe(owner, recipe).await?;
    info!("User {} created recipe {}", owner.id(), detail.recipe.id);

    Ok(warp::reply::with_status(
        warp::reply::json(&RecipeDetailView::from(detail)),
        StatusCode::CREATED,
    ))
}

async fn get_recipe(owner: Owner, store: SharedStore, id: RowId) -> Result<impl Reply, Rejection> {
    let detail = store.get_recipe(owner, id).await?.ok_or(Error::NotFound)?;

    Ok(warp::reply::json(&RecipeDetailView::from(detail)))
}

async fn update_recipe(
    owner: Owner,
    store: SharedStore,
    id: RowId,
    data: FormData,
    mode: FormMode,
) -> Result<impl Reply, Rejection> {
    let changes = form::recipe_changes(data, mode)?;
    let detail = store
        .update_recipe(owner, id, changes)
        .await?
        .ok_or(Error::NotFound)?;

    Ok(warp::reply::json(&RecipeDetailView::from(detail)))
}

async fn delete_recipe(owner: Owner, store: SharedStore, id: RowId) -> Result<impl Reply, Rejection> {
    if !store.delete_recipe(owner, id).await? {
        return Err(Error::NotFound.into());
    }
    info!("User {} deleted recipe {id}", owner.id());

    Ok(StatusCode::NO_CONTENT)
}
