use std::sync::Arc;

use log::info;
use serde::Deserialize;
use warp::{http::StatusCode, reply::Response, Filter, Rejection, Reply};

use super::api::{json_body, with_store};
use crate::{
    error::Error,
    form::{self, FormData},
    jwt::SessionKeys,
    middleware::with_owner,
    schema::{AttributeKind, Owner, RowId},
    store::SharedStore,
};

#[derive(Debug, Default, Deserialize)]
pub struct AttributeQuery {
    pub assigned_only: Option<String>,
}

enum AttributeRequest {
    List(AttributeQuery),
    Get(RowId),
    Rename(RowId, FormData),
    Delete(RowId),
}

/// `/tags` or `/ingredients`, depending on `kind`.
pub fn attribute_routes(
    kind: AttributeKind,
    store: SharedStore,
    keys: Arc<SessionKeys>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path(kind.plural())
        .and(with_owner(store.clone(), keys))
        .and(with_store(store))
        .and(attribute_request())
        .and_then(move |owner: Owner, store: SharedStore, request: AttributeRequest| {
            dispatch(kind, owner, store, request)
        })
}

fn attribute_request() -> impl Filter<Extract = (AttributeRequest,), Error = Rejection> + Clone {
    let member = warp::path::param::<RowId>().and(warp::path::end());

    let list = warp::path::end()
        .and(warp::get())
        .and(warp::query::<AttributeQuery>())
        .map(AttributeRequest::List);
    let get = member.clone().and(warp::get()).map(AttributeRequest::Get);
    let rename = member
        .clone()
        .and(warp::patch().or(warp::put()).unify())
        .and(json_body())
        .map(AttributeRequest::Rename);
    let delete = member.and(warp::delete()).map(AttributeRequest::Delete);

    list.or(get).unify().or(rename).unify().or(delete).unify()
}

async fn dispatch(
    kind: AttributeKind,
    owner: Owner,
    store: SharedStore,
    request: AttributeRequest,
) -> Result<Response, Rejection> {
    match request {
        AttributeRequest::List(query) => list_attributes(kind, owner, store, query)
            .await
            .map(Reply::into_response),
        AttributeRequest::Get(id) => get_attribute(kind, owner, store, id)
            .await
            .map(Reply::into_response),
        AttributeRequest::Rename(id, data) => rename_attribute(kind, owner, store, id, data)
            .await
            .map(Reply::into_response),
        AttributeRequest::Delete(id) => delete_attribute(kind, owner, store, id)
            .await
            .map(Reply::into_response),
    }
}

async fn list_attributes(
    kind: AttributeKind,
    owner: Owner,
    store: SharedStore,
    query: AttributeQuery,
) -> Result<impl Reply, Rejection> {
    let assigned_only = form::parse_flag("assigned_only", query.assigned_only.as_deref())?;
    let rows = store.list_attributes(owner, kind, assigned_only).await?;

    Ok(warp::reply::json(&rows))
}

async fn get_attribute(
    kind: AttributeKind,
    owner: Owner,
    store: SharedStore,
    id: RowId,
) -> Result<impl Reply, Rejection> {
    let row = store
        .get_attribute(owner, kind, id)
        .await?
        .ok_or(Error::NotFound)?;

    Ok(warp::reply::json(&row))
}

async fn rename_attribute(
    kind: AttributeKind,
    owner: Owner,
    store: SharedStore,
    id: RowId,
    data: FormData,
) -> Result<impl Reply, Rejection> {
    let name = form::attribute_name(data)?;
    let row = store
        .rename_attribute(owner, kind, id, name)
        .await?
        .ok_or(Error::NotFound)?;

    Ok(warp::reply::json(&row))
}

async fn delete_attribute(
    kind: AttributeKind,
    owner: Owner,
    store: SharedStore,
    id: RowId,
) -> Result<impl Reply, Rejection> {
    if !store.delete_attribute(owner, kind, id).await? {
        return Err(Error::NotFound.into());
    }
    info!("User {} deleted {} {id}", owner.id(), kind.label());

    Ok(StatusCode::NO_CONTENT)
}
