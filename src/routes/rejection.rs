use std::convert::Infallible;

use log::error;
use serde::Serialize;
use warp::{
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{InvalidQuery, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType},
    reply::Response,
    Rejection, Reply,
};

use crate::error::Error;

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

fn detail(status: StatusCode, detail: &str) -> Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorBody {
            detail: detail.to_string(),
        }),
        status,
    )
    .into_response()
}

fn error_response(error: &Error) -> Response {
    match error {
        Error::Validation(fields) => {
            warp::reply::with_status(warp::reply::json(fields), StatusCode::BAD_REQUEST)
                .into_response()
        }
        Error::Unauthenticated => warp::reply::with_header(
            detail(error.status(), &error.to_string()),
            "www-authenticate",
            "Bearer",
        )
        .into_response(),
        Error::NotFound => detail(error.status(), &error.to_string()),
        Error::Query(_) | Error::Config(_) | Error::Internal(_) => {
            error!("{error}");
            detail(error.status(), "A server error occurred.")
        }
    }
}

/// Turns every rejection into a JSON body. Crate errors are checked first since a
/// combined rejection also carries the not-found of every route that did not match.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(error) = err.find::<Error>() {
        return Ok(error_response(error));
    }

    let response = if let Some(e) = err.find::<BodyDeserializeError>() {
        detail(StatusCode::BAD_REQUEST, &format!("JSON parse error - {e}"))
    } else if let Some(e) = err.find::<InvalidQuery>() {
        detail(StatusCode::BAD_REQUEST, &e.to_string())
    } else if err.find::<PayloadTooLarge>().is_some() {
        detail(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large.")
    } else if err.find::<UnsupportedMediaType>().is_some() {
        detail(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported media type in request.",
        )
    } else if err.find::<MethodNotAllowed>().is_some() {
        detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    } else if err.is_not_found() {
        detail(StatusCode::NOT_FOUND, &Error::NotFound.to_string())
    } else {
        error!("Unhandled rejection: {err:?}");
        detail(StatusCode::INTERNAL_SERVER_ERROR, "A server error occurred.")
    };

    Ok(response)
}
