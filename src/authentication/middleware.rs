use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use super::jwt::{JwtSessionData, SessionKeys};
use crate::{
    constants::SESSION_COOKIE,
    error::Error,
    schema::{Owner, User},
    store::SharedStore,
};

/// Token from an `Authorization: Bearer <token>` (or `Token <token>`) header.
fn header_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if (scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token"))
        && !token.is_empty()
    {
        Some(token)
    } else {
        None
    }
}

/// Resolves the caller's session from the `Authorization` header, falling back to the
/// session cookie. Rejects with [`Error::Unauthenticated`] before any lookup happens.
pub fn with_session(
    keys: Arc<SessionKeys>,
) -> impl Filter<Extract = (JwtSessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .and_then(move |header: Option<String>, cookie: Option<String>| {
            let keys = keys.clone();
            async move {
                let token = match (header.as_deref(), cookie) {
                    (Some(header), _) => header_token(header)
                        .map(str::to_owned)
                        .ok_or(Error::Unauthenticated)?,
                    (None, Some(cookie)) => cookie,
                    (None, None) => return Err(Error::Unauthenticated.into()),
                };

                keys.verify_jwt_session(&token).map_err(Rejection::from)
            }
        })
}

/// Loads the account behind a verified session. A session whose user no longer
/// exists is rejected like a missing one.
pub fn with_user(
    store: SharedStore,
    keys: Arc<SessionKeys>,
) -> impl Filter<Extract = (User,), Error = Rejection> + Clone {
    with_session(keys).and_then(move |session: JwtSessionData| {
        let store = store.clone();
        async move {
            match store.get_user(session.user_id).await? {
                Some(user) => Ok(user),
                None => Err(Rejection::from(Error::Unauthenticated)),
            }
        }
    })
}

pub fn with_owner(
    store: SharedStore,
    keys: Arc<SessionKeys>,
) -> impl Filter<Extract = (Owner,), Error = Rejection> + Clone {
    with_user(store, keys).map(|user: User| Owner::from(&user))
}
