use crate::{
    error::{is_unique_violation, Error},
    schema::{NewUser, RowId, User},
};

use sqlx::{Pool, Postgres};

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&*pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: RowId) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&*pool)
        .await?;

    Ok(row)
}

/// Creates a user; `user.password` must already be the argon2 hash.
pub async fn register_user(user: &NewUser, pool: &Pool<Postgres>) -> Result<User, Error> {
    let row: User = sqlx::query_as(
        "
        INSERT INTO users (email, name, password)
        VALUES ($1, $2, $3)
        RETURNING *
    ",
    )
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.password)
    .fetch_one(&*pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::field("email", "A user with this email already exists.")
        } else {
            Error::from(e)
        }
    })?;

    Ok(row)
}
