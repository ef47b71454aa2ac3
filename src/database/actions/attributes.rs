use crate::{
    error::{is_unique_violation, Error},
    schema::{Attribute, AttributeKind, Owner, RowId},
};

use sqlx::{PgConnection, Pool, Postgres};

pub async fn list_attributes(
    owner: Owner,
    kind: AttributeKind,
    assigned_only: bool,
    pool: &Pool<Postgres>,
) -> Result<Vec<Attribute>, Error> {
    let table = kind.plural();
    let link_table = kind.link_table();
    let link_column = kind.link_column();

    let rows: Vec<Attribute> = sqlx::query_as(&format!(
        "
        SELECT a.id, a.name
        FROM {table} a
        WHERE a.user_id = $1
        AND (NOT $2 OR EXISTS (
            SELECT 1 FROM {link_table} l
            INNER JOIN recipes r ON r.id = l.recipe_id
            WHERE l.{link_column} = a.id AND r.user_id = $1
        ))
        ORDER BY a.name COLLATE \"C\" DESC, a.id DESC
    "
    ))
    .bind(owner.id())
    .bind(assigned_only)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_attribute(
    owner: Owner,
    kind: AttributeKind,
    id: RowId,
    pool: &Pool<Postgres>,
) -> Result<Option<Attribute>, Error> {
    let row: Option<Attribute> = sqlx::query_as(&format!(
        "SELECT id, name FROM {} WHERE id = $1 AND user_id = $2",
        kind.plural()
    ))
    .bind(id)
    .bind(owner.id())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn find_attribute(
    owner: Owner,
    kind: AttributeKind,
    name: &str,
    conn: &mut PgConnection,
) -> Result<Option<RowId>, Error> {
    let row: Option<(RowId,)> = sqlx::query_as(&format!(
        "SELECT id FROM {} WHERE user_id = $1 AND name = $2",
        kind.plural()
    ))
    .bind(owner.id())
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|row| row.0))
}

/// Looks up `name` among the owner's rows and inserts it when missing. The
/// `(user_id, name)` unique index makes concurrent callers converge on one row.
pub async fn get_or_create_attribute(
    owner: Owner,
    kind: AttributeKind,
    name: &str,
    conn: &mut PgConnection,
) -> Result<RowId, Error> {
    sqlx::query(&format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) ON CONFLICT (user_id, name) DO NOTHING",
        kind.plural()
    ))
    .bind(owner.id())
    .bind(name)
    .execute(&mut *conn)
    .await?;

    find_attribute(owner, kind, name, conn)
        .await?
        .ok_or_else(|| Error::Internal(format!("{} '{name}' vanished after insert", kind.label())))
}

pub async fn rename_attribute(
    owner: Owner,
    kind: AttributeKind,
    id: RowId,
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<Attribute>, Error> {
    let row: Option<Attribute> = sqlx::query_as(&format!(
        "UPDATE {} SET name = $3 WHERE id = $1 AND user_id = $2 RETURNING id, name",
        kind.plural()
    ))
    .bind(id)
    .bind(owner.id())
    .bind(name)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::field(
                "name",
                &format!("A {} with this name already exists.", kind.label()),
            )
        } else {
            Error::from(e)
        }
    })?;

    Ok(row)
}

/// Removes the row and, through the foreign key, its recipe links. Recipes stay.
pub async fn delete_attribute(
    owner: Owner,
    kind: AttributeKind,
    id: RowId,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let query = sqlx::query(&format!(
        "DELETE FROM {} WHERE id = $1 AND user_id = $2",
        kind.plural()
    ))
    .bind(id)
    .bind(owner.id())
    .execute(pool)
    .await?;

    Ok(query.rows_affected() > 0)
}

pub async fn list_recipe_attributes(
    kind: AttributeKind,
    recipe_id: RowId,
    conn: &mut PgConnection,
) -> Result<Vec<Attribute>, Error> {
    let rows: Vec<Attribute> = sqlx::query_as(&format!(
        "
        SELECT a.id, a.name
        FROM {} a
        INNER JOIN {} l ON l.{} = a.id
        WHERE l.recipe_id = $1
        ORDER BY a.id
    ",
        kind.plural(),
        kind.link_table(),
        kind.link_column()
    ))
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub async fn link_recipe_attributes(
    owner: Owner,
    kind: AttributeKind,
    recipe_id: RowId,
    names: &[String],
    conn: &mut PgConnection,
) -> Result<(), Error> {
    let query = format!(
        "INSERT INTO {} (recipe_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.link_table(),
        kind.link_column()
    );

    for name in names {
        let id = get_or_create_attribute(owner, kind, name, &mut *conn).await?;

        sqlx::query(&query)
            .bind(recipe_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Replaces the whole association set of one kind; an empty `names` clears it.
pub async fn replace_recipe_attributes(
    owner: Owner,
    kind: AttributeKind,
    recipe_id: RowId,
    names: &[String],
    conn: &mut PgConnection,
) -> Result<(), Error> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE recipe_id = $1",
        kind.link_table()
    ))
    .bind(recipe_id)
    .execute(&mut *conn)
    .await?;

    link_recipe_attributes(owner, kind, recipe_id, names, conn).await
}
