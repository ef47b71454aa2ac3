use crate::{
    error::Error,
    schema::{
        AttributeKind, NewRecipe, Owner, Recipe, RecipeChanges, RecipeDetail, RecipeFilter, RowId,
    },
};

use sqlx::{PgConnection, Pool, Postgres};

use super::attributes::{link_recipe_attributes, list_recipe_attributes, replace_recipe_attributes};

pub async fn fetch_recipes(
    owner: Owner,
    filter: &RecipeFilter,
    pool: &Pool<Postgres>,
) -> Result<Vec<Recipe>, Error> {
    // EXISTS keeps a recipe matching several requested ids to a single row
    let rows: Vec<Recipe> = sqlx::query_as(
        "
        SELECT r.*
        FROM recipes r
        WHERE r.user_id = $1
        AND ($2::INT4[] IS NULL OR EXISTS (
            SELECT 1 FROM recipe_tags rt WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)
        ))
        AND ($3::INT4[] IS NULL OR EXISTS (
            SELECT 1 FROM recipe_ingredients ri
            WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)
        ))
        ORDER BY r.id DESC
    ",
    )
    .bind(owner.id())
    .bind(filter.tags.clone())
    .bind(filter.ingredients.clone())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_recipe(
    owner: Owner,
    id: RowId,
    conn: &mut PgConnection,
) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> =
        sqlx::query_as("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner.id())
            .fetch_optional(&mut *conn)
            .await?;

    Ok(row)
}

pub async fn get_recipe_detail(
    owner: Owner,
    id: RowId,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeDetail>, Error> {
    let mut conn = pool.acquire().await?;

    let Some(recipe) = get_recipe(owner, id, &mut conn).await? else {
        return Ok(None);
    };
    let tags = list_recipe_attributes(AttributeKind::Tag, id, &mut conn).await?;
    let ingredients = list_recipe_attributes(AttributeKind::Ingredient, id, &mut conn).await?;

    Ok(Some(RecipeDetail {
        recipe,
        tags,
        ingredients,
    }))
}

pub async fn create_recipe(
    owner: Owner,
    recipe: &NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, Error> {
    let mut tx = pool.begin().await?;

    let id: (RowId,) = sqlx::query_as(
        "
        INSERT INTO recipes (user_id, title, time_minutes, price_cents, description, link)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
    ",
    )
    .bind(owner.id())
    .bind(&recipe.title)
    .bind(recipe.time_minutes)
    .bind(recipe.price.cents())
    .bind(&recipe.description)
    .bind(&recipe.link)
    .fetch_one(&mut *tx)
    .await?;

    for kind in AttributeKind::ALL {
        link_recipe_attributes(owner, kind, id.0, recipe.names(kind), &mut tx).await?;
    }

    tx.commit().await?;

    get_recipe_detail(owner, id.0, pool)
        .await?
        .ok_or(Error::NotFound)
}

/// Applies `changes` in one transaction. `None` when the recipe is not the owner's.
pub async fn update_recipe(
    owner: Owner,
    id: RowId,
    changes: &RecipeChanges,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeDetail>, Error> {
    let mut tx = pool.begin().await?;

    let updated: Option<(RowId,)> = sqlx::query_as(
        "
        UPDATE recipes SET
            title = COALESCE($3, title),
            time_minutes = COALESCE($4, time_minutes),
            price_cents = COALESCE($5, price_cents),
            description = COALESCE($6, description),
            link = COALESCE($7, link)
        WHERE id = $1 AND user_id = $2
        RETURNING id
    ",
    )
    .bind(id)
    .bind(owner.id())
    .bind(changes.title.as_deref())
    .bind(changes.time_minutes)
    .bind(changes.price.map(|price| price.cents()))
    .bind(changes.description.as_deref())
    .bind(changes.link.as_deref())
    .fetch_optional(&mut *tx)
    .await?;

    if updated.is_none() {
        return Ok(None);
    }

    for kind in AttributeKind::ALL {
        if let Some(names) = changes.names(kind) {
            replace_recipe_attributes(owner, kind, id, names, &mut tx).await?;
        }
    }

    tx.commit().await?;

    get_recipe_detail(owner, id, pool).await
}

pub async fn delete_recipe(owner: Owner, id: RowId, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let query = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(owner.id())
        .execute(pool)
        .await?;

    Ok(query.rows_affected() > 0)
}
