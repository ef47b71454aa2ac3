use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{info, warn};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use super::{
    actions,
    error::Error,
    schema::{
        Attribute, AttributeKind, NewRecipe, NewUser, Owner, Recipe, RecipeChanges, RecipeDetail,
        RecipeFilter, RowId, User,
    },
};
use crate::config::DatabaseConfig;

pub type SharedStore = Arc<dyn Store>;

/// Storage seam behind the HTTP layer.
///
/// Recipe, tag and ingredient operations all take the acting [`Owner`]. A row owned by
/// someone else is reported exactly like a missing one (`None` / `false`).
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, Error>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
    async fn get_user(&self, id: RowId) -> Result<Option<User>, Error>;

    async fn list_recipes(&self, owner: Owner, filter: &RecipeFilter) -> Result<Vec<Recipe>, Error>;
    async fn get_recipe(&self, owner: Owner, id: RowId) -> Result<Option<RecipeDetail>, Error>;
    async fn create_recipe(&self, owner: Owner, recipe: NewRecipe) -> Result<RecipeDetail, Error>;
    async fn update_recipe(
        &self,
        owner: Owner,
        id: RowId,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeDetail>, Error>;
    async fn delete_recipe(&self, owner: Owner, id: RowId) -> Result<bool, Error>;

    async fn list_attributes(
        &self,
        owner: Owner,
        kind: AttributeKind,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>, Error>;
    async fn get_attribute(
        &self,
        owner: Owner,
        kind: AttributeKind,
        id: RowId,
    ) -> Result<Option<Attribute>, Error>;
    async fn rename_attribute(
        &self,
        owner: Owner,
        kind: AttributeKind,
        id: RowId,
        name: String,
    ) -> Result<Option<Attribute>, Error>;
    async fn delete_attribute(
        &self,
        owner: Owner,
        kind: AttributeKind,
        id: RowId,
    ) -> Result<bool, Error>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Connects, retrying once a second while the database is still coming up.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, Error> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.url)
                .await
            {
                Ok(pool) => {
                    info!("Database available after {attempt} attempt(s)");
                    return Ok(Self { pool });
                }
                Err(e) if attempt < config.connect_retries => {
                    warn!("Database unavailable ({e}), waiting 1 second...");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Err(e) => return Err(Error::from(e)),
            }
        }
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Query(format!("Migration failed: {e}")))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        actions::register_user(&user, &self.pool).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        actions::get_user(&self.pool, email).await
    }

    async fn get_user(&self, id: RowId) -> Result<Option<User>, Error> {
        actions::get_user_by_id(&self.pool, id).await
    }

    async fn list_recipes(&self, owner: Owner, filter: &RecipeFilter) -> Result<Vec<Recipe>, Error> {
        actions::fetch_recipes(owner, filter, &self.pool).await
    }

    async fn get_recipe(&self, owner: Owner, id: RowId) -> Result<Option<RecipeDetail>, Error> {
        actions::get_recipe_detail(owner, id, &self.pool).await
    }

    async fn create_recipe(&self, owner: Owner, recipe: NewRecipe) -> Result<RecipeDetail, Error> {
        actions::create_recipe(owner, &recipe, &self.pool).await
    }

    async fn update_recipe(
        &self,
        owner: Owner,
        id: RowId,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeDetail>, Error> {
        actions::update_recipe(owner, id, &changes, &self.pool).await
    }

    async fn delete_recipe(&self, owner: Owner, id: RowId) -> Result<bool, Error> {
        actions::delete_recipe(owner, id, &self.pool).await
    }

    async fn list_attributes(
        &self,
        owner: Owner,
        kind: AttributeKind,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>, Error> {
        actions::list_attributes(owner, kind, assigned_only, &self.pool).await
    }

    async fn get_attribute(
        &self,
        owner: Owner,
        kind: AttributeKind,
        id: RowId,
    ) -> Result<Option<Attribute>, Error> {
        actions::get_attribute(owner, kind, id, &self.pool).await
    }

    async fn rename_attribute(
        &self,
        owner: Owner,
        kind: AttributeKind,
        id: RowId,
        name: String,
    ) -> Result<Option<Attribute>, Error> {
        actions::rename_attribute(owner, kind, id, &name, &self.pool).await
    }

    async fn delete_attribute(
        &self,
        owner: Owner,
        kind: AttributeKind,
        id: RowId,
    ) -> Result<bool, Error> {
        actions::delete_attribute(owner, kind, id, &self.pool).await
    }
}
