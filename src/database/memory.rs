use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    error::Error,
    schema::{
        Attribute, AttributeKind, NewRecipe, NewUser, Owner, Recipe, RecipeChanges, RecipeDetail,
        RecipeFilter, RowId, User,
    },
    store::Store,
};

/// [`Store`] kept in process memory. Every operation runs under one lock, so a
/// get-or-create never races with another.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<RowId, User>,
    recipes: BTreeMap<RowId, StoredRecipe>,
    tags: BTreeMap<RowId, StoredAttribute>,
    ingredients: BTreeMap<RowId, StoredAttribute>,
    last_user_id: RowId,
    last_recipe_id: RowId,
    last_tag_id: RowId,
    last_ingredient_id: RowId,
}

struct StoredRecipe {
    recipe: Recipe,
    tags: BTreeSet<RowId>,
    ingredients: BTreeSet<RowId>,
}

impl StoredRecipe {
    fn links(&self, kind: AttributeKind) -> &BTreeSet<RowId> {
        match kind {
            AttributeKind::Tag => &self.tags,
            AttributeKind::Ingredient => &self.ingredients,
        }
    }

    fn links_mut(&mut self, kind: AttributeKind) -> &mut BTreeSet<RowId> {
        match kind {
            AttributeKind::Tag => &mut self.tags,
            AttributeKind::Ingredient => &mut self.ingredients,
        }
    }
}

struct StoredAttribute {
    user_id: RowId,
    name: String,
}

impl MemoryState {
    fn attributes(&self, kind: AttributeKind) -> &BTreeMap<RowId, StoredAttribute> {
        match kind {
            AttributeKind::Tag => &self.tags,
            AttributeKind::Ingredient => &self.ingredients,
        }
    }

    fn attributes_mut(&mut self, kind: AttributeKind) -> &mut BTreeMap<RowId, StoredAttribute> {
        match kind {
            AttributeKind::Tag => &mut self.tags,
            AttributeKind::Ingredient => &mut self.ingredients,
        }
    }

    fn next_attribute_id(&mut self, kind: AttributeKind) -> RowId {
        let last = match kind {
            AttributeKind::Tag => &mut self.last_tag_id,
            AttributeKind::Ingredient => &mut self.last_ingredient_id,
        };
        *last += 1;
        *last
    }

    fn find_attribute(&self, owner: Owner, kind: AttributeKind, name: &str) -> Option<RowId> {
        self.attributes(kind)
            .iter()
            .find(|(_, a)| a.user_id == owner.id() && a.name == name)
            .map(|(id, _)| *id)
    }

    fn get_or_create_attribute(&mut self, owner: Owner, kind: AttributeKind, name: &str) -> RowId {
        if let Some(id) = self.find_attribute(owner, kind, name) {
            return id;
        }

        let id = self.next_attribute_id(kind);
        self.attributes_mut(kind).insert(
            id,
            StoredAttribute {
                user_id: owner.id(),
                name: name.to_string(),
            },
        );
        id
    }

    fn resolve_names(&mut self, owner: Owner, kind: AttributeKind, names: &[String]) -> BTreeSet<RowId> {
        names
            .iter()
            .map(|name| self.get_or_create_attribute(owner, kind, name))
            .collect()
    }

    fn owned_attribute(&self, owner: Owner, kind: AttributeKind, id: RowId) -> Option<Attribute> {
        self.attributes(kind)
            .get(&id)
            .filter(|a| a.user_id == owner.id())
            .map(|a| Attribute {
                id,
                name: a.name.to_owned(),
            })
    }

    fn detail(&self, owner: Owner, id: RowId) -> Option<RecipeDetail> {
        let stored = self
            .recipes
            .get(&id)
            .filter(|stored| stored.recipe.user_id == owner.id())?;

        let resolve = |kind: AttributeKind| -> Vec<Attribute> {
            stored
                .links(kind)
                .iter()
                .filter_map(|id| self.owned_attribute(owner, kind, *id))
                .collect()
        };

        Some(RecipeDetail {
            recipe: stored.recipe.clone(),
            tags: resolve(AttributeKind::Tag),
            ingredients: resolve(AttributeKind::Ingredient),
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(Error::field("email", "A user with this email already exists."));
        }

        state.last_user_id += 1;
        let user = User {
            id: state.last_user_id,
            email: user.email,
            name: user.name,
            password: user.password,
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user(&self, id: RowId) -> Result<Option<User>, Error> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn list_recipes(&self, owner: Owner, filter: &RecipeFilter) -> Result<Vec<Recipe>, Error> {
        let state = self.state.read().await;

        let matches_kind = |stored: &StoredRecipe, kind: AttributeKind| match filter.ids(kind) {
            Some(ids) => ids.iter().any(|id| stored.links(kind).contains(id)),
            None => true,
        };

        Ok(state
            .recipes
            .values()
            .rev()
            .filter(|stored| stored.recipe.user_id == owner.id())
            .filter(|stored| AttributeKind::ALL.iter().all(|kind| matches_kind(stored, *kind)))
            .map(|stored| stored.recipe.clone())
            .collect())
    }

    async fn get_recipe(&self, owner: Owner, id: RowId) -> Result<Option<RecipeDetail>, Error> {
        let state = self.state.read().await;
        Ok(state.detail(owner, id))
    }

    async fn create_recipe(&self, owner: Owner, recipe: NewRecipe) -> Result<RecipeDetail, Error> {
        let mut state = self.state.write().await;

        let tags = state.resolve_names(owner, AttributeKind::Tag, &recipe.tags);
        let ingredients = state.resolve_names(owner, AttributeKind::Ingredient, &recipe.ingredients);

        state.last_recipe_id += 1;
        let id = state.last_recipe_id;
        state.recipes.insert(
            id,
            StoredRecipe {
                recipe: Recipe {
                    id,
                    user_id: owner.id(),
                    title: recipe.title,
                    time_minutes: recipe.time_minutes,
                    price_cents: recipe.price.cents(),
                    description: recipe.description,
                    link: recipe.link,
                },
                tags,
                ingredients,
            },
        );

        state.detail(owner, id).ok_or(Error::NotFound)
    }

    async fn update_recipe(
        &self,
        owner: Owner,
        id: RowId,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeDetail>, Error> {
        let mut state = self.state.write().await;

        let owned = state
            .recipes
            .get(&id)
            .map(|stored| stored.recipe.user_id == owner.id())
            .unwrap_or(false);
        if !owned {
            return Ok(None);
        }

        let mut links = Vec::new();
        for kind in AttributeKind::ALL {
            if let Some(names) = changes.names(kind) {
                links.push((kind, state.resolve_names(owner, kind, names)));
            }
        }

        let Some(stored) = state.recipes.get_mut(&id) else {
            return Ok(None);
        };
        let recipe = &mut stored.recipe;
        if let Some(title) = changes.title {
            recipe.title = title;
        }
        if let Some(time_minutes) = changes.time_minutes {
            recipe.time_minutes = time_minutes;
        }
        if let Some(price) = changes.price {
            recipe.price_cents = price.cents();
        }
        if let Some(description) = changes.description {
            recipe.description = description;
        }
        if let Some(link) = changes.link {
            recipe.link = link;
        }
        for (kind, ids) in links {
            *stored.links_mut(kind) = ids;
        }

        Ok(state.detail(owner, id))
    }

    async fn delete_recipe(&self, owner: Owner, id: RowId) -> Result<bool, Error> {
        let mut state = self.state.write().await;

        let owned = state
            .recipes
            .get(&id)
            .map(|stored| stored.recipe.user_id == owner.id())
            .unwrap_or(false);
        if owned {
            state.recipes.remove(&id);
        }

        Ok(owned)
    }

    async fn list_attributes(
        &self,
        owner: Owner,
        kind: AttributeKind,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>, Error> {
        let state = self.state.read().await;

        let assigned: BTreeSet<RowId> = state
            .recipes
            .values()
            .filter(|stored| stored.recipe.user_id == owner.id())
            .flat_map(|stored| stored.links(kind).iter().copied())
            .collect();

        let mut rows: Vec<Attribute> = state
            .attributes(kind)
            .iter()
            .filter(|(id, a)| a.user_id == owner.id() && (!assigned_only || assigned.contains(*id)))
            .map(|(id, a)| Attribute {
                id: *id,
                name: a.name.to_owned(),
            })
            .collect();
        rows.sort_by(|a, b| b.name.cmp(&a.name).then(b.id.cmp(&a.id)));

        Ok(rows)
    }

    async fn get_attribute(
        &self,
        owner: Owner,
        kind: AttributeKind,
        id: RowId,
    ) -> Result<Option<Attribute>, Error> {
        let state = self.state.read().await;
        Ok(state.owned_attribute(owner, kind, id))
    }

    async fn rename_attribute(
        &self,
        owner: Owner,
        kind: AttributeKind,
        id: RowId,
        name: String,
    ) -> Result<Option<Attribute>, Error> {
        let mut state = self.state.write().await;

        if state.owned_attribute(owner, kind, id).is_none() {
            return Ok(None);
        }
        if matches!(state.find_attribute(owner, kind, &name), Some(other) if other != id) {
            return Err(Error::field(
                "name",
                &format!("A {} with this name already exists.", kind.label()),
            ));
        }

        if let Some(attribute) = state.attributes_mut(kind).get_mut(&id) {
            attribute.name = name;
        }

        Ok(state.owned_attribute(owner, kind, id))
    }

    async fn delete_attribute(
        &self,
        owner: Owner,
        kind: AttributeKind,
        id: RowId,
    ) -> Result<bool, Error> {
        let mut state = self.state.write().await;

        if state.owned_attribute(owner, kind, id).is_none() {
            return Ok(false);
        }

        state.attributes_mut(kind).remove(&id);
        for stored in state.recipes.values_mut() {
            stored.links_mut(kind).remove(&id);
        }

        Ok(true)
    }
}
