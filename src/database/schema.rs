use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{constants::PRICE_MAX_CENTS, error::TypeError};

pub type RowId = i32;

/// Identity every read and write is scoped to.
///
/// Only built from a verified session or a stored [`User`], so a store call can never be
/// made on behalf of an arbitrary id taken from a request body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Owner(RowId);

impl Owner {
    pub(crate) fn new(user_id: RowId) -> Self {
        Self(user_id)
    }

    pub fn id(&self) -> RowId {
        self.0
    }
}

impl From<&User> for Owner {
    fn from(user: &User) -> Self {
        Self(user.id)
    }
}

/// Fixed-point amount with two decimal places, held as cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: i64,
}

impl Price {
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }
}

impl FromStr for Price {
    type Err = TypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.starts_with('-') {
            return Err(TypeError::new(
                "Ensure this value is greater than or equal to 0.",
            ));
        }

        let value = value.strip_prefix('+').unwrap_or(value);
        let (whole, fraction) = match value.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (value, ""),
        };

        let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction)
        {
            return Err(TypeError::new("A valid number is required."));
        }
        if fraction.len() > 2 {
            return Err(TypeError::new(
                "Ensure that there are no more than 2 decimal places.",
            ));
        }

        let whole = whole.trim_start_matches('0');
        if whole.len() > 3 {
            return Err(TypeError::new(
                "Ensure that there are no more than 5 digits in total.",
            ));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| TypeError::new("A valid number is required."))?
        };
        let fraction: i64 = format!("{fraction:0<2}")
            .parse()
            .map_err(|_| TypeError::new("A valid number is required."))?;

        let cents = whole * 100 + fraction;
        debug_assert!(cents <= PRICE_MAX_CENTS);

        Ok(Self { cents })
    }
}

impl TryFrom<Value> for Price {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(value) => value.parse(),
            Value::Number(value) => value.to_string().parse(),
            _ => Err(TypeError::new("A valid number is required.")),
        }
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Price::try_from(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: RowId,
    pub email: String,
    pub name: String,
    /// argon2 PHC string, never the plain password
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserView {
    pub email: String,
    pub name: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_owned(),
            name: user.name.to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Recipe {
    pub id: RowId,
    pub user_id: RowId,
    pub title: String,
    pub time_minutes: i32,
    pub price_cents: i64,
    pub description: String,
    pub link: String,
}

impl Recipe {
    pub fn price(&self) -> Price {
        Price::from_cents(self.price_cents)
    }
}

/// A tag or an ingredient. Both share the same shape and ownership rules.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct Attribute {
    pub id: RowId,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Tag,
    Ingredient,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 2] = [AttributeKind::Tag, AttributeKind::Ingredient];

    /// Plural name, used as table name, payload key and route segment.
    pub fn plural(&self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }

    pub fn link_table(&self) -> &'static str {
        match self {
            AttributeKind::Tag => "recipe_tags",
            AttributeKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn link_column(&self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag_id",
            AttributeKind::Ingredient => "ingredient_id",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag",
            AttributeKind::Ingredient => "ingredient",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub tags: Vec<Attribute>,
    pub ingredients: Vec<Attribute>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i32,
    pub price: Price,
    pub description: String,
    pub link: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

impl NewRecipe {
    pub fn names(&self, kind: AttributeKind) -> &[String] {
        match kind {
            AttributeKind::Tag => &self.tags,
            AttributeKind::Ingredient => &self.ingredients,
        }
    }
}

/// Partial update. `None` leaves the stored value untouched; `Some(vec![])` on an
/// association clears it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Price>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeChanges {
    pub fn names(&self, kind: AttributeKind) -> Option<&[String]> {
        match kind {
            AttributeKind::Tag => self.tags.as_deref(),
            AttributeKind::Ingredient => self.ingredients.as_deref(),
        }
    }
}

/// Recipe listing filter: OR across ids of one kind, AND between kinds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<RowId>>,
    pub ingredients: Option<Vec<RowId>>,
}

impl RecipeFilter {
    pub fn ids(&self, kind: AttributeKind) -> Option<&[RowId]> {
        match kind {
            AttributeKind::Tag => self.tags.as_deref(),
            AttributeKind::Ingredient => self.ingredients.as_deref(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RecipeListView {
    pub id: RowId,
    pub title: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
}

impl From<&Recipe> for RecipeListView {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title.to_owned(),
            time_minutes: recipe.time_minutes,
            price: recipe.price(),
            link: recipe.link.to_owned(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RecipeDetailView {
    pub id: RowId,
    pub title: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
    pub description: String,
    pub tags: Vec<Attribute>,
    pub ingredients: Vec<Attribute>,
}

impl From<RecipeDetail> for RecipeDetailView {
    fn from(detail: RecipeDetail) -> Self {
        let price = detail.recipe.price();
        Self {
            id: detail.recipe.id,
            title: detail.recipe.title,
            time_minutes: detail.recipe.time_minutes,
            price,
            link: detail.recipe.link,
            description: detail.recipe.description,
            tags: detail.tags,
            ingredients: detail.ingredients,
        }
    }
}
