use std::str::FromStr;

use serde_json::{Map, Value};

use super::{
    error::{Error, FieldErrors, TypeError},
    schema::{AttributeKind, NewRecipe, Price, RecipeChanges, RecipeFilter, RowId},
};
use crate::constants::{MAX_LINK_LENGTH, MAX_NAME_LENGTH, MIN_PASSWORD_LENGTH};

pub type FormData = Map<String, Value>;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";

/// How a recipe payload is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormMode {
    Create,
    /// PUT: required fields must be present, omitted optional ones stay unchanged
    Replace,
    Patch,
}

impl FormMode {
    fn requires(&self) -> bool {
        !matches!(self, FormMode::Patch)
    }
}

/// JSON object being validated. Every getter records its failure instead of returning
/// early so a single response can report all invalid fields.
pub struct Form {
    inner: FormData,
    errors: FieldErrors,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self {
            inner: data,
            errors: FieldErrors::new(),
        }
    }

    pub fn reject(&mut self, key: &str, message: &str) {
        self.errors
            .entry(key.to_string())
            .or_default()
            .push(message.to_string());
    }

    fn present(&mut self, key: &str, required: bool) -> Option<Value> {
        match self.inner.get(key) {
            Some(Value::Null) => {
                self.reject(key, NOT_NULL);
                None
            }
            Some(value) => Some(value.to_owned()),
            None => {
                if required {
                    self.reject(key, REQUIRED);
                }
                None
            }
        }
    }

    pub fn get_value<T>(&mut self, key: &str, required: bool) -> Option<T>
    where
        T: TryFrom<Value, Error = TypeError>,
    {
        let value = self.present(key, required)?;
        match T::try_from(value) {
            Ok(v) => Some(v),
            Err(e) => {
                self.reject(key, e.info());
                None
            }
        }
    }

    /// Integer field. Numeric strings and whole-number floats (`10.0`) are accepted as well.
    pub fn get_number<T>(&mut self, key: &str, required: bool) -> Option<T>
    where
        T: FromStr + PartialOrd + Default,
    {
        let value = self.present(key, required)?;
        let parsed = match &value {
            Value::Number(n) => whole_number(&n.to_string()).parse::<T>().ok(),
            Value::String(s) => whole_number(s.trim()).parse::<T>().ok(),
            _ => None,
        };

        match parsed {
            Some(v) if v < T::default() => {
                self.reject(key, "Ensure this value is greater than or equal to 0.");
                None
            }
            Some(v) => Some(v),
            None => {
                self.reject(key, "A valid integer is required.");
                None
            }
        }
    }

    pub fn get_str(
        &mut self,
        key: &str,
        required: bool,
        allow_blank: bool,
        max_length: usize,
    ) -> Option<String> {
        let value = self.present(key, required)?;
        let Value::String(value) = value else {
            self.reject(key, "Not a valid string.");
            return None;
        };

        let value = value.trim().to_string();
        if let Err(e) = check_str(&value, allow_blank, max_length) {
            self.reject(key, e.info());
            return None;
        }
        Some(value)
    }

    /// List of `{"name": ...}` objects, as used for nested tags and ingredients.
    pub fn get_names(&mut self, key: &str) -> Option<Vec<String>> {
        let value = self.present(key, false)?;
        let Value::Array(entries) = value else {
            self.reject(key, "Expected a list of items.");
            return None;
        };

        let mut names = Vec::with_capacity(entries.len());
        let mut valid = true;
        for (index, entry) in entries.iter().enumerate() {
            match entry.get("name") {
                Some(Value::String(name)) => {
                    let name = name.trim().to_string();
                    match check_str(&name, false, MAX_NAME_LENGTH) {
                        Ok(()) => names.push(name),
                        Err(e) => {
                            self.reject(key, &format!("Item {index}: name: {}", e.info()));
                            valid = false;
                        }
                    }
                }
                Some(_) => {
                    self.reject(key, &format!("Item {index}: name: Not a valid string."));
                    valid = false;
                }
                None => {
                    self.reject(key, &format!("Item {index}: name: {REQUIRED}"));
                    valid = false;
                }
            }
        }

        valid.then_some(names)
    }

    pub fn finish(self) -> Result<(), Error> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self.errors))
        }
    }
}

fn check_str(value: &str, allow_blank: bool, max_length: usize) -> Result<(), TypeError> {
    if !allow_blank && value.is_empty() {
        return Err(TypeError::new(NOT_BLANK));
    }
    if value.chars().count() > max_length {
        return Err(TypeError::new(&format!(
            "Ensure this field has no more than {max_length} characters."
        )));
    }
    Ok(())
}

/// Drops a zero fraction, so `10.0` reads as `10`.
fn whole_number(value: &str) -> &str {
    match value.split_once('.') {
        Some((whole, fraction)) if !whole.is_empty() && fraction.chars().all(|c| c == '0') => whole,
        _ => value,
    }
}

/// Reads the writable recipe fields. Ownership and id keys are never read.
pub fn recipe_changes(data: FormData, mode: FormMode) -> Result<RecipeChanges, Error> {
    let mut form = Form::from_data(data);
    let required = mode.requires();

    let changes = RecipeChanges {
        title: form.get_str("title", required, false, MAX_NAME_LENGTH),
        time_minutes: form.get_number("time_minutes", required),
        price: form.get_value::<Price>("price", required),
        description: form.get_str("description", false, true, usize::MAX),
        link: form.get_str("link", false, true, MAX_LINK_LENGTH),
        tags: form.get_names(AttributeKind::Tag.plural()),
        ingredients: form.get_names(AttributeKind::Ingredient.plural()),
    };

    form.finish()?;
    Ok(changes)
}

pub fn new_recipe(data: FormData) -> Result<NewRecipe, Error> {
    let changes = recipe_changes(data, FormMode::Create)?;

    match (changes.title, changes.time_minutes, changes.price) {
        (Some(title), Some(time_minutes), Some(price)) => Ok(NewRecipe {
            title,
            time_minutes,
            price,
            description: changes.description.unwrap_or_default(),
            link: changes.link.unwrap_or_default(),
            tags: changes.tags.unwrap_or_default(),
            ingredients: changes.ingredients.unwrap_or_default(),
        }),
        _ => Err(Error::Internal(String::from(
            "required recipe fields passed validation but are missing",
        ))),
    }
}

/// Tag/ingredient payload; `name` is the only writable field.
pub fn attribute_name(data: FormData) -> Result<String, Error> {
    let mut form = Form::from_data(data);
    let name = form.get_str("name", true, false, MAX_NAME_LENGTH);
    form.finish()?;

    name.ok_or_else(|| Error::field("name", REQUIRED))
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

/// Lower-cases the domain part; the local part is kept as given.
pub fn normalize_email(email: &str) -> Result<String, TypeError> {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains(' ') => {
            Ok(format!("{local}@{}", domain.to_lowercase()))
        }
        _ => Err(TypeError::new("Enter a valid email address.")),
    }
}

pub fn signup(data: FormData) -> Result<SignupForm, Error> {
    let mut form = Form::from_data(data);
    let email = form.get_str("email", true, false, MAX_NAME_LENGTH);
    let password = form.get_str("password", true, false, usize::MAX);
    let name = form.get_str("name", true, false, MAX_NAME_LENGTH);

    let email = email.and_then(|email| match normalize_email(&email) {
        Ok(email) => Some(email),
        Err(e) => {
            form.reject("email", e.info());
            None
        }
    });
    let password = password.and_then(|password| {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            form.reject(
                "password",
                &format!("Ensure this field has at least {MIN_PASSWORD_LENGTH} characters."),
            );
            None
        } else {
            Some(password)
        }
    });
    form.finish()?;

    match (email, password, name) {
        (Some(email), Some(password), Some(name)) => Ok(SignupForm {
            email,
            password,
            name,
        }),
        _ => Err(Error::Internal(String::from(
            "required user fields passed validation but are missing",
        ))),
    }
}

pub fn credentials(data: FormData) -> Result<CredentialsForm, Error> {
    let mut form = Form::from_data(data);
    let email = form.get_str("email", true, false, MAX_NAME_LENGTH);
    let password = form.get_str("password", true, false, usize::MAX);
    form.finish()?;

    match (email, password) {
        (Some(email), Some(password)) => Ok(CredentialsForm {
            email: normalize_email(&email).unwrap_or(email),
            password,
        }),
        _ => Err(Error::Internal(String::from(
            "credential fields passed validation but are missing",
        ))),
    }
}

/// Comma separated ids from a query string. Blank means "no filter".
pub fn parse_ids(key: &str, raw: Option<&str>) -> Result<Option<Vec<RowId>>, Error> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };

    raw.split(',')
        .map(|id| id.trim().parse::<RowId>())
        .collect::<Result<Vec<RowId>, _>>()
        .map(Some)
        .map_err(|_| Error::field(key, "Expected a comma separated list of ids."))
}

pub fn parse_flag(key: &str, raw: Option<&str>) -> Result<bool, Error> {
    match raw.map(str::trim) {
        None | Some("") | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(_) => Err(Error::field(key, "Expected 0 or 1.")),
    }
}

pub fn recipe_filter(tags: Option<&str>, ingredients: Option<&str>) -> Result<RecipeFilter, Error> {
    let tags = parse_ids(AttributeKind::Tag.plural(), tags);
    let ingredients = parse_ids(AttributeKind::Ingredient.plural(), ingredients);

    match (tags, ingredients) {
        (Ok(tags), Ok(ingredients)) => Ok(RecipeFilter { tags, ingredients }),
        (Err(Error::Validation(mut a)), Err(Error::Validation(b))) => {
            a.extend(b);
            Err(Error::Validation(a))
        }
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}
