//! Typed field access over a metadata object with path-aware errors.

use super::{Link, ValidationError, ValidationErrorKind};
use crate::calendar::WorldDate;
use serde_json::{Map, Value};

/// View over one metadata object; `prefix` is its dotted path.
pub(crate) struct Fields<'a> {
    object: &'a Map<String, Value>,
    prefix: String,
}

type FieldResult<T> = Result<T, ValidationError>;

impl<'a> Fields<'a> {
    pub(crate) fn root(value: &'a Value) -> FieldResult<Self> {
        match value {
            Value::Object(object) => Ok(Self {
                object,
                prefix: String::new(),
            }),
            Value::Null => Err(ValidationError::unreadable()),
            _ => Err(ValidationError::new("", ValidationErrorKind::NotAnObject)),
        }
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.prefix)
        }
    }

    fn error(&self, key: &str, kind: ValidationErrorKind) -> ValidationError {
        ValidationError::new(self.path(key), kind)
    }

    /// Null is treated the same as an absent key.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|value| !value.is_null())
    }

    pub(crate) fn raw(&self, key: &str) -> Option<&'a Value> {
        self.get(key)
    }

    pub(crate) fn optional_number(&self, key: &str) -> FieldResult<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .filter(|number| number.is_finite())
                .map(Some)
                .ok_or_else(|| {
                    self.error(key, ValidationErrorKind::WrongType { expected: "a number" })
                }),
        }
    }

    pub(crate) fn required_number(&self, key: &str) -> FieldResult<f64> {
        self.optional_number(key)?
            .ok_or_else(|| self.error(key, ValidationErrorKind::Missing))
    }

    /// Checks `value` against the inclusive range `[min, max]`.
    pub(crate) fn in_range(&self, key: &str, value: f64, min: f64, max: f64) -> FieldResult<f64> {
        if value < min || value > max {
            return Err(self.error(
                key,
                ValidationErrorKind::OutOfRange {
                    min,
                    max,
                    found: value,
                },
            ));
        }
        Ok(value)
    }

    pub(crate) fn optional_string(&self, key: &str) -> FieldResult<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.trim().to_string())),
            Some(_) => Err(self.error(
                key,
                ValidationErrorKind::WrongType {
                    expected: "a string",
                },
            )),
        }
    }

    pub(crate) fn required_string(&self, key: &str) -> FieldResult<String> {
        self.optional_string(key)?
            .ok_or_else(|| self.error(key, ValidationErrorKind::Missing))
    }

    pub(crate) fn optional_date(&self, key: &str) -> FieldResult<Option<WorldDate>> {
        let Some(text) = self.optional_string(key)? else {
            return Ok(None);
        };
        text.parse::<WorldDate>()
            .map(Some)
            .map_err(|_| self.error(key, ValidationErrorKind::InvalidDate(text)))
    }

    pub(crate) fn optional_link(&self, key: &str) -> FieldResult<Option<Link>> {
        let Some(text) = self.optional_string(key)? else {
            return Ok(None);
        };
        Link::parse(&text)
            .map(Some)
            .ok_or_else(|| self.error(key, ValidationErrorKind::InvalidLink(text)))
    }

    pub(crate) fn required_link(&self, key: &str) -> FieldResult<Link> {
        self.optional_link(key)?
            .ok_or_else(|| self.error(key, ValidationErrorKind::Missing))
    }

    fn optional_array(&self, key: &str) -> FieldResult<&'a [Value]> {
        match self.get(key) {
            None => Ok(&[]),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(_) => Err(self.error(key, ValidationErrorKind::WrongType { expected: "a list" })),
        }
    }

    /// Non-blank strings of a list, each paired with its index in the
    /// authored array.
    fn indexed_strings(&self, key: &str) -> FieldResult<Vec<(usize, String)>> {
        let items = self.optional_array(key)?;
        let mut values = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            match item {
                Value::String(text) if !text.trim().is_empty() => {
                    values.push((idx, text.trim().to_string()))
                }
                Value::String(_) => {}
                _ => {
                    return Err(self.error(
                        &format!("{key}[{idx}]"),
                        ValidationErrorKind::WrongType { expected: "a string" },
                    ))
                }
            }
        }
        Ok(values)
    }

    pub(crate) fn string_list(&self, key: &str) -> FieldResult<Vec<String>> {
        Ok(self
            .indexed_strings(key)?
            .into_iter()
            .map(|(_, text)| text)
            .collect())
    }

    pub(crate) fn link_list(&self, key: &str) -> FieldResult<Vec<Link>> {
        self.indexed_strings(key)?
            .into_iter()
            .map(|(idx, text)| {
                Link::parse(&text).ok_or_else(|| {
                    self.error(&format!("{key}[{idx}]"), ValidationErrorKind::InvalidLink(text))
                })
            })
            .collect()
    }

    pub(crate) fn optional_object(&self, key: &str) -> FieldResult<Option<Fields<'a>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Object(object)) => Ok(Some(Fields {
                object,
                prefix: self.path(key),
            })),
            Some(_) => Err(self.error(key, ValidationErrorKind::NotAnObject)),
        }
    }

    pub(crate) fn required_object(&self, key: &str) -> FieldResult<Fields<'a>> {
        self.optional_object(key)?
            .ok_or_else(|| self.error(key, ValidationErrorKind::Missing))
    }

    pub(crate) fn object_list(&self, key: &str) -> FieldResult<Vec<Fields<'a>>> {
        self.optional_array(key)?
            .iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(object) => Ok(Fields {
                    object,
                    prefix: self.path(&format!("{key}[{idx}]")),
                }),
                _ => Err(self.error(&format!("{key}[{idx}]"), ValidationErrorKind::NotAnObject)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Fields;
    use crate::schema::ValidationErrorKind;
    use serde_json::json;

    #[test]
    fn nested_errors_carry_dotted_paths() {
        let raw = json!({"geography": {"territories": [{"name": 3}]}});
        let root = Fields::root(&raw).unwrap();
        let geography = root.required_object("geography").unwrap();
        let territories = geography.object_list("territories").unwrap();
        let err = territories[0].required_string("name").unwrap_err();
        assert_eq!(err.field, "geography.territories[0].name");
        assert_eq!(
            err.kind,
            ValidationErrorKind::WrongType {
                expected: "a string"
            }
        );
    }

    #[test]
    fn null_counts_as_absent() {
        let raw = json!({"mana": null});
        let root = Fields::root(&raw).unwrap();
        assert_eq!(root.optional_number("mana").unwrap(), None);
        assert_eq!(
            root.required_number("mana").unwrap_err().kind,
            ValidationErrorKind::Missing
        );
    }

    #[test]
    fn link_list_reports_offending_index() {
        let raw = json!({"characters": ["[[Ana]]", "Bob"]});
        let err = Fields::root(&raw)
            .unwrap()
            .link_list("characters")
            .unwrap_err();
        assert_eq!(err.field, "characters[1]");
    }

    #[test]
    fn link_list_index_counts_skipped_blank_entries() {
        let raw = json!({"characters": ["", "[[Ana]]", "  ", "Bob"]});
        let err = Fields::root(&raw)
            .unwrap()
            .link_list("characters")
            .unwrap_err();
        assert_eq!(err.field, "characters[3]");
        assert_eq!(err.kind, ValidationErrorKind::InvalidLink("Bob".to_string()));
    }
}
