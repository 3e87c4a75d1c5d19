//! Submitted form normalization and validation.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::models::Record;
use crate::{Error, Result};

/// Fields never stored with a record.
const DISCARDED_FIELDS: [&str; 2] = ["password", "confirm_password"];

/// Normalize a submitted record: trim strings, turn all-digit strings into
/// integers and drop credential fields. Digit strings with a leading zero
/// (phone numbers) stay text.
pub fn normalize_form(form: Record) -> Record {
    form.into_iter()
        .filter(|(key, _)| !DISCARDED_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => {
                    let trimmed = s.trim();
                    match trimmed.parse::<i64>() {
                        Ok(n)
                            if trimmed.bytes().all(|b| b.is_ascii_digit())
                                && (trimmed == "0" || !trimmed.starts_with('0')) =>
                        {
                            Value::from(n)
                        }
                        _ => Value::String(trimmed.to_string()),
                    }
                }
                other => other,
            };
            (key, value)
        })
        .collect()
}

/// Whether `field` is missing, null or blank.
pub fn is_blank(form: &Record, field: &str) -> bool {
    match form.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Reject a form missing any of `required`, naming the first missing field.
pub fn require_fields(form: &Record, required: &[&str]) -> Result<()> {
    if form.is_empty() {
        return Err(Error::Validation("Enter some data to submit".to_string()));
    }
    match required.iter().find(|field| is_blank(form, field)) {
        Some(field) => Err(Error::Validation(format!("{} is required", field))),
        None => Ok(()),
    }
}

/// Prefix match against `local@domain.tld`; trailing text is not checked.
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

/// Upper-case first letters of every word.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_normalize_form() {
        let form = normalize_form(record(json!({
            "name": "  Solar lamp ",
            "user_id": "12",
            "phone": "0772",
            "code": "-3",
            "price": 4.5,
            "password": "secret",
            "confirm_password": "secret"
        })));

        assert_eq!(form["name"], "Solar lamp");
        assert_eq!(form["user_id"], 12);
        assert_eq!(form["phone"], "0772");
        assert_eq!(form["code"], "-3");
        assert_eq!(form["price"], 4.5);
        assert!(!form.contains_key("password"));
        assert!(!form.contains_key("confirm_password"));
    }

    #[test]
    fn test_require_fields() {
        let form = record(json!({"name": "x", "user_id": " "}));
        let err = require_fields(&form, &["name", "user_id"]).unwrap_err();
        assert_eq!(err.detail(), "user_id is required");

        assert!(require_fields(&form, &["name"]).is_ok());
        assert!(matches!(
            require_fields(&Record::new(), &[]),
            Err(Error::Validation(_))
        ));
    }

    #[rstest]
    #[case("jane@example.org", true)]
    #[case("jane@example", false)]
    #[case("@example.org", false)]
    #[case("jane.example.org", false)]
    #[case("a@b.c@d", true)]
    #[case("jane@example.org trailing", true)]
    #[case("jane@@example.org", false)]
    #[case("", false)]
    fn test_is_valid_email(#[case] email: &str, #[case] expected: bool) {
        assert_eq!(is_valid_email(email), expected);
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("mujabi john paul"), "MJP");
        assert_eq!(initials(""), "");
    }
}
