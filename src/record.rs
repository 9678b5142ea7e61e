//! The normalised `(name, surname, email)` triple imported into `users`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{UploadError, UploadResult};
use crate::normalize::{alphabetic_only, format_name};

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

/// Address syntax accepted for import.
///
/// Dot-atom local part (no leading, trailing or doubled dots), then a domain
/// made of at least two hostname labels. Whitespace is never allowed.
fn get_email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$",
        )
        .expect("Invalid email regex")
    })
}

const MAX_LOCAL_PART_LEN: usize = 64;
const MAX_EMAIL_LEN: usize = 254;

/// Check `email` against the address syntax rule used for imports.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, _)) = email.split_once('@') else {
        return false;
    };

    local.len() <= MAX_LOCAL_PART_LEN
        && email.len() <= MAX_EMAIL_LEN
        && get_email_regex().is_match(email)
}

fn has_control_chars(value: &str) -> bool {
    value.chars().any(char::is_control)
}

/// A user row ready for storage.
///
/// Names are capitalised (and optionally reduced to ASCII letters), the email
/// is lowercase and syntactically valid. Only [`Record::build`] creates one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    name: String,
    surname: String,
    email: String,
}

impl Record {
    /// Normalise raw CSV fields and validate them.
    ///
    /// Names may not contain control characters, which quoted CSV fields can
    /// carry. On an invalid name or address the error carries the record's
    /// display form so the caller can report which row was skipped.
    pub fn build(
        raw_name: &str,
        raw_surname: &str,
        raw_email: &str,
        simple_names: bool,
    ) -> UploadResult<Self> {
        let mut name = format_name(raw_name.trim());
        let mut surname = format_name(raw_surname.trim());

        if simple_names {
            name = alphabetic_only(&name);
            surname = alphabetic_only(&surname);
        }

        let record = Self {
            name,
            surname,
            email: raw_email.trim().to_lowercase(),
        };

        if has_control_chars(&record.name) || has_control_chars(&record.surname) {
            return Err(UploadError::InvalidName {
                record: record.to_string(),
            });
        }

        if !is_valid_email(&record.email) {
            return Err(UploadError::InvalidEmail {
                record: record.to_string(),
            });
        }

        Ok(record)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn surname(&self) -> &str {
        &self.surname
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{'{}', '{}', '{}'}}", self.name, self.surname, self.email)
    }
}
