//! Sort order for member listings.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    UserId,
    Email,
    FirstName,
    LastName,
}

impl SortField {
    /// Lenient parse: anything unrecognised sorts by last name.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace('_', "").as_str() {
            "userid" | "id" => SortField::UserId,
            "email" => SortField::Email,
            "firstname" => SortField::FirstName,
            "lastname" => SortField::LastName,
            other => {
                tracing::debug!(field = %other, "Unknown sort field, falling back to last name");
                SortField::LastName
            }
        }
    }

    /// Column used when the sort is pushed down to the datastore.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::UserId => "user_id",
            SortField::Email => "email",
            SortField::FirstName => "first_name",
            SortField::LastName => "last_name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => Err(format!("Invalid sort direction: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortBy {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Build from caller-supplied strings. An unknown field falls back to
    /// last name; an unknown direction is rejected.
    pub fn parse(field: &str, direction: &str) -> Result<Self, String> {
        Ok(Self {
            field: SortField::parse_lenient(field),
            direction: direction.parse()?,
        })
    }
}

impl Default for SortBy {
    fn default() -> Self {
        Self::new(SortField::LastName, SortDirection::Asc)
    }
}
