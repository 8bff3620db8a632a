//! Normalized member identity, built once per run from the intercepted
//! profile payload and never mutated afterward.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub postcode: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub email: String,
    pub social_security_number: String,
    pub birth_date: NaiveDate,
    pub given_name: String,
    pub family_name: String,
    pub address: Vec<Address>,
}
