//! Inbound request and outbound response shapes
//!
//! Field names on the wire follow the public contract:
//!
//! ```json
//! { "email": "a@x.com", "phoneNumber": "100" }
//! ```
//!
//! ```json
//! {
//!   "contact": {
//!     "primaryContactId": 1,
//!     "emails": ["a@x.com"],
//!     "phoneNumbers": ["100"],
//!     "secondaryContactIds": []
//!   }
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LinkageError, LinkageResult};
use crate::types::ContactId;

/// An identification request
///
/// Empty strings are treated as absent. `phoneNumber` is also accepted as a
/// JSON number and kept as its decimal text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyRequest {
    /// Email address, if provided
    #[serde(default, deserialize_with = "deserialize_text")]
    pub email: Option<String>,
    /// Phone number, if provided
    #[serde(
        rename = "phoneNumber",
        default,
        deserialize_with = "deserialize_phone"
    )]
    pub phone_number: Option<String>,
}

impl IdentifyRequest {
    /// Build a request from optional parts
    pub fn new(email: Option<&str>, phone_number: Option<&str>) -> Self {
        Self {
            email: non_empty(email.map(String::from)),
            phone_number: non_empty(phone_number.map(String::from)),
        }
    }

    /// Email as a borrowed str
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Phone number as a borrowed str
    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    /// Reject requests that carry neither an email nor a phone number
    pub fn validate(&self) -> LinkageResult<()> {
        if self.email.is_none() && self.phone_number.is_none() {
            return Err(LinkageError::invalid_request(
                "email or phoneNumber is required",
            ));
        }
        Ok(())
    }
}

/// Unified view of one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    /// Id of the canonical primary
    pub primary_contact_id: ContactId,
    /// Primary's email first, then others by contact seniority
    pub emails: Vec<String>,
    /// Primary's phone first, then others by contact seniority
    pub phone_numbers: Vec<String>,
    /// Ids of every secondary, ascending
    pub secondary_contact_ids: Vec<ContactId>,
}

/// Response to an identification request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyResponse {
    /// The resolved identity
    pub contact: IdentityView,
}

impl From<IdentityView> for IdentifyResponse {
    fn from(contact: IdentityView) -> Self {
        Self { contact }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_empty(Option::<String>::deserialize(deserializer)?))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PhoneRepr {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

fn deserialize_phone<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<PhoneRepr>::deserialize(deserializer)?;
    let text = repr.map(|r| match r {
        PhoneRepr::Text(s) => s,
        PhoneRepr::Unsigned(n) => n.to_string(),
        PhoneRepr::Signed(n) => n.to_string(),
        PhoneRepr::Float(n) => n.to_string(),
    });
    Ok(non_empty(text))
}
