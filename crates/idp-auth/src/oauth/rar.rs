//! Rich Authorization Requests (RFC 9396).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of `authorization_details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationDetail {
    /// The `type` member.
    #[serde(rename = "type")]
    pub detail_type: String,

    /// Every other member, as sent.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// The `authorization_details` parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorizationDetails(Vec<AuthorizationDetail>);

impl AuthorizationDetails {
    /// Parses the parameter value.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the value is not an array of
    /// objects that each carry a string `type`.
    pub fn parse(value: &Value) -> Result<Self, String> {
        let Value::Array(entries) = value else {
            return Err("authorization_details must be a JSON array".to_string());
        };

        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let Value::Object(object) = entry else {
                    return Err(format!("authorization_details[{index}] must be an object"));
                };
                let detail_type = object
                    .get("type")
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| format!("authorization_details[{index}] is missing type"))?;
                let mut fields = object.clone();
                fields.remove("type");
                Ok(AuthorizationDetail {
                    detail_type: detail_type.to_string(),
                    fields,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Distinct `type` values in request order.
    #[must_use]
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for detail in &self.0 {
            if !types.contains(&detail.detail_type.as_str()) {
                types.push(&detail.detail_type);
            }
        }
        types
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuthorizationDetail> {
        self.0.iter()
    }

    /// Appends the entries of `other`.
    pub fn extend(&mut self, other: AuthorizationDetails) {
        self.0.extend(other.0);
    }
}
