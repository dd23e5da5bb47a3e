use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::errors::ServiceError;

/// Top-level and resource-level `links` member
pub type Links = BTreeMap<&'static str, String>;

/// `{"type": ..., "id": ...}` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(kind: &str, id: impl ToString) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }
}

/// Resource linkage carried in a relationship's `data` member
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Linkage {
    ToOne(Option<ResourceIdentifier>),
    ToMany(Vec<ResourceIdentifier>),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Relationship {
    #[serde(skip_serializing_if = "Links::is_empty")]
    pub links: Links,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Linkage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<&'static str, Relationship>,
    #[serde(skip_serializing_if = "Links::is_empty")]
    pub links: Links,
}

impl ResourceObject {
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(self.kind, &self.id)
    }

    /// Attach linkage data to a relationship that already carries links
    pub fn set_linkage(&mut self, relationship: &'static str, linkage: Linkage) {
        self.relationships.entry(relationship).or_default().data = Some(linkage);
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Resource(Box<ResourceObject>),
    Collection(Vec<ResourceObject>),
    Identifier(Option<ResourceIdentifier>),
    Identifiers(Vec<ResourceIdentifier>),
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonApiObject {
    pub version: &'static str,
}

impl Default for JsonApiObject {
    fn default() -> Self {
        Self { version: "1.0" }
    }
}

/// Successful response document
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub data: PrimaryData,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,
    #[serde(skip_serializing_if = "Links::is_empty")]
    pub links: Links,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    pub jsonapi: JsonApiObject,
}

impl Document {
    fn with_data(data: PrimaryData) -> Self {
        Self {
            data,
            included: Vec::new(),
            links: Links::new(),
            meta: None,
            jsonapi: JsonApiObject::default(),
        }
    }

    pub fn resource(resource: ResourceObject) -> Self {
        Self::with_data(PrimaryData::Resource(Box::new(resource)))
    }

    pub fn collection(resources: Vec<ResourceObject>) -> Self {
        Self::with_data(PrimaryData::Collection(resources))
    }

    pub fn identifier(identifier: Option<ResourceIdentifier>) -> Self {
        Self::with_data(PrimaryData::Identifier(identifier))
    }

    pub fn identifiers(identifiers: Vec<ResourceIdentifier>) -> Self {
        Self::with_data(PrimaryData::Identifiers(identifiers))
    }

    pub fn with_self_link(mut self, href: String) -> Self {
        self.links.insert("self", href);
        self
    }

    pub fn with_included(mut self, included: Vec<ResourceObject>) -> Self {
        self.included = included;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl ErrorSource {
    pub fn pointer(pointer: impl Into<String>) -> Self {
        Self {
            pointer: Some(pointer.into()),
            parameter: None,
        }
    }

    pub fn parameter(parameter: impl Into<String>) -> Self {
        Self {
            pointer: None,
            parameter: Some(parameter.into()),
        }
    }
}

/// JSON:API error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    pub status: String,
    pub code: String,
    pub title: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
    pub jsonapi: JsonApiObject,
}

/// Body of a POST or PATCH request
#[derive(Debug, Clone, Deserialize)]
pub struct RequestDocument {
    pub data: RequestResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestResource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: Map<String, Value>,
}

impl RequestResource {
    /// Checks the `type` member against the endpoint's resource type
    pub fn expect_type(&self, kind: &str) -> Result<(), ServiceError> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(ServiceError::Conflict(format!(
                "Resource type '{}' does not match endpoint type '{}'",
                self.kind, kind
            )))
        }
    }

    /// Client-generated ids are not supported
    pub fn expect_no_id(&self) -> Result<(), ServiceError> {
        match &self.id {
            None => Ok(()),
            Some(_) => Err(ServiceError::Forbidden(
                "Client-generated ids are not supported".to_string(),
            )),
        }
    }

    /// PATCH bodies must carry the id of the resource addressed by the URL
    pub fn expect_id(&self, id: &str) -> Result<(), ServiceError> {
        match self.id.as_deref() {
            Some(given) if given == id => Ok(()),
            Some(given) => Err(ServiceError::Conflict(format!(
                "Resource id '{}' does not match URL id '{}'",
                given, id
            ))),
            None => Err(ServiceError::BadRequest(
                "Resource object is missing its id".to_string(),
            )),
        }
    }

    /// Rejects read-only attributes with 422 and unknown ones with 400
    pub fn check_attributes(
        &self,
        writable: &[&str],
        read_only: &[&str],
    ) -> Result<(), ServiceError> {
        for key in self.attributes.keys() {
            if read_only.contains(&key.as_str()) {
                return Err(ServiceError::ReadOnlyAttribute(key.clone()));
            }
            if !writable.contains(&key.as_str()) {
                return Err(ServiceError::BadRequest(format!(
                    "Unknown attribute '{}'",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Rejects relationships that cannot be written through this endpoint
    pub fn check_relationships(&self, writable: &[&str]) -> Result<(), ServiceError> {
        match self
            .relationships
            .keys()
            .find(|key| !writable.contains(&key.as_str()))
        {
            Some(key) => Err(ServiceError::BadRequest(format!(
                "Relationship '{}' cannot be written",
                key
            ))),
            None => Ok(()),
        }
    }

    /// Value of a nullable string attribute.
    ///
    /// `None` when the attribute is absent, `Some(None)` for an explicit null.
    pub fn string_attribute(&self, name: &str) -> Result<Option<Option<String>>, ServiceError> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(None)),
            Some(Value::String(value)) => Ok(Some(Some(value.clone()))),
            Some(_) => Err(ServiceError::BadRequest(format!(
                "Attribute '{}' must be a string",
                name
            ))),
        }
    }

    /// Linkage of a to-one relationship.
    ///
    /// `None` when the relationship is absent, `Some(None)` for `{"data": null}`.
    pub fn to_one(&self, name: &str) -> Result<Option<Option<ResourceIdentifier>>, ServiceError> {
        let Some(relationship) = self.relationships.get(name) else {
            return Ok(None);
        };

        let data = relationship.get("data").ok_or_else(|| {
            ServiceError::BadRequest(format!("Relationship '{}' is missing its data member", name))
        })?;

        if data.is_null() {
            return Ok(Some(None));
        }

        serde_json::from_value::<ResourceIdentifier>(data.clone())
            .map(|identifier| Some(Some(identifier)))
            .map_err(|_| {
                ServiceError::BadRequest(format!(
                    "Relationship '{}' must be a single resource identifier",
                    name
                ))
            })
    }
}
