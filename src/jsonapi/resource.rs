use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::document::{Links, Relationship, ResourceIdentifier, ResourceObject};

/// Builds absolute or root-relative links for resources
#[derive(Clone, Debug, Default)]
pub struct LinkBuilder {
    base: String,
}

impl LinkBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn collection(&self, kind: &str) -> String {
        format!("{}/{}", self.base, kind)
    }

    pub fn resource(&self, kind: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base, kind, id)
    }

    pub fn related(&self, kind: &str, id: &str, relationship: &str) -> String {
        format!("{}/{}/{}/{}", self.base, kind, id, relationship)
    }

    pub fn relationship(&self, kind: &str, id: &str, relationship: &str) -> String {
        format!("{}/{}/{}/relationships/{}", self.base, kind, id, relationship)
    }

    /// `links` member of a relationship object
    pub fn relationship_links(&self, kind: &str, id: &str, relationship: &str) -> Links {
        let mut links = Links::new();
        links.insert("self", self.relationship(kind, id, relationship));
        links.insert("related", self.related(kind, id, relationship));
        links
    }
}

/// A model exposed as a JSON:API resource
pub trait Resource {
    const TYPE: &'static str;

    /// Names of the relationships the resource exposes
    const RELATIONSHIPS: &'static [&'static str] = &[];

    fn resource_id(&self) -> String;

    fn attributes(&self) -> Map<String, Value>;

    /// Linkage that is always rendered, regardless of `include`
    fn linkage(&self) -> BTreeMap<&'static str, super::Linkage> {
        BTreeMap::new()
    }

    fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(Self::TYPE, self.resource_id())
    }

    fn to_resource_object(&self, links: &LinkBuilder) -> ResourceObject {
        let id = self.resource_id();
        let mut linkage = self.linkage();

        let relationships = Self::RELATIONSHIPS
            .iter()
            .map(|name| {
                let relationship = Relationship {
                    links: links.relationship_links(Self::TYPE, &id, name),
                    data: linkage.remove(name),
                };
                (*name, relationship)
            })
            .collect();

        let mut self_links = Links::new();
        self_links.insert("self", links.resource(Self::TYPE, &id));

        ResourceObject {
            kind: Self::TYPE,
            id,
            attributes: self.attributes(),
            relationships,
            links: self_links,
        }
    }
}
