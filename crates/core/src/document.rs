use crate::error::ComplianceError;
use serde_json::{Map as JsonMap, Value as Json};
use std::path::Path;
use tracing::debug;

/// Attribute bag of a single resource instance.
pub type Attributes = JsonMap<String, Json>;

/// The `resource` section of a synthesized stack:
/// resource type -> instance name -> attributes.
///
/// Entries that are not objects are kept but never yielded by the iterators,
/// so a malformed instance cannot abort a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceDocument {
    resources: JsonMap<String, Json>,
}

impl ResourceDocument {
    pub fn from_json(doc: Json) -> Result<Self, ComplianceError> {
        let Json::Object(mut top) = doc else {
            return Err(ComplianceError::Shape("top level must be an object".to_string()));
        };
        match top.remove("resource") {
            None | Some(Json::Null) => Ok(Self::default()),
            Some(Json::Object(resources)) => Ok(Self { resources }),
            Some(_) => Err(ComplianceError::Shape("`resource` must be an object".to_string())),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ComplianceError> {
        if !path.exists() {
            return Err(ComplianceError::NotFound { path: path.to_path_buf() });
        }
        let raw = std::fs::read(path)
            .map_err(|source| ComplianceError::Read { path: path.to_path_buf(), source })?;
        let doc: Json = serde_json::from_slice(&raw)
            .map_err(|source| ComplianceError::Parse { path: path.to_path_buf(), source })?;
        Self::from_json(doc)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Instances of one resource type, skipping entries that are not objects.
    pub fn instances<'a>(
        &'a self,
        resource_type: &str,
    ) -> impl Iterator<Item = (&'a str, &'a Attributes)> + 'a {
        let section = match self.resources.get(resource_type) {
            Some(Json::Object(m)) => Some(m),
            Some(_) => {
                debug!(resource_type, "skipping resource type whose instances are not an object");
                None
            }
            None => None,
        };
        section.into_iter().flat_map(|m| m.iter()).filter_map(|(name, attrs)| match attrs {
            Json::Object(a) => Some((name.as_str(), a)),
            _ => {
                debug!(resource = name.as_str(), "skipping non-object resource instance");
                None
            }
        })
    }

    /// Every instance of every type as `(type, name, attributes)`.
    pub fn all_instances(&self) -> impl Iterator<Item = (&str, &str, &Attributes)> {
        self.resource_types()
            .flat_map(move |t| self.instances(t).map(move |(n, a)| (t, n, a)))
    }
}
