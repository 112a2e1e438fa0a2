//! The catalog of launchable templates.
//!
//! The catalog is built once at startup and is read-only afterwards, so it is shared between
//! request handlers without any synchronization.
//!
//! Resolution never fails: an id that matches no entry (including an empty or omitted id)
//! resolves to the first registered template. The fallback is logged so that a mistyped
//! template id is visible in the server log even though the launch succeeds.

use std::path::Path;

use getset::Getters;
use serde::{Deserialize, Serialize};

use crate::{TenantboxError, TenantboxResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A launchable application image together with the port it serves on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Template {
    /// Stable identifier used in launch requests.
    id: String,

    /// Human readable name.
    name: String,

    /// Short description shown to users.
    description: String,

    /// Image reference in the runtime's local image store.
    image: String,

    /// Port the application listens on inside the container.
    port: String,
}

/// The fixed, ordered set of templates.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Template {
    /// Creates a new template.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        image: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            image: image.into(),
            port: port.into(),
        }
    }
}

impl TemplateCatalog {
    /// Creates a catalog from an ordered list of templates.
    ///
    /// The first template becomes the fallback for unknown ids, so the list must not be empty.
    /// Duplicate ids and unusable ports are rejected.
    pub fn new(templates: Vec<Template>) -> TenantboxResult<Self> {
        if templates.is_empty() {
            return Err(TenantboxError::InvalidCatalog(
                "at least one template is required".to_string(),
            ));
        }

        for (i, template) in templates.iter().enumerate() {
            if template.id.is_empty() {
                return Err(TenantboxError::InvalidCatalog(format!(
                    "template #{} has an empty id",
                    i + 1
                )));
            }

            if template.port.parse::<u16>().map_or(true, |p| p == 0) {
                return Err(TenantboxError::InvalidCatalog(format!(
                    "template '{}' has an invalid port '{}'",
                    template.id, template.port
                )));
            }

            if templates[..i].iter().any(|t| t.id == template.id) {
                return Err(TenantboxError::InvalidCatalog(format!(
                    "template id '{}' is registered twice",
                    template.id
                )));
            }
        }

        Ok(Self { templates })
    }

    /// The templates shipped with tenantbox.
    pub fn builtin() -> Self {
        Self {
            templates: vec![
                Template::new(
                    "app_template",
                    "Basic Web App",
                    "A simple web application with health monitoring",
                    "app_template:latest",
                    "8081",
                ),
                Template::new(
                    "note_template",
                    "Notes App",
                    "A note-taking application with CRUD operations",
                    "note_template:latest",
                    "8081",
                ),
            ],
        }
    }

    /// Loads a catalog from a YAML file holding a sequence of templates.
    pub async fn from_yaml_file(path: impl AsRef<Path>) -> TenantboxResult<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let templates: Vec<Template> = serde_yaml::from_str(&content)?;
        Self::new(templates)
    }

    /// Returns the templates in registration order.
    pub fn list(&self) -> &[Template] {
        &self.templates
    }

    /// Returns the template with the given id, or the first template if there is none.
    pub fn resolve(&self, id: Option<&str>) -> &Template {
        let fallback = &self.templates[0];
        match id {
            Some(id) => match self.templates.iter().find(|t| t.id == id) {
                Some(template) => template,
                None => {
                    tracing::warn!(
                        "unknown template '{}', falling back to '{}'",
                        id,
                        fallback.id
                    );
                    fallback
                }
            },
            None => {
                tracing::debug!("no template requested, using '{}'", fallback.id);
                fallback
            }
        }
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_order() {
        let catalog = TemplateCatalog::builtin();
        let ids: Vec<_> = catalog.list().iter().map(|t| t.get_id().as_str()).collect();
        assert_eq!(ids, vec!["app_template", "note_template"]);
    }

    #[test]
    fn test_resolve_exact_match() {
        let catalog = TemplateCatalog::builtin();
        assert_eq!(catalog.resolve(Some("note_template")).get_name(), "Notes App");
    }

    #[test]
    fn test_resolve_unknown_id_falls_back_to_first() {
        let catalog = TemplateCatalog::builtin();
        assert_eq!(
            catalog.resolve(Some("does-not-exist")).get_id(),
            "app_template"
        );
        assert_eq!(catalog.resolve(Some("")).get_id(), "app_template");
        assert_eq!(catalog.resolve(None).get_id(), "app_template");
    }

    #[test]
    fn test_new_rejects_empty_and_duplicates() {
        assert!(TemplateCatalog::new(vec![]).is_err());

        let dup = Template::new("a", "A", "", "a:latest", "80");
        assert!(TemplateCatalog::new(vec![dup.clone(), dup]).is_err());

        let bad_port = Template::new("a", "A", "", "a:latest", "http");
        assert!(TemplateCatalog::new(vec![bad_port]).is_err());
    }

    #[tokio::test]
    async fn test_from_yaml_file() -> TenantboxResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("templates.yaml");
        tokio::fs::write(
            &path,
            r#"
- id: blog
  name: Blog
  description: A static blog
  image: blog:1.2
  port: "3000"
- id: wiki
  name: Wiki
  description: A wiki
  image: wiki:latest
  port: "8080"
"#,
        )
        .await?;

        let catalog = TemplateCatalog::from_yaml_file(&path).await?;
        assert_eq!(catalog.list().len(), 2);
        assert_eq!(catalog.resolve(Some("nope")).get_id(), "blog");
        assert_eq!(catalog.resolve(Some("wiki")).get_port(), "8080");
        Ok(())
    }

    #[tokio::test]
    async fn test_from_yaml_file_rejects_empty_sequence() -> TenantboxResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("templates.yaml");
        tokio::fs::write(&path, "[]\n").await?;

        let result = TemplateCatalog::from_yaml_file(&path).await;
        assert!(matches!(result, Err(TenantboxError::InvalidCatalog(_))));
        Ok(())
    }
}
