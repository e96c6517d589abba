//! RBAC document parser
//!
//! Reads the XML form of an RBAC configuration into [`RbacConfig`] and writes
//! it back out. The document shape is:
//!
//! ```xml
//! <rbac-config>
//!   <metadata>
//!     <name>Coffee Platform</name>
//!     <version>1.0.0</version>
//!     <description>...</description>
//!   </metadata>
//!   <roles>
//!     <role id="farmers" name="Farmers" connection-type="pink">
//!       <feature id="profile" name="Profile" access-level="full"/>
//!     </role>
//!   </roles>
//!   <feature-catalog>
//!     <feature id="profile" name="Profile" category="core" description="..."/>
//!   </feature-catalog>
//!   <access-levels>
//!     <level id="full" name="Full Access"/>
//!   </access-levels>
//!   <categories>
//!     <category id="core" name="Core"/>
//!   </categories>
//!   <connection-types>
//!     <connection-type id="pink" name="Pink"/>
//!   </connection-types>
//! </rbac-config>
//! ```
//!
//! Structural problems (empty input, broken XML, wrong root, a missing
//! section) are errors. Bad enum values on individual entities are not: they
//! are replaced with safe defaults and reported as [`ParseWarning`]s.

use crate::config::types::{
    AccessLevel, AccessLevelDefinition, Category, ConnectionType, ConnectionTypeDefinition,
    Feature, Metadata, RbacConfig, Role, RoleFeature,
};
use crate::error::{ParseError, ParseResult};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Name of the document's root element
pub const ROOT_ELEMENT: &str = "rbac-config";

/// Category assigned to catalog features that do not declare one
pub const DEFAULT_CATEGORY: &str = "core";

/// Required top-level sections, in document order
pub const REQUIRED_SECTIONS: &[&str] = &[
    "metadata",
    "roles",
    "feature-catalog",
    "access-levels",
    "categories",
    "connection-types",
];

/// A value the parser replaced with a default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// Entity that carried the value, e.g. `role 'farmers'`
    pub entity: String,
    /// Attribute name as written in the document
    pub field: &'static str,
    /// The rejected value, `None` when the attribute was absent
    pub value: Option<String>,
    /// The default used instead
    pub substituted: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(
                f,
                "{}: {} '{}' is not recognised, using '{}'",
                self.entity, self.field, value, self.substituted
            ),
            None => write!(
                f,
                "{}: {} is missing, using '{}'",
                self.entity, self.field, self.substituted
            ),
        }
    }
}

/// A parsed configuration together with the coercions applied to it
#[derive(Debug, Clone)]
pub struct Parsed {
    pub config: RbacConfig,
    pub warnings: Vec<ParseWarning>,
}

/// Parse an RBAC document, logging and discarding coercion warnings
pub fn parse(raw: &str) -> ParseResult<RbacConfig> {
    let parsed = parse_with_warnings(raw)?;
    for warning in &parsed.warnings {
        warn!(%warning, "RBAC value coerced to default");
    }
    Ok(parsed.config)
}

/// Parse an RBAC document from raw bytes (must be UTF-8)
pub fn parse_bytes(raw: &[u8]) -> ParseResult<RbacConfig> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| ParseError::Malformed(format!("invalid UTF-8: {}", e)))?;
    parse(text)
}

/// Parse an RBAC document and return every coercion applied
pub fn parse_with_warnings(raw: &str) -> ParseResult<Parsed> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    check_document(raw)?;

    let doc: RawDocument =
        quick_xml::de::from_str(raw).map_err(|e| ParseError::Shape(e.to_string()))?;

    let mut warnings = Vec::new();

    let metadata = doc.metadata.ok_or(ParseError::MissingSection {
        section: "metadata",
    })?;
    let roles = doc
        .roles
        .ok_or(ParseError::MissingSection { section: "roles" })?;
    let catalog = doc.feature_catalog.ok_or(ParseError::MissingSection {
        section: "feature-catalog",
    })?;
    let access_levels = doc.access_levels.ok_or(ParseError::MissingSection {
        section: "access-levels",
    })?;
    let categories = doc.categories.ok_or(ParseError::MissingSection {
        section: "categories",
    })?;
    let connection_types = doc.connection_types.ok_or(ParseError::MissingSection {
        section: "connection-types",
    })?;

    let config = RbacConfig {
        metadata: Metadata {
            name: metadata.name.unwrap_or_default(),
            version: metadata.version.unwrap_or_default(),
            description: metadata.description.unwrap_or_default(),
        },
        roles: roles
            .roles
            .into_iter()
            .map(|role| convert_role(role, &mut warnings))
            .collect(),
        features: catalog
            .features
            .into_iter()
            .map(|feature| convert_feature(feature, &mut warnings))
            .collect(),
        access_levels: access_levels
            .levels
            .into_iter()
            .map(|d| AccessLevelDefinition {
                id: d.id.unwrap_or_default(),
                name: d.name.unwrap_or_default(),
                description: d.description,
            })
            .collect(),
        categories: categories
            .categories
            .into_iter()
            .map(|d| Category {
                id: d.id.unwrap_or_default(),
                name: d.name.unwrap_or_default(),
                description: d.description,
            })
            .collect(),
        connection_types: connection_types
            .connection_types
            .into_iter()
            .map(|d| ConnectionTypeDefinition {
                id: d.id.unwrap_or_default(),
                name: d.name.unwrap_or_default(),
                description: d.description,
            })
            .collect(),
    };

    debug!(
        roles = config.roles.len(),
        features = config.features.len(),
        warnings = warnings.len(),
        "Parsed RBAC document"
    );

    Ok(Parsed { config, warnings })
}

/// Serialize a configuration back into the document format [`parse`] reads
pub fn to_xml(config: &RbacConfig) -> ParseResult<String> {
    let doc = RawDocument::from(config);
    let body = quick_xml::se::to_string_with_root(ROOT_ELEMENT, &doc)
        .map_err(|e| ParseError::Shape(e.to_string()))?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n", body))
}

/// Check well-formedness and the root element before deserializing
fn check_document(raw: &str) -> ParseResult<()> {
    let mut reader = Reader::from_str(raw);
    let mut root: Option<String> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if root.is_some() && depth == 0 {
                    return Err(ParseError::Malformed(
                        "multiple root elements".to_string(),
                    ));
                }
                if root.is_none() {
                    root = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if root.is_some() && depth == 0 {
                    return Err(ParseError::Malformed(
                        "multiple root elements".to_string(),
                    ));
                }
                if root.is_none() {
                    root = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                }
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Text(e)) if depth == 0 && !e.iter().all(u8::is_ascii_whitespace) => {
                return Err(ParseError::Malformed(
                    "text outside the root element".to_string(),
                ));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ParseError::Malformed(format!(
                    "{} (at byte {})",
                    e,
                    reader.buffer_position()
                )));
            }
        }
    }

    if depth != 0 {
        return Err(ParseError::Malformed(
            "document ended inside an open element".to_string(),
        ));
    }

    match root {
        None => Err(ParseError::Malformed("no root element".to_string())),
        Some(found) if found != ROOT_ELEMENT => Err(ParseError::UnexpectedRoot { found }),
        Some(_) => Ok(()),
    }
}

fn convert_role(raw: RawRole, warnings: &mut Vec<ParseWarning>) -> Role {
    let id = raw.id.unwrap_or_default();
    let entity = format!("role '{}'", id);

    let connection_type = match raw.connection_type.as_deref().map(str::trim) {
        Some(value) => ConnectionType::try_parse(value).unwrap_or_else(|| {
            warnings.push(ParseWarning {
                entity: entity.clone(),
                field: "connection-type",
                value: Some(value.to_string()),
                substituted: ConnectionType::default().to_string(),
            });
            ConnectionType::default()
        }),
        None => {
            warnings.push(ParseWarning {
                entity: entity.clone(),
                field: "connection-type",
                value: None,
                substituted: ConnectionType::default().to_string(),
            });
            ConnectionType::default()
        }
    };

    let features = raw
        .features
        .into_iter()
        .map(|feature| {
            let feature_id = feature.id.unwrap_or_default();
            let access_level = match feature.access_level.as_deref().map(str::trim) {
                Some(value) => AccessLevel::try_parse(value).unwrap_or_else(|| {
                    warnings.push(ParseWarning {
                        entity: format!("{} feature '{}'", entity, feature_id),
                        field: "access-level",
                        value: Some(value.to_string()),
                        substituted: AccessLevel::No.to_string(),
                    });
                    AccessLevel::No
                }),
                None => {
                    warnings.push(ParseWarning {
                        entity: format!("{} feature '{}'", entity, feature_id),
                        field: "access-level",
                        value: None,
                        substituted: AccessLevel::No.to_string(),
                    });
                    AccessLevel::No
                }
            };

            RoleFeature {
                id: feature_id,
                name: feature.name.unwrap_or_default(),
                access_level,
                description: feature.description,
            }
        })
        .collect();

    Role {
        id,
        name: raw.name.unwrap_or_default(),
        connection_type,
        features,
    }
}

fn convert_feature(raw: RawFeature, warnings: &mut Vec<ParseWarning>) -> Feature {
    let id = raw.id.unwrap_or_default();
    let category = match raw.category {
        Some(category) if !category.trim().is_empty() => category,
        blank => {
            warnings.push(ParseWarning {
                entity: format!("catalog feature '{}'", id),
                field: "category",
                value: blank,
                substituted: DEFAULT_CATEGORY.to_string(),
            });
            DEFAULT_CATEGORY.to_string()
        }
    };

    Feature {
        id,
        name: raw.name.unwrap_or_default(),
        category,
        description: raw.description,
    }
}

// Wire representation. Every field is optional so that the conversion above
// decides what is fatal and what is defaulted. Attribute fields must precede
// element fields for the serializer.

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<RawMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    roles: Option<RawRoles>,
    #[serde(rename = "feature-catalog", skip_serializing_if = "Option::is_none")]
    feature_catalog: Option<RawFeatureCatalog>,
    #[serde(rename = "access-levels", skip_serializing_if = "Option::is_none")]
    access_levels: Option<RawAccessLevels>,
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<RawCategories>,
    #[serde(rename = "connection-types", skip_serializing_if = "Option::is_none")]
    connection_types: Option<RawConnectionTypes>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawRoles {
    #[serde(rename = "role", default)]
    roles: Vec<RawRole>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawRole {
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "@name", skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "@connection-type", skip_serializing_if = "Option::is_none")]
    connection_type: Option<String>,
    #[serde(rename = "feature", default)]
    features: Vec<RawRoleFeature>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawRoleFeature {
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "@name", skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "@access-level", skip_serializing_if = "Option::is_none")]
    access_level: Option<String>,
    #[serde(rename = "@description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawFeatureCatalog {
    #[serde(rename = "feature", default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawFeature {
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "@name", skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "@category", skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(rename = "@description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawAccessLevels {
    #[serde(rename = "level", default)]
    levels: Vec<RawDefinition>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawCategories {
    #[serde(rename = "category", default)]
    categories: Vec<RawDefinition>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConnectionTypes {
    #[serde(rename = "connection-type", default)]
    connection_types: Vec<RawDefinition>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawDefinition {
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "@name", skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "@description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl From<&RbacConfig> for RawDocument {
    fn from(config: &RbacConfig) -> Self {
        fn definition(id: &str, name: &str, description: &Option<String>) -> RawDefinition {
            RawDefinition {
                id: Some(id.to_string()),
                name: Some(name.to_string()),
                description: description.clone(),
            }
        }

        RawDocument {
            metadata: Some(RawMetadata {
                name: Some(config.metadata.name.clone()),
                version: Some(config.metadata.version.clone()),
                description: Some(config.metadata.description.clone()),
            }),
            roles: Some(RawRoles {
                roles: config
                    .roles
                    .iter()
                    .map(|role| RawRole {
                        id: Some(role.id.clone()),
                        name: Some(role.name.clone()),
                        connection_type: Some(role.connection_type.to_string()),
                        features: role
                            .features
                            .iter()
                            .map(|f| RawRoleFeature {
                                id: Some(f.id.clone()),
                                name: Some(f.name.clone()),
                                access_level: Some(f.access_level.to_string()),
                                description: f.description.clone(),
                            })
                            .collect(),
                    })
                    .collect(),
            }),
            feature_catalog: Some(RawFeatureCatalog {
                features: config
                    .features
                    .iter()
                    .map(|f| RawFeature {
                        id: Some(f.id.clone()),
                        name: Some(f.name.clone()),
                        category: Some(f.category.clone()),
                        description: f.description.clone(),
                    })
                    .collect(),
            }),
            access_levels: Some(RawAccessLevels {
                levels: config
                    .access_levels
                    .iter()
                    .map(|d| definition(&d.id, &d.name, &d.description))
                    .collect(),
            }),
            categories: Some(RawCategories {
                categories: config
                    .categories
                    .iter()
                    .map(|d| definition(&d.id, &d.name, &d.description))
                    .collect(),
            }),
            connection_types: Some(RawConnectionTypes {
                connection_types: config
                    .connection_types
                    .iter()
                    .map(|d| definition(&d.id, &d.name, &d.description))
                    .collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
<rbac-config>
  <metadata>
    <name>Test</name>
    <version>1.0.0</version>
    <description>Minimal document</description>
  </metadata>
  <roles>
    <role id="farmers" name="Farmers" connection-type="pink">
      <feature id="profile" name="Profile" access-level="full"/>
    </role>
  </roles>
  <feature-catalog>
    <feature id="profile" name="Profile" category="core"/>
  </feature-catalog>
  <access-levels>
    <level id="full" name="Full Access"/>
  </access-levels>
  <categories>
    <category id="core" name="Core"/>
  </categories>
  <connection-types>
    <connection-type id="pink" name="Pink"/>
  </connection-types>
</rbac-config>
"#;

    #[test]
    fn test_parse_minimal() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.metadata.name, "Test");
        assert_eq!(config.roles.len(), 1);
        assert_eq!(config.roles[0].connection_type, ConnectionType::Pink);
        assert_eq!(config.roles[0].features[0].access_level, AccessLevel::Full);
        assert_eq!(config.features[0].category, "core");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse("").unwrap_err(), ParseError::Empty);
        assert_eq!(parse("  \n\t ").unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn test_mismatched_tags_are_malformed() {
        let result = parse("<rbac-config><roles></rbac-config>");
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_unclosed_root_is_malformed() {
        let result = parse("<rbac-config><metadata></metadata>");
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_plain_text_is_malformed() {
        let result = parse("just some text");
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_wrong_root() {
        let result = parse("<config><roles/></config>");
        assert_eq!(
            result.unwrap_err(),
            ParseError::UnexpectedRoot {
                found: "config".to_string()
            }
        );
    }

    #[test]
    fn test_missing_section_named() {
        let doc = MINIMAL.replace(
            r#"<connection-types>
    <connection-type id="pink" name="Pink"/>
  </connection-types>"#,
            "",
        );
        let err = parse(&doc).unwrap_err();
        assert_eq!(err.missing_section(), Some("connection-types"));
    }

    #[test]
    fn test_invalid_access_level_defaults_to_no() {
        let doc = MINIMAL.replace(r#"access-level="full""#, r#"access-level="admin""#);
        let parsed = parse_with_warnings(&doc).unwrap();
        assert_eq!(
            parsed.config.roles[0].features[0].access_level,
            AccessLevel::No
        );
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].field, "access-level");
        assert_eq!(parsed.warnings[0].value.as_deref(), Some("admin"));
        assert_eq!(parsed.warnings[0].substituted, "no");
    }

    #[test]
    fn test_missing_connection_type_defaults_to_purple() {
        let doc = MINIMAL.replace(r#" connection-type="pink""#, "");
        let parsed = parse_with_warnings(&doc).unwrap();
        assert_eq!(parsed.config.roles[0].connection_type, ConnectionType::Purple);
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].to_string().contains("missing"));
    }

    #[test]
    fn test_missing_category_defaults_to_core() {
        let doc = MINIMAL.replace(
            r#"<feature id="profile" name="Profile" category="core"/>"#,
            r#"<feature id="profile" name="Profile"/>"#,
        );
        let parsed = parse_with_warnings(&doc).unwrap();
        assert_eq!(parsed.config.features[0].category, DEFAULT_CATEGORY);
        assert_eq!(parsed.warnings[0].field, "category");
    }

    #[test]
    fn test_clean_document_has_no_warnings() {
        let parsed = parse_with_warnings(MINIMAL).unwrap();
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_parse_bytes_rejects_invalid_utf8() {
        let result = parse_bytes(&[0xff, 0xfe, 0x00]);
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_to_xml_reparses_identically() {
        let config = parse(MINIMAL).unwrap();
        let xml = to_xml(&config).unwrap();
        assert!(xml.contains("<rbac-config>"));
        assert_eq!(parse(&xml).unwrap(), config);
    }
}
