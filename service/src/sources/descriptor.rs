//! Immutable per-source configuration: where to fetch, how to authenticate,
//! and how to read the response.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::path::{PathError, PayloadPath};
use super::transport::PreparedRequest;

/// Where a source expects its credential on the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialPlacement {
    /// Sent as a request header named by [`CredentialSpec::name`].
    Header,
    /// Appended as a query parameter named by [`CredentialSpec::name`].
    Query,
}

/// A source's credential requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSpec {
    pub placement: CredentialPlacement,
    pub name: String,
}

impl CredentialSpec {
    #[must_use]
    pub fn header(name: impl Into<String>) -> Self {
        Self {
            placement: CredentialPlacement::Header,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn query(name: impl Into<String>) -> Self {
        Self {
            placement: CredentialPlacement::Query,
            name: name.into(),
        }
    }
}

/// Field names as written in configuration, before parsing.
///
/// Optional fields set to `null` are not read at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapConfig {
    #[serde(default = "default_id")]
    pub id: String,
    #[serde(default = "default_first_name")]
    pub first_name: String,
    #[serde(default = "default_last_name")]
    pub last_name: String,
    #[serde(default = "default_party")]
    pub party: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_contact_url")]
    pub contact_url: Option<String>,
    #[serde(default = "default_phone")]
    pub phone: Option<String>,
    #[serde(default = "default_email")]
    pub email: Option<String>,
}

fn default_id() -> String {
    "id".to_string()
}

fn default_first_name() -> String {
    "first_name".to_string()
}

fn default_last_name() -> String {
    "last_name".to_string()
}

fn default_party() -> String {
    "party".to_string()
}

fn default_region() -> String {
    "state".to_string()
}

#[allow(clippy::unnecessary_wraps)] // serde default for an Option field
fn default_contact_url() -> Option<String> {
    Some("url".to_string())
}

#[allow(clippy::unnecessary_wraps)]
fn default_phone() -> Option<String> {
    Some("phone".to_string())
}

#[allow(clippy::unnecessary_wraps)]
fn default_email() -> Option<String> {
    Some("email".to_string())
}

impl Default for FieldMapConfig {
    fn default() -> Self {
        Self {
            id: default_id(),
            first_name: default_first_name(),
            last_name: default_last_name(),
            party: default_party(),
            region: default_region(),
            contact_url: default_contact_url(),
            phone: default_phone(),
            email: default_email(),
        }
    }
}

/// Where each [`LawmakerRecord`](super::LawmakerRecord) field lives inside
/// one raw record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub id: PayloadPath,
    pub first_name: PayloadPath,
    pub last_name: PayloadPath,
    pub party: PayloadPath,
    pub region: PayloadPath,
    pub contact_url: Option<PayloadPath>,
    pub phone: Option<PayloadPath>,
    pub email: Option<PayloadPath>,
}

impl FieldMap {
    /// Parse every configured field path.
    ///
    /// # Errors
    /// Returns [`DescriptorError::FieldPath`] naming the first field that fails to parse.
    pub fn from_config(config: &FieldMapConfig) -> Result<Self, DescriptorError> {
        let parse = |field: &'static str, text: &str| {
            PayloadPath::parse(text).map_err(|source| DescriptorError::FieldPath { field, source })
        };
        let parse_opt = |field: &'static str, text: Option<&String>| {
            text.map(|t| parse(field, t.as_str())).transpose()
        };

        Ok(Self {
            id: parse("id", config.id.as_str())?,
            first_name: parse("first_name", config.first_name.as_str())?,
            last_name: parse("last_name", config.last_name.as_str())?,
            party: parse("party", config.party.as_str())?,
            region: parse("region", config.region.as_str())?,
            contact_url: parse_opt("contact_url", config.contact_url.as_ref())?,
            phone: parse_opt("phone", config.phone.as_ref())?,
            email: parse_opt("email", config.email.as_ref())?,
        })
    }

    /// Default field map with `region` read from `region_field`.
    ///
    /// # Errors
    /// Returns [`DescriptorError::FieldPath`] if `region_field` is not a valid path.
    pub fn with_region(region_field: &str) -> Result<Self, DescriptorError> {
        let region = PayloadPath::parse(region_field).map_err(|source| {
            DescriptorError::FieldPath {
                field: "region",
                source,
            }
        })?;
        Ok(Self {
            region,
            ..Self::default()
        })
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        let key = |k: &str| PayloadPath::parse(k).unwrap_or_else(|_| PayloadPath::root());
        Self {
            id: key("id"),
            first_name: key("first_name"),
            last_name: key("last_name"),
            party: key("party"),
            region: key("state"),
            contact_url: Some(key("url")),
            phone: Some(key("phone")),
            email: Some(key("email")),
        }
    }
}

/// One source as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Endpoint URL; `{name}` placeholders are filled from `params`.
    pub endpoint_url: String,

    #[serde(default)]
    pub params: BTreeMap<String, String>,

    #[serde(default)]
    pub credential: Option<CredentialSpec>,

    /// Where the record list lives in the response body.
    #[serde(default)]
    pub payload_path: String,

    #[serde(default)]
    pub fields: FieldMapConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("endpoint placeholder '{{{0}}}' has no matching parameter")]
    UnresolvedPlaceholder(String),

    #[error("endpoint template has an unclosed '{{' at position {0}")]
    UnclosedPlaceholder(usize),

    #[error("invalid endpoint url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid payload path: {0}")]
    PayloadPath(#[from] PathError),

    #[error("invalid path for field '{field}': {source}")]
    FieldPath {
        field: &'static str,
        source: PathError,
    },

    #[error("credential name cannot be empty")]
    EmptyCredentialName,
}

/// How to reach and interpret one source.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    name: String,
    endpoint: Url,
    credential: Option<CredentialSpec>,
    payload_path: PayloadPath,
    fields: FieldMap,
}

impl SourceDescriptor {
    /// Build a descriptor with the default field map and no credential.
    ///
    /// # Errors
    /// Returns an error if the URL or payload path is invalid.
    pub fn new(
        name: impl Into<String>,
        endpoint_url: &str,
        payload_path: &str,
    ) -> Result<Self, DescriptorError> {
        Ok(Self {
            name: name.into(),
            endpoint: parse_endpoint(endpoint_url)?,
            credential: None,
            payload_path: PayloadPath::parse(payload_path)?,
            fields: FieldMap::default(),
        })
    }

    /// Build a descriptor from its configuration entry.
    ///
    /// # Errors
    /// Returns an error if the template cannot be filled, the resulting URL is
    /// invalid, any path fails to parse, or the credential name is empty.
    pub fn from_config(name: &str, config: &SourceConfig) -> Result<Self, DescriptorError> {
        let url = fill_template(&config.endpoint_url, &config.params)?;
        let descriptor = Self::new(name, &url, &config.payload_path)?
            .with_fields(FieldMap::from_config(&config.fields)?);

        match &config.credential {
            Some(spec) => descriptor.with_credential(spec.clone()),
            None => Ok(descriptor),
        }
    }

    /// Require a credential, attached as described by `spec`.
    ///
    /// # Errors
    /// Returns [`DescriptorError::EmptyCredentialName`] if `spec.name` is blank.
    pub fn with_credential(mut self, spec: CredentialSpec) -> Result<Self, DescriptorError> {
        if spec.name.trim().is_empty() {
            return Err(DescriptorError::EmptyCredentialName);
        }
        self.credential = Some(spec);
        Ok(self)
    }

    #[must_use]
    pub fn with_fields(mut self, fields: FieldMap) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[must_use]
    pub const fn credential(&self) -> Option<&CredentialSpec> {
        self.credential.as_ref()
    }

    #[must_use]
    pub const fn payload_path(&self) -> &PayloadPath {
        &self.payload_path
    }

    #[must_use]
    pub const fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Build the outgoing request, attaching `credential` per this source's
    /// convention. Sources without a [`CredentialSpec`] never carry one.
    #[must_use]
    pub fn prepare(&self, credential: Option<&str>) -> PreparedRequest {
        let mut url = self.endpoint.clone();
        let mut headers = Vec::new();

        let credential = credential.map(str::trim).filter(|v| !v.is_empty());
        if let (Some(spec), Some(value)) = (&self.credential, credential) {
            match spec.placement {
                CredentialPlacement::Header => headers.push((spec.name.clone(), value.to_string())),
                CredentialPlacement::Query => {
                    url.query_pairs_mut().append_pair(&spec.name, value);
                }
            }
        }

        PreparedRequest { url, headers }
    }
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint.as_str())
            .field("credential", &self.credential)
            .field("payload_path", &self.payload_path.to_string())
            .finish_non_exhaustive()
    }
}

fn parse_endpoint(url: &str) -> Result<Url, DescriptorError> {
    let invalid = |reason: String| DescriptorError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    Ok(parsed)
}

/// Replace every `{name}` in `template` with the percent-encoded `params[name]`.
///
/// # Errors
/// Returns an error for a placeholder without a parameter or an unclosed `{`.
pub fn fill_template(
    template: &str,
    params: &BTreeMap<String, String>,
) -> Result<String, DescriptorError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or(DescriptorError::UnclosedPlaceholder(offset + open))?;
        let name = &after[..close];
        let value = params
            .get(name)
            .ok_or_else(|| DescriptorError::UnresolvedPlaceholder(name.to_string()))?;
        out.push_str(&urlencoding::encode(value));

        let consumed = open + 1 + close + 1;
        offset += consumed;
        rest = &rest[consumed..];
    }
    out.push_str(rest);

    Ok(out)
}
