//! The shapes an audit event takes on its way through the system.
//!
//! - [`CanonicalEvent`]: validated, ready to persist.
//! - [`NewAuditLogRecord`] / [`AuditLogRecord`]: durable store rows.
//! - [`IndexDocument`]: search index documents.
//! - [`AuditLogView`]: what callers get back.
//!
//! The shapes are connected only through the explicit mapping functions
//! here and in [`super::schema`].

use {
    super::id::AuditLogId,
    chrono::{DateTime, SecondsFormat, Utc},
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

pub const INITIAL_VERSION: i32 = 1;

/// Who triggered the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Which resource the event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

/// Request context attached to the event. Unknown keys are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EventMetadata {
    pub fn is_empty(&self) -> bool {
        self.ip_address.is_none()
            && self.session.is_none()
            && self.request_id.is_none()
            && self.extra.is_empty()
    }
}

/// Nested body stored in the durable `json` column and mirrored in the
/// index document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBody {
    pub resource: ResourceRef,
    pub user: UserInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EventMetadata>,
}

/// A validated event. `user_id` and `resource_type` are lifted out of the
/// body so stores can index them directly.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalEvent {
    pub created: DateTime<Utc>,
    pub action: String,
    pub resource_type: String,
    pub user_id: String,
    pub body: EventBody,
}

impl CanonicalEvent {
    pub fn to_new_record(&self) -> Result<NewAuditLogRecord, serde_json::Error> {
        Ok(NewAuditLogRecord {
            created: self.created,
            action: self.action.clone(),
            resource_type: self.resource_type.clone(),
            user_id: self.user_id.clone(),
            json: serde_json::to_value(&self.body)?,
        })
    }
}

/// Insert shape for the durable store; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditLogRecord {
    pub created: DateTime<Utc>,
    pub action: String,
    pub resource_type: String,
    pub user_id: String,
    pub json: serde_json::Value,
}

/// Row of `audit_logs_metadata`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogRecord {
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub action: String,
    pub resource_type: String,
    pub user_id: String,
    pub json: Option<serde_json::Value>,
    pub version: i32,
}

impl AuditLogRecord {
    pub fn from_new(id: AuditLogId, new: NewAuditLogRecord) -> Self {
        Self {
            id: id.as_uuid(),
            created: new.created,
            updated: new.created,
            action: new.action,
            resource_type: new.resource_type,
            user_id: new.user_id,
            json: Some(new.json),
            version: INITIAL_VERSION,
        }
    }

    pub fn audit_id(&self) -> AuditLogId {
        AuditLogId::from_uuid(self.id)
    }

    /// Derive the search document for this row. The timestamp becomes an
    /// ISO-8601 string under `@timestamp`; the body is flattened in.
    pub fn to_index_document(&self) -> IndexDocument {
        let body = self.json.as_ref().and_then(serde_json::Value::as_object);
        let pick = |key: &str| body.and_then(|b| b.get(key)).cloned();

        IndexDocument {
            id: Some(self.id.to_string()),
            timestamp: Some(format_timestamp(&self.created)),
            updated: Some(format_timestamp(&self.updated)),
            action: Some(self.action.clone()),
            resource_type: Some(self.resource_type.clone()),
            user_id: Some(self.user_id.clone()),
            resource: pick("resource"),
            user: pick("user"),
            metadata: pick("metadata"),
            version: Some(self.version),
        }
    }
}

/// Search index document. Every field is optional on the way in: documents
/// come from a store this crate does not own, and the projector decides
/// what a missing field means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "@timestamp", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

/// Wire representation returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogView {
    pub id: AuditLogId,
    pub created: DateTime<Utc>,
    pub action: String,
    pub resource: ResourceRef,
    pub user: UserInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EventMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub links: ViewLinks,
}

impl AuditLogView {
    pub fn resource_type(&self) -> &str {
        &self.resource.resource_type
    }

    pub fn resource_id(&self) -> &str {
        &self.resource.id
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

/// Exact-match filters for index queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub from: Option<usize>,
    #[serde(default)]
    pub size: Option<usize>,
}

impl SearchQuery {
    pub const DEFAULT_SIZE: usize = 25;
    pub const MAX_SIZE: usize = 100;

    pub fn offset(&self) -> usize {
        self.from.unwrap_or(0)
    }

    pub fn limit(&self) -> usize {
        self.size.unwrap_or(Self::DEFAULT_SIZE).clamp(1, Self::MAX_SIZE)
    }

    /// Whether a document satisfies every filter that is set.
    pub fn matches(&self, doc: &IndexDocument) -> bool {
        let resource_id = doc
            .resource
            .as_ref()
            .and_then(|r| r.get("id"))
            .and_then(serde_json::Value::as_str);
        let eq = |filter: &Option<String>, value: Option<&str>| match filter {
            Some(f) => value == Some(f.as_str()),
            None => true,
        };

        eq(&self.action, doc.action.as_deref())
            && eq(&self.resource_type, doc.resource_type.as_deref())
            && eq(&self.user_id, doc.user_id.as_deref())
            && eq(&self.resource_id, resource_id)
    }
}

/// One page of search results. `total` counts every match, not just the
/// hits on this page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage<T> {
    pub total: u64,
    pub hits: Vec<T>,
}

/// ISO-8601 with microsecond precision and a `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an index timestamp. Accepts RFC 3339 with any offset, and naive
/// ISO-8601 (no offset), which is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
