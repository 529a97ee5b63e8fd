//! Write-path validation and read-path projection.

use {
    super::action::ActionRegistry,
    super::error::{AuditError, ValidationError},
    super::event::{
        AuditLogRecord, AuditLogView, CanonicalEvent, EventBody, EventMetadata, IndexDocument,
        ResourceRef, UserInfo, ViewLinks, parse_timestamp,
    },
    super::id::AuditLogId,
    chrono::{DateTime, SubsecRound, Utc},
    serde::Deserialize,
    serde_json::Value,
    std::collections::HashMap,
};

pub const SELF_LINK_PREFIX: &str = "/api/audit-logs";

/// Inbound payload after enrichment. Anything not listed here (including
/// client-supplied `id`, `created`, `version`) is dropped.
#[derive(Debug, Default, Deserialize)]
struct RawEvent {
    #[serde(default)]
    action: Option<Value>,
    #[serde(default)]
    resource: Option<RawResource>,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    metadata: Option<EventMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct RawResource {
    #[serde(default, rename = "type")]
    resource_type: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawUser {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Required string field. Numbers are accepted and stringified since ids
/// often arrive as integers.
fn required(value: Option<Value>, field: &'static str) -> Result<String, ValidationError> {
    let s = match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Null) | None => return Err(ValidationError::MissingField(field)),
        Some(other) => {
            return Err(ValidationError::Malformed(format!(
                "{field} must be a string, got {other}"
            )));
        }
    };
    if s.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(s)
}

/// Validate an enriched payload and build the canonical event.
///
/// Structural checks run first, then the action/resource-type legality
/// check against the registry. `now` becomes `created` regardless of what
/// the payload says.
pub fn normalize(
    payload: Value,
    registry: &ActionRegistry,
    now: DateTime<Utc>,
) -> Result<CanonicalEvent, ValidationError> {
    if !payload.is_object() {
        return Err(ValidationError::Malformed(
            "payload must be a JSON object".into(),
        ));
    }
    let raw: RawEvent = serde_json::from_value(payload)
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let action = required(raw.action, "action")?;
    let resource = raw.resource.ok_or(ValidationError::MissingField("resource"))?;
    let resource_type = required(resource.resource_type, "resource.type")?;
    let resource_id = required(resource.id, "resource.id")?;
    let user = raw.user.ok_or(ValidationError::MissingField("user"))?;
    let user_id = required(user.id, "user.id")?;

    if !registry.is_valid(&resource_type, &action) {
        return Err(ValidationError::InvalidAction {
            action,
            resource_type,
        });
    }

    let metadata = raw.metadata.filter(|m| !m.is_empty());

    Ok(CanonicalEvent {
        created: now.trunc_subsecs(6),
        action,
        resource_type: resource_type.clone(),
        user_id: user_id.clone(),
        body: EventBody {
            resource: ResourceRef {
                resource_type,
                id: resource_id,
            },
            user: UserInfo {
                id: user_id,
                name: user.name,
                email: user.email,
            },
            metadata,
        },
    })
}

/// A record as read back from either store.
#[derive(Debug, Clone)]
pub enum StoredRecord {
    Durable(AuditLogRecord),
    Indexed(IndexDocument),
}

/// Fields common to both stored shapes once timestamps agree.
struct Projected {
    id: AuditLogId,
    created: DateTime<Utc>,
    action: String,
    resource: ResourceRef,
    user: UserInfo,
    metadata: Option<EventMetadata>,
}

fn integrity(id: &str, field: &'static str) -> AuditError {
    AuditError::ReadIntegrity {
        id: id.to_string(),
        field,
    }
}

fn decode<T: for<'de> Deserialize<'de>>(
    id: &str,
    field: &'static str,
    value: Option<&Value>,
) -> Result<T, AuditError> {
    let value = value.filter(|v| !v.is_null()).ok_or_else(|| integrity(id, field))?;
    serde_json::from_value(value.clone()).map_err(|_| integrity(id, field))
}

fn decode_metadata(value: Option<&Value>) -> Option<EventMetadata> {
    value
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn from_durable(record: &AuditLogRecord) -> Result<Projected, AuditError> {
    let id = record.id.to_string();
    let body = record.json.as_ref().ok_or_else(|| integrity(&id, "json"))?;
    let mut resource: ResourceRef = decode(&id, "resource", body.get("resource"))?;
    if !record.resource_type.is_empty() {
        resource.resource_type = record.resource_type.clone();
    }

    Ok(Projected {
        id: record.audit_id(),
        created: record.created,
        action: record.action.clone(),
        resource,
        user: decode(&id, "user", body.get("user"))?,
        metadata: decode_metadata(body.get("metadata")),
    })
}

fn from_index(doc: &IndexDocument) -> Result<Projected, AuditError> {
    let raw_id = doc.id.as_deref().ok_or_else(|| integrity("<unknown>", "id"))?;
    let id: AuditLogId = raw_id.parse().map_err(|_| integrity(raw_id, "id"))?;
    let created = doc
        .timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or_else(|| integrity(raw_id, "@timestamp"))?;
    let action = doc.action.clone().ok_or_else(|| integrity(raw_id, "action"))?;
    let mut resource: ResourceRef = decode(raw_id, "resource", doc.resource.as_ref())?;
    if let Some(resource_type) = doc.resource_type.as_ref().filter(|t| !t.is_empty()) {
        resource.resource_type = resource_type.clone();
    }

    Ok(Projected {
        id,
        created,
        action,
        resource,
        user: decode(raw_id, "user", doc.user.as_ref())?,
        metadata: decode_metadata(doc.metadata.as_ref()),
    })
}

fn template_data(p: &Projected) -> HashMap<&'static str, String> {
    let mut data = HashMap::from([
        ("action", p.action.clone()),
        ("resource_type", p.resource.resource_type.clone()),
        ("resource_id", p.resource.id.clone()),
        ("user_id", p.user.id.clone()),
    ]);
    if let Some(name) = &p.user.name {
        data.insert("user_name", name.clone());
    }
    if let Some(email) = &p.user.email {
        data.insert("user_email", email.clone());
    }
    data
}

/// Turn a stored record into its wire view.
///
/// Missing required fields fail closed with [`AuditError::ReadIntegrity`].
/// The action is not re-validated; if it no longer has a registry entry
/// the view just carries no message.
pub fn project(stored: &StoredRecord, registry: &ActionRegistry) -> Result<AuditLogView, AuditError> {
    let projected = match stored {
        StoredRecord::Durable(record) => from_durable(record),
        StoredRecord::Indexed(doc) => from_index(doc),
    }
    .inspect_err(|e| tracing::error!(error = %e, "audit log failed read integrity check"))?;

    let message = match registry.render(&projected.action, &template_data(&projected)) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(audit_id = %projected.id, error = %e, "could not render audit message");
            None
        }
    };
    let links = ViewLinks {
        self_link: format!("{SELF_LINK_PREFIX}/{}", projected.id),
        resource: registry.link(&projected.action, &projected.resource.id),
    };

    Ok(AuditLogView {
        id: projected.id,
        created: projected.created,
        action: projected.action,
        resource: projected.resource,
        user: projected.user,
        metadata: projected.metadata,
        message,
        links,
    })
}
