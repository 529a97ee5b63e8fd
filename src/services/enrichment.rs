use {
    crate::domain::{
        context::ActorContext,
        error::{AuditError, ValidationError},
        event::{EventMetadata, UserInfo},
        ports::IdentityProvider,
    },
    serde_json::Value,
};

/// How the system identity's user block is filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemUserDefaults {
    pub name: Option<String>,
    pub email: Option<String>,
}

async fn user_block(
    identities: &dyn IdentityProvider,
    actor: &ActorContext,
    system_defaults: &SystemUserDefaults,
) -> Result<UserInfo, AuditError> {
    if actor.is_system() {
        return Ok(UserInfo {
            id: actor.actor_id.to_string(),
            name: system_defaults.name.clone(),
            email: system_defaults.email.clone(),
        });
    }

    let resolved = identities.resolve(actor.actor_id.clone()).await?;
    Ok(UserInfo {
        id: resolved.id,
        name: resolved.username.filter(|u| !u.is_empty()),
        email: resolved.email,
    })
}

/// Merge request context over whatever metadata the caller sent. The
/// request context owns `ip_address`, `session` and `request_id`: caller
/// values for them are always discarded, even when the request has none.
/// Unrelated caller keys are kept.
fn merge_metadata(existing: Option<Value>, actor: &ActorContext) -> Result<EventMetadata, AuditError> {
    let mut metadata = match existing {
        Some(Value::Null) | None => EventMetadata::default(),
        Some(value @ Value::Object(_)) => serde_json::from_value(value)
            .map_err(|e| ValidationError::Malformed(format!("metadata: {e}")))?,
        Some(other) => {
            return Err(ValidationError::Malformed(format!(
                "metadata must be an object, got {other}"
            ))
            .into());
        }
    };

    let request = &actor.request;
    metadata.ip_address = request.remote_ip.clone();
    metadata.session = request.session.clone();
    metadata.request_id = request.request_id.clone();
    Ok(metadata)
}

/// Add the `user` and `metadata` blocks to a raw payload.
///
/// Any caller-supplied `user` is replaced: the actor is always whoever the
/// context says it is. Has no side effects beyond one identity lookup.
pub async fn enrich(
    identities: &dyn IdentityProvider,
    actor: &ActorContext,
    system_defaults: &SystemUserDefaults,
    payload: Value,
) -> Result<Value, AuditError> {
    let Value::Object(mut map) = payload else {
        return Err(ValidationError::Malformed("payload must be a JSON object".into()).into());
    };

    let user = user_block(identities, actor, system_defaults).await?;
    let metadata = merge_metadata(map.remove("metadata"), actor)?;

    map.insert("user".into(), serde_json::to_value(user)?);
    if !metadata.is_empty() {
        map.insert("metadata".into(), serde_json::to_value(metadata)?);
    }
    Ok(Value::Object(map))
}
