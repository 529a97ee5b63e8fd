//! Catalog of auditable actions.
//!
//! Every action is named `<resource>.<verb>`; the resource part groups the
//! action under a resource type. The registry is built once at startup and
//! only read afterwards, so it is shared as a plain `Arc<ActionRegistry>`.

use {
    super::error::AuditError,
    serde::{Deserialize, Serialize},
    std::collections::{BTreeMap, HashMap},
};

/// Placeholders a message template may reference.
pub const TEMPLATE_FIELDS: &[&str] = &[
    "action",
    "resource_type",
    "resource_id",
    "user_id",
    "user_name",
    "user_email",
];

/// One catalog entry as it appears in deployment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub name: String,
    pub message_template: String,
    #[serde(default)]
    pub link_template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A `{name}` template, parsed once. `{{` and `}}` are literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    segments: Vec<Segment>,
}

impl Template {
    fn parse(owner: &str, raw: &str) -> Result<Self, AuditError> {
        let invalid = |reason: String| AuditError::InvalidTemplate {
            action: owner.to_string(),
            reason,
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut field = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => {
                                return Err(invalid(format!("unterminated placeholder in {raw:?}")));
                            }
                            Some(c) => field.push(c),
                        }
                    }
                    if field.is_empty() {
                        return Err(invalid("empty placeholder".into()));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => return Err(invalid(format!("unmatched '}}' in {raw:?}"))),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(f) => Some(f.as_str()),
            Segment::Literal(_) => None,
        })
    }

    fn render(&self, owner: &str, data: &HashMap<&str, String>) -> Result<String, AuditError> {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(f) => {
                    let value = data.get(f.as_str()).ok_or_else(|| {
                        AuditError::TemplateFieldMissing {
                            action: owner.to_string(),
                            field: f.clone(),
                        }
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditAction {
    name: String,
    resource_type: String,
    message_template: Template,
    link_template: Option<Template>,
}

impl AuditAction {
    pub fn new(
        name: impl Into<String>,
        message_template: &str,
        link_template: Option<&str>,
    ) -> Result<Self, AuditError> {
        let name = name.into();
        let resource_type = match name.split_once('.') {
            Some((resource, verb)) if !resource.is_empty() && !verb.is_empty() => {
                resource.to_string()
            }
            _ => return Err(AuditError::InvalidActionName(name)),
        };

        let message_template = Template::parse(&name, message_template)?;
        if let Some(field) = message_template
            .fields()
            .find(|f| !TEMPLATE_FIELDS.contains(f))
        {
            return Err(AuditError::UnknownPlaceholder {
                action: name.clone(),
                field: field.to_string(),
            });
        }

        let link_template = link_template
            .map(|raw| Template::parse(&name, raw))
            .transpose()?;
        if let Some(field) = link_template
            .as_ref()
            .and_then(|t| t.fields().find(|f| *f != "id"))
        {
            return Err(AuditError::UnknownPlaceholder {
                action: name.clone(),
                field: field.to_string(),
            });
        }

        Ok(Self {
            name,
            resource_type,
            message_template,
            link_template,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn message_template(&self) -> &str {
        self.message_template.as_str()
    }

    pub fn link_template(&self) -> Option<&str> {
        self.link_template.as_ref().map(Template::as_str)
    }

    pub fn render_message(&self, data: &HashMap<&str, String>) -> Result<String, AuditError> {
        self.message_template.render(&self.name, data)
    }

    pub fn link(&self, resource_id: &str) -> Option<String> {
        let template = self.link_template.as_ref()?;
        let data = HashMap::from([("id", resource_id.to_string())]);
        // The only placeholder a link template may hold is `{id}`.
        template.render(&self.name, &data).ok()
    }
}

impl TryFrom<&ActionConfig> for AuditAction {
    type Error = AuditError;

    fn try_from(cfg: &ActionConfig) -> Result<Self, Self::Error> {
        AuditAction::new(
            cfg.name.clone(),
            &cfg.message_template,
            cfg.link_template.as_deref(),
        )
    }
}

/// Actions grouped by resource type.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    by_type: HashMap<String, BTreeMap<String, AuditAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(entries: &[ActionConfig]) -> Result<Self, AuditError> {
        let mut registry = Self::new();
        for entry in entries {
            registry.register(AuditAction::try_from(entry)?)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, action: AuditAction) -> Result<(), AuditError> {
        let group = self
            .by_type
            .entry(action.resource_type().to_string())
            .or_default();
        if group.contains_key(action.name()) {
            return Err(AuditError::DuplicateAction(action.name().to_string()));
        }
        group.insert(action.name().to_string(), action);
        Ok(())
    }

    /// All actions for `resource_type`, keyed by action name. Empty when
    /// nothing is registered for that type.
    pub fn get(&self, resource_type: &str) -> BTreeMap<&str, &AuditAction> {
        self.by_type
            .get(resource_type)
            .map(|group| group.iter().map(|(k, v)| (k.as_str(), v)).collect())
            .unwrap_or_default()
    }

    pub fn lookup(&self, resource_type: &str, action: &str) -> Option<&AuditAction> {
        self.by_type.get(resource_type)?.get(action)
    }

    pub fn find(&self, action: &str) -> Option<&AuditAction> {
        let (resource_type, _) = action.split_once('.')?;
        self.lookup(resource_type, action)
    }

    pub fn is_valid(&self, resource_type: &str, action: &str) -> bool {
        self.lookup(resource_type, action).is_some()
    }

    pub fn render(&self, action: &str, data: &HashMap<&str, String>) -> Result<Option<String>, AuditError> {
        self.find(action)
            .map(|a| a.render_message(data))
            .transpose()
    }

    pub fn link(&self, action: &str, resource_id: &str) -> Option<String> {
        self.find(action)?.link(resource_id)
    }

    pub fn len(&self) -> usize {
        self.by_type.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn entry(name: &str, message: &str, link: Option<&str>) -> ActionConfig {
    ActionConfig {
        name: name.to_string(),
        message_template: message.to_string(),
        link_template: link.map(str::to_string),
    }
}

/// Catalog used when the deployment does not supply its own.
pub fn default_catalog() -> Vec<ActionConfig> {
    vec![
        entry(
            "draft.create",
            "User {user_id} created the draft {resource_id}.",
            Some("/uploads/{id}"),
        ),
        entry(
            "draft.edit",
            "User {user_id} updated the draft {resource_id}.",
            Some("/uploads/{id}"),
        ),
        entry(
            "draft.delete",
            "User {user_id} deleted the draft {resource_id}.",
            None,
        ),
        entry(
            "draft.new_version",
            "User {user_id} created a new version of {resource_id}.",
            Some("/uploads/{id}"),
        ),
        entry(
            "record.publish",
            "User {user_id} published the record {resource_id}.",
            Some("/records/{id}"),
        ),
        entry(
            "record.delete",
            "User {user_id} deleted the record {resource_id}.",
            None,
        ),
        entry(
            "record.restore",
            "User {user_id} restored the record {resource_id}.",
            Some("/records/{id}"),
        ),
        entry(
            "community.create",
            "User {user_id} created the community {resource_id}.",
            Some("/communities/{id}"),
        ),
        entry(
            "community.update",
            "User {user_id} updated the community {resource_id}.",
            Some("/communities/{id}"),
        ),
        entry("user.login", "User {user_id} logged in.", None),
        entry("user.logout", "User {user_id} logged out.", None),
    ]
}
