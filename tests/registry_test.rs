use audit_logs::domain::action::{ActionConfig, ActionRegistry, AuditAction, default_catalog};
use audit_logs::domain::error::AuditError;
use std::collections::HashMap;

fn action(name: &str, message: &str, link: Option<&str>) -> AuditAction {
    AuditAction::new(name, message, link).unwrap()
}

fn data(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
    pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
}

#[test]
fn registered_actions_are_grouped_by_resource_type() {
    let mut registry = ActionRegistry::new();
    registry
        .register(action("draft.create", "User {user_id} created {resource_id}.", None))
        .unwrap();
    registry
        .register(action("draft.edit", "User {user_id} edited {resource_id}.", None))
        .unwrap();
    registry
        .register(action("record.publish", "User {user_id} published {resource_id}.", None))
        .unwrap();

    let drafts = registry.get("draft");
    assert_eq!(drafts.keys().copied().collect::<Vec<_>>(), vec!["draft.create", "draft.edit"]);
    assert_eq!(registry.get("record").len(), 1);
    assert_eq!(registry.len(), 3);
}

#[test]
fn get_for_unknown_type_is_empty() {
    let registry = ActionRegistry::from_config(&default_catalog()).unwrap();
    assert!(registry.get("nonexistent").is_empty());
}

#[test]
fn is_valid_requires_matching_resource_type() {
    let registry = ActionRegistry::from_config(&default_catalog()).unwrap();
    assert!(registry.is_valid("draft", "draft.create"));
    assert!(!registry.is_valid("record", "draft.create"));
    assert!(!registry.is_valid("draft", "draft.explode"));
}

#[test]
fn duplicate_registration_fails() {
    let mut registry = ActionRegistry::new();
    registry.register(action("draft.create", "created", None)).unwrap();
    let err = registry
        .register(action("draft.create", "created again", None))
        .unwrap_err();
    assert!(matches!(err, AuditError::DuplicateAction(name) if name == "draft.create"));
}

#[test]
fn action_names_need_resource_and_verb() {
    for bad in ["draft", ".create", "draft.", ""] {
        let err = AuditAction::new(bad, "x", None).unwrap_err();
        assert!(matches!(err, AuditError::InvalidActionName(_)), "{bad:?} accepted");
    }
    assert_eq!(action("draft.new.version", "x", None).resource_type(), "draft");
}

#[test]
fn render_substitutes_named_placeholders() {
    let a = action("draft.create", "User {user_id} created the draft {resource_id}.", None);
    let msg = a
        .render_message(&data(&[("user_id", "42"), ("resource_id", "abc")]))
        .unwrap();
    assert_eq!(msg, "User 42 created the draft abc.");
}

#[test]
fn render_fails_when_placeholder_missing_from_data() {
    let a = action("draft.create", "User {user_id} created {resource_id}.", None);
    let err = a.render_message(&data(&[("user_id", "42")])).unwrap_err();
    assert!(matches!(
        err,
        AuditError::TemplateFieldMissing { ref field, .. } if field == "resource_id"
    ));
}

#[test]
fn unknown_placeholders_rejected_at_registration() {
    let err = AuditAction::new("draft.create", "User {password} did it", None).unwrap_err();
    assert!(matches!(err, AuditError::UnknownPlaceholder { ref field, .. } if field == "password"));

    let err = AuditAction::new("draft.create", "ok", Some("/uploads/{resource_id}")).unwrap_err();
    assert!(matches!(err, AuditError::UnknownPlaceholder { .. }));
}

#[test]
fn malformed_templates_rejected() {
    for bad in ["User {user_id", "User {}", "oops }"] {
        let err = AuditAction::new("draft.create", bad, None).unwrap_err();
        assert!(matches!(err, AuditError::InvalidTemplate { .. }), "{bad:?} accepted");
    }
}

#[test]
fn doubled_braces_are_literal() {
    let a = action("draft.create", "{{literal}} {user_id}", None);
    assert_eq!(a.render_message(&data(&[("user_id", "1")])).unwrap(), "{literal} 1");
}

#[test]
fn link_uses_template_or_none() {
    let registry = ActionRegistry::from_config(&default_catalog()).unwrap();
    assert_eq!(registry.link("draft.create", "abc").as_deref(), Some("/uploads/abc"));
    assert_eq!(registry.link("record.publish", "xyz").as_deref(), Some("/records/xyz"));
    assert_eq!(registry.link("draft.delete", "abc"), None);
    assert_eq!(registry.link("unknown.action", "abc"), None);
}

#[test]
fn registry_render_for_unknown_action_is_none() {
    let registry = ActionRegistry::from_config(&default_catalog()).unwrap();
    assert_eq!(registry.render("ghost.haunt", &data(&[])).unwrap(), None);
}

#[test]
fn catalog_loads_from_json() {
    let raw = r#"[
        {"name": "community.create", "message_template": "User {user_id} created {resource_id}.", "link_template": "/communities/{id}"},
        {"name": "community.delete", "message_template": "User {user_id} deleted {resource_id}."}
    ]"#;
    let entries: Vec<ActionConfig> = serde_json::from_str(raw).unwrap();
    let registry = ActionRegistry::from_config(&entries).unwrap();
    assert!(registry.is_valid("community", "community.delete"));
    assert_eq!(
        registry.link("community.create", "c1").as_deref(),
        Some("/communities/c1")
    );

    let delete = registry.lookup("community", "community.delete").unwrap();
    assert_eq!(delete.message_template(), "User {user_id} deleted {resource_id}.");
    assert_eq!(delete.link_template(), None);
    let create = registry.find("community.create").unwrap();
    assert_eq!(create.link_template(), Some("/communities/{id}"));
}
