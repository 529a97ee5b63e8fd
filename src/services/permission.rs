use {
    crate::domain::{
        context::{ActorContext, Capability, PermissionScope},
        ports::PermissionGate,
    },
    std::collections::HashSet,
};

/// Default policy: any identified actor may record events about their own
/// actions; only the system identity and listed readers may read or search.
#[derive(Debug, Clone, Default)]
pub struct AuditLogPolicy {
    readers: HashSet<String>,
}

impl AuditLogPolicy {
    pub fn new(readers: impl IntoIterator<Item = String>) -> Self {
        Self {
            readers: readers.into_iter().collect(),
        }
    }
}

impl PermissionGate for AuditLogPolicy {
    fn check(&self, actor: &ActorContext, capability: Capability, _scope: PermissionScope) -> bool {
        if actor.is_system() {
            return true;
        }
        match capability {
            Capability::Create => true,
            Capability::Read | Capability::Search => {
                self.readers.contains(actor.actor_id.as_str())
            }
        }
    }
}
