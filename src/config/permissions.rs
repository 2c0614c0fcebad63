//! Declarative role-to-capability mapping for the authorization gate.
//!
//! The core does not decide authorization policy; request handlers consult
//! this table and pass only the yes/no outcome plus the acting admin's
//! identifier into core operations. Capabilities are `resource:action`
//! strings; `*` and `resource:*` act as wildcards. New roles are additive
//! rows here, not new conditional branches.

/// Static role capability table.
const ROLE_CAPABILITIES: &[(&str, &[&str])] = &[
    ("owner", &["*"]),
    (
        "manager",
        &[
            "product:create",
            "product:update",
            "product:delete",
            "category:manage",
            "lookup:manage",
            "inventory:adjust",
            "inventory:view",
        ],
    ),
    ("clerk", &["inventory:adjust", "inventory:view"]),
    ("viewer", &["inventory:view"]),
];

/// Returns the capability list for a role, or None for an unknown role.
#[must_use]
pub fn capabilities(role: &str) -> Option<&'static [&'static str]> {
    ROLE_CAPABILITIES
        .iter()
        .find(|(r, _)| *r == role)
        .map(|(_, caps)| *caps)
}

/// Checks whether a role may perform `action` on `resource`.
///
/// Unknown roles are denied everything.
#[must_use]
pub fn is_allowed(role: &str, resource: &str, action: &str) -> bool {
    let Some(caps) = capabilities(role) else {
        return false;
    };
    let wanted = format!("{resource}:{action}");
    let resource_wildcard = format!("{resource}:*");
    caps.iter()
        .any(|cap| *cap == "*" || *cap == wanted || *cap == resource_wildcard)
}
