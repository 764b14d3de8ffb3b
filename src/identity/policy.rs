use serde::Serialize;

use super::claims::RoleCode;

/// What the current viewer may see and do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_append_records: bool,
    pub redact_names: bool,
}

impl Capabilities {
    /// Applied to absent and unrecognized roles.
    pub const RESTRICTED: Capabilities = Capabilities { can_append_records: false, redact_names: true };

    /// The append-patient section is shown exactly when appending is allowed.
    pub fn append_section_visible(&self) -> bool { self.can_append_records }
}

/// Role code -> capabilities. Adding a role means adding a row here and nothing else.
static POLICY_TABLE: &[(&str, Capabilities)] = &[
    ("H", Capabilities { can_append_records: true, redact_names: false }),
    ("R", Capabilities { can_append_records: false, redact_names: true }),
];

/// Capabilities for `role`. Anything without a row in the table gets [`Capabilities::RESTRICTED`].
pub fn capabilities_for(role: Option<&RoleCode>) -> Capabilities {
    let Some(key) = role.and_then(RoleCode::policy_key) else { return Capabilities::RESTRICTED; };
    POLICY_TABLE
        .iter()
        .find(|(code, _)| *code == key)
        .map(|(_, caps)| *caps)
        .unwrap_or(Capabilities::RESTRICTED)
}
