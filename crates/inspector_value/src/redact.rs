//! Credential redaction for packet logging.
//!
//! Certain packet fields carry identity tokens and authorization grants.
//! Their serialized values are replaced with [`REDACTED`] before anything
//! reaches a diagnostic client — at any nesting depth, so wrapper packets
//! whose outer class matches the rule are covered too.

/// The literal substituted for a redacted field value.
pub const REDACTED: &str = "[REDACTED]";

/// `(packet simple class name, field name)` pairs that are never emitted.
const RULES: &[(&str, &str)] = &[
    ("Connect", "identityToken"),
    ("AuthGrant", "authorizationGrant"),
    ("AuthGrant", "serverIdentityToken"),
    ("AuthToken", "accessToken"),
    ("AuthToken", "serverAuthorizationGrant"),
    ("ServerAuthToken", "serverAccessToken"),
];

/// Whether `field` must be redacted when it appears anywhere inside a
/// packet named `packet`.
#[must_use]
pub fn is_redacted(packet: &str, field: &str) -> bool {
    RULES
        .iter()
        .any(|&(rule_packet, rule_field)| rule_packet == packet && rule_field == field)
}
