use serde::Serialize;

/// Header carrying the authenticated subject, set by the upstream proxy.
pub const CALLER_ID_HEADER: &str = "x-caller-id";
/// Header carrying the caller's role claim.
pub const CALLER_ROLE_HEADER: &str = "x-caller-role";
pub const ADMIN_ROLE: &str = "admin";

/// Identity of the caller as asserted by the authentication layer in front
/// of this service. The engine trusts that layer: it never authenticates,
/// it only reads the claim.
#[derive(Debug, Clone, Serialize)]
pub struct CallerIdentity {
    pub subject: String,
    pub admin: bool,
}

impl CallerIdentity {
    pub fn new(subject: impl Into<String>, admin: bool) -> Self {
        Self {
            subject: subject.into(),
            admin,
        }
    }

    /// Identity used by local CLI commands; the operator running the binary
    /// has administrative access by definition.
    pub fn local_operator() -> Self {
        let subject = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "operator".to_string());
        Self::new(subject, true)
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }
}
