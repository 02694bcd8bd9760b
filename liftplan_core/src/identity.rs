//! Identity and role checks.
//!
//! The session provider hands this crate a verified `{email, role}` pair;
//! everything here is plain comparisons on top of that. Role strings are
//! parsed case-insensitively because older sessions stored "Coach"/"ADMIN".

use serde::{Deserialize, Serialize};

/// Role supplied by the session provider
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Athlete,
    Coach,
    Admin,
}

/// Parse a role string into the enum
///
/// Unknown strings fall back to the least-privileged role.
pub fn parse_role(s: &str) -> Role {
    match s.trim().to_lowercase().as_str() {
        "coach" => Role::Coach,
        "admin" => Role::Admin,
        "athlete" => Role::Athlete,
        other => {
            if !other.is_empty() {
                tracing::warn!("Unknown role {:?}, treating as athlete", other);
            }
            Role::Athlete
        }
    }
}

/// A verified user identity
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn new(email: &str, role: Role) -> Self {
        Identity {
            email: email.to_string(),
            role,
        }
    }

    /// Whether this user may edit a plan belonging to `athlete` under
    /// `coach_email`.
    ///
    /// Athletes edit their own plans (logging sets); coaches edit plans they
    /// coach; admins edit anything.
    pub fn can_edit_plan(&self, athlete: &str, coach_email: &str) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Coach => self.email.eq_ignore_ascii_case(coach_email),
            Role::Athlete => self.email.eq_ignore_ascii_case(athlete),
        }
    }

    /// Whether this user may view an athlete's logged sessions and reports.
    pub fn can_view_athlete(&self, athlete: &str, coach_email: &str) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Coach => self.email.eq_ignore_ascii_case(coach_email),
            Role::Athlete => self.email.eq_ignore_ascii_case(athlete),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_case_insensitive() {
        assert_eq!(parse_role("coach"), Role::Coach);
        assert_eq!(parse_role("Coach"), Role::Coach);
        assert_eq!(parse_role("ADMIN"), Role::Admin);
        assert_eq!(parse_role(" athlete "), Role::Athlete);
    }

    #[test]
    fn test_parse_role_unknown_falls_back() {
        assert_eq!(parse_role("superuser"), Role::Athlete);
        assert_eq!(parse_role(""), Role::Athlete);
    }

    #[test]
    fn test_athlete_edits_own_plan_only() {
        let identity = Identity::new("ana@example.com", Role::Athlete);
        assert!(identity.can_edit_plan("ana@example.com", "coach@example.com"));
        assert!(identity.can_edit_plan("Ana@Example.com", "coach@example.com"));
        assert!(!identity.can_edit_plan("other@example.com", "coach@example.com"));
    }

    #[test]
    fn test_coach_edits_coached_plans() {
        let identity = Identity::new("coach@example.com", Role::Coach);
        assert!(identity.can_edit_plan("ana@example.com", "coach@example.com"));
        assert!(!identity.can_edit_plan("ana@example.com", "other@example.com"));
    }

    #[test]
    fn test_admin_edits_everything() {
        let identity = Identity::new("admin@example.com", Role::Admin);
        assert!(identity.can_edit_plan("ana@example.com", "coach@example.com"));
        assert!(identity.can_view_athlete("ana@example.com", "coach@example.com"));
    }
}
