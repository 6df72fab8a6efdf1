use std::fmt::{self, Display};
use std::str::FromStr;

/// The action every read-path check is performed with.
pub const VIEW_ACTION: &str = "view";

/// The logical type of a domain object, e.g. `tests.project`.
///
/// The namespace groups kinds the way an application label does, and must not contain `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKind {
    namespace: String,
    name: String,
}

impl EntityKind {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// A permission key of the form `<namespace>.<codename>`, where derived codenames
/// read `<action>_<kind>` (e.g. `tests.view_project`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionName {
    full: String,
    separator: usize,
}

impl PermissionName {
    /// Derives the permission for performing `action` on entities of `kind`.
    pub fn for_kind(kind: &EntityKind, action: &str) -> Self {
        Self {
            full: format!("{}.{}_{}", kind.namespace, action, kind.name),
            separator: kind.namespace.len(),
        }
    }

    pub fn view(kind: &EntityKind) -> Self {
        Self::for_kind(kind, VIEW_ACTION)
    }

    pub fn namespace(&self) -> &str {
        &self.full[..self.separator]
    }

    pub fn codename(&self) -> &str {
        &self.full[self.separator + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionNameError {
    #[error("Invalid permission \"{0}\". Must be of the form <namespace.codename>, like \"polls.view_poll\"")]
    MissingSeparator(String),
    #[error("Invalid permission \"{0}\". Namespace and codename must be non-empty and contain no further '.'")]
    MalformedSegments(String),
}

impl FromStr for PermissionName {
    type Err = PermissionNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((namespace, codename)) = s.split_once('.') else {
            return Err(PermissionNameError::MissingSeparator(s.to_string()));
        };

        if namespace.is_empty() || codename.is_empty() || codename.contains('.') {
            return Err(PermissionNameError::MalformedSegments(s.to_string()));
        }

        Ok(Self {
            full: s.to_string(),
            separator: namespace.len(),
        })
    }
}

/// Shorthand for [`PermissionName::for_kind`].
pub fn permission_name(kind: &EntityKind, action: &str) -> PermissionName {
    PermissionName::for_kind(kind, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_namespaced_view_permission() {
        let project = EntityKind::new("tests", "project");
        let permission = PermissionName::view(&project);

        assert_eq!(permission.as_str(), "tests.view_project");
        assert_eq!(permission.namespace(), "tests");
        assert_eq!(permission.codename(), "view_project");
    }

    #[test]
    fn uses_the_given_action() {
        let user = EntityKind::new("auth", "user");
        assert_eq!(permission_name(&user, "change").to_string(), "auth.change_user");
    }

    #[test]
    fn distinct_kinds_never_collide() {
        let a = permission_name(&EntityKind::new("tests", "project"), VIEW_ACTION);
        let b = permission_name(&EntityKind::new("billing", "project"), VIEW_ACTION);
        let c = permission_name(&EntityKind::new("tests", "expense"), VIEW_ACTION);

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn parsed_and_derived_names_are_equal() {
        let parsed: PermissionName = "tests.view_project".parse().unwrap();
        let derived = PermissionName::view(&EntityKind::new("tests", "project"));

        assert_eq!(parsed, derived);
        assert_eq!(parsed.namespace(), "tests");
    }

    #[test]
    fn rejects_malformed_permission_strings() {
        assert_eq!(
            "view_project".parse::<PermissionName>(),
            Err(PermissionNameError::MissingSeparator("view_project".into()))
        );
        assert!(matches!(
            ".view_project".parse::<PermissionName>(),
            Err(PermissionNameError::MalformedSegments(_))
        ));
        assert!(matches!(
            "tests.".parse::<PermissionName>(),
            Err(PermissionNameError::MalformedSegments(_))
        ));
        assert!(matches!(
            "tests.view.project".parse::<PermissionName>(),
            Err(PermissionNameError::MalformedSegments(_))
        ));
    }
}
