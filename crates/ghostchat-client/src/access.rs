//! Admin view access: backend role AND session unlock.

use crate::unlock::UnlockState;

/// Outcome of the backend admin check as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCheck {
    Pending,
    Resolved(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAccess {
    /// Role check still running; show a loading state.
    Checking,
    Denied,
    /// Admin, but the session has not been unlocked.
    Locked,
    Granted,
}

impl AdminAccess {
    pub fn evaluate(role: RoleCheck, unlock: UnlockState) -> Self {
        match (role, unlock) {
            (RoleCheck::Pending, _) => Self::Checking,
            (RoleCheck::Resolved(false), _) => Self::Denied,
            (RoleCheck::Resolved(true), UnlockState::Locked) => Self::Locked,
            (RoleCheck::Resolved(true), UnlockState::Unlocked) => Self::Granted,
        }
    }

    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }

    /// Text for the screen shown instead of the admin panel.
    pub fn message(self) -> Option<&'static str> {
        match self {
            Self::Checking => Some("Checking permissions..."),
            Self::Denied => Some("Access denied. Admin privileges required."),
            Self::Locked => Some("Admin panel is locked. Enter the admin password to continue."),
            Self::Granted => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granted_only_when_admin_and_unlocked() {
        use RoleCheck::*;
        use UnlockState::*;

        let cases = [
            (Pending, Locked, AdminAccess::Checking),
            (Pending, Unlocked, AdminAccess::Checking),
            (Resolved(false), Locked, AdminAccess::Denied),
            (Resolved(false), Unlocked, AdminAccess::Denied),
            (Resolved(true), Locked, AdminAccess::Locked),
            (Resolved(true), Unlocked, AdminAccess::Granted),
        ];
        for (role, unlock, expected) in cases {
            let access = AdminAccess::evaluate(role, unlock);
            assert_eq!(access, expected, "{role:?} + {unlock:?}");
            assert_eq!(access.is_granted(), expected == AdminAccess::Granted);
        }
    }

    #[test]
    fn only_granted_has_no_message() {
        assert_eq!(AdminAccess::Granted.message(), None);
        assert!(AdminAccess::Denied.message().unwrap().contains("denied"));
    }
}
