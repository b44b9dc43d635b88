//! In-memory view stack driving screen selection.
//!
//! Top-level sidebar entries replace the whole stack; conversations and
//! profile pages are pushed on top so the back button returns to where the
//! user came from. Nothing is persisted.

use ghostchat_shared::UserId;

use crate::access::AdminAccess;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    GlobalChat,
    Users,
    Profile,
    Admin,
    DirectMessage { participant: UserId },
    UserProfile { user: UserId },
}

impl View {
    /// Sidebar entries are top-level; the rest are pushed sub-views.
    pub fn is_top_level(&self) -> bool {
        matches!(self, Self::GlobalChat | Self::Users | Self::Profile | Self::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebarItem {
    pub view_label: &'static str,
    pub target: SidebarTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarTarget {
    GlobalChat,
    Users,
    Profile,
    Admin,
}

impl SidebarTarget {
    pub fn view(self) -> View {
        match self {
            Self::GlobalChat => View::GlobalChat,
            Self::Users => View::Users,
            Self::Profile => View::Profile,
            Self::Admin => View::Admin,
        }
    }
}

/// Sidebar entries; the admin entry only when access is granted.
pub fn sidebar_items(access: AdminAccess) -> Vec<SidebarItem> {
    let mut items = vec![
        SidebarItem { view_label: "Global Chat", target: SidebarTarget::GlobalChat },
        SidebarItem { view_label: "Users", target: SidebarTarget::Users },
        SidebarItem { view_label: "Profile", target: SidebarTarget::Profile },
    ];
    if access.is_granted() {
        items.push(SidebarItem { view_label: "Admin Panel", target: SidebarTarget::Admin });
    }
    items
}

#[derive(Debug, Clone)]
pub struct ViewStack {
    stack: Vec<View>,
    sidebar_open: bool,
}

impl Default for ViewStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStack {
    pub fn new() -> Self {
        Self {
            stack: vec![View::GlobalChat],
            sidebar_open: false,
        }
    }

    pub fn current(&self) -> &View {
        // The stack is never empty: pop keeps the root and reset installs one.
        &self.stack[self.stack.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether the back button is shown.
    pub fn can_go_back(&self) -> bool {
        self.stack.len() > 1
    }

    pub fn push(&mut self, view: View) {
        tracing::debug!(?view, depth = self.stack.len() + 1, "Push view");
        self.stack.push(view);
        self.sidebar_open = false;
    }

    /// No-op on the root view.
    pub fn pop(&mut self) -> Option<View> {
        if self.stack.len() > 1 {
            self.stack.pop()
        } else {
            None
        }
    }

    /// Replace the whole stack with `root`.
    pub fn reset(&mut self, root: View) {
        tracing::debug!(?root, "Reset view stack");
        self.stack.clear();
        self.stack.push(root);
        self.sidebar_open = false;
    }

    pub fn open_direct_message(&mut self, participant: UserId) {
        self.push(View::DirectMessage { participant });
    }

    pub fn open_user_profile(&mut self, user: UserId) {
        self.push(View::UserProfile { user });
    }

    /// Entered right after a successful unlock.
    pub fn unlock_admin(&mut self) {
        self.push(View::Admin);
    }

    /// Sidebar entry to highlight. Sub-views fall under Global Chat.
    pub fn sidebar_selection(&self) -> SidebarTarget {
        match self.current() {
            View::Users => SidebarTarget::Users,
            View::Profile => SidebarTarget::Profile,
            View::Admin => SidebarTarget::Admin,
            View::GlobalChat | View::DirectMessage { .. } | View::UserProfile { .. } => {
                SidebarTarget::GlobalChat
            }
        }
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }
}
