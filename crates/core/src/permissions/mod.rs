//! Permission nodes checked by plot commands and listeners, and a small
//! node matcher for hosts that keep permissions as plain node lists.

/// Skips ownership checks and every protection.
pub const ADMIN_BYPASS: &str = "allayplots.admin.bypass";
/// Allows deleting plots owned by someone else.
pub const ADMIN_DELETE: &str = "allayplots.admin.delete";
/// Claims are free and deletes are not refunded.
pub const ECONOMY_BYPASS: &str = "allayplots.economy.bypass";
/// Grants `/plot`. Given to everyone by default.
pub const COMMAND_PLOT: &str = "allayplots.command.plot";

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    WildCard,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PermissionNode {
    path: Vec<PathSegment>,
    value: bool,
}

impl PermissionNode {
    fn matches(&self, str: &str) -> bool {
        let mut segments = str.split('.');
        for expected in &self.path {
            match (expected, segments.next()) {
                (PathSegment::WildCard, _) => return true,
                (PathSegment::Named(name), Some(segment)) if name == segment => {}
                _ => return false,
            }
        }
        segments.next().is_none()
    }
}

/// Granted and revoked nodes of one player. The first matching node wins, so
/// specific nodes go before wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    nodes: Vec<PermissionNode>,
}

impl PermissionSet {
    pub fn get_node_val(&self, name: &str) -> Option<bool> {
        self.nodes
            .iter()
            .find(|node| node.matches(name))
            .map(|node| node.value)
    }

    /// Whether `name` is granted. `/plot` is granted unless revoked.
    pub fn has(&self, name: &str) -> bool {
        self.get_node_val(name).unwrap_or(name == COMMAND_PLOT)
    }

    pub fn insert(&mut self, name: &str, value: bool) {
        let path = name
            .split('.')
            .map(|s| match s {
                "*" => PathSegment::WildCard,
                s => PathSegment::Named(s.to_owned()),
            })
            .collect();
        self.nodes.push(PermissionNode { path, value });
    }

    pub fn grant(mut self, name: &str) -> PermissionSet {
        self.insert(name, true);
        self
    }
}
