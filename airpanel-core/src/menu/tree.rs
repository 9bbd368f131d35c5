//! Menu tree description and arena storage

use super::leaf::LeafAction;

/// Menu description used to build a [`MenuEngine`](super::MenuEngine)
pub enum MenuItem {
    /// Enterable list of items
    List {
        label: String,
        children: Vec<MenuItem>,
    },
    /// Selectable action
    Leaf {
        label: String,
        action: Box<dyn LeafAction>,
    },
}

impl MenuItem {
    /// Create a list item
    pub fn list(label: impl Into<String>, children: Vec<MenuItem>) -> Self {
        MenuItem::List {
            label: label.into(),
            children,
        }
    }

    /// Create a leaf item
    pub fn leaf(label: impl Into<String>, action: impl LeafAction + 'static) -> Self {
        MenuItem::Leaf {
            label: label.into(),
            action: Box::new(action),
        }
    }

    /// Label shown for this item
    pub fn label(&self) -> &str {
        match self {
            MenuItem::List { label, .. } | MenuItem::Leaf { label, .. } => label,
        }
    }
}

/// Index of a node in the engine's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Navigation state of a list
#[derive(Debug, Default)]
pub(crate) struct ListState {
    pub children: Vec<NodeId>,
    pub selected: usize,
    pub viewport_start: usize,
}

pub(crate) enum NodeKind {
    List(ListState),
    Leaf(Box<dyn LeafAction>),
}

pub(crate) struct MenuNode {
    pub label: String,
    /// Back link used to ascend; ownership stays with the arena
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

/// Flatten `item` into `nodes` depth-first; returns the id of `item`
pub(crate) fn flatten(item: MenuItem, parent: Option<NodeId>, nodes: &mut Vec<MenuNode>) -> NodeId {
    let id = NodeId(nodes.len());
    match item {
        MenuItem::Leaf { label, action } => {
            nodes.push(MenuNode {
                label,
                parent,
                kind: NodeKind::Leaf(action),
            });
        }
        MenuItem::List { label, children } => {
            nodes.push(MenuNode {
                label,
                parent,
                kind: NodeKind::List(ListState::default()),
            });
            let ids: Vec<NodeId> = children
                .into_iter()
                .map(|child| flatten(child, Some(id), nodes))
                .collect();
            if let NodeKind::List(list) = &mut nodes[id.0].kind {
                list.children = ids;
            }
        }
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut String) {}

    #[test]
    fn test_flatten_links_parents() {
        let tree = MenuItem::list(
            "root",
            vec![
                MenuItem::leaf("a", noop),
                MenuItem::list("sub", vec![MenuItem::leaf("b", noop)]),
            ],
        );
        let mut nodes = Vec::new();
        let root = flatten(tree, None, &mut nodes);

        assert_eq!(root, NodeId(0));
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[1].label, "a");
        assert_eq!(nodes[1].parent, Some(NodeId(0)));
        assert_eq!(nodes[3].label, "b");
        assert_eq!(nodes[3].parent, Some(NodeId(2)));
        match &nodes[0].kind {
            NodeKind::List(list) => assert_eq!(list.children, vec![NodeId(1), NodeId(2)]),
            NodeKind::Leaf(_) => panic!("root is a list"),
        }
    }
}
