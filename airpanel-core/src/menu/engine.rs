//! Menu navigation state machine

use airpanel_display::{Batch, Display, Key};
use log::{debug, trace};

use super::tree::{flatten, ListState, MenuItem, MenuNode, NodeId, NodeKind};
use super::MenuError;

/// Rows touched by one navigation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redraw {
    /// Nothing visible changed
    Nothing,
    /// Only these viewport rows changed
    Rows(heapless::Vec<usize, 2>),
    /// The whole viewport changed
    Viewport,
    /// Cancel at the root: the menu is closed
    Closed,
}

impl Redraw {
    fn rows(rows: &[usize]) -> Self {
        let mut changed = heapless::Vec::new();
        for &row in rows {
            let _ = changed.push(row);
        }
        Redraw::Rows(changed)
    }
}

/// Navigation over a menu tree with a fixed-height viewport
///
/// Invariants kept for the active list after every step:
/// `viewport_start <= selected < viewport_start + rows` and
/// `viewport_start <= max(0, len - rows)`.
pub struct MenuEngine {
    nodes: Vec<MenuNode>,
    root: NodeId,
    active: NodeId,
    rows: usize,
}

impl MenuEngine {
    /// Build the engine for a tree whose root must be a list
    pub fn new(root: MenuItem, rows: usize) -> Result<Self, MenuError> {
        if rows == 0 {
            return Err(MenuError::ZeroRows);
        }
        if !matches!(root, MenuItem::List { .. }) {
            return Err(MenuError::RootNotList);
        }
        let mut nodes = Vec::new();
        let root = flatten(root, None, &mut nodes);
        debug!("menu built: {} nodes, {} rows", nodes.len(), rows);
        Ok(Self {
            nodes,
            root,
            active: root,
            rows,
        })
    }

    /// Viewport height
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Root list
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// List currently shown
    pub fn active(&self) -> NodeId {
        self.active
    }

    /// Label of a node
    pub fn label(&self, id: NodeId) -> &str {
        &self.nodes[id.0].label
    }

    /// Number of lists above the active one
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.active;
        while let Some(parent) = self.nodes[node.0].parent {
            depth += 1;
            node = parent;
        }
        depth
    }

    /// Selected index in the active list
    pub fn selected(&self) -> usize {
        self.list(self.active).map_or(0, |list| list.selected)
    }

    /// First visible index of the active list
    pub fn viewport_start(&self) -> usize {
        self.list(self.active).map_or(0, |list| list.viewport_start)
    }

    /// Number of items in the active list
    pub fn len(&self) -> usize {
        self.list(self.active).map_or(0, |list| list.children.len())
    }

    /// Check if the active list has no items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Labels currently inside the viewport
    pub fn visible(&self) -> Vec<&str> {
        let Some(list) = self.list(self.active) else {
            return Vec::new();
        };
        list.children
            .iter()
            .skip(list.viewport_start)
            .take(self.rows)
            .map(|&child| self.label(child))
            .collect()
    }

    /// Viewport row of the selection, if the list has items
    pub fn highlighted_row(&self) -> Option<usize> {
        let list = self.list(self.active)?;
        if list.children.is_empty() {
            None
        } else {
            Some(list.selected - list.viewport_start)
        }
    }

    /// Prepare the active list for a full draw
    pub fn open(&mut self) -> Redraw {
        self.refresh_labels(self.active);
        Redraw::Viewport
    }

    /// Return to the root, resetting every list on the way
    pub fn close(&mut self) {
        let mut node = Some(self.active);
        while let Some(id) = node {
            if let Some(list) = self.list_mut(id) {
                list.selected = 0;
                list.viewport_start = 0;
            }
            node = self.nodes[id.0].parent;
        }
        self.active = self.root;
    }

    /// Apply one key to the navigation state
    pub fn navigate(&mut self, key: Key) -> Redraw {
        let redraw = match key {
            Key::Up => self.step(false),
            Key::Down => self.step(true),
            Key::Ok => self.confirm(),
            Key::Cancel => self.cancel(),
        };
        trace!(
            "{:?}: selected {} viewport {} -> {:?}",
            key,
            self.selected(),
            self.viewport_start(),
            redraw
        );
        redraw
    }

    /// Apply one key and draw the result as a single frame
    pub fn handle_key(&mut self, key: Key, display: &mut dyn Display) -> Result<Redraw, MenuError> {
        let redraw = self.navigate(key);
        self.draw(display, &redraw)?;
        Ok(redraw)
    }

    /// Draw the rows named by `redraw` inside one display batch
    pub fn draw(&self, display: &mut dyn Display, redraw: &Redraw) -> Result<(), MenuError> {
        let mut batch = Batch::new(display);
        match redraw {
            Redraw::Nothing | Redraw::Closed => {}
            Redraw::Viewport => self.draw_viewport(&mut *batch)?,
            Redraw::Rows(rows) => {
                for &row in rows {
                    self.draw_row(&mut *batch, row)?;
                }
            }
        }
        batch.finish()?;
        Ok(())
    }

    /// Draw the whole viewport
    pub fn redraw(&self, display: &mut dyn Display) -> Result<(), MenuError> {
        self.draw(display, &Redraw::Viewport)
    }

    fn draw_viewport(&self, display: &mut dyn Display) -> Result<(), MenuError> {
        let lines = self.visible();
        display.print_lines(&lines, self.highlighted_row())?;
        Ok(())
    }

    fn draw_row(&self, display: &mut dyn Display, row: usize) -> Result<(), MenuError> {
        let Some(list) = self.list(self.active) else {
            return Ok(());
        };
        let index = list.viewport_start + row;
        let Some(&child) = list.children.get(index) else {
            return Ok(());
        };
        display.update_row(row, self.label(child), 0, index == list.selected, true)?;
        Ok(())
    }

    fn step(&mut self, down: bool) -> Redraw {
        let rows = self.rows;
        let Some(list) = self.list_mut(self.active) else {
            return Redraw::Nothing;
        };
        let old = list.selected;
        let new = if down {
            if old + 1 >= list.children.len() {
                return Redraw::Nothing;
            }
            old + 1
        } else {
            if old == 0 {
                return Redraw::Nothing;
            }
            old - 1
        };
        list.selected = new;

        if new < list.viewport_start {
            list.viewport_start = new;
            Redraw::Viewport
        } else if new >= list.viewport_start + rows {
            list.viewport_start = new + 1 - rows;
            Redraw::Viewport
        } else {
            let start = list.viewport_start;
            Redraw::rows(&[old - start, new - start])
        }
    }

    fn confirm(&mut self) -> Redraw {
        let Some(list) = self.list(self.active) else {
            return Redraw::Nothing;
        };
        let Some(&child) = list.children.get(list.selected) else {
            return Redraw::Nothing;
        };
        let row = list.selected - list.viewport_start;

        if self.list(child).is_some() {
            self.active = child;
            self.refresh_labels(child);
            debug!("entered {}", self.label(child));
            return Redraw::Viewport;
        }

        let MenuNode {
            label,
            kind: NodeKind::Leaf(action),
            ..
        } = &mut self.nodes[child.0]
        else {
            return Redraw::Nothing;
        };
        let before = label.clone();
        action.activate(label);
        if *label != before {
            Redraw::rows(&[row])
        } else {
            Redraw::Nothing
        }
    }

    fn cancel(&mut self) -> Redraw {
        if let Some(list) = self.list_mut(self.active) {
            list.selected = 0;
            list.viewport_start = 0;
        }
        match self.nodes[self.active.0].parent {
            Some(parent) => {
                self.active = parent;
                self.refresh_labels(parent);
                Redraw::Viewport
            }
            None => Redraw::Closed,
        }
    }

    fn refresh_labels(&mut self, id: NodeId) {
        let Some(list) = self.list(id) else {
            return;
        };
        for child in list.children.clone() {
            if let MenuNode {
                label,
                kind: NodeKind::Leaf(action),
                ..
            } = &mut self.nodes[child.0]
            {
                action.refresh(label);
            }
        }
    }

    fn list(&self, id: NodeId) -> Option<&ListState> {
        match &self.nodes[id.0].kind {
            NodeKind::List(list) => Some(list),
            NodeKind::Leaf(_) => None,
        }
    }

    fn list_mut(&mut self, id: NodeId) -> Option<&mut ListState> {
        match &mut self.nodes[id.0].kind {
            NodeKind::List(list) => Some(list),
            NodeKind::Leaf(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::Toggle;
    use airpanel_display::TextDisplay;
    use proptest::prelude::*;

    fn noop(_: &mut String) {}

    fn leaves(n: usize) -> Vec<MenuItem> {
        (0..n).map(|i| MenuItem::leaf(format!("item {}", i), noop)).collect()
    }

    fn rows(r: &[usize]) -> Redraw {
        Redraw::Rows(heapless::Vec::from_slice(r).unwrap())
    }

    fn nested() -> MenuEngine {
        MenuEngine::new(
            MenuItem::list(
                "",
                vec![
                    MenuItem::leaf("first", noop),
                    MenuItem::list("Network", leaves(3)),
                    MenuItem::list("Sensors", vec![MenuItem::leaf("Sensors", Toggle::new("Sensors", false))]),
                    MenuItem::list("Empty", Vec::new()),
                ],
            ),
            4,
        )
        .unwrap()
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            MenuEngine::new(MenuItem::list("", leaves(2)), 0),
            Err(MenuError::ZeroRows)
        ));
        assert!(matches!(
            MenuEngine::new(MenuItem::leaf("x", noop), 4),
            Err(MenuError::RootNotList)
        ));
    }

    #[test]
    fn test_ten_leaves_four_rows() {
        let mut menu = MenuEngine::new(MenuItem::list("", leaves(10)), 4).unwrap();
        assert_eq!((menu.selected(), menu.viewport_start()), (0, 0));

        let mut redraws = Vec::new();
        for _ in 0..6 {
            redraws.push(menu.navigate(Key::Down));
        }
        assert_eq!((menu.selected(), menu.viewport_start()), (6, 3));
        assert_eq!(
            redraws,
            vec![
                rows(&[0, 1]),
                rows(&[1, 2]),
                rows(&[2, 3]),
                Redraw::Viewport,
                Redraw::Viewport,
                Redraw::Viewport,
            ]
        );

        assert_eq!(menu.navigate(Key::Up), rows(&[3, 2]));
        assert_eq!((menu.selected(), menu.viewport_start()), (5, 3));
        assert_eq!(menu.visible(), vec!["item 3", "item 4", "item 5", "item 6"]);
        assert_eq!(menu.highlighted_row(), Some(2));
    }

    #[test]
    fn test_up_scrolls_at_top() {
        let mut menu = MenuEngine::new(MenuItem::list("", leaves(10)), 4).unwrap();
        for _ in 0..9 {
            menu.navigate(Key::Down);
        }
        assert_eq!((menu.selected(), menu.viewport_start()), (9, 6));
        assert_eq!(menu.navigate(Key::Down), Redraw::Nothing);
        for _ in 0..3 {
            menu.navigate(Key::Up);
        }
        assert_eq!((menu.selected(), menu.viewport_start()), (6, 6));
        assert_eq!(menu.navigate(Key::Up), Redraw::Viewport);
        assert_eq!((menu.selected(), menu.viewport_start()), (5, 5));
    }

    #[test]
    fn test_enter_and_leave() {
        let mut menu = nested();
        menu.navigate(Key::Down);
        assert_eq!(menu.navigate(Key::Ok), Redraw::Viewport);
        assert_eq!(menu.label(menu.active()), "Network");
        assert_eq!(menu.depth(), 1);

        menu.navigate(Key::Down);
        menu.navigate(Key::Down);
        assert_eq!(menu.selected(), 2);

        assert_eq!(menu.navigate(Key::Cancel), Redraw::Viewport);
        assert_eq!(menu.depth(), 0);
        // Parent keeps its selection
        assert_eq!(menu.selected(), 1);

        // Child was reset on the way out
        menu.navigate(Key::Ok);
        assert_eq!(menu.selected(), 0);
        menu.navigate(Key::Cancel);

        assert_eq!(menu.navigate(Key::Cancel), Redraw::Closed);
        assert_eq!(menu.selected(), 0);
    }

    #[test]
    fn test_leaf_relabel_redraws_one_row() {
        let mut menu = nested();
        menu.navigate(Key::Down);
        menu.navigate(Key::Down);
        menu.navigate(Key::Ok);
        assert_eq!(menu.navigate(Key::Ok), rows(&[0]));
        assert_eq!(menu.visible(), vec!["Sensors ✓"]);

        menu.navigate(Key::Cancel);
        menu.navigate(Key::Up);
        menu.navigate(Key::Up);
        assert_eq!(menu.selected(), 0);
        assert_eq!(menu.navigate(Key::Ok), Redraw::Nothing);
    }

    #[test]
    fn test_empty_and_single_lists() {
        let mut menu = nested();
        for _ in 0..3 {
            menu.navigate(Key::Down);
        }
        menu.navigate(Key::Ok);
        assert!(menu.is_empty());
        for key in [Key::Up, Key::Down, Key::Ok] {
            assert_eq!(menu.navigate(key), Redraw::Nothing);
        }
        assert_eq!(menu.highlighted_row(), None);

        let mut single = MenuEngine::new(MenuItem::list("", leaves(1)), 4).unwrap();
        assert_eq!(single.navigate(Key::Up), Redraw::Nothing);
        assert_eq!(single.navigate(Key::Down), Redraw::Nothing);
    }

    #[test]
    fn test_close_from_depth() {
        let mut menu = nested();
        menu.navigate(Key::Down);
        menu.navigate(Key::Ok);
        menu.navigate(Key::Down);
        menu.close();
        assert_eq!(menu.active(), menu.root());
        assert_eq!(menu.selected(), 0);
    }

    #[test]
    fn test_draw_one_frame_per_key() {
        let mut display = TextDisplay::new(4, 16);
        let mut menu = MenuEngine::new(MenuItem::list("", leaves(10)), 4).unwrap();
        menu.redraw(&mut display).unwrap();
        assert_eq!(display.line(0), "item 0");
        assert_eq!(display.highlighted(), Some(0));

        let before = display.frames();
        menu.handle_key(Key::Down, &mut display).unwrap();
        assert_eq!(display.frames(), before + 1);
        assert_eq!(display.highlighted(), Some(1));

        for _ in 0..3 {
            menu.handle_key(Key::Down, &mut display).unwrap();
        }
        assert_eq!(display.frames(), before + 4);
        assert_eq!(display.line(0), "item 1");
        assert_eq!(display.line(3), "item 4");
        assert_eq!(display.highlighted(), Some(3));

        let frames = display.frames();
        menu.handle_key(Key::Up, &mut display).unwrap();
        assert_eq!(display.highlighted(), Some(2));
        assert_eq!(display.line(2).trim_end(), "item 3");
        assert_eq!(display.frames(), frames + 1);
    }

    proptest! {
        #[test]
        fn test_viewport_invariant(
            len in 0usize..30,
            rows in 1usize..8,
            keys in proptest::collection::vec(any::<bool>(), 0..80),
        ) {
            let mut menu = MenuEngine::new(MenuItem::list("", leaves(len)), rows).unwrap();
            for down in keys {
                let redraw = menu.navigate(if down { Key::Down } else { Key::Up });
                let (selected, start) = (menu.selected(), menu.viewport_start());
                prop_assert!(start <= selected);
                prop_assert!(len == 0 || selected < start + rows);
                prop_assert!(start <= len.saturating_sub(rows));
                prop_assert!(len == 0 || selected < len);
                if let Redraw::Rows(changed) = redraw {
                    prop_assert_eq!(changed.len(), 2);
                    prop_assert!(changed.iter().all(|&row| row < rows));
                }
            }
        }
    }
}
