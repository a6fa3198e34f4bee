//! Arena DOM that html5ever parses submitted fragments into.

use html5ever::{LocalName, QualName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HtmlNodeId(pub u32);

impl HtmlNodeId {
    pub const NONE: HtmlNodeId = HtmlNodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

#[derive(Debug, Clone)]
pub enum HtmlNodeData {
    Document,
    Element {
        name: QualName,
        /// Attribute local names with their values.
        attrs: Vec<(LocalName, String)>,
    },
    Text(String),
    /// Comments, doctypes and processing instructions; never rendered.
    Ignored,
}

#[derive(Debug)]
pub struct HtmlArenaNode {
    pub data: HtmlNodeData,
    pub parent: HtmlNodeId,
    pub first_child: HtmlNodeId,
    pub last_child: HtmlNodeId,
    pub prev_sibling: HtmlNodeId,
    pub next_sibling: HtmlNodeId,
}

impl HtmlArenaNode {
    fn new(data: HtmlNodeData) -> Self {
        Self {
            data,
            parent: HtmlNodeId::NONE,
            first_child: HtmlNodeId::NONE,
            last_child: HtmlNodeId::NONE,
            prev_sibling: HtmlNodeId::NONE,
            next_sibling: HtmlNodeId::NONE,
        }
    }
}

#[derive(Debug)]
pub struct HtmlDom {
    nodes: Vec<HtmlArenaNode>,
    document: HtmlNodeId,
}

impl HtmlDom {
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: HtmlNodeId::NONE,
        };
        dom.document = dom.alloc(HtmlNodeData::Document);
        dom
    }

    fn alloc(&mut self, data: HtmlNodeData) -> HtmlNodeId {
        let id = HtmlNodeId(self.nodes.len() as u32);
        self.nodes.push(HtmlArenaNode::new(data));
        id
    }

    pub fn document(&self) -> HtmlNodeId {
        self.document
    }

    pub fn get(&self, id: HtmlNodeId) -> Option<&HtmlArenaNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: HtmlNodeId) -> Option<&mut HtmlArenaNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn create_element(&mut self, name: QualName, attrs: Vec<(LocalName, String)>) -> HtmlNodeId {
        self.alloc(HtmlNodeData::Element { name, attrs })
    }

    pub fn create_text(&mut self, text: String) -> HtmlNodeId {
        self.alloc(HtmlNodeData::Text(text))
    }

    pub fn create_ignored(&mut self) -> HtmlNodeId {
        self.alloc(HtmlNodeData::Ignored)
    }

    pub fn append(&mut self, parent: HtmlNodeId, child: HtmlNodeId) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(HtmlNodeId::NONE);

        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
            node.prev_sibling = last_child;
            node.next_sibling = HtmlNodeId::NONE;
        }
        if let Some(last) = self.get_mut(last_child) {
            last.next_sibling = child;
        }
        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    pub fn insert_before(&mut self, sibling: HtmlNodeId, new_node: HtmlNodeId) {
        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }
        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }
        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Append text, extending the last child when it is already text.
    pub fn append_text(&mut self, parent: HtmlNodeId, text: &str) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(HtmlNodeId::NONE);
        if let Some(last) = self.get_mut(last_child)
            && let HtmlNodeData::Text(existing) = &mut last.data
        {
            existing.push_str(text);
            return;
        }
        let node = self.create_text(text.to_string());
        self.append(parent, node);
    }

    /// Insert text before `sibling`, extending a preceding text node if any.
    pub fn insert_text_before(&mut self, sibling: HtmlNodeId, text: &str) {
        let prev = self.get(sibling).map(|n| n.prev_sibling).unwrap_or(HtmlNodeId::NONE);
        if let Some(prev_node) = self.get_mut(prev)
            && let HtmlNodeData::Text(existing) = &mut prev_node.data
        {
            existing.push_str(text);
            return;
        }
        let node = self.create_text(text.to_string());
        self.insert_before(sibling, node);
    }

    pub fn detach(&mut self, target: HtmlNodeId) {
        let (parent, prev, next) = match self.get(target) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(target) {
            node.parent = HtmlNodeId::NONE;
            node.prev_sibling = HtmlNodeId::NONE;
            node.next_sibling = HtmlNodeId::NONE;
        }
    }

    pub fn children(&self, parent: HtmlNodeId) -> HtmlChildren<'_> {
        let first = self.get(parent).map(|n| n.first_child).unwrap_or(HtmlNodeId::NONE);
        HtmlChildren {
            dom: self,
            current: first,
        }
    }

    /// First element with the given local name, depth first.
    pub fn find_by_tag(&self, tag: &str) -> Option<HtmlNodeId> {
        let mut stack = vec![self.document];
        while let Some(id) = stack.pop() {
            if self.element_name(id).is_some_and(|name| name.as_ref() == tag) {
                return Some(id);
            }
            let mut children: Vec<_> = self.children(id).collect();
            children.reverse();
            stack.extend(children);
        }
        None
    }

    pub fn element_name(&self, id: HtmlNodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            HtmlNodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    pub fn get_attr(&self, id: HtmlNodeId, attr_name: &str) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            HtmlNodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(name, _)| name.as_ref() == attr_name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        })
    }

    pub fn text(&self, id: HtmlNodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            HtmlNodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

impl Default for HtmlDom {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HtmlChildren<'a> {
    dom: &'a HtmlDom,
    current: HtmlNodeId,
}

impl Iterator for HtmlChildren<'_> {
    type Item = HtmlNodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .dom
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(HtmlNodeId::NONE);
        Some(id)
    }
}
