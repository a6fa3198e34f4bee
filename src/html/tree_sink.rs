//! html5ever TreeSink implementation for [`HtmlDom`].

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, QualName, local_name, ns};

use super::arena::{HtmlDom, HtmlNodeData, HtmlNodeId};

/// Handle used by the tree builder to reference nodes.
///
/// The element name travels with the handle so `elem_name` can hand out a
/// reference without reaching into the `RefCell`.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    pub id: HtmlNodeId,
    name: Rc<QualName>,
}

impl NodeHandle {
    fn new(id: HtmlNodeId, name: Rc<QualName>) -> Self {
        Self { id, name }
    }
}

fn empty_name() -> QualName {
    QualName::new(None, ns!(), local_name!(""))
}

/// TreeSink that builds an [`HtmlDom`].
///
/// html5ever's TreeSink takes `&self`, so the DOM sits behind a `RefCell`.
pub struct HtmlSink {
    dom: RefCell<HtmlDom>,
    no_name: Rc<QualName>,
}

impl Default for HtmlSink {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlSink {
    pub fn new() -> Self {
        Self {
            dom: RefCell::new(HtmlDom::new()),
            no_name: Rc::new(empty_name()),
        }
    }

    pub fn into_dom(self) -> HtmlDom {
        self.dom.into_inner()
    }

    fn handle(&self, id: HtmlNodeId) -> NodeHandle {
        NodeHandle::new(id, Rc::clone(&self.no_name))
    }
}

impl TreeSink for HtmlSink {
    type Handle = NodeHandle;
    type Output = Self;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {
        // Lenient like browsers: malformed fragments still produce a tree.
    }

    fn get_document(&self) -> Self::Handle {
        self.handle(self.dom.borrow().document())
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        &target.name
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs = attrs
            .into_iter()
            .map(|a| (a.name.local, a.value.to_string()))
            .collect();
        let shared = Rc::new(name.clone());
        let id = self.dom.borrow_mut().create_element(name, attrs);
        NodeHandle::new(id, shared)
    }

    fn create_comment(&self, _text: StrTendril) -> Self::Handle {
        let id = self.dom.borrow_mut().create_ignored();
        self.handle(id)
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        let id = self.dom.borrow_mut().create_ignored();
        self.handle(id)
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let mut dom = self.dom.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => dom.append(parent.id, node.id),
            NodeOrText::AppendText(text) => dom.append_text(parent.id, &text),
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self
            .dom
            .borrow()
            .get(element.id)
            .is_some_and(|n| n.parent.is_some());
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        target.clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x.id == y.id
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut dom = self.dom.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) => dom.insert_before(sibling.id, node.id),
            NodeOrText::AppendText(text) => dom.insert_text_before(sibling.id, &text),
        }
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut dom = self.dom.borrow_mut();
        if let Some(node) = dom.get_mut(target.id)
            && let HtmlNodeData::Element {
                attrs: existing, ..
            } = &mut node.data
        {
            for attr in attrs {
                if !existing.iter().any(|(name, _)| *name == attr.name.local) {
                    existing.push((attr.name.local, attr.value.to_string()));
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.dom.borrow_mut().detach(target.id);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut dom = self.dom.borrow_mut();
        let children: Vec<_> = dom.children(node.id).collect();
        for child in children {
            dom.detach(child);
            dom.append(new_parent.id, child);
        }
    }
}
