use std::collections::HashMap;

use crate::html::{escape_html_attr, escape_html_text, is_void_tag};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    children: Vec<NodeId>,
    node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
    pub(crate) value: String,
}

/// Arena-backed document tree. Nodes are never freed; cleared children stay
/// in the arena, unreachable.
#[derive(Debug, Clone)]
pub(crate) struct Dom {
    nodes: Vec<Node>,
    pub(crate) root: NodeId,
    id_index: HashMap<String, NodeId>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    fn create_node(&mut self, parent: NodeId, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            children: Vec::new(),
            node_type,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let value = attrs.get("value").cloned().unwrap_or_default();
        let id_attr = attrs.get("id").cloned();
        let element = Element {
            tag_name,
            attrs,
            value,
        };
        let id = self.create_node(parent, NodeType::Element(element));
        // first element wins, like getElementById
        if let Some(id_attr) = id_attr {
            self.id_index.entry(id_attr).or_insert(id);
        }
        id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(parent, NodeType::Text(text))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes[node_id.0].node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[node_id.0].node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|element| element.attrs.get(name).cloned())
    }

    pub(crate) fn value(&self, node_id: NodeId) -> Result<String> {
        self.element(node_id)
            .map(|element| element.value.clone())
            .ok_or_else(|| Error::TypeMismatch {
                selector: format!("node {}", node_id.0),
                expected: "element".into(),
                actual: "non-element".into(),
            })
    }

    pub(crate) fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::TypeMismatch {
                selector: format!("node {}", node_id.0),
                expected: "element".into(),
                actual: "non-element".into(),
            })?;
        element.value = value.to_string();
        Ok(())
    }

    pub(crate) fn class_contains(&self, node_id: NodeId, class_name: &str) -> bool {
        self.element(node_id)
            .map(|element| has_class(element, class_name))
            .unwrap_or(false)
    }

    pub(crate) fn class_add(&mut self, node_id: NodeId, class_name: &str) {
        let Some(element) = self.element_mut(node_id) else {
            return;
        };
        let mut classes = class_tokens(element.attrs.get("class").map(String::as_str));
        if !classes.iter().any(|name| name == class_name) {
            classes.push(class_name.to_string());
        }
        set_class_attr(element, &classes);
    }

    pub(crate) fn class_remove(&mut self, node_id: NodeId, class_name: &str) {
        let Some(element) = self.element_mut(node_id) else {
            return;
        };
        let mut classes = class_tokens(element.attrs.get("class").map(String::as_str));
        classes.retain(|name| name != class_name);
        set_class_attr(element, &classes);
    }

    pub(crate) fn clear_children(&mut self, node_id: NodeId) {
        self.nodes[node_id.0].children.clear();
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node_id];
        while let Some(current) = stack.pop() {
            match &self.nodes[current.0].node_type {
                NodeType::Text(text) => out.push_str(text),
                NodeType::Document | NodeType::Element(_) => {
                    stack.extend(self.nodes[current.0].children.iter().rev().copied());
                }
            }
        }
        out
    }

    /// Controls under `form` that contribute to a submission, in document
    /// order: named, enabled `<input>` and `<textarea>` elements, excluding
    /// button-like and file inputs and unchecked checkboxes and radios.
    pub(crate) fn form_fields(&self, form: NodeId) -> Vec<(String, String)> {
        self.descendant_elements(form)
            .into_iter()
            .filter(|id| self.is_successful_control(*id))
            .filter_map(|id| {
                let element = self.element(id)?;
                let name = element.attrs.get("name")?;
                Some((name.clone(), element.value.clone()))
            })
            .collect()
    }

    fn is_successful_control(&self, node_id: NodeId) -> bool {
        let Some(element) = self.element(node_id) else {
            return false;
        };
        if element.attrs.contains_key("disabled") {
            return false;
        }
        if element.attrs.get("name").is_none_or(|name| name.is_empty()) {
            return false;
        }

        if element.tag_name.eq_ignore_ascii_case("textarea") {
            return true;
        }
        if !element.tag_name.eq_ignore_ascii_case("input") {
            return false;
        }
        let kind = element
            .attrs
            .get("type")
            .map(|kind| kind.to_ascii_lowercase())
            .unwrap_or_default();
        match kind.as_str() {
            "button" | "submit" | "reset" | "file" | "image" => false,
            "checkbox" | "radio" => element.attrs.contains_key("checked"),
            _ => true,
        }
    }

    /// Element descendants of `node_id` in document order, excluding itself.
    fn descendant_elements(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = self.nodes[node_id.0]
            .children
            .iter()
            .rev()
            .copied()
            .collect::<Vec<_>>();
        while let Some(current) = stack.pop() {
            if self.element(current).is_some() {
                out.push(current);
            }
            stack.extend(self.nodes[current.0].children.iter().rev().copied());
        }
        out
    }

    pub(crate) fn inner_html(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(&self.nodes[node_id.0].children, &mut out);
        out
    }

    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(&[node_id], &mut out);
        out
    }

    fn serialize_into(&self, roots: &[NodeId], out: &mut String) {
        let mut stack = roots
            .iter()
            .rev()
            .map(|id| Walk::Enter(*id))
            .collect::<Vec<_>>();
        while let Some(step) = stack.pop() {
            let node_id = match step {
                Walk::Enter(node_id) => node_id,
                Walk::Close(node_id) => {
                    if let Some(element) = self.element(node_id) {
                        out.push_str("</");
                        out.push_str(&element.tag_name);
                        out.push('>');
                    }
                    continue;
                }
            };
            let node = &self.nodes[node_id.0];
            match &node.node_type {
                NodeType::Document => {}
                NodeType::Text(text) => {
                    out.push_str(&escape_html_text(text));
                    continue;
                }
                NodeType::Element(element) => {
                    let mut attrs = element.attrs.iter().collect::<Vec<_>>();
                    attrs.sort_by(|a, b| a.0.cmp(b.0));

                    out.push('<');
                    out.push_str(&element.tag_name);
                    for (k, v) in attrs {
                        out.push(' ');
                        out.push_str(k);
                        out.push_str("=\"");
                        out.push_str(&escape_html_attr(v));
                        out.push('"');
                    }
                    out.push('>');
                    if is_void_tag(&element.tag_name) {
                        continue;
                    }
                    stack.push(Walk::Close(node_id));
                }
            }
            stack.extend(node.children.iter().rev().map(|id| Walk::Enter(*id)));
        }
    }
}

/// Step of the explicit-stack serializer.
enum Walk {
    Enter(NodeId),
    Close(NodeId),
}

fn has_class(element: &Element, class_name: &str) -> bool {
    element
        .attrs
        .get("class")
        .map(|classes| classes.split_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

fn class_tokens(class_attr: Option<&str>) -> Vec<String> {
    class_attr
        .map(|value| {
            value
                .split_whitespace()
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

fn set_class_attr(element: &mut Element, classes: &[String]) {
    if classes.is_empty() {
        element.attrs.remove("class");
    } else {
        element.attrs.insert("class".to_string(), classes.join(" "));
    }
}
