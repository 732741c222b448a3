//! Host document model
//!
//! [`FormHost`] is the seam to whatever renders the form: it hands out
//! control handles in document order, answers the structural questions the
//! matchers ask (labels, block-level neighbours), and accepts writes.
//! [`FormDocument`] is the in-memory host used by the CLI and tests,
//! loaded from YAML or JSON.

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tags whose elements bound a date group
pub const BLOCK_TAGS: [&str; 4] = ["div", "fieldset", "section", "tr"];

/// Input types that are never filled
const UNFILLABLE_INPUT_TYPES: [&str; 3] = ["hidden", "password", "file"];

/// Opaque reference to one control of a host document
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct ControlHandle(pub usize);

impl std::fmt::Display for ControlHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Host document/UI layer
pub trait FormHost {
    /// All controls, in document order
    fn controls(&self) -> Vec<ControlHandle>;

    fn control(&self, handle: ControlHandle) -> Option<&Control>;

    /// Text of a label explicitly associated with the element id
    fn explicit_label(&self, control_id: &str) -> Option<&str>;

    /// Text of the nearest label element enclosing the control
    fn enclosing_label(&self, handle: ControlHandle) -> Option<&str>;

    /// Every control inside the nearest block-level ancestor, the control
    /// itself included. Empty when the control has no block-level ancestor.
    fn block_members(&self, handle: ControlHandle) -> Vec<ControlHandle>;

    /// Write a value; true only when the control's observable state changed
    fn write_value(&mut self, handle: ControlHandle, value: &str) -> bool;

    /// Visual feedback for a filled (or rejected) control
    fn mark_filled(&mut self, handle: ControlHandle, accepted: bool);
}

/// Kind of form control element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    #[default]
    Input,
    Select,
    Textarea,
}

impl ControlKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ControlKind::Input => "input",
            ControlKind::Select => "select",
            ControlKind::Textarea => "textarea",
        }
    }
}

/// One selectable option of a dropdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectOption {
    /// Underlying value
    #[serde(default)]
    pub value: String,
    /// Visible text
    #[serde(default)]
    pub text: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
        }
    }
}

/// A form control with its live attribute state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Control {
    #[serde(default)]
    pub kind: ControlKind,
    /// `type` attribute for inputs; ignored for other kinds
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub placeholder: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub aria_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub autocomplete: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class_name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    /// Current value
    #[serde(default)]
    pub value: String,
    /// Fill feedback set by the last pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled: Option<bool>,
}

impl Control {
    pub fn input(input_type: &str) -> Self {
        Self {
            kind: ControlKind::Input,
            input_type: Some(input_type.to_string()),
            ..Self::default()
        }
    }

    pub fn select(options: Vec<SelectOption>) -> Self {
        Self {
            kind: ControlKind::Select,
            options,
            ..Self::default()
        }
    }

    pub fn textarea() -> Self {
        Self {
            kind: ControlKind::Textarea,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = placeholder.to_string();
        self
    }

    pub fn with_aria_label(mut self, aria_label: &str) -> Self {
        self.aria_label = aria_label.to_string();
        self
    }

    pub fn with_autocomplete(mut self, autocomplete: &str) -> Self {
        self.autocomplete = autocomplete.to_string();
        self
    }

    /// Effective type: the input type (default `text`), or the element kind
    pub fn effective_type(&self) -> String {
        match self.kind {
            ControlKind::Input => self
                .input_type
                .as_deref()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "text".to_string()),
            ControlKind::Select => "select".to_string(),
            ControlKind::Textarea => "textarea".to_string(),
        }
    }

    pub fn is_fillable(&self) -> bool {
        if self.disabled || self.readonly {
            return false;
        }
        match self.kind {
            ControlKind::Input => !UNFILLABLE_INPUT_TYPES.contains(&self.effective_type().as_str()),
            ControlKind::Select | ControlKind::Textarea => true,
        }
    }
}

/// Node of a form document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "node", rename_all = "lowercase")]
pub enum Node {
    /// Any container element (`div`, `fieldset`, `form`, `tr`, ...)
    Element {
        #[serde(default = "default_tag")]
        tag: String,
        #[serde(default)]
        children: Vec<Node>,
    },
    /// A `<label>`, optionally associated by `for`, optionally wrapping controls
    Label {
        #[serde(default, rename = "for", skip_serializing_if = "Option::is_none")]
        for_id: Option<String>,
        #[serde(default)]
        text: String,
        #[serde(default)]
        children: Vec<Node>,
    },
    Control(Control),
}

fn default_tag() -> String {
    "div".to_string()
}

/// Serialized form document: a list of top-level nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSource {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
struct ControlSlot {
    control: Control,
    enclosing_label: Option<String>,
    block: Option<usize>,
}

/// In-memory host document
#[derive(Debug, Clone)]
pub struct FormDocument {
    title: Option<String>,
    slots: Vec<ControlSlot>,
    labels_by_id: HashMap<String, String>,
    blocks: Vec<Vec<ControlHandle>>,
}

impl FormDocument {
    /// Build from top-level nodes
    pub fn new(nodes: Vec<Node>) -> Self {
        Self::from_source(FormSource { title: None, nodes })
    }

    pub fn from_source(source: FormSource) -> Self {
        let mut doc = FormDocument {
            title: source.title,
            slots: Vec::new(),
            labels_by_id: HashMap::new(),
            blocks: Vec::new(),
        };
        let mut block_stack = Vec::new();
        for node in source.nodes {
            doc.index_node(node, &mut block_stack, None);
        }
        doc
    }

    /// Parse a YAML form description
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let source: FormSource =
            serde_norway::from_str(yaml).map_err(|e| Error::DocumentParse(e.to_string()))?;
        Ok(Self::from_source(source))
    }

    /// Parse a JSON form description
    pub fn from_json(json: &str) -> Result<Self> {
        let source: FormSource =
            serde_json::from_str(json).map_err(|e| Error::DocumentParse(e.to_string()))?;
        Ok(Self::from_source(source))
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current value of a control
    pub fn value(&self, handle: ControlHandle) -> Option<&str> {
        self.slots.get(handle.0).map(|s| s.control.value.as_str())
    }

    /// First control carrying the given id or name attribute
    pub fn find(&self, id_or_name: &str) -> Option<ControlHandle> {
        self.slots
            .iter()
            .position(|s| s.control.id == id_or_name || s.control.name == id_or_name)
            .map(ControlHandle)
    }

    fn index_node(&mut self, node: Node, block_stack: &mut Vec<usize>, label: Option<&str>) {
        match node {
            Node::Element { tag, children } => {
                let is_block = BLOCK_TAGS.contains(&tag.to_lowercase().as_str());
                if is_block {
                    block_stack.push(self.blocks.len());
                    self.blocks.push(Vec::new());
                }
                for child in children {
                    self.index_node(child, block_stack, label);
                }
                if is_block {
                    block_stack.pop();
                }
            }
            Node::Label {
                for_id,
                text,
                children,
            } => {
                let text = text.trim().to_string();
                if let Some(for_id) = for_id.filter(|id| !id.is_empty()) {
                    self.labels_by_id.entry(for_id).or_insert_with(|| text.clone());
                }
                for child in children {
                    self.index_node(child, block_stack, Some(&text));
                }
            }
            Node::Control(control) => {
                let handle = ControlHandle(self.slots.len());
                for &block in block_stack.iter() {
                    self.blocks[block].push(handle);
                }
                self.slots.push(ControlSlot {
                    control,
                    enclosing_label: label.map(str::to_string),
                    block: block_stack.last().copied(),
                });
            }
        }
    }
}

impl FormHost for FormDocument {
    fn controls(&self) -> Vec<ControlHandle> {
        (0..self.slots.len()).map(ControlHandle).collect()
    }

    fn control(&self, handle: ControlHandle) -> Option<&Control> {
        self.slots.get(handle.0).map(|s| &s.control)
    }

    fn explicit_label(&self, control_id: &str) -> Option<&str> {
        self.labels_by_id.get(control_id).map(String::as_str)
    }

    fn enclosing_label(&self, handle: ControlHandle) -> Option<&str> {
        self.slots
            .get(handle.0)
            .and_then(|s| s.enclosing_label.as_deref())
    }

    fn block_members(&self, handle: ControlHandle) -> Vec<ControlHandle> {
        self.slots
            .get(handle.0)
            .and_then(|s| s.block)
            .and_then(|b| self.blocks.get(b))
            .cloned()
            .unwrap_or_default()
    }

    fn write_value(&mut self, handle: ControlHandle, value: &str) -> bool {
        let Some(slot) = self.slots.get_mut(handle.0) else {
            return false;
        };
        let control = &mut slot.control;
        if control.kind == ControlKind::Select && !control.options.iter().any(|o| o.value == value)
        {
            return false;
        }
        if control.value == value {
            return false;
        }
        control.value = value.to_string();
        true
    }

    fn mark_filled(&mut self, handle: ControlHandle, accepted: bool) {
        if let Some(slot) = self.slots.get_mut(handle.0) {
            slot.control.filled = Some(accepted);
        }
    }
}
