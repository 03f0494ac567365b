//! Block data model: the typed UI node of the schema tree.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::BlockId;

/// The closed set of block kinds.
///
/// Tags outside the set survive deserialization as [`BlockType::Unknown`] so
/// the importer can reject them with a path instead of a serde error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    Container,
    Text,
    Button,
    Kpi,
    Slider,
    Form,
    Grid,
    Card,
    Modal,
    Table,
    List,
    Header,
    Icon,
    Avatar,
    Input,
    BarChart,
    LineChart,
    PieChart,
    Unknown(String),
}

impl BlockType {
    /// Every known kind, in type-code table order.
    pub const KNOWN: [BlockType; 18] = [
        BlockType::Container,
        BlockType::Kpi,
        BlockType::BarChart,
        BlockType::LineChart,
        BlockType::PieChart,
        BlockType::Table,
        BlockType::Form,
        BlockType::List,
        BlockType::Card,
        BlockType::Modal,
        BlockType::Text,
        BlockType::Button,
        BlockType::Slider,
        BlockType::Grid,
        BlockType::Header,
        BlockType::Icon,
        BlockType::Avatar,
        BlockType::Input,
    ];

    /// Schema tag, e.g. `"bar-chart"`.
    pub fn name(&self) -> &str {
        match self {
            BlockType::Container => "container",
            BlockType::Text => "text",
            BlockType::Button => "button",
            BlockType::Kpi => "kpi",
            BlockType::Slider => "slider",
            BlockType::Form => "form",
            BlockType::Grid => "grid",
            BlockType::Card => "card",
            BlockType::Modal => "modal",
            BlockType::Table => "table",
            BlockType::List => "list",
            BlockType::Header => "header",
            BlockType::Icon => "icon",
            BlockType::Avatar => "avatar",
            BlockType::Input => "input",
            BlockType::BarChart => "bar-chart",
            BlockType::LineChart => "line-chart",
            BlockType::PieChart => "pie-chart",
            BlockType::Unknown(tag) => tag,
        }
    }

    /// Two-letter DSL code. `None` for unknown tags.
    pub fn code(&self) -> Option<&'static str> {
        let code = match self {
            BlockType::Container => "Cn",
            BlockType::Text => "Tx",
            BlockType::Button => "Bt",
            BlockType::Kpi => "Kp",
            BlockType::Slider => "Sl",
            BlockType::Form => "Fm",
            BlockType::Grid => "Gd",
            BlockType::Card => "Cd",
            BlockType::Modal => "Md",
            BlockType::Table => "Tb",
            BlockType::List => "Ls",
            BlockType::Header => "Hr",
            BlockType::Icon => "Ic",
            BlockType::Avatar => "Av",
            BlockType::Input => "In",
            BlockType::BarChart => "Br",
            BlockType::LineChart => "Ln",
            BlockType::PieChart => "Pi",
            BlockType::Unknown(_) => return None,
        };
        Some(code)
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::KNOWN.into_iter().find(|t| t.code() == Some(code))
    }

    /// Resolve a digit alias (0-9) to the first ten kinds of the code table.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::KNOWN.get(usize::from(index)).filter(|_| index <= 9).cloned()
    }

    pub fn from_name(name: &str) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|t| t.name() == name)
            .unwrap_or_else(|| BlockType::Unknown(name.to_string()))
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, BlockType::Unknown(_))
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for BlockType {
    fn from(tag: String) -> Self {
        BlockType::from_name(&tag)
    }
}

impl From<BlockType> for String {
    fn from(kind: BlockType) -> Self {
        match kind {
            BlockType::Unknown(tag) => tag,
            known => known.name().to_string(),
        }
    }
}

/// How a block obtains its displayed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawBinding", into = "RawBinding")]
pub enum Binding {
    /// Named lookup against the ambient data context.
    Field(String),
    /// Positional lookup inside a repeating-item context.
    Indexed(u32),
    /// Opaque expression, evaluated by the consumer.
    Computed(String),
    /// Fixed text used directly as content.
    Literal(String),
    /// A serialized kind this compiler does not know.
    Unsupported(String),
}

impl Binding {
    pub fn kind_name(&self) -> &str {
        match self {
            Binding::Field(_) => "field",
            Binding::Indexed(_) => "indexed",
            Binding::Computed(_) => "computed",
            Binding::Literal(_) => "literal",
            Binding::Unsupported(kind) => kind,
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Field(name) => write!(f, "field({name})"),
            Binding::Indexed(n) => write!(f, "indexed({n})"),
            Binding::Computed(expr) => write!(f, "computed({expr})"),
            Binding::Literal(text) => write!(f, "literal({text:?})"),
            Binding::Unsupported(kind) => write!(f, "unsupported({kind})"),
        }
    }
}

/// Wire shape of a binding: `{"kind": "field", "value": "revenue"}`.
#[derive(Serialize, Deserialize)]
struct RawBinding {
    kind: String,
    #[serde(default)]
    value: Value,
}

impl From<RawBinding> for Binding {
    fn from(raw: RawBinding) -> Self {
        let RawBinding { kind, value } = raw;
        let binding = match (kind.as_str(), value) {
            ("field", Value::String(name)) => Some(Binding::Field(name)),
            ("indexed", Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Binding::Indexed),
            ("computed", Value::String(expr)) => Some(Binding::Computed(expr)),
            ("literal", Value::String(text)) => Some(Binding::Literal(text)),
            _ => None,
        };
        binding.unwrap_or(Binding::Unsupported(kind))
    }
}

impl From<Binding> for RawBinding {
    fn from(binding: Binding) -> Self {
        let kind = binding.kind_name().to_string();
        let value = match binding {
            Binding::Field(s) | Binding::Computed(s) | Binding::Literal(s) => Value::String(s),
            Binding::Indexed(n) => Value::from(n),
            Binding::Unsupported(_) => Value::Null,
        };
        RawBinding { kind, value }
    }
}

/// Named fractional spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fraction {
    Full,
    Half,
    Third,
    Quarter,
}

/// Column/slot span: a count or a named fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpan {
    Columns(u32),
    Fraction(Fraction),
}

impl fmt::Display for ColumnSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSpan::Columns(n) => write!(f, "{n}"),
            ColumnSpan::Fraction(fraction) => write!(f, "{fraction:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flex {
    Fixed,
    Shrink,
    Grow,
}

/// Flow direction hint for containers. Column is the default flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Row,
    Column,
}

/// Resolved layout modifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// 0-100. Named levels: hero = 100, primary = 75, secondary = 50.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<ColumnSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flex: Option<Flex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        *self == Layout::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    /// Free-form color token; not checked against any palette.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Style {
    pub fn is_empty(&self) -> bool {
        *self == Style::default()
    }
}

/// A signal written by a block, optionally with a literal value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEmit {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Per-block signal wiring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalBindings {
    /// Signals declared at this point of the tree.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub declare: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emit: Option<SignalEmit>,
    /// Read and written by the same block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub both: Option<String>,
}

impl SignalBindings {
    pub fn is_empty(&self) -> bool {
        *self == SignalBindings::default()
    }

    /// Names this block reads or writes (declarations excluded).
    pub fn used_names(&self) -> impl Iterator<Item = &str> {
        self.receive
            .as_deref()
            .into_iter()
            .chain(self.both.as_deref())
            .chain(self.emit.as_ref().map(|e| e.name.as_str()))
    }
}

/// Include the block only while `signal` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub signal: String,
    pub value: String,
}

/// Interaction that changes layer visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Trigger {
    Open { layer: u32 },
    Close,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Open { layer } => write!(f, "open({layer})"),
            Trigger::Close => f.write_str("close"),
        }
    }
}

/// One node of the schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub uid: BlockId,
    #[serde(rename = "type")]
    pub kind: BlockType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<Binding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<SignalBindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Trigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Block>>,
}

impl Block {
    /// A bare block with no attributes.
    pub fn new(uid: BlockId, kind: BlockType) -> Self {
        Self {
            uid,
            kind,
            binding: None,
            label: None,
            layout: None,
            style: None,
            signals: None,
            condition: None,
            trigger: None,
            children: None,
        }
    }

    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = Some(children);
        self
    }

    /// Number of blocks in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(Block::count)
            .sum::<usize>()
    }
}
