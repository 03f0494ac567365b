//! Abstract Syntax Tree for LiquidCode.
//!
//! The AST keeps what the source said, in source order: every modifier,
//! every signal reference, which condition spelling was used. Resolution to
//! schema records (last modifier of a class wins) happens through
//! [`OverridePolicy`].

use indexmap::IndexSet;
use log::trace;

use super::error::Position;
use crate::schema::{
    Binding, BlockType, ColumnSpan, Direction, Flex, Layout, SignalBindings, SignalEmit, Size,
    Style, Trigger,
};

/// A complete DSL program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// Root signal declarations (`@a @b`).
    pub signals: Vec<SignalDecl>,
    /// Top-level blocks of the base layer.
    pub blocks: Vec<BlockNode>,
    /// Hidden layers (`/N block`), in source order.
    pub layers: Vec<LayerDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalDecl {
    pub name: String,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerDef {
    pub id: u32,
    pub root: BlockNode,
    pub pos: Position,
}

/// How the block type was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Code(String),
    Index(u8),
}

/// A block expression with everything attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    pub kind: BlockType,
    pub type_ref: TypeRef,
    pub binding: Option<Binding>,
    pub label: Option<String>,
    pub modifiers: Vec<Modifier>,
    pub signals: Vec<SignalRef>,
    pub condition: Option<ConditionNode>,
    pub triggers: Vec<TriggerNode>,
    /// `None` for a leaf, `Some(vec![])` for an explicit `[]`.
    pub children: Option<Vec<BlockNode>>,
    pub pos: Position,
}

/// Priority as written: a named level or a digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityLevel {
    Hero,
    Primary,
    Secondary,
    Level(u8),
}

impl PriorityLevel {
    pub fn value(self) -> u8 {
        match self {
            PriorityLevel::Hero => 100,
            PriorityLevel::Primary => 75,
            PriorityLevel::Secondary => 50,
            PriorityLevel::Level(n) => n,
        }
    }

    /// The spelling for a resolved priority, if one exists.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            100 => Some(PriorityLevel::Hero),
            75 => Some(PriorityLevel::Primary),
            50 => Some(PriorityLevel::Secondary),
            0..=9 => Some(PriorityLevel::Level(value)),
            _ => None,
        }
    }
}

/// A layout or style modifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    Priority(PriorityLevel),
    Span(ColumnSpan),
    Flex(Flex),
    Direction(Direction),
    Size(Size),
    Color(String),
}

/// A signal reference attached to a block.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalRef {
    /// `@name` inside a block.
    Declare { name: String, pos: Position },
    /// `<name`
    Receive { name: String, pos: Position },
    /// `>name` or `>name=value`
    Emit {
        name: String,
        value: Option<String>,
        pos: Position,
    },
    /// `<>name`
    Both { name: String, pos: Position },
}

impl SignalRef {
    pub fn name(&self) -> &str {
        match self {
            SignalRef::Declare { name, .. }
            | SignalRef::Receive { name, .. }
            | SignalRef::Emit { name, .. }
            | SignalRef::Both { name, .. } => name,
        }
    }

    pub fn pos(&self) -> Position {
        match self {
            SignalRef::Declare { pos, .. }
            | SignalRef::Receive { pos, .. }
            | SignalRef::Emit { pos, .. }
            | SignalRef::Both { pos, .. } => *pos,
        }
    }
}

/// Which way a condition was spelled. Both mean the same thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionSyntax {
    /// `?@sig=value`
    #[default]
    At,
    /// `?sig=value`
    Bare,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionNode {
    pub signal: String,
    pub value: String,
    pub syntax: ConditionSyntax,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerNode {
    pub trigger: Trigger,
    pub pos: Position,
}

/// Resolution rule for repeated modifiers of the same class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverridePolicy {
    /// The modifier written last replaces earlier ones.
    #[default]
    LastWins,
}

impl OverridePolicy {
    fn apply<T: std::fmt::Debug>(self, slot: &mut Option<T>, value: T, what: &str) {
        match self {
            OverridePolicy::LastWins => {
                if let Some(old) = slot.as_ref() {
                    trace!("{what}: {value:?} overrides {old:?}");
                }
                *slot = Some(value);
            }
        }
    }
}

impl BlockNode {
    pub fn new(kind: BlockType, type_ref: TypeRef, pos: Position) -> Self {
        Self {
            kind,
            type_ref,
            binding: None,
            label: None,
            modifiers: Vec::new(),
            signals: Vec::new(),
            condition: None,
            triggers: Vec::new(),
            children: None,
            pos,
        }
    }

    pub fn layout(&self, policy: OverridePolicy) -> Layout {
        let mut layout = Layout::default();
        for modifier in &self.modifiers {
            match modifier {
                Modifier::Priority(level) => {
                    policy.apply(&mut layout.priority, level.value(), "priority")
                }
                Modifier::Span(span) => policy.apply(&mut layout.span, *span, "span"),
                Modifier::Flex(flex) => policy.apply(&mut layout.flex, *flex, "flex"),
                Modifier::Direction(dir) => policy.apply(&mut layout.direction, *dir, "direction"),
                Modifier::Size(_) | Modifier::Color(_) => {}
            }
        }
        layout
    }

    pub fn style(&self, policy: OverridePolicy) -> Style {
        let mut style = Style::default();
        for modifier in &self.modifiers {
            match modifier {
                Modifier::Size(size) => policy.apply(&mut style.size, *size, "size"),
                Modifier::Color(color) => policy.apply(&mut style.color, color.clone(), "color"),
                _ => {}
            }
        }
        style
    }

    /// Declarations accumulate (deduplicated); receive/emit/both follow the policy.
    pub fn signal_bindings(&self, policy: OverridePolicy) -> SignalBindings {
        let mut bindings = SignalBindings::default();
        for signal in &self.signals {
            match signal {
                SignalRef::Declare { name, .. } => {
                    if !bindings.declare.contains(name) {
                        bindings.declare.push(name.clone());
                    }
                }
                SignalRef::Receive { name, .. } => {
                    policy.apply(&mut bindings.receive, name.clone(), "receive")
                }
                SignalRef::Emit { name, value, .. } => policy.apply(
                    &mut bindings.emit,
                    SignalEmit {
                        name: name.clone(),
                        value: value.clone(),
                    },
                    "emit",
                ),
                SignalRef::Both { name, .. } => policy.apply(&mut bindings.both, name.clone(), "both"),
            }
        }
        bindings
    }

    pub fn trigger(&self, policy: OverridePolicy) -> Option<Trigger> {
        let mut resolved = None;
        for node in &self.triggers {
            policy.apply(&mut resolved, node.trigger, "trigger");
        }
        resolved
    }

    /// Pre-order walk over this block and its descendants.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a BlockNode)) {
        visit(self);
        for child in self.children.iter().flatten() {
            child.walk(visit);
        }
    }
}

impl Program {
    /// Every block of the program in pre-order: base layer first, then layers.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a BlockNode)) {
        for block in &self.blocks {
            block.walk(visit);
        }
        for layer in &self.layers {
            layer.root.walk(visit);
        }
    }
}

/// Signal names a program declares and uses, gathered in one pass so that
/// forward references resolve.
#[derive(Debug, Clone, Default)]
pub struct SignalUsage {
    pub root: IndexSet<String>,
    pub local: IndexSet<String>,
    /// Receive/emit/both/condition references, in first-seen order.
    pub used: Vec<(String, Position)>,
}

impl SignalUsage {
    pub fn collect(program: &Program) -> Self {
        let mut usage = SignalUsage::default();
        usage
            .root
            .extend(program.signals.iter().map(|decl| decl.name.clone()));
        program.walk(&mut |block| {
            if let Some(cond) = &block.condition {
                usage.used.push((cond.signal.clone(), cond.pos));
            }
            for signal in &block.signals {
                match signal {
                    SignalRef::Declare { name, .. } => {
                        usage.local.insert(name.clone());
                    }
                    other => usage.used.push((other.name().to_string(), other.pos())),
                }
            }
        });
        usage
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.root.contains(name) || self.local.contains(name)
    }

    /// Uses with no declaration anywhere in the program.
    pub fn undeclared(&self) -> impl Iterator<Item = &(String, Position)> {
        self.used.iter().filter(|(name, _)| !self.is_declared(name))
    }

    /// Root declarations, then local declarations, then promoted uses.
    pub fn signal_set(&self) -> IndexSet<String> {
        let mut set = self.root.clone();
        set.extend(self.local.iter().cloned());
        for (name, _) in &self.used {
            if set.insert(name.clone()) {
                trace!("promoted undeclared signal '{name}'");
            }
        }
        set
    }
}

/// Collect the schema signal set for a program.
pub fn collect_signals(program: &Program) -> IndexSet<String> {
    SignalUsage::collect(program).signal_set()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kpi() -> BlockNode {
        BlockNode::new(
            BlockType::Kpi,
            TypeRef::Code("Kp".into()),
            Position::default(),
        )
    }

    #[test]
    fn priority_levels() {
        assert_eq!(PriorityLevel::Hero.value(), 100);
        assert_eq!(PriorityLevel::Primary.value(), 75);
        assert_eq!(PriorityLevel::Secondary.value(), 50);
        assert_eq!(PriorityLevel::Level(7).value(), 7);
        assert_eq!(PriorityLevel::from_value(75), Some(PriorityLevel::Primary));
        assert_eq!(PriorityLevel::from_value(42), None);
    }

    #[test]
    fn last_priority_wins() {
        let mut block = kpi();
        block.modifiers = vec![
            Modifier::Priority(PriorityLevel::Hero),
            Modifier::Priority(PriorityLevel::Primary),
        ];
        assert_eq!(block.layout(OverridePolicy::LastWins).priority, Some(75));
    }

    #[test]
    fn last_size_wins() {
        let mut block = kpi();
        block.modifiers = vec![Modifier::Size(Size::Small), Modifier::Size(Size::Large)];
        assert_eq!(block.style(OverridePolicy::LastWins).size, Some(Size::Large));
        assert!(block.layout(OverridePolicy::LastWins).is_empty());
    }

    #[test]
    fn declarations_accumulate_refs_override() {
        let pos = Position::default();
        let mut block = kpi();
        block.signals = vec![
            SignalRef::Declare { name: "a".into(), pos },
            SignalRef::Declare { name: "a".into(), pos },
            SignalRef::Receive { name: "x".into(), pos },
            SignalRef::Receive { name: "y".into(), pos },
        ];
        let bindings = block.signal_bindings(OverridePolicy::LastWins);
        assert_eq!(bindings.declare, vec!["a".to_string()]);
        assert_eq!(bindings.receive.as_deref(), Some("y"));
    }

    #[test]
    fn signal_set_orders_root_local_then_uses() {
        let pos = Position::default();
        let mut child = kpi();
        child.signals = vec![
            SignalRef::Emit {
                name: "sel".into(),
                value: None,
                pos,
            },
            SignalRef::Declare {
                name: "local".into(),
                pos,
            },
        ];
        let mut root = kpi();
        root.condition = Some(ConditionNode {
            signal: "mode".into(),
            value: "1".into(),
            syntax: ConditionSyntax::Bare,
            pos,
        });
        root.children = Some(vec![child]);
        let program = Program {
            signals: vec![SignalDecl {
                name: "tab".into(),
                pos,
            }],
            blocks: vec![root],
            layers: vec![],
        };
        let set: Vec<_> = collect_signals(&program).into_iter().collect();
        assert_eq!(set, vec!["tab", "local", "mode", "sel"]);
        let usage = SignalUsage::collect(&program);
        let undeclared: Vec<_> = usage.undeclared().map(|(n, _)| n.as_str()).collect();
        assert_eq!(undeclared, vec!["mode", "sel"]);
    }
}
