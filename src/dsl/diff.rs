//! Schema diffing: structural comparison of two [`Schema`] trees.
//!
//! Identifiers are ignored, signal sets (root and block-local) compare as
//! sets, layers and children compare element-wise in order. Bindings and
//! labels compare by their effective value: a label alone means a literal
//! binding of that text, and a missing label means the derived one.

use serde::{Deserialize, Serialize};

use super::label::derive_label;
use crate::schema::{Binding, Block, Schema};

/// A single mismatch, located by schema path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaChange {
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl SchemaChange {
    pub fn summary(&self) -> String {
        format!("{}: {} != {}", self.path, self.expected, self.actual)
    }
}

/// A structured diff between two schemas.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaDiff {
    pub changes: Vec<SchemaChange>,
}

impl SchemaDiff {
    /// Compare `actual` against `expected`.
    pub fn diff(expected: &Schema, actual: &Schema) -> Self {
        let mut diff = SchemaDiff::default();

        diff.check("version", &expected.version, &actual.version);

        if expected.signals != actual.signals {
            diff.push(
                "signals",
                show(&sorted(&expected.signals)),
                show(&sorted(&actual.signals)),
            );
        }

        if expected.layers.len() != actual.layers.len() {
            diff.push(
                "layers",
                format!("{} layers", expected.layers.len()),
                format!("{} layers", actual.layers.len()),
            );
        }
        for (i, (a, b)) in expected.layers.iter().zip(&actual.layers).enumerate() {
            diff.check(&format!("layers[{i}].id"), &a.id, &b.id);
            diff.check(&format!("layers[{i}].visible"), &a.visible, &b.visible);
            diff.diff_block(&format!("layers[{i}].root"), &a.root, &b.root);
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Human-readable lines, one per change: `path: expected != actual`.
    pub fn summaries(&self) -> Vec<String> {
        self.changes.iter().map(SchemaChange::summary).collect()
    }

    fn diff_block(&mut self, path: &str, a: &Block, b: &Block) {
        self.check(&format!("{path}.type"), &a.kind, &b.kind);

        let (binding_a, binding_b) = (effective_binding(a), effective_binding(b));
        self.check(&format!("{path}.binding"), &binding_a, &binding_b);
        self.check(
            &format!("{path}.label"),
            &effective_label(a, binding_a.as_ref()),
            &effective_label(b, binding_b.as_ref()),
        );

        let (la, lb) = (a.layout.clone().unwrap_or_default(), b.layout.clone().unwrap_or_default());
        self.check(&format!("{path}.layout.priority"), &la.priority, &lb.priority);
        self.check(&format!("{path}.layout.span"), &la.span, &lb.span);
        self.check(&format!("{path}.layout.flex"), &la.flex, &lb.flex);
        self.check(&format!("{path}.layout.direction"), &la.direction, &lb.direction);

        let (sa, sb) = (a.style.clone().unwrap_or_default(), b.style.clone().unwrap_or_default());
        self.check(&format!("{path}.style.size"), &sa.size, &sb.size);
        self.check(&format!("{path}.style.color"), &sa.color, &sb.color);

        let (ga, gb) = (a.signals.clone().unwrap_or_default(), b.signals.clone().unwrap_or_default());
        let (da, db) = (sorted(&ga.declare), sorted(&gb.declare));
        self.check(&format!("{path}.signals.declare"), &da, &db);
        self.check(&format!("{path}.signals.receive"), &ga.receive, &gb.receive);
        self.check(&format!("{path}.signals.emit"), &ga.emit, &gb.emit);
        self.check(&format!("{path}.signals.both"), &ga.both, &gb.both);

        self.check(&format!("{path}.condition"), &a.condition, &b.condition);
        self.check(&format!("{path}.trigger"), &a.trigger, &b.trigger);

        match (&a.children, &b.children) {
            (None, None) => {}
            (Some(ca), Some(cb)) => {
                if ca.len() != cb.len() {
                    self.push(
                        format!("{path}.children"),
                        format!("{} blocks", ca.len()),
                        format!("{} blocks", cb.len()),
                    );
                }
                for (i, (x, y)) in ca.iter().zip(cb).enumerate() {
                    self.diff_block(&format!("{path}.children[{i}]"), x, y);
                }
            }
            (ca, cb) => self.push(
                format!("{path}.children"),
                children_summary(ca.as_deref()),
                children_summary(cb.as_deref()),
            ),
        }
    }

    fn check<T: PartialEq + Serialize>(&mut self, path: &str, expected: &T, actual: &T) {
        if expected != actual {
            self.push(path.to_string(), show(expected), show(actual));
        }
    }

    fn push(&mut self, path: impl Into<String>, expected: String, actual: String) {
        self.changes.push(SchemaChange {
            path: path.into(),
            expected,
            actual,
        });
    }
}

fn effective_binding(block: &Block) -> Option<Binding> {
    block
        .binding
        .clone()
        .or_else(|| block.label.clone().map(Binding::Literal))
}

fn effective_label(block: &Block, binding: Option<&Binding>) -> Option<String> {
    block.label.clone().or_else(|| derive_label(binding))
}

fn children_summary(children: Option<&[Block]>) -> String {
    match children {
        None => "null".to_string(),
        Some(c) => format!("{} blocks", c.len()),
    }
}

/// Names as a set: sorted, each once.
fn sorted<'a>(names: impl IntoIterator<Item = &'a String>) -> Vec<&'a String> {
    let mut names: Vec<&String> = names.into_iter().collect();
    names.sort();
    names.dedup();
    names
}

fn show<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<unprintable>".to_string())
}

/// Outcome of Schema -> DSL -> Schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundtripReport {
    /// The DSL the schema compiled to (empty when compilation failed).
    pub dsl: String,
    /// The schema parsed back from `dsl`, if it parsed.
    pub reconstructed: Option<Schema>,
    pub is_equivalent: bool,
    pub differences: Vec<String>,
}

impl RoundtripReport {
    pub fn from_diff(dsl: String, reconstructed: Schema, diff: &SchemaDiff) -> Self {
        Self {
            dsl,
            reconstructed: Some(reconstructed),
            is_equivalent: diff.is_empty(),
            differences: diff.summaries(),
        }
    }

    /// A stage of the roundtrip failed outright.
    pub fn failed(dsl: String, stage: &str, error: &impl std::fmt::Display) -> Self {
        Self {
            dsl,
            reconstructed: None,
            is_equivalent: false,
            differences: vec![format!("{stage}: {error}")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        BlockId, BlockType, Layer, Layout, SignalBindings, SignalEmit, Trigger,
    };

    fn block(uid: &str, kind: BlockType) -> Block {
        Block::new(BlockId(uid.into()), kind)
    }

    fn base(root: Block) -> Schema {
        let mut schema = Schema::new();
        schema.layers.push(Layer {
            id: 0,
            visible: true,
            root,
        });
        schema
    }

    fn dashboard(prefix: &str) -> Schema {
        let kpi = |n: &str, p: u8| {
            block(&format!("{prefix}{n}"), BlockType::Kpi)
                .with_binding(Binding::Field(n.into()))
                .with_layout(Layout {
                    priority: Some(p),
                    ..Layout::default()
                })
        };
        base(block(&format!("{prefix}root"), BlockType::Container)
            .with_children(vec![kpi("a", 100), kpi("b", 75)]))
    }

    #[test]
    fn identical_schemas_produce_empty_diff() {
        let diff = SchemaDiff::diff(&dashboard("x"), &dashboard("x"));
        assert!(diff.is_empty());
    }

    #[test]
    fn identifiers_are_ignored() {
        assert!(SchemaDiff::diff(&dashboard("x"), &dashboard("y")).is_empty());
    }

    #[test]
    fn signal_order_is_ignored() {
        let mut a = dashboard("x");
        a.signals.extend(["p".to_string(), "q".to_string()]);
        let mut b = dashboard("x");
        b.signals.extend(["q".to_string(), "p".to_string()]);
        assert!(SchemaDiff::diff(&a, &b).is_empty());
        b.signals.insert("r".into());
        assert_eq!(
            SchemaDiff::diff(&a, &b).summaries(),
            vec![r#"signals: ["p","q"] != ["p","q","r"]"#.to_string()]
        );
    }

    #[test]
    fn priority_change_reports_path() {
        let a = dashboard("x");
        let mut b = dashboard("x");
        if let Some(children) = b.layers[0].root.children.as_mut() {
            children[1].layout = Some(Layout {
                priority: Some(50),
                ..Layout::default()
            });
        }
        assert_eq!(
            SchemaDiff::diff(&a, &b).summaries(),
            vec!["layers[0].root.children[1].layout.priority: 75 != 50".to_string()]
        );
    }

    #[test]
    fn label_only_equals_literal_binding() {
        let a = base(block("1", BlockType::Button).with_label("Save"));
        let b = base(
            block("2", BlockType::Button)
                .with_binding(Binding::Literal("Save".into()))
                .with_label("Save"),
        );
        assert!(SchemaDiff::diff(&a, &b).is_empty());
    }

    #[test]
    fn missing_label_equals_derived_label() {
        let a = base(block("1", BlockType::Header).with_binding(Binding::Field("pageTitle".into())));
        let b = base(
            block("2", BlockType::Header)
                .with_binding(Binding::Field("pageTitle".into()))
                .with_label("Page Title"),
        );
        assert!(SchemaDiff::diff(&a, &b).is_empty());
    }

    #[test]
    fn empty_records_equal_absent_ones() {
        let a = base(block("1", BlockType::Text));
        let mut b = base(block("2", BlockType::Text).with_layout(Layout::default()));
        b.layers[0].root.signals = Some(SignalBindings::default());
        assert!(SchemaDiff::diff(&a, &b).is_empty());
    }

    #[test]
    fn empty_children_differ_from_leaf() {
        let a = base(block("1", BlockType::Container));
        let b = base(block("2", BlockType::Container).with_children(vec![]));
        assert_eq!(
            SchemaDiff::diff(&a, &b).summaries(),
            vec!["layers[0].root.children: null != 0 blocks".to_string()]
        );
    }

    #[test]
    fn local_declarations_compare_as_sets() {
        let mut a = base(block("1", BlockType::List));
        a.layers[0].root.signals = Some(SignalBindings {
            declare: vec!["x".into(), "y".into()],
            ..SignalBindings::default()
        });
        let mut b = a.clone();
        b.layers[0].root.signals = Some(SignalBindings {
            declare: vec!["y".into(), "x".into()],
            ..SignalBindings::default()
        });
        assert!(SchemaDiff::diff(&a, &b).is_empty());
    }

    #[test]
    fn repeated_local_declarations_count_once() {
        let mut a = base(block("1", BlockType::List));
        a.layers[0].root.signals = Some(SignalBindings {
            declare: vec!["x".into(), "x".into()],
            ..SignalBindings::default()
        });
        let mut b = a.clone();
        b.layers[0].root.signals = Some(SignalBindings {
            declare: vec!["x".into()],
            ..SignalBindings::default()
        });
        assert!(SchemaDiff::diff(&a, &b).is_empty());

        b.layers[0].root.signals = Some(SignalBindings {
            declare: vec!["y".into(), "x".into()],
            ..SignalBindings::default()
        });
        assert_eq!(
            SchemaDiff::diff(&a, &b).summaries(),
            vec![r#"layers[0].root.signals.declare: ["x"] != ["x","y"]"#.to_string()]
        );
    }

    #[test]
    fn empty_label_equals_empty_literal() {
        let a = base(block("1", BlockType::Text).with_label(""));
        let b = base(
            block("2", BlockType::Text)
                .with_binding(Binding::Literal(String::new()))
                .with_label(""),
        );
        assert!(SchemaDiff::diff(&a, &b).is_empty());
        let unlabeled = base(block("3", BlockType::Text).with_binding(Binding::Literal(String::new())));
        assert!(SchemaDiff::diff(&a, &unlabeled).is_empty());
    }

    #[test]
    fn emit_and_trigger_changes() {
        let mut a = base(block("1", BlockType::Button));
        a.layers[0].root.signals = Some(SignalBindings {
            emit: Some(SignalEmit {
                name: "tab".into(),
                value: Some("1".into()),
            }),
            ..SignalBindings::default()
        });
        let mut b = a.clone();
        if let Some(signals) = b.layers[0].root.signals.as_mut() {
            signals.emit = Some(SignalEmit {
                name: "tab".into(),
                value: Some("2".into()),
            });
        }
        b.layers[0].root.trigger = Some(Trigger::Close);
        let summaries = SchemaDiff::diff(&a, &b).summaries();
        assert_eq!(summaries.len(), 2);
        assert!(summaries[0].starts_with("layers[0].root.signals.emit: "));
        assert_eq!(summaries[1], r#"layers[0].root.trigger: null != {"action":"close"}"#);
    }

    #[test]
    fn layer_count_mismatch() {
        let a = dashboard("x");
        let b = Schema::new();
        assert_eq!(
            SchemaDiff::diff(&a, &b).summaries(),
            vec!["layers: 1 layers != 0 layers".to_string()]
        );
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = RoundtripReport::failed(String::new(), "compile", &"boom");
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""isEquivalent":false"#));
        assert!(json.contains(r#""reconstructed":null"#));
        assert!(json.contains(r#""differences":["compile: boom"]"#));
    }
}
