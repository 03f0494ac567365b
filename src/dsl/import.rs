//! Schema importer. Lifts a [`Schema`] back into a [`Program`] AST.
//!
//! The inverse of [`emit_schema`](super::compile::emit_schema): identifiers
//! are dropped, labels that would be derived anyway are dropped, and
//! anything the DSL cannot spell is rejected with the schema path where it
//! was found.

use std::collections::HashSet;

use log::debug;

use super::ast::*;
use super::error::{CompileError, Location, Position};
use super::label::derive_label;
use super::MAX_DEPTH;
use crate::schema::{Binding, Block, Layout, Schema, SignalBindings, Style, Trigger, SCHEMA_VERSION};

struct Scope<'a> {
    signals: HashSet<&'a str>,
    layers: HashSet<u32>,
}

impl Scope<'_> {
    fn require_signal(&self, name: &str, path: String) -> Result<(), CompileError> {
        if self.signals.contains(name) {
            Ok(())
        } else {
            Err(CompileError::UndeclaredSignal {
                name: name.to_string(),
                location: Location::Path(path),
            })
        }
    }
}

pub fn import_schema(schema: &Schema) -> Result<Program, CompileError> {
    if schema.version != SCHEMA_VERSION {
        return Err(CompileError::unsupported(
            "version",
            format!("version '{}' (expected '{SCHEMA_VERSION}')", schema.version),
        ));
    }

    let mut layer_ids = HashSet::new();
    for (i, layer) in schema.layers.iter().enumerate() {
        if !layer_ids.insert(layer.id) {
            return Err(CompileError::unsupported(
                format!("layers[{i}].id"),
                format!("layer {} appears more than once", layer.id),
            ));
        }
        if layer.id == 0 && i != 0 {
            return Err(CompileError::unsupported(
                format!("layers[{i}].id"),
                "layer 0 must come first",
            ));
        }
        if layer.visible != (layer.id == 0) {
            return Err(CompileError::unsupported(
                format!("layers[{i}].visible"),
                "only layer 0 starts visible",
            ));
        }
    }

    for (i, layer) in schema.layers.iter().enumerate() {
        check_depth(&layer.root, &format!("layers[{i}].root"))?;
    }

    let mut local = HashSet::new();
    for layer in &schema.layers {
        collect_local_declarations(&layer.root, &mut local);
    }

    let scope = Scope {
        signals: schema
            .signals
            .iter()
            .map(String::as_str)
            .chain(local.iter().copied())
            .collect(),
        layers: layer_ids,
    };

    let mut program = Program::default();
    program.signals = schema
        .signals
        .iter()
        .filter(|name| !local.contains(name.as_str()))
        .map(|name| SignalDecl {
            name: name.clone(),
            pos: Position::default(),
        })
        .collect();

    for (i, layer) in schema.layers.iter().enumerate() {
        let root = import_block(&layer.root, &format!("layers[{i}].root"), &scope)?;
        if layer.id == 0 {
            program.blocks.push(root);
        } else {
            program.layers.push(LayerDef {
                id: layer.id,
                root,
                pos: Position::default(),
            });
        }
    }

    debug!(
        "imported schema: {} signals, {} layers, {} blocks",
        schema.signals.len(),
        schema.layers.len(),
        schema.block_count()
    );
    Ok(program)
}

/// Rejects trees nested deeper than the parser accepts, without recursing.
fn check_depth(root: &Block, path: &str) -> Result<(), CompileError> {
    let mut stack = vec![(root, 0usize, path.to_string())];
    while let Some((block, depth, path)) = stack.pop() {
        let Some(children) = &block.children else {
            continue;
        };
        if depth >= MAX_DEPTH {
            return Err(CompileError::unsupported(
                format!("{path}.children"),
                format!("blocks nested deeper than {MAX_DEPTH} levels"),
            ));
        }
        for (i, child) in children.iter().enumerate() {
            stack.push((child, depth + 1, format!("{path}.children[{i}]")));
        }
    }
    Ok(())
}

fn collect_local_declarations<'a>(block: &'a Block, out: &mut HashSet<&'a str>) {
    if let Some(signals) = &block.signals {
        out.extend(signals.declare.iter().map(String::as_str));
    }
    for child in block.children.iter().flatten() {
        collect_local_declarations(child, out);
    }
}

fn import_block(block: &Block, path: &str, scope: &Scope<'_>) -> Result<BlockNode, CompileError> {
    let code = block.kind.code().ok_or_else(|| {
        CompileError::unsupported(
            format!("{path}.type"),
            format!("unknown block type '{}'", block.kind),
        )
    })?;

    if let Some(Binding::Unsupported(kind)) = &block.binding {
        return Err(CompileError::unsupported(
            format!("{path}.binding"),
            format!("unsupported binding kind '{kind}'"),
        ));
    }

    let mut node = BlockNode::new(
        block.kind.clone(),
        TypeRef::Code(code.to_string()),
        Position::default(),
    );

    match (&block.binding, &block.label) {
        (None, Some(label)) => node.binding = Some(Binding::Literal(label.clone())),
        (binding, label) => {
            node.binding = binding.clone();
            let derived = derive_label(binding.as_ref());
            node.label = label.clone().filter(|l| Some(l) != derived.as_ref());
        }
    }

    if let Some(layout) = &block.layout {
        node.modifiers.extend(layout_modifiers(layout, path)?);
    }
    if let Some(style) = &block.style {
        node.modifiers.extend(style_modifiers(style));
    }
    if let Some(signals) = &block.signals {
        node.signals = signal_refs(signals, path, scope)?;
    }

    if let Some(cond) = &block.condition {
        scope.require_signal(&cond.signal, format!("{path}.condition.signal"))?;
        node.condition = Some(ConditionNode {
            signal: cond.signal.clone(),
            value: cond.value.clone(),
            syntax: ConditionSyntax::At,
            pos: Position::default(),
        });
    }

    if let Some(trigger) = block.trigger {
        if let Trigger::Open { layer } = trigger {
            if !scope.layers.contains(&layer) {
                return Err(CompileError::UnknownLayer {
                    id: layer,
                    location: Location::Path(format!("{path}.trigger")),
                });
            }
        }
        node.triggers.push(TriggerNode {
            trigger,
            pos: Position::default(),
        });
    }

    if let Some(children) = &block.children {
        let mut nodes = Vec::with_capacity(children.len());
        for (i, child) in children.iter().enumerate() {
            nodes.push(import_block(child, &format!("{path}.children[{i}]"), scope)?);
        }
        node.children = Some(nodes);
    }

    Ok(node)
}

fn layout_modifiers(layout: &Layout, path: &str) -> Result<Vec<Modifier>, CompileError> {
    let mut modifiers = Vec::new();
    if let Some(priority) = layout.priority {
        let level = PriorityLevel::from_value(priority).ok_or_else(|| {
            CompileError::unsupported(
                format!("{path}.layout.priority"),
                format!("priority {priority} has no DSL spelling (use 0-9, 50, 75 or 100)"),
            )
        })?;
        modifiers.push(Modifier::Priority(level));
    }
    modifiers.extend(layout.span.map(Modifier::Span));
    modifiers.extend(layout.flex.map(Modifier::Flex));
    modifiers.extend(layout.direction.map(Modifier::Direction));
    Ok(modifiers)
}

fn style_modifiers(style: &Style) -> Vec<Modifier> {
    style
        .size
        .map(Modifier::Size)
        .into_iter()
        .chain(style.color.clone().map(Modifier::Color))
        .collect()
}

fn signal_refs(
    signals: &SignalBindings,
    path: &str,
    scope: &Scope<'_>,
) -> Result<Vec<SignalRef>, CompileError> {
    let pos = Position::default();
    let mut refs: Vec<SignalRef> = signals
        .declare
        .iter()
        .map(|name| SignalRef::Declare {
            name: name.clone(),
            pos,
        })
        .collect();

    if let Some(name) = &signals.receive {
        scope.require_signal(name, format!("{path}.signals.receive"))?;
        refs.push(SignalRef::Receive {
            name: name.clone(),
            pos,
        });
    }
    if let Some(name) = &signals.both {
        scope.require_signal(name, format!("{path}.signals.both"))?;
        refs.push(SignalRef::Both {
            name: name.clone(),
            pos,
        });
    }
    if let Some(emit) = &signals.emit {
        scope.require_signal(&emit.name, format!("{path}.signals.emit"))?;
        refs.push(SignalRef::Emit {
            name: emit.name.clone(),
            value: emit.value.clone(),
            pos,
        });
    }
    Ok(refs)
}
