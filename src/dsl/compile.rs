//! Schema emitter. Expands a [`Program`] AST into a [`Schema`] tree.
//!
//! Assigns a fresh identifier to every block, resolves type shorthand and
//! modifiers, derives labels, groups blocks into layers and builds the
//! signal set.

use log::debug;

use super::ast::*;
use super::label::derive_label;
use crate::schema::{
    Block, BlockType, Condition, IdGenerator, Layer, Schema, SCHEMA_VERSION,
};

/// Emit the schema for a finalized program.
pub fn emit_schema(program: &Program, ids: &mut dyn IdGenerator) -> Schema {
    let policy = OverridePolicy::default();
    let mut layers = Vec::with_capacity(program.layers.len() + 1);

    if let Some(root) = base_root(program, policy, ids) {
        layers.push(Layer {
            id: 0,
            visible: true,
            root,
        });
    }

    for layer in &program.layers {
        layers.push(Layer {
            id: layer.id,
            visible: false,
            root: emit_block(&layer.root, policy, ids),
        });
    }

    let schema = Schema {
        version: SCHEMA_VERSION.to_string(),
        signals: collect_signals(program),
        layers,
    };
    debug!(
        "emitted schema: {} layers, {} blocks, {} signals",
        schema.layers.len(),
        schema.block_count(),
        schema.signals.len()
    );
    schema
}

/// The base layer root: the single top-level block, or a synthetic
/// container around several. `None` when there are no top-level blocks.
fn base_root(
    program: &Program,
    policy: OverridePolicy,
    ids: &mut dyn IdGenerator,
) -> Option<Block> {
    match program.blocks.as_slice() {
        [] => None,
        [single] => Some(emit_block(single, policy, ids)),
        many => {
            let uid = ids.next_id();
            let children = many
                .iter()
                .map(|block| emit_block(block, policy, ids))
                .collect();
            Some(Block::new(uid, BlockType::Container).with_children(children))
        }
    }
}

fn emit_block(node: &BlockNode, policy: OverridePolicy, ids: &mut dyn IdGenerator) -> Block {
    let mut block = Block::new(ids.next_id(), node.kind.clone());

    block.binding = node.binding.clone();
    block.label = node
        .label
        .clone()
        .or_else(|| derive_label(node.binding.as_ref()));

    let layout = node.layout(policy);
    block.layout = (!layout.is_empty()).then_some(layout);
    let style = node.style(policy);
    block.style = (!style.is_empty()).then_some(style);
    let signals = node.signal_bindings(policy);
    block.signals = (!signals.is_empty()).then_some(signals);

    block.condition = node.condition.as_ref().map(|c| Condition {
        signal: c.signal.clone(),
        value: c.value.clone(),
    });
    block.trigger = node.trigger(policy);

    block.children = node.children.as_ref().map(|children| {
        children
            .iter()
            .map(|child| emit_block(child, policy, ids))
            .collect()
    });

    block
}
