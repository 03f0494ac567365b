//! The schema tree: the fully expanded form handed to a renderer.

pub mod block;
pub mod id;

pub use block::*;
pub use id::{BlockId, IdGenerator, SeededIds, SequentialIds, SharedIds};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// The only schema version this crate reads and writes.
pub const SCHEMA_VERSION: &str = "1.0";

/// A complete UI description: declared signals plus ordered layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub version: String,
    /// Declared signal names. Equality ignores order.
    #[serde(default)]
    pub signals: IndexSet<String>,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

/// A stacking plane. Layer 0 is the visible base; others start hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: u32,
    pub visible: bool,
    pub root: Block,
}

impl Schema {
    pub fn new() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            signals: IndexSet::new(),
            layers: Vec::new(),
        }
    }

    pub fn layer(&self, id: u32) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Total number of blocks across every layer.
    pub fn block_count(&self) -> usize {
        self.layers.iter().map(|l| l.root.count()).sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        let root = Block::new(BlockId("b1".into()), BlockType::Kpi)
            .with_binding(Binding::Field("revenue".into()))
            .with_label("Revenue");
        let mut schema = Schema::new();
        schema.signals.insert("tab".into());
        schema.layers.push(Layer {
            id: 0,
            visible: true,
            root,
        });
        schema
    }

    #[test]
    fn json_field_names() {
        let json = sample().to_json().unwrap();
        assert!(json.contains(r#""version":"1.0""#));
        assert!(json.contains(r#""signals":["tab"]"#));
        assert!(json.contains(r#""type":"kpi""#));
        assert!(json.contains(r#""uid":"b1""#));
        assert!(!json.contains("layout"));
    }

    #[test]
    fn json_survives_reload() {
        let schema = sample();
        let back = Schema::from_json(&schema.to_json_pretty().unwrap()).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn signal_set_equality_ignores_order() {
        let mut a = Schema::new();
        a.signals.extend(["x".to_string(), "y".to_string()]);
        let mut b = Schema::new();
        b.signals.extend(["y".to_string(), "x".to_string()]);
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_signals_collapse_on_load() {
        let schema = Schema::from_json(r#"{"version":"1.0","signals":["a","a"],"layers":[]}"#)
            .unwrap();
        assert_eq!(schema.signals.len(), 1);
    }

    #[test]
    fn block_count_spans_layers() {
        let mut schema = sample();
        schema.layers.push(Layer {
            id: 1,
            visible: false,
            root: Block::new(BlockId("b2".into()), BlockType::Modal),
        });
        assert_eq!(schema.block_count(), 2);
        assert!(schema.layer(1).is_some());
        assert!(schema.layer(2).is_none());
    }
}
