//! LiquidCode: a bidirectional compiler between a compact UI layout DSL and
//! the schema tree a renderer consumes.
//!
//! ```no_run
//! let schema = liquidcode::parse("@tab Cn ^r [Bt \"Tab1\" >tab=1, Bt \"Tab2\" >tab=2]")?;
//! let dsl = liquidcode::compile(&schema)?;
//! assert!(liquidcode::roundtrip(&schema).is_equivalent);
//! # Ok::<(), liquidcode::CompileError>(())
//! ```

pub mod dsl;
pub mod schema;

pub use dsl::{CompileError, Compiler, CompilerConfig, RoundtripReport};
pub use schema::Schema;

/// Compile a schema into canonical DSL text.
pub fn compile(schema: &Schema) -> Result<String, CompileError> {
    Compiler::default().compile(schema)
}

/// Parse DSL text into a schema.
pub fn parse(source: &str) -> Result<Schema, CompileError> {
    Compiler::default().parse(source)
}

/// Compile, parse back and compare.
pub fn roundtrip(schema: &Schema) -> RoundtripReport {
    Compiler::default().roundtrip(schema)
}
