//! LiquidCode compiler: DSL text ⇄ AST ⇄ Schema tree.
//!
//! Parsing runs lexer → parser → finalize → schema emitter. Compiling runs
//! importer → DSL emitter. A roundtrip compiles then parses and diffs the
//! result against the input.

pub mod ast;
pub mod compile;
pub mod config;
pub mod diff;
pub mod emit;
pub mod error;
pub mod import;
pub mod label;
pub mod lexer;
pub mod parser;
pub mod stream;
pub mod token;

pub use ast::*;
pub use config::{CompilerConfig, IdStrategy};
pub use diff::{RoundtripReport, SchemaChange, SchemaDiff};
pub use error::{suggest_codes, CompileError, ErrorKind, Location, Position};
pub use stream::{StreamUpdate, StreamingParser};

use log::debug;

/// Deepest block nesting the parser and the importer accept. Every pass
/// over the tree recurses, so deeper input is rejected up front.
pub const MAX_DEPTH: usize = 128;

use crate::schema::{IdGenerator, Schema};
use compile::emit_schema;
use emit::emit_dsl;
use import::import_schema;
use lexer::Lexer;
use parser::{finalize, Parser};
use token::Token;

/// The DSL compiler.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Scan DSL source into tokens.
    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, CompileError> {
        Lexer::new(source).tokenize()
    }

    /// Parse DSL source into a finalized Program AST.
    pub fn parse_program(&self, source: &str) -> Result<Program, CompileError> {
        let tokens = self.tokenize(source)?;
        debug!("lexed {} tokens", tokens.len());
        let program = Parser::new(source, tokens).parse()?;
        finalize(&program, self.config.strict_signals)?;
        Ok(program)
    }

    /// Parse DSL source into a Schema, with identifiers from the configured strategy.
    pub fn parse(&self, source: &str) -> Result<Schema, CompileError> {
        let mut ids = self.config.ids.generator();
        self.parse_with(source, ids.as_mut())
    }

    /// Parse DSL source into a Schema, drawing identifiers from `ids`.
    pub fn parse_with(&self, source: &str, ids: &mut dyn IdGenerator) -> Result<Schema, CompileError> {
        let program = self.parse_program(source)?;
        Ok(emit_schema(&program, ids))
    }

    /// Compile a Schema into canonical DSL text.
    pub fn compile(&self, schema: &Schema) -> Result<String, CompileError> {
        let program = import_schema(schema)?;
        Ok(emit_dsl(&program))
    }

    /// Compile `schema`, parse the result back and compare.
    pub fn roundtrip(&self, schema: &Schema) -> RoundtripReport {
        let dsl = match self.compile(schema) {
            Ok(dsl) => dsl,
            Err(e) => {
                debug!("roundtrip failed to compile: {e}");
                return RoundtripReport::failed(String::new(), "compile", &e);
            }
        };
        let reconstructed = match self.parse(&dsl) {
            Ok(schema) => schema,
            Err(e) => {
                debug!("roundtrip failed to parse: {e}");
                return RoundtripReport::failed(dsl, "parse", &e);
            }
        };
        let diff = SchemaDiff::diff(schema, &reconstructed);
        debug!("roundtrip finished with {} differences", diff.changes.len());
        RoundtripReport::from_diff(dsl, reconstructed, &diff)
    }

    /// A streaming parser that uses this compiler's configuration.
    pub fn streaming(&self) -> StreamingParser {
        StreamingParser::new(self.clone())
    }

    /// DSL → Schema → DSL: the canonical spelling of `source`.
    pub fn normalize(&self, source: &str) -> Result<String, CompileError> {
        let schema = self.parse(source)?;
        self.compile(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_canonicalizes_spelling() {
        let compiler = Compiler::default();
        assert_eq!(
            compiler.normalize("1 :revenue \"Revenue\" !h !p").unwrap(),
            "Kp :revenue !p"
        );
    }

    #[test]
    fn normalize_keeps_undeclared_signals_as_declarations() {
        let compiler = Compiler::default();
        assert_eq!(compiler.normalize("Tx <mode").unwrap(), "@mode\nTx <mode");
    }

    #[test]
    fn strict_compiler_rejects_undeclared() {
        let compiler = Compiler::new(CompilerConfig::strict());
        let err = compiler.parse("Tx <mode").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UndeclaredSignal);
        assert!(compiler.parse("@mode Tx <mode").is_ok());
    }

    #[test]
    fn roundtrip_reports_compile_failure() {
        let mut schema = Compiler::default().parse("Kp :a").unwrap();
        schema.version = "0.9".into();
        let report = Compiler::default().roundtrip(&schema);
        assert!(!report.is_equivalent);
        assert!(report.reconstructed.is_none());
        assert!(report.differences[0].starts_with("compile: "));
    }

    #[test]
    fn seeded_ids_are_reproducible() {
        let compiler = Compiler::new(CompilerConfig {
            ids: IdStrategy::Seeded { seed: 9 },
            ..CompilerConfig::default()
        });
        let a = compiler.parse("Cn [Tx :a, Tx :b]").unwrap();
        let b = compiler.parse("Cn [Tx :a, Tx :b]").unwrap();
        assert_eq!(a, b);
    }
}
