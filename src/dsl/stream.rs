//! Incremental parsing of DSL text that arrives in chunks.
//!
//! Every chunk is appended to a buffer, and the buffer is parsed up to its
//! last safe point: a newline, comma or closing bracket outside any string,
//! comment or bracket. The last prefix that parsed is kept, so a half-written
//! statement never replaces a good result. [`StreamingParser::finalize`]
//! closes whatever is still open and parses the whole buffer.

use log::{debug, trace};

use super::ast::Program;
use super::compile::emit_schema;
use super::error::CompileError;
use super::Compiler;
use crate::schema::Schema;

/// The state after a chunk, or after finalizing.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamUpdate {
    /// Schema of the last program that parsed. Empty before anything has.
    pub schema: Schema,
    /// The input is balanced, fully parsed, and nothing is pending.
    pub complete: bool,
    /// Text after the last safe point, waiting for more input.
    pub pending: String,
    /// Why the latest attempt did not parse, if it did not.
    pub error: Option<CompileError>,
    /// Byte length of the prefix behind `schema`.
    pub checkpoint: usize,
    /// Blocks in the program behind `schema`.
    pub block_count: usize,
}

/// Where the buffer stands after a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Scan {
    safe_point: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    in_comment: bool,
}

impl Scan {
    fn of(input: &str) -> Self {
        let mut scan = Scan::default();
        let mut chars = input.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if scan.in_comment {
                if c == '\n' {
                    scan.in_comment = false;
                    if scan.depth == 0 {
                        scan.safe_point = i + 1;
                    }
                }
                continue;
            }
            if scan.in_string {
                match c {
                    _ if scan.escaped => scan.escaped = false,
                    '\\' => scan.escaped = true,
                    '"' => scan.in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => scan.in_string = true,
                '/' if chars.peek().is_some_and(|(_, next)| *next == '/') => {
                    scan.in_comment = true;
                }
                '[' => scan.depth += 1,
                ']' => {
                    scan.depth = scan.depth.saturating_sub(1);
                    if scan.depth == 0 {
                        scan.safe_point = i + 1;
                    }
                }
                '\n' | ',' if scan.depth == 0 => scan.safe_point = i + 1,
                _ => {}
            }
        }
        scan
    }

    fn balanced(&self) -> bool {
        self.depth == 0 && !self.in_string
    }

    /// `input` with its open string and brackets closed.
    fn close(&self, input: &str) -> String {
        let mut patched = String::with_capacity(input.len() + self.depth + 2);
        patched.push_str(input);
        if self.in_string {
            if self.escaped {
                patched.push('"');
            }
            patched.push('"');
        }
        if self.in_comment {
            patched.push('\n');
        }
        patched.extend(std::iter::repeat(']').take(self.depth));
        patched
    }
}

/// Best-effort parser for DSL text fed in pieces, e.g. while a model is
/// still generating it.
#[derive(Debug, Clone, Default)]
pub struct StreamingParser {
    compiler: Compiler,
    buffer: String,
    checkpoint: usize,
    last_good: Option<Program>,
}

impl StreamingParser {
    pub fn new(compiler: Compiler) -> Self {
        Self {
            compiler,
            ..Self::default()
        }
    }

    /// Append a chunk and parse up to the last safe point.
    pub fn feed(&mut self, chunk: &str) -> StreamUpdate {
        self.buffer.push_str(chunk);
        self.attempt()
    }

    /// Parse everything received, closing open strings and brackets.
    pub fn finalize(&mut self) -> StreamUpdate {
        let scan = Scan::of(&self.buffer);
        let patched = scan.close(&self.buffer);
        trace!("finalizing stream with {} closers", patched.len() - self.buffer.len());

        let error = match self.compiler.parse_program(&patched) {
            Ok(program) => {
                self.last_good = Some(program);
                self.checkpoint = self.buffer.len();
                None
            }
            Err(e) => {
                debug!("final parse failed, keeping last good program: {e}");
                Some(e)
            }
        };

        StreamUpdate {
            complete: true,
            pending: String::new(),
            ..self.update(error)
        }
    }

    /// A renderable schema for what has been received so far.
    pub fn best_effort(&mut self) -> Schema {
        if self.last_good.is_some() {
            self.update(None).schema
        } else {
            self.attempt().schema
        }
    }

    /// Forget all input.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.checkpoint = 0;
        self.last_good = None;
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    fn attempt(&mut self) -> StreamUpdate {
        let scan = Scan::of(&self.buffer);
        let (parseable, pending) = self.buffer.split_at(scan.safe_point);
        let pending = pending.to_string();

        if parseable.trim().is_empty() {
            return StreamUpdate {
                complete: false,
                pending,
                ..self.update(None)
            };
        }

        let error = match self.compiler.parse_program(parseable) {
            Ok(program) => {
                self.last_good = Some(program);
                self.checkpoint = scan.safe_point;
                None
            }
            Err(e) => {
                trace!("prefix of {} bytes did not parse: {e}", scan.safe_point);
                Some(e)
            }
        };
        debug!(
            "stream at {} bytes: checkpoint {}, {} pending",
            self.buffer.len(),
            self.checkpoint,
            pending.len()
        );

        let complete = error.is_none() && scan.balanced() && pending.trim().is_empty();
        StreamUpdate {
            complete,
            pending,
            ..self.update(error)
        }
    }

    fn update(&self, error: Option<CompileError>) -> StreamUpdate {
        let empty = Program::default();
        let program = self.last_good.as_ref().unwrap_or(&empty);
        let mut ids = self.compiler.config().ids.generator();
        let mut block_count = 0;
        program.walk(&mut |_| block_count += 1);

        StreamUpdate {
            schema: emit_schema(program, ids.as_mut()),
            complete: false,
            pending: String::new(),
            error,
            checkpoint: self.checkpoint,
            block_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{CompilerConfig, ErrorKind};
    use crate::schema::BlockType;

    const TABS: &str = "@tab\nCn ^r [\n  Bt \"Tab1\" >tab=1\n  Bt \"Tab2\" >tab=2\n]\n";

    fn chunks(source: &str, size: usize) -> Vec<String> {
        let chars: Vec<char> = source.chars().collect();
        chars.chunks(size).map(|c| c.iter().collect()).collect()
    }

    #[test]
    fn scan_finds_safe_points_outside_brackets() {
        assert_eq!(Scan::of("Kp :a\nKp :b").safe_point, 6);
        assert_eq!(Scan::of("Kp :a, Kp").safe_point, 6);
        assert_eq!(Scan::of("Cn [Kp :a, Kp :b").safe_point, 0);
        assert_eq!(Scan::of("Cn [Kp :a]").safe_point, 10);
        assert_eq!(Scan::of("Bt \"a,\nb").safe_point, 0);
        assert_eq!(Scan::of("Kp :a // x, [y\n").safe_point, 15);
    }

    #[test]
    fn scan_tracks_open_strings_and_brackets() {
        let scan = Scan::of("Cn [Bt \"Sa\\\"ve");
        assert_eq!(scan.depth, 1);
        assert!(scan.in_string);
        assert!(!scan.balanced());
        assert_eq!(scan.close("Cn [Bt \"Sa\\\"ve"), "Cn [Bt \"Sa\\\"ve\"]");
        assert_eq!(Scan::of("Cn [Kp :a // [").close("Cn [Kp :a // ["), "Cn [Kp :a // [\n]");
    }

    #[test]
    fn feed_waits_for_a_safe_point() {
        let mut parser = StreamingParser::default();
        let update = parser.feed("Kp :rev");
        assert!(!update.complete);
        assert_eq!(update.pending, "Kp :rev");
        assert!(update.schema.layers.is_empty());

        let update = parser.feed("enue !h\n");
        assert!(update.complete);
        assert_eq!(update.block_count, 1);
        assert_eq!(update.schema.layers[0].root.kind, BlockType::Kpi);
        assert_eq!(update.checkpoint, 15);
    }

    #[test]
    fn chunked_input_ends_like_a_full_parse() {
        let mut parser = StreamingParser::default();
        let mut last = None;
        for chunk in chunks(TABS, 5) {
            last = Some(parser.feed(&chunk));
        }
        let update = last.unwrap();
        assert!(update.complete);
        assert_eq!(update.schema, Compiler::default().parse(TABS).unwrap());
        assert_eq!(parser.finalize().schema, update.schema);
    }

    #[test]
    fn half_written_statement_keeps_last_good_schema() {
        let mut parser = StreamingParser::default();
        parser.feed("Hr :title\n");
        let update = parser.feed("Cn [Kp :a, Kp :");
        assert!(!update.complete);
        assert_eq!(update.block_count, 1);
        assert_eq!(update.schema.layers[0].root.kind, BlockType::Header);
        assert_eq!(update.pending, "Cn [Kp :a, Kp :");
    }

    #[test]
    fn failed_prefix_reports_error_and_falls_back() {
        let mut parser = StreamingParser::default();
        parser.feed("Kp :a\n");
        let update = parser.feed("Zz :b\n");
        assert_eq!(update.error.as_ref().map(CompileError::kind), Some(ErrorKind::UnknownType));
        assert!(!update.complete);
        assert_eq!(update.checkpoint, 6);
        assert_eq!(update.block_count, 1);
    }

    #[test]
    fn finalize_closes_open_brackets_and_strings() {
        let mut parser = StreamingParser::default();
        parser.feed("Cn [Kp :a, Bt \"Sav");
        let update = parser.finalize();
        assert!(update.complete);
        assert!(update.error.is_none());
        let root = &update.schema.layers[0].root;
        let children = root.children.as_ref().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].label.as_deref(), Some("Sav"));
    }

    #[test]
    fn finalize_falls_back_when_tail_is_unparseable() {
        let mut parser = StreamingParser::default();
        parser.feed("Tx :a\nCn [Kp :");
        let update = parser.finalize();
        assert!(update.error.is_some());
        assert_eq!(update.block_count, 1);
        assert_eq!(update.schema.layers[0].root.kind, BlockType::Text);
    }

    #[test]
    fn best_effort_and_reset() {
        let mut parser = StreamingParser::default();
        assert!(parser.best_effort().layers.is_empty());
        parser.feed("Kp :a\nKp");
        assert_eq!(parser.best_effort().layers[0].root.kind, BlockType::Kpi);
        assert_eq!(parser.buffer(), "Kp :a\nKp");
        parser.reset();
        assert_eq!(parser.buffer(), "");
        assert!(parser.best_effort().layers.is_empty());
    }

    #[test]
    fn strict_compiler_applies_to_the_stream() {
        let mut parser = StreamingParser::new(Compiler::new(CompilerConfig::strict()));
        let update = parser.feed("Tx <mode\n");
        assert_eq!(
            update.error.as_ref().map(CompileError::kind),
            Some(ErrorKind::UndeclaredSignal)
        );
    }
}
