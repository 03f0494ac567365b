//! Parser for LiquidCode.
//!
//! Recursive descent over the token stream. Tokens are reused heavily (a
//! digit can be a type alias, an indexed binding, a priority or a span), so
//! every production decides by position. The parser keeps the source text
//! because bare computed expressions are taken verbatim from it.

use std::collections::HashSet;

use super::ast::*;
use super::error::{CompileError, Location, Position};
use super::token::{Token, TokenKind};
use super::MAX_DEPTH;
use crate::schema::{Binding, BlockType, ColumnSpan, Direction, Flex, Fraction, Size, Trigger};

pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    layer_ids: HashSet<u32>,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            layer_ids: HashSet::new(),
            depth: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Program, CompileError> {
        let mut program = Program::default();

        loop {
            let t = self.peek().clone();
            match &t.kind {
                TokenKind::Eof => break,
                TokenKind::Newline | TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::At => {
                    self.advance();
                    let name = self.expect_name()?;
                    program.signals.push(SignalDecl {
                        name,
                        pos: t.position(),
                    });
                }
                TokenKind::Slash => program.layers.push(self.parse_layer()?),
                _ => program.blocks.extend(self.parse_item()?),
            }
        }

        Ok(program)
    }

    /// `/N guarded-block`
    fn parse_layer(&mut self) -> Result<LayerDef, CompileError> {
        let slash = self.advance().clone();
        let id_token = self.peek().clone();
        let id = self.expect_layer_id()?;
        if id == 0 {
            return Err(CompileError::parse(
                "layer id >= 1 (layer 0 is the base layer)",
                id_token.kind.to_string(),
                id_token.position(),
            ));
        }
        if !self.layer_ids.insert(id) {
            return Err(CompileError::DuplicateLayer {
                id,
                position: slash.position(),
            });
        }
        let root = self.parse_guarded_block()?;
        Ok(LayerDef {
            id,
            root,
            pos: slash.position(),
        })
    }

    /// A block, a guarded block, or a guarded block list. The list form
    /// yields one block per entry, each carrying the condition.
    fn parse_item(&mut self) -> Result<Vec<BlockNode>, CompileError> {
        if !self.check(&TokenKind::Question) {
            return Ok(vec![self.parse_block()?]);
        }

        let condition = self.parse_condition()?;
        if !self.check(&TokenKind::Colon) {
            let mut block = self.parse_block()?;
            block.condition = Some(condition);
            return Ok(vec![block]);
        }

        self.advance();
        self.expect(&TokenKind::LBracket, "'['")?;
        let mut blocks = self.parse_block_list()?;
        for block in &mut blocks {
            if block.condition.is_some() {
                return Err(CompileError::parse(
                    "unguarded block inside a conditional list",
                    "second condition",
                    block.pos,
                ));
            }
            block.condition = Some(condition.clone());
        }
        Ok(blocks)
    }

    fn parse_guarded_block(&mut self) -> Result<BlockNode, CompileError> {
        let condition = if self.check(&TokenKind::Question) {
            Some(self.parse_condition()?)
        } else {
            None
        };
        let mut block = self.parse_block()?;
        block.condition = condition;
        Ok(block)
    }

    /// `? ['@'] name '=' value`
    fn parse_condition(&mut self) -> Result<ConditionNode, CompileError> {
        let question = self.advance().clone();
        let syntax = if self.check(&TokenKind::At) {
            self.advance();
            ConditionSyntax::At
        } else {
            ConditionSyntax::Bare
        };
        let signal = self.expect_name()?;
        self.expect(&TokenKind::Eq, "'=' in condition")?;
        let value = self.expect_value()?;
        Ok(ConditionNode {
            signal,
            value,
            syntax,
            pos: question.position(),
        })
    }

    /// Items up to and including the closing `]`. Commas and newlines
    /// between items are optional.
    fn parse_block_list(&mut self) -> Result<Vec<BlockNode>, CompileError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(&format!("nesting depth <= {MAX_DEPTH}")));
        }
        self.depth += 1;
        let blocks = self.parse_block_list_items();
        self.depth -= 1;
        blocks
    }

    fn parse_block_list_items(&mut self) -> Result<Vec<BlockNode>, CompileError> {
        let mut blocks = Vec::new();
        loop {
            while self.check(&TokenKind::Newline) || self.check(&TokenKind::Comma) {
                self.advance();
            }
            if self.check(&TokenKind::RBracket) {
                self.advance();
                return Ok(blocks);
            }
            if self.is_at_end() {
                return Err(self.error("']'"));
            }
            blocks.extend(self.parse_item()?);
        }
    }

    /// `type-code [binding] [label] modifier* [children]`
    fn parse_block(&mut self) -> Result<BlockNode, CompileError> {
        let t = self.peek().clone();
        let (kind, type_ref) = match &t.kind {
            TokenKind::TypeCode(code) => match BlockType::from_code(code) {
                Some(kind) => (kind, TypeRef::Code(code.clone())),
                None => {
                    return Err(CompileError::UnknownType {
                        code: code.clone(),
                        position: t.position(),
                    })
                }
            },
            TokenKind::Digit(d) => match BlockType::from_index(*d) {
                Some(kind) => (kind, TypeRef::Index(*d)),
                None => return Err(self.error("block type")),
            },
            _ => return Err(self.error("block type")),
        };
        self.advance();

        let mut block = BlockNode::new(kind, type_ref, t.position());
        block.binding = self.parse_binding()?;
        if block.binding.is_some() {
            if let TokenKind::Str(label) = &self.peek().kind {
                block.label = Some(label.clone());
                self.advance();
            }
        }

        self.parse_modifiers(&mut block)?;

        if self.check(&TokenKind::LBracket) {
            self.advance();
            block.children = Some(self.parse_block_list()?);
        }

        Ok(block)
    }

    fn parse_binding(&mut self) -> Result<Option<Binding>, CompileError> {
        let binding = match &self.peek().kind {
            TokenKind::Colon => {
                self.advance();
                Binding::Field(self.expect_name()?)
            }
            TokenKind::Digit(d) => {
                let n = u32::from(*d);
                self.advance();
                Binding::Indexed(n)
            }
            TokenKind::Number(lexeme) => match lexeme.parse::<u32>() {
                Ok(n) => {
                    self.advance();
                    Binding::Indexed(n)
                }
                Err(_) => return Err(self.error("integer index")),
            },
            TokenKind::Eq => self.parse_expression()?,
            TokenKind::Str(text) => {
                let text = text.clone();
                self.advance();
                Binding::Literal(text)
            }
            _ => return Ok(None),
        };
        Ok(Some(binding))
    }

    /// `'=' expression`: the raw source text after `=` up to whitespace,
    /// `,`, `[`, `]` or `"`; or a string directly after `=`. A bare
    /// expression may not contain `//`, which the lexer reads as a comment.
    fn parse_expression(&mut self) -> Result<Binding, CompileError> {
        let eq = self.advance().clone();
        let start = eq.end();
        let source = self.source;
        let rest = source.get(start..).unwrap_or("");
        let raw_len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, ',' | '[' | ']' | '"'))
            .unwrap_or(rest.len());

        if raw_len == 0 {
            let adjacent = self.peek().offset == start;
            return match &self.peek().kind {
                TokenKind::Str(expr) if adjacent => {
                    let expr = expr.clone();
                    self.advance();
                    Ok(Binding::Computed(expr))
                }
                _ => Err(self.error("expression")),
            };
        }

        let raw = &rest[..raw_len];
        if raw.contains("//") {
            return Err(CompileError::parse(
                "expression without '//' (quote it: =\"...\")",
                format!("'{raw}'"),
                eq.position(),
            ));
        }

        let end = start + raw_len;
        while !self.is_at_end() && self.peek().offset < end {
            self.advance();
        }
        Ok(Binding::Computed(raw.to_string()))
    }

    fn parse_modifiers(&mut self, block: &mut BlockNode) -> Result<(), CompileError> {
        loop {
            let t = self.peek().clone();
            let pos = t.position();
            match &t.kind {
                TokenKind::Bang => {
                    self.advance();
                    let level = match &self.peek().kind {
                        TokenKind::Ident(s) if s == "h" => PriorityLevel::Hero,
                        TokenKind::Ident(s) if s == "p" => PriorityLevel::Primary,
                        TokenKind::Ident(s) if s == "s" => PriorityLevel::Secondary,
                        TokenKind::Digit(d) => PriorityLevel::Level(*d),
                        _ => return Err(self.error("priority (h, p, s or 0-9)")),
                    };
                    self.advance();
                    block.modifiers.push(Modifier::Priority(level));
                }
                TokenKind::Star => {
                    self.advance();
                    let span = match &self.peek().kind {
                        TokenKind::Digit(d) => ColumnSpan::Columns(u32::from(*d)),
                        TokenKind::Number(lexeme) => match lexeme.parse::<u32>() {
                            Ok(n) => ColumnSpan::Columns(n),
                            Err(_) => return Err(self.error("column count")),
                        },
                        TokenKind::Ident(s) => match s.as_str() {
                            "h" => ColumnSpan::Fraction(Fraction::Half),
                            "f" => ColumnSpan::Fraction(Fraction::Full),
                            "t" => ColumnSpan::Fraction(Fraction::Third),
                            "q" => ColumnSpan::Fraction(Fraction::Quarter),
                            _ => return Err(self.error("span (number, h, f, t or q)")),
                        },
                        _ => return Err(self.error("span (number, h, f, t or q)")),
                    };
                    self.advance();
                    block.modifiers.push(Modifier::Span(span));
                }
                TokenKind::Caret => {
                    self.advance();
                    let modifier = match &self.peek().kind {
                        TokenKind::Ident(s) => match s.as_str() {
                            "f" => Modifier::Flex(Flex::Fixed),
                            "s" => Modifier::Flex(Flex::Shrink),
                            "g" => Modifier::Flex(Flex::Grow),
                            "r" => Modifier::Direction(Direction::Row),
                            "c" => Modifier::Direction(Direction::Column),
                            _ => return Err(self.error("flex or direction (f, s, g, r or c)")),
                        },
                        _ => return Err(self.error("flex or direction (f, s, g, r or c)")),
                    };
                    self.advance();
                    block.modifiers.push(modifier);
                }
                TokenKind::Percent => {
                    self.advance();
                    let size = match &self.peek().kind {
                        TokenKind::Ident(s) => match s.as_str() {
                            "sm" => Size::Small,
                            "md" => Size::Medium,
                            "lg" => Size::Large,
                            _ => return Err(self.error("size (sm, md or lg)")),
                        },
                        _ => return Err(self.error("size (sm, md or lg)")),
                    };
                    self.advance();
                    block.modifiers.push(Modifier::Size(size));
                }
                TokenKind::Hash => {
                    self.advance();
                    let color = self.parse_color(t.end())?;
                    block.modifiers.push(Modifier::Color(color));
                }
                TokenKind::At => {
                    self.advance();
                    let name = self.expect_name()?;
                    block.signals.push(SignalRef::Declare { name, pos });
                }
                TokenKind::Lt => {
                    self.advance();
                    if self.check(&TokenKind::Gt) {
                        self.advance();
                        let name = self.expect_name()?;
                        block.signals.push(SignalRef::Both { name, pos });
                    } else {
                        let name = self.expect_name()?;
                        block.signals.push(SignalRef::Receive { name, pos });
                    }
                }
                TokenKind::Gt => {
                    self.advance();
                    if self.check(&TokenKind::Slash) {
                        self.advance();
                        let layer = self.expect_layer_id()?;
                        block.triggers.push(TriggerNode {
                            trigger: Trigger::Open { layer },
                            pos,
                        });
                    } else {
                        let name = self.expect_name()?;
                        let value = if self.check(&TokenKind::Eq) {
                            self.advance();
                            Some(self.expect_value()?)
                        } else {
                            None
                        };
                        block.signals.push(SignalRef::Emit { name, value, pos });
                    }
                }
                TokenKind::Slash if self.peek_kind_at(1) == Some(&TokenKind::Lt) => {
                    self.advance();
                    self.advance();
                    block.triggers.push(TriggerNode {
                        trigger: Trigger::Close,
                        pos,
                    });
                }
                _ => return Ok(()),
            }
        }
    }

    /// `#` followed by a string, or by a run of identifier/number tokens
    /// with no gaps (so `#3b82f6` reads as one color).
    fn parse_color(&mut self, hash_end: usize) -> Result<String, CompileError> {
        if let TokenKind::Str(color) = &self.peek().kind {
            let color = color.clone();
            self.advance();
            return Ok(color);
        }

        let mut color = String::new();
        let mut end = hash_end;
        loop {
            let t = self.peek();
            if t.offset != end {
                break;
            }
            match &t.kind {
                TokenKind::Digit(d) => color.push_str(&d.to_string()),
                TokenKind::Number(s) | TokenKind::Ident(s) | TokenKind::TypeCode(s) => {
                    color.push_str(s)
                }
                _ => break,
            }
            end = t.end();
            self.advance();
        }

        if color.is_empty() {
            return Err(self.error("color"));
        }
        Ok(color)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind_at(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn advance(&mut self) -> &Token {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end()
            && std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn error(&self, expected: &str) -> CompileError {
        let t = self.peek();
        CompileError::parse(expected, t.kind.to_string(), t.position())
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<&Token, CompileError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(expected))
        }
    }

    /// `name := identifier | TYPE_CODE | STRING`
    fn expect_name(&mut self) -> Result<String, CompileError> {
        let name = match &self.peek().kind {
            TokenKind::Ident(s) | TokenKind::TypeCode(s) | TokenKind::Str(s) => s.clone(),
            _ => return Err(self.error("name")),
        };
        self.advance();
        Ok(name)
    }

    /// `value := identifier | TYPE_CODE | DIGIT | NUMBER | STRING`
    fn expect_value(&mut self) -> Result<String, CompileError> {
        let value = match &self.peek().kind {
            TokenKind::Ident(s)
            | TokenKind::TypeCode(s)
            | TokenKind::Number(s)
            | TokenKind::Str(s) => s.clone(),
            TokenKind::Digit(d) => d.to_string(),
            _ => return Err(self.error("value")),
        };
        self.advance();
        Ok(value)
    }

    fn expect_layer_id(&mut self) -> Result<u32, CompileError> {
        let id = match &self.peek().kind {
            TokenKind::Digit(d) => u32::from(*d),
            TokenKind::Number(lexeme) => match lexeme.parse::<u32>() {
                Ok(id) => id,
                Err(_) => return Err(self.error("layer id")),
            },
            _ => return Err(self.error("layer id")),
        };
        self.advance();
        Ok(id)
    }
}

/// Second pass over a parsed program: checks that need the whole stream.
///
/// Open triggers must target a defined layer (layer 0 counts when the base
/// layer has blocks). With `strict_signals`, every used signal must be
/// declared somewhere; otherwise undeclared names are promoted when the
/// signal set is built.
pub fn finalize(program: &Program, strict_signals: bool) -> Result<(), CompileError> {
    if strict_signals {
        let usage = SignalUsage::collect(program);
        let first = usage.undeclared().next().cloned();
        if let Some((name, pos)) = first {
            return Err(CompileError::UndeclaredSignal {
                name,
                location: Location::Source(pos),
            });
        }
    }

    let defined: HashSet<u32> = program.layers.iter().map(|l| l.id).collect();
    let has_base = !program.blocks.is_empty();
    let mut missing: Option<(u32, Position)> = None;
    program.walk(&mut |block| {
        for node in &block.triggers {
            if let Trigger::Open { layer } = node.trigger {
                let exists = defined.contains(&layer) || (layer == 0 && has_base);
                if !exists && missing.is_none() {
                    missing = Some((layer, node.pos));
                }
            }
        }
    });

    match missing {
        Some((id, pos)) => Err(CompileError::UnknownLayer {
            id,
            location: Location::Source(pos),
        }),
        None => Ok(()),
    }
}
