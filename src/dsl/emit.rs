//! DSL emitter. Regenerates canonical LiquidCode text from a [`Program`].
//!
//! Output is deterministic: one line for root signal declarations, one per
//! top-level block, one per layer. Modifiers are written resolved (one per
//! class) in a fixed order, so emitting a parsed program collapses repeats.

use std::fmt::Write;

use log::debug;

use super::ast::*;
use super::lexer::{is_ident_continue, is_ident_start, Lexer};
use crate::schema::{Binding, ColumnSpan, Direction, Flex, Fraction, Size, Trigger};

pub fn emit_dsl(program: &Program) -> String {
    let policy = OverridePolicy::default();
    let mut lines = Vec::new();

    if !program.signals.is_empty() {
        let decls: Vec<String> = program
            .signals
            .iter()
            .map(|decl| format!("@{}", name(&decl.name)))
            .collect();
        lines.push(decls.join(" "));
    }

    for block in &program.blocks {
        lines.push(block_text(block, policy));
    }

    for layer in &program.layers {
        lines.push(format!("/{} {}", layer.id, block_text(&layer.root, policy)));
    }

    let dsl = lines.join("\n");
    debug!("emitted {} DSL lines ({} bytes)", lines.len(), dsl.len());
    dsl
}

fn block_text(block: &BlockNode, policy: OverridePolicy) -> String {
    let mut out = String::new();
    write_block(&mut out, block, policy);
    out
}

fn write_block(out: &mut String, block: &BlockNode, policy: OverridePolicy) {
    if let Some(cond) = &block.condition {
        let _ = write!(out, "?@{}={} ", name(&cond.signal), value(&cond.value));
    }

    match block.kind.code() {
        Some(code) => out.push_str(code),
        None => out.push_str(block.kind.name()),
    }

    if let Some(binding) = &block.binding {
        write_binding(out, binding);
    }
    // Without a binding this reads back as literal text.
    if let Some(label) = &block.label {
        let _ = write!(out, " {}", quote(label));
    }

    let layout = block.layout(policy);
    if let Some(priority) = layout.priority {
        match PriorityLevel::from_value(priority) {
            Some(PriorityLevel::Hero) => out.push_str(" !h"),
            Some(PriorityLevel::Primary) => out.push_str(" !p"),
            Some(PriorityLevel::Secondary) => out.push_str(" !s"),
            Some(PriorityLevel::Level(n)) => {
                let _ = write!(out, " !{n}");
            }
            None => debug!("priority {priority} has no DSL spelling, dropped"),
        }
    }
    if let Some(span) = layout.span {
        out.push_str(" *");
        match span {
            ColumnSpan::Columns(n) => {
                let _ = write!(out, "{n}");
            }
            ColumnSpan::Fraction(Fraction::Half) => out.push('h'),
            ColumnSpan::Fraction(Fraction::Full) => out.push('f'),
            ColumnSpan::Fraction(Fraction::Third) => out.push('t'),
            ColumnSpan::Fraction(Fraction::Quarter) => out.push('q'),
        }
    }
    if let Some(flex) = layout.flex {
        out.push_str(match flex {
            Flex::Fixed => " ^f",
            Flex::Shrink => " ^s",
            Flex::Grow => " ^g",
        });
    }
    if let Some(direction) = layout.direction {
        out.push_str(match direction {
            Direction::Row => " ^r",
            Direction::Column => " ^c",
        });
    }

    let style = block.style(policy);
    if let Some(size) = style.size {
        out.push_str(match size {
            Size::Small => " %sm",
            Size::Medium => " %md",
            Size::Large => " %lg",
        });
    }
    if let Some(color) = &style.color {
        if is_bare_color(color) {
            let _ = write!(out, " #{color}");
        } else {
            let _ = write!(out, " #{}", quote(color));
        }
    }

    let signals = block.signal_bindings(policy);
    for decl in &signals.declare {
        let _ = write!(out, " @{}", name(decl));
    }
    if let Some(receive) = &signals.receive {
        let _ = write!(out, " <{}", name(receive));
    }
    if let Some(both) = &signals.both {
        let _ = write!(out, " <>{}", name(both));
    }
    if let Some(emit) = &signals.emit {
        let _ = write!(out, " >{}", name(&emit.name));
        if let Some(v) = &emit.value {
            let _ = write!(out, "={}", value(v));
        }
    }

    match block.trigger(policy) {
        Some(Trigger::Open { layer }) => {
            let _ = write!(out, " >/{layer}");
        }
        Some(Trigger::Close) => out.push_str(" /<"),
        None => {}
    }

    if let Some(children) = &block.children {
        out.push_str(" [");
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_block(out, child, policy);
        }
        out.push(']');
    }
}

fn write_binding(out: &mut String, binding: &Binding) {
    let _ = match binding {
        Binding::Field(field) => write!(out, " :{}", name(field)),
        Binding::Indexed(n) => write!(out, " {n}"),
        Binding::Computed(expr) if is_bare_expression(expr) => write!(out, " ={expr}"),
        Binding::Computed(expr) => write!(out, " ={}", quote(expr)),
        Binding::Literal(text) => write!(out, " {}", quote(text)),
        Binding::Unsupported(kind) => {
            debug!("binding kind '{kind}' has no DSL spelling, dropped");
            Ok(())
        }
    };
}

/// Double-quote `s`, escaping `\`, `"`, newline and tab.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// A name written bare reads back as one identifier or type-code token.
fn is_bare_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_continue)
}

/// A value written bare reads back as one identifier, digit or number token.
fn is_bare_value(s: &str) -> bool {
    if is_bare_name(s) {
        return true;
    }
    let (int, frac) = match s.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (s, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    digits(int) && frac.map_or(true, digits)
}

/// Bare expressions must survive the raw-text read after `=`: nothing
/// that ends it early, nothing that starts a comment, and nothing the
/// lexer rejects.
fn is_bare_expression(expr: &str) -> bool {
    !expr.is_empty()
        && !expr.contains("//")
        && !expr
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ',' | '[' | ']' | '"'))
        && Lexer::new(expr).tokenize().is_ok()
}

/// Colors are read back as a gap-free run of identifier and number tokens.
fn is_bare_color(color: &str) -> bool {
    !color.is_empty() && color.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn name(s: &str) -> String {
    if is_bare_name(s) {
        s.to_string()
    } else {
        quote(s)
    }
}

fn value(s: &str) -> String {
    if is_bare_value(s) {
        s.to_string()
    } else {
        quote(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::Compiler;

    fn canonical(source: &str) -> String {
        emit_dsl(&Compiler::default().parse_program(source).unwrap())
    }

    #[test]
    fn emit_preserves_canonical_text() {
        let src = "@tab\nCn ^r [Bt \"Tab1\" !5 >tab=1,Bt \"Tab2\" !3 >tab=2]";
        assert_eq!(canonical(src), src);
    }

    #[test]
    fn emit_uses_codes_for_digit_aliases() {
        assert_eq!(canonical("1 :revenue !h"), "Kp :revenue !h");
    }

    #[test]
    fn emit_fixed_modifier_order() {
        assert_eq!(
            canonical("Cn #red %lg ^r ^g *h !p @x <y"),
            "Cn !p *h ^g ^r %lg #red @x <y"
        );
    }

    #[test]
    fn emit_collapses_repeated_modifiers() {
        assert_eq!(canonical("Kp :a !h !p %sm %lg"), "Kp :a !p %lg");
    }

    #[test]
    fn emit_canonical_condition_spelling() {
        assert_eq!(canonical("?tab=1 Tx :a"), "?@tab=1 Tx :a");
    }

    #[test]
    fn emit_expands_conditional_lists() {
        assert_eq!(
            canonical("Cn [?@t=2:[Tx :a, Tx :b]]"),
            "Cn [?@t=2 Tx :a,?@t=2 Tx :b]"
        );
    }

    #[test]
    fn emit_layers_and_triggers() {
        let src = "Bt \"Open\" >/1\n/1 Md [Tx :detail,Bt \"Close\" /<]";
        assert_eq!(canonical(src), src);
    }

    #[test]
    fn emit_quotes_where_needed() {
        assert_eq!(
            canonical(r##"Kp :"unit price" #"#fff" >"my sig"="x y""##),
            r##"Kp :"unit price" #"#fff" >"my sig"="x y""##
        );
        assert_eq!(canonical(r#"Kp ="a - b""#), r#"Kp ="a - b""#);
    }

    #[test]
    fn emit_bare_forms() {
        assert_eq!(
            canonical("Kp =revenue/orders >sel=2.5 #00ff00"),
            "Kp =revenue/orders #00ff00 >sel=2.5"
        );
    }

    #[test]
    fn emit_keeps_empty_children() {
        assert_eq!(canonical("Cn []"), "Cn []");
    }

    #[test]
    fn quote_escapes() {
        assert_eq!(quote("a\"b\\c\nd\te"), r#""a\"b\\c\nd\te""#);
    }

    #[test]
    fn bare_checks() {
        assert!(is_bare_name("user.name"));
        assert!(!is_bare_name("1st"));
        assert!(is_bare_value("007"));
        assert!(is_bare_value("2.5"));
        assert!(!is_bare_value("2."));
        assert!(is_bare_expression("a*b%c"));
        assert!(!is_bare_expression("a-b"));
        assert!(!is_bare_expression("a//b"));
        assert!(!is_bare_expression(""));
        assert!(is_bare_color("3b82f6"));
        assert!(!is_bare_color("#fff"));
    }
}
