//! The canonical IF1 text form (§4.8): an S-expression printer over live
//! symbols and their code. Deterministic by construction (P8): symbols are
//! emitted in ascending id order (arena allocation order), and `Code`/`Sym`
//! references print their numeric id rather than any address, so two runs
//! over the same builder state produce byte-identical output.

use super::builder::If1Builder;
use super::code::{CodeId, CodeKind};
use super::sym::{Imm, LabelId, SymId};

/// Indentation per nesting level, 2 spaces a level, capped at 40 columns --
/// past that depth the text stops growing a left margin but keeps nesting
/// structurally (the parens still balance).
fn indent(level: usize) -> String {
    " ".repeat((level * 2).min(40))
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn sym_ref(builder: &If1Builder, id: SymId) -> String {
    let s = builder.syms.get(id);
    if s.is_constant {
        let text = s.constant.map(|n| builder.interner.resolve_str(n)).unwrap_or("");
        format!("(const {} {})", quote(text), id.index())
    } else if let Some(name) = s.name {
        format!("(var {} {})", quote(builder.interner.resolve_str(name)), id.index())
    } else {
        format!("(temp {})", id.index())
    }
}

fn label_ref(builder: &If1Builder, id: LabelId) -> String {
    let l = builder.labels.get(id);
    match l.name {
        Some(name) => format!("(label {} {})", quote(builder.interner.resolve_str(name)), id.index()),
        None => format!("(label {})", id.index()),
    }
}

fn write_code(builder: &If1Builder, code: CodeId, level: usize, out: &mut String) {
    let node = builder.code.get(code);
    if node.dead {
        return;
    }
    let pad = indent(level);
    match node.kind {
        CodeKind::Nop => {
            out.push_str(&pad);
            out.push_str("(NOP)\n");
        }
        CodeKind::Move => {
            out.push_str(&pad);
            out.push_str(&format!(
                "(MOVE {} -> {})\n",
                sym_ref(builder, node.rvals[0]),
                sym_ref(builder, node.lvals[0])
            ));
        }
        CodeKind::Send => {
            let op = sym_ref(builder, node.rvals[0]);
            let args: Vec<String> = node.rvals[1..].iter().map(|&s| sym_ref(builder, s)).collect();
            let results: Vec<String> = node.lvals.iter().map(|&s| sym_ref(builder, s)).collect();
            out.push_str(&pad);
            out.push_str(&format!(
                "(SEND ({} {}) -> (FUTURE {}))\n",
                op,
                args.join(" "),
                results.join(" ")
            ));
        }
        CodeKind::If => {
            out.push_str(&pad);
            let true_label = node.label_a.map(|l| label_ref(builder, l)).unwrap_or_else(|| "(label)".to_string());
            let false_label = node.label_b.map(|l| label_ref(builder, l)).unwrap_or_else(|| "(label)".to_string());
            out.push_str(&format!(
                "(IF {} :TRUE {} :FALSE {})\n",
                sym_ref(builder, node.rvals[0]),
                true_label,
                false_label
            ));
        }
        CodeKind::Label => {
            out.push_str(&pad);
            let label = node.label_a.map(|l| label_ref(builder, l)).unwrap_or_else(|| "(label)".to_string());
            out.push_str(&format!("(LABEL {})\n", label));
        }
        CodeKind::Goto => {
            out.push_str(&pad);
            let label = node.label_a.map(|l| label_ref(builder, l)).unwrap_or_else(|| "(label)".to_string());
            out.push_str(&format!("(GOTO {})\n", label));
        }
        CodeKind::Sub | CodeKind::Seq | CodeKind::Conc => {
            let keyword = match node.kind {
                CodeKind::Sub => "SUB",
                CodeKind::Seq => "SEQ",
                CodeKind::Conc => "CONC",
                _ => unreachable!(),
            };
            out.push_str(&pad);
            out.push_str(&format!("({}\n", keyword));
            for &child in &node.sub {
                write_code(builder, child, level + 1, out);
            }
            out.push_str(&pad);
            out.push_str(")\n");
        }
    }
}

fn write_imm(imm: Imm) -> String {
    match imm {
        Imm::None => "()".to_string(),
        Imm::Bool(b) => b.to_string(),
        Imm::Int(i) => i.to_string(),
        Imm::Float(f) => f.to_string(),
    }
}

fn write_sym_list(builder: &If1Builder, keyword: &str, syms: &[SymId], out: &mut String) {
    if syms.is_empty() {
        return;
    }
    let parts: Vec<String> = syms.iter().map(|&s| sym_ref(builder, s)).collect();
    out.push_str(&format!("{}{} ({})\n", indent(1), keyword, parts.join(" ")));
}

fn write_symbol(builder: &If1Builder, id: SymId, out: &mut String) {
    let s = builder.syms.get(id);
    out.push_str(&format!("(SYMBOL {}\n", sym_ref(builder, id)));
    if let Some(ty) = s.ty {
        out.push_str(&format!("{}:TYPE {}\n", indent(1), sym_ref(builder, ty)));
    }
    if s.is_constant {
        let text = match s.constant {
            Some(name) => quote(builder.interner.resolve_str(name)),
            None => write_imm(s.imm),
        };
        out.push_str(&format!("{}:CONSTANT {}\n", indent(1), text));
    }
    if let Some(aspect) = s.aspect {
        out.push_str(&format!("{}:ASPECT {}\n", indent(1), sym_ref(builder, aspect)));
    }
    if let Some(in_sym) = s.enclosing {
        out.push_str(&format!("{}:IN {}\n", indent(1), sym_ref(builder, in_sym)));
    }
    write_sym_list(builder, ":HAS", &s.has, out);
    write_sym_list(builder, ":IMPLEMENTS", &s.implements, out);
    write_sym_list(builder, ":INCLUDES", &s.includes, out);
    if let Some(ret) = s.ret {
        out.push_str(&format!("{}:RET {}\n", indent(1), sym_ref(builder, ret)));
    }
    if let Some(cont) = s.cont {
        out.push_str(&format!("{}:CONT {}\n", indent(1), sym_ref(builder, cont)));
    }
    if s.is_value_class {
        out.push_str(&format!("{}:VALUE true\n", indent(1)));
    }
    if let Some(code) = s.code {
        out.push_str(&format!("{}:CODE\n", indent(1)));
        write_code(builder, code, 2, out);
    }
    out.push_str(")\n");
}

/// Renders every live symbol, in ascending id order, as the canonical IF1
/// text form (P8).
pub fn write_if1(builder: &If1Builder) -> String {
    let mut out = String::new();
    for id in builder.syms.ids() {
        if builder.syms.get(id).live {
            write_symbol(builder, id, &mut out);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::if1::sym::Sym;

    #[test]
    fn write_if1_is_deterministic_across_runs() {
        let mut b = If1Builder::new();
        let f = b.register_sym(Sym::new(), None);
        let arg = b.register_sym(Sym::new(), None);
        b.closure(f, None, vec![arg]);
        crate::if1::liveness::simple_dce(&mut b);

        let first = write_if1(&b);
        let second = write_if1(&b);
        assert_eq!(first, second);
    }

    #[test]
    fn dead_code_is_never_printed() {
        let mut b = If1Builder::new();
        let src = b.register_sym(Sym::new(), None);
        let dst = b.register_sym(Sym::new(), None);
        let f = b.register_sym(Sym::new(), None);

        let mut code = None;
        b.move_(&mut code, src, dst, None);
        let root = code.unwrap();
        b.closure(f, Some(root), vec![]);

        crate::if1::liveness::simple_dce(&mut b);
        crate::if1::liveness::flatten_code(&mut b, root, CodeKind::Conc);

        let text = write_if1(&b);
        assert!(!text.contains("MOVE"));
    }

    #[test]
    fn a_live_send_prints_results_as_a_future() {
        let mut b = If1Builder::new();
        let op = b.register_sym(Sym::new(), None);
        let result = b.register_sym(Sym::new(), None);
        let f = b.register_sym(Sym::new(), None);

        let mut code = None;
        b.send(&mut code, vec![op], vec![result], None);
        let root = code.unwrap();
        b.closure(f, Some(root), vec![]);
        b.syms.get_mut(f).ret = Some(result);

        crate::if1::liveness::simple_dce(&mut b);
        crate::if1::liveness::flatten_code(&mut b, root, CodeKind::Conc);

        let text = write_if1(&b);
        assert!(text.contains("(FUTURE"));
    }
}
