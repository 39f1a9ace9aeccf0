//! Dead-code elimination over a finished IF1 graph (§4.7): root marking,
//! the code/symbol liveness fixed points, dead marking, primitive
//! recognition and the post-DCE `flatten_code` cleanup. Mark-and-sweep
//! over jump targets and instruction results, turned into a proper fixed
//! point over a tree instead of a flat instruction list.

use super::builder::If1Builder;
use super::code::{CodeId, CodeKind};
use super::sym::SymId;

/// Marks `sym` and everything it structurally depends on (`ty`, `enclosing`,
/// `implements`, `includes`, `constraints`, `has`) live, recursively.
pub fn mark_sym_live(builder: &mut If1Builder, sym: SymId) {
    if builder.syms.get(sym).live {
        return;
    }
    builder.syms.get_mut(sym).live = true;

    let (ty, enclosing, implements, includes, constraints, has) = {
        let s = builder.syms.get(sym);
        (s.ty, s.enclosing, s.implements.clone(), s.includes.clone(), s.constraints.clone(), s.has.clone())
    };
    if let Some(t) = ty {
        mark_sym_live(builder, t);
    }
    if let Some(e) = enclosing {
        mark_sym_live(builder, e);
    }
    for s in implements {
        mark_sym_live(builder, s);
    }
    for s in includes {
        mark_sym_live(builder, s);
    }
    for s in constraints {
        mark_sym_live(builder, s);
    }
    for s in has {
        mark_sym_live(builder, s);
    }
}

/// For every closure `f` in `allclosures`: mark `f`, its `ret` and its
/// `has` formals live (§4.7, "Root marking").
pub fn root_marking(builder: &mut If1Builder) {
    let closures = builder.closures.clone();
    for f in closures {
        mark_sym_live(builder, f);
        let ret = builder.syms.get(f).ret;
        if let Some(r) = ret {
            mark_sym_live(builder, r);
        }
        let has = builder.syms.get(f).has.clone();
        for h in has {
            mark_sym_live(builder, h);
        }
    }
}

/// One sweep of the code-liveness propagation below `code`, given whether
/// control reaches `code` (`incoming`). Returns `(changed, outgoing)`.
fn code_liveness_pass(builder: &mut If1Builder, code: CodeId, incoming: bool) -> (bool, bool) {
    let mut changed = false;
    if incoming && !builder.code.get(code).live {
        builder.code.get_mut(code).live = true;
        changed = true;
    }

    let kind = builder.code.get(code).kind;
    let mut outgoing = incoming;
    match kind {
        CodeKind::Goto => {
            if incoming {
                if let Some(lbl) = builder.code.get(code).label_a {
                    if !builder.labels.get(lbl).live {
                        builder.labels.get_mut(lbl).live = true;
                        changed = true;
                    }
                }
                outgoing = false;
            }
        }
        CodeKind::If => {
            if incoming {
                let targets = [builder.code.get(code).label_a, builder.code.get(code).label_b];
                for lbl in targets.into_iter().flatten() {
                    if !builder.labels.get(lbl).live {
                        builder.labels.get_mut(lbl).live = true;
                        changed = true;
                    }
                }
                outgoing = false;
            }
        }
        CodeKind::Label => {
            if let Some(lbl) = builder.code.get(code).label_a {
                if builder.labels.get(lbl).live && !outgoing {
                    outgoing = true;
                    changed = true;
                }
                if builder.labels.get(lbl).live && !builder.code.get(code).live {
                    builder.code.get_mut(code).live = true;
                    changed = true;
                }
            }
        }
        CodeKind::Move | CodeKind::Send | CodeKind::Nop => {}
        CodeKind::Sub | CodeKind::Seq | CodeKind::Conc => {
            let children = builder.code.get(code).sub.clone();
            let mut live = incoming;
            for c in children {
                let (ch, new_live) = code_liveness_pass(builder, c, live);
                changed |= ch;
                live = new_live;
            }
            outgoing = live;
        }
    }
    (changed, outgoing)
}

/// Iterates `code_liveness_pass` over every closure's code to a fixed
/// point: a `LABEL` reached by a later iteration can still unlock a
/// `GOTO`/`IF` earlier in program order on the next pass.
pub fn code_liveness(builder: &mut If1Builder) {
    loop {
        let mut changed = false;
        let closures = builder.closures.clone();
        for f in closures {
            if let Some(root) = builder.syms.get(f).code {
                let (ch, _) = code_liveness_pass(builder, root, true);
                changed |= ch;
            }
        }
        if !changed {
            break;
        }
    }
}

fn symbol_liveness_pass(builder: &mut If1Builder, code: CodeId) -> bool {
    if !builder.code.get(code).live {
        return false;
    }
    let mut changed = false;
    match builder.code.get(code).kind {
        CodeKind::If => {
            if let Some(cond) = builder.code.get(code).rvals.first().copied() {
                if !builder.syms.get(cond).live {
                    mark_sym_live(builder, cond);
                    changed = true;
                }
            }
        }
        CodeKind::Move => {
            let lval = builder.code.get(code).lvals.first().copied();
            let rval = builder.code.get(code).rvals.first().copied();
            if let (Some(l), Some(r)) = (lval, rval) {
                if builder.syms.get(l).live && !builder.syms.get(r).live {
                    mark_sym_live(builder, r);
                    changed = true;
                }
            }
        }
        CodeKind::Send => {
            let lvals = builder.code.get(code).lvals.clone();
            let rvals = builder.code.get(code).rvals.clone();
            let nonfunctional = builder.code.get(code).primitive.map(|p| p.is_nonfunctional()).unwrap_or(true);
            let any_result_live = lvals.iter().any(|&s| builder.syms.get(s).live);
            if lvals.is_empty() || any_result_live || nonfunctional {
                for &s in rvals.iter().chain(lvals.iter()) {
                    if !builder.syms.get(s).live {
                        mark_sym_live(builder, s);
                        changed = true;
                    }
                }
            }
        }
        CodeKind::Label | CodeKind::Goto | CodeKind::Nop => {}
        CodeKind::Sub | CodeKind::Seq | CodeKind::Conc => {
            let children = builder.code.get(code).sub.clone();
            for c in children {
                changed |= symbol_liveness_pass(builder, c);
            }
        }
    }
    changed
}

/// Fixed point over every live `Code` node: `IF` keeps its condition live,
/// a `MOVE` whose destination is live keeps its source live, and a `SEND`
/// with no results, a live result, or a non-functional (or unrecognised)
/// primitive keeps every one of its rvals/lvals live (§4.7).
pub fn symbol_liveness(builder: &mut If1Builder) {
    loop {
        let mut changed = false;
        let closures = builder.closures.clone();
        for f in closures {
            if let Some(root) = builder.syms.get(f).code {
                changed |= symbol_liveness_pass(builder, root);
            }
        }
        if !changed {
            break;
        }
    }
}

fn dead_marking_pass(builder: &mut If1Builder, code: CodeId) {
    let kind = builder.code.get(code).kind;
    let live = builder.code.get(code).live;
    let mut dead = !live;
    if !dead {
        match kind {
            CodeKind::Label => {
                if let Some(lbl) = builder.code.get(code).label_a {
                    if !builder.labels.get(lbl).live {
                        dead = true;
                    }
                }
            }
            CodeKind::Move => {
                if let Some(&l) = builder.code.get(code).lvals.first() {
                    if !builder.syms.get(l).live {
                        dead = true;
                    }
                }
            }
            CodeKind::Send => {
                let definitely_functional =
                    builder.code.get(code).primitive.map(|p| !p.is_nonfunctional()).unwrap_or(false);
                if definitely_functional {
                    if let Some(&l) = builder.code.get(code).lvals.first() {
                        if !builder.syms.get(l).live {
                            dead = true;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    builder.code.get_mut(code).dead = dead;
    if kind.is_group() {
        let children = builder.code.get(code).sub.clone();
        for c in children {
            dead_marking_pass(builder, c);
        }
    }
}

/// A `Code` node is dead if it was never reached (`!live`), or it is a
/// `LABEL` on a dead label, a `MOVE` into a dead symbol, or a functional
/// `SEND` whose sole result is dead (§4.7, "Dead marking").
pub fn dead_marking(builder: &mut If1Builder) {
    let closures = builder.closures.clone();
    for f in closures {
        if let Some(root) = builder.syms.get(f).code {
            dead_marking_pass(builder, root);
        }
    }
}

fn find_primitives_pass(builder: &mut If1Builder, code: CodeId) {
    let kind = builder.code.get(code).kind;
    if kind.is_group() {
        let children = builder.code.get(code).sub.clone();
        for c in children {
            find_primitives_pass(builder, c);
        }
    }
    if kind == CodeKind::Send {
        if let Some(op) = builder.code.get(code).rvals.first().copied() {
            let op_sym = builder.syms.get(op);
            if op_sym.is_builtin {
                if let Some(name) = op_sym.name {
                    let prim = builder.primitives.recognize(name);
                    builder.code.get_mut(code).primitive = prim;
                }
            }
        }
    }
}

/// Bottom-up `SEND` recognition: a `SEND` whose operator (`rvals[0]`) names
/// a registered builtin is tagged with the matching `Primitive`, if any
/// (§4.7, "Primitive recognition").
pub fn find_primitives(builder: &mut If1Builder) {
    let closures = builder.closures.clone();
    for f in closures {
        if let Some(root) = builder.syms.get(f).code {
            find_primitives_pass(builder, root);
        }
    }
}

pub fn simple_dce(builder: &mut If1Builder) {
    root_marking(builder);
    code_liveness(builder);
    symbol_liveness(builder);
    dead_marking(builder);
}

/// DCE-disabled path: every symbol, label and code node is kept (§4.7).
pub fn mark_everything_live(builder: &mut If1Builder) {
    for id in builder.syms.ids() {
        builder.syms.get_mut(id).live = true;
    }
    for id in builder.labels.ids() {
        builder.labels.get_mut(id).live = true;
    }
    for id in builder.code.ids() {
        builder.code.get_mut(id).live = true;
        builder.code.get_mut(id).dead = false;
    }
}

/// Rewrites every `SUB` group below `code` to `into_kind`, dropping dead
/// children and hoisting a child group whose (already rewritten) kind
/// matches its own parent's (P7: repeated calls are a no-op once every
/// group is uniform and no nested group duplicates its parent's kind).
pub fn flatten_code(builder: &mut If1Builder, code: CodeId, into_kind: CodeKind) {
    let kind = builder.code.get(code).kind;
    if !kind.is_group() {
        return;
    }
    let self_final_kind = if kind == CodeKind::Sub { into_kind } else { kind };

    let children = builder.code.get(code).sub.clone();
    let mut new_children = Vec::new();
    for child in children {
        if builder.code.get(child).dead {
            continue;
        }
        flatten_code(builder, child, into_kind);
        let child_kind = builder.code.get(child).kind;
        if child_kind.is_group() && child_kind == self_final_kind {
            new_children.extend(builder.code.get(child).sub.clone());
        } else {
            new_children.push(child);
        }
    }
    builder.code.get_mut(code).sub = new_children;
    builder.code.get_mut(code).kind = self_final_kind;
}
