//! The IF1 construction API (C6, §4.6): a stateful builder threaded through
//! AST->IR lowering, following a label-allocate/bind/reference shape
//! generalised from a flat instruction array to a nested `Code` tree.

use std::collections::HashMap;

use compiler_core_common::interner::Symbol as Name;
use compiler_core_common::{int_fatal, Arena, Interner};

use crate::ast::NodeRef;

use super::code::{CodeId, CodeKind, CodeNode};
use super::liveness;
use super::primitives::PrimitiveRegistry;
use super::sym::{Imm, Label, LabelId, Sym, SymId, TypeKindTag};

/// Integer builtin names `set_primitive_types` populates, with signedness
/// and bit width (§6, "Builtins registry").
const INT_TYPES: &[(&str, bool, u32)] = &[
    ("bool", false, 1),
    ("uint8", false, 8),
    ("int8", true, 8),
    ("uint16", false, 16),
    ("int16", true, 16),
    ("uint32", false, 32),
    ("int32", true, 32),
    ("uint64", false, 64),
    ("int64", true, 64),
];

const FLOAT_TYPES: &[(&str, u32)] = &[("float32", 32), ("float64", 64), ("float128", 128)];

pub struct If1Builder {
    pub interner: Interner,
    pub syms: Arena<Sym>,
    pub labels: Arena<Label>,
    pub code: Arena<CodeNode>,
    pub closures: Vec<SymId>,
    pub primitives: PrimitiveRegistry,
    constants: HashMap<(SymId, Name), SymId>,
    symbol_literals: HashMap<Name, SymId>,
    builtins: HashMap<Name, SymId>,
}

impl If1Builder {
    pub fn new() -> Self {
        let mut interner = Interner::new();
        let primitives = PrimitiveRegistry::new(&mut interner);
        If1Builder {
            interner,
            syms: Arena::new(),
            labels: Arena::new(),
            code: Arena::new(),
            closures: Vec::new(),
            primitives,
            constants: HashMap::new(),
            symbol_literals: HashMap::new(),
            builtins: HashMap::new(),
        }
    }

    /// Re-interns a name resolved from another interner (typically the AST
    /// `Context`'s) into this builder's own `strings` table (§4.6). The two
    /// interners are distinct instances, so a raw `Name` handle cannot be
    /// reused across them -- only the text it denotes survives the trip.
    pub fn reintern(&mut self, other: &Interner, name: Name) -> Name {
        let text = other.resolve_str(name).to_string();
        self.interner.intern_str(&text)
    }

    // ---- symbol/constant/builtin tables -------------------------------

    pub fn register_sym(&mut self, mut sym: Sym, name: Option<Name>) -> SymId {
        sym.name = name;
        let id = self.syms.alloc(sym);
        self.syms.get_mut(id).id = id.index() as u32;
        id
    }

    /// Canonical constant of `ty` (a type-carrying `Sym`) and `text` (J5):
    /// repeated calls with an equal `(ty, intern(text))` return the same
    /// `Sym`.
    pub fn constant(&mut self, ty: SymId, text: &str) -> SymId {
        let name = self.interner.intern_str(text);
        if let Some(&existing) = self.constants.get(&(ty, name)) {
            return existing;
        }
        let mut sym = Sym::new();
        sym.is_constant = true;
        sym.constant = Some(name);
        sym.ty = Some(ty);
        sym.imm = parse_imm(text);
        let id = self.register_sym(sym, None);
        self.constants.insert((ty, name), id);
        id
    }

    /// Interned, uniqued symbol of kind *symbol literal* (§4.6).
    pub fn make_symbol(&mut self, name: Name) -> SymId {
        if let Some(&existing) = self.symbol_literals.get(&name) {
            return existing;
        }
        let mut sym = Sym::named(name);
        sym.is_symbol = true;
        let id = self.register_sym(sym, Some(name));
        self.symbol_literals.insert(name, id);
        id
    }

    /// Registers `sym` as the builtin named `name`. Duplicate registration
    /// of the same name is fatal (§4.6).
    pub fn set_builtin(&mut self, sym: SymId, name: Name) {
        if self.builtins.contains_key(&name) {
            int_fatal!(None, "duplicate builtin registration for {:?}", name);
        }
        self.syms.get_mut(sym).is_builtin = true;
        self.builtins.insert(name, sym);
    }

    pub fn get_builtin(&self, name: Name) -> Option<SymId> {
        self.builtins.get(&name).copied()
    }

    fn ensure_builtin(&mut self, text: &str) -> SymId {
        let name = self.interner.intern_str(text);
        if let Some(&sym) = self.builtins.get(&name) {
            return sym;
        }
        let sym = self.register_sym(Sym::new(), Some(name));
        self.set_builtin(sym, name);
        sym
    }

    /// Populates the integer and floating-point builtin types, setting
    /// their `type_kind` (§4.6, "Primitive binding"). These are bootstrapped
    /// unconditionally rather than lazily on first use, since the driver
    /// pipeline (`compile`) calls this once per compilation regardless of
    /// whether the program references any primitive type -- see
    /// `DESIGN.md`.
    pub fn set_primitive_types(&mut self) {
        for &(text, signed, bits) in INT_TYPES {
            let sym = self.ensure_builtin(text);
            let kind = if text == "bool" { TypeKindTag::Boolean } else { TypeKindTag::Integer { signed, bits } };
            self.syms.get_mut(sym).type_kind = kind;
        }
        for &(text, bits) in FLOAT_TYPES {
            let sym = self.ensure_builtin(text);
            self.syms.get_mut(sym).type_kind = TypeKindTag::Float { bits };
        }
    }

    // ---- label allocation ----------------------------------------------

    pub fn alloc_label(&mut self, name: Option<Name>) -> LabelId {
        let id = self.labels.alloc(Label { id: 0, name, bound: false, live: false });
        self.labels.get_mut(id).id = id.index() as u32;
        id
    }

    // ---- code composition ------------------------------------------------

    fn alloc_leaf(
        &mut self,
        kind: CodeKind,
        rvals: Vec<SymId>,
        lvals: Vec<SymId>,
        label_a: Option<LabelId>,
        label_b: Option<LabelId>,
        ast: Option<NodeRef>,
    ) -> CodeId {
        let mut node = CodeNode::leaf(kind);
        node.rvals = rvals;
        node.lvals = lvals;
        node.label_a = label_a;
        node.label_b = label_b;
        node.ast = ast;
        self.code.alloc(node)
    }

    fn append(&mut self, into: &mut Option<CodeId>, kind: CodeKind, child: CodeId) {
        let group = match *into {
            Some(g) => g,
            None => {
                let g = self.code.alloc(CodeNode::group(kind));
                *into = Some(g);
                g
            }
        };
        self.code.get_mut(group).sub.push(child);
    }

    pub fn nop(&mut self, into: &mut Option<CodeId>, ast: Option<NodeRef>) -> CodeId {
        let id = self.alloc_leaf(CodeKind::Nop, Vec::new(), Vec::new(), None, None, ast);
        self.append(into, CodeKind::Sub, id);
        id
    }

    pub fn gen(&mut self, into: &mut Option<CodeId>, code: CodeId) {
        self.append(into, CodeKind::Sub, code);
    }

    pub fn seq(&mut self, into: &mut Option<CodeId>, code: CodeId) {
        self.append(into, CodeKind::Seq, code);
    }

    pub fn conc(&mut self, into: &mut Option<CodeId>, code: CodeId) {
        self.append(into, CodeKind::Conc, code);
    }

    pub fn move_(&mut self, into: &mut Option<CodeId>, src: SymId, dst: SymId, ast: Option<NodeRef>) -> CodeId {
        let id = self.alloc_leaf(CodeKind::Move, vec![src], vec![dst], None, None, ast);
        self.append(into, CodeKind::Sub, id);
        id
    }

    /// Emits a `SEND`. `args[0]` is the operator/callee symbol (J4); panics
    /// (internal error) if `args` is empty.
    pub fn send(&mut self, into: &mut Option<CodeId>, args: Vec<SymId>, results: Vec<SymId>, ast: Option<NodeRef>) -> CodeId {
        if args.is_empty() {
            int_fatal!(None, "SEND requires at least one rval (J4)");
        }
        let id = self.alloc_leaf(CodeKind::Send, args, results, None, None, ast);
        self.append(into, CodeKind::Sub, id);
        id
    }

    /// Emits an empty `SEND` for `add_send_arg`/`add_send_result` to fill in
    /// afterward. The op symbol still has to be the first arg added.
    pub fn send1(&mut self, into: &mut Option<CodeId>, op: SymId, ast: Option<NodeRef>) -> CodeId {
        self.send(into, vec![op], Vec::new(), ast)
    }

    pub fn add_send_arg(&mut self, code: CodeId, sym: SymId) {
        self.code.get_mut(code).rvals.push(sym);
    }

    pub fn add_send_result(&mut self, code: CodeId, sym: SymId) {
        self.code.get_mut(code).lvals.push(sym);
    }

    /// Emits a `SEND` over `op` and up to three operands, with a fresh
    /// result symbol; returns that symbol.
    pub fn operator(
        &mut self,
        into: &mut Option<CodeId>,
        op: SymId,
        a1: Option<SymId>,
        a2: Option<SymId>,
        a3: Option<SymId>,
        ast: Option<NodeRef>,
    ) -> SymId {
        let mut args = vec![op];
        args.extend([a1, a2, a3].into_iter().flatten());
        let result = self.register_sym(Sym::new(), None);
        self.send(into, args, vec![result], ast);
        result
    }

    // ---- branch construction ---------------------------------------------

    pub fn if_goto(&mut self, into: &mut Option<CodeId>, cond: SymId, ast: Option<NodeRef>) -> CodeId {
        let id = self.alloc_leaf(CodeKind::If, vec![cond], Vec::new(), None, None, ast);
        self.append(into, CodeKind::Sub, id);
        id
    }

    pub fn if_label_true(&mut self, code: CodeId, label: LabelId) {
        self.code.get_mut(code).label_a = Some(label);
    }

    pub fn if_label_false(&mut self, code: CodeId, label: LabelId) {
        self.code.get_mut(code).label_b = Some(label);
    }

    pub fn set_goto(&mut self, code: CodeId, label: LabelId) {
        self.code.get_mut(code).label_a = Some(label);
    }

    pub fn goto(&mut self, into: &mut Option<CodeId>, label: LabelId, ast: Option<NodeRef>) -> CodeId {
        let id = self.alloc_leaf(CodeKind::Goto, Vec::new(), Vec::new(), Some(label), None, ast);
        self.append(into, CodeKind::Sub, id);
        id
    }

    /// Allocates (when `label` is `None`) or binds an existing label (J3:
    /// exactly one `LABEL` per `Label`). Fatal if the label was already
    /// bound.
    pub fn label(&mut self, into: &mut Option<CodeId>, ast: Option<NodeRef>, label: Option<LabelId>) -> LabelId {
        let lbl = label.unwrap_or_else(|| self.alloc_label(None));
        if self.labels.get(lbl).bound {
            int_fatal!(None, "label already bound by a LABEL (J3)");
        }
        self.labels.get_mut(lbl).bound = true;
        let id = self.alloc_leaf(CodeKind::Label, Vec::new(), Vec::new(), Some(lbl), None, ast);
        self.append(into, CodeKind::Sub, id);
        lbl
    }

    /// High-level if-then-else synthesis (S3): threads `result` through
    /// both arms via `MOVE`. `IF cond; true: then_code; MOVE then_var ->
    /// result; GOTO end; false: else_code; MOVE else_var -> result; end:`.
    #[allow(clippy::too_many_arguments)]
    pub fn if_(
        &mut self,
        into: &mut Option<CodeId>,
        cond_code: Option<CodeId>,
        cond_var: SymId,
        then_code: Option<CodeId>,
        then_var: Option<SymId>,
        else_code: Option<CodeId>,
        else_var: Option<SymId>,
        result: Option<SymId>,
        ast: Option<NodeRef>,
    ) {
        if let Some(c) = cond_code {
            self.gen(into, c);
        }
        let branch = self.if_goto(into, cond_var, ast.clone());
        let true_label = self.alloc_label(None);
        let false_label = self.alloc_label(None);
        let end_label = self.alloc_label(None);
        self.if_label_true(branch, true_label);
        self.if_label_false(branch, false_label);

        self.label(into, ast.clone(), Some(true_label));
        if let Some(c) = then_code {
            self.gen(into, c);
        }
        if let (Some(result), Some(then_var)) = (result, then_var) {
            self.move_(into, then_var, result, ast.clone());
        }
        self.goto(into, end_label, ast.clone());

        self.label(into, ast.clone(), Some(false_label));
        if let Some(c) = else_code {
            self.gen(into, c);
        }
        if let Some(result) = result {
            if let Some(value) = else_var.or(then_var) {
                self.move_(into, value, result, ast.clone());
            }
        }
        self.label(into, ast, Some(end_label));
    }

    /// Emits a pre-test loop `while cond { body }`, degrading to a
    /// post-test (`do-while`) loop when `before == body` by reference (S4).
    /// `continue` targets `cont`; `break` targets `brk`.
    #[allow(clippy::too_many_arguments)]
    pub fn if1_loop(
        &mut self,
        into: &mut Option<CodeId>,
        cont: LabelId,
        brk: LabelId,
        cond_var: SymId,
        before: Option<CodeId>,
        cond: CodeId,
        after: Option<CodeId>,
        body: CodeId,
        ast: Option<NodeRef>,
    ) {
        let post_test = before == Some(body);

        if post_test {
            self.label(into, ast.clone(), Some(cont));
            self.gen(into, body);
            if let Some(a) = after {
                self.gen(into, a);
            }
            self.gen(into, cond);
            let branch = self.if_goto(into, cond_var, ast.clone());
            self.if_label_true(branch, cont);
            self.if_label_false(branch, brk);
            self.label(into, ast, Some(brk));
        } else {
            if let Some(b) = before {
                self.gen(into, b);
            }
            self.label(into, ast.clone(), Some(cont));
            self.gen(into, cond);
            let entry = self.alloc_label(None);
            let branch = self.if_goto(into, cond_var, ast.clone());
            self.if_label_true(branch, entry);
            self.if_label_false(branch, brk);

            self.label(into, ast.clone(), Some(entry));
            self.gen(into, body);
            if let Some(a) = after {
                self.gen(into, a);
            }
            self.goto(into, cont, ast.clone());
            self.label(into, ast, Some(brk));
        }
    }

    /// Registers `f` as a closure with body `code` and ordered argument
    /// vector `args` (J2: if `code` is set, its root must be a group kind).
    pub fn closure(&mut self, f: SymId, code: Option<CodeId>, args: Vec<SymId>) {
        if let Some(c) = code {
            if !self.code.get(c).kind.is_group() {
                int_fatal!(None, "closure root code must be a group kind (J2)");
            }
        }
        {
            let sym = self.syms.get_mut(f);
            sym.has = args;
            sym.code = code;
        }
        if !self.closures.contains(&f) {
            self.closures.push(f);
        }
    }

    // ---- finalisation ------------------------------------------------------

    pub fn live_symbols(&self) -> Vec<SymId> {
        self.syms.ids().filter(|&id| self.syms.get(id).live).collect()
    }

    /// `top <- get_builtin("init"); find_primitives(); dce or mark-all;
    /// flatten_code(each closure, CONC)` (§4.7). `top` is looked up for
    /// parity with the documented sequence but is not otherwise required:
    /// root marking already walks every closure in `allclosures`
    /// unconditionally, and a top-level module's own `initFn` is not
    /// necessarily named `"init"` (only a spliced-out nested module's is,
    /// per `splice_nested_module`) -- see `DESIGN.md`.
    pub fn finalize(&mut self, dce_enabled: bool) {
        let init_name = self.interner.intern_str("init");
        let _top = self.get_builtin(init_name);

        liveness::find_primitives(self);
        if dce_enabled {
            liveness::simple_dce(self);
        } else {
            liveness::mark_everything_live(self);
        }

        let closures = self.closures.clone();
        for f in closures {
            if let Some(root) = self.syms.get(f).code {
                liveness::flatten_code(self, root, CodeKind::Conc);
            }
        }
    }
}

impl Default for If1Builder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_imm(text: &str) -> Imm {
    if text == "true" {
        return Imm::Bool(true);
    }
    if text == "false" {
        return Imm::Bool(false);
    }
    if let Ok(i) = text.parse::<i64>() {
        return Imm::Int(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        return Imm::Float(f);
    }
    Imm::None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// S3: `IF c; true: MOVE 1 -> r; GOTO end; false: MOVE 2 -> r; end:`.
    /// With `c` live and both arms reachable, both `MOVE`s survive DCE; with
    /// `r` dead and no non-functional sends, both are marked dead.
    #[test]
    fn if_threads_result_through_both_arms_via_move() {
        let mut b = If1Builder::new();
        let bool_name = b.interner.intern_str("bool");
        let bool_ty = b.ensure_builtin("bool");
        b.syms.get_mut(bool_ty).type_kind = TypeKindTag::Boolean;
        let _ = bool_name;

        let c = b.register_sym(Sym::new(), None);
        let one = b.constant(bool_ty, "1");
        let two = b.constant(bool_ty, "2");
        let r = b.register_sym(Sym::new(), None);

        let mut code = None;
        b.if_(&mut code, None, c, None, Some(one), None, Some(two), Some(r), None);

        let root = code.expect("if_ should have produced code");
        let f = b.register_sym(Sym::new(), None);
        b.closure(f, Some(root), vec![c]);
        b.syms.get_mut(f).ret = Some(r);

        liveness::simple_dce(&mut b);
        assert!(b.syms.get(c).live);
        assert!(b.syms.get(one).live);
        assert!(b.syms.get(two).live);
        assert!(b.syms.get(r).live);

        let moves: Vec<_> = b
            .code
            .iter()
            .filter(|(_, n)| n.kind == CodeKind::Move)
            .collect();
        assert_eq!(moves.len(), 2);
        assert!(moves.iter().all(|(_, n)| n.live && !n.dead));
    }

    /// S4: a pre-test and a post-test loop each have a single `cont` label,
    /// a single `brk` label, and exactly one conditional branch; the
    /// post-test form has no branch before the body.
    #[test]
    fn if1_loop_pre_test_has_a_branch_before_the_body() {
        let mut b = If1Builder::new();
        let cond_var = b.register_sym(Sym::new(), None);
        let cont = b.alloc_label(None);
        let brk = b.alloc_label(None);

        let mut cond_code = None;
        b.nop(&mut cond_code, None);
        let cond_code = cond_code.unwrap();

        let mut body_code = None;
        b.nop(&mut body_code, None);
        let body_code = body_code.unwrap();

        let mut into = None;
        b.if1_loop(&mut into, cont, brk, cond_var, None, cond_code, None, body_code, None);
        let root = into.unwrap();

        let ifs: Vec<_> = b.code.iter().filter(|(_, n)| n.kind == CodeKind::If).collect();
        assert_eq!(ifs.len(), 1);

        let labels_bound: Vec<_> = b.code.iter().filter(|(_, n)| n.kind == CodeKind::Label).collect();
        // cont, entry, brk
        assert_eq!(labels_bound.len(), 3);
        assert!(b.labels.get(cont).bound);
        assert!(b.labels.get(brk).bound);

        // The conditional branch precedes the body: it is not the top-level
        // group's last child.
        let root_node = b.code.get(root);
        assert!(matches!(b.code.get(root_node.sub[0]).kind, CodeKind::Nop | CodeKind::Sub));
        assert!(root_node.sub.iter().any(|&c| b.code.get(c).kind == CodeKind::If));
    }

    /// A `continue` must re-check the loop condition rather than jump
    /// straight into the body: `LABEL(cont)` has to precede `cond`/the `IF`
    /// in emission order, not sit between the `IF` and the body.
    #[test]
    fn if1_loop_pre_test_continue_label_precedes_the_condition_check() {
        let mut b = If1Builder::new();
        let cond_var = b.register_sym(Sym::new(), None);
        let cont = b.alloc_label(None);
        let brk = b.alloc_label(None);

        let mut cond_code = None;
        b.nop(&mut cond_code, None);
        let cond_code = cond_code.unwrap();

        let mut body_code = None;
        b.nop(&mut body_code, None);
        let body_code = body_code.unwrap();

        let mut into = None;
        b.if1_loop(&mut into, cont, brk, cond_var, None, cond_code, None, body_code, None);
        let root = into.unwrap();

        let root_node = b.code.get(root);
        let cont_pos = root_node
            .sub
            .iter()
            .position(|&c| b.code.get(c).kind == CodeKind::Label && b.code.get(c).label_a == Some(cont))
            .expect("LABEL(cont) must be emitted");
        let if_pos = root_node
            .sub
            .iter()
            .position(|&c| b.code.get(c).kind == CodeKind::If)
            .expect("IF must be emitted");

        assert!(cont_pos < if_pos, "LABEL(cont) must precede the condition check, so continue re-tests cond");
    }

    #[test]
    fn if1_loop_post_test_has_no_branch_before_the_body() {
        let mut b = If1Builder::new();
        let cond_var = b.register_sym(Sym::new(), None);
        let cont = b.alloc_label(None);
        let brk = b.alloc_label(None);

        let mut body_code = None;
        b.nop(&mut body_code, None);
        let body_code = body_code.unwrap();

        let mut cond_code = None;
        b.nop(&mut cond_code, None);
        let cond_code = cond_code.unwrap();

        let mut into = None;
        // before == body by reference: post-test form.
        b.if1_loop(&mut into, cont, brk, cond_var, Some(body_code), cond_code, None, body_code, None);
        let root = into.unwrap();

        let root_node = b.code.get(root);
        // First child is the LABEL binding `cont`, not a branch.
        let first = b.code.get(root_node.sub[0]);
        assert_eq!(first.kind, CodeKind::Label);
        assert_eq!(first.label_a, Some(cont));

        let ifs: Vec<_> = b.code.iter().filter(|(_, n)| n.kind == CodeKind::If).collect();
        assert_eq!(ifs.len(), 1);
        let labels_bound: Vec<_> = b.code.iter().filter(|(_, n)| n.kind == CodeKind::Label).collect();
        // cont, brk only -- no synthetic entry label needed.
        assert_eq!(labels_bound.len(), 2);
    }

    #[test]
    fn set_primitive_types_bootstraps_every_required_builtin() {
        let mut b = If1Builder::new();
        b.set_primitive_types();
        for &(name, ..) in INT_TYPES {
            let n = b.interner.intern_str(name);
            assert!(b.get_builtin(n).is_some(), "missing integer builtin {name}");
        }
        for &(name, _) in FLOAT_TYPES {
            let n = b.interner.intern_str(name);
            assert!(b.get_builtin(n).is_some(), "missing float builtin {name}");
        }
    }

    #[test]
    fn constant_is_canonical_for_equal_type_and_text() {
        let mut b = If1Builder::new();
        let ty = b.register_sym(Sym::new(), None);
        let a = b.constant(ty, "42");
        let c = b.constant(ty, "42");
        assert_eq!(a, c);
        let d = b.constant(ty, "43");
        assert_ne!(a, d);
    }

    #[test]
    #[should_panic(expected = "duplicate builtin")]
    fn set_builtin_twice_under_the_same_name_is_fatal() {
        let mut b = If1Builder::new();
        let name = b.interner.intern_str("dup");
        let a = b.register_sym(Sym::new(), None);
        let c = b.register_sym(Sym::new(), None);
        b.set_builtin(a, name);
        b.set_builtin(c, name);
    }
}
