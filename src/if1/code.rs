//! IF1 `Code` nodes (§3.3): the instruction graph a closure's body is made
//! of. Group kinds (`SUB`/`SEQ`/`CONC`) nest other `Code` nodes; leaf kinds
//! (`MOVE`/`SEND`/`IF`/`LABEL`/`GOTO`/`NOP`) carry `rvals`/`lvals`/labels
//! directly.

use compiler_core_common::ArenaId;

use super::primitives::Primitive;
use super::sym::{LabelId, SymId};
use crate::ast::NodeRef;

pub type CodeId = ArenaId<CodeNode>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum CodeKind {
    Sub,
    Move,
    Send,
    If,
    Label,
    Goto,
    Seq,
    Conc,
    Nop,
}

impl CodeKind {
    pub fn is_group(self) -> bool {
        matches!(self, CodeKind::Sub | CodeKind::Seq | CodeKind::Conc)
    }
}

/// A single instruction or group (§3.3). `label_a`/`label_b` double up per
/// kind: for `IF` they are the true/false targets, for `GOTO` only `label_a`
/// (the target) is used, for `LABEL` only `label_a` (the label it binds).
#[derive(Debug, Clone)]
pub struct CodeNode {
    pub kind: CodeKind,
    pub rvals: Vec<SymId>,
    pub lvals: Vec<SymId>,
    pub label_a: Option<LabelId>,
    pub label_b: Option<LabelId>,
    pub ast: Option<NodeRef>,
    pub primitive: Option<Primitive>,
    pub live: bool,
    pub dead: bool,
    pub sub: Vec<CodeId>,
}

impl CodeNode {
    pub fn leaf(kind: CodeKind) -> Self {
        CodeNode {
            kind,
            rvals: Vec::new(),
            lvals: Vec::new(),
            label_a: None,
            label_b: None,
            ast: None,
            primitive: None,
            live: false,
            dead: false,
            sub: Vec::new(),
        }
    }

    pub fn group(kind: CodeKind) -> Self {
        debug_assert!(kind.is_group());
        CodeNode { sub: Vec::new(), ..CodeNode::leaf(kind) }
    }
}
