use std::fmt;

use super::Tree;
use crate::error::{Result, TreeError};
use crate::pset::{Node, Primitive, TerminalKind};
use crate::value::Value;

/// One postfix instruction.
#[derive(Clone, Debug)]
pub enum Instr {
    /// Push the positional argument at this index.
    Arg(usize),
    /// Push a constant.
    Const(Value),
    /// Pop `arity` operands (first argument deepest), push the result.
    Call(Primitive),
}

/// A compiled expression: postfix instructions over a value stack.
#[derive(Clone, Debug)]
pub struct Program {
    instrs: Vec<Instr>,
    arg_count: usize,
}

impl Program {
    pub(crate) fn compile(tree: &Tree) -> Result<Self> {
        let arg_count = tree.pset().arg_count();
        let mut instrs = Vec::with_capacity(tree.len());
        lower(tree, arg_count, &mut instrs)?;
        Ok(Self { instrs, arg_count })
    }

    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    pub fn arg_count(&self) -> usize {
        self.arg_count
    }

    /// Run with exactly `arg_count` positional arguments.
    pub fn run(&self, args: &[Value]) -> Result<Value> {
        if args.len() != self.arg_count {
            return Err(TreeError::ArgumentCount {
                expected: self.arg_count,
                given: args.len(),
            });
        }
        let mut stack: Vec<Value> = Vec::new();
        for instr in &self.instrs {
            match instr {
                Instr::Arg(i) => stack.push(args[*i].clone()),
                Instr::Const(v) => stack.push(v.clone()),
                Instr::Call(prim) => {
                    let base = stack.len().checked_sub(prim.arity()).ok_or_else(|| {
                        TreeError::Eval(format!("stack underflow calling '{}'", prim.name()))
                    })?;
                    let operands = stack.split_off(base);
                    let result = prim.call(&operands).map_err(|e| match e {
                        TreeError::Eval(msg) => TreeError::Eval(format!("{}: {}", prim.name(), msg)),
                        other => other,
                    })?;
                    stack.push(result);
                }
            }
        }
        match (stack.pop(), stack.is_empty()) {
            (Some(v), true) => Ok(v),
            _ => Err(TreeError::Eval(
                "program did not leave exactly one value".to_string(),
            )),
        }
    }
}

fn lower(tree: &Tree, arg_count: usize, out: &mut Vec<Instr>) -> Result<()> {
    for child in tree.children() {
        lower(child, arg_count, out)?;
    }
    match tree.node() {
        Node::Primitive(p) => out.push(Instr::Call(p.clone())),
        Node::Terminal(t) => match t.kind() {
            TerminalKind::Argument(i) if *i < arg_count => out.push(Instr::Arg(*i)),
            TerminalKind::Argument(i) => {
                return Err(TreeError::Eval(format!(
                    "argument '{}' (index {}) is outside the set's {} argument(s)",
                    t.name(),
                    i,
                    arg_count
                )))
            }
            TerminalKind::Named(v) | TerminalKind::Literal(v) => out.push(Instr::Const(v.clone())),
        },
    }
    Ok(())
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, instr) in self.instrs.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match instr {
                Instr::Arg(n) => write!(f, "arg{}", n)?,
                Instr::Const(v) => write!(f, "push({})", v.literal())?,
                Instr::Call(p) => write!(f, "{}/{}", p.name(), p.arity())?,
            }
        }
        Ok(())
    }
}
