//! Primitive sets and the nodes drawn from them.
//!
//! A genetic-programming run hands us its individuals as flat, prefix-order
//! lists of [`Node`]s together with the [`PrimitiveSet`] they were drawn
//! from. A node is either a primitive (a function with a fixed arity) or a
//! zero-arity terminal: an input argument, a named constant, or an anonymous
//! literal such as an ephemeral random constant.

pub mod builtins;


use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::value::Value;

/// The callable behind a primitive. Receives exactly `arity` arguments.
pub type PrimitiveFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// A function node with a fixed arity.
#[derive(Clone)]
pub struct Primitive {
    name: String,
    arity: usize,
    func: PrimitiveFn,
}

impl Primitive {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitive")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// What a terminal stands for.
#[derive(Clone, Debug, PartialEq)]
pub enum TerminalKind {
    /// Positional input argument; formats as its (possibly renamed) name.
    Argument(usize),
    /// Constant registered under a symbolic name; formats as that name.
    Named(Value),
    /// Anonymous constant; formats as the value's literal form.
    Literal(Value),
}

/// A zero-arity leaf node.
#[derive(Clone, Debug, PartialEq)]
pub struct Terminal {
    name: String,
    kind: TerminalKind,
}

impl Terminal {
    pub fn argument(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            kind: TerminalKind::Argument(index),
        }
    }

    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            kind: TerminalKind::Named(value),
        }
    }

    pub fn literal(value: Value) -> Self {
        Self {
            name: value.to_string(),
            kind: TerminalKind::Literal(value),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TerminalKind {
        &self.kind
    }

    pub fn format(&self) -> String {
        match &self.kind {
            TerminalKind::Argument(_) | TerminalKind::Named(_) => self.name.clone(),
            TerminalKind::Literal(v) => v.literal(),
        }
    }
}

/// A node of a flattened expression: a primitive or a terminal.
#[derive(Clone, Debug)]
pub enum Node {
    Primitive(Primitive),
    Terminal(Terminal),
}

impl Node {
    pub fn arity(&self) -> usize {
        match self {
            Node::Primitive(p) => p.arity,
            Node::Terminal(_) => 0,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Primitive(p) => &p.name,
            Node::Terminal(t) => &t.name,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Node::Terminal(_))
    }

    /// Render this node given its children's already formatted text.
    /// Primitives become `name(a, b)`; terminals ignore `children`.
    pub fn format(&self, children: &[String]) -> String {
        match self {
            Node::Primitive(p) => format!("{}({})", p.name, children.join(", ")),
            Node::Terminal(t) => t.format(),
        }
    }

    /// Structural equality: same kind, name and arity (and same constant).
    pub fn same_as(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Primitive(a), Node::Primitive(b)) => a.name == b.name && a.arity == b.arity,
            (Node::Terminal(a), Node::Terminal(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Terminal> for Node {
    fn from(t: Terminal) -> Self {
        Node::Terminal(t)
    }
}

impl From<Primitive> for Node {
    fn from(p: Primitive) -> Self {
        Node::Primitive(p)
    }
}

/// The universe of primitives and terminals an expression is drawn from.
#[derive(Clone, Debug)]
pub struct PrimitiveSet {
    name: String,
    primitives: Vec<Primitive>,
    terminals: Vec<Terminal>,
    /// Argument names by position; renames update these in place.
    arguments: Vec<String>,
    by_name: HashMap<String, Entry>,
}

#[derive(Clone, Copy, Debug)]
enum Entry {
    Primitive(usize),
    Terminal(usize),
    Argument(usize),
}

impl PrimitiveSet {
    /// A new set taking `arg_count` positional inputs named `ARG0`, `ARG1`, ...
    pub fn new(name: impl Into<String>, arg_count: usize) -> Self {
        let mut pset = Self {
            name: name.into(),
            primitives: Vec::new(),
            terminals: Vec::new(),
            arguments: Vec::new(),
            by_name: HashMap::new(),
        };
        for i in 0..arg_count {
            let arg = format!("ARG{}", i);
            pset.by_name.insert(arg.clone(), Entry::Argument(i));
            pset.arguments.push(arg);
        }
        pset
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arg_count(&self) -> usize {
        self.arguments.len()
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn terminals(&self) -> &[Terminal] {
        &self.terminals
    }

    /// Register a primitive. A later registration under the same name wins.
    pub fn add_primitive<F>(&mut self, name: &str, arity: usize, func: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        let prim = Primitive {
            name: name.to_string(),
            arity,
            func: Arc::new(func),
        };
        match self.by_name.get(name) {
            Some(Entry::Primitive(i)) => self.primitives[*i] = prim,
            _ => {
                if self.by_name.contains_key(name) {
                    log::warn!("primitive '{}' shadows an existing terminal", name);
                }
                self.by_name
                    .insert(name.to_string(), Entry::Primitive(self.primitives.len()));
                self.primitives.push(prim);
            }
        }
        self
    }

    /// Register a constant terminal. With a name it formats symbolically,
    /// otherwise it formats as its literal value.
    pub fn add_terminal(&mut self, value: Value, name: Option<&str>) -> &mut Self {
        let term = match name {
            Some(n) => Terminal::named(n, value),
            None => Terminal::literal(value),
        };
        match self.by_name.get(term.name()) {
            Some(Entry::Terminal(i)) => self.terminals[*i] = term,
            _ => {
                self.by_name
                    .insert(term.name().to_string(), Entry::Terminal(self.terminals.len()));
                self.terminals.push(term);
            }
        }
        self
    }

    /// Rename positional arguments, e.g. `[("ARG0", "x")]`.
    /// Unknown old names are ignored with a warning.
    pub fn rename_arguments(&mut self, renames: &[(&str, &str)]) -> &mut Self {
        for (old, new) in renames {
            match self.by_name.get(*old).copied() {
                Some(Entry::Argument(i)) => {
                    self.by_name.remove(*old);
                    self.by_name.insert(new.to_string(), Entry::Argument(i));
                    self.arguments[i] = new.to_string();
                }
                _ => log::warn!("rename of unknown argument '{}' in set '{}'", old, self.name),
            }
        }
        self
    }

    pub fn primitive(&self, name: &str) -> Option<Node> {
        match self.by_name.get(name) {
            Some(Entry::Primitive(i)) => Some(Node::Primitive(self.primitives[*i].clone())),
            _ => None,
        }
    }

    /// Look up a zero-arity node: an argument or a registered terminal.
    pub fn terminal(&self, name: &str) -> Option<Node> {
        match self.by_name.get(name) {
            Some(Entry::Argument(i)) => Some(Node::Terminal(Terminal::argument(
                self.arguments[*i].clone(),
                *i,
            ))),
            Some(Entry::Terminal(i)) => Some(Node::Terminal(self.terminals[*i].clone())),
            _ => None,
        }
    }

    /// Either kind of node by name.
    pub fn lookup(&self, name: &str) -> Option<Node> {
        self.primitive(name).or_else(|| self.terminal(name))
    }

    pub fn argument(&self, index: usize) -> Option<Node> {
        self.arguments
            .get(index)
            .map(|name| Node::Terminal(Terminal::argument(name.clone(), index)))
    }

    pub fn is_argument(&self, name: &str) -> bool {
        matches!(self.by_name.get(name), Some(Entry::Argument(_)))
    }

    /// An anonymous constant node, as produced by an ephemeral generator.
    pub fn literal(value: impl Into<Value>) -> Node {
        Node::Terminal(Terminal::literal(value.into()))
    }
}
