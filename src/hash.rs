//! Content addressing for expression trees.
//!
//! Tree identity (`TreeId`) is deliberately not derived from content, so two
//! identical sub-trees render as two graph nodes. When structure *is* what
//! matters (deduplicating individuals, checking that a reconstruction is
//! faithful) the content hash answers it: a BLAKE3 digest over a tagged
//! serialisation of the prefix-order sequence.

use crate::pset::{Node, TerminalKind};
use crate::value::Value;

// Node tags (1-byte prefix).
const TAG_PRIMITIVE: u8 = 0x01;
const TAG_ARGUMENT: u8 = 0x02;
const TAG_NAMED: u8 = 0x03;
const TAG_LITERAL: u8 = 0x04;

// Version byte for hash stability
const HASH_VERSION: u8 = 1;

/// A 256-bit BLAKE3 content hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Display as full hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Display as short base-32 (8 characters, 40 bits).
    pub fn to_short(&self) -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghjkmnpqrstuvwxyz";
        let val = u64::from_be_bytes([
            0, 0, 0, self.0[0], self.0[1], self.0[2], self.0[3], self.0[4],
        ]);
        let mut result = String::with_capacity(8);
        for i in (0..8).rev() {
            let idx = ((val >> (i * 5)) & 0x1F) as usize;
            result.push(ALPHABET[idx] as char);
        }
        result
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

/// Hash a prefix-order node sequence.
pub fn hash_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[HASH_VERSION]);
    for node in nodes {
        match node {
            Node::Primitive(p) => {
                hasher.update(&[TAG_PRIMITIVE]);
                hasher.update(&(p.arity() as u32).to_le_bytes());
                write_str(&mut hasher, p.name());
            }
            Node::Terminal(t) => match t.kind() {
                TerminalKind::Argument(i) => {
                    hasher.update(&[TAG_ARGUMENT]);
                    hasher.update(&(*i as u32).to_le_bytes());
                }
                TerminalKind::Named(_) => {
                    hasher.update(&[TAG_NAMED]);
                    write_str(&mut hasher, t.name());
                }
                TerminalKind::Literal(v) => {
                    hasher.update(&[TAG_LITERAL]);
                    write_value(&mut hasher, v);
                }
            },
        }
    }
    ContentHash(*hasher.finalize().as_bytes())
}

fn write_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u32).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn write_value(hasher: &mut blake3::Hasher, v: &Value) {
    write_str(hasher, v.type_name());
    match v {
        Value::Int(i) => {
            hasher.update(&i.to_le_bytes());
        }
        Value::Float(x) => {
            hasher.update(&x.to_bits().to_le_bytes());
        }
        other => write_str(hasher, &other.literal()),
    }
}
