//! Binary serialization of parse trees.
//!
//! Length-prefixed tag-value stream: a magic number and version, then one
//! tag per node. Integers are zigzag LEB128 varints, reals are IEEE-754 bit
//! patterns, and text is interned on write and replayed by index on read, so
//! repeated names cost a varint after their first occurrence.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use crate::arena::{Arena, NodeId};
use crate::tree::{Node, Position};

pub const MAGIC: u32 = 0x0512_1968;
pub const VERSION: u32 = 0x0101;

/// One tag per tree kind, numerically independent from [`crate::tree::Kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Tag {
    Null = 0,
    Integer = 1,
    Real = 2,
    Text = 3,
    Name = 4,
    Block = 5,
    Prefix = 6,
    Postfix = 7,
    Infix = 8,
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("i/o error reading tree stream")]
    Io(#[from] io::Error),
    #[error("bad magic number {found:#010x}")]
    BadMagic { found: u32 },
    #[error("unsupported stream version {found:#06x}")]
    BadVersion { found: u32 },
    #[error("invalid node tag {found}")]
    BadTag { found: u64 },
    #[error("text is not valid UTF-8")]
    BadText,
    #[error("text index {found} out of range")]
    BadTextIndex { found: u64 },
    #[error("varint does not terminate")]
    BadVarint,
}

/// Writes trees to a byte stream.
pub struct Serializer<W: Write> {
    out: W,
    texts: HashMap<String, u64>,
}

impl<W: Write> Serializer<W> {
    /// Create a serializer and emit the stream header.
    pub fn new(mut out: W) -> io::Result<Self> {
        write_unsigned(&mut out, MAGIC as u64)?;
        write_unsigned(&mut out, VERSION as u64)?;
        Ok(Self {
            out,
            texts: HashMap::new(),
        })
    }

    /// Serialize one tree, `None` encoding the null tree.
    pub fn write_tree(&mut self, arena: &Arena, root: Option<NodeId>) -> io::Result<()> {
        match root {
            None => write_unsigned(&mut self.out, Tag::Null as u64),
            Some(id) => self.write_node(arena, id),
        }
    }

    fn write_node(&mut self, arena: &Arena, id: NodeId) -> io::Result<()> {
        match arena.node(id) {
            Node::Integer(value) => {
                write_unsigned(&mut self.out, Tag::Integer as u64)?;
                write_signed(&mut self.out, *value)
            }
            Node::Real(value) => {
                write_unsigned(&mut self.out, Tag::Real as u64)?;
                self.out.write_all(&value.to_bits().to_le_bytes())
            }
            Node::Text {
                value,
                opening,
                closing,
            } => {
                write_unsigned(&mut self.out, Tag::Text as u64)?;
                self.write_text(opening)?;
                self.write_text(value)?;
                self.write_text(closing)
            }
            Node::Name(value) => {
                write_unsigned(&mut self.out, Tag::Name as u64)?;
                self.write_text(value)
            }
            Node::Block {
                child,
                opening,
                closing,
            } => {
                write_unsigned(&mut self.out, Tag::Block as u64)?;
                self.write_text(opening)?;
                self.write_text(closing)?;
                self.write_node(arena, *child)
            }
            Node::Prefix { left, right } => {
                write_unsigned(&mut self.out, Tag::Prefix as u64)?;
                self.write_node(arena, *left)?;
                self.write_node(arena, *right)
            }
            Node::Postfix { left, right } => {
                write_unsigned(&mut self.out, Tag::Postfix as u64)?;
                self.write_node(arena, *left)?;
                self.write_node(arena, *right)
            }
            Node::Infix { name, left, right } => {
                write_unsigned(&mut self.out, Tag::Infix as u64)?;
                self.write_text(name)?;
                self.write_node(arena, *left)?;
                self.write_node(arena, *right)
            }
        }
    }

    /// First occurrence: index 0, then length and bytes. Later occurrences:
    /// the 1-based index assigned at first sight.
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        if let Some(&index) = self.texts.get(text) {
            return write_unsigned(&mut self.out, index);
        }
        write_unsigned(&mut self.out, 0)?;
        write_unsigned(&mut self.out, text.len() as u64)?;
        self.out.write_all(text.as_bytes())?;
        self.texts
            .insert(text.to_owned(), self.texts.len() as u64 + 1);
        Ok(())
    }
}

/// Reconstructs trees from a byte stream produced by [`Serializer`].
pub struct Deserializer<R: Read> {
    input: R,
    texts: Vec<String>,
    pos: Position,
}

impl<R: Read> Deserializer<R> {
    /// Create a deserializer, validating the stream header. All nodes read
    /// are given position `pos`.
    pub fn new(mut input: R, pos: Position) -> Result<Self, ReadError> {
        let magic = read_unsigned(&mut input)? as u32;
        if magic != MAGIC {
            return Err(ReadError::BadMagic { found: magic });
        }
        let version = read_unsigned(&mut input)? as u32;
        if version != VERSION {
            return Err(ReadError::BadVersion { found: version });
        }
        Ok(Self {
            input,
            texts: Vec::new(),
            pos,
        })
    }

    /// Read one tree; `None` is the null tree.
    pub fn read_tree(&mut self, arena: &mut Arena) -> Result<Option<NodeId>, ReadError> {
        let tag = read_unsigned(&mut self.input)?;
        let node = match tag {
            t if t == Tag::Null as u64 => return Ok(None),
            t if t == Tag::Integer as u64 => Node::Integer(read_signed(&mut self.input)?),
            t if t == Tag::Real as u64 => {
                let mut bytes = [0u8; 8];
                self.input.read_exact(&mut bytes)?;
                Node::Real(f64::from_bits(u64::from_le_bytes(bytes)))
            }
            t if t == Tag::Text as u64 => {
                let opening = self.read_text()?;
                let value = self.read_text()?;
                let closing = self.read_text()?;
                Node::Text {
                    value,
                    opening,
                    closing,
                }
            }
            t if t == Tag::Name as u64 => Node::Name(self.read_text()?),
            t if t == Tag::Block as u64 => {
                let opening = self.read_text()?;
                let closing = self.read_text()?;
                let child = self.read_child(arena)?;
                Node::Block {
                    child,
                    opening,
                    closing,
                }
            }
            t if t == Tag::Prefix as u64 => {
                let left = self.read_child(arena)?;
                let right = self.read_child(arena)?;
                Node::Prefix { left, right }
            }
            t if t == Tag::Postfix as u64 => {
                let left = self.read_child(arena)?;
                let right = self.read_child(arena)?;
                Node::Postfix { left, right }
            }
            t if t == Tag::Infix as u64 => {
                let name = self.read_text()?;
                let left = self.read_child(arena)?;
                let right = self.read_child(arena)?;
                Node::Infix { name, left, right }
            }
            found => return Err(ReadError::BadTag { found }),
        };
        Ok(Some(arena.alloc(node, self.pos)))
    }

    fn read_child(&mut self, arena: &mut Arena) -> Result<NodeId, ReadError> {
        match self.read_tree(arena)? {
            Some(id) => Ok(id),
            None => Err(ReadError::BadTag { found: 0 }),
        }
    }

    fn read_text(&mut self) -> Result<String, ReadError> {
        let index = read_unsigned(&mut self.input)?;
        if index == 0 {
            let len = read_unsigned(&mut self.input)? as usize;
            let mut bytes = vec![0u8; len];
            self.input.read_exact(&mut bytes)?;
            let text = String::from_utf8(bytes).map_err(|_| ReadError::BadText)?;
            self.texts.push(text.clone());
            return Ok(text);
        }
        self.texts
            .get(index as usize - 1)
            .cloned()
            .ok_or(ReadError::BadTextIndex { found: index })
    }
}

fn write_unsigned<W: Write>(out: &mut W, mut value: u64) -> io::Result<()> {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            return out.write_all(&[byte]);
        }
        out.write_all(&[byte | 0x80])?;
    }
}

fn write_signed<W: Write>(out: &mut W, value: i64) -> io::Result<()> {
    // Zigzag: small magnitudes stay small either sign.
    write_unsigned(out, ((value << 1) ^ (value >> 63)) as u64)
}

fn read_unsigned<R: Read>(input: &mut R) -> Result<u64, ReadError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let mut byte = [0u8; 1];
        input.read_exact(&mut byte)?;
        if shift >= 64 {
            return Err(ReadError::BadVarint);
        }
        value |= ((byte[0] & 0x7F) as u64) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn read_signed<R: Read>(input: &mut R) -> Result<i64, ReadError> {
    let raw = read_unsigned(input)?;
    Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
}
