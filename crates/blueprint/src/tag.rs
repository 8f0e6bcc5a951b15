//! Hierarchical tag-tree documents.
//!
//! `Tag` is the generic key/value format blueprints serialize into and the
//! payload type for per-cell metadata blobs. It is deliberately schemaless:
//! the palette codec and the store crate treat it as an opaque tree, and the
//! binary form is whatever bitcode produces for it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One node of a tag tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tag {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    List(Vec<Tag>),
    Compound(BTreeMap<String, Tag>),
}

impl Tag {
    /// Empty compound, the usual document root.
    pub fn compound() -> Tag {
        Tag::Compound(BTreeMap::new())
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Tag::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Tag::Long(v) => Some(*v),
            Tag::Int(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Tag::Double(v) => Some(*v),
            Tag::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tag]> {
        match self {
            Tag::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&BTreeMap<String, Tag>> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    /// Child lookup on a compound; `None` for scalars and lists.
    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.as_compound().and_then(|m| m.get(key))
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(Tag::as_int)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Tag::as_str)
    }

    pub fn get_list(&self, key: &str) -> Option<&[Tag]> {
        self.get(key).and_then(Tag::as_list)
    }

    /// Inserts into a compound. No-op on any other variant.
    pub fn insert(&mut self, key: impl Into<String>, value: Tag) {
        if let Tag::Compound(map) = self {
            map.insert(key.into(), value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Tag> {
        match self {
            Tag::Compound(map) => map.remove(key),
            _ => None,
        }
    }

    /// Encodes an integer triple as a three-element list.
    pub fn int3(v: glam::IVec3) -> Tag {
        Tag::List(vec![Tag::Int(v.x), Tag::Int(v.y), Tag::Int(v.z)])
    }

    /// Decodes a three-element integer list.
    pub fn as_int3(&self) -> Option<glam::IVec3> {
        let items = self.as_list()?;
        if items.len() != 3 {
            return None;
        }
        Some(glam::IVec3::new(
            items[0].as_int()?,
            items[1].as_int()?,
            items[2].as_int()?,
        ))
    }

    /// Encodes a float triple as a three-element list of doubles.
    pub fn double3(v: glam::DVec3) -> Tag {
        Tag::List(vec![Tag::Double(v.x), Tag::Double(v.y), Tag::Double(v.z)])
    }

    pub fn as_double3(&self) -> Option<glam::DVec3> {
        let items = self.as_list()?;
        if items.len() != 3 {
            return None;
        }
        Some(glam::DVec3::new(
            items[0].as_double()?,
            items[1].as_double()?,
            items[2].as_double()?,
        ))
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Tag {
        Tag::String(s.to_string())
    }
}

impl From<String> for Tag {
    fn from(s: String) -> Tag {
        Tag::String(s)
    }
}

impl From<i32> for Tag {
    fn from(v: i32) -> Tag {
        Tag::Int(v)
    }
}
