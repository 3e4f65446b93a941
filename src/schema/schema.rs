use std::collections::BTreeSet;
use std::fmt;
use serde::{Serialize, Deserialize};
use crate::core::error::Result;

/// Stable numeric model identifier, persisted by backends.
pub type ModelId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version { major, minor, patch }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Boolean,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Bytes,
    Date,
    DateTime,
    Enum(String),
    Reference(ModelId),
    Embed(ModelId),
    List(Box<PropertyType>),
    Set(Box<PropertyType>),
    Map(Box<PropertyType>, Box<PropertyType>),
}

impl PropertyType {
    /// Whether values stored as `stored` can be read as `self`.
    /// Identical types and numeric widening are accepted.
    pub fn can_read(&self, stored: &PropertyType) -> bool {
        use PropertyType::*;
        match (stored, self) {
            (Int32, Int64) | (UInt32, UInt64) | (Float32, Float64) => true,
            (List(s), List(c)) | (Set(s), Set(c)) => c.can_read(s),
            (Map(sk, sv), Map(ck, cv)) => ck.can_read(sk) && cv.can_read(sv),
            (s, c) => s == c,
        }
    }

    /// Models this type points at, through collections as well.
    pub fn referenced_models(&self, into: &mut BTreeSet<ModelId>) {
        match self {
            PropertyType::Reference(id) | PropertyType::Embed(id) => {
                into.insert(*id);
            }
            PropertyType::List(inner) | PropertyType::Set(inner) => inner.referenced_models(into),
            PropertyType::Map(key, value) => {
                key.referenced_models(into);
                value.referenced_models(into);
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub index: u32,
    pub name: String,
    pub property_type: PropertyType,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyPartKind {
    Uuid,
    SignedInt,
    UnsignedInt,
    Float,
    Boolean,
    DateTime,
    Reference,
    Enum,
    Hlc,
    /// Order-inverted copy of another fixed part
    Reversed,
}

/// One fixed-size segment of a model's composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPart {
    pub kind: KeyPartKind,
    pub byte_size: u16,
    pub property_index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub property_indices: Vec<u32>,
}

/// Versioned data model as seen by migration analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub id: ModelId,
    pub name: String,
    pub version: Version,
    pub key_definition: Vec<KeyPart>,
    pub properties: Vec<PropertyDefinition>,
    pub reserved_indices: Vec<u32>,
    pub reserved_names: Vec<String>,
    pub indexes: Vec<IndexDefinition>,
}

impl ModelDefinition {
    pub fn new(id: ModelId, name: &str, version: Version) -> Self {
        ModelDefinition {
            id,
            name: name.to_string(),
            version,
            key_definition: Vec::new(),
            properties: Vec::new(),
            reserved_indices: Vec::new(),
            reserved_names: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn with_key_part(mut self, kind: KeyPartKind, byte_size: u16, property_index: Option<u32>) -> Self {
        self.key_definition.push(KeyPart {
            kind,
            byte_size,
            property_index,
        });
        self
    }

    pub fn with_property(mut self, index: u32, name: &str, property_type: PropertyType, required: bool) -> Self {
        self.properties.push(PropertyDefinition {
            index,
            name: name.to_string(),
            property_type,
            required,
        });
        self
    }

    pub fn with_reserved(mut self, index: u32, name: &str) -> Self {
        self.reserved_indices.push(index);
        self.reserved_names.push(name.to_string());
        self
    }

    pub fn with_index(mut self, name: &str, property_indices: Vec<u32>) -> Self {
        self.indexes.push(IndexDefinition {
            name: name.to_string(),
            property_indices,
        });
        self
    }

    pub fn property(&self, index: u32) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.index == index)
    }

    /// Ordered kinds and sizes of the key parts. Two models with equal
    /// identities produce byte-compatible keys.
    pub fn key_shape_identity(&self) -> Vec<(KeyPartKind, u16)> {
        self.key_definition.iter().map(|k| (k.kind, k.byte_size)).collect()
    }

    pub fn key_byte_size(&self) -> usize {
        self.key_definition.iter().map(|k| k.byte_size as usize).sum()
    }

    /// Models referenced or embedded by any property.
    pub fn dependencies(&self) -> BTreeSet<ModelId> {
        let mut deps = BTreeSet::new();
        for property in &self.properties {
            property.property_type.referenced_models(&mut deps);
        }
        deps
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
