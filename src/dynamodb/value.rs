use std::{collections::BTreeMap, collections::HashMap, fmt};

use aws_sdk_dynamodb::{primitives::Blob, types::AttributeValue};

/// One row of a table, keyed by attribute name. Ordered so that anything
/// iterating an item (detail view, key extraction) is deterministic.
pub type Item = BTreeMap<String, AttrValue>;

/// Primary key of an item: the partition key and, when the table has one, the
/// sort key.
pub type Key = BTreeMap<String, AttrValue>;

/// Closed set of attribute types a table can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    S(String),
    N(String),
    Bool(bool),
    Null,
    L(Vec<AttrValue>),
    M(BTreeMap<String, AttrValue>),
    Ss(Vec<String>),
    Ns(Vec<String>),
    Bs(Vec<Vec<u8>>),
    B(Vec<u8>),
}

impl AttrValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::S(_) => "String",
            AttrValue::N(_) => "Number",
            AttrValue::Bool(_) => "Boolean",
            AttrValue::Null => "Null",
            AttrValue::L(_) => "List",
            AttrValue::M(_) => "Map",
            AttrValue::Ss(_) => "String Set",
            AttrValue::Ns(_) => "Number Set",
            AttrValue::Bs(_) => "Binary Set",
            AttrValue::B(_) => "Binary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedAttribute {
    pub attribute_type: String,
}

impl fmt::Display for UnsupportedAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported DynamoDB attribute type: {}", self.attribute_type)
    }
}

impl std::error::Error for UnsupportedAttribute {}

impl TryFrom<AttributeValue> for AttrValue {
    type Error = UnsupportedAttribute;

    fn try_from(value: AttributeValue) -> Result<Self, Self::Error> {
        let converted = match value {
            AttributeValue::S(s) => AttrValue::S(s),
            AttributeValue::N(n) => AttrValue::N(n),
            AttributeValue::Bool(b) => AttrValue::Bool(b),
            AttributeValue::Null(_) => AttrValue::Null,
            AttributeValue::L(values) => AttrValue::L(
                values
                    .into_iter()
                    .map(AttrValue::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            AttributeValue::M(map) => AttrValue::M(
                map.into_iter()
                    .map(|(k, v)| AttrValue::try_from(v).map(|v| (k, v)))
                    .collect::<Result<_, _>>()?,
            ),
            AttributeValue::Ss(values) => AttrValue::Ss(values),
            AttributeValue::Ns(values) => AttrValue::Ns(values),
            AttributeValue::Bs(values) => {
                AttrValue::Bs(values.into_iter().map(Blob::into_inner).collect())
            }
            AttributeValue::B(blob) => AttrValue::B(blob.into_inner()),
            other => {
                return Err(UnsupportedAttribute {
                    attribute_type: format!("{other:?}"),
                });
            }
        };
        Ok(converted)
    }
}

impl From<&AttrValue> for AttributeValue {
    fn from(value: &AttrValue) -> Self {
        match value {
            AttrValue::S(s) => AttributeValue::S(s.clone()),
            AttrValue::N(n) => AttributeValue::N(n.clone()),
            AttrValue::Bool(b) => AttributeValue::Bool(*b),
            AttrValue::Null => AttributeValue::Null(true),
            AttrValue::L(values) => AttributeValue::L(values.iter().map(Into::into).collect()),
            AttrValue::M(map) => AttributeValue::M(
                map.iter()
                    .map(|(k, v)| (k.clone(), AttributeValue::from(v)))
                    .collect(),
            ),
            AttrValue::Ss(values) => AttributeValue::Ss(values.clone()),
            AttrValue::Ns(values) => AttributeValue::Ns(values.clone()),
            AttrValue::Bs(values) => {
                AttributeValue::Bs(values.iter().map(|b| Blob::new(b.clone())).collect())
            }
            AttrValue::B(bytes) => AttributeValue::B(Blob::new(bytes.clone())),
        }
    }
}

pub fn item_from_sdk(raw: HashMap<String, AttributeValue>) -> Result<Item, UnsupportedAttribute> {
    raw.into_iter()
        .map(|(k, v)| AttrValue::try_from(v).map(|v| (k, v)))
        .collect()
}

pub fn key_to_sdk(key: &Key) -> HashMap<String, AttributeValue> {
    key.iter()
        .map(|(k, v)| (k.clone(), AttributeValue::from(v)))
        .collect()
}
