//! Default mapper loading tuples into [`Object`] values.
//!
//! # Invariants
//! - Attribute names are unique.
//! - Tuple values are read positionally; object fields are read by name.
//! - Grouped collections dump into sorted, de-duplicated nested relations.

use crate::mapper::{MappingError, MappingResult, TupleMapper};
use crate::model::header::{Attribute, AttributeKind, Header};
use crate::model::object::{Field, Object};
use crate::model::tuple::Tuple;
use crate::model::value::Value;
use std::collections::BTreeSet;

/// One mapped attribute and how its value becomes an object field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedAttribute {
    /// Scalar copied as-is.
    Value(String),
    /// Nested tuple loaded as a single object.
    Wrap(String, ObjectMapper),
    /// Nested tuple set loaded as a collection of objects.
    Group(String, ObjectMapper),
}

impl MappedAttribute {
    pub fn name(&self) -> &str {
        match self {
            Self::Value(name) | Self::Wrap(name, _) | Self::Group(name, _) => name,
        }
    }

    fn renamed(&self, name: &str) -> Self {
        match self {
            Self::Value(_) => Self::Value(name.to_string()),
            Self::Wrap(_, mapper) => Self::Wrap(name.to_string(), mapper.clone()),
            Self::Group(_, mapper) => Self::Group(name.to_string(), mapper.clone()),
        }
    }

    fn to_attribute(&self) -> Attribute {
        match self {
            Self::Value(name) => Attribute::scalar(name.as_str()),
            Self::Wrap(name, mapper) => Attribute::tuple(name.as_str(), mapper.header()),
            Self::Group(name, mapper) => Attribute::relation(name.as_str(), mapper.header()),
        }
    }
}

/// Mapper configured by a model name and an ordered attribute list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMapper {
    model: String,
    attributes: Vec<MappedAttribute>,
}

impl ObjectMapper {
    /// Derives a mapper from a relation header.
    ///
    /// Nested header attributes become nested mappers named after the attribute.
    pub fn new(model: impl Into<String>, header: &Header) -> Self {
        let attributes = header
            .attributes()
            .iter()
            .map(|attribute| match &attribute.kind {
                AttributeKind::Scalar => MappedAttribute::Value(attribute.name.clone()),
                AttributeKind::Tuple(nested) => MappedAttribute::Wrap(
                    attribute.name.clone(),
                    Self::new(attribute.name.as_str(), nested),
                ),
                AttributeKind::Relation(nested) => MappedAttribute::Group(
                    attribute.name.clone(),
                    Self::new(attribute.name.as_str(), nested),
                ),
            })
            .collect();
        Self {
            model: model.into(),
            attributes,
        }
    }

    /// Creates a mapper from explicit attributes, rejecting duplicate names.
    pub fn from_attributes(
        model: impl Into<String>,
        attributes: Vec<MappedAttribute>,
    ) -> MappingResult<Self> {
        let mut seen = BTreeSet::new();
        for attribute in &attributes {
            if !seen.insert(attribute.name()) {
                return Err(MappingError::DuplicateAttribute(
                    attribute.name().to_string(),
                ));
            }
        }
        Ok(Self {
            model: model.into(),
            attributes,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn attributes(&self) -> &[MappedAttribute] {
        &self.attributes
    }

    fn find(&self, name: &str) -> Option<&MappedAttribute> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name() == name)
    }

    fn require(&self, name: &str) -> MappingResult<&MappedAttribute> {
        self.find(name)
            .ok_or_else(|| MappingError::UnknownAttribute(name.to_string()))
    }

    fn nest<F>(&self, nests: &[(String, Self)], make: F) -> MappingResult<Self>
    where
        F: Fn(String, Self) -> MappedAttribute,
    {
        let mut attributes = self.attributes.clone();
        for (name, nested) in nests {
            for nested_attribute in &nested.attributes {
                if !attributes
                    .iter()
                    .any(|attribute| attribute.name() == nested_attribute.name())
                {
                    return Err(MappingError::UnknownAttribute(
                        nested_attribute.name().to_string(),
                    ));
                }
            }
            attributes.retain(|attribute| nested.find(attribute.name()).is_none());
            attributes.push(make(name.clone(), nested.clone()));
        }
        Self::from_attributes(self.model.clone(), attributes)
    }
}

impl TupleMapper for ObjectMapper {
    type Object = Object;

    fn header(&self) -> Header {
        Header::from_unique(
            self.attributes
                .iter()
                .map(MappedAttribute::to_attribute)
                .collect(),
        )
    }

    fn load(&self, tuple: &Tuple) -> MappingResult<Object> {
        if tuple.len() != self.attributes.len() {
            return Err(MappingError::ArityMismatch {
                expected: self.attributes.len(),
                actual: tuple.len(),
            });
        }

        let mut object = Object::new(self.model.as_str());
        for (attribute, value) in self.attributes.iter().zip(tuple.values()) {
            let field = match (attribute, value) {
                (MappedAttribute::Value(_), value) => Field::Value(value.clone()),
                (MappedAttribute::Wrap(_, mapper), Value::Tuple(nested)) => {
                    Field::Object(mapper.load(nested)?)
                }
                (MappedAttribute::Group(_, mapper), Value::Relation(nested)) => Field::Objects(
                    nested
                        .iter()
                        .map(|tuple| mapper.load(tuple))
                        .collect::<MappingResult<Vec<_>>>()?,
                ),
                (attribute, value) => {
                    return Err(MappingError::UnexpectedValue {
                        attribute: attribute.name().to_string(),
                        found: value.kind_name(),
                    });
                }
            };
            object.set(attribute.name(), field);
        }
        Ok(object)
    }

    fn dump(&self, object: &Object) -> MappingResult<Tuple> {
        self.attributes
            .iter()
            .map(|attribute| {
                let field = object
                    .get(attribute.name())
                    .ok_or_else(|| MappingError::MissingField(attribute.name().to_string()))?;
                match (attribute, field) {
                    (MappedAttribute::Value(_), Field::Value(value)) => Ok(value.clone()),
                    (MappedAttribute::Wrap(_, mapper), Field::Object(nested)) => {
                        Ok(Value::Tuple(mapper.dump(nested)?))
                    }
                    (MappedAttribute::Group(_, mapper), Field::Objects(nested)) => {
                        let tuples = nested
                            .iter()
                            .map(|object| mapper.dump(object))
                            .collect::<MappingResult<Vec<_>>>()?;
                        Ok(Value::relation(tuples))
                    }
                    (attribute, field) => Err(MappingError::UnexpectedField {
                        attribute: attribute.name().to_string(),
                        found: field.kind_name(),
                    }),
                }
            })
            .collect::<MappingResult<Tuple>>()
    }

    fn project(&self, names: &[&str]) -> MappingResult<Self> {
        let attributes = names
            .iter()
            .map(|name| self.require(name).cloned())
            .collect::<MappingResult<Vec<_>>>()?;
        Self::from_attributes(self.model.clone(), attributes)
    }

    fn rename(&self, renames: &[(&str, &str)]) -> MappingResult<Self> {
        for (from, _) in renames {
            self.require(from)?;
        }
        let attributes = self
            .attributes
            .iter()
            .map(|attribute| {
                match renames.iter().find(|(from, _)| *from == attribute.name()) {
                    Some((_, to)) => attribute.renamed(to),
                    None => attribute.clone(),
                }
            })
            .collect();
        Self::from_attributes(self.model.clone(), attributes)
    }

    fn join(&self, other: &Self) -> MappingResult<Self> {
        let mut attributes = self.attributes.clone();
        attributes.extend(
            other
                .attributes
                .iter()
                .filter(|attribute| self.find(attribute.name()).is_none())
                .cloned(),
        );
        Self::from_attributes(self.model.clone(), attributes)
    }

    fn wrap(&self, wraps: &[(String, Self)]) -> MappingResult<Self> {
        self.nest(wraps, MappedAttribute::Wrap)
    }

    fn group(&self, groups: &[(String, Self)]) -> MappingResult<Self> {
        self.nest(groups, MappedAttribute::Group)
    }
}
