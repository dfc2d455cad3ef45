use super::{BinaryName, FieldType};

/// Annotation attached to a class, method, or parameter
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    pub type_name: BinaryName,

    /// Retained at runtime (`RuntimeVisibleAnnotations`) as opposed to only in the class file
    pub visible: bool,

    /// Element values, in declaration order
    pub values: Vec<(String, AnnotationValue)>,
}

/// Element value of an annotation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationValue {
    Boolean(bool),
    Int(i32),
    Long(i64),
    String(String),
    Class(FieldType),
    Enum {
        type_name: BinaryName,
        constant: String,
    },
    Array(Vec<AnnotationValue>),
    Annotation(Box<Annotation>),
}

impl Annotation {
    pub fn new(type_name: BinaryName, visible: bool) -> Annotation {
        Annotation {
            type_name,
            visible,
            values: vec![],
        }
    }

    /// Add an element value
    pub fn with(mut self, name: impl Into<String>, value: AnnotationValue) -> Annotation {
        self.values.push((name.into(), value));
        self
    }

    pub fn value(&self, name: &str) -> Option<&AnnotationValue> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.value(name)? {
            AnnotationValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// String values of an element, accepting both a single string and an array of them
    pub fn strings(&self, name: &str) -> Vec<String> {
        match self.value(name) {
            Some(AnnotationValue::String(s)) => vec![s.clone()],
            Some(AnnotationValue::Array(values)) => values
                .iter()
                .filter_map(|value| match value {
                    AnnotationValue::String(s) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
            _ => vec![],
        }
    }

    /// Class names of an element, accepting both a single class and an array of them
    ///
    /// Array and primitive class literals are skipped.
    pub fn classes(&self, name: &str) -> Vec<BinaryName> {
        let object_name = |value: &AnnotationValue| match value {
            AnnotationValue::Class(FieldType::Object(class_name)) => Some(class_name.clone()),
            _ => None,
        };
        match self.value(name) {
            Some(AnnotationValue::Array(values)) => values.iter().filter_map(object_name).collect(),
            Some(value) => object_name(value).into_iter().collect(),
            None => vec![],
        }
    }
}
