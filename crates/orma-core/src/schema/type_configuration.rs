use crate::{stmt::Type, stmt::Value, Error, Result};

use std::{collections::HashMap, fmt, sync::Arc};

/// Converts attribute values between their domain and relational forms.
pub trait AttributeConverter: fmt::Debug + Send + Sync + 'static {
    /// Type of the attribute as seen by the application
    fn domain_type(&self) -> Type;

    /// Type of the column storing the attribute
    fn relational_type(&self) -> Type;

    fn to_relational(&self, value: Value) -> Result<Value>;

    fn to_domain(&self, value: Value) -> Result<Value>;
}

/// Registry of basic types and attribute converters.
///
/// Constructed explicitly, owned by the session factory, and passed to every
/// translation and binding call that needs it.
#[derive(Debug, Clone)]
pub struct TypeConfiguration {
    converters: HashMap<String, Arc<dyn AttributeConverter>>,
}

/// Stores booleans as `'Y'` / `'N'`.
#[derive(Debug)]
pub struct YesNoConverter;

/// Stores booleans as `'T'` / `'F'`.
#[derive(Debug)]
pub struct TrueFalseConverter;

/// Stores booleans as `1` / `0`.
#[derive(Debug)]
pub struct NumericBooleanConverter;

/// Stores a closed set of variants by name.
///
/// Domain values are the variant's ordinal, relational values its name.
#[derive(Debug)]
pub struct EnumAsStringConverter {
    variants: Vec<String>,
}

impl TypeConfiguration {
    /// Creates a configuration with the built-in converters registered.
    pub fn new() -> Self {
        let mut type_configuration = Self {
            converters: HashMap::new(),
        };

        type_configuration.register("yes_no", YesNoConverter);
        type_configuration.register("true_false", TrueFalseConverter);
        type_configuration.register("numeric_boolean", NumericBooleanConverter);
        type_configuration
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        converter: impl AttributeConverter,
    ) -> &mut Self {
        self.converters.insert(name.into(), Arc::new(converter));
        self
    }

    pub fn converter(&self, name: &str) -> Result<&Arc<dyn AttributeConverter>> {
        self.converters
            .get(name)
            .ok_or_else(|| Error::mapping(format!("unknown attribute converter `{name}`")))
    }

    /// Column type for an attribute of `ty` using the named converter.
    pub fn relational_type(&self, ty: &Type, converter: Option<&str>) -> Result<Type> {
        match converter {
            Some(name) => {
                let converter = self.converter(name)?;

                if converter.domain_type() != *ty {
                    return Err(Error::mapping(format!(
                        "converter `{name}` expects domain type {}, attribute is {}",
                        converter.domain_type().name(),
                        ty.name()
                    )));
                }

                Ok(converter.relational_type())
            }
            None => Ok(ty.clone()),
        }
    }

    /// Converts a domain value for binding. Nulls pass through unconverted.
    pub fn to_relational(&self, converter: Option<&str>, value: Value) -> Result<Value> {
        match converter {
            Some(name) if !value.is_null() => self.converter(name)?.to_relational(value),
            _ => Ok(value),
        }
    }

    /// Converts an extracted value into its domain form, coercing the driver's
    /// storage representation first.
    pub fn to_domain(&self, ty: &Type, converter: Option<&str>, value: Value) -> Result<Value> {
        match converter {
            Some(name) => {
                let converter = self.converter(name)?;
                let value = converter.relational_type().cast(value)?;
                if value.is_null() {
                    Ok(value)
                } else {
                    converter.to_domain(value)
                }
            }
            None => ty.cast(value),
        }
    }
}

impl Default for TypeConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

fn char_boolean(value: Value, t: &str, f: &str) -> Result<Value> {
    match value {
        Value::Bool(true) => Ok(Value::from(t)),
        Value::Bool(false) => Ok(Value::from(f)),
        value => Err(Error::type_conversion(value, "bool")),
    }
}

fn boolean_char(value: Value, t: &str, f: &str) -> Result<Value> {
    match value.as_str() {
        Some(s) if s == t => Ok(Value::Bool(true)),
        Some(s) if s == f => Ok(Value::Bool(false)),
        _ => Err(Error::type_conversion(value, "bool")),
    }
}

impl AttributeConverter for YesNoConverter {
    fn domain_type(&self) -> Type {
        Type::Bool
    }

    fn relational_type(&self) -> Type {
        Type::String
    }

    fn to_relational(&self, value: Value) -> Result<Value> {
        char_boolean(value, "Y", "N")
    }

    fn to_domain(&self, value: Value) -> Result<Value> {
        boolean_char(value, "Y", "N")
    }
}

impl AttributeConverter for TrueFalseConverter {
    fn domain_type(&self) -> Type {
        Type::Bool
    }

    fn relational_type(&self) -> Type {
        Type::String
    }

    fn to_relational(&self, value: Value) -> Result<Value> {
        char_boolean(value, "T", "F")
    }

    fn to_domain(&self, value: Value) -> Result<Value> {
        boolean_char(value, "T", "F")
    }
}

impl AttributeConverter for NumericBooleanConverter {
    fn domain_type(&self) -> Type {
        Type::Bool
    }

    fn relational_type(&self) -> Type {
        Type::I32
    }

    fn to_relational(&self, value: Value) -> Result<Value> {
        Ok(Value::I32(value.into_bool()? as i32))
    }

    fn to_domain(&self, value: Value) -> Result<Value> {
        match value.as_i64() {
            Some(v) => Ok(Value::Bool(v != 0)),
            None => Err(Error::type_conversion(value, "bool")),
        }
    }
}

impl EnumAsStringConverter {
    pub fn new<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }
}

impl AttributeConverter for EnumAsStringConverter {
    fn domain_type(&self) -> Type {
        Type::I32
    }

    fn relational_type(&self) -> Type {
        Type::String
    }

    fn to_relational(&self, value: Value) -> Result<Value> {
        let ordinal = value
            .as_i64()
            .and_then(|ordinal| usize::try_from(ordinal).ok())
            .and_then(|ordinal| self.variants.get(ordinal));

        match ordinal {
            Some(name) => Ok(Value::from(name)),
            None => Err(Error::type_conversion(value, "enum ordinal")),
        }
    }

    fn to_domain(&self, value: Value) -> Result<Value> {
        let ordinal = value
            .as_str()
            .and_then(|name| self.variants.iter().position(|variant| variant == name));

        match ordinal {
            Some(ordinal) => Ok(Value::I32(ordinal as i32)),
            None => Err(Error::type_conversion(value, "enum variant")),
        }
    }
}
