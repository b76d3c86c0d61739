//! Dynamic instantiation targets: `select new Summary(i.title, i.score) ...`.
//!
//! Targets are registered with the session factory as factory functions
//! together with their constructor parameters. Arguments are matched to
//! parameters by alias when the selection aliases them, positionally
//! otherwise. A parameter without a matching argument receives the zero value
//! of its type.

use orma_core::{stmt::Type, stmt::Value, Error, Result};

use std::{any::Any, fmt};

type Factory = dyn Fn(Vec<Value>) -> Result<Box<dyn Any + Send>> + Send + Sync;

pub struct Instantiator {
    name: String,
    params: Vec<(String, Type)>,
    factory: Box<Factory>,
}

/// A value produced by a registered instantiator.
pub struct Instance {
    type_name: String,
    value: Box<dyn Any + Send>,
}

impl Instantiator {
    pub fn new<F, T>(name: &str, params: &[(&str, Type)], factory: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<T> + Send + Sync + 'static,
        T: Any + Send,
    {
        Self {
            name: name.to_string(),
            params: params
                .iter()
                .map(|(name, ty)| (name.to_string(), ty.clone()))
                .collect(),
            factory: Box::new(move |args| {
                let value = factory(args)?;
                Ok(Box::new(value) as Box<dyn Any + Send>)
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[(String, Type)] {
        &self.params
    }

    /// For each constructor parameter, the position of the argument that
    /// supplies it.
    pub(crate) fn argument_map(&self, aliases: &[Option<&str>]) -> Result<Vec<Option<usize>>> {
        let aliased = aliases.iter().filter(|alias| alias.is_some()).count();

        if aliased == 0 {
            if aliases.len() != self.params.len() {
                return Err(Error::invalid_statement(format!(
                    "`{}` takes {} arguments, {} selected",
                    self.name,
                    self.params.len(),
                    aliases.len()
                )));
            }
            return Ok((0..aliases.len()).map(Some).collect());
        }

        if aliased != aliases.len() {
            return Err(Error::invalid_statement(format!(
                "arguments of `{}` must be either all aliased or all positional",
                self.name
            )));
        }

        for alias in aliases.iter().flatten() {
            if !self.params.iter().any(|(name, _)| name == alias) {
                return Err(Error::invalid_statement(format!(
                    "`{}` has no parameter `{alias}`",
                    self.name
                )));
            }
        }

        Ok(self
            .params
            .iter()
            .map(|(name, _)| aliases.iter().position(|alias| *alias == Some(name.as_str())))
            .collect())
    }

    pub(crate) fn instantiate(&self, map: &[Option<usize>], mut args: Vec<Value>) -> Result<Instance> {
        let mut values = Vec::with_capacity(self.params.len());

        for ((_, ty), position) in self.params.iter().zip(map) {
            let value = match position {
                Some(position) => ty.cast(args[*position].take())?,
                None => ty.zero_value(),
            };
            values.push(value);
        }

        Ok(Instance {
            type_name: self.name.clone(),
            value: (self.factory)(values)?,
        })
    }
}

impl fmt::Debug for Instantiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instantiator")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

impl Instance {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    pub fn downcast<T: Any>(self) -> std::result::Result<T, Self> {
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self {
                type_name: self.type_name,
                value,
            }),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.type_name)
    }
}
