use super::Translator;
use crate::query::Binding;

use orma_core::{
    schema::{AttributeTy, CollectionElement, ColumnId},
    sql::{Arithmetic, Expression, Function, JdbcParameter},
    sqm::{SqmExpr, SqmParameter, SqmPath, SqmPathSource},
    stmt::Type,
    Error, Result,
};

use std::sync::Arc;

/// Relational type and converter a value takes from the expression it is
/// compared with or assigned to.
#[derive(Debug, Clone, Default)]
pub(crate) struct TypeHint {
    pub(crate) ty: Type,
    pub(crate) converter: Option<String>,
}

impl Translator<'_> {
    pub(crate) fn expr(&mut self, expr: &SqmExpr, hint: Option<&TypeHint>) -> Result<Expression> {
        Ok(match expr {
            SqmExpr::Path(path) => self.path_expr(path)?,
            SqmExpr::Literal(value) => match hint.and_then(|hint| hint.converter.as_deref()) {
                Some(converter) => {
                    Expression::Literal(self.types.to_relational(Some(converter), value.clone())?)
                }
                None => Expression::Literal(value.clone()),
            },
            SqmExpr::Parameter(parameter) => self.parameter(parameter, None, hint).into(),
            SqmExpr::Function(function) => {
                let args = if function.args.is_empty() {
                    vec![Expression::Star]
                } else {
                    function
                        .args
                        .iter()
                        .map(|arg| self.expr(arg, None))
                        .collect::<Result<_>>()?
                };

                Expression::Function(Function {
                    name: function.name.as_str(),
                    args,
                    distinct: function.distinct,
                    ty: function.ty(),
                })
            }
            SqmExpr::Arithmetic(arithmetic) => {
                let lhs_hint = self.hint(&arithmetic.rhs).map(TypeHint::without_converter);
                let rhs_hint = self.hint(&arithmetic.lhs).map(TypeHint::without_converter);

                Expression::Arithmetic(Arithmetic {
                    op: arithmetic.op,
                    lhs: Box::new(self.expr(&arithmetic.lhs, lhs_hint.as_ref())?),
                    rhs: Box::new(self.expr(&arithmetic.rhs, rhs_hint.as_ref())?),
                    ty: expr.ty(),
                })
            }
            SqmExpr::Negated(expr) => Expression::Negated(Box::new(self.expr(expr, hint)?)),
            SqmExpr::Tuple(items) => Expression::Tuple(
                items
                    .iter()
                    .map(|item| self.expr(item, None))
                    .collect::<Result<_>>()?,
            ),
            SqmExpr::Subquery(query) => Expression::Subquery(Box::new(self.subquery(query)?)),
        })
    }

    /// A JDBC parameter for a query parameter, typed after the hint.
    pub(crate) fn parameter(
        &self,
        parameter: &Arc<SqmParameter>,
        index: Option<usize>,
        hint: Option<&TypeHint>,
    ) -> JdbcParameter {
        match hint {
            Some(hint) => JdbcParameter::query(parameter, index, hint.ty.clone())
                .with_converter(hint.converter.as_deref()),
            None => JdbcParameter::query(
                parameter,
                index,
                parameter.ty.clone().unwrap_or(Type::Unknown),
            ),
        }
    }

    pub(crate) fn binding(&self, parameter: &SqmParameter) -> Option<&Binding> {
        self.bindings.and_then(|bindings| bindings.get(parameter))
    }

    pub(crate) fn path_expr(&self, path: &SqmPath) -> Result<Expression> {
        let mut columns = self
            .path_columns(path)?
            .into_iter()
            .map(|column| self.column_expr(&path.lhs, column))
            .collect::<Result<Vec<_>>>()?;

        Ok(if columns.len() == 1 {
            columns.remove(0)
        } else {
            Expression::Tuple(columns)
        })
    }

    /// Columns a path resolves to, in the group of its from-element.
    pub(crate) fn path_columns(&self, path: &SqmPath) -> Result<Vec<ColumnId>> {
        let metamodel = self.metamodel;

        Ok(match path.source {
            SqmPathSource::Entity(entity) | SqmPathSource::Identifier(entity) => {
                vec![metamodel.entity(entity).identifier.column]
            }
            SqmPathSource::Version(entity) => {
                let entity = metamodel.entity(entity);
                let version = entity.version.as_ref().ok_or_else(|| {
                    Error::invalid_statement(format!("entity `{}` is not versioned", entity.name))
                })?;
                vec![version.column]
            }
            SqmPathSource::Attribute(attribute) => {
                let attribute = metamodel.attribute(attribute);

                if attribute.is_plural() {
                    return Err(Error::invalid_statement(format!(
                        "collection `{}` must be joined before it can be dereferenced",
                        attribute.role
                    )));
                }

                attribute.columns().to_vec()
            }
            SqmPathSource::EmbeddedField(attribute, field) => {
                let attribute = metamodel.attribute(attribute);
                let embedded = attribute
                    .as_embedded()
                    .ok_or_else(|| Error::invalid_statement(format!("`{}` is not embedded", attribute.role)))?;
                vec![embedded.columns[field]]
            }
            SqmPathSource::CollectionElement(attribute) => {
                let attribute = metamodel.attribute(attribute);
                let plural = attribute.expect_plural();

                match &plural.element {
                    CollectionElement::Basic { column, .. } => vec![*column],
                    CollectionElement::Entity { target } => {
                        vec![metamodel.entity(*target).identifier.column]
                    }
                }
            }
            SqmPathSource::CollectionIndex(attribute) => {
                let attribute = metamodel.attribute(attribute);
                let column = attribute.expect_plural().index.ok_or_else(|| {
                    Error::invalid_statement(format!("collection `{}` is not indexed", attribute.role))
                })?;
                vec![column]
            }
        })
    }

    /// The hint an expression gives the value it is compared with.
    pub(crate) fn hint(&self, expr: &SqmExpr) -> Option<TypeHint> {
        match expr {
            SqmExpr::Path(path) => self.path_hint(path),
            SqmExpr::Literal(value) if !value.is_null() => Some(TypeHint {
                ty: value.infer_ty(),
                converter: None,
            }),
            SqmExpr::Parameter(parameter) => parameter.ty.clone().map(|ty| TypeHint {
                ty,
                converter: None,
            }),
            _ => {
                let ty = expr.ty();
                (!ty.is_unknown()).then_some(TypeHint {
                    ty,
                    converter: None,
                })
            }
        }
    }

    pub(crate) fn path_hint(&self, path: &SqmPath) -> Option<TypeHint> {
        let metamodel = self.metamodel;

        let converter = match path.source {
            SqmPathSource::Attribute(attribute) => match &metamodel.attribute(attribute).ty {
                AttributeTy::Basic(basic) => basic.converter.clone(),
                _ => None,
            },
            SqmPathSource::EmbeddedField(attribute, field) => {
                match metamodel.attribute(attribute).as_embedded() {
                    Some(embedded) => metamodel.embeddable(embedded.embeddable).fields[field]
                        .converter
                        .clone(),
                    None => None,
                }
            }
            SqmPathSource::CollectionElement(attribute) => {
                match &metamodel.attribute(attribute).expect_plural().element {
                    CollectionElement::Basic { converter, .. } => converter.clone(),
                    CollectionElement::Entity { .. } => None,
                }
            }
            _ => None,
        };

        let ty = match self.path_columns(path).ok()?.as_slice() {
            [column] => metamodel.column(*column).ty.clone(),
            _ => Type::Unknown,
        };

        Some(TypeHint { ty, converter })
    }

    /// True when the expression is an embedded-valued path.
    pub(crate) fn is_embedded(&self, expr: &SqmExpr) -> bool {
        match expr {
            SqmExpr::Path(SqmPath {
                source: SqmPathSource::Attribute(attribute),
                ..
            }) => self.metamodel.attribute(*attribute).as_embedded().is_some(),
            _ => false,
        }
    }
}

impl TypeHint {
    fn without_converter(self) -> Self {
        Self {
            ty: self.ty,
            converter: None,
        }
    }
}
