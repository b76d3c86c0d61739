//! Descriptions of how the values of a result row turn into domain values.
//!
//! A select is translated together with one domain result per selected
//! item. Each result reads its values from fixed positions of the row; entity
//! results carry one fetch per attribute in visitation order.

use orma_core::{
    schema::{AttributeId, CollectionClassification, EntityId, TypeConfiguration},
    sql::SelectStatement,
    sqm::InstantiationTarget,
    stmt::{Type, Value, ValueRecord},
    Result,
};

#[derive(Debug)]
pub(crate) struct SelectPlan {
    pub(crate) statement: SelectStatement,

    pub(crate) results: Vec<DomainResult>,

    /// A collection is fetched by join, so root rows repeat
    pub(crate) collection_fetch: bool,

    /// Limit and offset that could not be rendered because of a collection
    /// fetch; applied to the assembled rows
    pub(crate) in_memory_paging: Option<Paging>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Paging {
    pub(crate) offset: usize,
    pub(crate) limit: Option<usize>,
}

#[derive(Debug)]
pub(crate) enum DomainResult {
    Basic(BasicResult),

    /// Embedded attribute, one result per field
    Embeddable(Vec<BasicResult>),

    Entity(EntityResult),

    /// A selected to-one association, read from its foreign key
    Reference { target: EntityId, key: BasicResult },

    Instantiation(InstantiationResult),
}

/// A single selected value.
#[derive(Debug, Clone)]
pub(crate) struct BasicResult {
    /// Position in the row
    pub(crate) position: usize,

    /// Domain type of the value
    pub(crate) ty: Type,

    pub(crate) converter: Option<String>,
}

#[derive(Debug)]
pub(crate) struct EntityResult {
    pub(crate) entity: EntityId,
    pub(crate) identifier: BasicResult,
    pub(crate) version: Option<BasicResult>,
    pub(crate) row_id: Option<BasicResult>,
    pub(crate) fetches: Vec<Fetch>,
}

#[derive(Debug)]
pub(crate) enum Fetch {
    Basic {
        attribute: AttributeId,
        result: BasicResult,
    },

    Embedded {
        attribute: AttributeId,
        fields: Vec<BasicResult>,
    },

    /// To-one association read from its foreign key. The target becomes a
    /// proxy unless it is already managed; immediate targets are loaded
    /// once the result set is processed.
    Reference {
        attribute: AttributeId,
        target: EntityId,
        key: BasicResult,
        immediate: bool,
    },

    /// To-one association whose target columns are selected through a join
    JoinedEntity {
        attribute: AttributeId,
        result: Box<EntityResult>,
    },

    /// Collection whose elements are selected through a join
    JoinedCollection {
        attribute: AttributeId,
        result: CollectionResult,
    },

    /// Collection loaded by its own select: immediately after the result set
    /// when `eager`, on first access otherwise
    Deferred { attribute: AttributeId, eager: bool },
}

#[derive(Debug)]
pub(crate) struct CollectionResult {
    pub(crate) attribute: AttributeId,
    pub(crate) classification: CollectionClassification,
    pub(crate) index: Option<BasicResult>,
    pub(crate) element: ElementResult,
}

#[derive(Debug)]
pub(crate) enum ElementResult {
    Basic(BasicResult),
    Entity(Box<EntityResult>),
}

#[derive(Debug)]
pub(crate) struct InstantiationResult {
    pub(crate) target: InstantiationTarget,
    pub(crate) aliases: Vec<Option<String>>,
    pub(crate) arguments: Vec<DomainResult>,

    /// Argument position per constructor parameter, for class targets
    pub(crate) argument_map: Vec<Option<usize>>,
}

impl BasicResult {
    pub(crate) fn new(position: usize, ty: Type, converter: Option<&str>) -> Self {
        Self {
            position,
            ty,
            converter: converter.map(str::to_string),
        }
    }

    /// Raw value at the result's position
    pub(crate) fn raw<'a>(&self, row: &'a ValueRecord) -> &'a Value {
        const NULL: &Value = &Value::Null;
        row.get(self.position).unwrap_or(NULL)
    }

    /// The value in domain form
    pub(crate) fn extract(&self, row: &ValueRecord, types: &TypeConfiguration) -> Result<Value> {
        types.to_domain(&self.ty, self.converter.as_deref(), self.raw(row).clone())
    }
}

impl Paging {
    pub(crate) fn apply<T>(self, rows: Vec<T>) -> Vec<T> {
        let rows = rows.into_iter().skip(self.offset);

        match self.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_skips_then_takes() {
        let paging = Paging {
            offset: 1,
            limit: Some(2),
        };
        assert_eq!(paging.apply(vec![1, 2, 3, 4]), vec![2, 3]);

        let paging = Paging {
            offset: 3,
            limit: None,
        };
        assert_eq!(paging.apply(vec![1, 2, 3, 4]), vec![4]);
    }
}
