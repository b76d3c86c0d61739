#![allow(unused_variables)]

use super::{
    SqmDynamicInstantiation, SqmExpr, SqmFromClause, SqmJoin, SqmParameter, SqmPath,
    SqmPredicate, SqmQuerySpec, SqmSelectableNode, SqmStatement,
};

use by_address::ByAddress;
use std::{collections::HashSet, sync::Arc};

/// Read-only walk over an object-query tree. Override a method to observe a
/// node kind; call the matching free function to keep descending.
pub trait Visit {
    fn visit_statement(&mut self, i: &SqmStatement) {
        visit_statement(self, i);
    }

    fn visit_query_spec(&mut self, i: &SqmQuerySpec) {
        visit_query_spec(self, i);
    }

    fn visit_from_clause(&mut self, i: &SqmFromClause) {
        visit_from_clause(self, i);
    }

    fn visit_join(&mut self, i: &SqmJoin) {
        visit_join(self, i);
    }

    fn visit_selectable(&mut self, i: &SqmSelectableNode) {
        visit_selectable(self, i);
    }

    fn visit_dynamic_instantiation(&mut self, i: &SqmDynamicInstantiation) {
        visit_dynamic_instantiation(self, i);
    }

    fn visit_predicate(&mut self, i: &SqmPredicate) {
        visit_predicate(self, i);
    }

    fn visit_expr(&mut self, i: &SqmExpr) {
        visit_expr(self, i);
    }

    fn visit_path(&mut self, i: &SqmPath) {}

    fn visit_parameter(&mut self, i: &Arc<SqmParameter>) {}
}

pub fn visit_statement<V>(v: &mut V, node: &SqmStatement)
where
    V: Visit + ?Sized,
{
    match node {
        SqmStatement::Select(stmt) => v.visit_query_spec(&stmt.query_spec),
        SqmStatement::Update(stmt) => {
            for join in &stmt.target.joins {
                v.visit_join(join);
            }
            for assignment in &stmt.assignments {
                v.visit_path(&assignment.path);
                v.visit_expr(&assignment.value);
            }
            if let Some(predicate) = stmt.where_clause() {
                v.visit_predicate(predicate);
            }
        }
        SqmStatement::Delete(stmt) => {
            for join in &stmt.target.joins {
                v.visit_join(join);
            }
            if let Some(predicate) = stmt.where_clause() {
                v.visit_predicate(predicate);
            }
        }
    }
}

/// Clauses are visited in rendering order: select, from, where, group by,
/// having, order by, limit, offset.
pub fn visit_query_spec<V>(v: &mut V, node: &SqmQuerySpec)
where
    V: Visit + ?Sized,
{
    for selection in node.selections() {
        v.visit_selectable(&selection.node);
    }

    v.visit_from_clause(&node.from_clause);

    if let Some(predicate) = node.where_clause() {
        v.visit_predicate(predicate);
    }

    for expr in &node.group_by {
        v.visit_expr(expr);
    }

    if let Some(predicate) = node.having_clause() {
        v.visit_predicate(predicate);
    }

    for sort in &node.order_by {
        v.visit_expr(&sort.expr);
    }

    if let Some(limit) = node.limit() {
        v.visit_expr(limit);
    }

    if let Some(offset) = node.offset() {
        v.visit_expr(offset);
    }
}

pub fn visit_from_clause<V>(v: &mut V, node: &SqmFromClause)
where
    V: Visit + ?Sized,
{
    for root in &node.roots {
        for join in &root.joins {
            v.visit_join(join);
        }
    }
}

pub fn visit_join<V>(v: &mut V, node: &SqmJoin)
where
    V: Visit + ?Sized,
{
    if let Some(on) = &node.on {
        v.visit_predicate(on);
    }

    for join in &node.joins {
        v.visit_join(join);
    }
}

pub fn visit_selectable<V>(v: &mut V, node: &SqmSelectableNode)
where
    V: Visit + ?Sized,
{
    match node {
        SqmSelectableNode::Expr(expr) => v.visit_expr(expr),
        SqmSelectableNode::Entity(_) => {}
        SqmSelectableNode::DynamicInstantiation(instantiation) => {
            v.visit_dynamic_instantiation(instantiation)
        }
    }
}

pub fn visit_dynamic_instantiation<V>(v: &mut V, node: &SqmDynamicInstantiation)
where
    V: Visit + ?Sized,
{
    for argument in &node.arguments {
        v.visit_selectable(&argument.node);
    }
}

pub fn visit_predicate<V>(v: &mut V, node: &SqmPredicate)
where
    V: Visit + ?Sized,
{
    match node {
        SqmPredicate::Comparison(p) => {
            v.visit_expr(&p.lhs);
            v.visit_expr(&p.rhs);
        }
        SqmPredicate::Junction(p) => {
            for predicate in &p.predicates {
                v.visit_predicate(predicate);
            }
        }
        SqmPredicate::Negated(p) => v.visit_predicate(p),
        SqmPredicate::IsNull(p) => v.visit_expr(&p.expr),
        SqmPredicate::InList(p) => {
            v.visit_expr(&p.expr);
            for expr in &p.list {
                v.visit_expr(expr);
            }
        }
        SqmPredicate::InSubquery(p) => {
            v.visit_expr(&p.expr);
            v.visit_query_spec(&p.subquery);
        }
        SqmPredicate::Exists(p) => v.visit_query_spec(&p.subquery),
        SqmPredicate::Like(p) => {
            v.visit_expr(&p.expr);
            v.visit_expr(&p.pattern);
            if let Some(escape) = &p.escape {
                v.visit_expr(escape);
            }
        }
        SqmPredicate::Between(p) => {
            v.visit_expr(&p.expr);
            v.visit_expr(&p.low);
            v.visit_expr(&p.high);
        }
        SqmPredicate::BooleanExpr(expr) => v.visit_expr(expr),
    }
}

pub fn visit_expr<V>(v: &mut V, node: &SqmExpr)
where
    V: Visit + ?Sized,
{
    match node {
        SqmExpr::Path(path) => v.visit_path(path),
        SqmExpr::Literal(_) => {}
        SqmExpr::Parameter(param) => v.visit_parameter(param),
        SqmExpr::Function(func) => {
            for arg in &func.args {
                v.visit_expr(arg);
            }
        }
        SqmExpr::Arithmetic(arithmetic) => {
            v.visit_expr(&arithmetic.lhs);
            v.visit_expr(&arithmetic.rhs);
        }
        SqmExpr::Negated(expr) => v.visit_expr(expr),
        SqmExpr::Tuple(exprs) => {
            for expr in exprs {
                v.visit_expr(expr);
            }
        }
        SqmExpr::Subquery(query) => v.visit_query_spec(query),
    }
}

/// Collects the distinct parameters of a statement in first-occurrence order.
#[derive(Debug, Default)]
pub struct ParameterCollector {
    seen: HashSet<ByAddress<Arc<SqmParameter>>>,
    parameters: Vec<Arc<SqmParameter>>,
}

impl ParameterCollector {
    pub fn collect(stmt: &SqmStatement) -> Vec<Arc<SqmParameter>> {
        let mut collector = Self::default();
        collector.visit_statement(stmt);
        collector.parameters
    }
}

impl Visit for ParameterCollector {
    fn visit_parameter(&mut self, i: &Arc<SqmParameter>) {
        if self.seen.insert(ByAddress(i.clone())) {
            self.parameters.push(i.clone());
        }
    }
}
