use super::{ParseOptions, Punct, Spanned, Token};
use crate::{
    err,
    schema::{
        Attribute, AttributeId, AttributeTy, CollectionElement, EntityId, Metamodel, NavigablePath,
    },
    sqm::{
        InstantiationTarget, ParameterLabel, SqmBetween, SqmDeleteStatement,
        SqmDynamicInstantiation, SqmExists, SqmExpr, SqmFrom, SqmFromClause, SqmFunction,
        SqmFunctionName, SqmInList, SqmInSubquery, SqmIsNull, SqmJoin, SqmLike, SqmParameter,
        SqmPath, SqmPathSource, SqmPredicate, SqmQuerySpec, SqmRoot, SqmSelectStatement,
        SqmSelectableNode, SqmSelection, SqmSortSpecification, SqmStatement, SqmUpdateStatement,
    },
    stmt::{ArithmeticOp, BinaryOp, Direction, JoinType, NullPrecedence, Type, Value},
    Error, Result,
};

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

/// Words that terminate a clause and therefore can never be aliases.
const RESERVED: &[&str] = &[
    "and", "as", "asc", "between", "by", "delete", "desc", "distinct", "escape", "exists",
    "false", "fetch", "first", "from", "group", "having", "in", "inner", "is", "join", "last",
    "left", "like", "limit", "new", "not", "null", "nulls", "offset", "on", "or", "order",
    "outer", "select", "set", "true", "update", "where", "with",
];

pub(super) struct Parser<'a> {
    metamodel: &'a Metamodel,
    tokens: Vec<Spanned>,
    pos: usize,

    /// Length of the query string, reported for errors at end of input
    end: usize,

    options: ParseOptions,

    /// From clauses of the query specs being parsed, outermost first
    scopes: Vec<SqmFromClause>,

    /// One shared parameter per label
    parameters: HashMap<ParameterLabel, Arc<SqmParameter>>,

    /// Labels used directly as an `in` operand
    multi_valued: HashSet<ParameterLabel>,
}

/// A from-element resolved by alias or path.
#[derive(Debug, Clone)]
struct FromRef {
    scope: usize,
    path: Arc<NavigablePath>,
    entity: Option<EntityId>,
    attribute: Option<AttributeId>,
}

impl<'a> Parser<'a> {
    pub(super) fn new(
        metamodel: &'a Metamodel,
        tokens: Vec<Spanned>,
        end: usize,
        options: ParseOptions,
    ) -> Parser<'a> {
        let multi_valued = multi_valued_labels(&tokens);

        Parser {
            metamodel,
            tokens,
            pos: 0,
            end,
            options,
            scopes: vec![],
            parameters: HashMap::new(),
            multi_valued,
        }
    }

    pub(super) fn parse_statement(&mut self) -> Result<SqmStatement> {
        let stmt = if self.is_keyword("update") {
            self.update()?.into()
        } else if self.is_keyword("delete") {
            self.delete()?.into()
        } else {
            SqmSelectStatement::new(self.query_spec()?).into()
        };

        if !self.is_eof() {
            return Err(self.unexpected());
        }

        Ok(stmt)
    }

    // ===== Statements =====

    /// Parses one select level. The from clause is parsed before the select
    /// list so that selections can reference its aliases.
    fn query_spec(&mut self) -> Result<SqmQuerySpec> {
        let mut spec = SqmQuerySpec::new();

        let select = if self.take_keyword("select") {
            spec.select_clause.distinct = self.take_keyword("distinct");
            let start = self.pos;
            self.pos = self.find_from(start)?;
            Some(start)
        } else {
            if self.options.strict_compliance {
                return Err(self.error_here("query without a select clause is not JPQL compliant"));
            }
            None
        };

        self.expect_keyword("from")?;

        self.scopes.push(SqmFromClause::default());
        let res = self.query_spec_body(&mut spec, select);
        spec.from_clause = self.scopes.pop().unwrap_or_default();
        res?;

        if select.is_none() {
            for root in &spec.from_clause.roots {
                spec.select_clause.selections.push(SqmSelection::new(
                    SqmSelectableNode::Entity(root.path.clone()),
                    None,
                ));
            }
        }

        Ok(spec)
    }

    fn query_spec_body(&mut self, spec: &mut SqmQuerySpec, select: Option<usize>) -> Result<()> {
        self.from_clause()?;

        if let Some(start) = select {
            let resume = self.pos;
            self.pos = start;
            self.select_clause(spec)?;

            if !self.is_keyword("from") {
                return Err(self.unexpected());
            }
            self.pos = resume;
        }

        if self.take_keyword("where") {
            let predicate = self.predicate()?;
            spec.set_where_clause_restrictions(predicate)?;
        }

        if self.take_keyword("group") {
            self.expect_keyword("by")?;
            loop {
                let expr = self.expr()?;
                spec.add_group_by(expr);
                if !self.take_punct(Punct::Comma) {
                    break;
                }
            }
        }

        if self.take_keyword("having") {
            let predicate = self.predicate()?;
            spec.set_having_clause_restrictions(predicate)?;
        }

        if self.take_keyword("order") {
            self.expect_keyword("by")?;
            loop {
                let sort = self.sort_specification()?;
                spec.add_sort_specification(sort);
                if !self.take_punct(Punct::Comma) {
                    break;
                }
            }
        }

        if self.is_keyword("limit") {
            self.check_non_standard("limit")?;
            self.pos += 1;
            let limit = self.expr()?;
            spec.set_limit(limit)?;
        }

        if self.is_keyword("offset") {
            self.check_non_standard("offset")?;
            self.pos += 1;
            let offset = self.expr()?;
            spec.set_offset(offset)?;
        }

        Ok(())
    }

    fn update(&mut self) -> Result<SqmUpdateStatement> {
        self.expect_keyword("update")?;
        self.take_keyword("versioned");

        self.scopes.push(SqmFromClause::default());
        let res = self.update_body();
        let mut from_clause = self.scopes.pop().unwrap_or_default();
        let (assignments, predicate) = res?;

        let Some(target) = from_clause.roots.pop() else {
            return Err(err!("update target missing from scope"));
        };

        let mut stmt = SqmUpdateStatement::new(target);
        for (path, value) in assignments {
            stmt.add_assignment(path, value);
        }
        if let Some(predicate) = predicate {
            stmt.set_where_clause_restrictions(predicate)?;
        }
        Ok(stmt)
    }

    #[allow(clippy::type_complexity)]
    fn update_body(&mut self) -> Result<(Vec<(SqmPath, SqmExpr)>, Option<SqmPredicate>)> {
        self.root()?;
        self.expect_keyword("set")?;

        let mut assignments = vec![];
        loop {
            let pos = self.current_pos();
            let first = self.ident()?;
            let path = match self.path(first, pos)? {
                SqmExpr::Path(path) => path,
                _ => return Err(self.error_at(pos, "expected an attribute path")),
            };
            self.expect_punct(Punct::Eq)?;
            let value = self.expr()?;
            assignments.push((path, value));

            if !self.take_punct(Punct::Comma) {
                break;
            }
        }

        let predicate = if self.take_keyword("where") {
            Some(self.predicate()?)
        } else {
            None
        };

        Ok((assignments, predicate))
    }

    fn delete(&mut self) -> Result<SqmDeleteStatement> {
        self.expect_keyword("delete")?;
        self.take_keyword("from");

        self.scopes.push(SqmFromClause::default());
        let res = self.delete_body();
        let mut from_clause = self.scopes.pop().unwrap_or_default();
        let predicate = res?;

        let Some(target) = from_clause.roots.pop() else {
            return Err(err!("delete target missing from scope"));
        };

        let mut stmt = SqmDeleteStatement::new(target);
        if let Some(predicate) = predicate {
            stmt.set_where_clause_restrictions(predicate)?;
        }
        Ok(stmt)
    }

    fn delete_body(&mut self) -> Result<Option<SqmPredicate>> {
        self.root()?;

        if self.take_keyword("where") {
            Ok(Some(self.predicate()?))
        } else {
            Ok(None)
        }
    }

    // ===== From clause =====

    fn from_clause(&mut self) -> Result<()> {
        loop {
            self.root()?;

            while self.is_join_start() {
                self.join()?;
            }

            if !self.take_punct(Punct::Comma) {
                return Ok(());
            }
        }
    }

    fn root(&mut self) -> Result<()> {
        let metamodel = self.metamodel;

        let pos = self.current_pos();
        let name = self.ident()?;
        let Some(entity) = metamodel.entity_by_name(&name) else {
            return Err(self.error_at(pos, &format!("could not resolve entity `{name}`")));
        };

        let alias = self.optional_alias()?;
        let root = SqmRoot::new(entity.id, &entity.name, alias.as_deref());

        let pos = self.current_pos();
        self.scope_mut()?
            .add_root(root)
            .map_err(|e| e.context(self.error_at(pos, "invalid from clause")))
    }

    fn is_join_start(&self) -> bool {
        self.is_keyword("join")
            || ((self.is_keyword("left") || self.is_keyword("inner"))
                && (self.is_keyword_nth(1, "join") || self.is_keyword_nth(1, "outer")))
    }

    fn join(&mut self) -> Result<()> {
        let join_type = if self.take_keyword("left") {
            self.take_keyword("outer");
            JoinType::Left
        } else {
            self.take_keyword("inner");
            JoinType::Inner
        };
        self.expect_keyword("join")?;
        let fetch = self.take_keyword("fetch");

        let pos = self.current_pos();
        let source = self.ident()?;
        let current = self.scopes.len() - 1;
        let mut from = match self.resolve_alias(&source) {
            Some(from) if from.scope == current => from,
            _ => {
                return Err(
                    self.error_at(pos, &format!("could not resolve join source `{source}`"))
                )
            }
        };

        let mut segments = vec![];
        while self.take_punct(Punct::Dot) {
            segments.push(self.any_ident()?);
        }
        let Some((name, intermediate)) = segments.split_last() else {
            return Err(self.error_here(&format!("expected attribute path after `{source}`")));
        };

        for segment in intermediate {
            let attr = self.attribute_of(&from, segment, pos)?;
            let Some(to_one) = attr.as_to_one() else {
                return Err(self.error_at(
                    pos,
                    &format!("cannot join through non to-one attribute `{segment}`"),
                ));
            };
            from = self.implicit_join(&from, attr.id, &attr.name, to_one.target)?;
        }

        let attr = self.attribute_of(&from, name, pos)?;
        let target = match &attr.ty {
            AttributeTy::ToOne(to_one) => Some(to_one.target),
            AttributeTy::Plural(plural) => plural.element.as_entity(),
            _ => {
                return Err(self.error_at(
                    pos,
                    &format!("attribute `{name}` is not an association or collection"),
                ))
            }
        };

        let alias_pos = self.current_pos();
        let alias = self.optional_alias()?;

        if fetch && alias.is_some() && self.options.strict_compliance {
            return Err(self.error_at(alias_pos, "aliased fetch joins are not JPQL compliant"));
        }

        if let Some(alias) = &alias {
            self.scope_mut()?
                .check_alias(alias)
                .map_err(|e| e.context(self.error_at(alias_pos, "invalid join")))?;
        }

        let path = Arc::new(from.path.append(&attr.name, alias.as_deref()));

        let joins = self.joins_mut(&from)?;
        joins.push(SqmJoin {
            attribute: attr.id,
            target,
            alias,
            path: path.clone(),
            join_type,
            fetch,
            implicit: false,
            on: None,
            joins: vec![],
        });

        if self.take_keyword("on") || self.take_keyword("with") {
            let predicate = self.predicate()?;
            if let Some(join) = self.scope_mut()?.find_join_mut(&path) {
                join.on = Some(predicate);
            }
        }

        Ok(())
    }

    // ===== Select clause =====

    fn select_clause(&mut self, spec: &mut SqmQuerySpec) -> Result<()> {
        loop {
            let pos = self.current_pos();
            let selection = self.selection()?;
            spec.add_selection(selection)
                .map_err(|e| e.context(self.error_at(pos, "invalid selection")))?;

            if !self.take_punct(Punct::Comma) {
                return Ok(());
            }
        }
    }

    fn selection(&mut self) -> Result<SqmSelection> {
        let node = if self.is_keyword("new") {
            SqmSelectableNode::DynamicInstantiation(self.instantiation()?)
        } else {
            let expr = self.expr()?;
            self.selectable(expr)?
        };

        let alias = self.optional_alias()?;
        Ok(SqmSelection::new(node, alias))
    }

    /// Entity-valued paths select the entity; a to-one attribute selects its
    /// target through an implicit join.
    fn selectable(&mut self, expr: SqmExpr) -> Result<SqmSelectableNode> {
        let metamodel = self.metamodel;

        let SqmExpr::Path(path) = expr else {
            return Ok(SqmSelectableNode::Expr(expr));
        };

        match path.source {
            SqmPathSource::Entity(_) => Ok(SqmSelectableNode::Entity(path.lhs)),
            SqmPathSource::Attribute(id) => {
                let attr = metamodel.attribute(id);
                match attr.as_to_one() {
                    Some(to_one) => {
                        let from = self.from_ref(&path.lhs)?;
                        let join = self.implicit_join(&from, id, &attr.name, to_one.target)?;
                        Ok(SqmSelectableNode::Entity(join.path))
                    }
                    None => Ok(SqmSelectableNode::Expr(SqmExpr::Path(path))),
                }
            }
            _ => Ok(SqmSelectableNode::Expr(SqmExpr::Path(path))),
        }
    }

    fn instantiation(&mut self) -> Result<SqmDynamicInstantiation> {
        self.expect_keyword("new")?;

        let name = self.any_ident()?;
        let target = if name.eq_ignore_ascii_case("list") {
            InstantiationTarget::List
        } else if name.eq_ignore_ascii_case("map") {
            InstantiationTarget::Map
        } else {
            let mut name = name;
            while self.take_punct(Punct::Dot) {
                name.push('.');
                name.push_str(&self.any_ident()?);
            }
            InstantiationTarget::Class(name)
        };

        let mut instantiation = SqmDynamicInstantiation::new(target);

        self.expect_punct(Punct::LParen)?;
        loop {
            let pos = self.current_pos();
            let argument = self.selection()?;
            instantiation
                .add_argument(argument)
                .map_err(|e| e.context(self.error_at(pos, "invalid instantiation argument")))?;

            if !self.take_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_punct(Punct::RParen)?;

        Ok(instantiation)
    }

    fn sort_specification(&mut self) -> Result<SqmSortSpecification> {
        let expr = self.expr()?;

        let direction = if self.take_keyword("desc") {
            Direction::Desc
        } else {
            self.take_keyword("asc");
            Direction::Asc
        };

        let mut sort = SqmSortSpecification::new(expr, direction);

        if self.take_keyword("nulls") {
            sort.nulls = Some(if self.take_keyword("first") {
                NullPrecedence::First
            } else {
                self.expect_keyword("last")?;
                NullPrecedence::Last
            });
        }

        Ok(sort)
    }

    // ===== Predicates =====

    fn predicate(&mut self) -> Result<SqmPredicate> {
        let mut lhs = self.conjunction()?;
        while self.take_keyword("or") {
            let rhs = self.conjunction()?;
            lhs = SqmPredicate::or(lhs, rhs);
        }
        Ok(lhs)
    }

    fn conjunction(&mut self) -> Result<SqmPredicate> {
        let mut lhs = self.negation()?;
        while self.take_keyword("and") {
            let rhs = self.negation()?;
            lhs = SqmPredicate::and(lhs, rhs);
        }
        Ok(lhs)
    }

    fn negation(&mut self) -> Result<SqmPredicate> {
        if self.take_keyword("not") {
            return Ok(SqmPredicate::not(self.negation()?));
        }
        self.primary_predicate()
    }

    fn primary_predicate(&mut self) -> Result<SqmPredicate> {
        if self.take_keyword("exists") {
            let subquery = self.subquery()?;
            return Ok(SqmPredicate::Exists(SqmExists {
                subquery: Box::new(subquery),
                negated: false,
            }));
        }

        // `(` opens either a nested predicate or a parenthesized operand.
        // Try the predicate first and fall back when an operator follows.
        if self.is_punct(Punct::LParen) && !self.is_keyword_nth(1, "select") {
            let save = self.pos;
            self.pos += 1;

            if let Ok(predicate) = self.predicate() {
                if self.take_punct(Punct::RParen) && !self.is_operand_continuation() {
                    return Ok(predicate);
                }
            }

            self.pos = save;
        }

        let lhs = self.expr()?;
        self.predicate_tail(lhs)
    }

    fn predicate_tail(&mut self, lhs: SqmExpr) -> Result<SqmPredicate> {
        if let Some(op) = self.peek_comparison() {
            self.pos += 1;
            let rhs = self.expr()?;
            return Ok(SqmPredicate::comparison(lhs, op, rhs));
        }

        if self.take_keyword("is") {
            let negated = self.take_keyword("not");
            self.expect_keyword("null")?;
            return Ok(SqmPredicate::IsNull(SqmIsNull { expr: lhs, negated }));
        }

        let negated = self.is_keyword("not")
            && ["in", "like", "between"]
                .iter()
                .any(|keyword| self.is_keyword_nth(1, keyword));
        if negated {
            self.pos += 1;
        }

        if self.take_keyword("in") {
            return self.in_predicate(lhs, negated);
        }

        if self.take_keyword("like") {
            let pattern = self.expr()?;
            let escape = if self.take_keyword("escape") {
                Some(self.expr()?)
            } else {
                None
            };
            return Ok(SqmPredicate::Like(SqmLike {
                expr: lhs,
                pattern,
                escape,
                negated,
            }));
        }

        if self.take_keyword("between") {
            let low = self.expr()?;
            self.expect_keyword("and")?;
            let high = self.expr()?;
            return Ok(SqmPredicate::Between(SqmBetween {
                expr: lhs,
                low,
                high,
                negated,
            }));
        }

        Ok(SqmPredicate::BooleanExpr(lhs))
    }

    fn in_predicate(&mut self, expr: SqmExpr, negated: bool) -> Result<SqmPredicate> {
        if !self.is_punct(Punct::LParen) {
            let list = vec![self.primary()?];
            return Ok(SqmPredicate::InList(SqmInList {
                expr,
                list,
                negated,
            }));
        }

        if self.is_keyword_nth(1, "select") {
            let subquery = self.subquery()?;
            return Ok(SqmPredicate::InSubquery(SqmInSubquery {
                expr,
                subquery: Box::new(subquery),
                negated,
            }));
        }

        self.expect_punct(Punct::LParen)?;
        let mut list = vec![];
        loop {
            list.push(self.expr()?);
            if !self.take_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_punct(Punct::RParen)?;

        Ok(SqmPredicate::InList(SqmInList {
            expr,
            list,
            negated,
        }))
    }

    fn subquery(&mut self) -> Result<SqmQuerySpec> {
        self.expect_punct(Punct::LParen)?;
        let pos = self.current_pos();
        if !self.is_keyword("select") {
            return Err(self.error_at(pos, "expected subquery"));
        }
        let spec = self.query_spec()?;
        self.expect_punct(Punct::RParen)?;
        Ok(spec)
    }

    // ===== Expressions =====

    fn expr(&mut self) -> Result<SqmExpr> {
        let mut lhs = self.term()?;

        loop {
            let op = match self.peek() {
                Some(Token::Punct(Punct::Plus)) => ArithmeticOp::Add,
                Some(Token::Punct(Punct::Minus)) => ArithmeticOp::Subtract,
                Some(Token::Punct(Punct::Concat)) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    lhs = concat(lhs, rhs);
                    continue;
                }
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = SqmExpr::arithmetic(lhs, op, rhs);
        }
    }

    fn term(&mut self) -> Result<SqmExpr> {
        let mut lhs = self.unary()?;

        loop {
            let op = match self.peek() {
                Some(Token::Punct(Punct::Star)) => ArithmeticOp::Multiply,
                Some(Token::Punct(Punct::Slash)) => ArithmeticOp::Divide,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = SqmExpr::arithmetic(lhs, op, rhs);
        }
    }

    fn unary(&mut self) -> Result<SqmExpr> {
        if self.take_punct(Punct::Plus) {
            return self.unary();
        }

        if self.take_punct(Punct::Minus) {
            return Ok(match self.unary()? {
                SqmExpr::Literal(Value::I64(value)) => SqmExpr::Literal(Value::I64(-value)),
                SqmExpr::Literal(Value::F64(value)) => SqmExpr::Literal(Value::F64(-value)),
                expr => SqmExpr::Negated(Box::new(expr)),
            });
        }

        self.primary()
    }

    fn primary(&mut self) -> Result<SqmExpr> {
        let pos = self.current_pos();
        let Some(spanned) = self.tokens.get(self.pos) else {
            return Err(self.error_here("unexpected end of query"));
        };

        let expr = match spanned.token.clone() {
            Token::Int(value) => {
                self.pos += 1;
                SqmExpr::literal(value)
            }
            Token::Float(value) => {
                self.pos += 1;
                SqmExpr::literal(value)
            }
            Token::Str(value) => {
                self.pos += 1;
                SqmExpr::literal(value)
            }
            Token::NamedParam(name) => {
                self.pos += 1;
                self.parameter(ParameterLabel::Named(name), pos)?
            }
            Token::PositionalParam(position) => {
                self.pos += 1;
                self.parameter(ParameterLabel::Positional(position), pos)?
            }
            Token::Punct(Punct::LParen) => {
                if self.is_keyword_nth(1, "select") {
                    SqmExpr::Subquery(Box::new(self.subquery()?))
                } else {
                    self.pos += 1;
                    let mut exprs = vec![self.expr()?];
                    while self.take_punct(Punct::Comma) {
                        exprs.push(self.expr()?);
                    }
                    self.expect_punct(Punct::RParen)?;

                    if exprs.len() == 1 {
                        exprs.remove(0)
                    } else {
                        SqmExpr::Tuple(exprs)
                    }
                }
            }
            Token::Ident(ident) => {
                self.pos += 1;

                if ident.eq_ignore_ascii_case("true") {
                    SqmExpr::literal(true)
                } else if ident.eq_ignore_ascii_case("false") {
                    SqmExpr::literal(false)
                } else if ident.eq_ignore_ascii_case("null") {
                    SqmExpr::Literal(Value::Null)
                } else if self.is_punct(Punct::LParen) {
                    self.function(&ident, pos)?
                } else if is_reserved(&ident) {
                    return Err(self.error_at(pos, &format!("unexpected keyword `{ident}`")));
                } else {
                    self.path(ident, pos)?
                }
            }
            Token::Punct(_) => return Err(self.unexpected()),
        };

        Ok(expr)
    }

    fn function(&mut self, name: &str, pos: usize) -> Result<SqmExpr> {
        if name.eq_ignore_ascii_case("index") {
            return self.index_function(pos);
        }

        let Some(function) = SqmFunctionName::from_name(name) else {
            return Err(self.error_at(pos, &format!("unknown function `{name}`")));
        };

        self.expect_punct(Punct::LParen)?;

        if function == SqmFunctionName::Count && self.take_punct(Punct::Star) {
            self.expect_punct(Punct::RParen)?;
            return Ok(SqmExpr::function(function, vec![]));
        }

        let distinct = function.is_aggregate() && self.take_keyword("distinct");

        let mut args = vec![];
        if !self.is_punct(Punct::RParen) {
            loop {
                args.push(self.expr()?);
                if !self.take_punct(Punct::Comma) {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen)?;

        Ok(SqmExpr::Function(SqmFunction {
            name: function,
            args,
            distinct,
        }))
    }

    /// `index(alias)`: position of an element of a joined list.
    fn index_function(&mut self, pos: usize) -> Result<SqmExpr> {
        let metamodel = self.metamodel;

        self.expect_punct(Punct::LParen)?;
        let alias = self.ident()?;
        self.expect_punct(Punct::RParen)?;

        let from = self
            .resolve_alias(&alias)
            .ok_or_else(|| self.error_at(pos, &format!("could not resolve alias `{alias}`")))?;

        let plural = from
            .attribute
            .map(|id| metamodel.attribute(id))
            .and_then(|attr| attr.as_plural().map(|plural| (attr.id, plural)));

        match plural {
            Some((id, plural)) if plural.is_indexed() => Ok(SqmPath::new(
                from.path,
                SqmPathSource::CollectionIndex(id),
                Type::I32,
            )
            .into()),
            _ => Err(self.error_at(pos, &format!("`{alias}` is not a joined list"))),
        }
    }

    fn parameter(&mut self, label: ParameterLabel, pos: usize) -> Result<SqmExpr> {
        let mixed = self.parameters.keys().any(|existing| {
            matches!(
                (existing, &label),
                (ParameterLabel::Named(_), ParameterLabel::Positional(_))
                    | (ParameterLabel::Positional(_), ParameterLabel::Named(_))
            )
        });
        if mixed {
            return Err(self.error_at(pos, "cannot mix named and positional parameters"));
        }

        let allow_multi_valued = self.multi_valued.contains(&label);
        let param = self
            .parameters
            .entry(label.clone())
            .or_insert_with(|| {
                Arc::new(SqmParameter {
                    label,
                    ty: None,
                    allow_multi_valued,
                })
            })
            .clone();

        Ok(SqmExpr::Parameter(param))
    }

    // ===== Paths =====

    fn path(&mut self, first: String, pos: usize) -> Result<SqmExpr> {
        let mut segments = vec![first];
        while self.take_punct(Punct::Dot) {
            segments.push(self.any_ident()?);
        }

        let (from, rest) = match self.resolve_alias(&segments[0]) {
            Some(from) => (from, &segments[1..]),
            None => match self.unqualified_root(&segments[0]) {
                Some(from) => (from, &segments[..]),
                None => {
                    return Err(
                        self.error_at(pos, &format!("could not resolve `{}`", segments[0]))
                    )
                }
            },
        };

        Ok(self.dereference(from, rest, pos)?.into())
    }

    /// Walks `segments` from `from`. Intermediate to-one attributes become
    /// implicit joins; a to-one followed only by its identifier reads the
    /// join column instead.
    fn dereference(&mut self, mut from: FromRef, segments: &[String], pos: usize) -> Result<SqmPath> {
        let metamodel = self.metamodel;
        let mut i = 0;

        loop {
            let Some(name) = segments.get(i) else {
                return self.from_element_path(from, pos);
            };
            let last = i + 1 == segments.len();

            let Some(entity_id) = from.entity else {
                return Err(self.error_at(
                    pos,
                    &format!("cannot dereference `{name}` of a basic collection element"),
                ));
            };
            let entity = metamodel.entity(entity_id);

            if name == "id" || *name == entity.identifier.name {
                if !last {
                    return Err(self.error_at(pos, "cannot dereference a basic identifier"));
                }
                return Ok(SqmPath::new(
                    from.path,
                    SqmPathSource::Identifier(entity_id),
                    entity.identifier.ty.clone(),
                ));
            }

            if entity.version.as_ref().is_some_and(|version| version.name == *name) {
                if !last {
                    return Err(self.error_at(pos, "cannot dereference a version attribute"));
                }
                return Ok(SqmPath::new(
                    from.path,
                    SqmPathSource::Version(entity_id),
                    Type::I64,
                ));
            }

            let attr = self.attribute_of(&from, name, pos)?;

            match &attr.ty {
                AttributeTy::Basic(basic) => {
                    if !last {
                        return Err(self.error_at(
                            pos,
                            &format!("cannot dereference basic attribute `{name}`"),
                        ));
                    }
                    return Ok(SqmPath::new(
                        from.path,
                        SqmPathSource::Attribute(attr.id),
                        basic.ty.clone(),
                    ));
                }
                AttributeTy::Embedded(embedded) => {
                    let embeddable = metamodel.embeddable(embedded.embeddable);

                    if last {
                        return Ok(SqmPath::new(
                            from.path,
                            SqmPathSource::Attribute(attr.id),
                            embeddable.ty(),
                        ));
                    }

                    let field = &segments[i + 1];
                    let index = match embeddable.field_index(field) {
                        Some(index) if i + 2 == segments.len() => index,
                        Some(_) => {
                            return Err(self.error_at(
                                pos,
                                &format!("cannot dereference embeddable field `{field}`"),
                            ))
                        }
                        None => {
                            return Err(self.error_at(
                                pos,
                                &format!("embeddable `{}` has no field `{field}`", embeddable.name),
                            ))
                        }
                    };

                    return Ok(SqmPath::new(
                        from.path,
                        SqmPathSource::EmbeddedField(attr.id, index),
                        embeddable.fields[index].ty.clone(),
                    ));
                }
                AttributeTy::ToOne(to_one) => {
                    let target = metamodel.entity(to_one.target);
                    let fk_only = last
                        || (i + 2 == segments.len()
                            && (segments[i + 1] == "id"
                                || segments[i + 1] == target.identifier.name));

                    if fk_only {
                        return Ok(SqmPath::new(
                            from.path,
                            SqmPathSource::Attribute(attr.id),
                            target.identifier.ty.clone(),
                        ));
                    }

                    from = self.implicit_join(&from, attr.id, &attr.name, to_one.target)?;
                    i += 1;
                }
                AttributeTy::Plural(_) => {
                    return Err(self.error_at(
                        pos,
                        &format!("plural attribute `{name}` must be joined explicitly to be dereferenced"),
                    ));
                }
            }
        }
    }

    fn from_element_path(&self, from: FromRef, pos: usize) -> Result<SqmPath> {
        let metamodel = self.metamodel;

        if let Some(entity) = from.entity {
            let ty = metamodel.entity(entity).identifier.ty.clone();
            return Ok(SqmPath::new(from.path, SqmPathSource::Entity(entity), ty));
        }

        let element = from
            .attribute
            .and_then(|id| metamodel.attribute(id).as_plural().map(|plural| (id, plural)));

        match element {
            Some((id, plural)) => match &plural.element {
                CollectionElement::Basic { ty, .. } => Ok(SqmPath::new(
                    from.path,
                    SqmPathSource::CollectionElement(id),
                    ty.clone(),
                )),
                CollectionElement::Entity { .. } => Err(err!("entity collection join without target")),
            },
            None => Err(self.error_at(pos, "from-element is not selectable")),
        }
    }

    fn attribute_of(
        &self,
        from: &FromRef,
        name: &str,
        pos: usize,
    ) -> Result<&'a Attribute> {
        let metamodel = self.metamodel;

        let Some(entity) = from.entity.map(|id| metamodel.entity(id)) else {
            return Err(self.error_at(pos, &format!("cannot dereference `{name}` of a basic value")));
        };

        entity.attribute(name).ok_or_else(|| {
            self.error_at(
                pos,
                &format!("entity `{}` has no attribute `{name}`", entity.name),
            )
        })
    }

    /// Returns the join for `attribute` below `from`, creating an implicit
    /// inner join the first time the path is dereferenced.
    fn implicit_join(
        &mut self,
        from: &FromRef,
        attribute: AttributeId,
        name: &str,
        target: EntityId,
    ) -> Result<FromRef> {
        let path = Arc::new(from.path.append(name, None));
        if let Some(existing) = self.scopes[from.scope].find(&path) {
            return Ok(FromRef {
                scope: from.scope,
                path: existing.path().clone(),
                entity: existing.entity(),
                attribute: Some(attribute),
            });
        }

        let joins = self.joins_mut(from)?;
        joins.push(SqmJoin {
            attribute,
            target: Some(target),
            alias: None,
            path: path.clone(),
            join_type: JoinType::Inner,
            fetch: false,
            implicit: true,
            on: None,
            joins: vec![],
        });

        Ok(FromRef {
            scope: from.scope,
            path,
            entity: Some(target),
            attribute: Some(attribute),
        })
    }

    fn joins_mut(&mut self, from: &FromRef) -> Result<&mut Vec<SqmJoin>> {
        self.scopes[from.scope]
            .joins_mut(&from.path)
            .ok_or_else(|| err!("from-element `{}` not registered", from.path))
    }

    /// Resolves an alias, innermost scope first.
    fn resolve_alias(&self, alias: &str) -> Option<FromRef> {
        self.scopes.iter().enumerate().rev().find_map(|(scope, from_clause)| {
            from_clause.find_by_alias(alias).map(|from| FromRef {
                scope,
                path: from.path().clone(),
                entity: from.entity(),
                attribute: match from {
                    SqmFrom::Root(_) => None,
                    SqmFrom::Join(join) => Some(join.attribute),
                },
            })
        })
    }

    /// An unqualified attribute reference resolves against the single root
    /// of the innermost query.
    fn unqualified_root(&self, name: &str) -> Option<FromRef> {
        let scope = self.scopes.len().checked_sub(1)?;
        let [root] = &self.scopes[scope].roots[..] else {
            return None;
        };

        let entity = self.metamodel.entity(root.entity);
        let known = name == "id"
            || name == entity.identifier.name
            || entity.attribute(name).is_some()
            || entity.version.as_ref().is_some_and(|version| version.name == name);

        known.then(|| FromRef {
            scope,
            path: root.path.clone(),
            entity: Some(root.entity),
            attribute: None,
        })
    }

    fn from_ref(&self, path: &NavigablePath) -> Result<FromRef> {
        self.scopes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(scope, from_clause)| {
                from_clause.find(path).map(|from| FromRef {
                    scope,
                    path: from.path().clone(),
                    entity: from.entity(),
                    attribute: match from {
                        SqmFrom::Root(_) => None,
                        SqmFrom::Join(join) => Some(join.attribute),
                    },
                })
            })
            .ok_or_else(|| err!("from-element `{path}` not registered"))
    }

    fn scope_mut(&mut self) -> Result<&mut SqmFromClause> {
        self.scopes
            .last_mut()
            .ok_or_else(|| err!("no from clause in scope"))
    }

    // ===== Token helpers =====

    /// Index of the `from` keyword closing the select list starting at `start`.
    fn find_from(&self, start: usize) -> Result<usize> {
        let mut depth = 0usize;

        for (index, spanned) in self.tokens.iter().enumerate().skip(start) {
            match &spanned.token {
                Token::Punct(Punct::LParen) => depth += 1,
                Token::Punct(Punct::RParen) => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                token if depth == 0 && token.is_keyword("from") => return Ok(index),
                _ => {}
            }
        }

        Err(self.error_here("expected `from` clause"))
    }

    fn optional_alias(&mut self) -> Result<Option<String>> {
        if self.take_keyword("as") {
            return Ok(Some(self.ident()?));
        }

        match self.peek() {
            Some(Token::Ident(ident)) if !is_reserved(ident) => {
                let alias = ident.clone();
                self.pos += 1;
                Ok(Some(alias))
            }
            _ => Ok(None),
        }
    }

    /// Identifier that is not a reserved word.
    fn ident(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Ident(ident)) if !is_reserved(ident) => {
                let ident = ident.clone();
                self.pos += 1;
                Ok(ident)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Identifier in a position where keywords are unambiguous (after `.`).
    fn any_ident(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Ident(ident)) => {
                let ident = ident.clone();
                self.pos += 1;
                Ok(ident)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn check_non_standard(&self, clause: &str) -> Result<()> {
        if self.options.strict_compliance {
            return Err(self.error_here(&format!("`{clause}` is not JPQL compliant")));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|spanned| &spanned.token)
    }

    fn peek_comparison(&self) -> Option<BinaryOp> {
        Some(match self.peek()? {
            Token::Punct(Punct::Eq) => BinaryOp::Eq,
            Token::Punct(Punct::Ne) => BinaryOp::Ne,
            Token::Punct(Punct::Lt) => BinaryOp::Lt,
            Token::Punct(Punct::Le) => BinaryOp::Le,
            Token::Punct(Punct::Gt) => BinaryOp::Gt,
            Token::Punct(Punct::Ge) => BinaryOp::Ge,
            _ => return None,
        })
    }

    /// True when the next token continues an operand rather than a predicate.
    fn is_operand_continuation(&self) -> bool {
        if self.peek_comparison().is_some() {
            return true;
        }

        match self.peek() {
            Some(Token::Punct(
                Punct::Plus | Punct::Minus | Punct::Star | Punct::Slash | Punct::Concat,
            )) => true,
            Some(token) => ["is", "in", "like", "between"]
                .iter()
                .any(|keyword| token.is_keyword(keyword))
                || (token.is_keyword("not")
                    && ["in", "like", "between"]
                        .iter()
                        .any(|keyword| self.is_keyword_nth(1, keyword))),
            None => false,
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        self.is_keyword_nth(0, keyword)
    }

    fn is_keyword_nth(&self, n: usize, keyword: &str) -> bool {
        self.peek_nth(n).is_some_and(|token| token.is_keyword(keyword))
    }

    fn take_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.take_keyword(keyword) {
            Ok(())
        } else {
            Err(self.expected(&format!("`{keyword}`")))
        }
    }

    fn is_punct(&self, punct: Punct) -> bool {
        self.peek() == Some(&Token::Punct(punct))
    }

    fn take_punct(&mut self, punct: Punct) -> bool {
        if self.is_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: Punct) -> Result<()> {
        if self.take_punct(punct) {
            Ok(())
        } else {
            Err(self.expected(&format!("`{punct}`")))
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current_pos(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|spanned| spanned.pos)
            .unwrap_or(self.end)
    }

    fn unexpected(&self) -> Error {
        match self.peek() {
            Some(token) => self.error_here(&format!("unexpected {token}")),
            None => self.error_here("unexpected end of query"),
        }
    }

    fn expected(&self, what: &str) -> Error {
        match self.peek() {
            Some(token) => self.error_here(&format!("expected {what}, found {token}")),
            None => self.error_here(&format!("expected {what}, found end of query")),
        }
    }

    fn error_here(&self, message: &str) -> Error {
        self.error_at(self.current_pos(), message)
    }

    fn error_at(&self, pos: usize, message: &str) -> Error {
        Error::invalid_statement(format!("{message} at position {pos}"))
    }
}

fn is_reserved(ident: &str) -> bool {
    RESERVED
        .iter()
        .any(|keyword| ident.eq_ignore_ascii_case(keyword))
}

/// `a || b || c` builds one `concat(a, b, c)`.
fn concat(lhs: SqmExpr, rhs: SqmExpr) -> SqmExpr {
    match lhs {
        SqmExpr::Function(mut func) if func.name == SqmFunctionName::Concat => {
            func.args.push(rhs);
            SqmExpr::Function(func)
        }
        lhs => SqmExpr::function(SqmFunctionName::Concat, vec![lhs, rhs]),
    }
}

/// Parameters written as `in :p` or `in (:p)` accept collection bindings.
fn multi_valued_labels(tokens: &[Spanned]) -> HashSet<ParameterLabel> {
    let label = |token: Option<&Spanned>| match token.map(|spanned| &spanned.token) {
        Some(Token::NamedParam(name)) => Some(ParameterLabel::Named(name.clone())),
        Some(Token::PositionalParam(position)) => Some(ParameterLabel::Positional(*position)),
        _ => None,
    };

    let mut labels = HashSet::new();

    for (i, spanned) in tokens.iter().enumerate() {
        if !spanned.token.is_keyword("in") {
            continue;
        }

        if let Some(label) = label(tokens.get(i + 1)) {
            labels.insert(label);
            continue;
        }

        let parenthesized = tokens
            .get(i + 1)
            .is_some_and(|next| next.token == Token::Punct(Punct::LParen))
            && tokens
                .get(i + 3)
                .is_some_and(|next| next.token == Token::Punct(Punct::RParen));

        if parenthesized {
            if let Some(label) = label(tokens.get(i + 2)) {
                labels.insert(label);
            }
        }
    }

    labels
}
