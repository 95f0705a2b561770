//! Lowering from sqlparser's AST into the query AST

use std::fmt::Display;
use std::ops::ControlFlow;

use sqlparser::ast::{
    Expr, GroupByExpr, JoinConstraint, JoinOperator, ObjectName, Query as SqlQuery,
    Select as SqlSelect, SetExpr, SetQuantifier, Statement, TableAlias, TableFactor,
    TableWithJoins, Visit, Visitor,
};

use crate::error::{ParseError, Span};
use crate::parser::ast::{
    CteDefinition, CteRef, DerivedTable, Expression, Identifier, JoinClause, JoinKind, Literal,
    NestedJoin, Node, Query, Select, SetOperation, SubqueryExpr, SubqueryKind, TableFunction,
    TableRef, Values,
};

/// Converts parsed statements into `Node`s, tracking which CTE names are in scope
pub(super) struct Lowerer {
    /// Lowercased CTE names visible at the current point, innermost last
    cte_scope: Vec<String>,
}

impl Lowerer {
    pub(super) fn new() -> Self {
        Self {
            cte_scope: Vec::new(),
        }
    }

    pub(super) fn lower_statement(&mut self, stmt: &Statement) -> Result<Node, ParseError> {
        match stmt {
            Statement::Query(query) => self.lower_query(query),
            other => Err(ParseError::UnsupportedStatement(leading_keyword(other))),
        }
    }

    fn lower_query(&mut self, query: &SqlQuery) -> Result<Node, ParseError> {
        // CTE names stay visible only inside the query that declares them
        let scope_len = self.cte_scope.len();
        let result = self.lower_query_scoped(query);
        self.cte_scope.truncate(scope_len);
        result
    }

    fn lower_query_scoped(&mut self, query: &SqlQuery) -> Result<Node, ParseError> {
        let mut ctes = Vec::new();
        let mut recursive = false;

        if let Some(with) = &query.with {
            recursive = with.recursive;

            for cte in &with.cte_tables {
                let name = cte.alias.name.value.clone();

                // A recursive CTE may reference itself; a plain one only sees earlier CTEs
                if recursive {
                    self.cte_scope.push(name.to_lowercase());
                }
                let body = self.lower_query(&cte.query)?;
                if !recursive {
                    self.cte_scope.push(name.to_lowercase());
                }

                ctes.push(Node::Cte(CteDefinition {
                    name,
                    columns: cte
                        .alias
                        .columns
                        .iter()
                        .map(|c| c.name.value.clone())
                        .collect(),
                    query: Box::new(body),
                }));
            }
        }

        let body = self.lower_set_expr(&query.body)?;

        let mut order_by = Vec::new();
        if let Some(clause) = &query.order_by {
            for expr in &clause.exprs {
                order_by.push(self.expression(expr)?);
            }
        }

        let mut limit = Vec::new();
        if let Some(expr) = &query.limit {
            limit.push(self.expression(expr)?);
        }
        if let Some(offset) = &query.offset {
            limit.push(self.expression(&offset.value)?);
        }

        Ok(Node::Query(Query {
            recursive,
            ctes,
            body: Box::new(body),
            order_by,
            limit,
        }))
    }

    fn lower_set_expr(&mut self, set_expr: &SetExpr) -> Result<Node, ParseError> {
        match set_expr {
            SetExpr::Select(select) => self.lower_select(select),
            SetExpr::Query(query) => self.lower_query(query),
            SetExpr::SetOperation {
                op,
                set_quantifier,
                left,
                right,
            } => {
                let left = self.lower_set_expr(left)?;
                let right = self.lower_set_expr(right)?;
                Ok(Node::SetOperation(SetOperation {
                    op: op.to_string(),
                    all: matches!(set_quantifier, SetQuantifier::All),
                    left: Box::new(left),
                    right: Box::new(right),
                }))
            }
            SetExpr::Values(values) => {
                let mut rows = Vec::with_capacity(values.rows.len());
                for row in &values.rows {
                    let sql = row
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    rows.push(Node::Expression(Expression {
                        sql: format!("({})", sql),
                        children: self.collect(row)?,
                    }));
                }
                Ok(Node::Values(Values { rows }))
            }
            // `TABLE name`
            SetExpr::Table(table) => match &table.table_name {
                Some(name) => Ok(self.table_node(
                    name.clone(),
                    table.schema_name.clone(),
                    None,
                    None,
                )),
                None => Err(ParseError::UnsupportedRelation(set_expr.to_string())),
            },
            other => Err(ParseError::UnsupportedStatement(
                other
                    .to_string()
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_uppercase(),
            )),
        }
    }

    fn lower_select(&mut self, select: &SqlSelect) -> Result<Node, ParseError> {
        let mut projection = Vec::with_capacity(select.projection.len());
        for item in &select.projection {
            projection.push(self.expression(item)?);
        }

        let mut from = Vec::new();
        for table in &select.from {
            self.lower_table_with_joins(table, &mut from)?;
        }

        let selection = match &select.selection {
            Some(expr) => Some(Box::new(self.expression(expr)?)),
            None => None,
        };

        let group_by = match &select.group_by {
            GroupByExpr::Expressions(exprs, _) if exprs.is_empty() => None,
            group_by => Some(Box::new(self.expression(group_by)?)),
        };

        let having = match &select.having {
            Some(expr) => Some(Box::new(self.expression(expr)?)),
            None => None,
        };

        Ok(Node::Select(Select {
            distinct: select.distinct.is_some(),
            projection,
            from,
            selection,
            group_by,
            having,
        }))
    }

    fn lower_table_with_joins(
        &mut self,
        table: &TableWithJoins,
        out: &mut Vec<Node>,
    ) -> Result<(), ParseError> {
        out.push(self.lower_table_factor(&table.relation)?);

        for join in &table.joins {
            let relation = self.lower_table_factor(&join.relation)?;
            let constraint = self.lower_join_constraint(&join.join_operator)?;
            out.push(Node::Join(JoinClause {
                kind: join_kind(&join.join_operator),
                relation: Box::new(relation),
                constraint: constraint.map(Box::new),
            }));
        }

        Ok(())
    }

    fn lower_join_constraint(&mut self, op: &JoinOperator) -> Result<Option<Node>, ParseError> {
        use JoinOperator::*;

        let constraint = match op {
            Inner(c) | LeftOuter(c) | RightOuter(c) | FullOuter(c) | Semi(c) | LeftSemi(c)
            | RightSemi(c) | Anti(c) | LeftAnti(c) | RightAnti(c) => c,
            CrossJoin => return Ok(None),
            // Remaining operators (APPLY, ASOF, ...) are not modeled; keep their subqueries
            other => {
                let children = self.collect(other)?;
                if children.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(Node::Expression(Expression {
                    sql: String::new(),
                    children,
                })));
            }
        };

        match constraint {
            JoinConstraint::On(expr) => self.expression(expr).map(Some),
            JoinConstraint::Using(columns) => {
                let names: Vec<String> = columns.iter().map(ToString::to_string).collect();
                Ok(Some(Node::Expression(Expression {
                    sql: format!("USING ({})", names.join(", ")),
                    children: names
                        .into_iter()
                        .map(|name| Node::Identifier(Identifier { parts: vec![name] }))
                        .collect(),
                })))
            }
            JoinConstraint::Natural | JoinConstraint::None => Ok(None),
        }
    }

    fn lower_table_factor(&mut self, factor: &TableFactor) -> Result<Node, ParseError> {
        match factor {
            TableFactor::Table {
                name, alias, args, ..
            } => {
                let alias = alias_name(alias.as_ref());

                // Table-valued function call, e.g. json_each(...)
                if let Some(args) = args {
                    return Ok(Node::TableFunction(TableFunction {
                        name: name.to_string(),
                        alias,
                        args: self.collect(args)?,
                    }));
                }

                self.relation(name, alias)
            }
            TableFactor::Derived {
                lateral,
                subquery,
                alias,
            } => {
                let subquery = self.lower_query(subquery)?;
                Ok(Node::Derived(DerivedTable {
                    lateral: *lateral,
                    alias: alias_name(alias.as_ref()),
                    subquery: Box::new(subquery),
                }))
            }
            TableFactor::TableFunction { expr, alias } => Ok(Node::TableFunction(TableFunction {
                name: expr.to_string(),
                alias: alias_name(alias.as_ref()),
                args: self.collect(expr)?,
            })),
            TableFactor::Function {
                name, args, alias, ..
            } => Ok(Node::TableFunction(TableFunction {
                name: name.to_string(),
                alias: alias_name(alias.as_ref()),
                args: self.collect(args)?,
            })),
            TableFactor::UNNEST {
                alias, array_exprs, ..
            } => Ok(Node::TableFunction(TableFunction {
                name: "unnest".to_string(),
                alias: alias_name(alias.as_ref()),
                args: self.collect(array_exprs)?,
            })),
            TableFactor::NestedJoin {
                table_with_joins,
                alias,
                ..
            } => {
                let mut items = Vec::new();
                self.lower_table_with_joins(table_with_joins, &mut items)?;
                Ok(Node::NestedJoin(NestedJoin {
                    alias: alias_name(alias.as_ref()),
                    items,
                }))
            }
            other => Err(ParseError::UnsupportedRelation(other.to_string())),
        }
    }

    fn relation(&self, name: &ObjectName, alias: Option<String>) -> Result<Node, ParseError> {
        let (schema, table) = match name.0.as_slice() {
            [table] => (None, table),
            [.., schema, table] => (Some(schema.value.clone()), table),
            [] => return Err(ParseError::UnsupportedRelation(name.to_string())),
        };

        Ok(self.table_node(
            table.value.clone(),
            schema,
            alias,
            Span::from_sqlparser(&table.span),
        ))
    }

    /// A FROM name is a CTE reference when an enclosing WITH binds it
    fn table_node(
        &self,
        name: String,
        schema: Option<String>,
        alias: Option<String>,
        span: Option<Span>,
    ) -> Node {
        let lowered = name.to_lowercase();
        if schema.is_none() && self.cte_scope.iter().any(|cte| *cte == lowered) {
            return Node::CteRef(CteRef { name, alias });
        }

        Node::TableRef(TableRef {
            name,
            schema,
            alias,
            span,
        })
    }

    /// Lower any expression-bearing AST fragment into a single `Expression`
    fn expression<T: Visit + Display>(&mut self, item: &T) -> Result<Node, ParseError> {
        let children = self.collect(item)?;
        Ok(Node::Expression(Expression {
            sql: item.to_string(),
            children,
        }))
    }

    /// Collect identifiers, literals, and subqueries found directly in `item`
    fn collect<T: Visit>(&mut self, item: &T) -> Result<Vec<Node>, ParseError> {
        let mut collector = ExprCollector {
            lowerer: self,
            query_depth: 0,
            pending: Vec::new(),
            nodes: Vec::new(),
        };
        match item.visit(&mut collector) {
            ControlFlow::Break(err) => Err(err),
            ControlFlow::Continue(()) => Ok(collector.nodes),
        }
    }
}

/// Walks an expression fragment with sqlparser's visitor and lowers what it finds.
///
/// Queries reached at depth 0 are lowered as subqueries through the owning
/// `Lowerer`; anything inside them is left to that recursive call.
struct ExprCollector<'a> {
    lowerer: &'a mut Lowerer,
    query_depth: usize,
    /// Queries announced by EXISTS / IN expressions, matched by address when reached
    pending: Vec<(*const SqlQuery, SubqueryKind)>,
    nodes: Vec<Node>,
}

impl Visitor for ExprCollector<'_> {
    type Break = ParseError;

    fn pre_visit_query(&mut self, query: &SqlQuery) -> ControlFlow<Self::Break> {
        if self.query_depth == 0 {
            let kind = match self
                .pending
                .iter()
                .position(|(ptr, _)| std::ptr::eq(*ptr, query))
            {
                Some(pos) => self.pending.swap_remove(pos).1,
                None => SubqueryKind::Scalar,
            };

            match self.lowerer.lower_query(query) {
                Ok(node) => self.nodes.push(Node::Subquery(SubqueryExpr {
                    kind,
                    query: Box::new(node),
                })),
                Err(err) => return ControlFlow::Break(err),
            }
        }
        self.query_depth += 1;
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &SqlQuery) -> ControlFlow<Self::Break> {
        self.query_depth -= 1;
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if self.query_depth > 0 {
            return ControlFlow::Continue(());
        }

        match expr {
            Expr::Identifier(ident) => self.nodes.push(Node::Identifier(Identifier {
                parts: vec![ident.value.clone()],
            })),
            Expr::CompoundIdentifier(idents) => self.nodes.push(Node::Identifier(Identifier {
                parts: idents.iter().map(|i| i.value.clone()).collect(),
            })),
            Expr::Value(value) => self.nodes.push(Node::Literal(Literal {
                value: value.to_string(),
            })),
            Expr::Exists { subquery, .. } => {
                let ptr: *const SqlQuery = subquery.as_ref();
                self.pending.push((ptr, SubqueryKind::Exists));
            }
            Expr::InSubquery { subquery, .. } => {
                let ptr: *const SqlQuery = subquery.as_ref();
                self.pending.push((ptr, SubqueryKind::In));
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

fn join_kind(op: &JoinOperator) -> JoinKind {
    match op {
        JoinOperator::Inner(_) => JoinKind::Inner,
        JoinOperator::LeftOuter(_) => JoinKind::Left,
        JoinOperator::RightOuter(_) => JoinKind::Right,
        JoinOperator::FullOuter(_) => JoinKind::Full,
        JoinOperator::CrossJoin => JoinKind::Cross,
        _ => JoinKind::Other,
    }
}

fn alias_name(alias: Option<&TableAlias>) -> Option<String> {
    alias.map(|a| a.name.value.clone())
}

fn leading_keyword(stmt: &Statement) -> String {
    stmt.to_string()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase()
}
