//! Query AST
//!
//! A closed set of node variants covering what the platform analysis needs
//! from a query: where tables are referenced and what encloses them.
//! Everything else (column lists, predicates, ordering) is kept as generic
//! `Expression` nodes whose children are identifiers, literals, and nested
//! subqueries.

use serde::Serialize;

use crate::error::Span;

/// Root of a parsed query text: one or more `;`-separated statements
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Script {
    pub statements: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Query(Query),
    Select(Select),
    SetOperation(SetOperation),
    Values(Values),
    Cte(CteDefinition),
    TableRef(TableRef),
    CteRef(CteRef),
    TableFunction(TableFunction),
    Derived(DerivedTable),
    NestedJoin(NestedJoin),
    Join(JoinClause),
    Subquery(SubqueryExpr),
    Expression(Expression),
    Identifier(Identifier),
    Literal(Literal),
}

impl Node {
    /// Direct children in source order.
    ///
    /// This is the only way traversal descends into the tree; every variant
    /// is listed so a new one cannot be skipped silently.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Query(query) => {
                let mut children: Vec<&Node> = query.ctes.iter().collect();
                children.push(query.body.as_ref());
                children.extend(query.order_by.iter());
                children.extend(query.limit.iter());
                children
            }
            Node::Select(select) => {
                let mut children: Vec<&Node> = select.projection.iter().collect();
                children.extend(select.from.iter());
                children.extend(select.selection.as_deref());
                children.extend(select.group_by.as_deref());
                children.extend(select.having.as_deref());
                children
            }
            Node::SetOperation(op) => vec![op.left.as_ref(), op.right.as_ref()],
            Node::Values(values) => values.rows.iter().collect(),
            Node::Cte(cte) => vec![cte.query.as_ref()],
            Node::TableFunction(func) => func.args.iter().collect(),
            Node::Derived(derived) => vec![derived.subquery.as_ref()],
            Node::NestedJoin(nested) => nested.items.iter().collect(),
            Node::Join(join) => {
                let mut children = vec![join.relation.as_ref()];
                children.extend(join.constraint.as_deref());
                children
            }
            Node::Subquery(subquery) => vec![subquery.query.as_ref()],
            Node::Expression(expr) => expr.children.iter().collect(),
            Node::TableRef(_) | Node::CteRef(_) | Node::Identifier(_) | Node::Literal(_) => {
                Vec::new()
            }
        }
    }

    /// Short variant name, used when printing trees
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Query(_) => "Query",
            Node::Select(_) => "Select",
            Node::SetOperation(_) => "SetOperation",
            Node::Values(_) => "Values",
            Node::Cte(_) => "Cte",
            Node::TableRef(_) => "TableRef",
            Node::CteRef(_) => "CteRef",
            Node::TableFunction(_) => "TableFunction",
            Node::Derived(_) => "Derived",
            Node::NestedJoin(_) => "NestedJoin",
            Node::Join(_) => "Join",
            Node::Subquery(_) => "Subquery",
            Node::Expression(_) => "Expression",
            Node::Identifier(_) => "Identifier",
            Node::Literal(_) => "Literal",
        }
    }
}

/// `[WITH ...] body [ORDER BY ...] [LIMIT ...]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub recursive: bool,
    /// `Node::Cte` entries
    pub ctes: Vec<Node>,
    pub body: Box<Node>,
    pub order_by: Vec<Node>,
    /// LIMIT and OFFSET expressions
    pub limit: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<Node>,
    /// FROM items, flattened: each relation followed by its `Node::Join`s
    pub from: Vec<Node>,
    pub selection: Option<Box<Node>>,
    pub group_by: Option<Box<Node>>,
    pub having: Option<Box<Node>>,
}

/// `left UNION [ALL] right`, `INTERSECT`, `EXCEPT`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetOperation {
    pub op: String,
    pub all: bool,
    pub left: Box<Node>,
    pub right: Box<Node>,
}

/// `VALUES (...), (...)`; one `Expression` per row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Values {
    pub rows: Vec<Node>,
}

/// `name [(columns)] AS (query)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CteDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub query: Box<Node>,
}

/// Reference to a real table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRef {
    pub name: String,
    pub schema: Option<String>,
    pub alias: Option<String>,
    pub span: Option<Span>,
}

/// FROM item naming a CTE that is in scope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CteRef {
    pub name: String,
    pub alias: Option<String>,
}

/// Table-valued function in FROM, e.g. `json_each(...)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableFunction {
    pub name: String,
    pub alias: Option<String>,
    pub args: Vec<Node>,
}

/// Subquery in FROM
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedTable {
    pub lateral: bool,
    pub alias: Option<String>,
    pub subquery: Box<Node>,
}

/// Parenthesized join in FROM, `(a JOIN b ON ...)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedJoin {
    pub alias: Option<String>,
    pub items: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub relation: Box<Node>,
    /// ON / USING condition
    pub constraint: Option<Box<Node>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubqueryKind {
    Scalar,
    Exists,
    In,
}

/// Subquery used as an expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubqueryExpr {
    pub kind: SubqueryKind,
    pub query: Box<Node>,
}

/// Opaque expression subtree, kept only for what it contains
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    pub sql: String,
    pub children: Vec<Node>,
}

/// Column or qualified name, `a` or `t.a`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub parts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Literal {
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> Node {
        Node::TableRef(TableRef {
            name: name.to_string(),
            schema: None,
            alias: None,
            span: None,
        })
    }

    #[test]
    fn test_join_children_in_source_order() {
        let join = Node::Join(JoinClause {
            kind: JoinKind::Inner,
            relation: Box::new(table("groups")),
            constraint: Some(Box::new(Node::Expression(Expression {
                sql: "1 = 1".to_string(),
                children: Vec::new(),
            }))),
        });

        let kinds: Vec<_> = join.children().iter().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec!["TableRef", "Expression"]);
    }

    #[test]
    fn test_leaves_have_no_children() {
        assert!(table("users").children().is_empty());
        assert!(Node::Literal(Literal {
            value: "1".to_string()
        })
        .children()
        .is_empty());
    }
}
