//! Table reference extraction - generic traversal over the query AST

use serde::Serialize;

use crate::error::{DepthExceededError, Span};
use crate::parser::{Node, Script};

/// Default bound on AST nesting during traversal
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// A table named somewhere in the query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReference {
    pub name: String,
    pub span: Option<Span>,
}

impl From<&str> for TableReference {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
            span: None,
        }
    }
}

/// Pre-order depth-first traversal: `visitor` runs on a node, then on its
/// children in source order. The root sits at depth 1.
pub fn visit<F>(root: &Node, max_depth: usize, visitor: &mut F) -> Result<(), DepthExceededError>
where
    F: FnMut(&Node),
{
    visit_at(root, 1, max_depth, visitor)
}

fn visit_at<F>(
    node: &Node,
    depth: usize,
    max_depth: usize,
    visitor: &mut F,
) -> Result<(), DepthExceededError>
where
    F: FnMut(&Node),
{
    if depth > max_depth {
        return Err(DepthExceededError { limit: max_depth });
    }

    visitor(node);
    for child in node.children() {
        visit_at(child, depth + 1, max_depth, visitor)?;
    }
    Ok(())
}

/// Every `TableRef` in the script, in document order, duplicates kept
pub fn extract_tables(
    script: &Script,
    max_depth: usize,
) -> Result<Vec<TableReference>, DepthExceededError> {
    let mut tables = Vec::new();
    for stmt in &script.statements {
        visit(stmt, max_depth, &mut |node| {
            if let Node::TableRef(table) = node {
                tables.push(TableReference {
                    name: table.name.clone(),
                    span: table.span,
                });
            }
        })?;
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{Query, Select, SubqueryExpr, SubqueryKind, TableRef};
    use crate::parser::parse;

    fn names(sql: &str) -> Vec<String> {
        let script = parse(sql).unwrap();
        extract_tables(&script, DEFAULT_MAX_DEPTH)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect()
    }

    /// `depth` scalar subqueries wrapped around `SELECT * FROM users`
    fn nested(depth: usize) -> Node {
        let mut node = Node::TableRef(TableRef {
            name: "users".to_string(),
            schema: None,
            alias: None,
            span: None,
        });
        for _ in 0..depth {
            let query = Node::Query(Query {
                recursive: false,
                ctes: Vec::new(),
                body: Box::new(Node::Select(Select {
                    distinct: false,
                    projection: Vec::new(),
                    from: vec![node],
                    selection: None,
                    group_by: None,
                    having: None,
                })),
                order_by: Vec::new(),
                limit: Vec::new(),
            });
            node = Node::Subquery(SubqueryExpr {
                kind: SubqueryKind::Scalar,
                query: Box::new(query),
            });
        }
        node
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        assert_eq!(
            names("SELECT * FROM users u1 JOIN groups g JOIN users u2 ON 1 = 1"),
            vec!["users", "groups", "users"]
        );
    }

    #[test]
    fn test_no_tables() {
        assert!(names("SELECT 1").is_empty());
    }

    #[test]
    fn test_visit_is_pre_order() {
        let script = parse("SELECT * FROM users JOIN groups ON 1 = 1").unwrap();
        let mut kinds = Vec::new();
        visit(&script.statements[0], DEFAULT_MAX_DEPTH, &mut |node| {
            kinds.push(node.kind())
        })
        .unwrap();

        assert_eq!(kinds[0], "Query");
        assert_eq!(kinds[1], "Select");
        let table = kinds.iter().position(|k| *k == "TableRef").unwrap();
        let join = kinds.iter().position(|k| *k == "Join").unwrap();
        assert!(table < join);
    }

    #[test]
    fn test_depth_limit() {
        // 3 nodes per nesting level plus the leaf table
        let tree = nested(10);
        let mut count = 0;
        assert!(visit(&tree, 31, &mut |_| count += 1).is_ok());
        assert_eq!(count, 31);

        let err = visit(&tree, 30, &mut |_| {}).unwrap_err();
        assert_eq!(err, DepthExceededError { limit: 30 });
    }

    #[test]
    fn test_pathological_nesting_is_rejected() {
        // 1201 levels deep
        let script = Script {
            statements: vec![nested(400)],
        };
        assert!(extract_tables(&script, DEFAULT_MAX_DEPTH).is_err());
    }
}
