//! Expression evaluation.

use crate::ast::*;
use crate::error::EvalError;
use crate::value::{Item, Value, string_to_number};
use std::collections::HashSet;
use xpatch_dom::{Document, NodeData, NodeId, NodeKind};

/// Evaluation context: the context item and its proximity position.
#[derive(Debug, Clone)]
struct Context {
    item: Item,
    position: usize,
    size: usize,
}

pub(crate) struct Evaluator<'d> {
    doc: &'d Document,
}

impl<'d> Evaluator<'d> {
    pub(crate) fn new(doc: &'d Document) -> Self {
        Self { doc }
    }

    pub(crate) fn evaluate(&self, expr: &Expr, item: Item) -> Result<Value, EvalError> {
        let ctx = Context {
            item,
            position: 1,
            size: 1,
        };
        self.eval(expr, &ctx)
    }

    fn eval(&self, expr: &Expr, ctx: &Context) -> Result<Value, EvalError> {
        match expr {
            Expr::Path(path) => {
                let start = if path.absolute {
                    Item::Node(self.tree_root(ctx.item.owner()))
                } else {
                    ctx.item.clone()
                };
                Ok(Value::Nodes(self.apply_steps(vec![start], &path.steps)?))
            }
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let mut items = match self.eval(primary, ctx)? {
                    Value::Nodes(items) => items,
                    other => {
                        return Err(EvalError::NotANodeSet {
                            found: other.type_name(),
                        });
                    }
                };
                for predicate in predicates {
                    items = self.filter(items, predicate)?;
                }
                Ok(Value::Nodes(self.apply_steps(items, steps)?))
            }
            Expr::Or(left, right) => Ok(Value::Boolean(
                self.eval(left, ctx)?.to_boolean() || self.eval(right, ctx)?.to_boolean(),
            )),
            Expr::And(left, right) => Ok(Value::Boolean(
                self.eval(left, ctx)?.to_boolean() && self.eval(right, ctx)?.to_boolean(),
            )),
            Expr::Compare { op, left, right } => {
                let left = self.eval(left, ctx)?;
                let right = self.eval(right, ctx)?;
                Ok(Value::Boolean(self.compare(*op, &left, &right)))
            }
            Expr::Arithmetic { op, left, right } => {
                let left = self.eval(left, ctx)?.to_number(self.doc);
                let right = self.eval(right, ctx)?.to_number(self.doc);
                Ok(Value::Number(op.apply(left, right)))
            }
            Expr::Negate(inner) => Ok(Value::Number(-self.eval(inner, ctx)?.to_number(self.doc))),
            Expr::Union(left, right) => {
                let mut items = self.node_set(left, ctx, "union")?;
                items.extend(self.node_set(right, ctx, "union")?);
                Ok(Value::Nodes(self.document_order(items)))
            }
            Expr::Literal(s) => Ok(Value::String(s.clone())),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Call { function, args } => self.call(*function, args, ctx),
        }
    }

    fn node_set(
        &self,
        expr: &Expr,
        ctx: &Context,
        function: &'static str,
    ) -> Result<Vec<Item>, EvalError> {
        match self.eval(expr, ctx)? {
            Value::Nodes(items) => Ok(items),
            other => Err(EvalError::ExpectedNodeSet {
                function,
                found: other.type_name(),
            }),
        }
    }

    fn tree_root(&self, node: NodeId) -> NodeId {
        self.doc.ancestors(node).last().unwrap_or(node)
    }

    // ------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------

    fn apply_steps(&self, mut items: Vec<Item>, steps: &[Step]) -> Result<Vec<Item>, EvalError> {
        for step in steps {
            let mut next = Vec::new();
            for item in &items {
                let mut candidates: Vec<Item> = self
                    .axis(item, step.axis)
                    .into_iter()
                    .filter(|candidate| self.matches(candidate, step.axis, &step.test))
                    .collect();
                for predicate in &step.predicates {
                    candidates = self.filter(candidates, predicate)?;
                }
                next.extend(candidates);
            }
            items = self.document_order(next);
        }
        Ok(items)
    }

    /// Keep the items for which `predicate` holds, numbering positions in the
    /// order given.
    fn filter(&self, items: Vec<Item>, predicate: &Expr) -> Result<Vec<Item>, EvalError> {
        let size = items.len();
        let mut kept = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            let ctx = Context {
                item,
                position: index + 1,
                size,
            };
            let keep = match self.eval(predicate, &ctx)? {
                Value::Number(n) => n == ctx.position as f64,
                other => other.to_boolean(),
            };
            if keep {
                kept.push(ctx.item);
            }
        }
        Ok(kept)
    }

    /// Items along `axis` in axis order (nearest first for reverse axes).
    fn axis(&self, item: &Item, axis: Axis) -> Vec<Item> {
        let doc = self.doc;
        let id = match item {
            Item::Node(id) => *id,
            Item::Attribute { owner, .. } => {
                return match axis {
                    Axis::Parent => vec![Item::Node(*owner)],
                    Axis::Ancestor => std::iter::once(*owner)
                        .chain(doc.ancestors(*owner))
                        .map(Item::Node)
                        .collect(),
                    Axis::AncestorOrSelf => std::iter::once(item.clone())
                        .chain(
                            std::iter::once(*owner)
                                .chain(doc.ancestors(*owner))
                                .map(Item::Node),
                        )
                        .collect(),
                    Axis::SelfAxis | Axis::DescendantOrSelf => vec![item.clone()],
                    // An attribute sits between its owner and the owner's
                    // children, and the owner is one of its ancestors.
                    Axis::Following => doc
                        .descendants(*owner)
                        .chain(self.following(*owner))
                        .map(Item::Node)
                        .collect(),
                    Axis::Preceding => self.preceding(*owner).into_iter().map(Item::Node).collect(),
                    _ => Vec::new(),
                };
            }
        };

        let nodes: Vec<NodeId> = match axis {
            Axis::Child => doc.children(id).to_vec(),
            Axis::Descendant => doc.descendants(id).collect(),
            Axis::DescendantOrSelf => std::iter::once(id).chain(doc.descendants(id)).collect(),
            Axis::Parent => doc.parent(id).into_iter().collect(),
            Axis::Ancestor => doc.ancestors(id).collect(),
            Axis::AncestorOrSelf => std::iter::once(id).chain(doc.ancestors(id)).collect(),
            Axis::FollowingSibling => match (doc.parent(id), doc.index_in_parent(id)) {
                (Some(parent), Some(index)) => doc.children(parent)[index + 1..].to_vec(),
                _ => Vec::new(),
            },
            Axis::PrecedingSibling => match (doc.parent(id), doc.index_in_parent(id)) {
                (Some(parent), Some(index)) => {
                    doc.children(parent)[..index].iter().rev().copied().collect()
                }
                _ => Vec::new(),
            },
            Axis::Following => self.following(id).collect(),
            Axis::Preceding => self.preceding(id),
            Axis::SelfAxis => vec![id],
            Axis::Attribute => {
                return doc
                    .attributes(id)
                    .iter()
                    .map(|attr| Item::Attribute {
                        owner: id,
                        name: attr.name.clone(),
                    })
                    .collect();
            }
        };
        nodes.into_iter().map(Item::Node).collect()
    }

    /// Nodes after `id` in document order, excluding its descendants.
    fn following(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let doc = self.doc;
        std::iter::once(id)
            .chain(doc.ancestors(id))
            .flat_map(move |node| {
                let siblings: &[NodeId] = match (doc.parent(node), doc.index_in_parent(node)) {
                    (Some(parent), Some(index)) => &doc.children(parent)[index + 1..],
                    _ => &[],
                };
                siblings.iter().copied()
            })
            .flat_map(move |sibling| std::iter::once(sibling).chain(doc.descendants(sibling)))
    }

    /// Nodes before `id` in reverse document order, excluding its ancestors.
    fn preceding(&self, id: NodeId) -> Vec<NodeId> {
        let doc = self.doc;
        let mut nodes = Vec::new();
        for node in std::iter::once(id).chain(doc.ancestors(id)) {
            let (Some(parent), Some(index)) = (doc.parent(node), doc.index_in_parent(node)) else {
                continue;
            };
            for &sibling in doc.children(parent)[..index].iter().rev() {
                let subtree: Vec<NodeId> = doc.descendants(sibling).collect();
                nodes.extend(subtree.into_iter().rev());
                nodes.push(sibling);
            }
        }
        nodes
    }

    fn matches(&self, item: &Item, axis: Axis, test: &NodeTest) -> bool {
        let principal_attribute = axis == Axis::Attribute;
        match (item, test) {
            (_, NodeTest::Node) => true,
            (Item::Attribute { name, .. }, NodeTest::Name(wanted)) => {
                principal_attribute && name == wanted
            }
            (Item::Attribute { .. }, NodeTest::Any) => principal_attribute,
            (Item::Attribute { .. }, _) => false,
            (Item::Node(id), test) => {
                let data = self.doc.data(*id);
                match test {
                    NodeTest::Name(wanted) => {
                        !principal_attribute
                            && matches!(data, NodeData::Element { name, .. } if name == wanted)
                    }
                    NodeTest::Any => !principal_attribute && data.kind() == NodeKind::Element,
                    NodeTest::Text => data.kind() == NodeKind::Text,
                    NodeTest::Comment => data.kind() == NodeKind::Comment,
                    NodeTest::ProcessingInstruction(wanted) => match data {
                        NodeData::ProcessingInstruction { target, .. } => {
                            wanted.as_ref().is_none_or(|w| w == target)
                        }
                        _ => false,
                    },
                    NodeTest::Node => true,
                }
            }
        }
    }

    fn document_order(&self, items: Vec<Item>) -> Vec<Item> {
        let mut seen = HashSet::new();
        let mut unique: Vec<Item> = items
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .collect();
        unique.sort_by_cached_key(|item| item.order_key(self.doc));
        unique
    }

    // ------------------------------------------------------------------
    // Comparison
    // ------------------------------------------------------------------

    fn compare(&self, op: CompareOp, left: &Value, right: &Value) -> bool {
        let doc = self.doc;
        match (left, right) {
            (Value::Nodes(l), Value::Nodes(r)) => l.iter().any(|a| {
                let a = Value::String(a.string_value(doc));
                r.iter().any(|b| {
                    let b = Value::String(b.string_value(doc));
                    self.compare_atoms(op, &a, &b)
                })
            }),
            (Value::Nodes(items), other) => self.compare_set(op, items, other, false),
            (other, Value::Nodes(items)) => self.compare_set(op, items, other, true),
            _ => self.compare_atoms(op, left, right),
        }
    }

    /// Compare a node-set against a scalar; `flipped` when the node-set was
    /// the right operand.
    fn compare_set(&self, op: CompareOp, items: &[Item], other: &Value, flipped: bool) -> bool {
        if let Value::Boolean(_) = other {
            let set = Value::Boolean(!items.is_empty());
            return if flipped {
                self.compare_atoms(op, other, &set)
            } else {
                self.compare_atoms(op, &set, other)
            };
        }
        items.iter().any(|item| {
            let text = Value::String(item.string_value(self.doc));
            let atom = match other {
                Value::Number(_) => Value::Number(text.to_number(self.doc)),
                _ => text,
            };
            if flipped {
                self.compare_atoms(op, other, &atom)
            } else {
                self.compare_atoms(op, &atom, other)
            }
        })
    }

    fn compare_atoms(&self, op: CompareOp, left: &Value, right: &Value) -> bool {
        let doc = self.doc;
        if op.is_equality() {
            let equal = match (left, right) {
                (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
                    left.to_boolean() == right.to_boolean()
                }
                (Value::Number(_), _) | (_, Value::Number(_)) => {
                    left.to_number(doc) == right.to_number(doc)
                }
                _ => left.to_string_value(doc) == right.to_string_value(doc),
            };
            return (op == CompareOp::Eq) == equal;
        }
        let (l, r) = (left.to_number(doc), right.to_number(doc));
        match op {
            CompareOp::Lt => l < r,
            CompareOp::LtEq => l <= r,
            CompareOp::Gt => l > r,
            CompareOp::GtEq => l >= r,
            CompareOp::Eq | CompareOp::NotEq => false,
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn call(&self, function: Function, args: &[Expr], ctx: &Context) -> Result<Value, EvalError> {
        let doc = self.doc;
        let name = function.name();

        // Single optional argument defaulting to the context item.
        let string_arg = |this: &Self| -> Result<String, EvalError> {
            match args.first() {
                Some(arg) => Ok(this.eval(arg, ctx)?.to_string_value(doc)),
                None => Ok(ctx.item.string_value(doc)),
            }
        };
        let first_item = |this: &Self| -> Result<Option<Item>, EvalError> {
            match args.first() {
                Some(arg) => Ok(this.node_set(arg, ctx, name)?.into_iter().next()),
                None => Ok(Some(ctx.item.clone())),
            }
        };
        let string_at = |this: &Self, i: usize| -> Result<String, EvalError> {
            Ok(this.eval(&args[i], ctx)?.to_string_value(doc))
        };
        let number_at = |this: &Self, i: usize| -> Result<f64, EvalError> {
            Ok(this.eval(&args[i], ctx)?.to_number(doc))
        };

        let value = match function {
            Function::Last => Value::Number(ctx.size as f64),
            Function::Position => Value::Number(ctx.position as f64),
            Function::Count => Value::Number(self.node_set(&args[0], ctx, name)?.len() as f64),
            Function::Not => Value::Boolean(!self.eval(&args[0], ctx)?.to_boolean()),
            Function::True => Value::Boolean(true),
            Function::False => Value::Boolean(false),
            Function::Boolean => Value::Boolean(self.eval(&args[0], ctx)?.to_boolean()),
            Function::String => Value::String(string_arg(self)?),
            Function::Number => match args.first() {
                Some(arg) => Value::Number(self.eval(arg, ctx)?.to_number(doc)),
                None => Value::Number(Value::String(ctx.item.string_value(doc)).to_number(doc)),
            },
            Function::Name => Value::String(
                first_item(self)?
                    .map(|item| item.name(doc).to_string())
                    .unwrap_or_default(),
            ),
            Function::LocalName => Value::String(
                first_item(self)?
                    .map(|item| {
                        let name = item.name(doc);
                        name.rsplit(':').next().unwrap_or(name).to_string()
                    })
                    .unwrap_or_default(),
            ),
            Function::Contains => {
                Value::Boolean(string_at(self, 0)?.contains(string_at(self, 1)?.as_str()))
            }
            Function::StartsWith => {
                Value::Boolean(string_at(self, 0)?.starts_with(string_at(self, 1)?.as_str()))
            }
            Function::NormalizeSpace => Value::String(
                string_arg(self)?
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Function::StringLength => Value::Number(string_arg(self)?.chars().count() as f64),
            Function::Concat => {
                let mut out = String::new();
                for i in 0..args.len() {
                    out.push_str(&string_at(self, i)?);
                }
                Value::String(out)
            }
            Function::Substring => {
                let text = string_at(self, 0)?;
                let start = round(number_at(self, 1)?);
                let end = match args.get(2) {
                    Some(_) => start + round(number_at(self, 2)?),
                    None => f64::INFINITY,
                };
                Value::String(
                    text.chars()
                        .enumerate()
                        .filter(|&(index, _)| {
                            let position = (index + 1) as f64;
                            position >= start && position < end
                        })
                        .map(|(_, c)| c)
                        .collect(),
                )
            }
            Function::SubstringBefore => {
                let text = string_at(self, 0)?;
                let needle = string_at(self, 1)?;
                Value::String(
                    text.find(needle.as_str())
                        .map(|at| text[..at].to_string())
                        .unwrap_or_default(),
                )
            }
            Function::SubstringAfter => {
                let text = string_at(self, 0)?;
                let needle = string_at(self, 1)?;
                Value::String(
                    text.find(needle.as_str())
                        .map(|at| text[at + needle.len()..].to_string())
                        .unwrap_or_default(),
                )
            }
            Function::Translate => {
                let text = string_at(self, 0)?;
                let from: Vec<char> = string_at(self, 1)?.chars().collect();
                let to: Vec<char> = string_at(self, 2)?.chars().collect();
                Value::String(
                    text.chars()
                        .filter_map(|c| match from.iter().position(|&f| f == c) {
                            Some(index) => to.get(index).copied(),
                            None => Some(c),
                        })
                        .collect(),
                )
            }
            Function::Sum => Value::Number(
                self.node_set(&args[0], ctx, name)?
                    .iter()
                    .map(|item| string_to_number(&item.string_value(doc)))
                    .sum(),
            ),
            Function::Floor => Value::Number(number_at(self, 0)?.floor()),
            Function::Ceiling => Value::Number(number_at(self, 0)?.ceil()),
            Function::Round => Value::Number(round(number_at(self, 0)?)),
        };
        Ok(value)
    }
}

/// XPath `round()`: halves go towards positive infinity.
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}
