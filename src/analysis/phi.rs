//! Classification of merge instructions.
//!
//! A phi sits in one of three structural positions, told apart by the control
//! flow node right before its block:
//!
//! ```text
//! gamma:  if (c) { .. } else { .. }  block: phi     prev is an if
//! mu:     loop { block: phi ... }                   no prev, parent is a loop
//! eta:    loop { .. if (c) { break } .. }  block: phi   prev is a loop
//! ```
//!
//! On top of the incoming values, a phi result is divergent when lanes can
//! disagree about which edge was taken. For a gamma that is the branch
//! condition. For a mu it is any condition guarding an extra edge into the
//! header (a `continue`). For an eta it is any condition guarding a `break`.

use strum::IntoStaticStr;

use crate::{
    analysis::{DivergenceTable, Uniformity},
    ir::{BlockId, CfNode, CfNodeId, Function, Instruction, PhiNode, PhiSource, ValueId},
    Error, Result,
};

/// Structural shape of a merge instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum PhiShape {
    /// Merge after the given `if`.
    Gamma(CfNodeId),
    /// Loop header merge of the given loop.
    Mu(CfNodeId),
    /// Merge after the given loop.
    Eta(CfNodeId),
}

fn shape_error(block: BlockId, message: impl Into<String>) -> Error {
    Error::UnexpectedCfShape {
        block,
        message: message.into(),
    }
}

/// Returns `true` if `block` lies somewhere inside `node`.
fn is_inside(func: &Function, block: BlockId, node: CfNodeId) -> bool {
    let mut current = func.block_parent(block);
    while let Some(parent) = current {
        if parent == node {
            return true;
        }
        current = func.cf_parent(parent);
    }
    false
}

/// Collects the conditions of the `if`s between `pred` and the enclosing loop
/// `target`, innermost first.
fn conditions_up_to(
    func: &Function,
    merge: BlockId,
    pred: BlockId,
    target: CfNodeId,
) -> Result<Vec<ValueId>> {
    let mut conditions = Vec::new();
    let mut current = func.block_parent(pred);
    loop {
        match current {
            Some(node) if node == target => return Ok(conditions),
            Some(node) => {
                match func.cf_node(node) {
                    Some(CfNode::If(branch)) => conditions.push(branch.condition),
                    _ => {
                        return Err(shape_error(
                            merge,
                            format!("edge from {pred} crosses {node} before reaching {target}"),
                        ))
                    }
                }
                current = func.cf_parent(node);
            }
            None => {
                return Err(shape_error(
                    merge,
                    format!("edge from {pred} does not come from inside {target}"),
                ))
            }
        }
    }
}

impl PhiShape {
    /// Classifies the merge instructions at the start of `block`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedCfShape`] if the block cannot hold a merge: it
    /// directly follows another block, or it starts a list that is not a loop body.
    /// Returns [`Error::Malformed`] if `block` does not exist.
    pub fn of(func: &Function, block: BlockId) -> Result<Self> {
        let cf = func
            .block(block)
            .ok_or_else(|| malformed_error!("unknown block {}", block))?
            .cf_node();

        match func.cf_prev(cf) {
            None => match func.cf_parent(cf) {
                Some(parent) if func.cf_node(parent).and_then(CfNode::as_loop).is_some() => {
                    Ok(Self::Mu(parent))
                }
                _ => Err(shape_error(block, "merge at the start of a list that is not a loop body")),
            },
            Some(prev) => match func.cf_node(prev) {
                Some(CfNode::If(_)) => Ok(Self::Gamma(prev)),
                Some(CfNode::Loop(_)) => Ok(Self::Eta(prev)),
                _ => Err(shape_error(block, format!("merge directly after {prev}"))),
            },
        }
    }

    /// Returns the branch conditions whose divergence makes `phi` divergent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedCfShape`] if a loop header merge does not have
    /// exactly two unconditional edges (entry and back edge), if a loop exit
    /// edge does not leave from inside an `if`, or if an edge crosses another
    /// loop on its way to the merge.
    pub fn controlling_conditions(
        self,
        func: &Function,
        block: BlockId,
        phi: &PhiNode,
    ) -> Result<Vec<ValueId>> {
        match self {
            Self::Gamma(node) => Ok(func.if_condition(node).into_iter().collect()),
            Self::Mu(node) => {
                let back_edge = func.loop_last_block(node);
                let (unconditional, conditional): (Vec<&PhiSource>, Vec<&PhiSource>) =
                    phi.sources().iter().partition(|source| {
                        Some(source.pred()) == back_edge || !is_inside(func, source.pred(), node)
                    });
                if unconditional.len() != 2 {
                    return Err(shape_error(
                        block,
                        format!(
                            "loop header merge {} has {} unconditional edges, expected 2",
                            phi.dest(),
                            unconditional.len()
                        ),
                    ));
                }

                let mut conditions = Vec::new();
                for source in conditional {
                    conditions.extend(conditions_up_to(func, block, source.pred(), node)?);
                }
                Ok(conditions)
            }
            Self::Eta(node) => {
                let mut conditions = Vec::new();
                for source in phi.sources() {
                    let parent = func.block_parent(source.pred());
                    if parent.and_then(|p| func.cf_node(p)).and_then(CfNode::as_if).is_none() {
                        return Err(shape_error(
                            block,
                            format!(
                                "loop exit edge from {} does not leave from inside an if",
                                source.pred()
                            ),
                        ));
                    }
                    conditions.extend(conditions_up_to(func, block, source.pred(), node)?);
                }
                Ok(conditions)
            }
        }
    }
}

/// Computes the classification of the merge `phi` at the start of `block`.
///
/// A divergent incoming value decides the result without looking at control
/// flow. A branch merge with at most one incoming value that is not undefined
/// is uniform whatever its condition. Loop merges get no such exemption: lanes
/// leaving a loop on different iterations disagree even about a single value.
pub(crate) fn phi_uniformity(
    func: &Function,
    table: &DivergenceTable,
    block: BlockId,
    phi: &PhiNode,
) -> Result<Uniformity> {
    if phi.used_values().any(|v| table.is_divergent(v)) {
        return Ok(Uniformity::Divergent);
    }

    let shape = PhiShape::of(func, block)?;
    if matches!(shape, PhiShape::Gamma(_)) && defined_source_count(func, phi) <= 1 {
        return Ok(Uniformity::Uniform);
    }

    let conditions = shape.controlling_conditions(func, block, phi)?;
    Ok(Uniformity::from_divergent(
        conditions.iter().any(|&c| table.is_divergent(c)),
    ))
}

/// Counts the incoming values not defined by an undef placeholder.
fn defined_source_count(func: &Function, phi: &PhiNode) -> usize {
    phi.used_values()
        .filter(|&v| !func.def_instruction(v).is_some_and(Instruction::is_undef))
        .count()
}
