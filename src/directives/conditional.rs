use super::{Directive, Renderer};
use crate::error::RenderError;
use trellis_expr::Scope;
use trellis_expr::value::is_truthy;
use trellis_markup::Node;

impl Renderer<'_> {
    /// Resolves every `if` chain outside `repeat` bodies. The chosen branch is
    /// unwrapped in place and walked again, so conditionals it reveals are
    /// resolved too. Discarded branches are never evaluated.
    pub(crate) fn resolve_conditionals(&self, nodes: &mut Vec<Node>, scope: &Scope) -> Result<(), RenderError> {
        let mut i = 0;
        while i < nodes.len() {
            match Directive::of(&nodes[i]) {
                Some(Directive::If) => {
                    let chain = chain_members(nodes, i);
                    let chosen = self.choose_branch(nodes, &chain, scope)?;
                    let last = chain.last().copied().unwrap_or(i);
                    match chosen.and_then(|idx| nodes[idx].as_element()) {
                        Some(branch) => log::debug!("<if> chain of {}: taking <{}>", chain.len(), branch.name),
                        None => log::debug!("<if> chain of {}: no branch taken", chain.len()),
                    }
                    let mut survivors = Vec::new();
                    for (idx, node) in (i..=last).zip(nodes.drain(i..=last)) {
                        if !chain.contains(&idx) {
                            survivors.push(node);
                        } else if Some(idx) == chosen
                            && let Node::Element(branch) = node
                        {
                            survivors.extend(branch.children);
                        }
                    }
                    nodes.splice(i..i, survivors);
                }
                Some(orphan @ (Directive::Elif | Directive::Else)) => {
                    return Err(RenderError::malformed(
                        orphan.tag(),
                        "must directly follow an <if> or <elif>",
                    ));
                }
                Some(Directive::Repeat) => i += 1,
                _ => {
                    if let Node::Element(el) = &mut nodes[i] {
                        self.resolve_conditionals(&mut el.children, scope)?;
                    }
                    i += 1;
                }
            }
        }
        Ok(())
    }

    /// Index of the first member whose condition holds, or of the trailing `else`.
    fn choose_branch(&self, nodes: &[Node], chain: &[usize], scope: &Scope) -> Result<Option<usize>, RenderError> {
        for &idx in chain {
            let Some(el) = nodes[idx].as_element() else {
                continue;
            };
            if el.is(Directive::Else.tag()) {
                return Ok(Some(idx));
            }
            let condition = el.attribute("condition").ok_or_else(|| {
                RenderError::malformed(&el.name.to_ascii_lowercase(), "missing 'condition' attribute")
            })?;
            if is_truthy(&self.evaluate(condition, scope)?) {
                return Ok(Some(idx));
            }
        }
        Ok(None)
    }
}

/// The `if` at `start` plus its following sibling `elif`s and optional
/// `else`. Only elements count as siblings: text and comments between
/// members stay in place and do not break the chain.
fn chain_members(nodes: &[Node], start: usize) -> Vec<usize> {
    let mut chain = vec![start];
    let mut next = start + 1;
    while let Some(k) = (next..nodes.len()).find(|&k| nodes[k].as_element().is_some()) {
        match Directive::of(&nodes[k]) {
            Some(Directive::Elif) => {
                chain.push(k);
                next = k + 1;
            }
            Some(Directive::Else) => {
                chain.push(k);
                break;
            }
            _ => break,
        }
    }
    chain
}
