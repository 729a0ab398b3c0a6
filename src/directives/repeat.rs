use super::{Directive, Renderer};
use crate::error::RenderError;
use std::path::Path;
use trellis_expr::value::{to_number, type_name};
use trellis_expr::{ExprError, Scope};
use trellis_markup::{Document, Element, Node, splice};

/// Stands in for an expanded `repeat` until the injection stage has run, so
/// already-rendered iterations are not scanned for expressions a second time.
const FRAGMENT_TAG: &str = "trellis-fragment";

fn placeholder(index: usize) -> Node {
    Node::Element(Element::new(FRAGMENT_TAG).with_attribute("ref", index.to_string()))
}

/// Puts the expanded iterations back in place of their placeholders.
pub(super) fn restore_fragments(nodes: &mut Vec<Node>, fragments: &mut [Vec<Node>]) {
    if fragments.is_empty() {
        return;
    }
    let mut i = 0;
    while i < nodes.len() {
        let slot = match &nodes[i] {
            Node::Element(el) if el.is(FRAGMENT_TAG) => el
                .attribute("ref")
                .and_then(|r| r.parse::<usize>().ok())
                .filter(|&r| r < fragments.len()),
            _ => None,
        };
        match slot {
            Some(r) => {
                let fragment = std::mem::take(&mut fragments[r]);
                let len = fragment.len();
                splice(nodes, i, fragment);
                i += len;
            }
            None => {
                if let Node::Element(el) = &mut nodes[i] {
                    restore_fragments(&mut el.children, fragments);
                }
                i += 1;
            }
        }
    }
}

impl Renderer<'_> {
    /// Expands every `repeat` that is not inside an unresolved `if`, leaving a
    /// placeholder whose rendered iterations are pushed onto `fragments`.
    pub(crate) fn expand_repeats(
        &mut self,
        path: &Path,
        nodes: &mut [Node],
        scope: &mut Scope,
        fragments: &mut Vec<Vec<Node>>,
    ) -> Result<(), RenderError> {
        for node in nodes.iter_mut() {
            let Node::Element(el) = &mut *node else {
                continue;
            };
            if el.is(Directive::Repeat.tag()) {
                let expanded = self.expand_repeat(path, el, scope)?;
                *node = placeholder(fragments.len());
                fragments.push(expanded);
            } else if !el.is(Directive::If.tag()) {
                self.expand_repeats(path, &mut el.children, scope, fragments)?;
            }
        }
        Ok(())
    }

    /// Renders the body once per index. The body is re-parsed for every
    /// iteration and sees scope changes made by earlier iterations.
    fn expand_repeat(&mut self, path: &Path, repeat: &Element, scope: &mut Scope) -> Result<Vec<Node>, RenderError> {
        let (from, to) = self.repeat_bounds(repeat, scope)?;
        let count = if to < from { 0 } else { i128::from(to) - i128::from(from) + 1 };
        if count > self.config.max_iterations as i128 {
            return Err(RenderError::malformed(
                Directive::Repeat.tag(),
                format!(
                    "{} iterations ({}..={}) exceed the limit of {}",
                    count, from, to, self.config.max_iterations
                ),
            ));
        }

        let index = repeat
            .attribute("index")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let body = repeat.inner_html();
        log::debug!("Expanding <repeat> {}..={} ({} iterations)", from, to, count);

        let mut expanded = Vec::new();
        for i in from..=to {
            if let Some(name) = &index {
                scope.set(name.clone(), i);
            }
            let iteration = Document::parse(&body)?;
            let iteration = self.process_template(path, iteration, scope)?;
            expanded.extend(iteration.into_nodes());
        }
        Ok(expanded)
    }

    /// `times` wins when it is positive; otherwise `from` and `to` are
    /// required, unless `times` was given (a zero count).
    fn repeat_bounds(&self, repeat: &Element, scope: &Scope) -> Result<(i64, i64), RenderError> {
        let times = self.bound(repeat, "times", scope)?;
        if let Some(times) = times
            && times > 0
        {
            return Ok((0, times - 1));
        }
        match (self.bound(repeat, "from", scope)?, self.bound(repeat, "to", scope)?) {
            (Some(from), Some(to)) => Ok((from, to)),
            _ if times.is_some() => Ok((0, -1)),
            _ => Err(RenderError::malformed(
                Directive::Repeat.tag(),
                "needs a positive 'times' or both 'from' and 'to'",
            )),
        }
    }

    fn bound(&self, repeat: &Element, name: &str, scope: &Scope) -> Result<Option<i64>, RenderError> {
        let Some(expression) = repeat.attribute(name) else {
            return Ok(None);
        };
        let value = self.evaluate(expression, scope)?;
        let number = to_number(&value).filter(|n| n.is_finite()).ok_or_else(|| {
            RenderError::expression(
                expression,
                ExprError::Type(format!(
                    "<repeat> '{}' must be a number, got {}",
                    name,
                    type_name(&value)
                )),
            )
        })?;
        Ok(Some(number.trunc() as i64))
    }
}
