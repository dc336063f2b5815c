//! Element Query and Matching
//!
//! Selector parsing plus `matches`, `closest` and `querySelector(All)`.
//! Supported: type, universal, `#id`, `.class`, `[attr]`, `[attr=value]`,
//! descendant and child combinators, and comma-separated lists.

use crate::{DomTree, NodeId};

/// Selector parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected {found:?} at {position} in selector {selector:?}")]
    Unexpected { selector: String, position: usize, found: char },

    #[error("unterminated attribute selector in {0:?}")]
    Unterminated(String),
}

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    /// Left-to-right compounds
    parts: Vec<Compound>,
    /// `combinators[i]` joins `parts[i]` and `parts[i + 1]`
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    value: Option<String>,
}

impl Selector {
    /// Parse a selector list
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser { source, chars: source.chars().collect(), pos: 0 };
        let alternatives = parser.parse_list()?;
        Ok(Self { source: source.trim().to_string(), alternatives })
    }

    /// The selector text as given (trimmed)
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// `element.matches(selector)`; non-elements never match
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.alternatives.iter().any(|c| c.matches_at(tree, node, c.parts.len() - 1))
    }

    /// `element.closest(selector)`: nearest inclusive tree ancestor that matches
    pub fn closest(&self, tree: &DomTree, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.matches(tree, id) {
                return Some(id);
            }
            current = tree.parent(id);
        }
        None
    }

    /// All matching descendants of `root` (exclusive) in tree order
    pub fn query_all(&self, tree: &DomTree, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = tree.children(root).into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            if self.matches(tree, id) {
                out.push(id);
            }
            stack.extend(tree.children(id).into_iter().rev());
        }
        out
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl Complex {
    fn matches_at(&self, tree: &DomTree, node: NodeId, idx: usize) -> bool {
        if !self.parts[idx].matches(tree, node) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => tree
                .parent(node)
                .is_some_and(|p| self.matches_at(tree, p, idx - 1)),
            Combinator::Descendant => {
                let mut ancestor = tree.parent(node);
                while let Some(a) = ancestor {
                    if self.matches_at(tree, a, idx - 1) {
                        return true;
                    }
                    ancestor = tree.parent(a);
                }
                false
            }
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some(el) = tree.get(node).and_then(|n| n.as_element()) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if tag != "*" && *tag != el.tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| el.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|a| match (&a.value, el.get_attr(&a.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        })
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(found) => SelectorError::Unexpected {
                selector: self.source.to_string(),
                position: self.pos,
                found,
            },
            None => SelectorError::Empty,
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Complex>, SelectorError> {
        let mut list = Vec::new();
        loop {
            self.skip_ws();
            list.push(self.parse_complex()?);
            self.skip_ws();
            match self.peek() {
                None => return Ok(list),
                Some(',') => self.pos += 1,
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut parts = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    combinators.push(Combinator::Child);
                }
                Some(_) if had_ws => combinators.push(Combinator::Descendant),
                Some(_) => return Err(self.unexpected()),
            }
            parts.push(self.parse_compound()?);
        }
        Ok(Complex { parts, combinators })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        loop {
            match self.peek() {
                Some('*') if compound.is_empty() => {
                    self.pos += 1;
                    compound.tag = Some("*".to_string());
                }
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.attr()?);
                }
                Some(c) if is_ident_char(c) && compound.is_empty() => {
                    compound.tag = Some(self.ident()?.to_ascii_lowercase());
                }
                _ => break,
            }
        }
        if compound.is_empty() {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn attr(&mut self) -> Result<AttrSelector, SelectorError> {
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        let value = match self.peek() {
            Some('=') => {
                self.pos += 1;
                self.skip_ws();
                Some(self.attr_value()?)
            }
            _ => None,
        };
        self.skip_ws();
        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(AttrSelector { name, value })
            }
            None => Err(SelectorError::Unterminated(self.source.to_string())),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn attr_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(SelectorError::Unterminated(self.source.to_string()));
                }
                let value = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                Ok(value)
            }
            _ => self.ident(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let ul = tree.create_element("ul");
        let li = tree.create_element("li");
        let a = tree.create_element("a");
        tree.get_mut(ul).unwrap().as_element_mut().unwrap().set_attr("class", "menu");
        tree.get_mut(li).unwrap().as_element_mut().unwrap().set_attr("class", "item active");
        tree.get_mut(a).unwrap().as_element_mut().unwrap().set_attr("href", "/home");
        tree.append_child(tree.root(), ul).unwrap();
        tree.append_child(ul, li).unwrap();
        tree.append_child(li, a).unwrap();
        (tree, ul, li, a)
    }

    #[test]
    fn test_compound_matching() {
        let (tree, ul, li, a) = sample();
        assert!(Selector::parse("li.item.active").unwrap().matches(&tree, li));
        assert!(Selector::parse("*").unwrap().matches(&tree, ul));
        assert!(Selector::parse("a[href]").unwrap().matches(&tree, a));
        assert!(Selector::parse("a[href='/home']").unwrap().matches(&tree, a));
        assert!(!Selector::parse("a[href=other]").unwrap().matches(&tree, a));
        assert!(!Selector::parse(".item").unwrap().matches(&tree, tree.root()));
    }

    #[test]
    fn test_combinators_and_lists() {
        let (tree, ul, li, a) = sample();
        assert!(Selector::parse(".menu a").unwrap().matches(&tree, a));
        assert!(Selector::parse(".menu > li").unwrap().matches(&tree, li));
        assert!(!Selector::parse(".menu > a").unwrap().matches(&tree, a));
        assert!(Selector::parse("p, ul").unwrap().matches(&tree, ul));
    }

    #[test]
    fn test_closest_and_query_all() {
        let (tree, ul, li, a) = sample();
        let sel = Selector::parse(".menu").unwrap();
        assert_eq!(sel.closest(&tree, a), Some(ul));
        assert_eq!(Selector::parse("li, a").unwrap().query_all(&tree, ul), vec![li, a]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert!(matches!(Selector::parse("a,,b"), Err(SelectorError::Unexpected { .. })));
        assert!(matches!(Selector::parse("[x"), Err(SelectorError::Unterminated(_))));
        assert!(matches!(Selector::parse(".a!"), Err(SelectorError::Unexpected { found: '!', .. })));
    }
}
