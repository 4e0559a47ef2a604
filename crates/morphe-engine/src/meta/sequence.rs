//! Member ordering
//!
//! Members carry an optional Dewey-decimal sequence (`"1"`, `"1.2"`,
//! `"2.10"`). Sequences are arranged in a tree by their dot-separated
//! segments and flattened depth-first: a node's own members come before
//! its children, siblings are ordered by segment. Numeric segments compare
//! numerically and sort before non-numeric ones. Members sharing a sequence
//! are ordered by id, and members without a sequence come last, by id.

use std::collections::BTreeMap;

/// Something that can be placed by the sequencer
pub trait Sequenced {
    /// Tie-breaker
    fn member_id(&self) -> &str;

    /// Dewey-decimal position, if any
    fn sequence(&self) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    Number(u64),
    Text(String),
}

fn parse_sequence(sequence: &str) -> Vec<Segment> {
    sequence
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u64>() {
            Ok(n) => Segment::Number(n),
            Err(_) => Segment::Text(s.to_string()),
        })
        .collect()
}

struct SequenceNode<T> {
    members: Vec<T>,
    children: BTreeMap<Segment, SequenceNode<T>>,
}

impl<T: Sequenced> SequenceNode<T> {
    fn new() -> Self {
        Self {
            members: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    fn insert(&mut self, path: &[Segment], member: T) {
        match path.split_first() {
            None => self.members.push(member),
            Some((head, rest)) => self
                .children
                .entry(head.clone())
                .or_insert_with(SequenceNode::new)
                .insert(rest, member),
        }
    }

    fn flatten_into(mut self, out: &mut Vec<T>) {
        self.members.sort_by(|a, b| a.member_id().cmp(b.member_id()));
        out.append(&mut self.members);
        for (_, child) in self.children {
            child.flatten_into(out);
        }
    }
}

/// Sort members into layout order
pub fn sort_members<T: Sequenced>(members: Vec<T>) -> Vec<T> {
    let total = members.len();
    let mut root = SequenceNode::new();
    let mut unsequenced = Vec::new();

    for member in members {
        let path = member
            .sequence()
            .map(|s| parse_sequence(&s))
            .filter(|path| !path.is_empty());
        match path {
            Some(path) => root.insert(&path, member),
            None => unsequenced.push(member),
        }
    }

    let mut sorted = Vec::with_capacity(total);
    root.flatten_into(&mut sorted);
    unsequenced.sort_by(|a, b| a.member_id().cmp(b.member_id()));
    sorted.extend(unsequenced);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Member(&'static str, Option<&'static str>);

    impl Sequenced for Member {
        fn member_id(&self) -> &str {
            self.0
        }

        fn sequence(&self) -> Option<String> {
            self.1.map(str::to_string)
        }
    }

    fn order(members: Vec<Member>) -> Vec<&'static str> {
        sort_members(members).into_iter().map(|m| m.0).collect()
    }

    #[test]
    fn test_dewey_order() {
        let sorted = order(vec![
            Member("c", Some("2.0")),
            Member("b", Some("1.1")),
            Member("a", Some("1.0")),
        ]);
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_numeric_not_lexical() {
        let sorted = order(vec![
            Member("ten", Some("1.10")),
            Member("two", Some("1.2")),
            Member("parent", Some("1")),
        ]);
        assert_eq!(sorted, vec!["parent", "two", "ten"]);
    }

    #[test]
    fn test_numbers_before_text() {
        let sorted = order(vec![
            Member("named", Some("a")),
            Member("numbered", Some("9")),
        ]);
        assert_eq!(sorted, vec!["numbered", "named"]);
    }

    #[test]
    fn test_ties_and_unsequenced_sorted_by_id() {
        let sorted = order(vec![
            Member("zeta", None),
            Member("beta", Some("1")),
            Member("alpha", Some("1")),
            Member("gamma", None),
            Member("blank", Some(" ")),
        ]);
        assert_eq!(sorted, vec!["alpha", "beta", "blank", "gamma", "zeta"]);
    }
}
