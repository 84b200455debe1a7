// src/tree.rs

//! Reassembles a comment forest from the two flat result sets the
//! repository returns: one page of roots and every reply under them.

use std::collections::HashMap;

use crate::models::comment::{Comment, DepthLimit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
    Root(usize),
    Reply(usize),
}

/// Attaches `replies` under `roots` in place.
///
/// * A reply whose `parent_id` resolves to neither a root nor another reply is dropped.
/// * A reply is kept only if `reply.level - root.level <= max_depth`, measured
///   against the root it hangs under. `max_depth <= 0` keeps every depth.
/// * Dropping a reply drops everything below it.
/// * Siblings keep the order they had in `replies`.
///
/// Runs in O(roots + replies) with an explicit stack, so nesting depth never
/// touches the call stack.
pub fn build_tree(roots: &mut [Comment], replies: Vec<Comment>, max_depth: i32) {
    let limit = DepthLimit::from(max_depth);

    let mut index: HashMap<i64, Node> = HashMap::with_capacity(roots.len() + replies.len());
    for (i, root) in roots.iter().enumerate() {
        index.insert(root.id, Node::Root(i));
    }
    for (i, reply) in replies.iter().enumerate() {
        index.entry(reply.id).or_insert(Node::Reply(i));
    }

    let mut children: HashMap<Node, Vec<usize>> = HashMap::new();
    for (i, reply) in replies.iter().enumerate() {
        match index.get(&reply.parent_id) {
            Some(&parent) if parent != Node::Reply(i) => {
                children.entry(parent).or_default().push(i);
            }
            // orphan
            _ => {}
        }
    }

    // Pre-order walk from every root, keeping only replies within the limit.
    let mut accepted = vec![false; replies.len()];
    let mut order: Vec<usize> = Vec::with_capacity(replies.len());
    let mut stack: Vec<usize> = Vec::new();
    for (r, root) in roots.iter().enumerate() {
        stack.extend(children.get(&Node::Root(r)).into_iter().flatten().rev());
        while let Some(i) = stack.pop() {
            if !limit.allows(replies[i].level - root.level) {
                continue;
            }
            accepted[i] = true;
            order.push(i);
            stack.extend(children.get(&Node::Reply(i)).into_iter().flatten().rev());
        }
    }

    // Reverse pre-order completes every child before its parent is moved.
    let mut slots: Vec<Option<Comment>> = replies.into_iter().map(Some).collect();
    let take_children = |slots: &mut Vec<Option<Comment>>, node: Node| -> Vec<Comment> {
        children
            .get(&node)
            .into_iter()
            .flatten()
            .filter(|&&k| accepted[k])
            .filter_map(|&k| slots[k].take())
            .collect()
    };

    for &i in order.iter().rev() {
        let kids = take_children(&mut slots, Node::Reply(i));
        if let Some(reply) = slots[i].as_mut() {
            reply.replies.extend(kids);
        }
    }
    for (r, root) in roots.iter_mut().enumerate() {
        root.replies.extend(take_children(&mut slots, Node::Root(r)));
    }
}
