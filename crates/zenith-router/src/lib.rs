//! Per-method trie router over `/`-separated path segments. A segment
//! beginning with `:` becomes a wildcard edge capturing `name -> value`
//! into the match result. At every node, a literal edge is tried before
//! the wildcard edge, so `/users/active` is preferred over `/users/:id`
//! when both are registered.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
    Head,
    Put,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Put => "PUT",
        }
    }
}

struct Node<T> {
    literal_children: HashMap<String, Node<T>>,
    wildcard_child: Option<(String, Box<Node<T>>)>,
    handler: Option<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            literal_children: HashMap::new(),
            wildcard_child: None,
            handler: None,
        }
    }
}

pub struct Router<T> {
    roots: HashMap<Method, Node<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self { roots: HashMap::new() }
    }
}

pub struct Matched<'a, T> {
    pub handler: &'a T,
    pub params: HashMap<String, String>,
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` at `method pattern`. `pattern` segments
    /// beginning with `:` become wildcard captures, e.g. `/links/:code`.
    pub fn register(&mut self, method: Method, pattern: &str, handler: T) {
        let root = self.roots.entry(method).or_default();
        let mut node = root;
        for segment in split_path(pattern) {
            if let Some(name) = segment.strip_prefix(':') {
                let needs_new = match &node.wildcard_child {
                    Some((existing, _)) => existing != name,
                    None => true,
                };
                if needs_new {
                    node.wildcard_child = Some((name.to_string(), Box::new(Node::default())));
                }
                node = &mut node.wildcard_child.as_mut().unwrap().1;
            } else {
                node = node
                    .literal_children
                    .entry(segment.to_string())
                    .or_default();
            }
        }
        node.handler = Some(handler);
    }

    /// Matches `method path`. Returns `None` on no match (a 404 at the
    /// HTTP boundary).
    pub fn route(&self, method: Method, path: &str) -> Option<Matched<'_, T>> {
        let root = self.roots.get(&method)?;
        let segments: Vec<&str> = split_path(path).collect();
        let mut params = HashMap::new();
        let handler = match_segments(root, &segments, &mut params)?;
        Some(Matched { handler, params })
    }
}

fn match_segments<'a, T>(
    node: &'a Node<T>,
    segments: &[&str],
    params: &mut HashMap<String, String>,
) -> Option<&'a T> {
    match segments.split_first() {
        None => node.handler.as_ref(),
        Some((head, rest)) => {
            if let Some(child) = node.literal_children.get(*head) {
                if let Some(handler) = match_segments(child, rest, params) {
                    return Some(handler);
                }
            }
            if let Some((name, child)) = &node.wildcard_child {
                let mut candidate = params.clone();
                candidate.insert(name.clone(), (*head).to_string());
                if let Some(handler) = match_segments(child, rest, &mut candidate) {
                    *params = candidate;
                    return Some(handler);
                }
            }
            None
        }
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
