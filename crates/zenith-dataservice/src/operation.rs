/// Protocol-agnostic operations the adapter maps onto HTTP verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    Find,
    Delete,
    Exists,
}

impl Operation {
    pub fn http_method(self) -> http::Method {
        match self {
            Operation::Save => http::Method::POST,
            Operation::Find => http::Method::GET,
            Operation::Delete => http::Method::DELETE,
            Operation::Exists => http::Method::HEAD,
        }
    }

    /// `key` is `None` for `Save`, whose target is the collection itself.
    pub fn path(self, base_path: &str, key: Option<&str>) -> String {
        match key {
            Some(key) => format!("{base_path}/{key}"),
            None => base_path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_targets_the_collection_path() {
        assert_eq!(Operation::Save.path("/api/v1/links", None), "/api/v1/links");
        assert_eq!(Operation::Save.http_method(), http::Method::POST);
    }

    #[test]
    fn find_delete_exists_target_the_keyed_path() {
        assert_eq!(Operation::Find.path("/api/v1/links", Some("abc")), "/api/v1/links/abc");
        assert_eq!(Operation::Delete.http_method(), http::Method::DELETE);
        assert_eq!(Operation::Exists.http_method(), http::Method::HEAD);
    }
}
