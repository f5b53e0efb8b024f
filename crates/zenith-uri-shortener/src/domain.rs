//! The URI-shortening domain itself: code generation, validation, and an
//! in-memory store. Named out of scope by the substrate this binary wires
//! together — kept intentionally thin, with only as much behavior as the
//! HTTP API surface in front of it needs.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::Rng;
use serde::Serialize;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const CODE_LENGTH: usize = 7;

#[derive(Clone, Debug, Serialize)]
pub struct LinkRecord {
    pub short_code: String,
    pub original_url: String,
}

pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }
}

pub trait LinkRepository: Send + Sync {
    fn save(&self, url: String) -> LinkRecord;
    fn find(&self, code: &str) -> Option<LinkRecord>;
    fn delete(&self, code: &str) -> bool;
}

pub struct InMemoryLinkRepository {
    generator: Box<dyn CodeGenerator>,
    links: Mutex<HashMap<String, LinkRecord>>,
}

impl InMemoryLinkRepository {
    pub fn new(generator: Box<dyn CodeGenerator>) -> Self {
        Self { generator, links: Mutex::new(HashMap::new()) }
    }
}

impl LinkRepository for InMemoryLinkRepository {
    fn save(&self, url: String) -> LinkRecord {
        let mut links = self.links.lock().unwrap();
        let code = loop {
            let candidate = self.generator.generate();
            if !links.contains_key(&candidate) {
                break candidate;
            }
        };
        let record = LinkRecord { short_code: code.clone(), original_url: url };
        links.insert(code, record.clone());
        record
    }

    fn find(&self, code: &str) -> Option<LinkRecord> {
        self.links.lock().unwrap().get(code).cloned()
    }

    fn delete(&self, code: &str) -> bool {
        self.links.lock().unwrap().remove(code).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_find_round_trips_the_url() {
        let repo = InMemoryLinkRepository::new(Box::new(RandomCodeGenerator));
        let record = repo.save("https://example.com".to_string());
        let found = repo.find(&record.short_code).unwrap();
        assert_eq!(found.original_url, "https://example.com");
    }

    #[test]
    fn delete_removes_the_record() {
        let repo = InMemoryLinkRepository::new(Box::new(RandomCodeGenerator));
        let record = repo.save("https://example.com".to_string());
        assert!(repo.delete(&record.short_code));
        assert!(repo.find(&record.short_code).is_none());
        assert!(!repo.delete(&record.short_code));
    }
}
