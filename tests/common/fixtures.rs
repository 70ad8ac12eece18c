// Test fixtures and workload generators for integration tests

use orbital_cdn::types::{ContentItem, ContentType};
use orbital_cdn::InMemoryCatalog;
use rand::distributions::WeightedIndex;
use rand::prelude::*;

/// The four-item catalog used by the end-to-end scenarios:
/// `a` 10 MB, `b` 5 MB, `c` 8 MB, `d` 2 MB.
pub fn scenario_catalog() -> InMemoryCatalog {
    InMemoryCatalog::from_items([
        ContentItem::new("a", ContentType::Video, 10.0).with_popularity(0.9),
        ContentItem::new("b", ContentType::Audio, 5.0).with_popularity(0.5),
        ContentItem::new("c", ContentType::Document, 8.0).with_popularity(0.3),
        ContentItem::new("d", ContentType::Image, 2.0).with_popularity(0.1),
    ])
}

/// Deterministic random data generator for reproducible tests
pub struct TestDataGenerator {
    rng: StdRng,
}

impl TestDataGenerator {
    /// Creates a new generator with a fixed seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Builds a catalog of `count` items named `item-0..item-{count-1}` with
    /// random types, sizes and popularity.
    pub fn catalog(&mut self, count: usize) -> InMemoryCatalog {
        const TYPES: [ContentType; 6] = [
            ContentType::Video,
            ContentType::Audio,
            ContentType::Image,
            ContentType::Document,
            ContentType::Application,
            ContentType::Game,
        ];

        let items: Vec<_> = (0..count)
            .map(|i| {
                let content_type = TYPES[self.rng.gen_range(0..TYPES.len())];
                ContentItem::new(
                    format!("item-{}", i),
                    content_type,
                    self.rng.gen_range(0.5..500.0),
                )
                .with_popularity(self.rng.gen_range(0.05..1.0))
            })
            .collect();
        InMemoryCatalog::from_items(items)
    }

    /// Draws `len` content ids from the catalog, weighted by popularity.
    pub fn request_sequence(&mut self, catalog: &InMemoryCatalog, len: usize) -> Vec<String> {
        let weights = WeightedIndex::new(catalog.items().iter().map(|item| item.popularity))
            .expect("catalog must have positive popularity");
        (0..len)
            .map(|_| catalog.items()[weights.sample(&mut self.rng)].content_id.clone())
            .collect()
    }

    /// Draws `len` ids, of which roughly `unknown_share` are not in the catalog.
    pub fn noisy_sequence(
        &mut self,
        catalog: &InMemoryCatalog,
        len: usize,
        unknown_share: f64,
    ) -> Vec<String> {
        self.request_sequence(catalog, len)
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                if self.rng.gen_bool(unknown_share) {
                    format!("missing-{}", i)
                } else {
                    id
                }
            })
            .collect()
    }

    /// A user name out of `count` users.
    pub fn user(&mut self, count: usize) -> String {
        format!("user_{}", self.rng.gen_range(1..=count))
    }
}

impl Default for TestDataGenerator {
    fn default() -> Self {
        Self::new(42)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_deterministic() {
        let catalog = scenario_catalog();
        let first = TestDataGenerator::new(5).request_sequence(&catalog, 20);
        let second = TestDataGenerator::new(5).request_sequence(&catalog, 20);
        assert_eq!(first, second);
    }

    #[test]
    fn test_generated_catalog() {
        let catalog = TestDataGenerator::default().catalog(25);
        assert_eq!(catalog.len(), 25);
        assert!(catalog.items().iter().all(|item| item.size_mb > 0.0));
    }
}
