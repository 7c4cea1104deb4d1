use super::*;
use crate::retry::RetryableError;
use tempfile::TempDir;

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

mod stub_tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_is_deterministic() {
        let embedder = StubEmbedder::default();
        let input = texts(&["Apply coupon at checkout", "Track my order"]);

        let first = embedder.embed(&input).await.unwrap();
        let second = embedder.embed(&input).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|v| v.len() == STUB_EMBEDDING_DIM));
        assert_eq!(embedder.calls(), 2);
        assert_eq!(embedder.texts_embedded(), 4);
    }

    #[test]
    fn test_stub_shared_words_are_closer() {
        let embedder = StubEmbedder::new(128);
        let query = embedder.vector_for("coupon discount at checkout");
        let near = embedder.vector_for("checkout ignores the coupon discount");
        let far = embedder.vector_for("profile avatar upload");

        assert!(l2(&query, &near) < l2(&query, &far));
    }

    #[test]
    fn test_stub_handles_text_without_words() {
        let embedder = StubEmbedder::new(8);
        let a = embedder.vector_for("!!!");
        let b = embedder.vector_for("???");
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }

    #[test]
    fn test_stub_zero_dim_is_raised() {
        let embedder = StubEmbedder::new(0);
        assert_eq!(embedder.dim(), 1);
        assert_eq!(embedder.vector_for("coupon").len(), 1);
        assert_eq!(embedder.vector_for("...").len(), 1);
    }

    #[tokio::test]
    async fn test_stub_pinned_vectors() {
        let embedder = StubEmbedder::new(2).with_vector("origin", vec![0.0, 0.0]);
        let out = embedder.embed(&texts(&["origin"])).await.unwrap();
        assert_eq!(out, vec![vec![0.0, 0.0]]);
    }

    #[tokio::test]
    async fn test_stub_scripted_failures() {
        let embedder = StubEmbedder::default()
            .failing_on("poison")
            .with_transient_failures(1);

        let err = embedder.embed(&texts(&["fine"])).await.unwrap_err();
        assert!(err.is_transient());

        assert!(embedder.embed(&texts(&["fine"])).await.is_ok());

        let err = embedder
            .embed(&texts(&["fine", "poison pill"]))
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }
}

mod error_tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transient_classification() {
        assert!(EmbeddingError::RateLimited.is_transient());
        assert!(
            EmbeddingError::Status {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !EmbeddingError::Status {
                status: 400,
                body: String::new()
            }
            .is_transient()
        );
        assert!(!EmbeddingError::Unauthorized { status: 401 }.is_transient());
        assert!(EmbeddingError::timed_out(Duration::from_secs(1)).is_transient());
    }

    #[test]
    fn test_check_batch_contract() {
        assert!(check_batch(2, &[vec![1.0], vec![2.0]]).is_ok());
        assert!(check_batch(0, &[]).is_ok());

        assert!(matches!(
            check_batch(3, &[vec![1.0]]),
            Err(EmbeddingError::CountMismatch {
                expected: 3,
                actual: 1
            })
        ));
        assert!(matches!(
            check_batch(2, &[vec![1.0], vec![1.0, 2.0]]),
            Err(EmbeddingError::InvalidResponse { .. })
        ));
        assert!(matches!(
            check_batch(1, &[vec![]]),
            Err(EmbeddingError::InvalidResponse { .. })
        ));
    }
}

mod cache_tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty_cache() {
        let dir = TempDir::new().unwrap();
        let (cache, stats) =
            EmbeddingCache::load(&dir.path().join("none.rkyv"), "model-a").unwrap();

        assert!(cache.is_empty());
        assert_eq!(stats, CacheLoadStats::default());
    }

    #[test]
    fn test_save_then_load_same_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("embeddings.rkyv");

        let mut cache = EmbeddingCache::new("model-a");
        cache.insert("Wishlist sync", vec![0.1, 0.2, 0.3]);
        cache.insert("Order tracking", vec![0.4, 0.5, 0.6]);
        assert!(cache.is_dirty());
        cache.save(&path).unwrap();

        let (loaded, stats) = EmbeddingCache::load(&path, "model-a").unwrap();
        assert_eq!(stats.loaded, 2);
        assert_eq!(stats.stale, 0);
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.get("Wishlist sync"), Some(&[0.1, 0.2, 0.3][..]));
        assert_eq!(loaded.get("wishlist sync"), None);
    }

    #[test]
    fn test_other_model_entries_are_stale() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embeddings.rkyv");

        let mut cache = EmbeddingCache::new("model-a");
        cache.insert("Cart", vec![1.0]);
        cache.save(&path).unwrap();

        let (loaded, stats) = EmbeddingCache::load(&path, "model-b").unwrap();
        assert!(loaded.is_empty());
        assert_eq!(stats.stale, 1);
        assert_eq!(loaded.model_id(), "model-b");
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embeddings.rkyv");

        let mut cache = EmbeddingCache::new("model-a");
        cache.insert("Cart", vec![1.0]);
        cache.save(&path).unwrap();
        cache.insert("Checkout", vec![2.0]);
        cache.save(&path).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["embeddings.rkyv".to_string()]);

        let (loaded, _) = EmbeddingCache::load(&path, "model-a").unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embeddings.rkyv");
        std::fs::write(&path, b"definitely not rkyv").unwrap();

        let err = EmbeddingCache::load(&path, "model-a").unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));

    }

    #[test]
    fn test_concurrent_saves_to_one_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embeddings.rkyv");

        let mut small = EmbeddingCache::new("model-a");
        small.insert("Cart", vec![1.0]);
        let mut large = EmbeddingCache::new("model-a");
        large.insert("Cart", vec![1.0]);
        large.insert("Checkout", vec![2.0]);

        std::thread::scope(|s| {
            for cache in [&small, &large] {
                let path = &path;
                s.spawn(move || {
                    for _ in 0..20 {
                        cache.save(path).unwrap();
                    }
                });
            }
        });

        let (loaded, _) = EmbeddingCache::load(&path, "model-a").unwrap();
        assert!(loaded.len() == 1 || loaded.len() == 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_empty_file_loads_as_empty_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embeddings.rkyv");
        std::fs::write(&path, b"").unwrap();

        let (cache, stats) = EmbeddingCache::load(&path, "model-a").unwrap();
        assert!(cache.is_empty());
        assert_eq!(stats, CacheLoadStats::default());
    }
}
