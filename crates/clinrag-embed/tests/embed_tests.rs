use clinrag_core::config::EmbeddingSettings;
use clinrag_core::error::Error;
use clinrag_core::traits::Embedder;
use clinrag_embed::{get_default_embedder, FakeEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { fake: true, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["Metformin dosing".to_string(), "Metformin dosing".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim follows settings");
    assert_eq!(embedder.dim(), 384);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_prefers_shared_tokens() {
    let embedder = FakeEmbedder::new(256);
    let q = embedder.embed_query("Which drug for type 2 diabetes?").expect("query");
    let related = embedder.embed_query("Metformin is first-line for type 2 diabetes.").expect("related");
    let unrelated = embedder.embed_query("Radar pulses measure Doppler shift.").expect("unrelated");
    assert!(cosine(&q, &related) > cosine(&q, &unrelated));
    assert!(cosine(&q, &related) > 0.0);
}

#[test]
fn missing_model_directory_is_not_found() {
    if std::env::var_os("APP_USE_FAKE_EMBEDDINGS").is_some() { return; }
    let settings = EmbeddingSettings { model_dir: "/nonexistent/bge-small-en-v1.5".to_string(), fake: false, ..EmbeddingSettings::default() };
    let err = get_default_embedder(&settings).err().expect("model directory is missing");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(_))), "got {err:#}");
}
