use sentvec::{read_embeddings, run, EncoderMode, SentvecConfig};

#[tokio::test]
async fn two_runs_produce_bit_identical_vectors() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = SentvecConfig::default();
    cfg.model.mode = EncoderMode::Fast;

    cfg.output.path = dir.path().join("first.json");
    run(&cfg).await.unwrap();
    cfg.output.path = dir.path().join("second.json");
    run(&cfg).await.unwrap();

    let first = read_embeddings(&dir.path().join("first.json")).unwrap();
    let second = read_embeddings(&dir.path().join("second.json")).unwrap();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.id, b.id);
        let a_bits: Vec<u32> = a.vector.iter().map(|x| x.to_bits()).collect();
        let b_bits: Vec<u32> = b.vector.iter().map(|x| x.to_bits()).collect();
        assert_eq!(a_bits, b_bits);
    }
}

#[tokio::test]
async fn distinct_sentences_get_distinct_vectors() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = SentvecConfig::default();
    cfg.model.mode = EncoderMode::Fast;
    cfg.output.path = dir.path().join("embeddings.json");
    run(&cfg).await.unwrap();

    let records = read_embeddings(&cfg.output.path).unwrap();
    assert_ne!(records[0].vector, records[1].vector);
    assert_ne!(records[1].vector, records[2].vector);
}

#[tokio::test]
#[ignore = "downloads paraphrase-MiniLM-L6-v2 from the Hugging Face Hub"]
async fn real_model_is_deterministic_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = SentvecConfig::default();
    cfg.model.cache_dir = dir.path().join("models");

    cfg.output.path = dir.path().join("first.json");
    run(&cfg).await.unwrap();
    cfg.output.path = dir.path().join("second.json");
    run(&cfg).await.unwrap();

    let first = read_embeddings(&dir.path().join("first.json")).unwrap();
    let second = read_embeddings(&dir.path().join("second.json")).unwrap();
    assert_eq!(first, second);
}
