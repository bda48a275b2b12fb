use std::path::{Path, PathBuf};

use crate::{SemanticConfig, SemanticError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ModelAssets {
    pub(crate) model_path: PathBuf,
    pub(crate) tokenizer_path: PathBuf,
}

/// Ensures that the model and tokenizer exist locally, downloading them when allowed.
pub(crate) async fn resolve_model_assets(
    cfg: &SemanticConfig,
) -> Result<ModelAssets, SemanticError> {
    let model_target = cfg.resolved_model_path();
    let model_url = (!cfg.offline).then(|| cfg.resolved_model_url());
    let model_path = ensure_local_file(&model_target, model_url.as_deref(), || {
        SemanticError::ModelNotFound(model_target.display().to_string())
    })
    .await?;

    let tokenizer_target = cfg.resolved_tokenizer_path();
    let tokenizer_url = (!cfg.offline).then(|| cfg.resolved_tokenizer_url());
    let tokenizer_path = ensure_local_file(&tokenizer_target, tokenizer_url.as_deref(), || {
        SemanticError::TokenizerMissing(tokenizer_target.display().to_string())
    })
    .await?;

    Ok(ModelAssets {
        model_path,
        tokenizer_path,
    })
}

/// Returns `target` if it already exists, otherwise attempts to download `remote_url`.
async fn ensure_local_file<F>(
    target: &Path,
    remote_url: Option<&str>,
    on_missing: F,
) -> Result<PathBuf, SemanticError>
where
    F: FnOnce() -> SemanticError,
{
    if target.exists() {
        tracing::debug!(path = %target.display(), "using cached model asset");
        return Ok(target.to_path_buf());
    }

    if let Some(url) = remote_url {
        download_to_path(target, url).await?;
        return Ok(target.to_path_buf());
    }

    Err(on_missing())
}

/// Downloads `url` into `target`, creating parent directories as needed.
async fn download_to_path(target: &Path, url: &str) -> Result<(), SemanticError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tracing::info!(%url, path = %target.display(), "downloading model asset");

    let response = reqwest::get(url)
        .await
        .map_err(|e| SemanticError::Download(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SemanticError::Download(format!(
            "unexpected status {status} while fetching {url}"
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SemanticError::Download(e.to_string()))?;

    // Stage next to the target so an interrupted write never looks like a cached asset.
    let partial = target.with_extension("part");
    tokio::fs::write(&partial, &bytes).await?;
    tokio::fs::rename(&partial, target).await?;
    tracing::info!(bytes = bytes.len(), path = %target.display(), "model asset stored");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_cfg(dir: &Path) -> SemanticConfig {
        SemanticConfig {
            cache_dir: dir.to_path_buf(),
            offline: true,
            ..SemanticConfig::default()
        }
    }

    #[tokio::test]
    async fn existing_files_are_used_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = offline_cfg(dir.path());
        let model = cfg.resolved_model_path();
        let tokenizer = cfg.resolved_tokenizer_path();
        std::fs::create_dir_all(model.parent().unwrap()).unwrap();
        std::fs::write(&model, b"onnx").unwrap();
        std::fs::write(&tokenizer, b"{}").unwrap();

        let assets = resolve_model_assets(&cfg).await.unwrap();
        assert_eq!(assets.model_path, model);
        assert_eq!(assets.tokenizer_path, tokenizer);
    }

    #[tokio::test]
    async fn missing_model_offline_is_model_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = offline_cfg(dir.path());

        let err = resolve_model_assets(&cfg).await.unwrap_err();
        assert!(matches!(err, SemanticError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn missing_tokenizer_offline_is_tokenizer_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = offline_cfg(dir.path());
        let model = cfg.resolved_model_path();
        std::fs::create_dir_all(model.parent().unwrap()).unwrap();
        std::fs::write(&model, b"onnx").unwrap();

        let err = resolve_model_assets(&cfg).await.unwrap_err();
        assert!(matches!(err, SemanticError::TokenizerMissing(_)));
    }

    /// Serves one canned HTTP response on loopback and returns its URL.
    fn serve_once(response: &'static str) -> String {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = stream.write_all(response.as_bytes());
        });
        format!("http://{addr}/model.onnx")
    }

    #[tokio::test]
    async fn non_success_status_is_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("onnx").join("model.onnx");
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );

        let err = ensure_local_file(&target, Some(&url), || {
            SemanticError::ModelNotFound("unused".into())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, SemanticError::Download(ref m) if m.contains("404")));
        assert!(!target.exists());
        assert!(!target.with_extension("part").exists());
    }

    #[tokio::test]
    async fn downloaded_file_lands_at_target_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("tokenizer.json");
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
        );

        let path = ensure_local_file(&target, Some(&url), || {
            SemanticError::TokenizerMissing("unused".into())
        })
        .await
        .unwrap();

        assert_eq!(path, target);
        assert_eq!(std::fs::read(&target).unwrap(), b"{}");
        assert!(!target.with_extension("part").exists());
    }

    #[tokio::test]
    async fn unreachable_url_is_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("model.onnx");

        // Port 9 (discard) on loopback refuses connections without touching the network.
        let err = ensure_local_file(&target, Some("http://127.0.0.1:9/model.onnx"), || {
            SemanticError::ModelNotFound("unused".into())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, SemanticError::Download(_)));
        assert!(!target.exists());
    }
}
