mod import;

pub use import::parse_gltf;

use crate::controller::CancellationToken;
use crate::scene::Model;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read model at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse glTF: {0}")]
    ParseGltf(#[from] gltf::Error),
    #[error("glTF requires unsupported extension {0}")]
    UnsupportedExtension(String),
    #[error("glTF document has no scene")]
    NoScene,
    #[error("model load was cancelled")]
    Cancelled,
    #[error("model loader stopped without a result")]
    LoaderDisconnected,
}

/// Fetches raw model bytes from somewhere.
pub trait AssetSource: Send + Sync {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, AssetError>;

    /// Directory external buffers are resolved against, if any.
    fn base_dir(&self, _location: &str) -> Option<PathBuf> {
        None
    }
}

pub struct HttpSource;

impl AssetSource for HttpSource {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, AssetError> {
        log::info!("Fetching model from {location}");
        let response = ureq::get(location)
            .call()
            .map_err(|source| AssetError::Fetch {
                url: location.to_string(),
                source: Box::new(source),
            })?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|source| AssetError::Body {
                url: location.to_string(),
                source,
            })?;
        log::debug!("Fetched {} bytes from {location}", bytes.len());
        Ok(bytes)
    }
}

pub struct FileSource;

impl FileSource {
    /// Relative paths that don't exist from the working directory are tried
    /// against the crate root, so `cargo run` finds bundled assets.
    fn resolve(location: &str) -> PathBuf {
        let path = PathBuf::from(location);
        if path.is_absolute() || path.exists() {
            return path;
        }
        let manifest_relative = Path::new(env!("CARGO_MANIFEST_DIR")).join(&path);
        if manifest_relative.exists() {
            manifest_relative
        } else {
            path
        }
    }
}

impl AssetSource for FileSource {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, AssetError> {
        let path = Self::resolve(location);
        std::fs::read(&path).map_err(|source| AssetError::Read {
            path: path.display().to_string(),
            source,
        })
    }

    fn base_dir(&self, location: &str) -> Option<PathBuf> {
        Self::resolve(location).parent().map(Path::to_path_buf)
    }
}

pub fn is_remote(location: &str) -> bool {
    let lower = location.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

pub fn source_for(location: &str) -> Arc<dyn AssetSource> {
    if is_remote(location) {
        Arc::new(HttpSource)
    } else {
        Arc::new(FileSource)
    }
}

pub type LoadOutcome = Result<Model, AssetError>;

/// The producing half of a pending load. Resolving consumes it, so a load
/// settles at most once.
pub struct LoadResolver {
    sender: mpsc::Sender<LoadOutcome>,
    token: CancellationToken,
}

impl LoadResolver {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn resolve(self, outcome: LoadOutcome) {
        // The receiver is gone once the controller has detached.
        if self.sender.send(outcome).is_err() {
            log::debug!("Model load resolved after its receiver was dropped");
        }
    }
}

/// A model load in flight, polled from the frame loop.
pub struct PendingLoad {
    location: String,
    receiver: Option<mpsc::Receiver<LoadOutcome>>,
    token: CancellationToken,
}

impl PendingLoad {
    pub fn channel(location: &str) -> (LoadResolver, PendingLoad) {
        let (sender, receiver) = mpsc::channel();
        let token = CancellationToken::new();
        let resolver = LoadResolver {
            sender,
            token: token.clone(),
        };
        let pending = PendingLoad {
            location: location.to_string(),
            receiver: Some(receiver),
            token,
        };
        (resolver, pending)
    }

    /// Fetch and parse on a background thread.
    pub fn spawn(source: Arc<dyn AssetSource>, location: &str) -> PendingLoad {
        let (resolver, pending) = Self::channel(location);
        let location = location.to_string();
        let spawned = std::thread::Builder::new()
            .name("model-loader".to_string())
            .spawn(move || {
                let outcome = load_blocking(source.as_ref(), &location, &resolver);
                resolver.resolve(outcome);
            });
        if let Err(err) = spawned {
            // The resolver went down with the closure; poll reports the disconnect.
            log::error!("Failed to start model loader thread: {err}");
        }
        pending
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// `Some` exactly once: when the load has finished or its producer is gone.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let receiver = self.receiver.as_ref()?;
        match receiver.try_recv() {
            Ok(outcome) => {
                self.receiver = None;
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.receiver = None;
                Some(Err(AssetError::LoaderDisconnected))
            }
        }
    }
}

fn load_blocking(source: &dyn AssetSource, location: &str, resolver: &LoadResolver) -> LoadOutcome {
    if resolver.is_cancelled() {
        return Err(AssetError::Cancelled);
    }
    let bytes = source.fetch(location)?;
    if resolver.is_cancelled() {
        return Err(AssetError::Cancelled);
    }
    let base = source.base_dir(location);
    parse_gltf(&bytes, base.as_deref())
}
