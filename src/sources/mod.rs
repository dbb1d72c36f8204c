//! # Sources Module
//!
//! Track references, search engines and the query dispatcher.
//!
//! A [`Track`] is the unit that travels through the queue: metadata plus an
//! optional handle that the audio node accepts. Tracks coming from the
//! catalog provider are metadata-only and must be resolved against a search
//! engine before they can be played.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serenity::model::id::UserId;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::node::NodeHandle;

/// Motores de búsqueda que entiende el despachador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    /// Búsqueda general de video
    YouTube,
    /// Búsqueda orientada a música
    YouTubeMusic,
    SoundCloud,
    /// Proveedor de catálogo: solo metadata, requiere resolución posterior
    Catalog,
}

impl SearchEngine {
    /// Prefijo que el nodo espera delante de la consulta
    pub fn prefix(&self) -> &'static str {
        match self {
            SearchEngine::YouTube => "ytsearch",
            SearchEngine::YouTubeMusic => "ytmsearch",
            SearchEngine::SoundCloud => "scsearch",
            SearchEngine::Catalog => "spsearch",
        }
    }
}

/// Clasificación del resultado que devuelve el nodo al cargar una consulta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadType {
    Track,
    Playlist,
    Search,
    Empty,
    Error,
}

/// Resultado de una búsqueda o resolución.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub load_type: LoadType,
    pub tracks: Vec<Track>,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self {
            load_type: LoadType::Empty,
            tracks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Representa un track: metadata más, opcionalmente, el handle reproducible.
///
/// Un track sin handle nunca debe llegar al nodo; primero pasa por la
/// resolución, que escribe el handle in situ.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    title: String,
    author: Option<String>,
    duration: Option<Duration>,
    #[serde(default)]
    is_stream: bool,
    /// Token opaco que el nodo acepta en `play_track`; ausente = sin resolver
    handle: Option<String>,
    uri: Option<String>,
    thumbnail: Option<String>,
    requested_by: Option<UserId>,
    #[serde(default = "Utc::now")]
    added_at: DateTime<Utc>,
}

impl Track {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
            duration: None,
            is_stream: false,
            handle: None,
            uri: None,
            thumbnail: None,
            requested_by: None,
            added_at: Utc::now(),
        }
    }

    // Getters
    pub fn title(&self) -> String {
        self.title.clone()
    }
    pub fn author(&self) -> Option<String> {
        self.author.clone()
    }
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
    pub fn is_stream(&self) -> bool {
        self.is_stream
    }
    pub fn handle(&self) -> Option<String> {
        self.handle.clone()
    }
    pub fn uri(&self) -> Option<String> {
        self.uri.clone()
    }
    pub fn thumbnail(&self) -> Option<String> {
        self.thumbnail.clone()
    }
    pub fn requested_by(&self) -> Option<UserId> {
        self.requested_by
    }
    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    /// `true` si el track ya tiene un handle que el nodo puede reproducir
    pub fn is_resolved(&self) -> bool {
        self.handle.is_some()
    }

    // Setters
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_stream(mut self, is_stream: bool) -> Self {
        self.is_stream = is_stream;
        self
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_requested_by(mut self, user_id: UserId) -> Self {
        self.requested_by = Some(user_id);
        self
    }

    /// Escribe el handle resuelto sobre el track (mutación in situ)
    pub fn set_handle(&mut self, handle: impl Into<String>) {
        self.handle = Some(handle.into());
    }
}

/// Proveedor de catálogo externo (lookup de metadata, sin audio).
///
/// Sus resultados SIEMPRE requieren resolución antes de ser reproducibles.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// ¿La URL pertenece a este proveedor?
    fn check(&self, url: &str) -> bool;

    /// Resuelve una URL del proveedor en uno o más tracks de metadata
    async fn resolve(&self, url: &str) -> AnyResult<Vec<Track>>;

    /// Busca en el catálogo del proveedor
    async fn search(&self, query: &str) -> AnyResult<Vec<Track>>;
}

/// ¿La consulta es una URL absoluta http/https?
pub(crate) fn is_http_url(query: &str) -> bool {
    Url::parse(query)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Despacha una consulta al backend que corresponde.
///
/// 1. URL absoluta: catálogo si su patrón coincide, si no el nodo tal cual.
/// 2. Motor de catálogo: búsqueda de metadata en el proveedor.
/// 3. Resto: `"{prefijo}:{consulta}"` contra el nodo.
pub(crate) async fn dispatch_search(
    node: &Arc<dyn NodeHandle>,
    catalog: Option<&Arc<dyn CatalogProvider>>,
    default_engine: SearchEngine,
    query: &str,
    engine: Option<SearchEngine>,
) -> Result<SearchResult> {
    if is_http_url(query) {
        if let Some(catalog) = catalog {
            if catalog.check(query) {
                debug!("🔗 URL de catálogo detectada: {}", query);
                let tracks = catalog.resolve(query).await?;
                let load_type = match tracks.len() {
                    0 => LoadType::Empty,
                    1 => LoadType::Track,
                    _ => LoadType::Playlist,
                };
                return Ok(SearchResult { load_type, tracks });
            }
        }
        return Ok(node.resolve(query).await?);
    }

    let engine = engine.unwrap_or(default_engine);
    if engine == SearchEngine::Catalog {
        let Some(catalog) = catalog else {
            return Err(Error::InvalidArgument(
                "Se pidió el motor de catálogo pero no hay proveedor configurado".to_string(),
            ));
        };
        let tracks = catalog.search(query).await?;
        let load_type = if tracks.is_empty() {
            LoadType::Empty
        } else {
            LoadType::Search
        };
        return Ok(SearchResult { load_type, tracks });
    }

    Ok(node.resolve(&format!("{}:{}", engine.prefix(), query)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::testing::{StubCatalog, StubNode};

    fn node_with(responses: Vec<SearchResult>) -> (Arc<StubNode>, Arc<dyn NodeHandle>) {
        let stub = Arc::new(StubNode::new("nodo-test").with_responses(responses));
        let node: Arc<dyn NodeHandle> = stub.clone();
        (stub, node)
    }

    #[test]
    fn test_http_url_detection() {
        assert!(is_http_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_http_url("http://example.com/audio.mp3"));
        assert!(!is_http_url("never gonna give you up"));
        assert!(!is_http_url("artist: song"));
        assert!(!is_http_url("spotify:track:abc123"));
    }

    #[tokio::test]
    async fn test_plain_query_gets_engine_prefix() {
        let (stub, node) = node_with(vec![SearchResult::empty()]);
        let result = dispatch_search(&node, None, SearchEngine::YouTube, "una canción", None)
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(stub.resolve_calls(), vec!["ytsearch:una canción"]);
    }

    #[tokio::test]
    async fn test_explicit_engine_overrides_default() {
        let (stub, node) = node_with(vec![SearchResult::empty()]);
        dispatch_search(
            &node,
            None,
            SearchEngine::YouTube,
            "una canción",
            Some(SearchEngine::SoundCloud),
        )
        .await
        .unwrap();

        assert_eq!(stub.resolve_calls(), vec!["scsearch:una canción"]);
    }

    #[tokio::test]
    async fn test_url_goes_to_node_verbatim() {
        let (stub, node) = node_with(vec![SearchResult::empty()]);
        dispatch_search(
            &node,
            None,
            SearchEngine::YouTube,
            "https://example.com/cancion",
            None,
        )
        .await
        .unwrap();

        assert_eq!(stub.resolve_calls(), vec!["https://example.com/cancion"]);
    }

    #[tokio::test]
    async fn test_catalog_url_routes_to_provider() {
        let (stub, node) = node_with(vec![]);
        let catalog_stub = Arc::new(StubCatalog::new(
            "https://catalogo.example",
            vec![Track::new("Canción de catálogo")],
        ));
        let catalog: Arc<dyn CatalogProvider> = catalog_stub.clone();

        let result = dispatch_search(
            &node,
            Some(&catalog),
            SearchEngine::YouTube,
            "https://catalogo.example/track/123",
            None,
        )
        .await
        .unwrap();

        assert_eq!(result.load_type, LoadType::Track);
        assert_eq!(result.tracks.len(), 1);
        assert!(!result.tracks[0].is_resolved());
        assert_eq!(
            catalog_stub.resolve_calls.lock().clone(),
            vec!["https://catalogo.example/track/123"]
        );
        assert!(stub.resolve_calls().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_engine_searches_provider() {
        let (_stub, node) = node_with(vec![]);
        let catalog_stub = Arc::new(StubCatalog::new(
            "https://catalogo.example",
            vec![Track::new("Uno"), Track::new("Dos")],
        ));
        let catalog: Arc<dyn CatalogProvider> = catalog_stub.clone();

        let result = dispatch_search(
            &node,
            Some(&catalog),
            SearchEngine::YouTube,
            "una consulta",
            Some(SearchEngine::Catalog),
        )
        .await
        .unwrap();

        assert_eq!(result.load_type, LoadType::Search);
        assert_eq!(result.tracks.len(), 2);
        assert_eq!(catalog_stub.search_calls.lock().clone(), vec!["una consulta"]);
    }

    #[tokio::test]
    async fn test_catalog_engine_without_provider_fails() {
        let (_stub, node) = node_with(vec![]);
        let result = dispatch_search(
            &node,
            None,
            SearchEngine::YouTube,
            "una consulta",
            Some(SearchEngine::Catalog),
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
