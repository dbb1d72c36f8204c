//! # Node Module
//!
//! Interfaces estrechas hacia el cliente de nodos de audio.
//!
//! El protocolo de streaming, la señalización de voz y el balanceo real del
//! pool viven fuera de esta crate; aquí solo se modela lo que la capa de
//! sesiones consume: elegir un nodo, unirse a un canal, mandar comandos de
//! reproducción y recibir los eventos del ciclo de vida.

use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde_json::Value;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::sources::SearchResult;

/// Parámetros para unirse a un canal de voz a través de un nodo.
#[derive(Debug, Clone)]
pub struct JoinOptions {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub shard_id: u32,
    pub deafened: bool,
}

/// Eventos de ciclo de vida que emite la sesión de un nodo.
///
/// Los payloads crudos viajan como `serde_json::Value`: la capa de sesiones
/// los reenvía hacia arriba sin interpretarlos.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    TrackStart,
    TrackEnd,
    Closed(Value),
    TrackException(Value),
    PlayerUpdate(Value),
    TrackStuck(Value),
    Resumed,
}

/// Canal por el que llegan los eventos de una sesión de nodo.
pub type NodeEvents = UnboundedReceiver<NodeEvent>;

/// Pool de nodos conocidos.
pub trait NodePool: Send + Sync {
    /// Todos los nodos conocidos (online u offline)
    fn nodes(&self) -> Vec<Arc<dyn NodeHandle>>;

    /// La selección por defecto del pool, si hay alguna disponible
    fn get_node(&self) -> Option<Arc<dyn NodeHandle>>;
}

/// Un nodo de audio concreto.
#[async_trait]
pub trait NodeHandle: Send + Sync {
    fn name(&self) -> &str;

    fn is_online(&self) -> bool;

    /// Cantidad de sesiones que este nodo atiende ahora mismo
    fn session_count(&self) -> usize;

    /// Une el bot al canal de voz y devuelve la sesión más su flujo de eventos
    async fn join_channel(
        &self,
        options: &JoinOptions,
    ) -> AnyResult<(Box<dyn NodeSession>, NodeEvents)>;

    /// Resuelve una consulta (URL o `"prefijo:términos"`) contra el nodo
    async fn resolve(&self, query: &str) -> AnyResult<SearchResult>;
}

/// Sesión viva de un guild sobre un nodo.
#[async_trait]
pub trait NodeSession: Send + Sync {
    async fn play_track(&self, handle: &str) -> AnyResult<()>;

    async fn stop_track(&self) -> AnyResult<()>;

    async fn set_paused(&self, paused: bool) -> AnyResult<()>;

    /// Volumen como fracción 0.0-1.0
    async fn set_volume(&self, volume: f32) -> AnyResult<()>;

    async fn seek_to(&self, position_ms: u64) -> AnyResult<()>;

    /// Corta la conexión de voz de esta sesión
    async fn disconnect(&self) -> AnyResult<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Stubs de nodo con registro de llamadas para los tests.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use tokio::sync::mpsc::{self, UnboundedSender};

    use super::*;
    use crate::sources::{CatalogProvider, Track};

    /// Registro compartido de las llamadas que recibe una sesión stub.
    #[derive(Default)]
    pub(crate) struct SessionLog {
        pub play_calls: Mutex<Vec<String>>,
        pub stop_calls: AtomicUsize,
        pub pause_calls: Mutex<Vec<bool>>,
        pub volume_calls: Mutex<Vec<f32>>,
        pub seek_calls: Mutex<Vec<u64>>,
        pub disconnect_calls: AtomicUsize,
    }

    pub(crate) struct StubSession {
        log: Arc<SessionLog>,
    }

    #[async_trait]
    impl NodeSession for StubSession {
        async fn play_track(&self, handle: &str) -> AnyResult<()> {
            self.log.play_calls.lock().push(handle.to_string());
            Ok(())
        }

        async fn stop_track(&self) -> AnyResult<()> {
            self.log.stop_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn set_paused(&self, paused: bool) -> AnyResult<()> {
            self.log.pause_calls.lock().push(paused);
            Ok(())
        }

        async fn set_volume(&self, volume: f32) -> AnyResult<()> {
            self.log.volume_calls.lock().push(volume);
            Ok(())
        }

        async fn seek_to(&self, position_ms: u64) -> AnyResult<()> {
            self.log.seek_calls.lock().push(position_ms);
            Ok(())
        }

        async fn disconnect(&self) -> AnyResult<()> {
            self.log.disconnect_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Nodo stub: respuestas de resolución guionadas y sesión con registro.
    pub(crate) struct StubNode {
        name: String,
        online: AtomicBool,
        sessions: AtomicUsize,
        responses: Mutex<VecDeque<SearchResult>>,
        resolve_calls: Mutex<Vec<String>>,
        session_log: Arc<SessionLog>,
        event_tx: Mutex<Option<UnboundedSender<NodeEvent>>>,
    }

    impl StubNode {
        pub(crate) fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                online: AtomicBool::new(true),
                sessions: AtomicUsize::new(0),
                responses: Mutex::new(VecDeque::new()),
                resolve_calls: Mutex::new(Vec::new()),
                session_log: Arc::new(SessionLog::default()),
                event_tx: Mutex::new(None),
            }
        }

        pub(crate) fn with_responses(self, responses: Vec<SearchResult>) -> Self {
            *self.responses.lock() = responses.into();
            self
        }

        pub(crate) fn with_sessions(self, count: usize) -> Self {
            self.sessions.store(count, Ordering::SeqCst);
            self
        }

        pub(crate) fn with_online(self, online: bool) -> Self {
            self.online.store(online, Ordering::SeqCst);
            self
        }

        pub(crate) fn resolve_calls(&self) -> Vec<String> {
            self.resolve_calls.lock().clone()
        }

        pub(crate) fn session_log(&self) -> Arc<SessionLog> {
            Arc::clone(&self.session_log)
        }

        /// Emisor del canal de eventos entregado en el último `join_channel`
        pub(crate) fn event_sender(&self) -> Option<UnboundedSender<NodeEvent>> {
            self.event_tx.lock().clone()
        }
    }

    #[async_trait]
    impl NodeHandle for StubNode {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_online(&self) -> bool {
            self.online.load(Ordering::SeqCst)
        }

        fn session_count(&self) -> usize {
            self.sessions.load(Ordering::SeqCst)
        }

        async fn join_channel(
            &self,
            _options: &JoinOptions,
        ) -> AnyResult<(Box<dyn NodeSession>, NodeEvents)> {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.event_tx.lock() = Some(tx);
            let session = StubSession {
                log: Arc::clone(&self.session_log),
            };
            Ok((Box::new(session), rx))
        }

        async fn resolve(&self, query: &str) -> AnyResult<SearchResult> {
            self.resolve_calls.lock().push(query.to_string());
            let response = self.responses.lock().pop_front();
            Ok(response.unwrap_or_else(SearchResult::empty))
        }
    }

    /// Pool stub construido sobre una lista fija de nodos.
    pub(crate) struct StubPool {
        nodes: Vec<Arc<StubNode>>,
    }

    impl StubPool {
        pub(crate) fn new(nodes: Vec<Arc<StubNode>>) -> Self {
            Self { nodes }
        }
    }

    impl NodePool for StubPool {
        fn nodes(&self) -> Vec<Arc<dyn NodeHandle>> {
            self.nodes
                .iter()
                .map(|node| Arc::clone(node) as Arc<dyn NodeHandle>)
                .collect()
        }

        fn get_node(&self) -> Option<Arc<dyn NodeHandle>> {
            self.nodes
                .iter()
                .find(|node| node.is_online())
                .map(|node| Arc::clone(node) as Arc<dyn NodeHandle>)
        }
    }

    /// Proveedor de catálogo stub: reconoce URLs por prefijo.
    pub(crate) struct StubCatalog {
        url_prefix: String,
        results: Vec<Track>,
        pub resolve_calls: Mutex<Vec<String>>,
        pub search_calls: Mutex<Vec<String>>,
    }

    impl StubCatalog {
        pub(crate) fn new(url_prefix: impl Into<String>, results: Vec<Track>) -> Self {
            Self {
                url_prefix: url_prefix.into(),
                results,
                resolve_calls: Mutex::new(Vec::new()),
                search_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CatalogProvider for StubCatalog {
        fn check(&self, url: &str) -> bool {
            url.starts_with(&self.url_prefix)
        }

        async fn resolve(&self, url: &str) -> AnyResult<Vec<Track>> {
            self.resolve_calls.lock().push(url.to_string());
            Ok(self.results.clone())
        }

        async fn search(&self, query: &str) -> AnyResult<Vec<Track>> {
            self.search_calls.lock().push(query.to_string());
            Ok(self.results.clone())
        }
    }
}
