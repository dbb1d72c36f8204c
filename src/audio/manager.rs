use std::sync::Arc;

use dashmap::DashMap;
use serenity::model::id::GuildId;
use tracing::{debug, info};

use crate::audio::player::{Player, PlayerParams};
use crate::config::{CreatePlayerOptions, ManagerConfig};
use crate::error::{Error, Result};
use crate::events::{EventBus, EventKind, PlayerEvent};
use crate::node::{JoinOptions, NodeHandle, NodePool};
use crate::sources::{self, CatalogProvider, SearchEngine, SearchResult};

/// Estado compartido del manager; los players lo referencian con un `Weak`.
pub(crate) struct ManagerInner {
    pool: Arc<dyn NodePool>,
    catalog: Option<Arc<dyn CatalogProvider>>,
    config: ManagerConfig,
    pub(crate) players: DashMap<GuildId, Arc<Player>>,
    pub(crate) bus: EventBus,
}

/// Registro de sesiones: un player vivo por guild.
///
/// Crea, busca y destruye players, elige el nodo que los respalda, despacha
/// las búsquedas al backend correcto y reparte los eventos de los players a
/// los suscriptores. Es el único publicador del bus de eventos.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

impl SessionManager {
    /// Construye el manager validando la configuración.
    ///
    /// Una configuración inválida falla aquí mismo; nunca se construye un
    /// manager a medias.
    pub fn new(
        pool: Arc<dyn NodePool>,
        catalog: Option<Arc<dyn CatalogProvider>>,
        config: ManagerConfig,
    ) -> Result<Self> {
        config.validate()?;
        info!("🎛️ Manager de sesiones inicializado");
        Ok(Self {
            inner: Arc::new(ManagerInner {
                pool,
                catalog,
                config,
                players: DashMap::new(),
                bus: EventBus::new(),
            }),
        })
    }

    /// Registra un handler para un tipo de evento
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Arc<Player>, &PlayerEvent) + Send + Sync + 'static,
    {
        self.inner.bus.on(kind, handler);
    }

    /// Player registrado para el guild, si existe
    pub fn get_player(&self, guild_id: GuildId) -> Option<Arc<Player>> {
        self.inner
            .players
            .get(&guild_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Cantidad de players vivos
    pub fn player_count(&self) -> usize {
        self.inner.players.len()
    }

    /// Crea el player de un guild, o devuelve el existente.
    ///
    /// Idempotente: la segunda llamada para el mismo guild devuelve la misma
    /// instancia y no vuelve a emitir `PlayerCreate`.
    pub async fn create_player(&self, options: CreatePlayerOptions) -> Result<Arc<Player>> {
        if let Some(existing) = self.get_player(options.guild_id) {
            debug!("♻️ Player ya existente para guild {}", options.guild_id);
            return Ok(existing);
        }

        let volume = options.volume.unwrap_or(self.inner.config.default_volume);
        if volume > 100 {
            return Err(Error::InvalidArgument(format!(
                "El volumen debe estar entre 0 y 100, recibido: {volume}"
            )));
        }

        let node = if options.load_balance {
            self.get_least_used_node()?
        } else {
            self.inner.pool.get_node().ok_or(Error::NoNodesAvailable)?
        };

        let join = JoinOptions {
            guild_id: options.guild_id,
            channel_id: options.voice_id,
            shard_id: options.shard_id,
            deafened: options.deafen.unwrap_or(self.inner.config.deafen),
        };
        let (session, events) = node.join_channel(&join).await?;

        let player = Player::spawn(PlayerParams {
            guild_id: options.guild_id,
            voice_id: options.voice_id,
            text_id: options.text_id,
            volume,
            node,
            session,
            manager: Arc::downgrade(&self.inner),
            catalog: self.inner.catalog.clone(),
            default_engine: self.inner.config.default_engine,
            max_resolve_failures: self.inner.config.max_resolve_failures,
            events,
        });

        self.inner
            .players
            .insert(options.guild_id, Arc::clone(&player));
        info!("✨ Player creado para guild {}", options.guild_id);
        self.inner.bus.emit(&player, &PlayerEvent::PlayerCreate);
        Ok(player)
    }

    /// Nodo online con menos sesiones; ante empate gana el primero del pool
    pub fn get_least_used_node(&self) -> Result<Arc<dyn NodeHandle>> {
        self.inner
            .pool
            .nodes()
            .into_iter()
            .filter(|node| node.is_online())
            .min_by_key(|node| node.session_count())
            .ok_or(Error::NoNodesAvailable)
    }

    /// Despacha una búsqueda usando la selección de nodo por defecto del pool
    pub async fn search(
        &self,
        query: &str,
        engine: Option<SearchEngine>,
    ) -> Result<SearchResult> {
        let node = self.inner.pool.get_node().ok_or(Error::NoNodesAvailable)?;
        sources::dispatch_search(
            &node,
            self.inner.catalog.as_ref(),
            self.inner.config.default_engine,
            query,
            engine,
        )
        .await
    }
}
