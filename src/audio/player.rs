use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard, RwLock};
use serde_json::Value;
use serenity::model::id::{ChannelId, GuildId};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::manager::ManagerInner;
use crate::audio::queue::{LoopMode, TrackQueue};
use crate::error::{Error, Result};
use crate::events::PlayerEvent;
use crate::node::{NodeEvent, NodeEvents, NodeHandle, NodeSession};
use crate::sources::{self, CatalogProvider, SearchEngine, SearchResult, Track};

/// Estado mutable de un player, protegido por un lock.
struct PlayerState {
    voice_id: Option<ChannelId>,
    text_id: ChannelId,
    volume: u16,
    playing: bool,
    paused: bool,
    loop_mode: LoopMode,
}

/// Parámetros internos de construcción de un player.
pub(crate) struct PlayerParams {
    pub guild_id: GuildId,
    pub voice_id: ChannelId,
    pub text_id: ChannelId,
    pub volume: u16,
    pub node: Arc<dyn NodeHandle>,
    pub session: Box<dyn NodeSession>,
    pub manager: Weak<ManagerInner>,
    pub catalog: Option<Arc<dyn CatalogProvider>>,
    pub default_engine: SearchEngine,
    pub max_resolve_failures: usize,
    pub events: NodeEvents,
}

/// Sesión de reproducción de un guild.
///
/// Posee la cola, el handle del nodo que la respalda y el estado de
/// reproducción. Reacciona a los eventos del nodo: marca inicio de tracks,
/// aplica la política de loop al terminar cada uno y avanza la cola solo.
///
/// Todos los métodos de reproducción asumen un player vivo; usarlos después
/// de [`destroy`](Player::destroy) es un error de programación y provoca un
/// panic.
pub struct Player {
    guild_id: GuildId,
    node: Arc<dyn NodeHandle>,
    session: Box<dyn NodeSession>,
    manager: Weak<ManagerInner>,
    self_ref: Weak<Player>,
    catalog: Option<Arc<dyn CatalogProvider>>,
    default_engine: SearchEngine,
    max_resolve_failures: usize,
    state: RwLock<PlayerState>,
    queue: Mutex<TrackQueue>,
    data: RwLock<HashMap<String, Value>>,
    destroyed: AtomicBool,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl Player {
    /// Construye el player y arranca la tarea que consume eventos del nodo
    pub(crate) fn spawn(params: PlayerParams) -> Arc<Self> {
        let PlayerParams {
            guild_id,
            voice_id,
            text_id,
            volume,
            node,
            session,
            manager,
            catalog,
            default_engine,
            max_resolve_failures,
            mut events,
        } = params;

        let player = Arc::new_cyclic(|self_ref| Self {
            guild_id,
            node,
            session,
            manager,
            self_ref: self_ref.clone(),
            catalog,
            default_engine,
            max_resolve_failures,
            state: RwLock::new(PlayerState {
                voice_id: Some(voice_id),
                text_id,
                volume,
                playing: false,
                paused: false,
                loop_mode: LoopMode::Off,
            }),
            queue: Mutex::new(TrackQueue::new()),
            data: RwLock::new(HashMap::new()),
            destroyed: AtomicBool::new(false),
            event_task: Mutex::new(None),
        });

        // Suscripción a los eventos del nodo; abortar esta tarea es la
        // "desuscripción" que destroy() ejecuta antes de soltar el player
        let task = tokio::spawn({
            let player = Arc::clone(&player);
            async move {
                while let Some(event) = events.recv().await {
                    player.handle_node_event(event).await;
                }
            }
        });
        *player.event_task.lock() = Some(task);

        player
    }

    // Getters
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }
    pub fn voice_id(&self) -> Option<ChannelId> {
        self.state.read().voice_id
    }
    pub fn text_id(&self) -> ChannelId {
        self.state.read().text_id
    }
    pub fn volume(&self) -> u16 {
        self.state.read().volume
    }
    pub fn is_playing(&self) -> bool {
        self.state.read().playing
    }
    pub fn is_paused(&self) -> bool {
        self.state.read().paused
    }
    pub fn loop_mode(&self) -> LoopMode {
        self.state.read().loop_mode
    }

    /// Acceso a la cola del player.
    ///
    /// El guard no debe retenerse a través de un `.await`.
    pub fn queue(&self) -> MutexGuard<'_, TrackQueue> {
        self.queue.lock()
    }

    /// Copia del track actualmente en reproducción
    pub fn current(&self) -> Option<Track> {
        self.queue.lock().current().cloned()
    }

    /// Copia del track reproducido justo antes del actual
    pub fn previous(&self) -> Option<Track> {
        self.queue.lock().previous().cloned()
    }

    /// Reproduce el siguiente track pendiente de la cola.
    ///
    /// Saca la cabeza de la cola; si el track no está resuelto lo resuelve
    /// primero. Los tracks irresolubles se descartan y se intenta con el
    /// siguiente, hasta un tope de fallos consecutivos; al alcanzarlo (o al
    /// agotar la cola en el intento) se emite un `QueueEnd` terminal en vez
    /// de seguir iterando.
    pub async fn play(&self) -> Result<()> {
        self.ensure_live();

        let mut failures = 0usize;
        let mut popped_any = false;

        while failures < self.max_resolve_failures {
            let next = self.queue.lock().pop_head();
            let Some(mut track) = next else {
                if !popped_any {
                    return Err(Error::EmptyQueue);
                }
                // La cola se agotó descartando tracks irresolubles
                self.finish_playback("📭 Cola agotada");
                return Ok(());
            };
            popped_any = true;

            if !track.is_resolved() {
                if let Err(error) = self.resolve_track(&mut track).await {
                    warn!(
                        "⚠️ Se descarta \"{}\" en guild {}: {}",
                        track.title(),
                        self.guild_id,
                        error
                    );
                    failures += 1;
                    continue;
                }
            }

            let Some(handle) = track.handle() else {
                failures += 1;
                continue;
            };

            self.queue.lock().set_current(track.clone());
            let volume = self.state.read().volume;
            self.session.set_volume(f32::from(volume) / 100.0).await?;
            self.session.play_track(&handle).await?;
            info!("🎵 Reproduciendo \"{}\" en guild {}", track.title(), self.guild_id);
            return Ok(());
        }

        self.finish_playback("❌ Demasiadas resoluciones fallidas seguidas");
        Ok(())
    }

    /// Pausa o reanuda. No hace nada si el estado pedido ya es el vigente o
    /// si no hay ningún track (ni actual ni pendiente).
    pub async fn pause(&self, paused: bool) -> Result<()> {
        self.ensure_live();

        if self.state.read().paused == paused {
            return Ok(());
        }
        if self.queue.lock().total_size() == 0 {
            return Ok(());
        }

        self.session.set_paused(paused).await?;

        let mut state = self.state.write();
        state.paused = paused;
        state.playing = !paused;
        drop(state);

        if paused {
            info!("⏸️ Player pausado en guild {}", self.guild_id);
        } else {
            info!("▶️ Player reanudado en guild {}", self.guild_id);
        }
        Ok(())
    }

    /// Salta el track actual.
    ///
    /// Solo manda el stop al nodo; el avance real lo dispara el evento de
    /// fin que el nodo emitirá a continuación.
    pub async fn skip(&self) -> Result<()> {
        self.ensure_live();
        self.session.stop_track().await?;
        info!("⏭️ Skip pedido en guild {}", self.guild_id);
        Ok(())
    }

    /// Salta a una posición del track actual
    pub async fn seek_to(&self, position: Duration) -> Result<()> {
        self.ensure_live();
        self.session.seek_to(position.as_millis() as u64).await?;
        Ok(())
    }

    /// Cambia el volumen (0-100); el nodo recibe la fracción 0.0-1.0
    pub async fn set_volume(&self, volume: u16) -> Result<()> {
        self.ensure_live();
        if volume > 100 {
            return Err(Error::InvalidArgument(format!(
                "El volumen debe estar entre 0 y 100, recibido: {volume}"
            )));
        }
        self.session.set_volume(f32::from(volume) / 100.0).await?;
        self.state.write().volume = volume;
        info!("🔊 Volumen de guild {} ajustado a {}%", self.guild_id, volume);
        Ok(())
    }

    /// Cambia el modo de repetición
    pub fn set_loop(&self, mode: LoopMode) {
        self.ensure_live();
        self.state.write().loop_mode = mode;
        match mode {
            LoopMode::Off => info!("➡️ Repetición desactivada en guild {}", self.guild_id),
            LoopMode::Track => info!("🔂 Repetir track activado en guild {}", self.guild_id),
            LoopMode::Queue => info!("🔁 Repetir cola activado en guild {}", self.guild_id),
        }
    }

    /// Cambia el canal de texto asociado al player
    pub fn set_text_channel(&self, text_id: ChannelId) {
        self.ensure_live();
        self.state.write().text_id = text_id;
    }

    /// Cambia el canal de voz registrado para el player
    pub fn set_voice_channel(&self, voice_id: ChannelId) {
        self.ensure_live();
        self.state.write().voice_id = Some(voice_id);
    }

    /// Busca usando el nodo de este player (y el catálogo del manager)
    pub async fn search(
        &self,
        query: &str,
        engine: Option<SearchEngine>,
    ) -> Result<SearchResult> {
        self.ensure_live();
        sources::dispatch_search(
            &self.node,
            self.catalog.as_ref(),
            self.default_engine,
            query,
            engine,
        )
        .await
    }

    /// Pausa, olvida el canal de voz y vacía la cola (incluido el actual).
    ///
    /// El player sigue registrado y puede volver a usarse.
    pub async fn disconnect(&self) -> Result<()> {
        self.ensure_live();
        self.pause(true).await?;
        self.state.write().voice_id = None;
        {
            let mut queue = self.queue.lock();
            queue.clear_current();
            queue.clear();
        }
        info!("🔌 Player de guild {} desconectado", self.guild_id);
        Ok(())
    }

    /// Destruye el player: desconecta, corta la sesión del nodo, se
    /// desuscribe de sus eventos, emite `PlayerDestroy` y se borra del
    /// registro. Terminal: cualquier operación posterior es un panic.
    pub async fn destroy(&self) {
        self.ensure_live();

        if let Err(error) = self.disconnect().await {
            warn!("⚠️ Error al desconectar guild {} durante destroy: {}", self.guild_id, error);
        }
        if let Err(error) = self.session.disconnect().await {
            warn!("⚠️ Error al cortar la sesión del nodo de guild {}: {}", self.guild_id, error);
        }

        // Desuscribirse ANTES de soltar el player: los eventos del nodo que
        // lleguen tarde para este guild deben ignorarse
        if let Some(task) = self.event_task.lock().take() {
            task.abort();
        }
        self.destroyed.store(true, Ordering::SeqCst);

        self.emit(PlayerEvent::PlayerDestroy);
        if let Some(manager) = self.manager.upgrade() {
            manager.players.remove(&self.guild_id);
        }
        info!("💥 Player de guild {} destruido", self.guild_id);
    }

    // Bolsa de datos arbitrarios del caller

    pub fn set_data(&self, key: impl Into<String>, value: Value) {
        self.data.write().insert(key.into(), value);
    }

    pub fn get_data(&self, key: &str) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    pub fn remove_data(&self, key: &str) -> Option<Value> {
        self.data.write().remove(key)
    }

    /// Traduce un evento del nodo al estado y eventos propios
    pub(crate) async fn handle_node_event(&self, event: NodeEvent) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }

        match event {
            NodeEvent::TrackStart => {
                self.state.write().playing = true;
                match self.current() {
                    Some(track) => {
                        debug!("▶️ Track iniciado en guild {}: {}", self.guild_id, track.title());
                        self.emit(PlayerEvent::TrackStart(track));
                    }
                    None => warn!(
                        "⚠️ El nodo reportó inicio sin track actual en guild {}",
                        self.guild_id
                    ),
                }
            }
            NodeEvent::TrackEnd => self.on_track_end().await,
            NodeEvent::Closed(data) => {
                self.state.write().playing = false;
                self.emit(PlayerEvent::PlayerClosed(data));
            }
            NodeEvent::TrackException(data) => {
                self.state.write().playing = false;
                self.emit(PlayerEvent::TrackException(data));
            }
            NodeEvent::PlayerUpdate(data) => self.emit(PlayerEvent::PlayerUpdate(data)),
            NodeEvent::TrackStuck(data) => self.emit(PlayerEvent::TrackStuck(data)),
            NodeEvent::Resumed => self.emit(PlayerEvent::PlayerResumed),
        }
    }

    /// Fin de track: aplica la política de loop y avanza la cola
    async fn on_track_end(&self) {
        let loop_mode = self.state.read().loop_mode;

        let (finished, has_pending) = {
            let mut queue = self.queue.lock();
            if let Some(current) = queue.current().cloned() {
                match loop_mode {
                    LoopMode::Track => queue.push_front(current),
                    LoopMode::Queue => queue.push(current),
                    LoopMode::Off => {}
                }
            }
            let finished = queue.finish_current();
            (finished, !queue.is_empty())
        };

        if has_pending {
            if let Some(track) = finished {
                self.emit(PlayerEvent::TrackEnd(track));
            }
            // Avance automático: sus errores se registran, nunca tumban el
            // consumo de eventos
            if let Err(error) = self.play().await {
                warn!("❌ No se pudo avanzar la cola de guild {}: {}", self.guild_id, error);
            }
        } else {
            self.finish_playback("📭 Cola terminada");
        }
    }

    /// Resuelve un track de metadata contra los motores de búsqueda.
    ///
    /// Prueba primero el motor de música y cae al de video general; si ambos
    /// devuelven cero resultados el track es irreproducible. El handle
    /// resuelto se escribe sobre el mismo track.
    async fn resolve_track(&self, track: &mut Track) -> Result<()> {
        let query = match track.author() {
            Some(author) => format!("{} - {}", author, track.title()),
            None => track.title(),
        };
        debug!("🔍 Resolviendo \"{}\" en guild {}", query, self.guild_id);

        for engine in [SearchEngine::YouTubeMusic, SearchEngine::YouTube] {
            let result = self
                .node
                .resolve(&format!("{}:{}", engine.prefix(), query))
                .await?;
            if let Some(found) = result.tracks.into_iter().next() {
                if let Some(handle) = found.handle() {
                    track.set_handle(handle);
                    return Ok(());
                }
            }
        }

        Err(Error::ResolutionFailed(query))
    }

    /// Marca el fin de la reproducción y emite el `QueueEnd` terminal
    fn finish_playback(&self, reason: &str) {
        self.state.write().playing = false;
        info!("{} en guild {}", reason, self.guild_id);
        self.emit(PlayerEvent::QueueEnd);
    }

    /// Publica un evento a través del bus del manager
    fn emit(&self, event: PlayerEvent) {
        let (Some(manager), Some(player)) = (self.manager.upgrade(), self.self_ref.upgrade())
        else {
            return;
        };
        manager.bus.emit(&player, &event);
    }

    fn ensure_live(&self) {
        assert!(
            !self.destroyed.load(Ordering::SeqCst),
            "operación sobre un player destruido (guild {})",
            self.guild_id
        );
    }
}
