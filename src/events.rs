//! # Events Module
//!
//! Bus tipado de publicación/suscripción para los eventos de los players.
//!
//! En vez de heredar de un event-emitter genérico, el conjunto de eventos es
//! una enumeración cerrada con payloads conocidos; los suscriptores registran
//! handlers por tipo y el [`SessionManager`](crate::SessionManager) es el
//! único publicador.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::audio::player::Player;
use crate::sources::Track;

/// Evento emitido por la capa de sesiones hacia la aplicación.
///
/// Todos se entregan junto con el `Arc<Player>` que los originó. Los que
/// provienen del nodo (`PlayerClosed`, `TrackException`, `PlayerUpdate`,
/// `TrackStuck`) arrastran el payload crudo sin interpretar.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// El nodo empezó a transferir audio del track actual
    TrackStart(Track),
    /// Terminó un track y la cola todavía tiene pendientes
    TrackEnd(Track),
    /// Terminó un track y no queda nada pendiente; el player sigue vivo
    QueueEnd,
    PlayerClosed(Value),
    TrackException(Value),
    PlayerUpdate(Value),
    TrackStuck(Value),
    PlayerResumed,
    PlayerDestroy,
    PlayerCreate,
}

impl PlayerEvent {
    /// Tipo del evento, usado para enrutar hacia los handlers registrados
    pub fn kind(&self) -> EventKind {
        match self {
            PlayerEvent::TrackStart(_) => EventKind::TrackStart,
            PlayerEvent::TrackEnd(_) => EventKind::TrackEnd,
            PlayerEvent::QueueEnd => EventKind::QueueEnd,
            PlayerEvent::PlayerClosed(_) => EventKind::PlayerClosed,
            PlayerEvent::TrackException(_) => EventKind::TrackException,
            PlayerEvent::PlayerUpdate(_) => EventKind::PlayerUpdate,
            PlayerEvent::TrackStuck(_) => EventKind::TrackStuck,
            PlayerEvent::PlayerResumed => EventKind::PlayerResumed,
            PlayerEvent::PlayerDestroy => EventKind::PlayerDestroy,
            PlayerEvent::PlayerCreate => EventKind::PlayerCreate,
        }
    }
}

/// Tipos de evento suscribibles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TrackStart,
    TrackEnd,
    QueueEnd,
    PlayerClosed,
    TrackException,
    PlayerUpdate,
    TrackStuck,
    PlayerResumed,
    PlayerDestroy,
    PlayerCreate,
}

type EventHandler = Box<dyn Fn(&Arc<Player>, &PlayerEvent) + Send + Sync>;

/// Bus de eventos con handlers registrados por tipo.
///
/// Los handlers se ejecutan en línea durante la emisión: no deben bloquear
/// por tiempo indefinido.
#[derive(Default)]
pub(crate) struct EventBus {
    handlers: RwLock<HashMap<EventKind, Vec<EventHandler>>>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registra un handler para un tipo de evento
    pub(crate) fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Arc<Player>, &PlayerEvent) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
    }

    /// Entrega el evento a todos los handlers de su tipo
    pub(crate) fn emit(&self, player: &Arc<Player>, event: &PlayerEvent) {
        let handlers = self.handlers.read();
        if let Some(registered) = handlers.get(&event.kind()) {
            for handler in registered {
                handler(player, event);
            }
        }
    }
}
