//! # cadenza-link
//!
//! Capa de conveniencia para manejar sesiones de reproducción de música por
//! guild sobre un cliente externo de nodos de audio.
//!
//! La crate NO implementa el protocolo de streaming, la señalización de voz
//! ni el cliente HTTP del proveedor de catálogo: esos colaboradores llegan
//! por inyección detrás de interfaces estrechas ([`NodePool`],
//! [`NodeHandle`], [`NodeSession`], [`CatalogProvider`]). Lo que sí vive
//! aquí es el ciclo de vida sesión/cola y la traducción de eventos:
//!
//! - [`SessionManager`]: un player por guild, selección de nodo, despacho de
//!   búsquedas y bus de eventos tipado.
//! - [`Player`]: máquina de estados de reproducción; reacciona a los eventos
//!   del nodo, aplica la política de loop y avanza la cola.
//! - [`TrackQueue`]: pendientes FIFO más los punteros `current`/`previous`.
//! - [`Track`]: metadata más, opcionalmente, el handle que el nodo acepta.
//!
//! ## Ejemplo
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cadenza_link::{
//!     CreatePlayerOptions, EventKind, ManagerConfig, NodePool, SessionManager, Track,
//! };
//! use serenity::model::id::{ChannelId, GuildId};
//!
//! # async fn ejemplo(pool: Arc<dyn NodePool>) -> anyhow::Result<()> {
//! let manager = SessionManager::new(pool, None, ManagerConfig::default())?;
//!
//! manager.on(EventKind::TrackStart, |player, _event| {
//!     println!("🎵 Reproduciendo en guild {}", player.guild_id());
//! });
//!
//! let player = manager
//!     .create_player(CreatePlayerOptions::new(
//!         GuildId::new(103),
//!         ChannelId::new(208),
//!         ChannelId::new(309),
//!         0,
//!     ))
//!     .await?;
//!
//! player.queue().push(Track::new("Canción").with_author("Autora"));
//! player.play().await?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod node;
pub mod sources;

pub use audio::manager::SessionManager;
pub use audio::player::Player;
pub use audio::queue::{LoopMode, TrackQueue};
pub use config::{CreatePlayerOptions, ManagerConfig};
pub use error::{Error, Result};
pub use events::{EventKind, PlayerEvent};
pub use node::{JoinOptions, NodeEvent, NodeEvents, NodeHandle, NodePool, NodeSession};
pub use sources::{CatalogProvider, LoadType, SearchEngine, SearchResult, Track};
