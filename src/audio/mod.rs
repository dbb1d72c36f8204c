//! # Audio Module
//!
//! Núcleo de la capa de sesiones: cola, player y registro.
//!
//! ### [`queue`] - Cola de reproducción
//! - Pendientes en orden FIFO más los punteros `current`/`previous`
//! - Shuffle solo sobre los pendientes, modos de loop
//!
//! ### [`player`] - Sesión de un guild
//! - Estado de reproducción y traducción de eventos del nodo
//! - Resolución de tracks de metadata y avance automático de la cola
//!
//! ### [`manager`] - Registro de sesiones
//! - Un player por guild, selección de nodo y bus de eventos

pub mod manager;
pub mod player;
pub mod queue;
