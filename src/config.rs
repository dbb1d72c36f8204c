use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, GuildId};

use crate::error::{Error, Result};
use crate::sources::SearchEngine;

/// Configuración del [`SessionManager`](crate::SessionManager).
///
/// Se valida una sola vez al construir el manager; una configuración
/// inválida impide la construcción, nunca se registra-y-continúa.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManagerConfig {
    /// Motor de búsqueda usado cuando el caller no especifica ninguno
    pub default_engine: SearchEngine,

    /// Volumen inicial de los players (0-100)
    pub default_volume: u16,

    /// Entrar ensordecido a los canales de voz salvo indicación contraria
    pub deafen: bool,

    /// Máximo de resoluciones fallidas consecutivas que `play()` tolera
    /// antes de detener el avance y emitir `QueueEnd`
    pub max_resolve_failures: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_engine: SearchEngine::YouTube,
            default_volume: 80,
            deafen: true,
            max_resolve_failures: 3,
        }
    }
}

impl ManagerConfig {
    /// Valida los valores de configuración.
    pub fn validate(&self) -> Result<()> {
        if self.default_volume > 100 {
            return Err(Error::Config(format!(
                "El volumen por defecto debe estar entre 0 y 100, recibido: {}",
                self.default_volume
            )));
        }

        if self.max_resolve_failures == 0 {
            return Err(Error::Config(
                "max_resolve_failures debe ser mayor que 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Opciones para crear (u obtener) el player de un guild.
#[derive(Debug, Clone)]
pub struct CreatePlayerOptions {
    pub guild_id: GuildId,
    pub voice_id: ChannelId,
    pub text_id: ChannelId,
    pub shard_id: u32,
    /// Volumen inicial (0-100); si falta se usa el de la configuración
    pub volume: Option<u16>,
    /// Entrar ensordecido; si falta se usa el de la configuración
    pub deafen: Option<bool>,
    /// Elegir el nodo online con menos sesiones en vez del nodo por defecto
    pub load_balance: bool,
}

impl CreatePlayerOptions {
    pub fn new(guild_id: GuildId, voice_id: ChannelId, text_id: ChannelId, shard_id: u32) -> Self {
        Self {
            guild_id,
            voice_id,
            text_id,
            shard_id,
            volume: None,
            deafen: None,
            load_balance: false,
        }
    }

    pub fn with_volume(mut self, volume: u16) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_deafen(mut self, deafen: bool) -> Self {
        self.deafen = Some(deafen);
        self
    }

    pub fn with_load_balance(mut self, load_balance: bool) -> Self {
        self.load_balance = load_balance;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ManagerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_volume_over_100_fails_validation() {
        let config = ManagerConfig {
            default_volume: 150,
            ..ManagerConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_resolve_cap_fails_validation() {
        let config = ManagerConfig {
            max_resolve_failures: 0,
            ..ManagerConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
