use thiserror::Error;

/// Errores propios de la capa de sesiones.
///
/// Los fallos originados en el nodo (`exception`, `closed`) NO pasan por aquí:
/// se traducen a eventos y es el caller quien decide qué hacer con ellos.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuración inválida detectada al construir el manager
    #[error("Configuración inválida: {0}")]
    Config(String),

    /// Argumento inválido del caller
    #[error("Argumento inválido: {0}")]
    InvalidArgument(String),

    /// No hay ningún nodo online en el pool
    #[error("No hay nodos disponibles")]
    NoNodesAvailable,

    /// El track no se pudo convertir en reproducible
    #[error("No se pudo resolver el track: {0}")]
    ResolutionFailed(String),

    /// Índice fuera del rango de la cola
    #[error("Índice fuera de rango: {index} (la cola tiene {size} tracks)")]
    IndexOutOfRange { index: usize, size: usize },

    /// La cola no tiene tracks pendientes
    #[error("La cola está vacía")]
    EmptyQueue,

    /// Fallo opaco de un colaborador externo (nodo o proveedor de catálogo)
    #[error(transparent)]
    Node(#[from] anyhow::Error),
}

/// Alias de `Result` para toda la crate.
pub type Result<T> = std::result::Result<T, Error>;
