use rdv_client::{ApiError, StorageError};
use rdv_core::error::CoreError;

/// Application-level error type for the controllers and the terminal.
///
/// Wraps [`CoreError`] for domain errors and [`ApiError`] for backend
/// failures. [`AppError::user_message`] turns any variant into the text
/// shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `rdv_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A REST backend error from `rdv_client`.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Persisted client storage could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for controller return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// French message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => {
                    format!("Élément introuvable ({entity} {id}).")
                }
                CoreError::Validation(msg) => msg.clone(),
                CoreError::InvalidTransition(_) => {
                    "Cette action n'est pas disponible à cette étape.".to_string()
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    "Une erreur interne est survenue.".to_string()
                }
            },

            // --- Backend errors ---
            AppError::Api(api) => match api {
                ApiError::Unauthorized { .. } => {
                    "Vous devez être connecté pour effectuer cette action.".to_string()
                }
                e if e.is_network() => {
                    "Impossible de joindre le serveur. Vérifiez votre connexion puis réessayez."
                        .to_string()
                }
                ApiError::ApiError { status, .. } => match api.server_message() {
                    Some(msg) => msg,
                    None => format!("Le serveur a répondu avec une erreur ({status}). Réessayez."),
                },
                ApiError::Request(_) => {
                    "La réponse du serveur est illisible. Réessayez.".to_string()
                }
                ApiError::Storage(e) => {
                    tracing::error!(error = %e, "Client storage failure");
                    "Le stockage local est inaccessible.".to_string()
                }
            },

            AppError::Storage(e) => {
                tracing::error!(error = %e, "Client storage failure");
                "Le stockage local est inaccessible.".to_string()
            }
            AppError::Config(msg) => format!("Configuration invalide : {msg}"),
            AppError::Io(e) => format!("Erreur d'entrée/sortie : {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
