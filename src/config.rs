//! Configuração do despacho carregada a partir de `dispatch.toml`.
//!
//! A struct [`DispatchConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `DISPATCH_DATABASE` tem precedência sobre o arquivo
//! para o caminho do banco.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use serde::Deserialize;

use crate::error::DispatchError;

/// Configuração de nível superior carregada de `dispatch.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Caminho do arquivo SQLite com ofertas, atribuições e bloqueios.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// TTL padrão (segundos) das ofertas quando `--ttl` não é informado.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: i64,

    /// Duração (minutos) da janela reservada para o vencedor.
    #[serde(default = "default_assignment_duration_minutes")]
    pub assignment_duration_minutes: i64,

    /// Espera máxima (ms) pelo lock de escrita do SQLite.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

// Valor padrão para o banco: "dispatch.db" no diretório atual.
fn default_database_path() -> PathBuf {
    PathBuf::from("dispatch.db")
}

// Valor padrão para o TTL das ofertas: 300s.
fn default_ttl_secs() -> i64 {
    300
}

// Valor padrão para a janela de atribuição: 2 horas.
fn default_assignment_duration_minutes() -> i64 {
    120
}

// Valor padrão para o busy timeout: 5000ms.
fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            default_ttl_secs: default_ttl_secs(),
            assignment_duration_minutes: default_assignment_duration_minutes(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DispatchConfig {
    /// Carrega a configuração de `dispatch.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self, DispatchError> {
        let mut config = Self::load_from(Path::new("dispatch.toml"))?;

        // Variável de ambiente tem precedência sobre o arquivo para o caminho do banco.
        if let Ok(path) = std::env::var("DISPATCH_DATABASE") {
            if !path.is_empty() {
                config.database_path = PathBuf::from(path);
            }
        }

        Ok(config)
    }

    /// Lê um arquivo específico; ausente significa defaults.
    pub fn load_from(path: &Path) -> Result<Self, DispatchError> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<DispatchConfig>(&contents)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.default_ttl_secs <= 0 {
            return Err(DispatchError::Config(format!(
                "default_ttl_secs must be positive, got {}",
                self.default_ttl_secs
            )));
        }
        // Upper bound keeps `now + duration` far from chrono's range limits.
        if self.assignment_duration_minutes <= 0 || self.assignment_duration_minutes > 60 * 24 * 365 {
            return Err(DispatchError::Config(format!(
                "assignment_duration_minutes must be between 1 and 525600, got {}",
                self.assignment_duration_minutes
            )));
        }
        // Zero faz aceites concorrentes falharem com SQLITE_BUSY.
        if self.busy_timeout_ms == 0 {
            return Err(DispatchError::Config(
                "busy_timeout_ms must be positive, got 0".into(),
            ));
        }
        Ok(())
    }

    pub fn assignment_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.assignment_duration_minutes)
    }

    pub fn busy_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.busy_timeout_ms)
    }
}
