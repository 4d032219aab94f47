//! Interface de linha de comando do despacho baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (offer, job, demo)
//! e flags globais (--db, --json, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// dispatch: oferta competitiva de vistorias para peritos de campo.
#[derive(Debug, Parser)]
#[command(name = "dispatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do banco SQLite (sobrepõe dispatch.toml e DISPATCH_DATABASE).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Imprime resultados em JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Operações sobre ofertas.
    #[command(subcommand)]
    Offer(OfferCommand),

    /// Operações sobre atribuições de jobs.
    #[command(subcommand)]
    Job(JobCommand),

    /// Emite um grupo de ofertas e dispara aceites concorrentes de todos os candidatos.
    Demo {
        /// Número de peritos candidatos.
        #[arg(long, default_value_t = 5)]
        candidates: i64,

        /// TTL das ofertas em segundos.
        #[arg(long)]
        ttl: Option<i64>,
    },
}

#[derive(Debug, Subcommand)]
pub enum OfferCommand {
    /// Cria uma oferta PENDING por candidato para o FNOL informado.
    Create {
        /// Identificador do sinistro (FNOL).
        fnol_id: String,

        /// IDs dos peritos candidatos, separados por vírgula.
        #[arg(long, value_delimiter = ',', required = true)]
        candidates: Vec<i64>,

        /// TTL em segundos (padrão: default_ttl_secs da configuração).
        #[arg(long)]
        ttl: Option<i64>,
    },

    /// Tenta aceitar uma oferta em nome de um perito.
    Accept {
        offer_group: String,
        surveyor_id: i64,
    },

    /// Lista todas as ofertas de um grupo.
    List { offer_group: String },

    /// Lista as ofertas ainda aceitáveis de um perito.
    Active { surveyor_id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum JobCommand {
    /// Marca um job ASSIGNED como COMPLETED.
    Complete { job_id: i64 },

    /// Lista os jobs de um perito.
    List {
        surveyor_id: i64,

        /// Apenas jobs ainda ASSIGNED.
        #[arg(long, default_value_t = false)]
        active: bool,
    },
}
