//! Interface de terminal do despacho: barra de progresso e saída colorida.
//!
//! Usa as crates `indicatif` para acompanhar a corrida de aceites e
//! `console` para estilização com cores. Com `--json`, toda saída vira JSON
//! via `serde_json`.

use chrono::Utc;
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use surveyor_dispatch::{AcceptOutcome, JobAssignment, JobOffer, OfferBatch, RaceReport};

/// Escreve resultados no terminal, coloridos ou em JSON.
pub struct Printer {
    json: bool,
    // Estilo verde para sucesso.
    green: Style,
    // Estilo vermelho para recusas.
    red: Style,
    // Estilo amarelo para avisos e ofertas vencidas.
    yellow: Style,
    // Estilo discreto para metadados.
    dim: Style,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    fn emit_json<T: Serialize>(&self, value: &T) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }

    pub fn batch(&self, batch: &OfferBatch, candidates: usize) {
        if self.json {
            return self.emit_json(batch);
        }
        println!(
            "  {} Offered to {candidates} surveyor(s): group {}",
            self.green.apply_to("✓"),
            batch.offer_group
        );
        println!("    {}", self.dim.apply_to(format!("expires at {}", batch.expires_at)));
    }

    pub fn accept(&self, outcome: &AcceptOutcome) {
        if self.json {
            return self.emit_json(outcome);
        }
        match outcome.job_id {
            Some(job_id) if outcome.ok => {
                println!("  {} Offer accepted, job {job_id}", self.green.apply_to("✓"))
            }
            _ => println!(
                "  {} {}",
                self.red.apply_to("✗"),
                outcome.reason.as_deref().unwrap_or("offer unavailable")
            ),
        }
    }

    pub fn complete(&self, job_id: i64, ok: bool) {
        if self.json {
            return self.emit_json(&serde_json::json!({ "ok": ok }));
        }
        if ok {
            println!("  {} Job {job_id} completed", self.green.apply_to("✓"));
        } else {
            println!("  {} Job {job_id} was not ASSIGNED", self.yellow.apply_to("–"));
        }
    }

    pub fn offers(&self, offers: &[JobOffer]) {
        if self.json {
            return self.emit_json(&offers);
        }
        if offers.is_empty() {
            println!("  {}", self.dim.apply_to("no offers"));
            return;
        }
        let now = Utc::now();
        for offer in offers {
            let status = offer.effective_status(now);
            let style = if offer.is_live(now) { &self.green } else { &self.yellow };
            println!(
                "  {} surveyor {:<6} {:<9} {} {}",
                self.dim.apply_to(&offer.offer_group),
                offer.surveyor_id,
                style.apply_to(status),
                offer.fnol_id,
                self.dim.apply_to(format!("expires {}", offer.expires_at)),
            );
        }
    }

    pub fn assignments(&self, assignments: &[JobAssignment]) {
        if self.json {
            return self.emit_json(&assignments);
        }
        if assignments.is_empty() {
            println!("  {}", self.dim.apply_to("no jobs"));
            return;
        }
        for job in assignments {
            println!(
                "  job {:<6} {:<10} {} {}",
                job.id,
                job.status,
                job.fnol_id,
                self.dim.apply_to(format!("{} → {}", job.start_time, job.end_time)),
            );
        }
    }

    pub fn race(&self, report: &RaceReport) {
        if self.json {
            return self.emit_json(report);
        }
        println!();
        println!("{}", self.green.apply_to("─── Race Result ───"));
        println!("  group   {}", report.offer_group);
        match report.winner {
            Some((surveyor, job_id)) => println!(
                "  {} surveyor {surveyor} won job {job_id}",
                self.green.apply_to("✓")
            ),
            None => println!("  {} nobody won", self.red.apply_to("✗")),
        }
        println!(
            "  {} {} refused: {:?}",
            self.red.apply_to("✗"),
            report.losers.len(),
            report.losers
        );
    }
}

/// Barra de progresso para os aceites concorrentes da demo.
pub struct RaceProgress {
    pb: ProgressBar,
}

impl RaceProgress {
    pub fn start(attempts: u64) -> Self {
        let pb = ProgressBar::new(attempts);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_message("accepting…");
        Self { pb }
    }

    /// Registra o fim de uma tentativa.
    pub fn settled(&self, surveyor_id: i64, outcome: &AcceptOutcome) {
        if outcome.ok {
            self.pb.set_message(format!("surveyor {surveyor_id} won"));
        }
        self.pb.inc(1);
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

/// Barra oculta quando a saída é JSON.
impl Default for RaceProgress {
    fn default() -> Self {
        Self {
            pb: ProgressBar::hidden(),
        }
    }
}
