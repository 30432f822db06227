use crate::db::HistoryStore;
use crate::detran::{query_url, DebtSource};
use crate::extraction::Extractor;
use crate::form::normalize_plate;
use crate::gemini::Oracle;
use crate::state::{self, AppState, Event, Phase};
use crate::types::{VehicleHistoryItem, VehicleQuery};
use chrono::Utc;
use log::{info, warn};
use std::mem;
use url::Url;

/// Drives one consultation at a time from query to dashboard, and keeps the
/// history of consulted vehicles up to date.
pub struct Orchestrator<S, O> {
    source: S,
    extractor: Extractor<O>,
    history: HistoryStore,
    api_url: Url,
    state: AppState,
}

impl<S: DebtSource, O: Oracle> Orchestrator<S, O> {
    pub fn new(source: S, oracle: O, history: HistoryStore, api_url: Url) -> Self {
        Orchestrator {
            source,
            extractor: Extractor::new(oracle),
            history,
            api_url,
            state: AppState::default(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn history(&self) -> &[VehicleHistoryItem] {
        self.history.items()
    }

    fn apply(&mut self, event: Event) {
        let current = mem::take(&mut self.state);
        self.state = state::next(current, event);
    }

    /// Queries the registry directly; falls back to manual entry when the
    /// request fails.
    pub async fn submit(&mut self, mut query: VehicleQuery) {
        query.plate = normalize_plate(&query.plate);
        if !self.state.accepts_submit() {
            warn!("Not ready for a new consultation, ignoring {}", query.plate);
            return;
        }
        let url = query_url(&self.api_url, &query);
        self.apply(Event::Submit { url: url.clone() });
        if self.state.phase != (Phase::Fetching { url: url.clone() }) {
            warn!("Query for {} was not started", query.plate);
            return;
        }
        match self.source.fetch(&url).await {
            Ok(body) => {
                self.apply(Event::FetchSucceeded);
                self.extract(&body).await;
            }
            Err(e) => {
                warn!("Direct query for {} failed: {}", query.plate, e);
                self.apply(Event::FetchFailed);
            }
        }
    }

    pub fn edit_manual_text(&mut self, text: &str) {
        self.apply(Event::ManualTextEdited(text.to_string()));
    }

    /// Extracts debts from text the user copied from the request URL.
    pub async fn submit_manual(&mut self, text: &str) {
        if self.state.manual_url().is_none() || self.state.is_busy() {
            warn!("No manual entry pending");
            return;
        }
        self.edit_manual_text(text);
        self.apply(Event::ManualSubmitted);
        let pasted = self.state.manual_text.clone();
        self.extract(&pasted).await;
    }

    async fn extract(&mut self, text: &str) {
        if !matches!(self.state.phase, Phase::Extracting { .. }) {
            warn!("No extraction pending");
            return;
        }
        match self.extractor.extract(text).await {
            Ok(data) => {
                self.apply(Event::Extracted {
                    data,
                    at: Utc::now(),
                });
                if let Some(consultation) = self.state.consultation() {
                    info!(
                        "Consultation for {} ready: {} items",
                        consultation.plate,
                        consultation.items.len()
                    );
                    let item = VehicleHistoryItem::from(consultation);
                    self.history.save(item);
                }
            }
            Err(e) => self.apply(Event::ExtractionFailed(e)),
        }
    }

    pub fn new_consultation(&mut self) {
        self.apply(Event::NewConsultation);
    }

    /// History entry for `plate`, clearing any error so the form starts clean.
    pub fn select_history(&mut self, plate: &str) -> Option<VehicleHistoryItem> {
        let item = self.history.get(plate).cloned();
        if item.is_some() {
            self.apply(Event::ClearError);
        }
        item
    }

    pub fn delete_history(&mut self, plate: &str) {
        self.history.delete(plate);
    }
}
