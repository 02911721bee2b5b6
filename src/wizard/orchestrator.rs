//! Async step effects over the service traits.

use chrono::Utc;

use crate::services::{Backend, BuildingQuery, Catalog, Location, ReportFile, ServiceError};
use crate::wizard::flow::{EntryEffect, Step};
use crate::wizard::operations::{Operation, OperationTicket, SessionError};
use crate::wizard::otp::OtpChallenge;
use crate::wizard::session::WizardSession;
use crate::wizard::WizardError;

/// A wizard session driven against a service backend.
///
/// Entering a step runs its [`EntryEffect`]. Service failures are stored in
/// [`WizardSession::error`] and never clear entered data; [`retry`](Self::retry)
/// repeats the failed operation.
#[derive(Debug)]
pub struct QuoteFlow<B> {
    backend: B,
    session: WizardSession,
    search_results: Vec<Location>,
    last_query: Option<String>,
    report: Option<ReportFile>,
}

impl<B: Backend> QuoteFlow<B> {
    /// Wraps a session.
    pub fn new(backend: B, session: WizardSession) -> Self {
        Self {
            backend,
            session,
            search_results: Vec::new(),
            last_query: None,
            report: None,
        }
    }

    /// Session state.
    pub const fn session(&self) -> &WizardSession {
        &self.session
    }

    /// Mutable session state for synchronous edits.
    pub fn session_mut(&mut self) -> &mut WizardSession {
        &mut self.session
    }

    /// Service backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Hits of the last address search.
    pub fn search_results(&self) -> &[Location] {
        &self.search_results
    }

    /// Last generated report.
    pub const fn report(&self) -> Option<&ReportFile> {
        self.report.as_ref()
    }

    /// Searches for addresses.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::Busy`] while a search is running, or the
    /// service error.
    pub async fn search_address(&mut self, text: &str) -> Result<&[Location], WizardError> {
        self.last_query = Some(text.to_string());
        let ticket = self.begin(Operation::SearchAddress)?;
        tracing::info!(query = text, "Searching address");
        let result = self.backend.search_address(text).await;
        self.search_results = self.settle(ticket, result)?;
        Ok(&self.search_results)
    }

    /// Chooses the search hit at `index`.
    ///
    /// The LV95 coordinate is filled in when the hit lacks one; a failed
    /// conversion only means the building is looked up by address text.
    ///
    /// # Errors
    ///
    /// Returns a precondition error for an index outside the results.
    pub async fn select_address(&mut self, index: usize) -> Result<&Location, WizardError> {
        let mut location = self
            .search_results
            .get(index)
            .cloned()
            .ok_or_else(|| WizardError::precondition("no such search result"))?;
        if location.lv95.is_none() {
            match self.backend.to_lv95(location.position).await {
                Ok(lv95) => location.lv95 = Some(lv95),
                Err(e) => tracing::warn!(error = %e, "LV95 conversion failed"),
            }
        }
        self.session.set_address(location);
        self.session
            .address
            .as_ref()
            .ok_or_else(|| WizardError::precondition("no address selected"))
    }

    /// Validates the current step, advances and runs the entry effect.
    ///
    /// An effect failure does not undo the step change; it is recorded in
    /// the session error.
    ///
    /// # Errors
    ///
    /// Returns navigation errors from [`WizardSession::next_step`].
    pub async fn next(&mut self) -> Result<Step, WizardError> {
        let step = self.session.next_step()?;
        self.enter(step).await;
        Ok(step)
    }

    /// Jumps to `index` and runs the entry effect of the target step.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::StepOutOfRange`].
    pub async fn go_to(&mut self, index: usize) -> Result<Step, WizardError> {
        let step = self.session.go_to_step(index)?;
        self.enter(step).await;
        Ok(step)
    }

    async fn enter(&mut self, step: Step) {
        let Some(effect) = step.entry_effect() else {
            return;
        };
        if let Err(e) = self.run_effect(effect).await {
            tracing::warn!(step = %step, error = %e, "Step entry effect failed");
        }
    }

    async fn run_effect(&mut self, effect: EntryEffect) -> Result<(), WizardError> {
        match effect {
            EntryEffect::LoadBuilding => self.load_building().await,
            EntryEffect::LoadCatalog => self.load_catalog().await,
            EntryEffect::StartSignature => self.start_signature().await,
            EntryEffect::GenerateReport => self.download_report(None).await.map(|_| ()),
        }
    }

    /// Repeats the operation recorded in the session error.
    ///
    /// # Errors
    ///
    /// Returns a precondition error when nothing is retryable, or the error
    /// of the repeated operation.
    pub async fn retry(&mut self) -> Result<(), WizardError> {
        let Some(error) = self.session.error.clone() else {
            return Err(WizardError::precondition("nothing to retry"));
        };
        if !error.retryable {
            return Err(WizardError::precondition(format!(
                "{} cannot be retried",
                error.operation
            )));
        }
        tracing::info!(operation = %error.operation, "Retrying");
        match error.operation {
            Operation::SearchAddress => {
                let query = self.last_query.clone().unwrap_or_default();
                self.search_address(&query).await.map(|_| ())
            }
            Operation::LoadBuilding => self.load_building().await,
            Operation::LoadCatalog => self.load_catalog().await,
            Operation::CreateContract | Operation::InitiateSignature => {
                self.start_signature().await
            }
            Operation::VerifySignature => {
                Err(WizardError::precondition("enter the code again"))
            }
            Operation::DownloadReport => self.download_report(None).await.map(|_| ()),
            Operation::DownloadContract => self.contract_download_url().await.map(|_| ()),
        }
    }

    /// Loads the building for the selected address.
    ///
    /// # Errors
    ///
    /// Returns a precondition error without an address, or the service error.
    pub async fn load_building(&mut self) -> Result<(), WizardError> {
        let address = self
            .session
            .address
            .clone()
            .ok_or_else(|| WizardError::precondition("no address selected"))?;
        let query = match address.lv95 {
            Some(position) => BuildingQuery::Lv95 { position },
            None => BuildingQuery::Address {
                text: address.label.clone(),
            },
        };
        let ticket = self.begin(Operation::LoadBuilding)?;
        tracing::info!(address = %address.label, "Loading building");
        let result = self.backend.building(&query).await;
        let building = self.settle(ticket, result)?;
        match &building {
            Some(b) => tracing::info!(segments = b.roof_segments.len(), "Building loaded"),
            None => tracing::info!("No building found, roof must be drawn"),
        }
        self.session.set_building(building);
        Ok(())
    }

    /// Loads the equipment catalog unless it is already present.
    ///
    /// # Errors
    ///
    /// Returns the service error of either catalog call.
    pub async fn load_catalog(&mut self) -> Result<(), WizardError> {
        if self.session.catalog().is_some() {
            return Ok(());
        }
        let country = self.session.settings().profile.country;
        let ticket = self.begin(Operation::LoadCatalog)?;
        tracing::info!(%country, "Loading equipment catalog");
        let result = async {
            let panels = self.backend.solar_panels(country).await?;
            let inverters = self.backend.inverters(country).await?;
            Ok::<_, ServiceError>(Catalog { panels, inverters })
        }
        .await;
        let catalog = self.settle(ticket, result)?;
        self.session.set_catalog(catalog);
        Ok(())
    }

    /// Creates the contract if needed and sends a signature code.
    ///
    /// Skipped while an unexpired code is outstanding.
    ///
    /// # Errors
    ///
    /// Returns precondition errors for missing input, or the service error.
    pub async fn start_signature(&mut self) -> Result<(), WizardError> {
        let now = Utc::now();
        if self
            .session
            .signature
            .as_ref()
            .is_some_and(|c| !c.is_expired(now))
        {
            return Ok(());
        }
        self.ensure_contract().await?;
        self.send_code().await
    }

    async fn ensure_contract(&mut self) -> Result<(), WizardError> {
        if self.session.contract.is_some() {
            return Ok(());
        }
        let payload = self.session.contract_payload()?;
        let ticket = self.begin(Operation::CreateContract)?;
        tracing::info!(panels = payload.panel_count, "Creating contract");
        let result = self.backend.create_from_calculator(&payload).await;
        let record = self.settle(ticket, result)?;
        tracing::info!(number = %record.contract_number, "Contract created");
        self.session.contract = Some(record);
        Ok(())
    }

    async fn send_code(&mut self) -> Result<(), WizardError> {
        let contract_id = self
            .session
            .contract
            .as_ref()
            .map(|c| c.contract_id.clone())
            .ok_or_else(|| WizardError::precondition("no contract created"))?;
        let acknowledgments = self.session.acknowledgments;
        let ticket = self.begin(Operation::InitiateSignature)?;
        tracing::info!(contract = %contract_id, "Sending signature code");
        let result = self
            .backend
            .initiate_signature(&contract_id, acknowledgments)
            .await;
        let request = self.settle(ticket, result)?;
        self.session.signature = Some(OtpChallenge::from_request(request, Utc::now()));
        Ok(())
    }

    /// Requests a new code once the cooldown has passed.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Cooldown`](crate::wizard::OtpError::Cooldown)
    /// within 60 s of the last code, or the service error.
    pub async fn resend_code(&mut self) -> Result<(), WizardError> {
        if let Some(challenge) = &self.session.signature {
            challenge.check_resend(Utc::now())?;
        }
        self.ensure_contract().await?;
        self.send_code().await
    }

    /// Submits a signature code. On success the wizard jumps to the terminal
    /// step.
    ///
    /// # Errors
    ///
    /// Returns a format or expiry error before any call is made,
    /// [`WizardError::CodeRejected`] for a wrong code, or the service error.
    pub async fn submit_code(&mut self, code: &str) -> Result<Step, WizardError> {
        let challenge = self
            .session
            .signature
            .as_ref()
            .ok_or_else(|| WizardError::precondition("no signature code requested"))?;
        challenge.check_code(code, Utc::now())?;
        let contract_id = self
            .session
            .contract
            .as_ref()
            .map(|c| c.contract_id.clone())
            .ok_or_else(|| WizardError::precondition("no contract created"))?;

        let ticket = self.begin(Operation::VerifySignature)?;
        let result = self.backend.verify_signature(&contract_id, code).await;
        let verification = self.settle(ticket, result)?;
        if !verification.success {
            tracing::info!(contract = %contract_id, "Signature code rejected");
            return Err(WizardError::CodeRejected);
        }
        Ok(self.session.complete_signature(verification.signed_pdf_url))
    }

    /// Generates the report, optionally embedding a PNG map capture.
    ///
    /// # Errors
    ///
    /// Returns precondition or export errors from building the payload, or
    /// the service error.
    pub async fn download_report(
        &mut self,
        map_png: Option<&[u8]>,
    ) -> Result<&ReportFile, WizardError> {
        let payload = self.session.report_payload(map_png)?;
        let ticket = self.begin(Operation::DownloadReport)?;
        tracing::info!(panels = payload.panel_count, "Generating report");
        let result = self.backend.download_report(&payload).await;
        let file = self.settle(ticket, result)?;
        Ok(self.report.insert(file))
    }

    /// Download URL of the contract PDF, signed once signing completed.
    ///
    /// # Errors
    ///
    /// Returns a precondition error without a contract, or the service error.
    pub async fn contract_download_url(&mut self) -> Result<String, WizardError> {
        let contract_id = self
            .session
            .contract
            .as_ref()
            .map(|c| c.contract_id.clone())
            .ok_or_else(|| WizardError::precondition("no contract created"))?;
        let signed = self.session.signed_pdf_url.is_some();
        let ticket = self.begin(Operation::DownloadContract)?;
        let result = self.backend.download_url(&contract_id, signed).await;
        self.settle(ticket, result)
    }

    fn begin(&mut self, operation: Operation) -> Result<OperationTicket, WizardError> {
        self.session
            .operations
            .begin(operation)
            .ok_or(WizardError::Busy(operation))
    }

    /// Finishes `ticket` and records the outcome in the session error.
    fn settle<T>(
        &mut self,
        ticket: OperationTicket,
        result: Result<T, ServiceError>,
    ) -> Result<T, WizardError> {
        let operation = ticket.operation();
        if !self.session.operations.finish(ticket) {
            return Err(WizardError::Stale(operation));
        }
        match result {
            Ok(value) => {
                if self
                    .session
                    .error
                    .as_ref()
                    .is_some_and(|e| e.operation == operation)
                {
                    self.session.error = None;
                }
                Ok(value)
            }
            Err(source) => {
                tracing::warn!(%operation, error = %source, "Service call failed");
                self.session.error = Some(SessionError::from_service(operation, &source));
                Err(WizardError::Service { operation, source })
            }
        }
    }
}
