// src/services/validator.rs
//
// Hospital-side check of a presented pickup authorization.
//
//   IDLE -> DECODING -> CHECKING -> DECIDED(APPROVED | REJECTED)
//
// Company status is read from the registry when CHECKING runs, never from the
// token. Nothing stops an administrator from suspending the company between
// that read and the operator's button press; the checkpoint may be offline
// and the window is accepted as is. `decide` re-runs the machine so the
// window is as short as the operator makes it.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CaseRegistry, CompanyRegistry, CrewRegistry, DecisionLog},
    models::{
        case::Case,
        company::Company,
        token::TokenPayload,
        validation::{OperatorAction, Outcome, RejectReason, ValidationDecision, Verdict},
    },
    services::scanner::Scanner,
};

#[derive(Debug)]
pub enum ValidationState {
    Idle,
    Decoding { raw: String },
    Checking { raw: String, token: TokenPayload },
    Decided(Verdict),
}

impl ValidationState {
    /// A fresh presentation always starts from IDLE.
    pub fn present(raw: impl Into<String>) -> Self {
        let state = ValidationState::Idle;
        state.receive(raw)
    }

    fn receive(self, raw: impl Into<String>) -> Self {
        ValidationState::Decoding { raw: raw.into() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValidationState::Idle => "IDLE",
            ValidationState::Decoding { .. } => "DECODING",
            ValidationState::Checking { .. } => "CHECKING",
            ValidationState::Decided(_) => "DECIDED",
        }
    }
}

#[derive(Clone)]
pub struct TokenValidator {
    companies: Arc<dyn CompanyRegistry>,
    cases: Arc<dyn CaseRegistry>,
}

impl TokenValidator {
    pub fn new(companies: Arc<dyn CompanyRegistry>, cases: Arc<dyn CaseRegistry>) -> Self {
        Self { companies, cases }
    }

    /// Drives one presentation to DECIDED.
    ///
    /// Errors are infrastructure failures (registry unreachable); every
    /// business outcome, malformed payloads included, is a `Verdict`.
    pub async fn run(&self, raw: &str) -> Result<Verdict, AppError> {
        let mut state = ValidationState::present(raw);
        loop {
            state = match state {
                ValidationState::Decided(verdict) => return Ok(verdict),
                other => self.advance(other).await?,
            };
        }
    }

    async fn advance(&self, state: ValidationState) -> Result<ValidationState, AppError> {
        let from = state.name();
        let next = match state {
            ValidationState::Idle => {
                return Err(AppError::InternalServerError(anyhow::anyhow!(
                    "validator advanced without a payload"
                )));
            }
            ValidationState::Decoding { raw } => match TokenPayload::parse(&raw) {
                Ok(token) => ValidationState::Checking { raw, token },
                Err(defect) => {
                    tracing::warn!("Rejected malformed payload: {}", defect);
                    ValidationState::Decided(verdict(raw, None, RejectReason::MalformedPayload.into()))
                }
            },
            ValidationState::Checking { raw, token } => {
                ValidationState::Decided(self.check(raw, token).await?)
            }
            decided @ ValidationState::Decided(_) => decided,
        };
        tracing::debug!("Validation {} -> {}", from, next.name());
        Ok(next)
    }

    async fn check(&self, raw: String, token: TokenPayload) -> Result<Verdict, AppError> {
        // Both present: DECODING only lets well-formed payloads through
        let company_id = token.company_id().unwrap_or_default().to_owned();
        let case_id = token.case_id().unwrap_or_default().to_owned();

        let Some(company) = self.companies.get(&company_id).await? else {
            return Ok(verdict(raw, Some(token), RejectReason::UnknownCompany.into()));
        };

        if !company.is_authorized() {
            return Ok(Verdict {
                company: Some(company),
                ..verdict(raw, Some(token), RejectReason::CompanySuspended.into())
            });
        }

        let Some(case) = self.cases.get(&case_id).await? else {
            return Ok(Verdict {
                company: Some(company),
                ..verdict(raw, Some(token), RejectReason::UnknownCase.into())
            });
        };

        let decision = if case.company_id == company.id {
            Decision::Approve
        } else {
            RejectReason::CaseCompanyMismatch.into()
        };

        Ok(resolved(raw, token, company, case, decision))
    }
}

// Automatic outcome before the resolved records are attached
enum Decision {
    Approve,
    Reject(RejectReason),
}

impl From<RejectReason> for Decision {
    fn from(reason: RejectReason) -> Self {
        Decision::Reject(reason)
    }
}

fn verdict(raw: String, token: Option<TokenPayload>, decision: Decision) -> Verdict {
    let (outcome, reason) = match decision {
        Decision::Approve => (Outcome::Approved, None),
        Decision::Reject(reason) => (Outcome::Rejected, Some(reason)),
    };
    Verdict {
        outcome,
        reason,
        payload: raw,
        token,
        company: None,
        case: None,
        crew: None,
        checked_at: Utc::now(),
    }
}

fn resolved(raw: String, token: TokenPayload, company: Company, case: Case, decision: Decision) -> Verdict {
    Verdict {
        company: Some(company),
        case: Some(case),
        ..verdict(raw, Some(token), decision)
    }
}

/// Validator plus the decision log: what the checkpoint screen talks to.
#[derive(Clone)]
pub struct ValidationService {
    validator: TokenValidator,
    log: Arc<dyn DecisionLog>,
    crews: Arc<dyn CrewRegistry>,
}

impl ValidationService {
    pub fn new(
        validator: TokenValidator,
        log: Arc<dyn DecisionLog>,
        crews: Arc<dyn CrewRegistry>,
    ) -> Self {
        Self { validator, log, crews }
    }

    /// Runs the automatic check only. Nothing is recorded.
    ///
    /// When the company is known, its crew on file comes along for the
    /// operator to compare; the outcome does not depend on it.
    pub async fn check(&self, raw: &str) -> Result<Verdict, AppError> {
        let mut verdict = self.validator.run(raw).await?;
        if let Some(company) = &verdict.company {
            verdict.crew = Some(self.crews.crew_for(&company.id).await?);
        }
        Ok(verdict)
    }

    /// Reads one code from the scanner and checks it.
    ///
    /// `timeout` covers opening the device as well as waiting for a code.
    pub async fn scan(&self, scanner: &Scanner, timeout: Duration) -> Result<Verdict, AppError> {
        let raw = tokio::time::timeout(timeout, async {
            let mut session = scanner.start().await?;
            let frame = session.next_payload().await;
            session.stop();
            frame.ok_or_else(|| {
                AppError::DeviceUnavailable("capture stopped before a code was read".to_string())
            })
        })
        .await
        .map_err(|_| AppError::ScanTimeout)??;

        self.check(&raw).await
    }

    /// Applies the operator's button press and appends exactly one decision.
    ///
    /// The payload goes through the machine again from IDLE, so the company
    /// status used is the one current at decision time.
    pub async fn decide(
        &self,
        raw: &str,
        action: OperatorAction,
        decided_by: &str,
    ) -> Result<ValidationDecision, AppError> {
        let verdict = self.validator.run(raw).await?;

        let (outcome, reason) = match (action, verdict.outcome) {
            (OperatorAction::Approve, Outcome::Approved) => (Outcome::Approved, None),
            (OperatorAction::Approve, Outcome::Rejected) => {
                tracing::warn!(
                    "Approve pressed on a rejected token (case {:?}, reason {:?})",
                    verdict.case_id(),
                    verdict.reason
                );
                return Err(AppError::ApprovalDisabled(verdict.reason));
            }
            (OperatorAction::Reject, Outcome::Approved) => {
                (Outcome::Rejected, Some(RejectReason::OperatorRejected))
            }
            (OperatorAction::Reject, Outcome::Rejected) => (Outcome::Rejected, verdict.reason),
        };

        let decision = ValidationDecision {
            id: Uuid::new_v4(),
            case_id: verdict.case_id(),
            company_id: verdict.company_id(),
            decided_at: Utc::now(),
            outcome,
            reason,
            decided_by: decided_by.to_string(),
        };

        self.log.record(decision.clone()).await?;
        tracing::info!(
            "Pickup {:?} for case {:?} by {} (reason {:?})",
            decision.outcome,
            decision.case_id,
            decision.decided_by,
            decision.reason
        );

        Ok(decision)
    }

    pub async fn history(
        &self,
        case_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ValidationDecision>, AppError> {
        match case_id {
            Some(case_id) => {
                let mut decisions = self.log.list_for(case_id).await?;
                decisions.truncate(limit);
                Ok(decisions)
            }
            None => self.log.list_recent(limit).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{
        auth::User,
        case::CaseStatus,
        company::AuthorizationStatus,
        crew::{Employee, Vehicle},
    };
    use crate::services::scanner::{CaptureDevice, FrameStream};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Wraps the memory store and counts every registry read
    #[derive(Clone)]
    struct CountingRegistry {
        inner: MemoryStore,
        reads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CompanyRegistry for CountingRegistry {
        async fn get(&self, company_id: &str) -> Result<Option<Company>, AppError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            CompanyRegistry::get(&self.inner, company_id).await
        }
        async fn list(&self) -> Result<Vec<Company>, AppError> {
            self.inner.list().await
        }
        async fn create(&self, company: Company, admin: User) -> Result<Company, AppError> {
            self.inner.create(company, admin).await
        }
        async fn set_status(
            &self,
            company_id: &str,
            status: AuthorizationStatus,
        ) -> Result<Company, AppError> {
            self.inner.set_status(company_id, status).await
        }
    }

    #[async_trait]
    impl CaseRegistry for CountingRegistry {
        async fn get(&self, case_id: &str) -> Result<Option<Case>, AppError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            CaseRegistry::get(&self.inner, case_id).await
        }
        async fn list_for_company(&self, company_id: &str) -> Result<Vec<Case>, AppError> {
            self.inner.list_for_company(company_id).await
        }
    }

    fn company(id: &str, status: AuthorizationStatus) -> Company {
        Company {
            id: id.into(),
            name: format!("Company {id}"),
            cui: "RO1".into(),
            location: "Bucharest".into(),
            address: String::new(),
            phone: String::new(),
            email: format!("{}@example.ro", id.to_lowercase()),
            status,
            processing_location: None,
        }
    }

    fn case(id: &str, company_id: &str) -> Case {
        Case {
            id: id.into(),
            company_id: company_id.into(),
            deceased_name: "Ion Popescu".into(),
            date: "2024-02-13".into(),
            location: "Spitalul Central".into(),
            status: CaseStatus::Active,
            permits: vec!["PRM-1".into()],
        }
    }

    struct Fixture {
        store: MemoryStore,
        reads: Arc<AtomicUsize>,
        service: ValidationService,
    }

    fn fixture(co1: AuthorizationStatus) -> Fixture {
        let store = MemoryStore::new(
            vec![company("CO-1", co1), company("CO-2", AuthorizationStatus::Authorized)],
            vec![case("CASE-1", "CO-1"), case("CASE-2", "CO-2")],
            vec![],
        )
        .with_crew(
            vec![Employee {
                id: "EMP-1".into(),
                company_id: "CO-1".into(),
                name: "Andrei Marin".into(),
                email: String::new(),
                phone: String::new(),
                position: "Driver".into(),
            }],
            vec![Vehicle {
                id: "VEH-1".into(),
                company_id: "CO-1".into(),
                plate_number: "B-101-FSL".into(),
                vehicle_type: "Hearse".into(),
                model: String::new(),
                last_inspection: None,
            }],
        );
        let reads = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(CountingRegistry { inner: store.clone(), reads: reads.clone() });
        let validator = TokenValidator::new(registry.clone(), registry);
        let service =
            ValidationService::new(validator, Arc::new(store.clone()), Arc::new(store.clone()));
        Fixture { store, reads, service }
    }

    const TOKEN_CASE_1: &str = r#"{"caseId":"CASE-1","companyId":"CO-1","deceasedName":"Ion Popescu",
        "date":"2024-02-13","permits":["PRM-1"],"issuedAt":"2024-02-13T10:00:00Z"}"#;

    #[tokio::test]
    async fn authorized_company_is_approved() {
        let f = fixture(AuthorizationStatus::Authorized);

        let verdict = f.service.check(TOKEN_CASE_1).await.unwrap();
        assert_eq!(verdict.outcome, Outcome::Approved);
        assert_eq!(verdict.reason, None);
        assert!(verdict.approve_enabled());
        assert_eq!(verdict.company.as_ref().map(|c| c.id.as_str()), Some("CO-1"));
        assert_eq!(verdict.case.as_ref().map(|c| c.id.as_str()), Some("CASE-1"));

        let decision = f
            .service
            .decide(TOKEN_CASE_1, OperatorAction::Approve, "validator@spital-central.ro")
            .await
            .unwrap();
        assert_eq!(decision.outcome, Outcome::Approved);
        assert_eq!(decision.case_id.as_deref(), Some("CASE-1"));
        assert_eq!(f.store.list_for("CASE-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn suspended_company_is_rejected_and_cannot_be_approved() {
        let f = fixture(AuthorizationStatus::Suspended);

        let verdict = f.service.check(TOKEN_CASE_1).await.unwrap();
        assert_eq!(verdict.outcome, Outcome::Rejected);
        assert_eq!(verdict.reason, Some(RejectReason::CompanySuspended));
        assert!(!verdict.approve_enabled());

        let err = f
            .service
            .decide(TOKEN_CASE_1, OperatorAction::Approve, "validator@spital-central.ro")
            .await
            .expect_err("approve disabled");
        assert!(matches!(err, AppError::ApprovalDisabled(Some(RejectReason::CompanySuspended))));
        assert!(f.store.list_for("CASE-1").await.unwrap().is_empty());

        let decision = f
            .service
            .decide(TOKEN_CASE_1, OperatorAction::Reject, "validator@spital-central.ro")
            .await
            .unwrap();
        assert_eq!(decision.outcome, Outcome::Rejected);
        assert_eq!(decision.reason, Some(RejectReason::CompanySuspended));
    }

    #[tokio::test]
    async fn malformed_payloads_never_touch_the_registry() {
        let f = fixture(AuthorizationStatus::Authorized);

        for raw in [
            "{not json",
            "[]",
            r#"{"companyId":"CO-1"}"#,
            r#"{"caseId":"CASE-1"}"#,
            r#"{"caseId":"","companyId":"CO-1"}"#,
        ] {
            let verdict = f.service.check(raw).await.unwrap();
            assert_eq!(verdict.outcome, Outcome::Rejected, "{raw}");
            assert_eq!(verdict.reason, Some(RejectReason::MalformedPayload), "{raw}");
            assert!(verdict.token.is_none());
        }
        assert_eq!(f.reads.load(Ordering::SeqCst), 0);

        let decision = f
            .service
            .decide(r#"{"caseId":"CASE-1"}"#, OperatorAction::Reject, "v@x.ro")
            .await
            .unwrap();
        assert_eq!(decision.reason, Some(RejectReason::MalformedPayload));
        // Filed under the case it named, even though it was unusable
        assert_eq!(decision.case_id.as_deref(), Some("CASE-1"));
        assert_eq!(decision.company_id, None);
        assert_eq!(f.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_company_is_rejected() {
        let f = fixture(AuthorizationStatus::Authorized);
        let raw = r#"{"caseId":"CASE-1","companyId":"CO-404"}"#;

        let verdict = f.service.check(raw).await.unwrap();
        assert_eq!(verdict.reason, Some(RejectReason::UnknownCompany));
        assert!(verdict.company.is_none());
    }

    #[tokio::test]
    async fn case_must_exist_and_belong_to_the_company() {
        let f = fixture(AuthorizationStatus::Authorized);

        let verdict = f
            .service
            .check(r#"{"caseId":"CASE-404","companyId":"CO-1"}"#)
            .await
            .unwrap();
        assert_eq!(verdict.reason, Some(RejectReason::UnknownCase));

        let verdict = f
            .service
            .check(r#"{"caseId":"CASE-2","companyId":"CO-1"}"#)
            .await
            .unwrap();
        assert_eq!(verdict.reason, Some(RejectReason::CaseCompanyMismatch));
        assert!(!verdict.approve_enabled());
    }

    #[tokio::test]
    async fn revalidation_keeps_both_decisions() {
        let f = fixture(AuthorizationStatus::Authorized);

        let first = f
            .service
            .decide(TOKEN_CASE_1, OperatorAction::Approve, "v@x.ro")
            .await
            .unwrap();
        let second = f
            .service
            .decide(TOKEN_CASE_1, OperatorAction::Reject, "v@x.ro")
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.reason, Some(RejectReason::OperatorRejected));

        let history = f.service.history(Some("CASE-1"), 50).await.unwrap();
        assert_eq!(history, vec![second, first]);
    }

    #[tokio::test]
    async fn status_is_read_at_decision_time_not_from_the_preview() {
        let f = fixture(AuthorizationStatus::Authorized);

        let preview = f.service.check(TOKEN_CASE_1).await.unwrap();
        assert!(preview.approve_enabled());

        f.store
            .set_status("CO-1", AuthorizationStatus::Suspended)
            .await
            .unwrap();

        let err = f
            .service
            .decide(TOKEN_CASE_1, OperatorAction::Approve, "v@x.ro")
            .await
            .expect_err("suspended in between");
        assert!(matches!(err, AppError::ApprovalDisabled(_)));
    }

    #[tokio::test]
    async fn state_machine_walks_every_state() {
        let state = ValidationState::present(TOKEN_CASE_1);
        assert_eq!(state.name(), "DECODING");

        let f = fixture(AuthorizationStatus::Authorized);
        let validator = f.service.validator.clone();
        let checking = validator.advance(state).await.unwrap();
        assert_eq!(checking.name(), "CHECKING");
        let decided = validator.advance(checking).await.unwrap();
        assert!(matches!(decided, ValidationState::Decided(ref v) if v.outcome == Outcome::Approved));

        assert!(validator.advance(ValidationState::Idle).await.is_err());
    }

    struct OneShot(&'static str);

    struct OneShotFrames(Option<String>);

    #[async_trait]
    impl CaptureDevice for OneShot {
        async fn start(&self) -> Result<Box<dyn FrameStream>, AppError> {
            Ok(Box::new(OneShotFrames(Some(self.0.to_string()))))
        }
    }

    #[async_trait]
    impl FrameStream for OneShotFrames {
        async fn next_frame(&mut self) -> Option<String> {
            match self.0.take() {
                Some(frame) => Some(frame),
                // Camera keeps running without seeing a code
                None => std::future::pending().await,
            }
        }
        fn stop(&mut self) {}
    }

    #[tokio::test]
    async fn scanned_codes_go_through_the_same_checks() {
        let f = fixture(AuthorizationStatus::Suspended);
        let scanner = Scanner::new(Arc::new(OneShot(TOKEN_CASE_1)));

        let verdict = f.service.scan(&scanner, Duration::from_secs(5)).await.unwrap();
        assert_eq!(verdict.reason, Some(RejectReason::CompanySuspended));
        assert!(!scanner.is_active());
    }

    #[tokio::test]
    async fn scan_timeout_releases_the_scanner() {
        let f = fixture(AuthorizationStatus::Authorized);
        let scanner = Scanner::new(Arc::new(OneShot("   ")));

        let err = f
            .service
            .scan(&scanner, Duration::from_millis(20))
            .await
            .expect_err("timeout");
        assert!(matches!(err, AppError::ScanTimeout));
        assert!(!scanner.is_active());
    }

    struct NeverOpens;

    #[async_trait]
    impl CaptureDevice for NeverOpens {
        async fn start(&self) -> Result<Box<dyn FrameStream>, AppError> {
            // A tty waiting for carrier
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn scan_timeout_covers_opening_the_device() {
        let f = fixture(AuthorizationStatus::Authorized);
        let scanner = Scanner::new(Arc::new(NeverOpens));

        let err = f
            .service
            .scan(&scanner, Duration::from_millis(50))
            .await
            .expect_err("timeout");
        assert!(matches!(err, AppError::ScanTimeout));
        assert!(!scanner.is_active());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn timed_out_scan_leaves_the_next_code_for_the_next_scan() {
        use crate::services::scanner::LineDevice;
        use std::io::Write;

        let path = std::env::temp_dir().join(format!("groza-scan-{}", Uuid::new_v4()));
        let status = std::process::Command::new("mkfifo")
            .arg(&path)
            .status()
            .expect("mkfifo");
        assert!(status.success());
        // Scanner side of the FIFO; read-write so the open does not wait for a reader
        let mut scanner_end = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .expect("fifo");

        let f = fixture(AuthorizationStatus::Authorized);
        let scanner = Scanner::new(Arc::new(LineDevice::new(&path)));

        let err = f
            .service
            .scan(&scanner, Duration::from_millis(100))
            .await
            .expect_err("nothing scanned yet");
        assert!(matches!(err, AppError::ScanTimeout));
        assert!(!scanner.is_active());

        writeln!(scanner_end, r#"{{"caseId":"CASE-1","companyId":"CO-1"}}"#).expect("write");

        let verdict = f
            .service
            .scan(&scanner, Duration::from_secs(2))
            .await
            .expect("code read by the second scan");
        assert_eq!(verdict.outcome, Outcome::Approved);
        assert!(!scanner.is_active());

        drop(scanner_end);
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn verdict_shows_the_crew_of_a_known_company() {
        let f = fixture(AuthorizationStatus::Suspended);

        // Shown even when the company is refused, so the operator can tell the driver
        let verdict = f.service.check(TOKEN_CASE_1).await.unwrap();
        assert_eq!(verdict.reason, Some(RejectReason::CompanySuspended));
        let crew = verdict.crew.expect("crew");
        assert_eq!(crew.employee.map(|e| e.name).as_deref(), Some("Andrei Marin"));
        assert_eq!(crew.vehicle.map(|v| v.plate_number).as_deref(), Some("B-101-FSL"));

        let verdict = f
            .service
            .check(r#"{"caseId":"CASE-2","companyId":"CO-2"}"#)
            .await
            .unwrap();
        assert_eq!(verdict.outcome, Outcome::Approved);
        assert_eq!(verdict.crew, Some(Default::default()));

        let verdict = f
            .service
            .check(r#"{"caseId":"CASE-1","companyId":"CO-404"}"#)
            .await
            .unwrap();
        assert!(verdict.crew.is_none());
    }
}
