//! Registration and custom schedule submissions.
//!
//! The store write is the only step that decides the outcome of a
//! registration. The enrollment counter and the operator email run as
//! spawned tasks that resolve to an [`EffectOutcome`]; their failures are
//! logged and go nowhere else.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::models::{Notice, Registration, ScheduleRequest};
use crate::notify::{FormFields, Notifier};
use crate::store::RegistrationStore;

pub const REGISTRATION_SUCCESS: &str = "클래스 신청이 완료되었습니다! 바로 연락드리겠습니다.";
pub const SCHEDULE_SUCCESS: &str = "클래스 일정 생성이 완료되었습니다! 바로 연락드리겠습니다.";
pub const SCHEDULE_FAILURE: &str = "잠시 후 다시 시도해주세요";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOutcome {
    Done,
    Failed,
}

/// Spawn a side effect whose error is logged and then dropped.
pub fn spawn_best_effort<F, E>(effect: &'static str, fut: F) -> JoinHandle<EffectOutcome>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    tokio::spawn(async move {
        match fut.await {
            Ok(()) => EffectOutcome::Done,
            Err(err) => {
                warn!(effect, error = %err, "best-effort step failed");
                EffectOutcome::Failed
            }
        }
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Succeeded(Notice),
    Failed(Notice),
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Succeeded(_))
    }

    pub fn notice(&self) -> &Notice {
        match self {
            SubmissionOutcome::Succeeded(notice) | SubmissionOutcome::Failed(notice) => notice,
        }
    }
}

/// Detached side effects of one submission. Dropping this does not cancel them.
#[derive(Debug)]
pub struct PendingEffects {
    pub counter: Option<JoinHandle<EffectOutcome>>,
    pub notification: JoinHandle<EffectOutcome>,
}

#[derive(Debug)]
pub struct Submission {
    pub outcome: SubmissionOutcome,
    pub effects: PendingEffects,
}

#[derive(Debug, thiserror::Error)]
#[error("a submission for this class and phone is already in progress")]
pub struct AlreadySubmitting;

/// Marks a (class, phone) pair as `submitting` until dropped.
struct InFlight {
    key: String,
    set: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    fn acquire(set: &Arc<Mutex<HashSet<String>>>, key: String) -> Result<Self, AlreadySubmitting> {
        let mut guard = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !guard.insert(key.clone()) {
            return Err(AlreadySubmitting);
        }
        Ok(Self {
            key,
            set: Arc::clone(set),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut guard = self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.remove(&self.key);
    }
}

pub struct RegistrationSubmitter {
    store: Arc<dyn RegistrationStore>,
    notifier: Arc<dyn Notifier>,
    template_id: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl RegistrationSubmitter {
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        notifier: Arc<dyn Notifier>,
        template_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            template_id: template_id.into(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn notify(&self, fields: FormFields) -> JoinHandle<EffectOutcome> {
        let notifier = Arc::clone(&self.notifier);
        let template_id = self.template_id.clone();
        spawn_best_effort("notification", async move {
            notifier.send(&template_id, &fields).await
        })
    }

    /// Persist an already validated registration.
    #[tracing::instrument(name = "submit registration", skip_all, fields(class_id = %registration.class_id))]
    pub async fn submit(&self, registration: Registration) -> Result<Submission, AlreadySubmitting> {
        let _in_flight = InFlight::acquire(
            &self.in_flight,
            format!("{}:{}", registration.class_id, registration.phone),
        )?;

        let (outcome, counter) = match self.store.create(&registration).await {
            Ok(()) => {
                info!("registration stored");
                let store = Arc::clone(&self.store);
                let class_id = registration.class_id.clone();
                let counter = spawn_best_effort("increment enrolled", async move {
                    store.increment_enrolled(&class_id).await
                });
                (
                    SubmissionOutcome::Succeeded(Notice::success(REGISTRATION_SUCCESS)),
                    Some(counter),
                )
            }
            Err(err) => {
                warn!(error = %err, "registration rejected by store");
                (SubmissionOutcome::Failed(Notice::failure(err.reason())), None)
            }
        };

        let notification = self.notify(registration_fields(&registration));

        Ok(Submission {
            outcome,
            effects: PendingEffects {
                counter,
                notification,
            },
        })
    }

    /// The email is the whole effect of a schedule request, so its result is the outcome.
    #[tracing::instrument(name = "submit schedule request", skip_all)]
    pub async fn request_schedule(&self, request: ScheduleRequest) -> SubmissionOutcome {
        let fields = schedule_fields(&request);
        match self.notifier.send(&self.template_id, &fields).await {
            Ok(()) => {
                info!(class_type = %request.class_type, "schedule request sent");
                SubmissionOutcome::Succeeded(Notice::success(SCHEDULE_SUCCESS))
            }
            Err(err) => {
                warn!(error = %err, "schedule request notification failed");
                SubmissionOutcome::Failed(Notice::failure(SCHEDULE_FAILURE))
            }
        }
    }
}

fn registration_fields(registration: &Registration) -> FormFields {
    FormFields::from([
        ("classId".to_string(), registration.class_id.clone()),
        ("classType".to_string(), registration.baking_class.clone()),
        ("name".to_string(), registration.name.clone()),
        ("phone".to_string(), registration.phone.clone()),
        ("email".to_string(), registration.email.clone()),
    ])
}

fn schedule_fields(request: &ScheduleRequest) -> FormFields {
    FormFields::from([
        ("classType".to_string(), request.class_type.clone()),
        ("name".to_string(), request.name.clone()),
        ("phone".to_string(), request.phone.clone()),
    ])
}
