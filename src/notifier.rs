//! Sends match and failure emails and records selections.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::mail::{Mailer, OutgoingEmail, Template, TemplateParams, TemplateRenderer};
use crate::registry::{Person, PersonRegistry, RegistryError, SelectionRecord};
use crate::server::metrics;

/// What happened when notifying a matched person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub delivered: bool,
    pub selection: SelectionRecord,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub sent: usize,
    pub failed: usize,
}

pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    registry: Arc<dyn PersonRegistry>,
    renderer: Arc<dyn TemplateRenderer>,
    logo_url: Option<String>,
}

impl Notifier {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        registry: Arc<dyn PersonRegistry>,
        renderer: Arc<dyn TemplateRenderer>,
        logo_url: Option<String>,
    ) -> Self {
        Self {
            mailer,
            registry,
            renderer,
            logo_url,
        }
    }

    fn compose(&self, template: Template, person: &Person) -> OutgoingEmail {
        let rendered = self.renderer.render(
            template,
            &TemplateParams {
                recipient_name: person.name.clone(),
                logo_url: self.logo_url.clone(),
            },
        );
        OutgoingEmail {
            to_email: person.email.clone(),
            to_name: person.name.clone(),
            subject: rendered.subject,
            html_body: rendered.html,
        }
    }

    /// Sends a single email, logging and counting the outcome. Never fails.
    async fn deliver(&self, template: Template, person: &Person) -> bool {
        let email = self.compose(template, person);
        match self.mailer.send(&email).await {
            Ok(receipt) => {
                debug!(
                    person_id = %person.id,
                    template = template.as_str(),
                    message_id = ?receipt.message_id,
                    "Email sent"
                );
                metrics::record_email(template.as_str(), "sent");
                true
            }
            Err(e) => {
                warn!(
                    person_id = %person.id,
                    template = template.as_str(),
                    error = %e,
                    "Failed to send email"
                );
                metrics::record_email(template.as_str(), "failed");
                false
            }
        }
    }

    /// Congratulates a matched person, then records the selection.
    ///
    /// The selection is recorded whether or not the email went out: being
    /// named in the gazette is the event, delivery is best effort. Only a
    /// registry failure is returned as an error.
    pub async fn notify_match(&self, person: &Person) -> Result<NotifyOutcome, RegistryError> {
        let delivered = self.deliver(Template::MatchNotice, person).await;
        let selection = self.registry.record_selection(&person.id, Utc::now())?;
        metrics::record_selection();
        info!(
            person_id = %person.id,
            delivered,
            "Recorded selection for {}",
            person.name
        );
        Ok(NotifyOutcome {
            delivered,
            selection,
        })
    }

    /// Tells everyone the gazette could not be checked. One email per person,
    /// each independent of the others.
    pub async fn notify_all_failure(&self, people: &[Person]) -> BroadcastSummary {
        let mut summary = BroadcastSummary::default();
        for person in people {
            if self.deliver(Template::FailureNotice, person).await {
                summary.sent += 1;
            } else {
                summary.failed += 1;
            }
        }
        info!(
            sent = summary.sent,
            failed = summary.failed,
            "Failure notice broadcast finished"
        );
        summary
    }
}
