use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use skyway_core::booking::{ChangeSet, PassengerFields};
use skyway_core::itinerary::Itinerary;
use skyway_core::notification::Notifier;
use skyway_core::{CoreError, CoreResult};
use std::fmt::Write as _;
use tracing::info;

use crate::app_config::EmailConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMail {
    pub subject: String,
    pub html: String,
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn itinerary_table(itinerary: &Itinerary) -> String {
    let mut out = String::from("<table style=\"border-collapse: collapse;\">");
    for segment in &itinerary.booking.segments {
        let leg = if segment.is_return { "Return" } else { "Outbound" };
        let detail = match itinerary.flight_for(segment) {
            Some(flight) => format!(
                "{} {}: {} to {}, departs {}",
                escape(&flight.airline.name),
                escape(&flight.flight_number),
                escape(&flight.departure_airport.city),
                escape(&flight.arrival_airport.city),
                flight.departure_time.format("%Y-%m-%d %H:%M UTC")
            ),
            None => format!("Flight {}", segment.flight_id),
        };
        let _ = write!(
            out,
            "<tr><td style=\"padding: 4px 12px 4px 0;\"><strong>{}</strong></td><td>{} ({})</td></tr>",
            leg, detail, segment.cabin_class
        );
    }
    out.push_str("</table>");

    out.push_str("<p><strong>Passengers</strong></p><ul>");
    for passenger in &itinerary.booking.passengers {
        let _ = write!(
            out,
            "<li>{} ({})</li>",
            escape(&passenger.full_name()),
            passenger.passenger_type.as_str()
        );
    }
    out.push_str("</ul>");
    let _ = write!(out, "<p>Total: {:.2}</p>", itinerary.booking.total_amount);
    out
}

fn document_link(document_url: Option<&str>) -> String {
    document_url
        .map(|url| format!("<p><a href=\"{}\">Download your e-ticket</a></p>", escape(url)))
        .unwrap_or_default()
}

fn wrap(title: &str, name: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>{title}</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #2563eb;">{title}</h2>
    <p>Dear {name},</p>
    {body}
  </div>
</body>
</html>"#,
        title = title,
        name = escape(name),
        body = body
    )
}

pub fn render_confirmation(name: &str, itinerary: &Itinerary, document_url: Option<&str>) -> RenderedMail {
    let body = format!(
        "<p>Your booking <strong>{}</strong> is confirmed.</p>{}{}",
        itinerary.booking.id,
        itinerary_table(itinerary),
        document_link(document_url)
    );
    RenderedMail {
        subject: format!("Flight Booking Confirmation - {}", itinerary.headline()),
        html: wrap("Booking Confirmation", name, &body),
    }
}

fn describe(fields: &PassengerFields) -> String {
    let mut out = format!("{} {}", fields.first_name, fields.last_name);
    if let Some(nationality) = &fields.nationality {
        let _ = write!(out, ", {}", nationality);
    }
    let _ = write!(out, ", {}", fields.passenger_type.as_str());
    escape(&out)
}

pub fn render_update(
    name: &str,
    itinerary: &Itinerary,
    changes: &ChangeSet,
    document_url: Option<&str>,
) -> RenderedMail {
    let mut diff = String::from("<p><strong>Changes</strong></p><ul>");
    for change in &changes.passengers {
        let _ = write!(
            diff,
            "<li>{} &rarr; {}</li>",
            describe(&change.old_data),
            describe(&change.new_data)
        );
    }
    diff.push_str("</ul>");

    let body = format!(
        "<p>Your booking <strong>{}</strong> has been updated.</p>{}{}{}",
        itinerary.booking.id,
        diff,
        itinerary_table(itinerary),
        document_link(document_url)
    );
    RenderedMail {
        subject: format!("Flight Booking Update - {}", itinerary.headline()),
        html: wrap("Booking Updated", name, &body),
    }
}

pub fn render_cancellation(name: &str, itinerary: &Itinerary) -> RenderedMail {
    let body = format!(
        "<p>Your booking <strong>{}</strong> has been cancelled. The following flights are no longer reserved:</p>{}",
        itinerary.booking.id,
        itinerary_table(itinerary)
    );
    RenderedMail {
        subject: format!("Flight Booking Cancellation - {}", itinerary.headline()),
        html: wrap("Booking Cancelled", name, &body),
    }
}

/// Sends mail through an SMTP relay.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpNotifier {
    pub fn new(config: &EmailConfig) -> CoreResult<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| CoreError::InvalidInput("email.smtp_host is required in smtp mode".to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| CoreError::Upstream(format!("SMTP relay error: {}", e)))?
            .port(config.smtp_port);
        if let (Some(user), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: format!("{} <{}>", config.from_name, config.from_email),
        })
    }

    async fn deliver(&self, to: &str, mail: RenderedMail) -> CoreResult<()> {
        let message = Message::builder()
            .from(
                self.from
                    .parse::<Mailbox>()
                    .map_err(|e| CoreError::InvalidInput(format!("Invalid sender address: {}", e)))?,
            )
            .to(to
                .parse::<Mailbox>()
                .map_err(|e| CoreError::InvalidInput(format!("Invalid recipient address: {}", e)))?)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .map_err(|e| CoreError::Upstream(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| CoreError::Upstream(format!("Failed to send email: {}", e)))?;

        info!(to = %to, subject = %mail.subject, "Email sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_confirmation(
        &self,
        email: &str,
        name: &str,
        itinerary: &Itinerary,
        document_url: Option<&str>,
    ) -> CoreResult<()> {
        self.deliver(email, render_confirmation(name, itinerary, document_url)).await
    }

    async fn send_update(
        &self,
        email: &str,
        name: &str,
        itinerary: &Itinerary,
        changes: &ChangeSet,
        document_url: Option<&str>,
    ) -> CoreResult<()> {
        self.deliver(email, render_update(name, itinerary, changes, document_url)).await
    }

    async fn send_cancellation(&self, email: &str, name: &str, itinerary: &Itinerary) -> CoreResult<()> {
        self.deliver(email, render_cancellation(name, itinerary)).await
    }
}

/// Logs mail instead of sending it. Used in development and tests.
#[derive(Clone, Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub const fn new() -> Self {
        Self
    }

    fn log(&self, to: &str, mail: &RenderedMail) {
        info!(to = %to, subject = %mail.subject, "Email (console mode)");
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send_confirmation(
        &self,
        email: &str,
        name: &str,
        itinerary: &Itinerary,
        document_url: Option<&str>,
    ) -> CoreResult<()> {
        self.log(email, &render_confirmation(name, itinerary, document_url));
        Ok(())
    }

    async fn send_update(
        &self,
        email: &str,
        name: &str,
        itinerary: &Itinerary,
        changes: &ChangeSet,
        document_url: Option<&str>,
    ) -> CoreResult<()> {
        self.log(email, &render_update(name, itinerary, changes, document_url));
        Ok(())
    }

    async fn send_cancellation(&self, email: &str, name: &str, itinerary: &Itinerary) -> CoreResult<()> {
        self.log(email, &render_cancellation(name, itinerary));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use skyway_core::account::User;
    use skyway_core::booking::{Booking, BookingStatus, PassengerChange, PassengerType, PaymentStatus};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn empty_itinerary() -> Itinerary {
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        Itinerary {
            booking: Booking {
                id: Uuid::new_v4(),
                user_id,
                total_amount: 120.0,
                status: BookingStatus::Confirmed,
                payment_status: PaymentStatus::Completed,
                payment_method_id: None,
                segments: Vec::new(),
                passengers: Vec::new(),
                created_at: now,
                updated_at: now,
            },
            flights: HashMap::new(),
            customer: User {
                id: user_id,
                auth_id: "auth|1".to_string(),
                email: "traveller@example.com".to_string(),
                first_name: None,
                last_name: None,
                phone: None,
                created_at: now,
                updated_at: now,
            },
        }
    }

    fn fields(first: &str, nationality: Option<&str>) -> PassengerFields {
        PassengerFields {
            first_name: first.to_string(),
            last_name: "Smith".to_string(),
            nationality: nationality.map(str::to_string),
            passenger_type: PassengerType::Adult,
        }
    }

    #[test]
    fn test_subjects_follow_the_mail_kind() {
        let itinerary = empty_itinerary();
        let headline = itinerary.headline();

        let confirmation = render_confirmation("Jo", &itinerary, None);
        let cancellation = render_cancellation("Jo", &itinerary);

        assert_eq!(confirmation.subject, format!("Flight Booking Confirmation - {}", headline));
        assert_eq!(cancellation.subject, format!("Flight Booking Cancellation - {}", headline));
    }

    #[test]
    fn test_confirmation_links_document_and_escapes_name() {
        let itinerary = empty_itinerary();
        let mail = render_confirmation("<Jo>", &itinerary, Some("http://tickets/1.txt"));

        assert!(mail.html.contains("Dear &lt;Jo&gt;"));
        assert!(mail.html.contains("href=\"http://tickets/1.txt\""));
        assert!(mail.html.contains(&itinerary.booking.id.to_string()));
    }

    #[test]
    fn test_update_lists_old_and_new_values() {
        let itinerary = empty_itinerary();
        let changes = ChangeSet {
            passengers: vec![PassengerChange {
                id: Uuid::new_v4(),
                old_data: fields("Jon", None),
                new_data: fields("John", Some("GB")),
            }],
        };

        let mail = render_update("Jo", &itinerary, &changes, None);

        assert!(mail.subject.starts_with("Flight Booking Update - "));
        assert!(mail.html.contains("Jon Smith, ADULT &rarr; John Smith, GB, ADULT"));
        assert!(!mail.html.contains("e-ticket"));
    }

    #[tokio::test]
    async fn test_console_notifier_never_fails() {
        let notifier = ConsoleNotifier::new();
        let itinerary = empty_itinerary();

        notifier.send_confirmation("a@b.c", "Jo", &itinerary, None).await.unwrap();
        notifier.send_cancellation("a@b.c", "Jo", &itinerary).await.unwrap();
    }

    #[test]
    fn test_smtp_mode_requires_host() {
        let config = EmailConfig::default();
        assert!(matches!(SmtpNotifier::new(&config), Err(CoreError::InvalidInput(_))));
    }
}
