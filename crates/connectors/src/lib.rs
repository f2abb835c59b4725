//! # cplane-connectors
//!
//! The connector model (C3) and first-party connector implementations
//! (C4) for the governed connector plane: Slack, Discord, Teams, email
//! (Gmail/Outlook/SMTP), Telegram, Twilio SMS, X, Google Calendar,
//! WhatsApp, user-declared REST endpoints, and the Echo test connector.
//!
//! Every connector is a pure translator from `(operation_id, params)`
//! to a [`cplane_core::ConnectorResult`] describing the request to
//! make. None of them perform I/O — that happens in `cplane-proxy`.

pub mod base;
pub mod calendar;
pub mod discord;
pub mod echo;
pub mod email;
pub mod generic_rest;
pub mod sms;
pub mod slack;
pub mod teams;
pub mod telegram;
pub mod util;
pub mod whatsapp;
pub mod x;

pub use base::{
    all_required_credentials_present, opt_i64, opt_str, opt_str_or, require_str, Connector,
    ConnectorState,
};
pub use calendar::CalendarConnector;
pub use discord::DiscordConnector;
pub use echo::EchoConnector;
pub use email::{EmailBackend, EmailConnector};
pub use generic_rest::{GenericRestConfig, GenericRestConnector, RestEndpointConfig};
pub use sms::SmsConnector;
pub use slack::SlackConnector;
pub use teams::TeamsConnector;
pub use telegram::TelegramConnector;
pub use whatsapp::WhatsAppConnector;
pub use x::XConnector;

/// Build every first-party connector that needs no account-scoped
/// construction parameters. `EmailConnector` (backend choice), `SmsConnector`
/// (Twilio account SID/from number), and `WhatsAppConnector` (phone number
/// ID) carry a single `connector_id` each but represent one backend per
/// tenant — whatever wires up the registry from tenant configuration
/// constructs those separately and picks the right backend/account.
pub fn first_party_connectors() -> Vec<Box<dyn Connector>> {
    vec![
        Box::new(SlackConnector::new()),
        Box::new(DiscordConnector::new()),
        Box::new(TeamsConnector::new()),
        Box::new(TelegramConnector::new()),
        Box::new(XConnector::new()),
        Box::new(CalendarConnector::new()),
        Box::new(EchoConnector::new()),
    ]
}
