//! Google Calendar surface: service-account authentication, the typed API
//! client, and the [`RemoteCalendar`] abstraction the sync pipeline writes
//! through.

pub mod auth;
pub mod client;
pub mod error;
pub mod remote;

pub use auth::{AccessToken, Authenticator, CALENDAR_SCOPE, ServiceAccountKey};
pub use client::GoogleCalendarClient;
pub use error::{RemoteError, RemoteErrorCode, RemoteResult};
pub use remote::{
    BoxFuture, CalendarEntry, EventDateTime, EventPayload, ExtendedProperties, NewCalendar,
    PrivateProperties, RemoteCalendar,
};
