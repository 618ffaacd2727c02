//! Migration session core
//!
//! Form store, wizard state machine, stream decoding and the controller that
//! ties them to a running launch.

pub mod client;
pub mod console;
pub mod consumer;
pub mod controller;
pub mod form;
pub mod stream;
pub mod wizard;

pub use client::{ByteStream, HttpMigrationClient, MigrationClient};
pub use console::{ConsoleEvent, LogConsole, LogRecord};
pub use consumer::{RecordSink, StreamOutcome, consume, launch_and_consume};
pub use controller::{LaunchTicket, SessionController, SessionEvent, SessionEventKind, spawn_session};
pub use form::{
    FieldGroup, FieldKey, FieldKind, FieldValue, FormStore, LOCATIONS, Location, MigrationConfig,
};
pub use stream::{StreamFrame, StreamSession};
pub use wizard::{SessionHandle, Wizard, WizardStep};
