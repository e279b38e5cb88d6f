#[macro_use]
pub mod events;

pub mod app;
pub mod client;
pub mod config;
pub mod confirmation;
pub mod contracts;
pub mod controller;
pub mod decision;
pub mod error;
pub mod feedback;
pub mod landing;
pub mod orchestrator;
pub mod page_data;
pub mod retry;
pub mod session;
pub mod validate;

#[cfg(test)]
mod testing;

pub use app::{OptoutApp, Screen};
pub use client::{HttpOptoutApi, OptoutApi};
pub use config::Config;
pub use confirmation::ConfirmationView;
pub use contracts::{CampaignMailer, OptoutType};
pub use controller::{LandingController, SubmissionOutcome};
pub use error::{FatalError, ResolveError, TransportError};
pub use events::{EventSink, LogEventSink};
pub use landing::{LandingView, Route};
pub use session::Session;
