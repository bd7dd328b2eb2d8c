pub mod catalog;
pub mod i18n;
pub mod message;
pub mod models;
pub mod wizard;

pub use catalog::{find_route, fleet, popular_routes, routes, FleetEntry, Route};
pub use i18n::{Dictionary, Entries, Translator};
pub use message::{compose_operator_message, escape_markdown, regional_timestamp};
pub use models::*;
pub use wizard::{BookingField, BookingWizard, FieldError, Navigation, ValidationError};
