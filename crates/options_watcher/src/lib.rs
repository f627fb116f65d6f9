//! # Options Watcher
//!
//! Background polling of registered device options with aggregated
//! change notifications.
//!
//! Responsibilities:
//! - Track `(option id, last known value)` pairs for registered options
//! - Run exactly one polling thread while there is work to do (at least
//!   one subscriber and one registered option)
//! - Deliver one notification per poll cycle containing every option
//!   whose value changed, exactly once per distinct value
//!
//! ## Usage Example
//!
//! ```ignore
//! use options_watcher::OptionsWatcher;
//! use std::time::Duration;
//!
//! let watcher = OptionsWatcher::new(Duration::from_millis(500));
//! watcher.register_option(OptionId::Exposure, exposure_option);
//! let subscription = watcher.subscribe(|changed| {
//!     for (id, option) in changed {
//!         // react to the new value
//!     }
//! });
//! // dropping `subscription` (or the watcher) stops delivery
//! ```

mod signal;
mod watcher;

pub use signal::{Signal, Subscription};
pub use watcher::{ChangedOptions, OptionsWatcher};
