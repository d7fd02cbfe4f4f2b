//! Configuration module for Lectern.
//!
//! Handles loading and saving application settings.

mod settings;

pub use settings::{
    AskSettings, BackendSettings, GeneralSettings, PlayerSettings, SearchSettings, Settings,
};
