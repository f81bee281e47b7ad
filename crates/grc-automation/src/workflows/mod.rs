pub mod analytics;
pub mod backup;
pub mod calibration;
pub mod campaigns;
pub mod document_rules;
pub mod saved_views;
