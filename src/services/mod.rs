pub mod access;
pub mod events;
pub mod journal;
pub mod locks;
pub mod records;
pub mod report;
pub mod settings;
pub mod workflow;
