//! Engine behind the Better Infocuria browser extension: citation,
//! outline and highlight extraction from Infocuria judgment pages, the
//! adaptive three-pane docked layout, and the helper panel driving copy,
//! download and navigation actions. The DOM is handled as a real parsed
//! tree; geometry, time and browser facilities come in through explicit
//! inputs so every behavior is testable offline.

pub mod citation;
pub mod cli;
pub mod collab;
pub mod commands;
pub mod dom;
pub mod highlight;
pub mod layout;
pub mod model;
pub mod panel;
pub mod reconcile;
pub mod toc;
pub mod util;
