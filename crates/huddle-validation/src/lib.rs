//! # huddle-validation
//!
//! Pick validation for Huddle drafts.
//!
//! This crate provides:
//! - Read-only legality checks for proposed picks ([`PickValidator::check`])
//! - The single commit path that mutates a [`huddle_core::DraftBoard`]

mod validator;

pub use validator::{PickValidator, RejectReason, ValidatorConfig, Verdict};
