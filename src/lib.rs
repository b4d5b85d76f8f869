//! Practice tutor
//!
//! Session engine for practice assessments: questions are answered and
//! graded one at a time, and an AI tutor explains or chats about the active
//! question over a streamed reply.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]

pub mod backend;
pub mod config;
pub mod conversation;
pub mod model;
pub mod runtime;
pub mod state_machine;
pub mod stream;
pub mod transcript;
pub mod tui;
