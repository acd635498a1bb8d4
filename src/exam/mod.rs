// src/exam/mod.rs

//! The exam core: question sampling, scoring and the session lifecycle,
//! fronted by `ExamService`.

pub mod bank;
pub mod error;
pub mod locks;
pub mod report;
pub mod scoring;
pub mod service;
pub mod session;

pub use error::ExamError;
pub use service::ExamService;
