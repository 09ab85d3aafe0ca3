//! Testing utilities for console sessions.
//!
//! This module provides:
//! - A map-backed binding and a small scripted evaluator over it
//! - An extractor and exception mapper for those bindings
//! - An audit sink that always fails

mod mocks;

pub use mocks::{
    factory, map_extractor, release_counting_evaluators, scripted_evaluators, FailingAuditSink,
    FrameException, FrameMapper, MapBinding, MapExtractor, ScriptedEvaluator,
};
