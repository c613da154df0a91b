//! # orrery-core
//!
//! Startup and concurrency core for the Orrery viewer. Drives the engine from
//! launch to ready, serializes all engine access onto one thread, and runs
//! long searches that the user can abort. Independent of any UI.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use orrery_core::config::Config;
//! use orrery_core::dispatch::TaskDispatchQueue;
//! use orrery_core::lifecycle::StateMachine;
//! use orrery_core::pipeline::{Liveness, LoadPipeline, PipelineEnv, PipelineOptions};
//!
//! // 1. Move the engine onto its own thread
//! let config = Config::load();
//! let queue = TaskDispatchQueue::spawn(engine, config.tick_interval())?;
//!
//! // 2. Observe the process-wide lifecycle
//! let machine = StateMachine::global();
//! let id = machine.register(&listener);
//!
//! // 3. Run the load pipeline; Finished is reached on the engine thread
//! let pipeline = LoadPipeline::new(machine, queue.submitter(), env, PipelineOptions::from_config(&config));
//! pipeline.start(Liveness::new());
//!
//! // 4. Search for eclipses with an abortable session
//! // let finder = queue.submit_with_reply(|e| e.eclipse_finder("Earth"))?.recv()??;
//! // let session = CancellableSession::run(EclipseSearch::new(finder, config.search_step_days()), range)?;
//! // session.abort(); session.finish();
//! ```
//!
//! ## Module Overview
//!
//! - [`lifecycle`]: `StateMachine` holding the single `LifecycleState`, weak listeners,
//!   status text, failure cause, snapshots and resume plans
//! - [`dispatch`]: `TaskDispatchQueue`, the FIFO task queue feeding the engine thread
//! - [`pipeline`]: `LoadPipeline` for asset refresh, folder creation, launch config,
//!   engine load and settings restore
//! - [`session`]: `CancellableSession` with cooperative abort; `EclipseSearch`
//! - [`engine`]: the `Engine` trait implemented by the simulation
//! - [`platform`]: preference store, bundled assets, filesystem
//! - [`config`]: TOML configuration (embedded + user override)

pub mod config;
pub mod dispatch;
pub mod engine;
mod fault;
pub mod lifecycle;
pub mod paths;
pub mod pipeline;
pub mod platform;
pub mod session;

pub use orrery_types as types;
