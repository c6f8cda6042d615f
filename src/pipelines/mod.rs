// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │  Job list /  │ ──▶ │ Depth map pipeline│ ──▶ │ 16-bit PNG   │
//! │  CLI job     │     │  - PLY load/crop  │     │  per job     │
//! │              │     │  - Projection     │     │              │
//! │              │     │  - Splat render   │     │              │
//! │              │     │  - Encoding       │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`depth_map`]: Batch depth map rendering and encoding

pub mod depth_map;
