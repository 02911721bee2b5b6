//! solar-quote-mcp: roof layout, yield and financial quoting for rooftop solar
//!
//! The crate turns a roof (segments from a building registry, or outlines
//! drawn by hand) into a panel layout and a priced quote.
//!
//! # Architecture
//!
//! The engine is synchronous and pure; network access sits behind traits:
//!
//! - **Geometry**: LV95/WGS84 conversion, geodesic area and perimeter,
//!   restricted areas
//! - **Layout**: Rotated panel grids per roof segment, rotation search,
//!   panel count selection
//! - **Estimate**: System size, self-consumption, investment, subsidies,
//!   payback and cash-flow projection per country
//! - **Wizard**: The step-by-step quote session and its async effects
//!
//! # Modules
//!
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types
//! - [`geometry`] - Coordinates, polygon metrics and restricted areas
//! - [`roof`] - Buildings and roof segments
//! - [`equipment`] - Panel and inverter models
//! - [`layout`] - Panel placement
//! - [`estimate`] - Yield and financial estimate
//! - [`services`] - Backend service traits, HTTP client and in-memory fake
//! - [`wizard`] - Quote session state machine
//! - [`mcp`] - MCP protocol implementation

pub mod config;
pub mod equipment;
pub mod error;
pub mod estimate;
pub mod geometry;
pub mod layout;
pub mod mcp;
pub mod roof;
pub mod services;
pub mod wizard;
