//! Detection and scoring of novel exons from transcript assemblies.
//!
//! Stages, in pipeline order: reference [`annotation`] index, per-sample
//! [`exon_graph`] with [`junctions`] support, [`events`] detection,
//! cross-sample [`aggregate`], [`conservation`] attachment, [`ecdf`]
//! scoring, novel event [`filter`] and the final [`report`].
//! [`frame`] and [`tables`] move records in and out of polars frames.

pub mod aggregate;
pub mod annotation;
pub mod config;
pub mod conservation;
pub mod ecdf;
pub mod errors;
pub mod events;
pub mod exon_graph;
pub mod filter;
pub mod frame;
pub mod junctions;
pub mod novexon_structs;
pub mod report;
pub mod sorts;
pub mod tables;
