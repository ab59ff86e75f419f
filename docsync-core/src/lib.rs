#![doc = "docsync-core: core logic library for docsync."]

//! This crate holds the parsing, validation and reconciliation logic that turns markdown
//! documentation into CMS page and collection entries. Transport to a concrete CMS lives in
//! the `docsync` crate, behind the [`contract::Cms`] trait.
//!
//! # Usage
//! Build a [`config::SyncSettings`], pick a [`contract::Cms`] and a
//! [`contract::DocumentSource`], then call [`synchronise::synchronise`].

pub mod collection;
pub mod config;
pub mod contract;
pub mod document;
pub mod error;
pub mod front_matter;
pub mod locale;
pub mod page;
pub mod reference;
pub mod report;
pub mod synchronise;
pub mod validate;
