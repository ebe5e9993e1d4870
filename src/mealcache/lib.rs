//! # Mealcache Architecture
//!
//! Mealcache is a **client-side recipe cache** for a Mealie-style recipe
//! server. It keeps a local collection of recipes, fills in their full detail
//! in cancellable batches, and answers queries (by id, by category,
//! favorites) without going back to the server.
//!
//! Like any cache it is a library first. The `mealcache` binary is one client.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Freshness gate, list → seed → batched detail load        │
//! │  - Abort-and-replace of the running load                    │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                              │
//!                 ▼                              ▼
//! ┌───────────────────────────────┐  ┌──────────────────────────┐
//! │  Store (store.rs)             │  │  Source (source/)        │
//! │  collection + index,          │  │  RecipeSource trait,     │
//! │  favorites, categories,       │  │  DirSource, MemSource    │
//! │  current recipe, session      │  └──────────────────────────┘
//! └───────────────────────────────┘
//!                 │
//!                 ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (storage/)                                         │
//! │  - StorageBackend trait: FsStorage, MemStorage              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Threading Model
//!
//! Everything runs on one thread. The store is shared as
//! `Rc<RefCell<RecipeStore>>` ([`store::SharedStore`]) and is only borrowed
//! between awaits, never across one. Store mutations are synchronous; the
//! only suspension points are source fetches.
//!
//! ## Basic vs Detailed
//!
//! The list endpoint returns cheap *basic* records. The detail endpoint
//! returns everything. Each record carries a [`model::DetailState`], and no
//! operation lets basic data erase detail that is already known.
//!
//! ## Module Overview
//!
//! - [`api`]: The facade UIs call
//! - [`store`]: The shared cache
//! - [`collection`]: Ordered records plus their [`index`]
//! - [`favorites`]: Persisted favorite ids
//! - [`categories`]: Category list and per-category recipe cache
//! - [`loader`]: Batched, cancellable detail loading
//! - [`source`]: Where recipes come from
//! - [`storage`]: Where favorites and session state go
//! - [`config`], [`clock`], [`session`], [`error`], [`model`]
//! - `cli`: Argument parsing and printing for the binary (not part of the lib API)

pub mod api;
pub mod categories;
pub mod clock;
pub mod collection;
pub mod config;
pub mod error;
pub mod favorites;
pub mod index;
pub mod loader;
pub mod model;
pub mod session;
pub mod source;
pub mod storage;
pub mod store;

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures;
