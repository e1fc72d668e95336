//! # Coin Import
//!
//! Imports a personal coin collection from the Numista catalog into a local
//! SQLite store.
//!
//! The user authorizes access in a browser-like surface, the resulting code
//! is exchanged for an access token, and the collection is paged through.
//! Each collected item is enriched with its catalog detail and pictures
//! before it is written as one coin row.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Authorization│──▶│ Token        │──▶│ Collection   │──▶│  Item    │
//! │ Session      │   │ Exchange     │   │ Pager        │   │  Mapper  │
//! └──────────────┘   └──────────────┘   └──────────────┘   └────┬─────┘
//!                                                               │
//!                                                               ▼
//!                                                          ┌──────────┐
//!                                                          │  SQLite  │
//!                                                          └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! coins init                     # create database
//! coins auth-url                 # print the authorization page
//! coins import                   # authorize and import
//! coins list                     # show imported coins
//! coins get 1                    # every field of one coin
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Typed catalog API errors |
//! | [`auth`] | Authorization session and surfaces |
//! | [`client`] | Numista HTTP client |
//! | [`collection`] | Lazy collection pager |
//! | [`models`] | Wire types |
//! | [`record`] | Fields and the record sink |
//! | [`mapping`] | Collected item to record mapping |
//! | [`images`] | Picture decoding |
//! | [`import`] | Import orchestration |
//! | [`store`] | Coin persistence |
//! | [`progress`] | Import progress reporting |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`get`] | Coin retrieval |
//! | [`list`] | Coin listing |

pub mod auth;
pub mod client;
pub mod collection;
pub mod config;
pub mod db;
pub mod error;
pub mod get;
pub mod images;
pub mod import;
pub mod list;
pub mod mapping;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod record;
pub mod store;
