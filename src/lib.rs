//! cfg-vault - encrypted config files and env templates, unlocked by your
//! SSH agent.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── profile       # list, add, show, edit, delete, import, select
//! │   ├── run           # Run a command with a profile applied
//! │   ├── export        # export-env / export-file
//! │   ├── rotate        # rotate-key
//! │   ├── check         # Store consistency report
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── agent         # SSH agent access, usable keys, suffixes
//!     ├── cipher/       # Key derivation and AES-256-CBC blobs
//!     ├── store/        # On-disk layout and atomic writes
//!     ├── domain/       # Index, profile and dotenv types
//!     ├── profiles/     # Profile and template management
//!     ├── resolve/      # Secret reference resolvers (op, none)
//!     ├── runner        # Materialize, run, clean up
//!     ├── rotate        # Move a store to another key
//!     ├── check         # Orphaned and dangling templates
//!     └── config        # Settings file and env overrides
//! ```
//!
//! # Features
//!
//! - Keys derived from SSH agent signatures; nothing secret on disk
//! - Content-addressed template blobs, shared between profiles
//! - File outputs removed after the command exits, including on SIGINT/SIGTERM
//! - 1Password references resolved at run time

pub mod cli;
pub mod core;
pub mod error;
