//! Solo Guard - probe/response liveness coordination over UDP
//!
//! This crate answers one question for a process at startup: "is another
//! instance of me already active, here or on the local network?" - and, for
//! the first instance, keeps answering it for instances that start later.
//!
//! - `prober` - sends one discovery probe and waits, bounded, for a match
//! - `responder` - long-lived receive loop replying to matching probes
//! - `guard` - lifecycle controller sequencing the two
//! - `socket` - socket creation with the port/address reuse discipline
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     InstanceGuard                        │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │  ┌──────────────┐  probe (once)   ┌───────────────────┐  │
//! │  │    Prober    │────────────────▶│  UDP port         │  │
//! │  │ (port + 1)   │◀────────────────│  (loopback or     │  │
//! │  └──────────────┘  response/none  │   broadcast)      │  │
//! │                                   └─────────┬─────────┘  │
//! │  first instance only                        │            │
//! │  ┌──────────────┐   recv loop               │            │
//! │  │  Responder   │◀──────────────────────────┘            │
//! │  │ (spawned,    │   reply to matching probes             │
//! │  │  cancellable)│                                        │
//! │  └──────────────┘                                        │
//! │                                                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or degrade per the fail-open
//!   design: transport faults in the prober resolve to "first instance"

pub mod guard;
pub mod prober;
pub mod responder;

mod socket;

pub use guard::{GuardError, InstanceGuard};
pub use prober::probe_for_existing_instance;
pub use responder::{Responder, ResponderError, ResponderHandle};
