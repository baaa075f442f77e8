//! Adapters — concrete implementations of the link's port traits.
//!
//! | Adapter     | Implements        | Connects to                      |
//! |-------------|-------------------|----------------------------------|
//! | `doorbell`  | DispatchNotifier  | Transport thread wake-up         |
//! | `sim_pump`  | (device side)     | In-process pump model for hosts  |

pub mod doorbell;
pub mod sim_pump;
