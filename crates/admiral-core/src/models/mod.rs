//! # Models Module
//!
//! Wire resources of the contract.
//!
//! Every resource carries a constant `type` discriminator on the wire. Rather
//! than holding it as a free-form string, each resource has a single-variant
//! marker enum, so a value of the wrong type fails to deserialize.

/// Declare a single-variant enum that serializes as a constant string.
macro_rules! object_marker {
    ($(#[$meta:meta])* $name:ident :: $variant:ident = $wire:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
        )]
        pub enum $name {
            #[default]
            #[serde(rename = $wire)]
            $variant,
        }

        impl $name {
            /// The constant wire value.
            pub const WIRE: &'static str = $wire;
        }
    };
}

pub(crate) use object_marker;

mod batch;
mod invite;
mod page;
mod workspace;

pub use batch::*;
pub use invite::*;
pub use page::*;
pub use workspace::*;
