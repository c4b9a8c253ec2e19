//! Lanewise - Packet-Parallel Memory Access
//!
//! Copyright (c) 2025 Lanewise Contributors
//! Licensed under MIT License
//!
//! Fixed-width packets of scalar lanes, lane masks and the memory operations
//! that move data between ordinary slices and packets: gather, scatter,
//! in-place transform, compress and prefetch. Every operation also works on
//! nested composites (arrays and matrices of packets), which read an
//! array-of-structures slice as structure-of-arrays packets. Runtime-length
//! data is handled by [`DynamicArray`], chunked with [`range`].

mod lanes;
mod logging;

pub mod scalar;
pub mod mask;
pub mod packet;
pub mod composite;
pub mod memory;
pub mod compress;
pub mod range;
pub mod dynamic;
pub mod cli;

// Re-export main types for convenience
pub use composite::{fill, slice, zero, Composite, Layout, Matrix};
pub use compress::compress;
pub use dynamic::{DynamicArray, DynamicArrayError, DynamicMask, DynamicPacket};
pub use logging::init_logging;
pub use mask::Mask;
pub use memory::{gather, gather_masked, prefetch, prefetch_masked, scatter, scatter_masked, transform, transform_masked};
pub use packet::{index_sequence, IndexSequence, Packet};
pub use range::{range, Range};
pub use scalar::{IndexScalar, Scalar};
