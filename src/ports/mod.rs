//! Full project ports for specific targets. They provide the pieces
//! that depend on the core and the memory map: control transfer between
//! images, resets, the shared mode selector and the interrupt vectors.
use defmt_rtt as _;

pub mod samd21;
